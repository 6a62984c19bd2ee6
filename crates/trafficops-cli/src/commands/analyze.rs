use super::CliContext;
use crate::RunArgs;
use anyhow::{Result, bail};
use std::path::PathBuf;
use trafficops_application::{AnalysisWorkflow, PollOutcome};
use trafficops_core::error::TrafficOpsError;
use trafficops_core::session::SessionId;

pub async fn execute(
    ctx: &CliContext,
    roads: PathBuf,
    gps: PathBuf,
    no_run: bool,
    run: &RunArgs,
) -> Result<()> {
    let workflow = ctx.workflow();
    workflow.mount().await;

    workflow.select_road_network_file(roads).await?;
    workflow.select_gps_file(gps).await?;

    println!("📤 Uploading files...");
    let session_id = workflow.upload_all().await?;
    println!("Session: {}", session_id);

    workflow.start_preprocessing().await?;
    println!("⏳ Waiting for preprocessing (Ctrl-C to stop waiting)...");
    wait_until_ready(&workflow, &session_id).await?;

    if no_run {
        println!(
            "\n💡 Run the model later with: trafficops run --session {}",
            session_id
        );
        return Ok(());
    }

    workflow.run_model(&ctx.run_request(run)).await?;
    Ok(())
}

/// Waits for the running poll and fails unless the session became `ready`.
pub async fn wait_until_ready(workflow: &AnalysisWorkflow, session_id: &SessionId) -> Result<()> {
    let outcome = tokio::select! {
        outcome = workflow.wait_for_preprocessing() => outcome,
        _ = tokio::signal::ctrl_c() => {
            workflow.teardown().await;
            bail!(
                "Interrupted. Session {} keeps preprocessing; check it with: trafficops status {} --wait",
                session_id,
                session_id
            );
        }
    };

    match outcome {
        Some(PollOutcome::Ready(_)) => Ok(()),
        Some(PollOutcome::Failed(message)) => {
            Err(TrafficOpsError::PreprocessingFailed(message).into())
        }
        Some(PollOutcome::Aborted(reason)) => {
            bail!("Stopped waiting for session {}: {}", session_id, reason)
        }
        None => bail!("Session {} is not being preprocessed", session_id),
    }
}
