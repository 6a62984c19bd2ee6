use super::CliContext;
use super::analyze::wait_until_ready;
use crate::RunArgs;
use anyhow::{Result, bail};
use trafficops_core::session::{SessionId, SessionStatus};

pub async fn execute(ctx: &CliContext, session_id: String, run: &RunArgs) -> Result<()> {
    let workflow = ctx.workflow();
    workflow.mount().await;

    let session_id = SessionId::new(session_id);
    let session = workflow.attach_existing(session_id.clone()).await?;
    match session.status() {
        SessionStatus::Ready => {}
        SessionStatus::Preprocessing => {
            println!("⏳ Session {} is still preprocessing, waiting...", session_id);
            wait_until_ready(&workflow, &session_id).await?;
        }
        other => bail!("Session {} is {}; it must be ready to run the model", session_id, other),
    }

    workflow.run_model(&ctx.run_request(run)).await?;
    Ok(())
}
