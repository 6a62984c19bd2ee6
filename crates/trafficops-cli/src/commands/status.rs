use super::CliContext;
use crate::console;
use anyhow::Result;
use trafficops_core::session::SessionId;

pub async fn execute(ctx: &CliContext, session_id: String, wait: bool) -> Result<()> {
    let workflow = ctx.workflow();
    let session = workflow.attach_existing(SessionId::new(session_id)).await?;
    print!("{}", console::format_session(&session));

    if wait && workflow.is_polling().await {
        println!("⏳ Waiting for preprocessing...");
        workflow.wait_for_preprocessing().await;
        print!("{}", console::format_session(&workflow.session().await));
    }

    workflow.teardown().await;
    Ok(())
}
