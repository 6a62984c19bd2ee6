use super::CliContext;
use crate::console;
use anyhow::Result;
use trafficops_core::backend::TrafficBackend;
use trafficops_core::notification::{Notification, Notifier};

pub async fn active(ctx: &CliContext) -> Result<()> {
    let info = ctx.backend.active_session_info().await?;
    print!("{}", console::format_active_session(&info));
    Ok(())
}

pub async fn restore_sample(ctx: &CliContext) -> Result<()> {
    match ctx.backend.restore_sample_session().await {
        Ok(session_id) => {
            ctx.hub.notify(Notification::success(format!(
                "Sample session restored: {}",
                session_id
            )));
            Ok(())
        }
        Err(e) => {
            ctx.hub.notify(Notification::error(e.user_message()));
            Err(e.into())
        }
    }
}
