use super::CliContext;
use crate::console;
use anyhow::{Result, bail};
use trafficops_application::Availability;

pub async fn execute(ctx: &CliContext) -> Result<()> {
    let workflow = ctx.workflow();

    match workflow.mount().await {
        Availability::Available(algorithms) => {
            let selected = workflow.gate().selected_model_type().await;
            println!("Active algorithms:");
            print!(
                "{}",
                console::format_algorithms(&algorithms, selected.as_deref())
            );
            Ok(())
        }
        // Already reported through the hub
        Availability::Empty => Ok(()),
        Availability::Unavailable(message) => bail!("Failed to load active algorithms: {}", message),
        Availability::Unknown => bail!("Active algorithms were not fetched"),
    }
}
