pub mod algorithms;
pub mod analyze;
pub mod run;
pub mod session;
pub mod status;

use crate::RunArgs;
use crate::console::{self, ConsoleNavigator};
use anyhow::Result;
use std::path::Path;
use std::sync::Arc;
use trafficops_application::{
    AnalysisWorkflow, IntervalScheduler, NotificationHub, RunRequest, WorkflowDeps,
    WorkflowSettings,
};
use trafficops_core::config::{ClientConfig, RunDefaults};
use trafficops_infrastructure::{ConfigService, RestTrafficBackend, SecretService};

/// Everything a command needs: loaded config, the REST backend and the
/// notification hub that prints to the terminal.
pub struct CliContext {
    pub config: ClientConfig,
    pub backend: Arc<RestTrafficBackend>,
    pub hub: Arc<NotificationHub>,
}

impl CliContext {
    pub async fn load(config_dir: Option<&Path>) -> Result<Self> {
        let config_service = ConfigService::new(config_dir);
        let secret_service = SecretService::new(config_dir);

        let config = config_service.get_config().await?;
        let backend = RestTrafficBackend::from_services(&config_service, &secret_service).await?;

        let hub = Arc::new(NotificationHub::new());
        hub.subscribe(Arc::new(console::print_notification));

        Ok(Self {
            config,
            backend: Arc::new(backend),
            hub,
        })
    }

    /// A fresh workflow polling at the configured interval.
    pub fn workflow(&self) -> AnalysisWorkflow {
        AnalysisWorkflow::new(
            WorkflowDeps {
                backend: self.backend.clone(),
                notifier: self.hub.clone(),
                navigator: Arc::new(ConsoleNavigator),
                scheduler: Arc::new(IntervalScheduler::new(self.config.polling.interval())),
            },
            WorkflowSettings {
                max_poll_attempts: self.config.polling.attempt_limit(),
                default_model_type: self.config.defaults.model_type.clone(),
            },
        )
    }

    pub fn run_request(&self, args: &RunArgs) -> RunRequest {
        run_request(&self.config.defaults, args)
    }
}

/// Fills unset run arguments from the configured defaults.
///
/// An unset model type is left to the algorithm gate, which already starts
/// from the configured default and falls back to the first active one.
fn run_request(defaults: &RunDefaults, args: &RunArgs) -> RunRequest {
    RunRequest {
        k: args.k.unwrap_or(defaults.k),
        time_horizon: args.horizon.unwrap_or(defaults.time_horizon),
        model_type: args.model.clone(),
    }
}
