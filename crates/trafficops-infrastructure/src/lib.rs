pub mod config_service;
pub mod dto;
pub mod http_backend;
pub mod paths;
pub mod secret_service;

pub use crate::config_service::ConfigService;
pub use crate::http_backend::RestTrafficBackend;
pub use crate::paths::TrafficOpsPaths;
pub use crate::secret_service::SecretService;
