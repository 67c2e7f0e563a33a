pub mod config;
pub mod logging;
pub mod paths;

pub use config::{
    default_logging_config, AppConfig, CliArgs, ClientConfig, LoggingConfig, Section,
    DEFAULT_HOME_SUBDIR, ENV_PREFIX,
};
