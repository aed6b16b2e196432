mod config_cmd;
mod plan;
mod upload;

pub use config_cmd::run_config;
pub use plan::run_plan;
pub use upload::run_upload;
