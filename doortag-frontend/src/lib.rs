pub mod cli;
pub mod errors;
pub mod loader;

use doortag_config::AppConfig;
use errors::FrontendError;
use tracing::info;

pub use cli::CliOptions;

/// 运行一次 CLI 同步并打印汇总。
pub fn run_cli(options: &CliOptions, config: &AppConfig) -> Result<(), FrontendError> {
    info!("启动 CLI 同步前端");
    cli::run(options, config).map(|_| ())
}
