use std::path::PathBuf;

use doortag_config::{AppConfig, ConfigError};
use doortag_engine::model::ElementId;
use doortag_frontend::CliOptions;
use tracing::{error, info, warn};
use tracing_subscriber::{EnvFilter, fmt};

fn main() {
    let mut args = std::env::args().skip(1);
    let mut config_override: Option<PathBuf> = None;
    let mut options = CliOptions::default();

    while let Some(arg) = args.next() {
        match arg.as_str() {
            "--config" => {
                let Some(path) = args.next() else {
                    eprintln!("`--config` 需要提供配置文件路径");
                    std::process::exit(1);
                };
                config_override = Some(PathBuf::from(path));
            }
            "--snapshot" => {
                let Some(path) = args.next() else {
                    eprintln!("`--snapshot` 需要提供模型快照路径");
                    std::process::exit(1);
                };
                options.snapshot = Some(PathBuf::from(path));
            }
            "--target" => {
                let Some(id) = args.next().and_then(|value| value.parse::<u64>().ok()) else {
                    eprintln!("`--target` 需要提供视图或图纸的元素 ID");
                    std::process::exit(1);
                };
                options.targets.push(ElementId::new(id));
            }
            "--report" => {
                let Some(path) = args.next() else {
                    eprintln!("`--report` 需要提供报告输出路径");
                    std::process::exit(1);
                };
                options.report = Some(PathBuf::from(path));
            }
            "--no-write" => options.write_back = false,
            other => {
                eprintln!("未知参数：{other}");
                std::process::exit(1);
            }
        }
    }

    let config = load_configuration(config_override);
    init_logging(&config);
    info!("启动门标记同步工具");

    if let Err(err) = doortag_frontend::run_cli(&options, &config) {
        error!(error = %err, "门标记同步失败");
        std::process::exit(1);
    }
}

fn load_configuration(override_path: Option<PathBuf>) -> AppConfig {
    match override_path {
        Some(path) => AppConfig::from_file(&path).unwrap_or_else(|err| {
            warn!(path = %path.display(), error = %err, "加载指定配置失败，使用默认配置");
            AppConfig::default()
        }),
        None => match AppConfig::discover() {
            Ok(cfg) => cfg,
            Err(err) => {
                match &err {
                    ConfigError::Io { path, .. } | ConfigError::Parse { path, .. } => {
                        warn!(
                            path = %path.display(),
                            error = %err,
                            "加载默认配置失败，使用内建默认值"
                        );
                    }
                    ConfigError::Context { .. } => {
                        warn!(error = %err, "加载默认配置失败，使用内建默认值");
                    }
                }
                AppConfig::default()
            }
        },
    }
}

fn init_logging(config: &AppConfig) {
    let filter =
        EnvFilter::try_new(config.logging.level.clone()).unwrap_or_else(|_| EnvFilter::new("info"));
    let subscriber = fmt().with_env_filter(filter);
    if subscriber.try_init().is_err() {
        // 已初始化，忽略
    }
}
