use std::env;
use std::path::{Path, PathBuf};

use doortag_config::AppConfig;
use doortag_engine::memory::{DemoElements, MemoryModel};
use doortag_io::{JsonSnapshot, SnapshotLoader};
use tracing::info;

use crate::errors::FrontendError;

/// 指定模型快照路径的环境变量。
pub const SNAPSHOT_ENV: &str = "DOORTAG_SNAPSHOT";

/// 模型来源，便于前端呈现加载信息。
#[derive(Debug, Clone)]
pub enum ModelSource {
    Snapshot(PathBuf),
    Demo,
}

/// 统一封装加载后的模型与元信息。
#[derive(Debug)]
pub struct LoadedModel {
    pub model: MemoryModel,
    pub source: ModelSource,
    pub demo_elements: Option<DemoElements>,
}

/// 快照路径优先级：命令行 > 环境变量 > 配置文件。
pub fn resolve_snapshot_path(
    explicit: Option<&Path>,
    env_value: Option<PathBuf>,
    config: &AppConfig,
) -> Option<PathBuf> {
    explicit
        .map(Path::to_path_buf)
        .or(env_value)
        .or_else(|| config.snapshot.path.clone())
}

/// 加载快照；未指定任何路径时构建内置示例模型。指定的快照读取失败直接报错。
pub fn load_model(
    explicit: Option<&Path>,
    config: &AppConfig,
) -> Result<LoadedModel, FrontendError> {
    let env_value = env::var_os(SNAPSHOT_ENV).map(PathBuf::from);
    if let Some(path) = resolve_snapshot_path(explicit, env_value, config) {
        let model = JsonSnapshot::new().load(&path)?;
        info!(path = %path.display(), "从快照加载模型成功");
        return Ok(LoadedModel {
            model,
            source: ModelSource::Snapshot(path),
            demo_elements: None,
        });
    }

    let mut model = MemoryModel::new();
    let demo_elements = model.populate_demo();
    info!("未指定快照，使用内置示例模型");
    Ok(LoadedModel {
        model,
        source: ModelSource::Demo,
        demo_elements: Some(demo_elements),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn explicit_path_wins_over_env_and_config() {
        let mut config = AppConfig::default();
        config.snapshot.path = Some(PathBuf::from("config.json"));

        let resolved = resolve_snapshot_path(
            Some(Path::new("cli.json")),
            Some(PathBuf::from("env.json")),
            &config,
        );
        assert_eq!(resolved, Some(PathBuf::from("cli.json")));

        let resolved = resolve_snapshot_path(None, Some(PathBuf::from("env.json")), &config);
        assert_eq!(resolved, Some(PathBuf::from("env.json")));

        let resolved = resolve_snapshot_path(None, None, &config);
        assert_eq!(resolved, Some(PathBuf::from("config.json")));

        assert_eq!(resolve_snapshot_path(None, None, &AppConfig::default()), None);
    }

    #[test]
    fn missing_snapshot_is_an_error() {
        let dir = tempfile::tempdir().expect("temp dir");
        let path = dir.path().join("absent.json");
        let err = load_model(Some(&path), &AppConfig::default()).unwrap_err();
        assert!(matches!(err, FrontendError::Io(_)));
    }
}
