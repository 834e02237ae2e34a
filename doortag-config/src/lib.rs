use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use doortag_core::placement::PlacementSettings;
use doortag_engine::sync::SyncTolerance;
use serde::Deserialize;
use thiserror::Error;

/// 指定配置文件路径的环境变量。
pub const CONFIG_ENV: &str = "DOORTAG_CONFIG";

/// 应用配置的根结构。
#[derive(Debug, Clone, Default, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub logging: LoggingConfig,
    #[serde(default)]
    pub placement: PlacementConfig,
    #[serde(default)]
    pub sync: SyncConfig,
    #[serde(default)]
    pub snapshot: SnapshotConfig,
}

impl AppConfig {
    /// 从显式路径加载配置。
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let content = fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        toml::from_str(&content).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    /// 自动发现配置文件：优先读取环境变量 `DOORTAG_CONFIG`，否则寻找 `./config/default.toml`。
    /// 若文件缺失，则返回默认配置。
    pub fn discover() -> Result<Self, ConfigError> {
        if let Some(path) = env::var_os(CONFIG_ENV) {
            return Self::from_file(PathBuf::from(path));
        }

        let default_path = env::current_dir()
            .map(|dir| dir.join("config").join("default.toml"))
            .map_err(|source| ConfigError::Context {
                message: "获取当前工作目录失败".to_string(),
                source,
            })?;

        if default_path.exists() {
            Self::from_file(default_path)
        } else {
            Ok(Self::default())
        }
    }

    pub fn placement_settings(&self) -> PlacementSettings {
        self.placement.clone().into()
    }

    pub fn sync_tolerance(&self) -> SyncTolerance {
        self.sync.clone().into()
    }
}

/// 日志配置，支持设置默认等级。
#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    #[serde(default = "LoggingConfig::default_level")]
    pub level: String,
}

impl LoggingConfig {
    fn default_level() -> String {
        "info".to_string()
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: Self::default_level(),
        }
    }
}

/// 标记放置常量，缺省值与内核一致。
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct PlacementConfig {
    pub buffer_mm: f64,
    pub buffer_reference_scale: u32,
    pub tag_width_ratio: f64,
    pub tag_height_multiplier: f64,
    pub sliding_height_adjustment_mm: f64,
}

impl Default for PlacementConfig {
    fn default() -> Self {
        let settings = PlacementSettings::default();
        Self {
            buffer_mm: settings.buffer_mm,
            buffer_reference_scale: settings.buffer_reference_scale,
            tag_width_ratio: settings.tag_width_ratio,
            tag_height_multiplier: settings.tag_height_multiplier,
            sliding_height_adjustment_mm: settings.sliding_height_adjustment_mm,
        }
    }
}

impl From<PlacementConfig> for PlacementSettings {
    fn from(config: PlacementConfig) -> Self {
        Self {
            buffer_mm: config.buffer_mm,
            buffer_reference_scale: config.buffer_reference_scale,
            tag_width_ratio: config.tag_width_ratio,
            tag_height_multiplier: config.tag_height_multiplier,
            sliding_height_adjustment_mm: config.sliding_height_adjustment_mm,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct SyncConfig {
    /// 模型长度单位。
    pub position_tolerance: f64,
    /// 弧度。
    pub rotation_tolerance: f64,
}

impl Default for SyncConfig {
    fn default() -> Self {
        let tolerance = SyncTolerance::default();
        Self {
            position_tolerance: tolerance.position,
            rotation_tolerance: tolerance.rotation,
        }
    }
}

impl From<SyncConfig> for SyncTolerance {
    fn from(config: SyncConfig) -> Self {
        Self {
            position: config.position_tolerance,
            rotation: config.rotation_tolerance,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct SnapshotConfig {
    #[serde(default)]
    pub path: Option<PathBuf>,
    #[serde(default = "SnapshotConfig::default_write_back")]
    pub write_back: bool,
}

impl SnapshotConfig {
    fn default_write_back() -> bool {
        true
    }
}

impl Default for SnapshotConfig {
    fn default() -> Self {
        Self {
            path: None,
            write_back: true,
        }
    }
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("读取配置文件 {path:?} 失败: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("解析配置文件 {path:?} 失败: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },
    #[error("{message}")]
    Context {
        message: String,
        #[source]
        source: std::io::Error,
    },
}
