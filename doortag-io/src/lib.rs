use std::fs;
use std::path::{Path, PathBuf};

use doortag_engine::batch::BatchReport;
use doortag_engine::memory::MemoryModel;
use serde::Serialize;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum IoError {
    #[error("failed to read file {path:?}: {source}")]
    ReadError {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to write file {path:?}: {source}")]
    WriteError {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("invalid snapshot {path:?}: {source}")]
    InvalidSnapshot {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

pub trait SnapshotLoader {
    fn load(&self, path: &Path) -> Result<MemoryModel, IoError>;
}

pub trait SnapshotSaver {
    fn save(&self, model: &MemoryModel, path: &Path) -> Result<(), IoError>;
}

/// JSON 模型快照。标记状态随快照保存，下一次运行据此比较。
#[derive(Debug, Default, Clone, Copy)]
pub struct JsonSnapshot;

impl JsonSnapshot {
    pub fn new() -> Self {
        Self
    }
}

impl SnapshotLoader for JsonSnapshot {
    fn load(&self, path: &Path) -> Result<MemoryModel, IoError> {
        let data = fs::read_to_string(path).map_err(|source| IoError::ReadError {
            path: path.to_path_buf(),
            source,
        })?;
        serde_json::from_str(&data).map_err(|source| IoError::InvalidSnapshot {
            path: path.to_path_buf(),
            source,
        })
    }
}

impl SnapshotSaver for JsonSnapshot {
    fn save(&self, model: &MemoryModel, path: &Path) -> Result<(), IoError> {
        write_pretty(model, path)
    }
}

/// 将批量同步结果导出为 JSON。
pub fn export_report(report: &BatchReport, path: &Path) -> Result<(), IoError> {
    write_pretty(report, path)
}

fn write_pretty<T: Serialize>(value: &T, path: &Path) -> Result<(), IoError> {
    let write_error = |source: std::io::Error| IoError::WriteError {
        path: path.to_path_buf(),
        source,
    };
    let json = serde_json::to_string_pretty(value).map_err(|err| write_error(err.into()))?;
    fs::write(path, json).map_err(write_error)
}
