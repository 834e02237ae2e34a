use doortag_engine::model::ElementId;
use doortag_io::IoError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum FrontendError {
    #[error(transparent)]
    Io(#[from] IoError),
    #[error("标注目标 {0} 不存在")]
    TargetNotFound(ElementId),
    #[error("模型中没有任何视图")]
    NoViews,
}
