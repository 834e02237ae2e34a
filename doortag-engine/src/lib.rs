pub mod batch;
pub mod command;
pub mod extract;
pub mod memory;
pub mod model;
pub mod sync;
pub mod views;

pub mod errors {
    use thiserror::Error;

    use crate::model::ElementId;

    #[derive(Debug, Error)]
    pub enum EngineError {
        #[error("view {0} not found")]
        ViewNotFound(ElementId),
        #[error("door {0} not found")]
        DoorNotFound(ElementId),
        #[error("door {0} has no host element")]
        HostNotFound(ElementId),
        #[error("host element {0} is not a wall")]
        HostNotWall(ElementId),
        #[error("door {0} has no location point")]
        LocationUnavailable(ElementId),
        #[error("Could not determine door panel location")]
        PanelLocationUnavailable,
        #[error("curtain cell for door {0} not found")]
        CurtainCellNotFound(ElementId),
        #[error("tag {0} not found")]
        TagNotFound(ElementId),
        #[error("failed to create tag for door {0}")]
        TagCreationFailed(ElementId),
    }
}
