//! 标注目标展开：图纸展开为其上的平面/剖面/立面视图，其他视图保持原样。

use tracing::debug;

use crate::errors::EngineError;
use crate::model::{ElementId, ModelQuery, ViewInfo, ViewKind};

pub fn expand_target<M: ModelQuery + ?Sized>(
    model: &M,
    target: ElementId,
) -> Result<Vec<ViewInfo>, EngineError> {
    let view = model.view(target).ok_or(EngineError::ViewNotFound(target))?;
    if view.kind != ViewKind::Sheet {
        return Ok(vec![view]);
    }

    let placed: Vec<ViewInfo> = model
        .views_on_sheet(view.id)
        .into_iter()
        .filter_map(|id| model.view(id))
        .filter(|placed| placed.kind.is_taggable())
        .collect();

    debug!(sheet = %view.name, views = placed.len(), "已展开图纸");
    Ok(placed)
}
