//! 多目标批量同步：逐个展开目标，再逐视图运行同步器。

use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::model::{ElementId, HostModel};
use crate::sync::{SyncReport, TagSynchronizer};
use crate::views::expand_target;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BatchReport {
    pub views: Vec<SyncReport>,
    pub created: usize,
    pub updated: usize,
    pub unchanged: usize,
    /// "<视图名>: <原因>"，以及无法解析的目标。
    pub errors: Vec<String>,
}

impl BatchReport {
    fn push(&mut self, report: SyncReport) {
        self.created += report.created;
        self.updated += report.updated;
        self.unchanged += report.unchanged;
        if let Some(message) = report.error_message.as_deref().filter(|_| !report.success) {
            self.errors.push(format!("{}: {}", report.view_name, message));
        }
        self.views.push(report);
    }

    pub fn failed_doors(&self) -> usize {
        self.views.iter().map(|view| view.failed.len()).sum()
    }

    /// 所有视图均通过前置检查，且没有无法解析的目标。
    pub fn success(&self) -> bool {
        self.errors.is_empty()
    }
}

pub fn synchronize_targets<M: HostModel + ?Sized>(
    synchronizer: &TagSynchronizer,
    model: &mut M,
    targets: &[ElementId],
) -> BatchReport {
    let mut batch = BatchReport::default();

    for &target in targets {
        let views = match expand_target(&*model, target) {
            Ok(views) => views,
            Err(err) => {
                warn!(target = target.get(), error = %err, "无法展开标注目标");
                batch.errors.push(format!("{target}: {err}"));
                continue;
            }
        };
        for view in views {
            let report = synchronizer.synchronize_view(model, &view);
            batch.push(report);
        }
    }

    info!(
        views = batch.views.len(),
        created = batch.created,
        updated = batch.updated,
        unchanged = batch.unchanged,
        errors = batch.errors.len(),
        "批量同步完成"
    );
    batch
}
