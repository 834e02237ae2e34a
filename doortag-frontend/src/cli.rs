use std::path::PathBuf;

use doortag_config::AppConfig;
use doortag_engine::batch::BatchReport;
use doortag_engine::command::{CommandBus, CommandContext, CommandRequest};
use doortag_engine::memory::MemoryModel;
use doortag_engine::model::{ElementId, ModelQuery, ViewKind};
use doortag_engine::sync::TagSynchronizer;
use doortag_io::{JsonSnapshot, SnapshotSaver, export_report};
use tracing::{info, warn};

use crate::errors::FrontendError;
use crate::loader::{ModelSource, load_model};

/// 一次 CLI 同步的参数。
#[derive(Debug, Clone)]
pub struct CliOptions {
    pub snapshot: Option<PathBuf>,
    /// 为空时：有图纸则同步全部图纸，否则同步全部视图。
    pub targets: Vec<ElementId>,
    pub report: Option<PathBuf>,
    pub write_back: bool,
}

impl Default for CliOptions {
    fn default() -> Self {
        Self {
            snapshot: None,
            targets: Vec::new(),
            report: None,
            write_back: true,
        }
    }
}

/// 加载模型，运行同步命令并打印每个视图的结果；来源为快照时按需写回。
pub fn run(options: &CliOptions, config: &AppConfig) -> Result<BatchReport, FrontendError> {
    let loaded = load_model(options.snapshot.as_deref(), config)?;
    let mut model = loaded.model;
    let targets = resolve_targets(&model, &options.targets)?;
    let synchronizer = TagSynchronizer::new(config.placement_settings(), config.sync_tolerance());

    println!("门标记同步");
    match &loaded.source {
        ModelSource::Snapshot(path) => println!("已从快照加载模型：{}", path.display()),
        ModelSource::Demo => {
            if let Some(ids) = &loaded.demo_elements {
                println!("已构建内置示例模型：");
                println!("  - 平面视图 ID = {}", ids.plan);
                println!("  - 剖面视图 ID = {}", ids.section);
                println!("  - 图纸 ID = {}", ids.sheet);
                println!(
                    "  - 门 ID = {}, {}, {}, {}",
                    ids.hinged_door, ids.pivot_door, ids.sliding_door, ids.curtain_door
                );
            }
        }
    }

    let command_bus = CommandBus::new();
    let mut commands: Vec<&str> = command_bus.available_commands().copied().collect();
    commands.sort_unstable();
    println!("支持的命令: {}", commands.join(", "));

    let mut context = CommandContext {
        model: &mut model,
        synchronizer: &synchronizer,
    };
    let args = targets.iter().map(ToString::to_string);
    let request = CommandRequest::new("tag_doors_in_views", args);
    let response = command_bus.dispatch(&request, &mut context);
    let message = response.message.unwrap_or_else(|| "未知错误".to_string());
    if response.success {
        println!("[命令] {message}");
    } else {
        warn!("CLI 命令执行失败: {message}");
        println!("[命令失败] {message}");
    }

    let report = response.report.unwrap_or_default();
    print_report(&report);

    if let Some(path) = &options.report {
        export_report(&report, path)?;
        info!(path = %path.display(), "已导出同步报告");
    }

    if let ModelSource::Snapshot(path) = &loaded.source {
        if options.write_back && config.snapshot.write_back {
            JsonSnapshot::new().save(&model, path)?;
            info!(path = %path.display(), "已写回模型快照");
        }
    }

    Ok(report)
}

/// 未显式指定目标时：优先全部图纸，否则全部视图。
fn resolve_targets(
    model: &MemoryModel,
    requested: &[ElementId],
) -> Result<Vec<ElementId>, FrontendError> {
    if !requested.is_empty() {
        return match requested.iter().find(|id| model.view(**id).is_none()) {
            Some(missing) => Err(FrontendError::TargetNotFound(*missing)),
            None => Ok(requested.to_vec()),
        };
    }

    let sheets: Vec<ElementId> = model
        .views()
        .filter(|view| view.kind == ViewKind::Sheet)
        .map(|view| view.id)
        .collect();
    if !sheets.is_empty() {
        return Ok(sheets);
    }

    let views: Vec<ElementId> = model.views().map(|view| view.id).collect();
    if views.is_empty() {
        Err(FrontendError::NoViews)
    } else {
        Ok(views)
    }
}

fn print_report(report: &BatchReport) {
    println!("视图同步结果：");
    for view in &report.views {
        if !view.success {
            println!(
                "  - {} (ID {}): {}",
                view.view_name,
                view.view,
                view.error_message.as_deref().unwrap_or("未知错误")
            );
            continue;
        }
        println!(
            "  - {} (ID {}): 新建 {}，更新 {}，未变 {}，失败 {}",
            view.view_name,
            view.view,
            view.created,
            view.updated,
            view.unchanged,
            view.failed.len()
        );
        for item in view.failed_items() {
            println!("      {item}");
        }
    }
    for error in &report.errors {
        println!("  ! {error}");
    }
    println!(
        "合计：新建 {}，更新 {}，未变 {}，失败 {}",
        report.created,
        report.updated,
        report.unchanged,
        report.failed_doors()
    );
}
