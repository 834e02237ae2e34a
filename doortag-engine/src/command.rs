use std::collections::HashMap;

use crate::batch::{BatchReport, synchronize_targets};
use crate::model::{ElementId, HostModel};
use crate::sync::TagSynchronizer;

#[derive(Debug, Clone)]
pub struct CommandRequest {
    pub name: String,
    pub args: Vec<String>,
}

impl CommandRequest {
    pub fn new(name: impl Into<String>, args: impl IntoIterator<Item = String>) -> Self {
        Self {
            name: name.into(),
            args: args.into_iter().collect(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct CommandResponse {
    pub success: bool,
    pub message: Option<String>,
    /// 同步类命令附带的批量结果。
    pub report: Option<BatchReport>,
}

impl CommandResponse {
    pub fn ok(message: impl Into<String>) -> Self {
        Self {
            success: true,
            message: Some(message.into()),
            report: None,
        }
    }

    pub fn err(message: impl Into<String>) -> Self {
        Self {
            success: false,
            message: Some(message.into()),
            report: None,
        }
    }

    pub fn with_report(mut self, report: BatchReport) -> Self {
        self.report = Some(report);
        self
    }
}

pub trait CommandHandler: Send + Sync {
    fn name(&self) -> &'static str;
    fn execute(
        &self,
        request: &CommandRequest,
        context: &mut CommandContext<'_>,
    ) -> CommandResponse;
}

pub struct CommandContext<'a> {
    pub model: &'a mut dyn HostModel,
    pub synchronizer: &'a TagSynchronizer,
}

pub struct CommandBus {
    handlers: HashMap<&'static str, Box<dyn CommandHandler>>,
}

impl Default for CommandBus {
    fn default() -> Self {
        Self::new()
    }
}

impl CommandBus {
    pub fn new() -> Self {
        let mut bus = Self {
            handlers: HashMap::new(),
        };
        bus.register(TagDoorsInViewCommand);
        bus.register(TagDoorsInViewsCommand);
        bus
    }

    pub fn register<H: CommandHandler + 'static>(&mut self, handler: H) {
        self.handlers.insert(handler.name(), Box::new(handler));
    }

    pub fn dispatch(
        &self,
        request: &CommandRequest,
        context: &mut CommandContext<'_>,
    ) -> CommandResponse {
        if let Some(handler) = self.handlers.get(request.name.as_str()) {
            handler.execute(request, context)
        } else {
            CommandResponse::err(format!("未知命令: {}", request.name))
        }
    }

    pub fn available_commands(&self) -> impl Iterator<Item = &&'static str> {
        self.handlers.keys()
    }
}

fn parse_targets(args: &[String]) -> Result<Vec<ElementId>, String> {
    args.iter()
        .map(|arg| {
            arg.trim()
                .parse::<u64>()
                .map(ElementId::new)
                .map_err(|_| format!("无效的元素 ID: {arg}"))
        })
        .collect()
}

fn summarize(batch: BatchReport) -> CommandResponse {
    let summary = format!(
        "新建 {} 个，更新 {} 个，未变 {} 个，失败 {} 个",
        batch.created,
        batch.updated,
        batch.unchanged,
        batch.failed_doors()
    );
    let response = if batch.success() {
        CommandResponse::ok(summary)
    } else {
        CommandResponse::err(format!("{summary}\n{}", batch.errors.join("\n")))
    };
    response.with_report(batch)
}

struct TagDoorsInViewCommand;

impl CommandHandler for TagDoorsInViewCommand {
    fn name(&self) -> &'static str {
        "tag_doors_in_view"
    }

    fn execute(
        &self,
        request: &CommandRequest,
        context: &mut CommandContext<'_>,
    ) -> CommandResponse {
        let targets = match parse_targets(&request.args) {
            Ok(targets) if targets.len() == 1 => targets,
            Ok(_) => return CommandResponse::err("tag_doors_in_view 需要且仅需要一个目标"),
            Err(message) => return CommandResponse::err(message),
        };
        let batch = synchronize_targets(context.synchronizer, &mut *context.model, &targets);
        summarize(batch)
    }
}

struct TagDoorsInViewsCommand;

impl CommandHandler for TagDoorsInViewsCommand {
    fn name(&self) -> &'static str {
        "tag_doors_in_views"
    }

    fn execute(
        &self,
        request: &CommandRequest,
        context: &mut CommandContext<'_>,
    ) -> CommandResponse {
        let targets = match parse_targets(&request.args) {
            Ok(targets) if !targets.is_empty() => targets,
            Ok(_) => return CommandResponse::err("未选择任何视图"),
            Err(message) => return CommandResponse::err(message),
        };
        let batch = synchronize_targets(context.synchronizer, &mut *context.model, &targets);
        summarize(batch)
    }
}
