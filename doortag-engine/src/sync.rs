//! 门标记同步状态机。
//!
//! 每一轮都从当前模型重新推导期望状态，与现有标记比较：
//! 无标记则创建，超出容差则复位后重放旋转序列，否则不做任何修改。

use std::collections::HashMap;

use doortag_core::geometry::{Point3, wrap_angle};
use doortag_core::placement::{PlacementSettings, TagDimensions, TagPlacement, calculate_placement};
use doortag_core::rotation::RotationPlan;
use doortag_core::swing::SwingDescriptor;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::errors::EngineError;
use crate::extract::{extract_door_geometry, nested_panel_location};
use crate::model::{
    DoorElement, ElementId, HostModel, ModelQuery, TagRecord, TagState, TagType, ViewInfo,
};

pub const NO_DOORS_MESSAGE: &str = "No doors found in current view";
pub const NO_TAG_TYPE_MESSAGE: &str = "No door tag type found";

/// 复位时小于该值（弧度）的残余角度保持不动。
const RESET_THRESHOLD: f64 = 0.001;

/// 现有标记与期望状态的比较容差。
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SyncTolerance {
    /// 模型长度单位。
    pub position: f64,
    /// 弧度。
    pub rotation: f64,
}

impl Default for SyncTolerance {
    fn default() -> Self {
        Self {
            position: 0.001,
            rotation: 0.001,
        }
    }
}

impl SyncTolerance {
    /// 位置或角度任一严格超出容差即需要更新。
    pub fn needs_update(&self, live: &TagState, desired: &DesiredTag) -> bool {
        let position_delta = live.head_position.distance_to(desired.final_position());
        let rotation_delta =
            wrap_angle(live.rotation_angle - desired.final_rotation_radians()).abs();
        position_delta > self.position || rotation_delta > self.rotation
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum SyncOutcome {
    Created,
    Updated,
    Unchanged,
    Failed(String),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FailedDoor {
    pub door: ElementId,
    pub message: String,
}

/// 单个视图一轮同步的汇总。
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SyncReport {
    pub view: ElementId,
    pub view_name: String,
    pub success: bool,
    pub error_message: Option<String>,
    pub created: usize,
    pub updated: usize,
    pub unchanged: usize,
    pub failed: Vec<FailedDoor>,
}

impl SyncReport {
    fn new(view: &ViewInfo) -> Self {
        Self {
            view: view.id,
            view_name: view.name.clone(),
            success: true,
            error_message: None,
            created: 0,
            updated: 0,
            unchanged: 0,
            failed: Vec::new(),
        }
    }

    fn precondition_failed(mut self, message: &str) -> Self {
        self.success = false;
        self.error_message = Some(message.to_string());
        self
    }

    fn record(&mut self, door: ElementId, outcome: SyncOutcome) {
        match outcome {
            SyncOutcome::Created => self.created += 1,
            SyncOutcome::Updated => self.updated += 1,
            SyncOutcome::Unchanged => self.unchanged += 1,
            SyncOutcome::Failed(message) => self.failed.push(FailedDoor { door, message }),
        }
    }

    /// 形如 "Door ID 12: <原因>" 的失败描述。
    pub fn failed_items(&self) -> Vec<String> {
        self.failed
            .iter()
            .map(|item| format!("Door ID {}: {}", item.door, item.message))
            .collect()
    }

    /// 本轮是否修改了模型。
    pub fn changed_anything(&self) -> bool {
        self.created + self.updated > 0
    }
}

/// 某扇门的期望标记：旋转前锚点及完整旋转方案。
#[derive(Debug, Clone, PartialEq)]
pub struct DesiredTag {
    pub placement: TagPlacement,
    pub plan: RotationPlan,
}

impl DesiredTag {
    #[inline]
    pub fn anchor_position(&self) -> Point3 {
        self.placement.anchor_position
    }

    #[inline]
    pub fn final_position(&self) -> Point3 {
        self.plan.final_position
    }

    #[inline]
    pub fn final_rotation_radians(&self) -> f64 {
        self.plan.final_rotation_radians()
    }
}

#[derive(Debug, Clone, Default)]
pub struct TagSynchronizer {
    settings: PlacementSettings,
    tolerance: SyncTolerance,
}

impl TagSynchronizer {
    pub fn new(settings: PlacementSettings, tolerance: SyncTolerance) -> Self {
        Self { settings, tolerance }
    }

    #[inline]
    pub fn settings(&self) -> &PlacementSettings {
        &self.settings
    }

    #[inline]
    pub fn tolerance(&self) -> &SyncTolerance {
        &self.tolerance
    }

    /// 对视图中的每扇门执行一次同步。
    pub fn synchronize_view<M: HostModel + ?Sized>(
        &self,
        model: &mut M,
        view: &ViewInfo,
    ) -> SyncReport {
        let report = SyncReport::new(view);

        let doors = model.doors_in_view(view.id);
        if doors.is_empty() {
            warn!(view = %view.name, "视图中没有门");
            return report.precondition_failed(NO_DOORS_MESSAGE);
        }
        let Some(tag_type) = select_tag_type(model.door_tag_types()) else {
            warn!(view = %view.name, "模型中没有门标记类型");
            return report.precondition_failed(NO_TAG_TYPE_MESSAGE);
        };

        let existing = index_existing_tags(&model.tags_in_view(view.id));
        let dimensions =
            TagDimensions::from_base(tag_type.base_width, tag_type.base_height, view.scale);

        let report = doors.into_iter().fold(report, |mut report, door| {
            let live = existing.get(&door).copied();
            let outcome = self
                .synchronize_door(model, view, &tag_type, &dimensions, live, door)
                .unwrap_or_else(|err| {
                    warn!(door = door.get(), error = %err, "门标记同步失败");
                    SyncOutcome::Failed(err.to_string())
                });
            report.record(door, outcome);
            report
        });

        info!(
            view = %view.name,
            created = report.created,
            updated = report.updated,
            unchanged = report.unchanged,
            failed = report.failed.len(),
            "视图同步完成"
        );
        report
    }

    fn synchronize_door<M: HostModel + ?Sized>(
        &self,
        model: &mut M,
        view: &ViewInfo,
        tag_type: &TagType,
        dimensions: &TagDimensions,
        existing_tag: Option<ElementId>,
        door_id: ElementId,
    ) -> Result<SyncOutcome, EngineError> {
        let door = model.door(door_id).ok_or(EngineError::DoorNotFound(door_id))?;
        let desired = self.desired_state(&*model, &door, dimensions, view.scale)?;

        let Some(tag) = existing_tag else {
            let tag = model.create_tag(view.id, tag_type.id, door.id, desired.anchor_position())?;
            apply_plan(model, tag, &desired.plan)?;
            debug!(door = door.id.get(), tag = tag.get(), "已创建门标记");
            return Ok(SyncOutcome::Created);
        };

        let live = model.tag_state(tag).ok_or(EngineError::TagNotFound(tag))?;
        if !self.tolerance.needs_update(&live, &desired) {
            debug!(door = door.id.get(), tag = tag.get(), "门标记无需更新");
            return Ok(SyncOutcome::Unchanged);
        }

        reset_rotation(model, tag, &live)?;
        model.set_tag_head(tag, desired.anchor_position())?;
        apply_plan(model, tag, &desired.plan)?;
        debug!(door = door.id.get(), tag = tag.get(), "已更新门标记");
        Ok(SyncOutcome::Updated)
    }

    /// 从当前模型状态推导某扇门的期望标记，不修改任何内容。
    pub fn desired_state<M: ModelQuery + ?Sized>(
        &self,
        model: &M,
        door: &DoorElement,
        dimensions: &TagDimensions,
        view_scale: u32,
    ) -> Result<DesiredTag, EngineError> {
        let geometry = extract_door_geometry(model, door)?;
        let panel_location = nested_panel_location(model, door)?;
        let swing = SwingDescriptor::parse(door.plan_swing.as_deref());

        let placement = calculate_placement(
            &geometry,
            panel_location,
            swing,
            dimensions,
            view_scale,
            &self.settings,
        );

        let host_rotation = door
            .host
            .map(|host| model.planar_rotation(host))
            .unwrap_or(0.0);
        let plan = RotationPlan::compose(&placement, host_rotation, geometry.mirrored);

        debug!(
            door = door.id.get(),
            swing = %swing,
            host_rotation,
            steps = plan.steps.len(),
            "已计算期望标记"
        );
        Ok(DesiredTag { placement, plan })
    }
}

/// 取 ID 最大（最近载入）的门标记类型。
fn select_tag_type(types: Vec<TagType>) -> Option<TagType> {
    types.into_iter().max_by_key(|tag_type| tag_type.id)
}

/// 门 → 标记索引；同一扇门有多个标记时只保留先出现的一个。
fn index_existing_tags(tags: &[TagRecord]) -> HashMap<ElementId, ElementId> {
    let mut index = HashMap::new();
    for tag in tags {
        for door in &tag.tagged {
            index.entry(*door).or_insert(tag.id);
        }
    }
    index
}

/// 绕自身头部反向旋转，回到零旋转基线。
fn reset_rotation<M: HostModel + ?Sized>(
    model: &mut M,
    tag: ElementId,
    live: &TagState,
) -> Result<(), EngineError> {
    if live.rotation_angle.abs() > RESET_THRESHOLD {
        model.rotate_tag(tag, live.head_position, -live.rotation_angle)?;
    }
    Ok(())
}

fn apply_plan<M: HostModel + ?Sized>(
    model: &mut M,
    tag: ElementId,
    plan: &RotationPlan,
) -> Result<(), EngineError> {
    for step in &plan.steps {
        model.rotate_tag(tag, step.pivot, step.radians())?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use doortag_core::geometry::{Basis, Vector3};

    use super::*;
    use crate::memory::{DemoElements, MemoryModel};
    use crate::model::{AnnotationStore, ParameterSet, ViewKind};

    fn demo() -> (MemoryModel, DemoElements, ViewInfo) {
        let mut model = MemoryModel::new();
        let demo = model.populate_demo();
        let view = model.view(demo.plan).expect("plan view");
        (model, demo, view)
    }

    fn tag_for(model: &MemoryModel, door: ElementId) -> ElementId {
        model
            .tags()
            .find(|tag| tag.tagged.contains(&door))
            .map(|tag| tag.id)
            .expect("tag for door")
    }

    #[test]
    fn first_pass_creates_and_second_pass_is_idempotent() {
        let (mut model, _, view) = demo();
        let synchronizer = TagSynchronizer::default();

        let first = synchronizer.synchronize_view(&mut model, &view);
        assert!(first.success);
        assert_eq!(first.created, 4);
        assert!(first.failed.is_empty(), "{:?}", first.failed_items());

        let snapshot = model.clone();
        let second = synchronizer.synchronize_view(&mut model, &view);
        assert!(second.success);
        assert_eq!(second.created, 0);
        assert_eq!(second.updated, 0);
        assert_eq!(second.unchanged, 4);
        assert!(!second.changed_anything());
        assert_eq!(model, snapshot);
    }

    #[test]
    fn created_tag_matches_rotation_preview() {
        let (mut model, demo, view) = demo();
        let synchronizer = TagSynchronizer::default();
        synchronizer.synchronize_view(&mut model, &view);

        let door = model.door(demo.hinged_door).expect("door");
        let tag_type = model.door_tag_types()[0].clone();
        let dims = TagDimensions::from_base(tag_type.base_width, tag_type.base_height, view.scale);
        let desired = synchronizer
            .desired_state(&model, &door, &dims, view.scale)
            .expect("desired");

        let state = model.tag_state(tag_for(&model, demo.hinged_door)).expect("state");
        assert!(state.head_position.distance_to(desired.final_position()) < 1e-9);
        assert!((state.rotation_angle - desired.final_rotation_radians()).abs() < 1e-9);
        // "Hinged 45"：90° 初始转角 + 45° 开启修正
        assert!((desired.plan.final_rotation_degrees - 135.0).abs() < 1e-9);
    }

    #[test]
    fn position_tolerance_boundary() {
        let (mut model, demo, view) = demo();
        let synchronizer = TagSynchronizer::default();
        synchronizer.synchronize_view(&mut model, &view);
        let tag = tag_for(&model, demo.sliding_door);

        let original = model.tag_state(tag).expect("state").head_position;
        model.tag_mut(tag).expect("tag").head_position = original + Vector3::new(0.0009, 0.0, 0.0);
        let report = synchronizer.synchronize_view(&mut model, &view);
        assert_eq!(report.updated, 0);
        assert_eq!(report.unchanged, 4);

        model.tag_mut(tag).expect("tag").head_position = original + Vector3::new(0.0011, 0.0, 0.0);
        let report = synchronizer.synchronize_view(&mut model, &view);
        assert_eq!(report.updated, 1);
        assert_eq!(report.unchanged, 3);
        let restored = model.tag_state(tag).expect("state").head_position;
        assert!(restored.distance_to(original) < 1e-9);
    }

    #[test]
    fn rotation_tolerance_boundary() {
        let (mut model, demo, view) = demo();
        let synchronizer = TagSynchronizer::default();
        synchronizer.synchronize_view(&mut model, &view);
        let tag = tag_for(&model, demo.pivot_door);
        let original = model.tag_state(tag).expect("state");

        model.tag_mut(tag).expect("tag").rotation_angle = original.rotation_angle + 0.0009;
        let report = synchronizer.synchronize_view(&mut model, &view);
        assert_eq!(report.updated, 0);

        model.tag_mut(tag).expect("tag").rotation_angle = original.rotation_angle + 0.0011;
        let report = synchronizer.synchronize_view(&mut model, &view);
        assert_eq!(report.updated, 1);

        let repaired = model.tag_state(tag).expect("state");
        assert!((repaired.rotation_angle - original.rotation_angle).abs() < 1e-9);
        assert!(repaired.head_position.distance_to(original.head_position) < 1e-9);
    }

    #[test]
    fn small_residual_rotation_is_not_reset() {
        let (mut model, demo, view) = demo();
        let synchronizer = TagSynchronizer::default();
        synchronizer.synchronize_view(&mut model, &view);
        let tag = tag_for(&model, demo.sliding_door);
        let original = model.tag_state(tag).expect("state");
        assert!(original.rotation_angle.abs() < 1e-12);

        // 角度残差在容差内，由位置偏移触发更新
        let moved = original.head_position + Vector3::new(0.01, 0.0, 0.0);
        {
            let instance = model.tag_mut(tag).expect("tag");
            instance.rotation_angle = 0.0005;
            instance.head_position = moved;
        }
        let report = synchronizer.synchronize_view(&mut model, &view);
        assert_eq!(report.updated, 1);
        let kept = model.tag_state(tag).expect("state");
        assert!((kept.rotation_angle - 0.0005).abs() < 1e-12);
        assert!(kept.head_position.distance_to(original.head_position) < 1e-9);

        {
            let instance = model.tag_mut(tag).expect("tag");
            instance.rotation_angle = 0.0011;
            instance.head_position = moved;
        }
        let report = synchronizer.synchronize_view(&mut model, &view);
        assert_eq!(report.updated, 1);
        let reset = model.tag_state(tag).expect("state");
        assert!(wrap_angle(reset.rotation_angle - original.rotation_angle).abs() < 1e-9);
        assert!(reset.head_position.distance_to(original.head_position) < 1e-9);
    }

    #[test]
    fn full_turn_difference_is_not_a_change() {
        let (mut model, demo, view) = demo();
        let synchronizer = TagSynchronizer::default();
        synchronizer.synchronize_view(&mut model, &view);
        let tag = tag_for(&model, demo.hinged_door);

        model.tag_mut(tag).expect("tag").rotation_angle += std::f64::consts::TAU;
        let report = synchronizer.synchronize_view(&mut model, &view);
        assert_eq!(report.unchanged, 4);
    }

    #[test]
    fn moved_door_is_updated_from_zero_baseline() {
        let (mut model, demo, view) = demo();
        let synchronizer = TagSynchronizer::default();
        synchronizer.synchronize_view(&mut model, &view);

        let leaf = model.door(demo.hinged_door).expect("door").sub_components[0];
        let fresh = model.add_component(Some(Point3::new(12.0, 5.0, 0.0)));
        let door = model.door_mut(demo.hinged_door).expect("door");
        door.location = Some(Point3::new(12.0, 5.0, 0.0));
        door.sub_components = vec![fresh];
        assert_ne!(leaf, fresh);

        let report = synchronizer.synchronize_view(&mut model, &view);
        assert_eq!(report.updated, 1);
        assert_eq!(report.unchanged, 3);

        let again = synchronizer.synchronize_view(&mut model, &view);
        assert_eq!(again.unchanged, 4);
    }

    #[test]
    fn one_bad_door_does_not_abort_the_pass() {
        let (mut model, demo, view) = demo();
        model.door_mut(demo.pivot_door).expect("door").sub_components.clear();

        let report = TagSynchronizer::default().synchronize_view(&mut model, &view);
        assert!(report.success);
        assert_eq!(report.created, 3);
        assert_eq!(report.failed.len(), 1);
        assert_eq!(report.failed[0].door, demo.pivot_door);
        assert_eq!(
            report.failed_items(),
            vec![format!("Door ID {}: Could not determine door panel location", demo.pivot_door)]
        );
    }

    #[test]
    fn pass_level_preconditions() {
        let mut model = MemoryModel::new();
        let empty = model.add_view("Empty", ViewKind::FloorPlan, 100);
        let view = model.view(empty).expect("view");
        let report = TagSynchronizer::default().synchronize_view(&mut model, &view);
        assert!(!report.success);
        assert_eq!(report.error_message.as_deref(), Some(NO_DOORS_MESSAGE));

        let wall = model.add_wall("Basic Wall", ParameterSet::new());
        let door = model.add_door(DoorElement {
            id: ElementId::new(0),
            family_name: "Door".to_string(),
            type_parameters: ParameterSet::new(),
            instance_parameters: ParameterSet::new(),
            basis: Basis::identity(),
            mirrored: false,
            location: Some(Point3::origin()),
            host: Some(wall),
            plan_swing: None,
            sub_components: Vec::new(),
        });
        model.show_door_in_view(empty, door);
        let report = TagSynchronizer::default().synchronize_view(&mut model, &view);
        assert!(!report.success);
        assert_eq!(report.error_message.as_deref(), Some(NO_TAG_TYPE_MESSAGE));
        assert_eq!(model.tags().count(), 0);
    }

    #[test]
    fn highest_tag_type_id_wins() {
        let (mut model, demo, view) = demo();
        let newer = model.add_tag_type("Door Tag Large", 0.05, 0.02);
        TagSynchronizer::default().synchronize_view(&mut model, &view);
        let tag = tag_for(&model, demo.hinged_door);
        let instance = model.tags().find(|instance| instance.id == tag).expect("tag");
        assert_eq!(instance.tag_type, newer);
    }

    #[test]
    fn only_first_tag_per_door_is_reconciled() {
        let (mut model, demo, view) = demo();
        let synchronizer = TagSynchronizer::default();
        let tag_type = model.door_tag_types()[0].id;
        let first = model
            .create_tag(view.id, tag_type, demo.sliding_door, Point3::origin())
            .expect("first");
        let second = model
            .create_tag(view.id, tag_type, demo.sliding_door, Point3::origin())
            .expect("second");

        let report = synchronizer.synchronize_view(&mut model, &view);
        assert_eq!(report.updated, 1);
        assert_eq!(report.created, 3);
        assert_ne!(model.tag_state(first).expect("first").head_position, Point3::origin());
        assert_eq!(model.tag_state(second).expect("second").head_position, Point3::origin());
    }
}
