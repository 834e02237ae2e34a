//! 可序列化的内存宿主模型，实现全部边界接口。
//!
//! 用于 CLI、快照持久化与测试；标记状态保存在模型中，跨轮次保留。

use doortag_core::geometry::{Basis, Point3};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::errors::EngineError;
use crate::model::{
    AnnotationStore, CurtainCell, DoorElement, Edge, ElementId, ModelQuery, ParameterSet,
    TagRecord, TagState, TagType, ViewInfo, ViewKind, WallElement,
};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ViewRecord {
    pub id: ElementId,
    pub name: String,
    pub kind: ViewKind,
    #[serde(default = "ViewRecord::default_scale")]
    pub scale: u32,
    /// 视图中可见的门。
    #[serde(default)]
    pub doors: Vec<ElementId>,
    /// 仅图纸使用：放置在图纸上的视图。
    #[serde(default)]
    pub placed_views: Vec<ElementId>,
}

impl ViewRecord {
    fn default_scale() -> u32 {
        100
    }

    fn info(&self) -> ViewInfo {
        ViewInfo {
            id: self.id,
            name: self.name.clone(),
            kind: self.kind,
            scale: self.scale,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ComponentRecord {
    pub id: ElementId,
    #[serde(default)]
    pub location: Option<Point3>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TagInstance {
    pub id: ElementId,
    pub view: ElementId,
    pub tag_type: ElementId,
    pub tagged: Vec<ElementId>,
    pub head_position: Point3,
    #[serde(default)]
    pub rotation_angle: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PlanarRotation {
    pub element: ElementId,
    pub degrees: f64,
}

/// 示例模型中关键元素的 ID。
#[derive(Debug, Clone, Copy)]
pub struct DemoElements {
    pub plan: ElementId,
    pub section: ElementId,
    pub sheet: ElementId,
    pub hinged_door: ElementId,
    pub pivot_door: ElementId,
    pub sliding_door: ElementId,
    pub curtain_door: ElementId,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MemoryModel {
    #[serde(default)]
    views: Vec<ViewRecord>,
    #[serde(default)]
    walls: Vec<WallElement>,
    #[serde(default)]
    doors: Vec<DoorElement>,
    #[serde(default)]
    components: Vec<ComponentRecord>,
    #[serde(default)]
    generic_elements: Vec<ElementId>,
    #[serde(default)]
    tag_types: Vec<TagType>,
    #[serde(default)]
    tags: Vec<TagInstance>,
    #[serde(default)]
    planar_rotations: Vec<PlanarRotation>,
    #[serde(default)]
    next_element_id: u64,
}

impl MemoryModel {
    pub fn new() -> Self {
        Self::default()
    }

    fn max_element_id(&self) -> u64 {
        let ids = self
            .views
            .iter()
            .map(|view| view.id)
            .chain(self.walls.iter().map(|wall| wall.id))
            .chain(self.doors.iter().map(|door| door.id))
            .chain(self.components.iter().map(|component| component.id))
            .chain(self.generic_elements.iter().copied())
            .chain(self.tag_types.iter().map(|tag_type| tag_type.id))
            .chain(self.tags.iter().map(|tag| tag.id));
        ids.map(ElementId::get).max().unwrap_or(0)
    }

    /// 分配新 ID。反序列化的快照可能缺少计数器，因此总是越过现有最大 ID。
    fn next_id(&mut self) -> ElementId {
        let next = self
            .next_element_id
            .max(self.max_element_id().saturating_add(1));
        self.next_element_id = next.saturating_add(1);
        ElementId::new(next)
    }

    pub fn add_view(&mut self, name: impl Into<String>, kind: ViewKind, scale: u32) -> ElementId {
        let id = self.next_id();
        self.views.push(ViewRecord {
            id,
            name: name.into(),
            kind,
            scale,
            doors: Vec::new(),
            placed_views: Vec::new(),
        });
        id
    }

    pub fn add_sheet(&mut self, name: impl Into<String>) -> ElementId {
        self.add_view(name, ViewKind::Sheet, 1)
    }

    /// 将视图放置到图纸上；任一方不存在时忽略。
    pub fn place_view_on_sheet(&mut self, sheet: ElementId, view: ElementId) {
        if !self.views.iter().any(|record| record.id == view) {
            return;
        }
        if let Some(record) = self.views.iter_mut().find(|record| record.id == sheet) {
            if !record.placed_views.contains(&view) {
                record.placed_views.push(view);
            }
        }
    }

    /// 使门在视图中可见。
    pub fn show_door_in_view(&mut self, view: ElementId, door: ElementId) {
        if let Some(record) = self.views.iter_mut().find(|record| record.id == view) {
            if !record.doors.contains(&door) {
                record.doors.push(door);
            }
        }
    }

    pub fn add_wall(
        &mut self,
        family_name: impl Into<String>,
        type_parameters: ParameterSet,
    ) -> ElementId {
        let id = self.next_id();
        self.walls.push(WallElement {
            id,
            family_name: family_name.into(),
            type_parameters,
            curtain_cells: Vec::new(),
        });
        id
    }

    pub fn add_curtain_cell(&mut self, wall: ElementId, panel: ElementId, boundary: Vec<Edge>) {
        if let Some(record) = self.walls.iter_mut().find(|record| record.id == wall) {
            record.curtain_cells.push(CurtainCell { panel, boundary });
        }
    }

    pub fn add_component(&mut self, location: Option<Point3>) -> ElementId {
        let id = self.next_id();
        self.components.push(ComponentRecord { id, location });
        id
    }

    /// 非墙、非门的普通元素（例如楼板），用于宿主类型校验。
    pub fn add_generic_element(&mut self) -> ElementId {
        let id = self.next_id();
        self.generic_elements.push(id);
        id
    }

    /// 以传入的记录为模板新增门，`id` 字段会被重新分配。
    pub fn add_door(&mut self, mut door: DoorElement) -> ElementId {
        let id = self.next_id();
        door.id = id;
        self.doors.push(door);
        id
    }

    pub fn door_mut(&mut self, id: ElementId) -> Option<&mut DoorElement> {
        self.doors.iter_mut().find(|door| door.id == id)
    }

    pub fn add_tag_type(
        &mut self,
        name: impl Into<String>,
        base_width: f64,
        base_height: f64,
    ) -> ElementId {
        let id = self.next_id();
        self.tag_types.push(TagType {
            id,
            name: name.into(),
            base_width,
            base_height,
        });
        id
    }

    pub fn set_planar_rotation(&mut self, element: ElementId, degrees: f64) {
        match self.planar_rotations.iter_mut().find(|entry| entry.element == element) {
            Some(entry) => entry.degrees = degrees,
            None => self.planar_rotations.push(PlanarRotation { element, degrees }),
        }
    }

    pub fn tags(&self) -> impl Iterator<Item = &TagInstance> + '_ {
        self.tags.iter()
    }

    pub fn tag_mut(&mut self, id: ElementId) -> Option<&mut TagInstance> {
        self.tags.iter_mut().find(|tag| tag.id == id)
    }

    pub fn views(&self) -> impl Iterator<Item = &ViewRecord> + '_ {
        self.views.iter()
    }

    /// 构造一份小型示例平面：平开门、镜像地弹门、推拉门、幕墙门各一，另有剖面与图纸。
    pub fn populate_demo(&mut self) -> DemoElements {
        let plan = self.add_view("Level 1", ViewKind::FloorPlan, 100);
        let section = self.add_view("Section 1", ViewKind::Section, 50);
        let legend = self.add_view("Door Legend", ViewKind::Other, 50);
        let sheet = self.add_sheet("A101 - Plans");
        self.place_view_on_sheet(sheet, plan);
        self.place_view_on_sheet(sheet, section);
        self.place_view_on_sheet(sheet, legend);

        self.add_tag_type("Door Tag", 0.03, 0.015);

        let basic = self.add_wall("Basic Wall", ParameterSet::new().with_number("Width", 0.66));
        let angled = self.add_wall("Basic Wall", ParameterSet::new().with_number("Width", 0.5));
        self.set_planar_rotation(angled, 30.0);
        let curtain = self.add_wall("Curtain Wall", ParameterSet::new());

        let leaf_type = ParameterSet::new()
            .with_number("Width", 3.0)
            .with_number("Door Panel A Width", 2.8)
            .with_number("Thickness", 0.15)
            .with_number("Pivot Offset", 0.1)
            .with_number("Fixed Frame Depth", 0.3)
            .with_number("Fixed Frame", 0.0);

        let hinged_leaf = self.add_component(Some(Point3::new(10.0, 5.0, 0.0)));
        let hinged_door = self.add_door(DoorElement {
            id: ElementId::new(0),
            family_name: "Door-Single-Flush".to_string(),
            type_parameters: leaf_type.clone(),
            instance_parameters: ParameterSet::new(),
            basis: Basis::identity(),
            mirrored: false,
            location: Some(Point3::new(10.0, 5.0, 0.0)),
            host: Some(basic),
            plan_swing: Some("Hinged 45".to_string()),
            sub_components: vec![hinged_leaf],
        });

        let pivot_basis = Basis::from_rotation_degrees(30.0);
        let pivot_leaf = self.add_component(Some(Point3::new(20.0, 8.0, 0.0)));
        let pivot_door = self.add_door(DoorElement {
            id: ElementId::new(0),
            family_name: "Door-Single-Pivot".to_string(),
            type_parameters: leaf_type.clone(),
            instance_parameters: ParameterSet::new(),
            basis: pivot_basis,
            mirrored: true,
            location: Some(Point3::new(20.0, 8.0, 0.0)),
            host: Some(angled),
            plan_swing: Some("Pivot 135".to_string()),
            sub_components: vec![pivot_leaf],
        });

        let sliding_leaf = self.add_component(Some(Point3::new(30.0, 5.0, 0.0)));
        let sliding_door = self.add_door(DoorElement {
            id: ElementId::new(0),
            family_name: "Door-Double-Sliding".to_string(),
            type_parameters: leaf_type,
            instance_parameters: ParameterSet::new(),
            basis: Basis::identity(),
            mirrored: false,
            location: Some(Point3::new(30.0, 5.0, 0.0)),
            host: Some(basic),
            plan_swing: Some("Sliding".to_string()),
            sub_components: vec![sliding_leaf],
        });

        let curtain_leaf = self.add_component(Some(Point3::new(41.0, 12.0, 0.0)));
        let curtain_door = self.add_door(DoorElement {
            id: ElementId::new(0),
            family_name: "CW-Door-Single".to_string(),
            type_parameters: ParameterSet::new()
                .with_number("Thickness", 0.1)
                .with_number("Frame Depth", 0.4)
                .with_number("Door Frame Insert Dim", 0.1)
                .with_flag("Show Door Frame Insert", true),
            instance_parameters: ParameterSet::new().with_number("Width", 4.0),
            basis: Basis::identity(),
            mirrored: false,
            location: None,
            host: Some(curtain),
            plan_swing: Some("Hinged 180".to_string()),
            sub_components: vec![curtain_leaf],
        });
        let corner = |x: f64, z: f64| Point3::new(x, 12.0, z);
        self.add_curtain_cell(
            curtain,
            curtain_door,
            vec![
                Edge::new(corner(38.0, 0.0), corner(42.0, 0.0)),
                Edge::new(corner(42.0, 0.0), corner(42.0, 7.0)),
                Edge::new(corner(42.0, 7.0), corner(38.0, 7.0)),
                Edge::new(corner(38.0, 7.0), corner(38.0, 0.0)),
            ],
        );

        for door in [hinged_door, pivot_door, sliding_door, curtain_door] {
            self.show_door_in_view(plan, door);
        }
        self.show_door_in_view(section, sliding_door);

        let ids = DemoElements {
            plan,
            section,
            sheet,
            hinged_door,
            pivot_door,
            sliding_door,
            curtain_door,
        };

        debug!(
            plan = ids.plan.get(),
            sheet = ids.sheet.get(),
            doors = 4,
            "已创建演示模型"
        );

        ids
    }

    fn view_record(&self, id: ElementId) -> Option<&ViewRecord> {
        self.views.iter().find(|view| view.id == id)
    }
}

impl ModelQuery for MemoryModel {
    fn view(&self, id: ElementId) -> Option<ViewInfo> {
        self.view_record(id).map(ViewRecord::info)
    }

    fn views_on_sheet(&self, sheet: ElementId) -> Vec<ElementId> {
        self.view_record(sheet)
            .map(|record| record.placed_views.clone())
            .unwrap_or_default()
    }

    fn doors_in_view(&self, view: ElementId) -> Vec<ElementId> {
        self.view_record(view)
            .map(|record| record.doors.clone())
            .unwrap_or_default()
    }

    fn door(&self, id: ElementId) -> Option<DoorElement> {
        self.doors.iter().find(|door| door.id == id).cloned()
    }

    fn wall(&self, id: ElementId) -> Option<WallElement> {
        self.walls.iter().find(|wall| wall.id == id).cloned()
    }

    fn contains_element(&self, id: ElementId) -> bool {
        self.views.iter().any(|view| view.id == id)
            || self.walls.iter().any(|wall| wall.id == id)
            || self.doors.iter().any(|door| door.id == id)
            || self.components.iter().any(|component| component.id == id)
            || self.generic_elements.contains(&id)
            || self.tag_types.iter().any(|tag_type| tag_type.id == id)
            || self.tags.iter().any(|tag| tag.id == id)
    }

    fn component_location(&self, id: ElementId) -> Option<Point3> {
        self.components
            .iter()
            .find(|component| component.id == id)
            .and_then(|component| component.location)
    }

    fn door_tag_types(&self) -> Vec<TagType> {
        self.tag_types.clone()
    }

    fn planar_rotation(&self, element: ElementId) -> f64 {
        self.planar_rotations
            .iter()
            .find(|entry| entry.element == element)
            .map(|entry| entry.degrees)
            .unwrap_or(0.0)
    }
}

impl AnnotationStore for MemoryModel {
    fn tags_in_view(&self, view: ElementId) -> Vec<TagRecord> {
        self.tags
            .iter()
            .filter(|tag| tag.view == view)
            .map(|tag| TagRecord {
                id: tag.id,
                tagged: tag.tagged.clone(),
            })
            .collect()
    }

    fn tag_state(&self, tag: ElementId) -> Option<TagState> {
        self.tags.iter().find(|instance| instance.id == tag).map(|instance| TagState {
            head_position: instance.head_position,
            rotation_angle: instance.rotation_angle,
        })
    }

    fn create_tag(
        &mut self,
        view: ElementId,
        tag_type: ElementId,
        door: ElementId,
        head: Point3,
    ) -> Result<ElementId, EngineError> {
        if self.view_record(view).is_none() {
            return Err(EngineError::ViewNotFound(view));
        }
        if !self.doors.iter().any(|record| record.id == door) {
            return Err(EngineError::TagCreationFailed(door));
        }
        let id = self.next_id();
        self.tags.push(TagInstance {
            id,
            view,
            tag_type,
            tagged: vec![door],
            head_position: head,
            rotation_angle: 0.0,
        });
        Ok(id)
    }

    fn set_tag_head(&mut self, tag: ElementId, head: Point3) -> Result<(), EngineError> {
        let instance = self.tag_mut(tag).ok_or(EngineError::TagNotFound(tag))?;
        instance.head_position = head;
        Ok(())
    }

    fn rotate_tag(
        &mut self,
        tag: ElementId,
        pivot: Point3,
        radians: f64,
    ) -> Result<(), EngineError> {
        let instance = self.tag_mut(tag).ok_or(EngineError::TagNotFound(tag))?;
        instance.head_position = instance
            .head_position
            .rotate_about_vertical(pivot, radians.to_degrees());
        instance.rotation_angle += radians;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ids_are_unique_and_monotonic() {
        let mut model = MemoryModel::new();
        let view = model.add_view("Plan", ViewKind::FloorPlan, 100);
        let wall = model.add_wall("Basic Wall", ParameterSet::new());
        let element = model.add_generic_element();
        assert!(view < wall && wall < element);
        assert!(model.contains_element(wall));
        assert!(!model.contains_element(ElementId::new(999)));
    }

    #[test]
    fn ids_skip_past_existing_records_after_deserialisation() {
        let mut model = MemoryModel::new();
        model.add_view("Plan", ViewKind::FloorPlan, 100);
        let last = model.add_view("Plan 2", ViewKind::FloorPlan, 100);
        model.next_element_id = 0;
        let next = model.add_generic_element();
        assert_eq!(next.get(), last.get() + 1);
    }

    #[test]
    fn id_allocation_saturates_at_largest_id() {
        let mut model = MemoryModel::new();
        model.generic_elements.push(ElementId::new(u64::MAX));
        let next = model.add_generic_element();
        assert_eq!(next.get(), u64::MAX);
        assert_eq!(model.next_element_id, u64::MAX);
    }

    #[test]
    fn rotate_tag_moves_head_and_accumulates_angle() {
        let mut model = MemoryModel::new();
        let demo = model.populate_demo();
        let tag_type = model.door_tag_types()[0].id;
        let tag = model
            .create_tag(demo.plan, tag_type, demo.hinged_door, Point3::new(1.0, 0.0, 0.0))
            .expect("create tag");

        model
            .rotate_tag(tag, Point3::origin(), std::f64::consts::FRAC_PI_2)
            .expect("rotate");
        let state = model.tag_state(tag).expect("state");
        assert!(state.head_position.distance_to(Point3::new(0.0, 1.0, 0.0)) < 1e-12);
        assert!((state.rotation_angle - std::f64::consts::FRAC_PI_2).abs() < 1e-12);
    }

    #[test]
    fn tag_creation_requires_existing_view_and_door() {
        let mut model = MemoryModel::new();
        let demo = model.populate_demo();
        let tag_type = model.door_tag_types()[0].id;
        assert!(matches!(
            model.create_tag(ElementId::new(999), tag_type, demo.hinged_door, Point3::origin()),
            Err(EngineError::ViewNotFound(_))
        ));
        assert!(matches!(
            model.create_tag(demo.plan, tag_type, demo.plan, Point3::origin()),
            Err(EngineError::TagCreationFailed(_))
        ));
    }

    #[test]
    fn demo_sheet_holds_views() {
        let mut model = MemoryModel::new();
        let demo = model.populate_demo();
        let placed = model.views_on_sheet(demo.sheet);
        assert_eq!(placed.len(), 3);
        assert!(placed.contains(&demo.plan));
        assert_eq!(model.doors_in_view(demo.plan).len(), 4);
        assert_eq!(model.doors_in_view(demo.section), vec![demo.sliding_door]);
    }
}
