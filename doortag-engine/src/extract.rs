//! 门几何提取：按宿主族类型选择参数名，生成 `DoorGeometry`。

use doortag_core::door::{CurtainPanelInputs, DoorGeometry, HostFamilyKind, curtain_panel_width};
use doortag_core::geometry::{Point3, Vector3};
use tracing::{debug, warn};

use crate::errors::EngineError;
use crate::model::{DoorElement, Edge, ModelQuery, WallElement};

const WIDTH: &str = "Width";
const THICKNESS: &str = "Thickness";
const PIVOT_OFFSET: &str = "Pivot Offset";
const PANEL_A_WIDTH: &str = "Door Panel A Width";
const PANEL_B_WIDTH: &str = "Door Panel B Width";
const FRAME_INSERT_DIM: &str = "Door Frame Insert Dim";
const FRAME_INSERT_FLAG: &str = "Show Door Frame Insert";

const VERTICAL_TOLERANCE: f64 = 1e-9;

/// 解析门的宿主墙并提取几何记录。
pub fn extract_door_geometry<M: ModelQuery + ?Sized>(
    model: &M,
    door: &DoorElement,
) -> Result<DoorGeometry, EngineError> {
    let host = door.host.ok_or(EngineError::HostNotFound(door.id))?;
    let Some(wall) = model.wall(host) else {
        return Err(if model.contains_element(host) {
            EngineError::HostNotWall(host)
        } else {
            EngineError::HostNotFound(door.id)
        });
    };
    geometry_from_records(door, &wall)
}

/// 由门与宿主墙快照计算几何记录。可选参数缺失时取 0/false，缺少定位点则失败。
pub fn geometry_from_records(
    door: &DoorElement,
    wall: &WallElement,
) -> Result<DoorGeometry, EngineError> {
    let kind = HostFamilyKind::from_family_name(&wall.family_name);
    let table = kind.parameters();
    let symbol = &door.type_parameters;

    let total_width = if table.width_from_instance {
        door.instance_parameters.double(WIDTH)
    } else {
        symbol.double(WIDTH)
    };

    let (panel_width, panel_location) = if kind.is_curtain() {
        let inputs = CurtainPanelInputs {
            instance_width: door.instance_parameters.double(WIDTH),
            frame_insert: symbol
                .flag(FRAME_INSERT_FLAG)
                .then(|| symbol.double(FRAME_INSERT_DIM)),
            sibling_panel_width: symbol.double(PANEL_B_WIDTH),
        };
        (
            curtain_panel_width(&door.family_name, inputs),
            curtain_cell_centroid(door, wall)?,
        )
    } else {
        (
            symbol.double(PANEL_A_WIDTH),
            door.location.ok_or(EngineError::LocationUnavailable(door.id))?,
        )
    };

    let host_wall_width = if table.reads_host_width {
        wall.type_parameters.double(WIDTH)
    } else {
        0.0
    };

    let geometry = DoorGeometry {
        total_width,
        panel_width,
        thickness: symbol.double(THICKNESS),
        frame_depth: symbol.double(table.frame_depth),
        pivot_offset: symbol.double(PIVOT_OFFSET),
        host_wall_width,
        mirrored: door.mirrored,
        has_fixed_frame: symbol.flag(table.fixed_frame_flag),
        panel_location,
        family_name: door.family_name.clone(),
        basis: door.basis,
    };

    if !geometry.is_consistent() {
        warn!(
            door = door.id.get(),
            panel_width = geometry.panel_width,
            total_width = geometry.total_width,
            thickness = geometry.thickness,
            "门几何参数不一致，仍按现值放置"
        );
    }
    debug!(door = door.id.get(), host = ?kind, "已提取门几何");

    Ok(geometry)
}

/// 幕墙门所在网格单元竖向边起点的平均值。
fn curtain_cell_centroid(door: &DoorElement, wall: &WallElement) -> Result<Point3, EngineError> {
    let cell = wall
        .curtain_cells
        .iter()
        .find(|cell| cell.panel == door.id)
        .ok_or(EngineError::CurtainCellNotFound(door.id))?;

    let starts = cell
        .boundary
        .iter()
        .filter(|edge| is_vertical(edge))
        .map(|edge| edge.start);
    Point3::centroid(starts).ok_or(EngineError::CurtainCellNotFound(door.id))
}

fn is_vertical(edge: &Edge) -> bool {
    (edge.end - edge.start)
        .normalize()
        .is_some_and(|direction| {
            direction
                .abs()
                .is_almost_equal(Vector3::unit_z(), VERTICAL_TOLERANCE)
        })
}

/// 嵌套门扇中沿门 X 轴投影最远的一个的位置，作为铰点计算基准。
pub fn nested_panel_location<M: ModelQuery + ?Sized>(
    model: &M,
    door: &DoorElement,
) -> Result<Point3, EngineError> {
    let axis = door.basis.x;
    let mut furthest: Option<(f64, Point3)> = None;

    for component in &door.sub_components {
        let Some(location) = model.component_location(*component) else {
            continue;
        };
        let projection = Vector3::from(location.as_vec3()).dot(axis);
        match furthest {
            Some((best, _)) if projection <= best => {}
            _ => furthest = Some((projection, location)),
        }
    }

    furthest
        .map(|(_, location)| location)
        .ok_or(EngineError::PanelLocationUnavailable)
}

#[cfg(test)]
mod tests {
    use doortag_core::geometry::Basis;

    use super::*;
    use crate::memory::MemoryModel;
    use crate::model::{CurtainCell, ElementId, ParameterSet};

    fn door(id: u64) -> DoorElement {
        DoorElement {
            id: ElementId::new(id),
            family_name: "Door-Single-Flush".to_string(),
            type_parameters: ParameterSet::new()
                .with_number(WIDTH, 3.0)
                .with_number(PANEL_A_WIDTH, 2.8)
                .with_number(THICKNESS, 0.15)
                .with_number(PIVOT_OFFSET, 0.1)
                .with_number("Fixed Frame Depth", 0.3)
                .with_number("Frame Depth", 0.9)
                .with_number("Fixed Frame", 1.0),
            instance_parameters: ParameterSet::new(),
            basis: Basis::identity(),
            mirrored: true,
            location: Some(Point3::new(4.0, 5.0, 0.0)),
            host: Some(ElementId::new(1)),
            plan_swing: Some("Hinged 90".to_string()),
            sub_components: Vec::new(),
        }
    }

    fn wall(family: &str) -> WallElement {
        WallElement {
            id: ElementId::new(1),
            family_name: family.to_string(),
            type_parameters: ParameterSet::new().with_number(WIDTH, 0.66),
            curtain_cells: Vec::new(),
        }
    }

    fn curtain_cell(panel: ElementId) -> CurtainCell {
        let corner = |x: f64, z: f64| Point3::new(x, 2.0, z);
        CurtainCell {
            panel,
            boundary: vec![
                Edge::new(corner(0.0, 0.0), corner(4.0, 0.0)),
                Edge::new(corner(4.0, 0.0), corner(4.0, 8.0)),
                Edge::new(corner(4.0, 8.0), corner(0.0, 8.0)),
                Edge::new(corner(0.0, 8.0), corner(0.0, 0.0)),
            ],
        }
    }

    #[test]
    fn basic_wall_reads_type_parameters_and_host_width() {
        let geometry = geometry_from_records(&door(10), &wall("Basic Wall")).expect("geometry");
        assert!((geometry.total_width - 3.0).abs() < f64::EPSILON);
        assert!((geometry.panel_width - 2.8).abs() < f64::EPSILON);
        assert!((geometry.frame_depth - 0.3).abs() < f64::EPSILON);
        assert!((geometry.host_wall_width - 0.66).abs() < f64::EPSILON);
        assert!((geometry.pivot_offset - 0.1).abs() < f64::EPSILON);
        assert!(geometry.has_fixed_frame);
        assert!(geometry.mirrored);
        assert_eq!(geometry.panel_location, Point3::new(4.0, 5.0, 0.0));
    }

    #[test]
    fn non_basic_opaque_host_has_zero_wall_width() {
        let geometry = geometry_from_records(&door(10), &wall("Stacked Wall")).expect("geometry");
        assert_eq!(geometry.host_wall_width, 0.0);
        assert!((geometry.frame_depth - 0.3).abs() < f64::EPSILON);
    }

    #[test]
    fn missing_location_is_a_hard_failure() {
        let mut element = door(10);
        element.location = None;
        let err = geometry_from_records(&element, &wall("Basic Wall")).unwrap_err();
        assert!(matches!(err, EngineError::LocationUnavailable(id) if id.get() == 10));
    }

    #[test]
    fn curtain_host_uses_cell_centroid_and_instance_width() {
        let mut element = door(20);
        element.family_name = "CW-Door-Double".to_string();
        element.location = None;
        element.instance_parameters = ParameterSet::new().with_number(WIDTH, 6.0);
        element.type_parameters = element
            .type_parameters
            .clone()
            .with_number("Fixed Frame", 0.0)
            .with_flag(FRAME_INSERT_FLAG, true)
            .with_number(FRAME_INSERT_DIM, 0.1);

        let mut host = wall("Curtain Wall");
        host.curtain_cells.push(curtain_cell(ElementId::new(99)));
        host.curtain_cells.push(curtain_cell(element.id));

        let geometry = geometry_from_records(&element, &host).expect("geometry");
        assert!((geometry.total_width - 6.0).abs() < f64::EPSILON);
        assert!((geometry.panel_width - 2.9).abs() < 1e-12);
        assert!((geometry.frame_depth - 0.9).abs() < f64::EPSILON);
        assert_eq!(geometry.host_wall_width, 0.0);
        assert!(geometry.has_fixed_frame);
        // 竖向边起点 (4,2,0) 与 (0,2,8) 的平均值
        assert!(geometry.panel_location.distance_to(Point3::new(2.0, 2.0, 4.0)) < 1e-12);
    }

    #[test]
    fn curtain_door_without_cell_fails() {
        let element = door(20);
        let err = geometry_from_records(&element, &wall("Curtain Wall")).unwrap_err();
        assert!(matches!(err, EngineError::CurtainCellNotFound(_)));
    }

    #[test]
    fn host_lookup_distinguishes_missing_and_non_wall_hosts() {
        let mut model = MemoryModel::new();
        let floor = model.add_generic_element();
        let mut element = door(30);
        element.host = None;
        assert!(matches!(
            extract_door_geometry(&model, &element),
            Err(EngineError::HostNotFound(_))
        ));

        element.host = Some(floor);
        assert!(matches!(
            extract_door_geometry(&model, &element),
            Err(EngineError::HostNotWall(id)) if id == floor
        ));
    }

    #[test]
    fn nested_panel_is_furthest_along_door_x_axis() {
        let mut model = MemoryModel::new();
        let left = model.add_component(Some(Point3::new(1.0, 9.0, 0.0)));
        let right = model.add_component(Some(Point3::new(3.0, -9.0, 0.0)));
        let unplaced = model.add_component(None);

        let mut element = door(40);
        element.sub_components = vec![left, unplaced, right];
        let location = nested_panel_location(&model, &element).expect("panel");
        assert_eq!(location, Point3::new(3.0, -9.0, 0.0));

        element.basis = Basis::from_rotation_degrees(180.0);
        let location = nested_panel_location(&model, &element).expect("panel");
        assert_eq!(location, Point3::new(1.0, 9.0, 0.0));

        element.sub_components = vec![unplaced];
        assert!(matches!(
            nested_panel_location(&model, &element),
            Err(EngineError::PanelLocationUnavailable)
        ));
    }
}
