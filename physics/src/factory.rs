//! Shape and collider construction.
//!
//! Everything that turns level or model data into backend shapes lives here:
//! bone boxes and spheres, arbitrary meshes, and the room heightmap (sector
//! surfaces plus tweens). Builders return `None` for degenerate input instead
//! of producing an empty shape.

use std::sync::Arc;

use level::{DiagonalType, MeshData, PenetrationConfig, Room, Sector};
use nalgebra::{Point3, Vector3};
use rapier3d::prelude::*;

use crate::{
    constants::{DEFAULT_FRICTION, DEFAULT_RESTITUTION, MIN_SHAPE_EXTENT},
    tween::{generate_room_tweens, tween_triangles},
};

/// Requested collision volume, in bone (or model) local space.
#[derive(Clone, Debug)]
pub enum ShapeSpec {
    Box { min: Point3<f32>, max: Point3<f32> },
    Sphere { centre: Point3<f32>, radius: f32 },
    Mesh { mesh: Arc<MeshData>, convex_only: bool },
}

/// A built shape plus the translation from the bone origin to the shape origin.
#[derive(Clone)]
pub struct ProxyShape {
    pub shape: SharedShape,
    pub offset: Vector3<f32>,
}

impl std::fmt::Debug for ProxyShape {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProxyShape")
            .field("shape", &self.shape.shape_type())
            .field("offset", &self.offset)
            .finish()
    }
}

pub struct RigidBodyFactory;

impl RigidBodyFactory {
    /// Convex box from the eight corners of an axis-aligned bounding box.
    ///
    /// The hull is built in place, so no offset is needed.
    pub fn box_shape(min: &Point3<f32>, max: &Point3<f32>) -> Option<ProxyShape> {
        let extent = max - min;
        if extent.min() < MIN_SHAPE_EXTENT {
            return None;
        }
        let corners: Vec<Point3<f32>> = (0..8)
            .map(|i| {
                Point3::new(
                    if i & 1 == 0 { min.x } else { max.x },
                    if i & 2 == 0 { min.y } else { max.y },
                    if i & 4 == 0 { min.z } else { max.z },
                )
            })
            .collect();
        let shape = SharedShape::convex_hull(&corners)?;
        Some(ProxyShape {
            shape,
            offset: Vector3::zeros(),
        })
    }

    pub fn sphere_shape(centre: &Point3<f32>, radius: f32) -> Option<ProxyShape> {
        if !(radius >= MIN_SHAPE_EXTENT) {
            return None;
        }
        Some(ProxyShape {
            shape: SharedShape::ball(radius),
            offset: centre.coords,
        })
    }

    /// Shape from an arbitrary mesh.
    ///
    /// Static bodies keep the triangles as a triangle mesh unless `convex_only`
    /// is set; moving bodies always get the convex hull. Meshes with no valid
    /// triangle produce nothing.
    pub fn mesh_shape(mesh: &MeshData, convex_only: bool, is_static: bool) -> Option<ProxyShape> {
        let triangles: Vec<[Point3<f32>; 3]> = mesh.valid_triangles().collect();
        if triangles.is_empty() {
            return None;
        }
        let shape = if convex_only || !is_static {
            let points: Vec<Point3<f32>> = triangles.iter().flatten().copied().collect();
            SharedShape::convex_hull(&points)?
        } else {
            triangle_soup(&triangles)?
        };
        Some(ProxyShape {
            shape,
            offset: Vector3::zeros(),
        })
    }

    pub fn shape_from_spec(spec: &ShapeSpec, is_static: bool) -> Option<ProxyShape> {
        match spec {
            ShapeSpec::Box { min, max } => Self::box_shape(min, max),
            ShapeSpec::Sphere { centre, radius } => Self::sphere_shape(centre, *radius),
            ShapeSpec::Mesh { mesh, convex_only } => Self::mesh_shape(mesh, *convex_only, is_static),
        }
    }

    /// World-space triangles of a room: sector floors and ceilings plus tweens.
    pub fn heightmap_triangles(room: &Room) -> Vec<[Point3<f32>; 3]> {
        let mut out = Vec::new();
        for sector in &room.sectors {
            // Doorway cells belong to the room on the other side.
            if sector.portal_to_room.is_some() {
                continue;
            }
            surface_triangles(sector, Surface::Floor, &mut out);
            surface_triangles(sector, Surface::Ceiling, &mut out);
        }
        for tween in generate_room_tweens(room) {
            tween_triangles(&tween.floor_corners, tween.floor_type, &mut out);
            tween_triangles(&tween.ceiling_corners, tween.ceiling_type, &mut out);
        }
        out
    }

    pub fn heightmap_shape(room: &Room) -> Option<SharedShape> {
        let triangles = Self::heightmap_triangles(room);
        if triangles.is_empty() {
            return None;
        }
        triangle_soup(&triangles)
    }

    /// Collider with the layer-wide material and filter hooks.
    pub fn collider(shape: SharedShape, offset: Vector3<f32>, user_data: u128) -> ColliderBuilder {
        ColliderBuilder::new(shape)
            .translation(offset)
            .restitution(DEFAULT_RESTITUTION)
            .friction(DEFAULT_FRICTION)
            .density(0.0)
            .user_data(user_data)
            .active_hooks(ActiveHooks::FILTER_CONTACT_PAIRS | ActiveHooks::FILTER_INTERSECTION_PAIR)
    }
}

#[derive(Clone, Copy, PartialEq, Eq)]
enum Surface {
    Floor,
    Ceiling,
}

/// Split a sector surface along its diagonal and keep the solid halves.
fn surface_triangles(sector: &Sector, surface: Surface, out: &mut Vec<[Point3<f32>; 3]>) {
    let (c, penetration, diagonal) = match surface {
        Surface::Floor => (&sector.floor_corners, sector.floor_penetration, sector.floor_diagonal),
        Surface::Ceiling => (&sector.ceiling_corners, sector.ceiling_penetration, sector.ceiling_diagonal),
    };
    if !penetration.is_solid_surface() {
        return;
    }
    let halves = match diagonal {
        DiagonalType::NorthEast => [[1, 0, 3], [1, 3, 2]],
        DiagonalType::None | DiagonalType::NorthWest => [[0, 2, 1], [0, 3, 2]],
    };
    for (i, tri) in halves.iter().enumerate() {
        let open = match penetration {
            PenetrationConfig::DoorVerticalA => i == 0,
            PenetrationConfig::DoorVerticalB => i == 1,
            _ => false,
        };
        if open {
            continue;
        }
        let mut t = [c[tri[0]], c[tri[1]], c[tri[2]]];
        if surface == Surface::Ceiling {
            t.swap(1, 2);
        }
        out.push(t);
    }
}

fn triangle_soup(triangles: &[[Point3<f32>; 3]]) -> Option<SharedShape> {
    let vertices: Vec<Point3<f32>> = triangles.iter().flatten().copied().collect();
    let indices: Vec<[u32; 3]> = (0..triangles.len() as u32)
        .map(|i| [3 * i, 3 * i + 1, 3 * i + 2])
        .collect();
    SharedShape::trimesh(vertices, indices).ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use level::RoomId;
    use rapier3d::parry::shape::ShapeType;

    #[test]
    fn zero_extent_box_is_rejected() {
        assert!(RigidBodyFactory::box_shape(&Point3::new(0.0, 0.0, 0.0), &Point3::new(1.0, 0.0, 1.0)).is_none());
        let shape = RigidBodyFactory::box_shape(&Point3::new(-1.0, 0.0, -1.0), &Point3::new(1.0, 2.0, 1.0)).unwrap();
        let aabb = shape.shape.compute_local_aabb();
        assert!((aabb.maxs.y - 2.0).abs() < 1.0e-5);
        assert!((aabb.mins.x + 1.0).abs() < 1.0e-5);
    }

    #[test]
    fn sphere_keeps_centre_as_offset() {
        let s = RigidBodyFactory::sphere_shape(&Point3::new(0.0, 0.5, 0.0), 0.25).unwrap();
        assert_eq!(s.offset, Vector3::new(0.0, 0.5, 0.0));
        assert!(RigidBodyFactory::sphere_shape(&Point3::origin(), 0.0).is_none());
    }

    #[test]
    fn mesh_without_valid_triangles_builds_nothing() {
        let degenerate = MeshData::new(
            vec![Point3::origin(), Point3::new(1.0, 0.0, 0.0), Point3::new(2.0, 0.0, 0.0)],
            vec![[0, 1, 2], [0, 1, 7]],
        );
        assert!(RigidBodyFactory::mesh_shape(&degenerate, false, true).is_none());
        assert!(RigidBodyFactory::mesh_shape(&MeshData::default(), true, false).is_none());
    }

    #[test]
    fn static_mesh_stays_triangles_moving_mesh_goes_convex() {
        let tetra = MeshData::new(
            vec![
                Point3::origin(),
                Point3::new(1.0, 0.0, 0.0),
                Point3::new(0.0, 1.0, 0.0),
                Point3::new(0.0, 0.0, 1.0),
            ],
            vec![[0, 1, 2], [0, 1, 3], [0, 2, 3], [1, 2, 3]],
        );
        let fixed = RigidBodyFactory::mesh_shape(&tetra, false, true).unwrap();
        assert_eq!(fixed.shape.shape_type(), ShapeType::TriMesh);
        let moving = RigidBodyFactory::mesh_shape(&tetra, false, false).unwrap();
        assert_eq!(moving.shape.shape_type(), ShapeType::ConvexPolyhedron);
        let hull = RigidBodyFactory::mesh_shape(&tetra, true, true).unwrap();
        assert_eq!(hull.shape.shape_type(), ShapeType::ConvexPolyhedron);
    }

    #[test]
    fn flat_room_heightmap_has_floor_and_ceiling_per_sector() {
        let room = Room::flat(RoomId(0), nalgebra::Vector3::zeros(), 2, 3, 4.0);
        assert_eq!(RigidBodyFactory::heightmap_triangles(&room).len(), 2 * 2 * 6);
        assert!(RigidBodyFactory::heightmap_shape(&room).is_some());
    }

    #[test]
    fn door_and_wall_configs_drop_triangles() {
        let mut room = Room::flat(RoomId(0), nalgebra::Vector3::zeros(), 1, 1, 4.0);
        room.sectors[0].floor_penetration = PenetrationConfig::DoorVerticalA;
        room.sectors[0].ceiling_penetration = PenetrationConfig::Ghost;
        let tris = RigidBodyFactory::heightmap_triangles(&room);
        assert_eq!(tris.len(), 1);
        assert!(tris.iter().all(|t| t.iter().all(|p| p.y == 0.0)));

        room.sectors[0].floor_penetration = PenetrationConfig::Wall;
        assert!(RigidBodyFactory::heightmap_shape(&room).is_none());
    }

    #[test]
    fn north_east_diagonal_splits_along_corners_one_and_three() {
        let mut room = Room::flat(RoomId(0), nalgebra::Vector3::zeros(), 1, 1, 4.0);
        room.sectors[0].floor_diagonal = DiagonalType::NorthEast;
        room.sectors[0].ceiling_penetration = PenetrationConfig::Ghost;
        let tris = RigidBodyFactory::heightmap_triangles(&room);
        let c = room.sectors[0].floor_corners;
        assert_eq!(tris, vec![[c[1], c[0], c[3]], [c[1], c[3], c[2]]]);
    }
}
