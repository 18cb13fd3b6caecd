use nalgebra::{Point3, Vector3};
use rapier3d::prelude::*;

/// Line color for static geometry.
pub const COLOR_STATIC: [f32; 3] = [0.0, 0.8, 0.0];
pub const COLOR_KINEMATIC: [f32; 3] = [0.2, 0.4, 1.0];
pub const COLOR_DYNAMIC: [f32; 3] = [1.0, 0.2, 0.2];
pub const COLOR_GHOST: [f32; 3] = [1.0, 1.0, 0.0];
pub const COLOR_JOINT: [f32; 3] = [1.0, 0.5, 0.0];
pub const COLOR_CONTACT: [f32; 3] = [1.0, 1.0, 1.0];

/// Rendering collaborator for collision debug output.
///
/// Calls arrive synchronously while `PhysicsWorld::debug_draw` walks the
/// world; nothing is buffered on this side.
pub trait DebugDrawSink {
    fn draw_line(&mut self, from: Point3<f32>, to: Point3<f32>, color: [f32; 3]);

    fn draw_contact_point(&mut self, point: Point3<f32>, normal: Vector3<f32>, distance: f32, color: [f32; 3]) {
        self.draw_line(point, point + normal * distance.abs().max(0.05), color);
    }
}

/// Feeds rapier's debug renderer into a [`DebugDrawSink`], recoloring lines
/// by what they belong to.
pub(crate) struct SinkBackend<'a> {
    pub sink: &'a mut dyn DebugDrawSink,
    pub bodies: &'a RigidBodySet,
}

impl SinkBackend<'_> {
    fn collider_color(&self, co: &Collider) -> [f32; 3] {
        if co.is_sensor() {
            return COLOR_GHOST;
        }
        match co.parent().and_then(|p| self.bodies.get(p)) {
            Some(b) if b.is_dynamic() => COLOR_DYNAMIC,
            Some(b) if b.is_kinematic() => COLOR_KINEMATIC,
            _ => COLOR_STATIC,
        }
    }
}

impl DebugRenderBackend for SinkBackend<'_> {
    fn filter_object(&self, object: DebugRenderObject) -> bool {
        match object {
            DebugRenderObject::Collider(_, co) => co.is_enabled(),
            _ => true,
        }
    }

    fn draw_line(&mut self, object: DebugRenderObject, a: Point<Real>, b: Point<Real>, _color: DebugColor) {
        let color = match object {
            DebugRenderObject::Collider(_, co) => self.collider_color(co),
            DebugRenderObject::ImpulseJoint(..) => COLOR_JOINT,
            _ => COLOR_STATIC,
        };
        self.sink.draw_line(a, b, color);
    }
}
