//! Ground-plane geometry.
//!
//! The world is Y-up. Commands that target the ground use a 2D point whose
//! `x` maps to world X and whose `y` maps to world Z.

use glam::{Quat, Vec2, Vec3};

/// World up axis.
pub const UP: Vec3 = Vec3::Y;

/// Forward axis of an unrotated unit.
pub const FORWARD: Vec3 = Vec3::Z;

/// Lifts a ground point into world space at the given height.
#[must_use]
pub fn ground_to_world(point: Vec2, height: f32) -> Vec3 {
    Vec3::new(point.x, height, point.y)
}

/// Projects a world position onto the ground plane.
#[must_use]
pub fn world_to_ground(position: Vec3) -> Vec2 {
    Vec2::new(position.x, position.z)
}

/// Distance between two positions ignoring height.
#[must_use]
pub fn planar_distance(a: Vec3, b: Vec3) -> f32 {
    world_to_ground(a).distance(world_to_ground(b))
}

/// Yaw rotation that turns [`FORWARD`] toward `target` as seen from `from`.
///
/// Returns `None` when the two points coincide on the ground plane.
#[must_use]
pub fn facing_rotation(from: Vec3, target: Vec2) -> Option<Quat> {
    let dir = target - world_to_ground(from);
    if dir.length_squared() <= f32::EPSILON {
        return None;
    }
    // atan2(x, z) measures yaw from +Z toward +X.
    Some(Quat::from_rotation_y(dir.x.atan2(dir.y)))
}
