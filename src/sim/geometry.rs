//! Segment/circle geometry for swipe hit testing
//!
//! The heart of slice detection: does one segment of the gesture polyline
//! pass through an entity's hit circle?

use glam::Vec2;

/// Test whether the segment p1→p2 intersects a circle.
///
/// Degenerate segments (p1 == p2) never intersect. For everything else the
/// predicate is exactly "closest point of the segment lies within `radius`
/// of `center`": the parametric quadratic catches boundary crossings, and
/// the start-inside check catches segments that begin (or sit entirely)
/// inside the circle.
pub fn segment_intersects_circle(p1: Vec2, p2: Vec2, center: Vec2, radius: f32) -> bool {
    let d = p2 - p1;
    let f = p1 - center;

    let a = d.length_squared();
    if a < 1e-12 {
        return false; // Degenerate segment
    }

    let c = f.length_squared() - radius * radius;
    if c <= 0.0 {
        return true; // Starts inside the circle
    }

    // Solve |p1 + t*d - center|² = radius² for t in [0, 1]
    let b = 2.0 * f.dot(d);
    let discriminant = b * b - 4.0 * a * c;
    if discriminant < 0.0 {
        return false;
    }

    let sqrt_disc = discriminant.sqrt();
    let t1 = (-b - sqrt_disc) / (2.0 * a);
    let t2 = (-b + sqrt_disc) / (2.0 * a);

    (0.0..=1.0).contains(&t1) || (0.0..=1.0).contains(&t2)
}

/// Distance from `point` to the closest point of segment p1→p2.
///
/// Closest-point form, used as the brute-force oracle for the intersection
/// predicate.
pub fn segment_point_distance(p1: Vec2, p2: Vec2, point: Vec2) -> f32 {
    let d = p2 - p1;
    let len_sq = d.length_squared();
    if len_sq < 1e-12 {
        return (point - p1).length();
    }
    let t = ((point - p1).dot(d) / len_sq).clamp(0.0, 1.0);
    (point - (p1 + d * t)).length()
}

/// Angle of the direction from `from` to `to`, radians in [-π, π].
///
/// Coincident points give 0 (the permissive default slice angle).
#[inline]
pub fn angle_of(from: Vec2, to: Vec2) -> f32 {
    let d = to - from;
    if d.length_squared() < 1e-12 {
        return 0.0;
    }
    d.y.atan2(d.x)
}
