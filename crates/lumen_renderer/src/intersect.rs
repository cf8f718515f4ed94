//! Ray intersection against spheres, axis-aligned boxes and whole scenes.
//!
//! There is no acceleration structure: scenes are small and `trace_ray`
//! scans the object list linearly.

use lumen_core::{Object, Scene, Shape};
use lumen_math::{Interval, Ray, Vec3};

/// Nearest surface found by [`trace_ray`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Hit {
    /// Distance along the (normalized) ray, never negative
    pub distance: f32,
    pub point: Vec3,
    /// Outward-facing unit normal
    pub normal: Vec3,
    /// Index of the object in the scene
    pub object: usize,
}

/// Result of the slab test against a box.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SlabHit {
    /// Entering and exiting ray parameters
    pub span: Interval,
    /// Normal of the face the ray enters through
    pub normal: Vec3,
}

/// Intersect a ray with a sphere.
///
/// Returns the nearest non-negative root, or `None` if the ray misses or
/// the sphere lies entirely behind the ray origin. Tangent rays count as
/// misses.
pub fn intersect_sphere(ray: &Ray, center: Vec3, radius: f32) -> Option<f32> {
    let oc = center - ray.origin();
    let a = ray.direction().length_squared();
    let b = -2.0 * oc.dot(ray.direction());
    let c = oc.length_squared() - radius * radius;

    let discriminant = b * b - 4.0 * a * c;
    if discriminant <= 0.0 {
        return None;
    }

    let sqrtd = discriminant.sqrt();
    let r0 = (-b - sqrtd) / (2.0 * a);
    let r1 = (-b + sqrtd) / (2.0 * a);
    let (near, far) = if r0 <= r1 { (r0, r1) } else { (r1, r0) };

    if near >= 0.0 {
        Some(near)
    } else if far >= 0.0 {
        Some(far)
    } else {
        None
    }
}

/// Intersect a ray with the box spanning `origin` to `origin + size`.
///
/// A zero direction component means the ray runs parallel to that pair of
/// planes: the axis is unconstrained when the origin lies between them and
/// the ray misses otherwise. The entering bound may be negative when the
/// ray starts inside the box.
pub fn intersect_cuboid(ray: &Ray, origin: Vec3, size: Vec3) -> Option<SlabHit> {
    let min = origin;
    let max = origin + size;
    let ro = ray.origin();
    let rd = ray.direction();

    let mut span = Interval::UNIVERSE;
    let mut entry_axis = None;

    for axis in 0..3 {
        let slab = if rd[axis] == 0.0 {
            if !Interval::spanning(min[axis], max[axis]).contains(ro[axis]) {
                return None;
            }
            Interval::UNIVERSE
        } else {
            Interval::spanning(
                (min[axis] - ro[axis]) / rd[axis],
                (max[axis] - ro[axis]) / rd[axis],
            )
        };

        if slab.min > span.min {
            entry_axis = Some(axis);
        }
        span = span.intersect(&slab);

        // Separating axis
        if span.is_empty() {
            return None;
        }
    }

    let axis = entry_axis?;
    let mut normal = Vec3::ZERO;
    normal[axis] = if rd[axis] > 0.0 { -1.0 } else { 1.0 };

    Some(SlabHit { span, normal })
}

/// Intersect a ray with one object, returning `(distance, normal)`.
///
/// For boxes the distance is the entering bound, which is negative for rays
/// that start inside.
pub fn intersect_object(ray: &Ray, object: &Object) -> Option<(f32, Vec3)> {
    match object.shape {
        Shape::Sphere { center, radius } => {
            let t = intersect_sphere(ray, center, radius)?;
            let normal = (ray.at(t) - center).normalize_or_zero();
            Some((t, normal))
        }
        Shape::Cuboid { origin, size } => {
            let hit = intersect_cuboid(ray, origin, size)?;
            Some((hit.span.min, hit.normal))
        }
    }
}

/// Find the nearest object hit by the ray.
///
/// The direction is normalized first so distances are in world units. On
/// equal distances the earlier object wins.
pub fn trace_ray(scene: &Scene, ray: &Ray) -> Option<Hit> {
    let ray = ray.normalized();

    let mut nearest: Option<(f32, Vec3, usize)> = None;
    for (index, object) in scene.objects().iter().enumerate() {
        let Some((t, normal)) = intersect_object(&ray, object) else {
            continue;
        };
        let closer = nearest.map_or(true, |(best, _, _)| t < best);
        if t >= 0.0 && closer {
            nearest = Some((t, normal, index));
        }
    }

    nearest.map(|(distance, normal, object)| Hit {
        distance,
        point: ray.at(distance),
        normal,
        object,
    })
}
