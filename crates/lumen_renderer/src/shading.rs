//! Iterative Monte Carlo path tracing.
//!
//! Each call follows one path for a fixed number of bounces. At every hit
//! it takes a few shadow samples towards an emitter, picks a specular or
//! diffuse bounce using Schlick's Fresnel term, and trades a small share of
//! the path throughput for the direct light estimate. Results are noisy;
//! callers average many calls.

use lumen_core::{Color, Cubemap, LightPolicy, RenderSettings, Scene};
use lumen_math::{Ray, Vec3};
use rand::{Rng, RngCore};

use crate::camera::RayGenerator;
use crate::intersect::{trace_ray, Hit};

/// Shade the ray through screen position `(u, v)`.
///
/// Returns a color with every channel in [0, 1].
#[allow(clippy::too_many_arguments)]
pub fn pixel(
    camera: &dyn RayGenerator,
    scene: &Scene,
    skybox: &Cubemap,
    settings: &RenderSettings,
    u: f32,
    v: f32,
    aspect_ratio: f32,
    rng: &mut dyn RngCore,
) -> Color {
    let ray = camera.ray_through_screen_at(u, v, aspect_ratio);
    trace_path(scene, skybox, settings, ray, rng)
}

/// Follow one light path starting with `ray` and return its clamped color.
pub fn trace_path(
    scene: &Scene,
    skybox: &Cubemap,
    settings: &RenderSettings,
    ray: Ray,
    rng: &mut dyn RngCore,
) -> Color {
    let mut ray = ray;
    let mut throughput = Color::ONE;
    let mut result = Color::ZERO;

    for _ in 0..settings.max_bounces {
        ray = ray.normalized();

        let Some(hit) = trace_ray(scene, &ray) else {
            result += throughput * skybox.sample(ray.direction());
            break;
        };

        let light = sample_direct_light(scene, settings, &hit, rng);
        let material = scene.objects()[hit.object].material;

        let cos_theta = hit.normal.dot(-ray.direction()).clamp(0.0, 1.0);
        let dielectric_f0 = Color::splat(0.16 * material.reflectance * material.reflectance);
        let f0 = dielectric_f0.lerp(material.albedo, material.metallic);
        let fresnel = fresnel_schlick(cos_theta, f0);

        result += throughput * material.emission();

        let scatter = random_in_hemisphere(hit.normal, rng);
        let specular_chance = (fresnel.x + fresnel.y + fresnel.z) / 3.0;

        let out_dir = if material.metallic > 0.001 || rng.gen::<f32>() < specular_chance {
            let mirror = reflect(ray.direction(), hit.normal);
            (scatter * material.roughness + mirror)
                .try_normalize()
                .unwrap_or(mirror)
        } else {
            throughput *= material.albedo * (1.0 - material.metallic);
            scatter
        };

        if !is_negligible(light) {
            result += throughput * light * settings.light_sample_weight;
            throughput *= 1.0 - settings.light_sample_weight;
        }

        ray = Ray::new(hit.point + out_dir * settings.ray_epsilon, out_dir);
    }

    result.clamp(Color::ZERO, Color::ONE)
}

/// Average emission seen by shadow rays cast from `hit` towards the emitters.
///
/// The emitter that was hit is skipped. Each shadow ray aims at the
/// emitter's centroid, jittered by a hemisphere direction scaled by
/// `light_spread`; whatever it hits contributes its emission.
pub(crate) fn sample_direct_light(
    scene: &Scene,
    settings: &RenderSettings,
    hit: &Hit,
    rng: &mut dyn RngCore,
) -> Color {
    if settings.light_samples == 0 {
        return Color::ZERO;
    }

    let mut total = Color::ZERO;
    for (index, emitter) in scene.emitters() {
        if index == hit.object {
            continue;
        }

        let to_light = emitter.shape.centroid() - hit.point;
        let mut sum = Color::ZERO;
        for _ in 0..settings.light_samples {
            let jitter = random_in_hemisphere(hit.normal, rng);
            let direction = (jitter * settings.light_spread + to_light).normalize_or_zero();
            let shadow_ray = Ray::new(hit.point + direction * settings.ray_epsilon, direction);

            if let Some(shadow_hit) = trace_ray(scene, &shadow_ray) {
                sum += scene.objects()[shadow_hit.object].material.emission();
            }
        }
        total += sum / settings.light_samples as f32;

        if settings.light_policy == LightPolicy::FirstLight {
            break;
        }
    }

    total
}

/// Schlick's approximation of the Fresnel reflectance.
#[inline]
pub fn fresnel_schlick(cos_theta: f32, f0: Color) -> Color {
    let f = (1.0 - cos_theta).powi(5);
    f0 + (Color::ONE - f0) * f
}

/// Reflect a vector about a normal.
#[inline]
pub fn reflect(v: Vec3, n: Vec3) -> Vec3 {
    v - 2.0 * v.dot(n) * n
}

/// Uniformly distributed unit vector.
pub fn random_unit_vector(rng: &mut dyn RngCore) -> Vec3 {
    // Rejection sampling for uniform distribution on sphere
    loop {
        let v = Vec3::new(
            rng.gen::<f32>() * 2.0 - 1.0,
            rng.gen::<f32>() * 2.0 - 1.0,
            rng.gen::<f32>() * 2.0 - 1.0,
        );
        let len_sq = v.length_squared();
        if len_sq > 1e-6 && len_sq <= 1.0 {
            return v / len_sq.sqrt();
        }
    }
}

/// Unit vector in the hemisphere around `normal`.
pub fn random_in_hemisphere(normal: Vec3, rng: &mut dyn RngCore) -> Vec3 {
    let v = random_unit_vector(rng);
    if v.dot(normal) < 0.0 {
        -v
    } else {
        v
    }
}

/// True when every channel is within 1e-4 of zero.
#[inline]
fn is_negligible(color: Color) -> bool {
    color.abs().max_element() < 1e-4
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::camera::Camera;
    use lumen_core::{demo_scene, Material, Object};
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    #[test]
    fn test_fresnel_limits() {
        let f0 = Color::new(0.04, 0.5, 1.0);
        assert_eq!(fresnel_schlick(1.0, f0), f0);
        assert_eq!(fresnel_schlick(0.0, f0), Color::ONE);
    }

    #[test]
    fn test_reflect() {
        let v = Vec3::new(1.0, -1.0, 0.0);
        assert_eq!(reflect(v, Vec3::Y), Vec3::new(1.0, 1.0, 0.0));
        // Side of the normal does not matter
        assert_eq!(reflect(v, Vec3::NEG_Y), Vec3::new(1.0, 1.0, 0.0));
    }

    #[test]
    fn test_random_vectors() {
        let mut rng = StdRng::seed_from_u64(7);
        let normal = Vec3::new(0.0, 0.0, 1.0);
        for _ in 0..1000 {
            let v = random_unit_vector(&mut rng);
            assert!((v.length() - 1.0).abs() < 1e-4);

            let h = random_in_hemisphere(normal, &mut rng);
            assert!(h.dot(normal) >= 0.0);
        }
    }

    #[test]
    fn test_pixel_is_clamped() {
        let scene = demo_scene();
        let sky = Cubemap::solid(Color::ONE);
        let settings = RenderSettings {
            light_policy: LightPolicy::AllLights,
            ..Default::default()
        };
        let camera = Camera::default();
        let mut rng = StdRng::seed_from_u64(42);

        for _ in 0..500 {
            let u = rng.gen::<f32>();
            let v = rng.gen::<f32>();
            let color = pixel(&camera, &scene, &sky, &settings, u, v, 16.0 / 9.0, &mut rng);
            assert!(
                color.cmpge(Color::ZERO).all() && color.cmple(Color::ONE).all(),
                "color {color} out of range"
            );
        }
    }

    #[test]
    fn test_emissive_sphere_returns_its_emission() {
        let light = Material {
            albedo: Color::ZERO,
            ..Material::emissive(Color::new(1.0, 0.5, 0.25), 2.0)
        };
        let mut scene = Scene::new();
        scene
            .add(Object::sphere(light, Vec3::new(0.0, 0.0, -5.0), 1.0))
            .unwrap();

        let sky = Cubemap::solid(Color::ZERO);
        let settings = RenderSettings::default();
        let camera = Camera::new(Vec3::ZERO, 0.0, 0.0, 60.0);
        let mut rng = StdRng::seed_from_u64(1);

        for _ in 0..20 {
            let color = pixel(&camera, &scene, &sky, &settings, 0.5, 0.5, 1.0, &mut rng);
            assert_eq!(color, Color::new(1.0, 1.0, 0.5));
        }
    }

    #[test]
    fn test_sky_seen_on_miss() {
        let sky = Cubemap::solid(Color::new(0.2, 0.4, 0.6));
        let ray = Ray::new(Vec3::ZERO, Vec3::new(0.3, 0.2, -1.0));
        let mut rng = StdRng::seed_from_u64(3);

        let color = trace_path(&Scene::new(), &sky, &RenderSettings::default(), ray, &mut rng);
        let expected = Color::new(51.0, 102.0, 153.0) / 255.0;
        assert!((color - expected).length() < 1e-6, "color {color}");
    }

    /// Ray from +Z aimed at the center of a unit sphere at the origin.
    fn head_on_ray() -> Ray {
        Ray::new(Vec3::new(0.0, 0.0, 5.0), Vec3::NEG_Z)
    }

    fn single_sphere(material: Material) -> Scene {
        let mut scene = Scene::new();
        scene.add(Object::sphere(material, Vec3::ZERO, 1.0)).unwrap();
        scene
    }

    #[test]
    fn test_mirror_bounce_keeps_throughput() {
        let scene = single_sphere(Material::metal(Color::new(0.9, 0.9, 0.9), 0.0));
        let sky = Cubemap::solid(Color::new(0.2, 0.4, 0.6));
        let settings = RenderSettings::default();
        let mut rng = StdRng::seed_from_u64(8);

        // Bounces straight back out into the sky
        let expected = sky.sample(Vec3::Z);
        for _ in 0..20 {
            let color = trace_path(&scene, &sky, &settings, head_on_ray(), &mut rng);
            assert!((color - expected).length() < 1e-6, "color {color}");
        }
    }

    #[test]
    fn test_diffuse_bounce_scales_by_albedo() {
        let albedo = Color::new(0.5, 0.25, 1.0);
        let scene = single_sphere(Material::diffuse(albedo).with_reflectance(0.0));
        let sky = Cubemap::solid(Color::new(0.2, 0.4, 0.6));
        let settings = RenderSettings::default();
        let mut rng = StdRng::seed_from_u64(12);

        // Head-on, a zero base reflectance never picks the specular lobe
        let expected = albedo * sky.sample(Vec3::Z);
        for _ in 0..50 {
            let color = trace_path(&scene, &sky, &settings, head_on_ray(), &mut rng);
            assert!((color - expected).length() < 1e-6, "color {color}");
        }
    }

    #[test]
    fn test_direct_light_blends_into_result() {
        let mut scene = single_sphere(Material::metal(Color::ONE, 0.0));
        // Off to the side, visible from the hit point but not on the mirror path
        scene
            .add(Object::sphere(
                Material::emissive(Color::ONE, 2.0),
                Vec3::new(3.0, 0.0, 3.0),
                0.5,
            ))
            .unwrap();

        let sky = Cubemap::solid(Color::new(0.2, 0.4, 0.6));
        let settings = RenderSettings {
            light_spread: 0.0,
            ..Default::default()
        };
        let mut rng = StdRng::seed_from_u64(21);

        let weight = settings.light_sample_weight;
        let expected = Color::splat(2.0) * weight + sky.sample(Vec3::Z) * (1.0 - weight);
        let color = trace_path(&scene, &sky, &settings, head_on_ray(), &mut rng);
        assert!((color - expected).length() < 1e-5, "color {color}");
    }

    fn two_light_scene() -> Scene {
        let mut scene = Scene::new();
        // Floor under the shading point
        scene
            .add(Object::cuboid(
                Material::diffuse(Color::ONE),
                Vec3::new(-5.0, -1.0, -5.0),
                Vec3::new(10.0, 1.0, 10.0),
            ))
            .unwrap();
        scene
            .add(Object::sphere(
                Material::emissive(Color::new(1.0, 0.0, 0.0), 1.0),
                Vec3::new(-6.0, 8.0, 0.0),
                2.0,
            ))
            .unwrap();
        scene
            .add(Object::sphere(
                Material::emissive(Color::new(0.0, 1.0, 0.0), 1.0),
                Vec3::new(6.0, 8.0, 0.0),
                2.0,
            ))
            .unwrap();
        scene
    }

    fn floor_hit(object: usize) -> Hit {
        Hit {
            distance: 1.0,
            point: Vec3::ZERO,
            normal: Vec3::Y,
            object,
        }
    }

    #[test]
    fn test_first_light_policy() {
        let scene = two_light_scene();
        let settings = RenderSettings::default();
        let mut rng = StdRng::seed_from_u64(5);

        let light = sample_direct_light(&scene, &settings, &floor_hit(0), &mut rng);
        assert_eq!(light, Color::new(1.0, 0.0, 0.0));

        // The hit emitter never samples itself
        let light = sample_direct_light(&scene, &settings, &floor_hit(1), &mut rng);
        assert_eq!(light, Color::new(0.0, 1.0, 0.0));
    }

    #[test]
    fn test_all_lights_policy() {
        let scene = two_light_scene();
        let settings = RenderSettings {
            light_policy: LightPolicy::AllLights,
            ..Default::default()
        };
        let mut rng = StdRng::seed_from_u64(5);

        let light = sample_direct_light(&scene, &settings, &floor_hit(0), &mut rng);
        assert_eq!(light, Color::new(1.0, 1.0, 0.0));
    }

    #[test]
    fn test_negligible() {
        assert!(is_negligible(Color::new(0.0, -0.00005, 0.00009)));
        assert!(!is_negligible(Color::new(0.0, 0.0, 0.001)));
    }
}
