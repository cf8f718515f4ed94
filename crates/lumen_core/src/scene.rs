//! Scene model: materials, primitive shapes and the object list.
//!
//! Scenes are built once at startup and are read-only while rendering,
//! so they can be shared between worker threads without locking.

use lumen_math::Vec3;
use serde::Deserialize;
use thiserror::Error;

use crate::Color;

/// Maximum number of objects a scene can hold.
pub const MAX_OBJECTS: usize = 1024;

/// Errors that can occur while building or loading a scene.
#[derive(Error, Debug)]
pub enum SceneError {
    #[error("Scene is full ({capacity} objects)")]
    CapacityExceeded { capacity: usize },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Scene parse error: {0}")]
    Parse(#[from] serde_json::Error),
}

pub type SceneResult<T> = Result<T, SceneError>;

/// Surface description shared by every primitive.
#[derive(Clone, Copy, Debug, PartialEq, Deserialize)]
#[serde(default)]
pub struct Material {
    /// Diffuse color, also the Fresnel base for metals
    pub albedo: Color,

    /// 0 = mirror-like, 1 = fully scattered reflection
    pub roughness: f32,

    /// Drives the dielectric base reflectivity (0.16 * reflectance^2)
    pub reflectance: f32,

    /// Mix between dielectric and metal Fresnel base
    pub metallic: f32,

    /// Color of emitted light
    pub emission_color: Color,

    /// Emission strength, 0 means the surface emits nothing
    pub emission_power: f32,
}

impl Default for Material {
    fn default() -> Self {
        Self {
            albedo: Color::new(0.5, 0.5, 0.5), // Grey default
            roughness: 1.0,
            reflectance: 0.0,
            metallic: 0.0,
            emission_color: Color::ZERO,
            emission_power: 0.0,
        }
    }
}

impl Material {
    /// Rough dielectric surface with the given albedo.
    pub fn diffuse(albedo: Color) -> Self {
        Self {
            albedo,
            ..Default::default()
        }
    }

    /// Metal with the given base color and roughness.
    pub fn metal(albedo: Color, roughness: f32) -> Self {
        Self {
            albedo,
            metallic: 1.0,
            ..Default::default()
        }
        .with_roughness(roughness)
    }

    /// Light source emitting `color * power`.
    pub fn emissive(color: Color, power: f32) -> Self {
        Self::default().with_emission(color, power)
    }

    pub fn with_roughness(mut self, roughness: f32) -> Self {
        self.roughness = roughness.clamp(0.0, 1.0);
        self
    }

    pub fn with_reflectance(mut self, reflectance: f32) -> Self {
        self.reflectance = reflectance.clamp(0.0, 1.0);
        self
    }

    pub fn with_metallic(mut self, metallic: f32) -> Self {
        self.metallic = metallic.clamp(0.0, 1.0);
        self
    }

    pub fn with_emission(mut self, color: Color, power: f32) -> Self {
        self.emission_color = color;
        self.emission_power = power.max(0.0);
        self
    }

    /// Clamp every parameter into its valid range.
    ///
    /// Used for materials that come from scene files.
    pub fn sanitized(self) -> Self {
        let emission_color = self.emission_color;
        let emission_power = self.emission_power;
        self.with_roughness(self.roughness)
            .with_reflectance(self.reflectance)
            .with_metallic(self.metallic)
            .with_emission(emission_color, emission_power)
    }

    /// Check if this material emits light.
    pub fn is_emissive(&self) -> bool {
        self.emission_power > 0.0
    }

    /// Emitted radiance (color scaled by power).
    pub fn emission(&self) -> Color {
        self.emission_color * self.emission_power
    }
}

/// Geometric primitive.
#[derive(Clone, Copy, Debug, PartialEq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Shape {
    Sphere { center: Vec3, radius: f32 },
    /// Axis-aligned box spanning `origin` to `origin + size`.
    Cuboid { origin: Vec3, size: Vec3 },
}

impl Shape {
    /// Point that light sampling aims at.
    pub fn centroid(&self) -> Vec3 {
        match *self {
            Shape::Sphere { center, .. } => center,
            Shape::Cuboid { origin, size } => origin + size * 0.5,
        }
    }
}

/// A shape with the material it is made of.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Object {
    pub shape: Shape,
    pub material: Material,
}

impl Object {
    pub fn sphere(material: Material, center: Vec3, radius: f32) -> Self {
        Self {
            shape: Shape::Sphere {
                center,
                radius: radius.max(0.0),
            },
            material,
        }
    }

    pub fn cuboid(material: Material, origin: Vec3, size: Vec3) -> Self {
        Self {
            shape: Shape::Cuboid { origin, size },
            material,
        }
    }
}

/// Ordered, bounded list of scene objects.
///
/// Insertion order is iteration order, which also decides ties between
/// equally distant hits (the first object wins).
#[derive(Clone, Debug, Default)]
pub struct Scene {
    objects: Vec<Object>,
}

impl Scene {
    /// Create an empty scene.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add an object and return its index.
    pub fn add(&mut self, object: Object) -> SceneResult<usize> {
        if self.objects.len() >= MAX_OBJECTS {
            log::warn!("Dropping object, scene already holds {} objects", MAX_OBJECTS);
            return Err(SceneError::CapacityExceeded {
                capacity: MAX_OBJECTS,
            });
        }
        self.objects.push(object);
        Ok(self.objects.len() - 1)
    }

    pub fn objects(&self) -> &[Object] {
        &self.objects
    }

    pub fn get(&self, index: usize) -> Option<&Object> {
        self.objects.get(index)
    }

    pub fn len(&self) -> usize {
        self.objects.len()
    }

    pub fn is_empty(&self) -> bool {
        self.objects.is_empty()
    }

    /// Objects with a positive emission power, with their indices.
    pub fn emitters(&self) -> impl Iterator<Item = (usize, &Object)> {
        self.objects
            .iter()
            .enumerate()
            .filter(|(_, object)| object.material.is_emissive())
    }
}

/// The default hand-authored scene: three metal panels of increasing
/// gloss, a floor slab, two cubes, two spheres and a warm sphere light.
pub fn demo_scene() -> Scene {
    let panel = Color::new(1.0, 0.3, 0.3);
    let objects = [
        Object::cuboid(Material::metal(panel, 1.0), Vec3::new(0.0, 0.0, 0.0), Vec3::new(3.0, 5.0, 0.1)),
        Object::cuboid(Material::metal(panel, 0.5), Vec3::new(3.0, 0.0, 0.0), Vec3::new(3.0, 5.0, 0.1)),
        Object::cuboid(Material::metal(panel, 0.0), Vec3::new(6.0, 0.0, 0.0), Vec3::new(3.0, 5.0, 0.1)),
        // Floor
        Object::cuboid(
            Material::diffuse(Color::new(0.4, 0.3, 0.9)),
            Vec3::new(0.0, -0.1, 0.0),
            Vec3::new(9.0, 0.1, 9.0),
        ),
        Object::cuboid(
            Material::diffuse(Color::new(1.0, 0.0, 0.0)),
            Vec3::new(5.0, 0.0, 6.0),
            Vec3::ONE,
        ),
        Object::cuboid(
            Material::diffuse(Color::new(1.0, 0.0, 1.0))
                .with_reflectance(1.0)
                .with_roughness(0.0),
            Vec3::new(4.0, 0.0, 5.0),
            Vec3::ONE,
        ),
        Object::sphere(Material::diffuse(Color::new(1.0, 0.4, 0.0)), Vec3::new(3.0, 1.0, 3.0), 1.0),
        Object::sphere(
            Material::diffuse(Color::new(0.0, 1.0, 0.0))
                .with_reflectance(1.0)
                .with_roughness(0.0),
            Vec3::new(5.0, 1.0, 3.0),
            1.0,
        ),
        // Light
        Object::sphere(
            Material::diffuse(Color::new(1.0, 0.4, 0.0)).with_emission(Color::new(1.0, 0.5, 0.5), 5.0),
            Vec3::new(3.0, 5.0, 3.0),
            1.0,
        ),
    ];

    // Far below MAX_OBJECTS
    Scene {
        objects: objects.to_vec(),
    }
}
