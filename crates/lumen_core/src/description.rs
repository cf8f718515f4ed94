//! JSON scene descriptions.
//!
//! A scene file lists objects plus optional settings, camera and skybox:
//!
//! ```json
//! {
//!   "settings": { "max_bounces": 4 },
//!   "camera": { "position": [0, 1, 5], "yaw": 0.0, "pitch": 0.0 },
//!   "skybox": { "color": [0.6, 0.7, 0.9] },
//!   "objects": [
//!     { "sphere": { "center": [0, 1, 0], "radius": 1 },
//!       "material": { "albedo": [1, 0.4, 0], "roughness": 0.2 } }
//!   ]
//! }
//! ```

use std::path::{Path, PathBuf};

use lumen_math::Vec3;
use serde::Deserialize;

use crate::cubemap::SkyboxPaths;
use crate::scene::{Material, Object, Scene, SceneResult, Shape};
use crate::settings::RenderSettings;
use crate::Color;

/// Where the sky comes from.
#[derive(Clone, Debug, PartialEq)]
pub enum SkyboxSource {
    /// Six face images
    Faces(SkyboxPaths),
    /// A single flat color in every direction
    Color(Color),
}

impl Default for SkyboxSource {
    fn default() -> Self {
        SkyboxSource::Color(Color::new(0.6, 0.7, 0.9))
    }
}

/// Initial camera placement.
///
/// `yaw = 0, pitch = 0` looks down -Z. Angles are in radians.
#[derive(Clone, Copy, Debug, PartialEq, Deserialize)]
#[serde(default)]
pub struct CameraSetup {
    pub position: Vec3,
    pub yaw: f32,
    pub pitch: f32,
    /// Vertical field of view in degrees
    pub vfov: f32,
}

impl Default for CameraSetup {
    fn default() -> Self {
        // Frames the demo scene from the front
        Self {
            position: Vec3::new(4.5, 3.0, 14.0),
            yaw: 0.0,
            pitch: -0.15,
            vfov: 60.0,
        }
    }
}

/// Everything needed to start rendering a scene.
#[derive(Clone, Debug)]
pub struct SceneDescription {
    pub scene: Scene,
    pub settings: RenderSettings,
    pub camera: CameraSetup,
    pub skybox: SkyboxSource,
}

#[derive(Deserialize)]
struct SceneFile {
    #[serde(default)]
    settings: RenderSettings,
    #[serde(default)]
    camera: CameraSetup,
    #[serde(default)]
    skybox: Option<SkyboxEntry>,
    #[serde(default)]
    objects: Vec<ObjectEntry>,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum SkyboxEntry {
    Color { color: Color },
    Dir { dir: PathBuf },
    Faces(SkyboxPaths),
}

#[derive(Deserialize)]
struct ObjectEntry {
    #[serde(flatten)]
    shape: Shape,
    #[serde(default)]
    material: Material,
}

/// Load a scene description from a JSON file.
///
/// Relative skybox paths resolve against the file's directory.
pub fn load_scene(path: impl AsRef<Path>) -> SceneResult<SceneDescription> {
    let path = path.as_ref();
    let text = std::fs::read_to_string(path)?;
    let base_dir = path.parent().unwrap_or_else(|| Path::new("."));

    let description = load_scene_from_str(&text, base_dir)?;
    log::info!(
        "Loaded scene '{}' ({} objects)",
        path.display(),
        description.scene.len()
    );
    Ok(description)
}

/// Parse a scene description, resolving relative paths against `base_dir`.
pub fn load_scene_from_str(text: &str, base_dir: &Path) -> SceneResult<SceneDescription> {
    let file: SceneFile = serde_json::from_str(text)?;

    let mut scene = Scene::new();
    for entry in file.objects {
        let shape = match entry.shape {
            Shape::Sphere { center, radius } => Shape::Sphere {
                center,
                radius: radius.max(0.0),
            },
            cuboid => cuboid,
        };
        scene.add(Object {
            shape,
            material: entry.material.sanitized(),
        })?;
    }

    let skybox = match file.skybox {
        None => SkyboxSource::default(),
        Some(SkyboxEntry::Color { color }) => SkyboxSource::Color(color),
        Some(SkyboxEntry::Dir { dir }) => SkyboxSource::Faces(SkyboxPaths::in_dir(dir).resolved(base_dir)),
        Some(SkyboxEntry::Faces(paths)) => SkyboxSource::Faces(paths.resolved(base_dir)),
    };

    Ok(SceneDescription {
        scene,
        settings: file.settings.validated(),
        camera: file.camera,
        skybox,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scene::{SceneError, MAX_OBJECTS};
    use crate::settings::LightPolicy;

    #[test]
    fn test_parse_objects() {
        let text = r#"{
            "objects": [
                { "sphere": { "center": [0, 1, 0], "radius": 1.5 },
                  "material": { "albedo": [1, 0, 0], "roughness": 4.0 } },
                { "cuboid": { "origin": [0, 0, 0], "size": [1, 2, 3] } }
            ]
        }"#;

        let description = load_scene_from_str(text, Path::new(".")).unwrap();
        let objects = description.scene.objects();
        assert_eq!(objects.len(), 2);

        assert_eq!(
            objects[0].shape,
            Shape::Sphere {
                center: Vec3::new(0.0, 1.0, 0.0),
                radius: 1.5
            }
        );
        assert_eq!(objects[0].material.albedo, Color::new(1.0, 0.0, 0.0));
        // Clamped on load
        assert_eq!(objects[0].material.roughness, 1.0);

        assert_eq!(
            objects[1].shape,
            Shape::Cuboid {
                origin: Vec3::ZERO,
                size: Vec3::new(1.0, 2.0, 3.0)
            }
        );
        assert_eq!(objects[1].material, Material::default());
    }

    #[test]
    fn test_defaults_when_sections_missing() {
        let description = load_scene_from_str("{}", Path::new(".")).unwrap();
        assert!(description.scene.is_empty());
        assert_eq!(description.settings, RenderSettings::default());
        assert_eq!(description.camera, CameraSetup::default());
        assert_eq!(description.skybox, SkyboxSource::default());
    }

    #[test]
    fn test_settings_and_camera() {
        let text = r#"{
            "settings": { "light_policy": "all_lights", "worker_count": 500 },
            "camera": { "position": [1, 2, 3], "vfov": 45 }
        }"#;

        let description = load_scene_from_str(text, Path::new(".")).unwrap();
        assert_eq!(description.settings.light_policy, LightPolicy::AllLights);
        assert_eq!(description.settings.worker_count, RenderSettings::MAX_WORKERS);
        assert_eq!(description.camera.position, Vec3::new(1.0, 2.0, 3.0));
        assert_eq!(description.camera.vfov, 45.0);
        assert_eq!(description.camera.yaw, 0.0);
    }

    #[test]
    fn test_skybox_sources() {
        let base = Path::new("/scenes");

        let color = load_scene_from_str(r#"{ "skybox": { "color": [0, 0, 0] } }"#, base).unwrap();
        assert_eq!(color.skybox, SkyboxSource::Color(Color::ZERO));

        let dir = load_scene_from_str(r#"{ "skybox": { "dir": "sky" } }"#, base).unwrap();
        assert_eq!(
            dir.skybox,
            SkyboxSource::Faces(SkyboxPaths::in_dir("/scenes/sky"))
        );

        let faces = load_scene_from_str(
            r#"{ "skybox": {
                "right": "r.png", "left": "l.png", "top": "t.png",
                "bottom": "b.png", "front": "f.png", "back": "/abs/k.png"
            } }"#,
            base,
        )
        .unwrap();
        match faces.skybox {
            SkyboxSource::Faces(paths) => {
                assert_eq!(paths.right, Path::new("/scenes/r.png"));
                assert_eq!(paths.back, Path::new("/abs/k.png"));
            }
            other => panic!("expected face paths, got {other:?}"),
        }
    }

    #[test]
    fn test_bundled_showcase_scene() {
        let text = include_str!("../../../scenes/showcase.json");
        let description = load_scene_from_str(text, Path::new("scenes")).unwrap();

        assert_eq!(description.scene.len(), 6);
        assert_eq!(description.scene.emitters().count(), 2);
        assert_eq!(description.settings.light_policy, LightPolicy::AllLights);
        assert_eq!(description.camera.vfov, 55.0);
    }

    #[test]
    fn test_parse_error() {
        let result = load_scene_from_str(r#"{ "objects": [ { "cone": {} } ] }"#, Path::new("."));
        assert!(matches!(result, Err(SceneError::Parse(_))));
    }

    #[test]
    fn test_too_many_objects() {
        let entry = r#"{ "sphere": { "center": [0, 0, 0], "radius": 1 } }"#;
        let entries = vec![entry; MAX_OBJECTS + 1].join(",");
        let text = format!(r#"{{ "objects": [{entries}] }}"#);

        let result = load_scene_from_str(&text, Path::new("."));
        assert!(matches!(result, Err(SceneError::CapacityExceeded { .. })));
    }

    #[test]
    fn test_missing_file() {
        let result = load_scene("/definitely/not/here.json");
        assert!(matches!(result, Err(SceneError::Io(_))));
    }
}
