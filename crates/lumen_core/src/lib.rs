//! Lumen Core - scene model, skybox storage and render settings.
//!
//! This crate provides:
//!
//! - **Scene model**: `Material`, `Shape`, `Object`, `Scene`
//! - **Skybox**: six-face `Cubemap` loading and direction lookup
//! - **Configuration**: `RenderSettings` and JSON scene descriptions
//!
//! # Example
//!
//! ```ignore
//! use lumen_core::load_scene;
//!
//! let description = load_scene("scenes/room.json")?;
//! println!("Loaded {} objects", description.scene.len());
//! ```

pub mod cubemap;
pub mod description;
pub mod scene;
pub mod settings;

/// Linear RGB color (unitless, typically 0-1)
pub type Color = lumen_math::Vec3;

// Re-export commonly used types
pub use cubemap::{CubeFace, Cubemap, CubemapError, SkyboxPaths};
pub use description::{load_scene, load_scene_from_str, CameraSetup, SceneDescription, SkyboxSource};
pub use scene::{demo_scene, Material, Object, Scene, SceneError, Shape, MAX_OBJECTS};
pub use settings::{InvalidationPolicy, LightPolicy, RenderSettings};
