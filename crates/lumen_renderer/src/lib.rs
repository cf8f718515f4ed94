//! Lumen Renderer - progressive CPU path tracing
//!
//! A Monte Carlo path tracer that refines its image continuously:
//!
//! - **Intersection**: linear scan over spheres and axis-aligned boxes
//! - **Shading**: fixed-length paths with direct light sampling and a
//!   Fresnel-driven choice between specular and diffuse bounces
//! - **Accumulation**: a shared running average fed by a pool of workers
//!   rendering at mixed resolutions, reset whenever the camera moves
//!
//! # Example
//!
//! ```ignore
//! use std::sync::Arc;
//! use lumen_renderer::{Camera, FrameBuffer, RenderState, WorkerPool};
//!
//! let state = Arc::new(RenderState::new(scene, skybox, settings, Camera::default()));
//! let _pool = WorkerPool::spawn(Arc::clone(&state))?;
//!
//! let mut frame = FrameBuffer::default();
//! loop {
//!     state.update_frame(1280, 720, &mut frame);
//!     present(&frame);
//! }
//! ```

mod accumulator;
mod camera;
mod intersect;
mod shading;
mod tiles;
mod worker;

pub use accumulator::{AccumulationStats, FrameBuffer, RenderState};
pub use camera::{Camera, MoveDirection, RayGenerator};
pub use intersect::{intersect_cuboid, intersect_object, intersect_sphere, trace_ray, Hit, SlabHit};
pub use shading::{fresnel_schlick, pixel, random_in_hemisphere, random_unit_vector, reflect, trace_path};
pub use tiles::{Splat, Tile, TileGrid};
pub use worker::{SyncOutcome, Worker, WorkerPool};

/// Re-export common types from the core crates
pub use lumen_core::Color;
pub use lumen_math::{Ray, Vec3};
