//! Shared progressive accumulation buffer.
//!
//! Workers shade into private buffers and fold them into the shared sums
//! under a single mutex. Every invalidation bumps a generation counter;
//! contributions rendered for an older generation are dropped instead of
//! merged. The display side reads a normalized copy with
//! [`RenderState::update_frame`].

use lumen_core::{Color, Cubemap, InvalidationPolicy, RenderSettings, Scene};
use parking_lot::{Mutex, MutexGuard};
use rand::rngs::StdRng;
use rand::SeedableRng;
use rayon::prelude::*;

use crate::camera::Camera;
use crate::shading::pixel;
use crate::tiles::{Splat, TileGrid};

/// Shared accumulation data, only touched while holding the lock.
#[derive(Debug)]
pub(crate) struct Accumulation {
    pub(crate) sums: Vec<Color>,
    pub(crate) weight: f32,
    pub(crate) generation: u64,
    pub(crate) width: u32,
    pub(crate) height: u32,
    pub(crate) camera: Camera,
}

/// Snapshot of the accumulation bookkeeping.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AccumulationStats {
    pub generation: u64,
    pub weight: f32,
    pub width: u32,
    pub height: u32,
}

/// Everything the workers and the display share.
///
/// The scene, skybox and settings are immutable after construction. The
/// accumulation buffer and the camera live behind one mutex so a camera
/// change and the invalidation it causes happen atomically.
pub struct RenderState {
    scene: Scene,
    skybox: Cubemap,
    settings: RenderSettings,
    accumulation: Mutex<Accumulation>,
}

impl RenderState {
    /// Create the state with an empty (0x0) frame.
    ///
    /// Workers stay idle until the first [`update_frame`](Self::update_frame)
    /// sets a resolution.
    pub fn new(scene: Scene, skybox: Cubemap, settings: RenderSettings, camera: Camera) -> Self {
        Self {
            scene,
            skybox,
            settings: settings.validated(),
            accumulation: Mutex::new(Accumulation {
                sums: Vec::new(),
                weight: 0.0,
                generation: 0,
                width: 0,
                height: 0,
                camera,
            }),
        }
    }

    pub fn scene(&self) -> &Scene {
        &self.scene
    }

    pub fn skybox(&self) -> &Cubemap {
        &self.skybox
    }

    pub fn settings(&self) -> &RenderSettings {
        &self.settings
    }

    /// Current camera pose.
    pub fn camera(&self) -> Camera {
        self.accumulation.lock().camera
    }

    pub(crate) fn lock(&self) -> MutexGuard<'_, Accumulation> {
        self.accumulation.lock()
    }

    /// Discard everything accumulated so far.
    ///
    /// Resets the weight and bumps the generation so in-flight worker
    /// passes are dropped at their next sync.
    pub fn invalidate_accumulation(&self) {
        let mut acc = self.accumulation.lock();
        self.invalidate_locked(&mut acc);
    }

    /// Change the camera and invalidate in one step.
    ///
    /// `update` runs with the accumulation lock held. It must not call back
    /// into this `RenderState` (`camera`, `stats`, `update_frame`, ...), since
    /// the lock is not reentrant and that would deadlock.
    pub fn update_camera<R>(&self, update: impl FnOnce(&mut Camera) -> R) -> R {
        let mut acc = self.accumulation.lock();
        let result = update(&mut acc.camera);
        self.invalidate_locked(&mut acc);
        result
    }

    fn invalidate_locked(&self, acc: &mut Accumulation) {
        acc.weight = 0.0;
        acc.generation += 1;
        if self.settings.invalidation == InvalidationPolicy::ClearSums {
            acc.sums.fill(Color::ZERO);
        }
        log::debug!("Accumulation invalidated, generation {}", acc.generation);
    }

    /// Write the normalized frame at `width x height` into `frame`.
    ///
    /// A resolution change reallocates the shared sums and starts a new
    /// generation. If nothing has been accumulated yet, a coarse pass is
    /// rendered synchronously first so the frame is never empty.
    pub fn update_frame(&self, width: u32, height: u32, frame: &mut FrameBuffer) {
        let mut acc = self.accumulation.lock();

        if acc.width != width || acc.height != height {
            log::debug!(
                "Resizing accumulation {}x{} -> {}x{}",
                acc.width,
                acc.height,
                width,
                height
            );
            acc.width = width;
            acc.height = height;
            acc.sums = vec![Color::ZERO; width as usize * height as usize];
            acc.weight = 0.0;
            acc.generation += 1;
        }

        frame.resize(width, height);
        if acc.sums.is_empty() {
            return;
        }

        if acc.weight == 0.0 {
            self.warm_up(&mut acc);
        }

        let inv_weight = 1.0 / acc.weight;
        frame
            .pixels
            .par_iter_mut()
            .zip(acc.sums.par_iter())
            .for_each(|(out, sum)| *out = *sum * inv_weight);
    }

    /// Overwrite the shared sums with one pass at `warmup_scale`.
    fn warm_up(&self, acc: &mut Accumulation) {
        let grid = TileGrid::new(acc.width, acc.height, self.settings.warmup_scale);
        let aspect_ratio = acc.width as f32 / acc.height as f32;
        let camera = acc.camera;

        acc.sums
            .par_chunks_mut(grid.band_len())
            .enumerate()
            .for_each_init(StdRng::from_entropy, |rng, (row, band)| {
                grid.splat_band(band, row as u32, Splat::Assign, |u, v| {
                    pixel(
                        &camera,
                        &self.scene,
                        &self.skybox,
                        &self.settings,
                        u,
                        v,
                        aspect_ratio,
                        rng,
                    )
                });
            });

        acc.weight += grid.sample_weight();
    }

    pub fn stats(&self) -> AccumulationStats {
        let acc = self.accumulation.lock();
        AccumulationStats {
            generation: acc.generation,
            weight: acc.weight,
            width: acc.width,
            height: acc.height,
        }
    }
}

/// Normalized frame handed to the display.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FrameBuffer {
    pub width: u32,
    pub height: u32,
    /// Row-major, top row first
    pub pixels: Vec<Color>,
}

impl FrameBuffer {
    /// Create a new frame buffer filled with black.
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            pixels: vec![Color::ZERO; width as usize * height as usize],
        }
    }

    fn resize(&mut self, width: u32, height: u32) {
        if self.width != width || self.height != height {
            *self = Self::new(width, height);
        }
    }

    /// Get the pixel at (x, y).
    pub fn get(&self, x: u32, y: u32) -> Color {
        self.pixels[(y * self.width + x) as usize]
    }

    /// Convert to RGBA bytes, clamping linearly (no gamma).
    pub fn to_rgba8(&self) -> Vec<u8> {
        let mut bytes = Vec::with_capacity(self.pixels.len() * 4);
        for color in &self.pixels {
            let c = color.clamp(Color::ZERO, Color::ONE) * 255.0;
            bytes.extend_from_slice(&[c.x as u8, c.y as u8, c.z as u8, 255]);
        }
        bytes
    }
}
