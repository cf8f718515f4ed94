//! Background render workers.
//!
//! Each worker renders full passes at a fixed scale into a private buffer,
//! then briefly takes the shared lock to merge the pass (if it is still
//! current) and pick up the latest generation, resolution and camera.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;

use lumen_core::{Color, RenderSettings};
use rand::rngs::StdRng;
use rand::{RngCore, SeedableRng};

use crate::accumulator::RenderState;
use crate::camera::Camera;
use crate::shading::pixel;
use crate::tiles::{Splat, TileGrid};

/// Sleep between polls while there is no frame to render.
const IDLE_SLEEP: Duration = Duration::from_millis(5);

/// What happened to a worker's pending pass during [`Worker::sync`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncOutcome {
    /// The pass was added to the shared sums.
    Merged,
    /// The accumulation was invalidated or resized since the pass started.
    Discarded,
    /// There was nothing to merge.
    Idle,
}

/// One render worker's private state.
pub struct Worker {
    scale: u32,
    sums: Vec<Color>,
    weight: f32,
    generation: u64,
    width: u32,
    height: u32,
    camera: Camera,
}

impl Worker {
    pub fn new(scale: u32) -> Self {
        Self {
            scale: scale.max(1),
            sums: Vec::new(),
            weight: 0.0,
            generation: 0,
            width: 0,
            height: 0,
            camera: Camera::default(),
        }
    }

    /// Scale for the worker at `index`: `2^index`, or 1 once that would
    /// exceed `max_scale` (itself capped at [`RenderSettings::MAX_SCALE`]).
    pub fn initial_scale(index: usize, max_scale: u32) -> u32 {
        let cap = max_scale.min(RenderSettings::MAX_SCALE);
        u32::try_from(index)
            .ok()
            .and_then(|shift| 1u32.checked_shl(shift))
            .filter(|scale| *scale <= cap)
            .unwrap_or(1)
    }

    pub fn scale(&self) -> u32 {
        self.scale
    }

    /// Merge the pending pass and adopt the current shared frame.
    pub fn sync(&mut self, state: &RenderState) -> SyncOutcome {
        let mut acc = state.lock();

        let outcome = if self.weight == 0.0 {
            SyncOutcome::Idle
        } else if self.generation == acc.generation
            && self.width == acc.width
            && self.height == acc.height
        {
            for (shared, local) in acc.sums.iter_mut().zip(&self.sums) {
                *shared += *local;
            }
            acc.weight += self.weight;
            SyncOutcome::Merged
        } else {
            SyncOutcome::Discarded
        };

        let resized = self.width != acc.width || self.height != acc.height;
        self.generation = acc.generation;
        self.width = acc.width;
        self.height = acc.height;
        self.camera = acc.camera;
        drop(acc);

        if outcome == SyncOutcome::Discarded {
            log::trace!("Dropped stale pass at scale {}", self.scale);
        }

        self.weight = 0.0;
        if resized {
            self.sums = vec![Color::ZERO; self.width as usize * self.height as usize];
        } else {
            self.sums.fill(Color::ZERO);
        }

        outcome
    }

    /// Render one full pass at this worker's scale into the private buffer.
    ///
    /// Returns false if there is no frame yet.
    pub fn render_pass(&mut self, state: &RenderState, rng: &mut dyn RngCore) -> bool {
        if self.width == 0 || self.height == 0 {
            return false;
        }

        let grid = TileGrid::new(self.width, self.height, self.scale);
        let aspect_ratio = self.width as f32 / self.height as f32;
        let camera = self.camera;

        for (row, band) in self.sums.chunks_mut(grid.band_len()).enumerate() {
            grid.splat_band(band, row as u32, Splat::Add, |u, v| {
                pixel(
                    &camera,
                    state.scene(),
                    state.skybox(),
                    state.settings(),
                    u,
                    v,
                    aspect_ratio,
                    rng,
                )
            });
        }

        self.weight += grid.sample_weight();
        true
    }

    fn run(mut self, state: Arc<RenderState>, stop: Arc<AtomicBool>) {
        let mut rng = StdRng::from_entropy();

        while !stop.load(Ordering::Relaxed) {
            self.sync(&state);
            if !self.render_pass(&state, &mut rng) {
                thread::sleep(IDLE_SLEEP);
            }
        }
    }
}

/// Fixed set of render threads sharing one [`RenderState`].
///
/// Threads stop after their current pass once [`shutdown`](Self::shutdown)
/// is called or the pool is dropped.
pub struct WorkerPool {
    stop: Arc<AtomicBool>,
    handles: Vec<JoinHandle<()>>,
}

impl WorkerPool {
    /// Start `settings().worker_count` workers.
    pub fn spawn(state: Arc<RenderState>) -> std::io::Result<Self> {
        let settings = state.settings();
        let count = settings.worker_count;
        let max_scale = settings.max_worker_scale;

        let mut pool = Self {
            stop: Arc::new(AtomicBool::new(false)),
            handles: Vec::with_capacity(count),
        };

        for index in 0..count {
            let worker = Worker::new(Worker::initial_scale(index, max_scale));
            let state = Arc::clone(&state);
            let stop = Arc::clone(&pool.stop);

            let handle = thread::Builder::new()
                .name(format!("lumen-worker-{index}"))
                .spawn(move || worker.run(state, stop))?;
            pool.handles.push(handle);
        }

        log::info!("Started {} render workers", count);
        Ok(pool)
    }

    /// Number of running workers.
    pub fn len(&self) -> usize {
        self.handles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.handles.is_empty()
    }

    /// Signal every worker to stop and wait for them.
    pub fn shutdown(&mut self) {
        if self.handles.is_empty() {
            return;
        }

        self.stop.store(true, Ordering::Relaxed);
        let count = self.handles.len();
        for handle in self.handles.drain(..) {
            if handle.join().is_err() {
                log::error!("Render worker panicked");
            }
        }
        log::info!("Stopped {} render workers", count);
    }
}

impl Drop for WorkerPool {
    fn drop(&mut self) {
        self.shutdown();
    }
}
