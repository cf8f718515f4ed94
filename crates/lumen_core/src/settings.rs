//! Render settings.
//!
//! Every field has a default, so scene files only need to list the values
//! they change.

use serde::Deserialize;

/// Which emitters contribute to direct light sampling at a hit point.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LightPolicy {
    /// Sample only the first emitter in scene order (other than the hit object).
    #[default]
    FirstLight,
    /// Sample every emitter and sum their contributions.
    AllLights,
}

/// What happens to the accumulated color sums when the camera moves.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InvalidationPolicy {
    /// Zero the sums along with the weight.
    #[default]
    ClearSums,
    /// Reset only the weight. Old sums linger in the numerator until new
    /// samples dilute them (or the warm-up pass overwrites them).
    RetainSums,
}

/// Tunable constants of the shader and the accumulation engine.
#[derive(Clone, Debug, PartialEq, Deserialize)]
#[serde(default)]
pub struct RenderSettings {
    /// Fixed path length, no Russian roulette
    pub max_bounces: u32,

    /// Shadow rays per light per hit
    pub light_samples: u32,

    /// Weight of the random jitter added to the direction towards a light
    pub light_spread: f32,

    /// Fraction of throughput traded for the direct light estimate
    pub light_sample_weight: f32,

    /// Offset applied to secondary ray origins
    pub ray_epsilon: f32,

    /// Number of background render threads
    pub worker_count: usize,

    /// Largest render scale handed to a worker
    pub max_worker_scale: u32,

    /// Scale of the synchronous pass run when nothing is accumulated yet
    pub warmup_scale: u32,

    pub light_policy: LightPolicy,

    pub invalidation: InvalidationPolicy,
}

impl Default for RenderSettings {
    fn default() -> Self {
        Self {
            max_bounces: 5,
            light_samples: 5,
            light_spread: 0.5,
            light_sample_weight: 0.05,
            ray_epsilon: 0.001,
            worker_count: 16,
            max_worker_scale: 16,
            warmup_scale: 16,
            light_policy: LightPolicy::FirstLight,
            invalidation: InvalidationPolicy::ClearSums,
        }
    }
}

impl RenderSettings {
    pub const MAX_WORKERS: usize = 64;

    /// Coarsest render scale, for both worker passes and the warm-up.
    pub const MAX_SCALE: u32 = 16;

    /// Bring out-of-range values back into their valid ranges.
    pub fn validated(mut self) -> Self {
        let clamped_workers = self.worker_count.clamp(1, Self::MAX_WORKERS);
        if clamped_workers != self.worker_count {
            log::warn!(
                "worker_count {} out of range, using {}",
                self.worker_count,
                clamped_workers
            );
            self.worker_count = clamped_workers;
        }

        self.max_worker_scale = clamp_scale("max_worker_scale", self.max_worker_scale);
        self.warmup_scale = clamp_scale("warmup_scale", self.warmup_scale);
        self.light_sample_weight = self.light_sample_weight.clamp(0.0, 1.0);
        self.light_spread = self.light_spread.max(0.0);
        self.ray_epsilon = self.ray_epsilon.max(0.0);
        self
    }
}

fn clamp_scale(name: &str, scale: u32) -> u32 {
    let clamped = scale.clamp(1, RenderSettings::MAX_SCALE);
    if clamped != scale {
        log::warn!("{name} {scale} out of range, using {clamped}");
    }
    clamped
}
