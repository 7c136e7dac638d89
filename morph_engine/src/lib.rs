//! # morph_engine
//!
//! Owns the live particle buffer and moves it, one frame at a time, toward
//! the current target [`PointCloud`] under the influence of a
//! [`GestureSignal`].
//!
//! ## Per-tick update
//!
//! 1. **Expansion**: with hands in view, `base + span × gain`; without,
//!    a slow breathing oscillation `sin(elapsed) × amplitude + 1`.
//! 2. **Tension**: the signal's tension with hands in view, else `0`.
//! 3. **Per-particle target**: the target point scaled by expansion.  Above
//!    the dead zone, tension pulls it toward the origin and adds uniform
//!    per-axis jitter, giving a clenched, vibrating field.
//! 4. **Lerp**: `pos += (target − pos) × min(1, rate × delta)`.  The clamp
//!    keeps a long frame (a stall, a dragged window) from overshooting.
//! 5. **Spin**: `rotation_y += base_spin + tension × tension_spin`.  The
//!    rotation is a rigid transform applied when rendering.
//!
//! Replacing the target never touches the live positions, so a new shape
//! morphs in from wherever the particles currently are.  Changing the
//! particle count reallocates the buffer and restarts from the origin.
//!
//! ```rust
//! use cloud_shapes::{generate, ShapeKind};
//! use hand_signal::GestureSignal;
//! use morph_engine::MorphEngine;
//!
//! let mut engine = MorphEngine::new(1000);
//! engine.set_target(generate(ShapeKind::Heart, 1000));
//! engine.tick(&GestureSignal::IDLE, 1.0 / 60.0);
//! assert_eq!(engine.state().positions().len(), 3000);
//! ```

use cloud_shapes::PointCloud;
use hand_signal::GestureSignal;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

// ════════════════════════════════════════════════════════════════════════════
// MorphParams
// ════════════════════════════════════════════════════════════════════════════

/// Tunable constants of the morph.  `Default` gives the stock feel.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct MorphParams {
    /// Exponential approach rate, per second.
    pub lerp_rate:         f32,
    /// Tension at or below this leaves the target untouched.
    pub dead_zone:         f32,
    /// Fraction of the radius removed at full tension.
    pub pull_strength:     f32,
    /// Jitter half-width per unit of tension.
    pub jitter:            f32,
    pub expansion_base:    f32,
    pub expansion_gain:    f32,
    pub breathe_amplitude: f32,
    /// Radians per tick.
    pub base_spin:         f32,
    /// Extra radians per tick at full tension.
    pub tension_spin:      f32,
}

impl Default for MorphParams {
    fn default() -> Self {
        MorphParams {
            lerp_rate:         4.0,
            dead_zone:         0.1,
            pull_strength:     0.8,
            jitter:            0.25,
            expansion_base:    0.5,
            expansion_gain:    2.0,
            breathe_amplitude: 0.1,
            base_spin:         0.001,
            tension_spin:      0.05,
        }
    }
}

impl MorphParams {
    /// `(expansion, tension)` for a signal at `elapsed` seconds.
    pub fn factors(&self, signal: &GestureSignal, elapsed: f32) -> (f32, f32) {
        if signal.hand_count > 0 {
            (self.expansion_base + signal.span * self.expansion_gain, signal.tension)
        } else {
            (elapsed.sin() * self.breathe_amplitude + 1.0, 0.0)
        }
    }

    /// Fraction of the remaining distance covered this tick, in `[0, 1]`.
    pub fn lerp_step(&self, delta: f32) -> f32 {
        if !delta.is_finite() || delta <= 0.0 {
            return 0.0;
        }
        (self.lerp_rate * delta).min(1.0)
    }
}

// ════════════════════════════════════════════════════════════════════════════
// ParticleState
// ════════════════════════════════════════════════════════════════════════════

/// Live particle positions plus the field's accumulated spin.
#[derive(Clone, Debug, PartialEq)]
pub struct ParticleState {
    positions:  Vec<f32>,
    rotation_y: f32,
}

impl ParticleState {
    /// `count` particles at the origin, no rotation.
    pub fn new(count: usize) -> Self {
        ParticleState { positions: vec![0.0; count * 3], rotation_y: 0.0 }
    }

    pub fn count(&self)       -> usize  { self.positions.len() / 3 }
    pub fn positions(&self)   -> &[f32] { &self.positions }
    pub fn rotation_y(&self)  -> f32    { self.rotation_y }

    pub fn point(&self, i: usize) -> [f32; 3] {
        let p = &self.positions[i * 3..i * 3 + 3];
        [p[0], p[1], p[2]]
    }

    /// Particle `i` with the field's Y rotation applied.
    pub fn rotated_point(&self, i: usize) -> [f32; 3] {
        let [x, y, z] = self.point(i);
        let (s, c) = self.rotation_y.sin_cos();
        [x * c + z * s, y, -x * s + z * c]
    }
}

// ════════════════════════════════════════════════════════════════════════════
// MorphEngine
// ════════════════════════════════════════════════════════════════════════════

pub struct MorphEngine {
    state:   ParticleState,
    target:  PointCloud,
    params:  MorphParams,
    elapsed: f32,
    rng:     StdRng,
}

impl MorphEngine {
    /// Engine for `count` particles with an entropy-seeded jitter source.
    pub fn new(count: usize) -> Self {
        Self::from_rng(count, StdRng::from_entropy())
    }

    /// Engine whose jitter sequence is reproducible.
    pub fn with_seed(count: usize, seed: u64) -> Self {
        Self::from_rng(count, StdRng::seed_from_u64(seed))
    }

    fn from_rng(count: usize, rng: StdRng) -> Self {
        MorphEngine {
            state:   ParticleState::new(count),
            target:  PointCloud::zeros(count),
            params:  MorphParams::default(),
            elapsed: 0.0,
            rng,
        }
    }

    pub fn with_params(mut self, params: MorphParams) -> Self {
        self.params = params;
        self
    }

    pub fn set_params(&mut self, params: MorphParams) { self.params = params; }

    pub fn params(&self)         -> &MorphParams   { &self.params }
    pub fn state(&self)          -> &ParticleState { &self.state }
    pub fn target(&self)         -> &PointCloud    { &self.target }
    pub fn elapsed(&self)        -> f32            { self.elapsed }
    pub fn particle_count(&self) -> usize          { self.state.count() }

    /// Swap the morph target.  Live positions are left where they are.
    pub fn set_target(&mut self, target: PointCloud) {
        if target.len_points() != self.particle_count() {
            log::debug!(
                "target has {} points for {} particles; missing coordinates read as 0",
                target.len_points(), self.particle_count()
            );
        }
        self.target = target;
    }

    /// Reallocate for a new particle count; every particle restarts at the
    /// origin.  A no-op when the count is unchanged.
    pub fn resize(&mut self, count: usize) {
        if count == self.particle_count() { return; }
        let rotation_y = self.state.rotation_y;
        self.state = ParticleState::new(count);
        self.state.rotation_y = rotation_y;
    }

    /// Advance one frame.  Returns the rotation added this tick.
    pub fn tick(&mut self, signal: &GestureSignal, delta: f32) -> f32 {
        let p = self.params;
        let step = p.lerp_step(delta);
        if step > 0.0 {
            self.elapsed += delta;
        }

        let (expansion, tension) = p.factors(signal, self.elapsed);
        let clenched = tension > p.dead_zone;
        let pull     = 1.0 - tension * p.pull_strength;
        let jitter   = p.jitter * tension;

        let target = &self.target;
        let rng    = &mut self.rng;
        for (i, pos) in self.state.positions.chunks_exact_mut(3).enumerate() {
            let mut goal = target.point(i);
            for axis in 0..3 {
                let mut g = goal[axis] * expansion;
                if clenched {
                    g = g * pull + rng.gen_range(-1.0f32..=1.0) * jitter;
                }
                goal[axis] = g;
            }
            for axis in 0..3 {
                pos[axis] += (goal[axis] - pos[axis]) * step;
            }
        }

        let spin = p.base_spin + tension * p.tension_spin;
        self.state.rotation_y += spin;
        spin
    }
}

// ════════════════════════════════════════════════════════════════════════════
// Tests
// ════════════════════════════════════════════════════════════════════════════
