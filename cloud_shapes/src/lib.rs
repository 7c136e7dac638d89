//! # cloud_shapes
//!
//! Flat point clouds for the particle field: one procedural generator per
//! [`ShapeKind`], plus an adapter that turns an externally supplied number
//! list (a saved payload, or the output of a generative service) into a
//! cloud of the expected size.
//!
//! A cloud of `n` points is always exactly `3 × n` floats laid out as
//! `[x0, y0, z0, x1, y1, z1, …]`.
//!
//! ## Quick start
//!
//! ```rust
//! use cloud_shapes::{generate, PointCloud, ShapeKind};
//!
//! let heart = generate(ShapeKind::Heart, 3000);
//! assert_eq!(heart.as_slice().len(), 9000);
//!
//! // External lists are padded with zeros (or truncated) to fit.
//! let custom = PointCloud::from_external(&[1.0, 2.0, 3.0, 4.0, 5.0], 2);
//! assert_eq!(custom.as_slice(), &[1.0, 2.0, 3.0, 4.0, 5.0, 0.0]);
//! ```
//!
//! Generators sample independently on every call, so selecting the same
//! shape twice yields two different concrete clouds.  Use
//! [`generate_with`] and a seeded RNG when a reproducible cloud is needed.

use std::f32::consts::PI;
use std::fmt;
use std::str::FromStr;

use rand::Rng;
use serde::Serialize;
use thiserror::Error;

// ════════════════════════════════════════════════════════════════════════════
// Errors
// ════════════════════════════════════════════════════════════════════════════

/// Failures while reading a points payload or parsing a shape name.
#[derive(Debug, Error)]
pub enum CloudError {
    #[error("payload is not valid JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("payload has no `points` array")]
    MissingPoints,

    #[error("`points[{index}]` is not a number")]
    NotANumber { index: usize },

    #[error("i/o error: {0}")]
    Io(#[from] std::io::Error),

    #[error("unknown shape `{0}`")]
    UnknownShape(String),
}

// ════════════════════════════════════════════════════════════════════════════
// ShapeKind
// ════════════════════════════════════════════════════════════════════════════

/// The shapes a particle field can morph toward.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ShapeKind {
    Heart,
    Sphere,
    /// Planet with a thin ring disk.
    RingedPlanet,
    /// Polar rose ("flower").
    Rose,
    /// Stacked-ellipsoid seated figure.
    Humanoid,
    /// Solid-ball dispersion ("fireworks").
    Burst,
    /// Externally supplied point list.
    Custom,
}

impl ShapeKind {
    /// Every kind with a procedural generator, in menu order.
    pub const PROCEDURAL: [ShapeKind; 6] = [
        ShapeKind::Heart,
        ShapeKind::Sphere,
        ShapeKind::RingedPlanet,
        ShapeKind::Rose,
        ShapeKind::Humanoid,
        ShapeKind::Burst,
    ];

    /// Human-readable name shown in menus and the status bar.
    pub fn name(self) -> &'static str {
        match self {
            ShapeKind::Heart        => "Heart",
            ShapeKind::Sphere       => "Sphere",
            ShapeKind::RingedPlanet => "Saturn",
            ShapeKind::Rose         => "Flower",
            ShapeKind::Humanoid     => "Buddha",
            ShapeKind::Burst        => "Fireworks",
            ShapeKind::Custom       => "AI Generated",
        }
    }

    /// Short lowercase key accepted on the command line.
    pub fn key(self) -> &'static str {
        match self {
            ShapeKind::Heart        => "heart",
            ShapeKind::Sphere       => "sphere",
            ShapeKind::RingedPlanet => "planet",
            ShapeKind::Rose         => "rose",
            ShapeKind::Humanoid     => "humanoid",
            ShapeKind::Burst        => "burst",
            ShapeKind::Custom       => "custom",
        }
    }

    pub fn is_procedural(self) -> bool { self != ShapeKind::Custom }
}

impl fmt::Display for ShapeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for ShapeKind {
    type Err = CloudError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let kind = match s.trim().to_ascii_lowercase().as_str() {
            "heart"                                  => ShapeKind::Heart,
            "sphere"                                 => ShapeKind::Sphere,
            "planet" | "saturn" | "ringed-planet"    => ShapeKind::RingedPlanet,
            "rose" | "flower"                        => ShapeKind::Rose,
            "humanoid" | "buddha"                    => ShapeKind::Humanoid,
            "burst" | "fireworks"                    => ShapeKind::Burst,
            "custom" | "ai" | "ai generated"         => ShapeKind::Custom,
            other => return Err(CloudError::UnknownShape(other.to_string())),
        };
        Ok(kind)
    }
}

// ════════════════════════════════════════════════════════════════════════════
// PointCloud
// ════════════════════════════════════════════════════════════════════════════

/// An exclusively owned flat buffer of `3 × n` coordinates.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct PointCloud {
    data: Vec<f32>,
}

#[derive(Serialize)]
struct PointsPayload<'a> {
    points: &'a [f32],
}

impl PointCloud {
    /// `count` points at the origin.
    pub fn zeros(count: usize) -> Self {
        PointCloud { data: vec![0.0; count * 3] }
    }

    /// Adapt an external list to exactly `3 × count` values.
    ///
    /// Missing trailing coordinates become `0.0`; surplus values are
    /// dropped.  A length mismatch is never an error.
    pub fn from_external(values: &[f32], count: usize) -> Self {
        let want = count * 3;
        let mut data = Vec::with_capacity(want);
        data.extend(values.iter().take(want).copied());
        data.resize(want, 0.0);
        PointCloud { data }
    }

    /// Parse a `{"points": [...]}` payload and adapt it to `count` points.
    pub fn from_json_payload(text: &str, count: usize) -> Result<Self, CloudError> {
        let values = parse_points_payload(text)?;
        Ok(PointCloud::from_external(&values, count))
    }

    /// Serialise as a `{"points": [...]}` payload.
    pub fn to_json_payload(&self) -> Result<String, CloudError> {
        Ok(serde_json::to_string(&PointsPayload { points: &self.data })?)
    }

    /// Number of points (`len / 3`).
    pub fn len_points(&self) -> usize { self.data.len() / 3 }
    pub fn is_empty(&self)   -> bool  { self.data.is_empty() }
    pub fn as_slice(&self)   -> &[f32] { &self.data }
    pub fn into_vec(self)    -> Vec<f32> { self.data }

    /// Point `i`, or the origin when `i` is past the end.
    pub fn point(&self, i: usize) -> [f32; 3] {
        let at = |k: usize| self.data.get(k).copied().unwrap_or(0.0);
        [at(i * 3), at(i * 3 + 1), at(i * 3 + 2)]
    }

    /// Axis-aligned `(min, max)` corners, `None` for an empty cloud.
    pub fn bounds(&self) -> Option<([f32; 3], [f32; 3])> {
        let mut chunks = self.data.chunks_exact(3);
        let first = chunks.next()?;
        let mut lo = [first[0], first[1], first[2]];
        let mut hi = lo;
        for p in chunks {
            for a in 0..3 {
                lo[a] = lo[a].min(p[a]);
                hi[a] = hi[a].max(p[a]);
            }
        }
        Some((lo, hi))
    }

    /// Mean position, `None` for an empty cloud.
    pub fn centroid(&self) -> Option<[f32; 3]> {
        let n = self.len_points();
        if n == 0 { return None; }
        let mut sum = [0.0f64; 3];
        for p in self.data.chunks_exact(3) {
            for a in 0..3 { sum[a] += p[a] as f64; }
        }
        Some([
            (sum[0] / n as f64) as f32,
            (sum[1] / n as f64) as f32,
            (sum[2] / n as f64) as f32,
        ])
    }
}

/// Extract the raw number list from a `{"points": [...]}` JSON document.
///
/// A body that is not JSON, lacks a `points` array, or holds a non-numeric
/// entry is rejected as a whole; there is no partial result.
pub fn parse_points_payload(text: &str) -> Result<Vec<f32>, CloudError> {
    let value: serde_json::Value = serde_json::from_str(text)?;
    let points = value
        .get("points")
        .and_then(|p| p.as_array())
        .ok_or(CloudError::MissingPoints)?;

    points
        .iter()
        .enumerate()
        .map(|(index, v)| {
            v.as_f64()
                .map(|x| x as f32)
                .ok_or(CloudError::NotANumber { index })
        })
        .collect()
}

// ════════════════════════════════════════════════════════════════════════════
// Generators
// ════════════════════════════════════════════════════════════════════════════

const SPHERE_RADIUS:   f32 = 2.0;
const HEART_XY_SCALE:  f32 = 0.1;
const HEART_Z_SCALE:   f32 = 0.5;
const HEART_DEPTH:     f32 = 5.0;
const PLANET_RADIUS:   f32 = 1.5;
const RING_INNER:      f32 = 2.2;
const RING_WIDTH:      f32 = 2.5;
const RING_THICKNESS:  f32 = 0.1;
const ROSE_PETALS:     f32 = 4.0;
const BURST_RADIUS:    f32 = 4.0;

/// Generate `count` points of `kind` using the thread-local RNG.
///
/// `ShapeKind::Custom` has no formula of its own; without an external list
/// it falls back to a sphere.
pub fn generate(kind: ShapeKind, count: usize) -> PointCloud {
    generate_with(kind, count, &mut rand::thread_rng())
}

/// Generate `count` points of `kind` drawing from `rng`.
pub fn generate_with<R: Rng + ?Sized>(kind: ShapeKind, count: usize, rng: &mut R) -> PointCloud {
    let mut cloud = PointCloud::zeros(count);
    // 40% planet, rounded up.
    let planet_points = (count * 2 + 4) / 5;

    for (i, p) in cloud.data.chunks_exact_mut(3).enumerate() {
        let xyz = match kind {
            ShapeKind::Heart => heart_point(rng),
            ShapeKind::Sphere | ShapeKind::Custom => on_sphere(rng, SPHERE_RADIUS),
            ShapeKind::RingedPlanet if i < planet_points => on_sphere(rng, PLANET_RADIUS),
            ShapeKind::RingedPlanet => ring_point(rng),
            ShapeKind::Rose => rose_point(rng),
            ShapeKind::Humanoid => humanoid_point(rng),
            ShapeKind::Burst => {
                let r = rng.gen::<f32>() * BURST_RADIUS;
                on_sphere(rng, r)
            }
        };
        p.copy_from_slice(&xyz);
    }
    cloud
}

/// Uniform sample on a sphere of radius `r` (inverse-CDF polar angle).
fn on_sphere<R: Rng + ?Sized>(rng: &mut R, r: f32) -> [f32; 3] {
    let theta = rng.gen::<f32>() * PI * 2.0;
    let phi   = (2.0 * rng.gen::<f32>() - 1.0).clamp(-1.0, 1.0).acos();
    [
        r * phi.sin() * theta.cos(),
        r * phi.sin() * theta.sin(),
        r * phi.cos(),
    ]
}

fn heart_point<R: Rng + ?Sized>(rng: &mut R) -> [f32; 3] {
    let t = rng.gen::<f32>() * PI * 2.0;
    let x = 16.0 * t.sin().powi(3);
    let y = 13.0 * t.cos() - 5.0 * (2.0 * t).cos() - 2.0 * (3.0 * t).cos() - (4.0 * t).cos();
    let z = (rng.gen::<f32>() - 0.5) * HEART_DEPTH;
    [x * HEART_XY_SCALE, y * HEART_XY_SCALE, z * HEART_Z_SCALE]
}

fn ring_point<R: Rng + ?Sized>(rng: &mut R) -> [f32; 3] {
    let angle = rng.gen::<f32>() * PI * 2.0;
    let r     = RING_INNER + rng.gen::<f32>() * RING_WIDTH;
    let y     = (rng.gen::<f32>() - 0.5) * RING_THICKNESS;
    [r * angle.cos(), y, r * angle.sin()]
}

fn rose_point<R: Rng + ?Sized>(rng: &mut R) -> [f32; 3] {
    let u = rng.gen::<f32>() * PI * 2.0;
    let v = rng.gen::<f32>() * PI;
    let r = 2.0 * (ROSE_PETALS * u).cos() + 1.0;
    [r * u.cos() * v.sin(), r * v.cos(), r * u.sin() * v.sin()]
}

/// Base (40%), torso (40%) or head (20%), each a squashed sphere.
fn humanoid_point<R: Rng + ?Sized>(rng: &mut R) -> [f32; 3] {
    // (vertical offset, radius, x/y/z squash)
    let (cy, r, squash) = match rng.gen::<f32>() {
        s if s < 0.4 => (-1.5, 1.5, [1.2, 0.6, 1.0]),
        s if s < 0.8 => ( 0.0, 1.0, [1.0, 1.0, 0.8]),
        _            => ( 1.4, 0.6, [1.0, 1.0, 1.0]),
    };
    let p = on_sphere(rng, r);
    [p[0] * squash[0], cy + p[1] * squash[1], p[2] * squash[2]]
}

// ════════════════════════════════════════════════════════════════════════════
// Tests
// ════════════════════════════════════════════════════════════════════════════

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    const ALL: [ShapeKind; 7] = [
        ShapeKind::Heart, ShapeKind::Sphere, ShapeKind::RingedPlanet, ShapeKind::Rose,
        ShapeKind::Humanoid, ShapeKind::Burst, ShapeKind::Custom,
    ];

    fn norm(p: [f32; 3]) -> f32 { (p[0]*p[0] + p[1]*p[1] + p[2]*p[2]).sqrt() }

    #[test]
    fn every_kind_yields_three_floats_per_point() {
        for kind in ALL {
            for n in [0usize, 1, 2, 7, 500] {
                let c = generate(kind, n);
                assert_eq!(c.as_slice().len(), 3 * n, "{} x {}", kind, n);
                assert_eq!(c.len_points(), n);
            }
        }
    }

    #[test]
    fn zero_count_is_empty() {
        let c = generate(ShapeKind::Rose, 0);
        assert!(c.is_empty());
        assert!(c.bounds().is_none());
        assert!(c.centroid().is_none());
    }

    #[test]
    fn sphere_points_lie_on_radius_two() {
        let mut rng = StdRng::seed_from_u64(7);
        let c = generate_with(ShapeKind::Sphere, 400, &mut rng);
        for i in 0..c.len_points() {
            assert_relative_eq!(norm(c.point(i)), 2.0, epsilon = 1e-4);
        }
    }

    #[test]
    fn sphere_is_roughly_centred() {
        let mut rng = StdRng::seed_from_u64(11);
        let c = generate_with(ShapeKind::Sphere, 20_000, &mut rng);
        let m = c.centroid().unwrap();
        for a in m { assert!(a.abs() < 0.1, "centroid {:?}", m); }
    }

    #[test]
    fn heart_stays_within_scaled_curve() {
        let mut rng = StdRng::seed_from_u64(3);
        let c = generate_with(ShapeKind::Heart, 2000, &mut rng);
        let (lo, hi) = c.bounds().unwrap();
        assert!(lo[0] >= -1.61 && hi[0] <= 1.61);
        assert!(lo[1] >= -1.71 && hi[1] <= 1.31);
        assert!(lo[2] >= -1.25 && hi[2] <= 1.25);
    }

    #[test]
    fn ringed_planet_splits_forty_sixty() {
        let mut rng = StdRng::seed_from_u64(5);
        let n = 1000;
        let c = generate_with(ShapeKind::RingedPlanet, n, &mut rng);
        for i in 0..400 {
            assert_relative_eq!(norm(c.point(i)), 1.5, epsilon = 1e-4);
        }
        for i in 400..n {
            let [x, y, z] = c.point(i);
            let r = (x * x + z * z).sqrt();
            assert!(r >= 2.2 - 1e-4 && r <= 4.7 + 1e-4, "ring radius {}", r);
            assert!(y.abs() <= 0.05 + 1e-6);
        }
    }

    #[test]
    fn rose_radius_bounded_by_polar_formula() {
        let mut rng = StdRng::seed_from_u64(9);
        let c = generate_with(ShapeKind::Rose, 1000, &mut rng);
        for i in 0..c.len_points() {
            assert!(norm(c.point(i)) <= 3.0 + 1e-4);
        }
    }

    #[test]
    fn humanoid_regions_stack_vertically() {
        let mut rng = StdRng::seed_from_u64(13);
        let c = generate_with(ShapeKind::Humanoid, 3000, &mut rng);
        let (lo, hi) = c.bounds().unwrap();
        assert!(lo[1] >= -2.4 - 1e-4, "base bottom {}", lo[1]);
        assert!(hi[1] <= 2.0 + 1e-4, "head top {}", hi[1]);
        assert!(lo[0] >= -1.8 - 1e-4 && hi[0] <= 1.8 + 1e-4);
    }

    #[test]
    fn burst_fills_a_ball_of_radius_four() {
        let mut rng = StdRng::seed_from_u64(17);
        let c = generate_with(ShapeKind::Burst, 2000, &mut rng);
        let radii: Vec<f32> = (0..c.len_points()).map(|i| norm(c.point(i))).collect();
        assert!(radii.iter().all(|&r| r <= 4.0 + 1e-4));
        // Solid ball, not a shell: plenty of points well inside.
        assert!(radii.iter().filter(|&&r| r < 2.0).count() > 500);
    }

    #[test]
    fn seeded_generation_is_reproducible() {
        let a = generate_with(ShapeKind::Heart, 64, &mut StdRng::seed_from_u64(42));
        let b = generate_with(ShapeKind::Heart, 64, &mut StdRng::seed_from_u64(42));
        assert_eq!(a, b);
    }

    #[test]
    fn reselection_produces_a_fresh_cloud() {
        let a = generate(ShapeKind::Sphere, 64);
        let b = generate(ShapeKind::Sphere, 64);
        assert_ne!(a, b);
    }

    #[test]
    fn adapter_pads_missing_trailing_values() {
        let c = PointCloud::from_external(&[1.0, 2.0, 3.0, 4.0, 5.0], 2);
        assert_eq!(c.as_slice(), &[1.0, 2.0, 3.0, 4.0, 5.0, 0.0]);
    }

    #[test]
    fn adapter_truncates_surplus_values() {
        let c = PointCloud::from_external(&[1.0, 2.0, 3.0, 4.0, 5.0, 6.0, 7.0], 2);
        assert_eq!(c.as_slice(), &[1.0, 2.0, 3.0, 4.0, 5.0, 6.0]);
    }

    #[test]
    fn point_past_end_is_origin() {
        let c = PointCloud::from_external(&[1.0, 2.0, 3.0], 1);
        assert_eq!(c.point(5), [0.0, 0.0, 0.0]);
    }

    #[test]
    fn payload_scenario_pads_to_particle_count() {
        let c = PointCloud::from_json_payload(r#"{"points": [1,2,3,4,5]}"#, 2).unwrap();
        assert_eq!(c.as_slice(), &[1.0, 2.0, 3.0, 4.0, 5.0, 0.0]);
    }

    #[test]
    fn payload_rejects_bad_shapes() {
        assert!(matches!(parse_points_payload("not json"), Err(CloudError::Json(_))));
        assert!(matches!(parse_points_payload(r#"{"pts": []}"#), Err(CloudError::MissingPoints)));
        assert!(matches!(parse_points_payload(r#"{"points": 3}"#), Err(CloudError::MissingPoints)));
        assert!(matches!(
            parse_points_payload(r#"{"points": [1, "two", 3]}"#),
            Err(CloudError::NotANumber { index: 1 })
        ));
    }

    #[test]
    fn payload_written_then_read_keeps_values() {
        let c = PointCloud::from_external(&[0.5, -1.25, 3.0], 1);
        let text = c.to_json_payload().unwrap();
        assert_eq!(PointCloud::from_json_payload(&text, 1).unwrap(), c);
    }

    #[test]
    fn shape_names_parse() {
        assert_eq!("saturn".parse::<ShapeKind>().unwrap(), ShapeKind::RingedPlanet);
        assert_eq!("Flower".parse::<ShapeKind>().unwrap(), ShapeKind::Rose);
        assert_eq!("fireworks".parse::<ShapeKind>().unwrap(), ShapeKind::Burst);
        for kind in ShapeKind::PROCEDURAL {
            assert_eq!(kind.key().parse::<ShapeKind>().unwrap(), kind);
        }
        assert!("teapot".parse::<ShapeKind>().is_err());
    }
}
