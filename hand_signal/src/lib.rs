//! # hand_signal
//!
//! Turns per-frame hand landmarks into the three continuous control signals
//! that drive the particle field:
//!
//! | Signal | Meaning | Idle value |
//! |---|---|---|
//! | `tension` | 0 = open hand, 1 = pinch / fist (mean over hands) | `0.0` |
//! | `span` | planar distance between the two wrists | `0.5` |
//! | `hand_count` | hands detected this frame | `0` |
//!
//! Every hand is exactly [`LANDMARK_COUNT`] points in the detector's
//! normalised image space (x, y in `[0, 1]`, z relative depth).
//!
//! Two interpreters are provided:
//!
//! * [`interpret`]: stateless; any frame that is not exactly two hands
//!   reports the idle span.
//! * [`GestureInterpreter`]: remembers the last two-hand span, so a
//!   frame with one or three hands keeps the previous span instead of
//!   snapping back.  No hands resets it to idle.
//!
//! Both are deterministic.  Degenerate hands (palm size near zero) are
//! skipped when averaging tension; they still count toward `hand_count`.
//!
//! ## Frame format
//!
//! [`parse_frame`] reads one JSON line per frame: an array of hands, each an
//! array of 21 `[x, y, z]` triples.

use serde::{Deserialize, Serialize};
use thiserror::Error;

// ════════════════════════════════════════════════════════════════════════════
// Constants
// ════════════════════════════════════════════════════════════════════════════

/// Landmarks per detected hand.
pub const LANDMARK_COUNT: usize = 21;

pub const WRIST:       usize = 0;
pub const THUMB_TIP:   usize = 4;
pub const INDEX_TIP:   usize = 8;
pub const MIDDLE_BASE: usize = 9;

/// Span reported when two hands are not in view.
pub const IDLE_SPAN: f32 = 0.5;

/// Palms smaller than this are treated as a degenerate frame.
pub const PALM_EPSILON: f32 = 1e-6;

/// `pinch / palm` ratio at which a hand starts to read as open.
const OPEN_OFFSET: f32 = 0.1;
const OPEN_GAIN:   f32 = 2.0;

// ════════════════════════════════════════════════════════════════════════════
// Errors
// ════════════════════════════════════════════════════════════════════════════

#[derive(Debug, Error)]
pub enum LandmarkError {
    #[error("hand {hand} has {found} landmarks, expected 21")]
    WrongCount { hand: usize, found: usize },

    #[error("frame is not valid JSON: {0}")]
    Json(#[from] serde_json::Error),
}

// ════════════════════════════════════════════════════════════════════════════
// Landmark / HandLandmarkSet
// ════════════════════════════════════════════════════════════════════════════

/// One tracked point on a hand.
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(from = "[f32; 3]", into = "[f32; 3]")]
pub struct Landmark {
    pub x: f32,
    pub y: f32,
    pub z: f32,
}

impl Landmark {
    pub const fn new(x: f32, y: f32, z: f32) -> Self { Landmark { x, y, z } }

    /// Distance in the image plane; depth is ignored.
    pub fn planar_distance(&self, other: &Landmark) -> f32 {
        (self.x - other.x).hypot(self.y - other.y)
    }
}

impl From<[f32; 3]> for Landmark {
    fn from([x, y, z]: [f32; 3]) -> Self { Landmark { x, y, z } }
}

impl From<Landmark> for [f32; 3] {
    fn from(l: Landmark) -> Self { [l.x, l.y, l.z] }
}

/// The 21 landmarks of a single detected hand.
#[derive(Clone, Debug, PartialEq)]
pub struct HandLandmarkSet {
    points: [Landmark; LANDMARK_COUNT],
}

impl HandLandmarkSet {
    pub fn new(points: [Landmark; LANDMARK_COUNT]) -> Self {
        HandLandmarkSet { points }
    }

    /// Build from a slice, which must hold exactly 21 landmarks.
    pub fn from_slice(points: &[Landmark]) -> Result<Self, LandmarkError> {
        let points: [Landmark; LANDMARK_COUNT] = points
            .try_into()
            .map_err(|_| LandmarkError::WrongCount { hand: 0, found: points.len() })?;
        Ok(HandLandmarkSet { points })
    }

    pub fn landmarks(&self) -> &[Landmark; LANDMARK_COUNT] { &self.points }

    pub fn wrist(&self)       -> Landmark { self.points[WRIST] }
    pub fn thumb_tip(&self)   -> Landmark { self.points[THUMB_TIP] }
    pub fn index_tip(&self)   -> Landmark { self.points[INDEX_TIP] }
    pub fn middle_base(&self) -> Landmark { self.points[MIDDLE_BASE] }

    /// Wrist to middle-finger base: the hand's scale in the image.
    pub fn palm_size(&self) -> f32 {
        self.middle_base().planar_distance(&self.wrist())
    }

    pub fn pinch_distance(&self) -> f32 {
        self.thumb_tip().planar_distance(&self.index_tip())
    }

    /// Per-hand tension, `None` when the palm is too small to normalise by.
    ///
    /// Not clamped: a wide-open hand reads below zero.  Only the aggregate
    /// in [`GestureSignal`] is clamped to `[0, 1]`.
    pub fn tension(&self) -> Option<f32> {
        let palm  = self.palm_size();
        let pinch = self.pinch_distance();
        if !palm.is_finite() || !pinch.is_finite() || palm < PALM_EPSILON {
            return None;
        }
        let open = ((pinch / palm) - OPEN_OFFSET).clamp(0.0, 1.0) * OPEN_GAIN;
        Some(1.0 - open)
    }

    /// A plausible upright hand for simulation and tests.
    ///
    /// The wrist sits at `wrist`, the middle-finger base `palm` above it
    /// (image y grows downward), and the thumb tip is placed
    /// `pinch_ratio × palm` beside the index tip, so
    /// `pinch_distance() / palm_size() == pinch_ratio`.
    pub fn synthetic(wrist: [f32; 2], palm: f32, pinch_ratio: f32) -> Self {
        let [wx, wy] = wrist;
        let at = |dx: f32, dy: f32| Landmark::new(wx + dx * palm, wy - dy * palm, 0.0);

        let mut points = [Landmark::default(); LANDMARK_COUNT];
        points[WRIST] = at(0.0, 0.0);

        // Four straight fingers: (x offset, first landmark index).
        for (dx, base) in [(-0.35, 5), (0.0, 9), (0.3, 13), (0.55, 17)] {
            for joint in 0..4 {
                points[base + joint] = at(dx, 1.0 + 0.25 * joint as f32);
            }
        }

        // Thumb: CMC near the wrist, tip beside the index tip.
        let start = (-0.4, 0.3);
        let tip   = (-0.35 - pinch_ratio, 1.75);
        for joint in 0..4 {
            let t = (joint + 1) as f32 / 4.0;
            points[1 + joint] = at(
                start.0 + (tip.0 - start.0) * t,
                start.1 + (tip.1 - start.1) * t,
            );
        }
        points[THUMB_TIP] = at(tip.0, tip.1);

        HandLandmarkSet { points }
    }
}

// ════════════════════════════════════════════════════════════════════════════
// Frame codec
// ════════════════════════════════════════════════════════════════════════════

/// Parse one JSON frame: `[[[x,y,z] × 21], …]`.
pub fn parse_frame(line: &str) -> Result<Vec<HandLandmarkSet>, LandmarkError> {
    let raw: Vec<Vec<Landmark>> = serde_json::from_str(line)?;
    raw.iter()
        .enumerate()
        .map(|(hand, pts)| {
            HandLandmarkSet::from_slice(pts)
                .map_err(|_| LandmarkError::WrongCount { hand, found: pts.len() })
        })
        .collect()
}

/// Serialise a frame in the format [`parse_frame`] reads.
pub fn frame_to_json(hands: &[HandLandmarkSet]) -> Result<String, LandmarkError> {
    let raw: Vec<&[Landmark]> = hands.iter().map(|h| &h.points[..]).collect();
    Ok(serde_json::to_string(&raw)?)
}

// ════════════════════════════════════════════════════════════════════════════
// GestureSignal
// ════════════════════════════════════════════════════════════════════════════

/// Control signals derived from one frame of hands.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct GestureSignal {
    /// 0 = open, 1 = pinched / fist.  Always in `[0, 1]`.
    pub tension:    f32,
    /// Wrist-to-wrist distance when two hands are visible.
    pub span:       f32,
    pub hand_count: usize,
}

impl GestureSignal {
    pub const IDLE: GestureSignal = GestureSignal { tension: 0.0, span: IDLE_SPAN, hand_count: 0 };

    pub fn is_idle(&self) -> bool { self.hand_count == 0 }
}

impl Default for GestureSignal {
    fn default() -> Self { GestureSignal::IDLE }
}

/// Mean tension over the hands with a usable palm, clamped to `[0, 1]`.
fn aggregate_tension(hands: &[HandLandmarkSet]) -> f32 {
    let (sum, n) = hands
        .iter()
        .filter_map(HandLandmarkSet::tension)
        .fold((0.0f32, 0usize), |(s, n), t| (s + t, n + 1));
    if n == 0 { 0.0 } else { (sum / n as f32).clamp(0.0, 1.0) }
}

fn two_hand_span(hands: &[HandLandmarkSet]) -> Option<f32> {
    match hands {
        [a, b] => Some(a.wrist().planar_distance(&b.wrist())),
        _      => None,
    }
}

/// Stateless interpretation of one frame.
pub fn interpret(hands: &[HandLandmarkSet]) -> GestureSignal {
    if hands.is_empty() {
        return GestureSignal::IDLE;
    }
    GestureSignal {
        tension:    aggregate_tension(hands),
        span:       two_hand_span(hands).unwrap_or(IDLE_SPAN),
        hand_count: hands.len(),
    }
}

// ════════════════════════════════════════════════════════════════════════════
// GestureInterpreter: keeps the last two-hand span
// ════════════════════════════════════════════════════════════════════════════

/// Frame-to-frame interpreter used by the live landmark loop.
#[derive(Clone, Debug)]
pub struct GestureInterpreter {
    last_span: f32,
}

impl Default for GestureInterpreter {
    fn default() -> Self { GestureInterpreter { last_span: IDLE_SPAN } }
}

impl GestureInterpreter {
    pub fn new() -> Self { Self::default() }

    pub fn last_span(&self) -> f32 { self.last_span }

    pub fn update(&mut self, hands: &[HandLandmarkSet]) -> GestureSignal {
        if hands.is_empty() {
            self.last_span = IDLE_SPAN;
            return GestureSignal::IDLE;
        }
        if let Some(span) = two_hand_span(hands) {
            self.last_span = span;
        }
        GestureSignal {
            tension:    aggregate_tension(hands),
            span:       self.last_span,
            hand_count: hands.len(),
        }
    }
}

// ════════════════════════════════════════════════════════════════════════════
// Tests
// ════════════════════════════════════════════════════════════════════════════
