//! Landmark sources and the hand-off of gesture signals to the render loop.
//!
//! A [`LandmarkSource`] runs on its own thread.  Every frame of hand
//! landmarks it sees goes through a [`GestureInterpreter`] and the resulting
//! [`GestureSignal`] overwrites a single [`SignalSlot`].  The render loop
//! reads the latest value once per tick; there is no queue, so a slow
//! consumer simply skips frames and a silent source leaves the last signal
//! in place.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::mpsc::{Receiver, RecvTimeoutError};
use std::sync::{Arc, Mutex, MutexGuard};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use hand_signal::{parse_frame, GestureInterpreter, GestureSignal, HandLandmarkSet, Landmark};

// ════════════════════════════════════════════════════════════════════════════
// TrackingStatus
// ════════════════════════════════════════════════════════════════════════════

/// Health of the landmark source, shown in the status bar.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum TrackingStatus {
    Initializing,
    Active,
    /// The source could not start or has stopped.  Signals stay idle.
    Unavailable(String),
}

impl TrackingStatus {
    pub fn label(&self) -> &str {
        match self {
            TrackingStatus::Initializing   => "starting tracker",
            TrackingStatus::Active         => "tracking",
            TrackingStatus::Unavailable(_) => "no tracking",
        }
    }
}

// ════════════════════════════════════════════════════════════════════════════
// SignalSlot: single-value, last-write-wins
// ════════════════════════════════════════════════════════════════════════════

#[derive(Debug)]
struct SlotInner {
    signal: GestureSignal,
    status: TrackingStatus,
    frames: u64,
    closed: bool,
}

/// Shared cell holding the most recent gesture signal.
///
/// Cloning gives another handle to the same cell.
#[derive(Clone, Debug)]
pub struct SignalSlot {
    inner: Arc<Mutex<SlotInner>>,
}

impl Default for SignalSlot {
    fn default() -> Self {
        SignalSlot {
            inner: Arc::new(Mutex::new(SlotInner {
                signal: GestureSignal::IDLE,
                status: TrackingStatus::Initializing,
                frames: 0,
                closed: false,
            })),
        }
    }
}

impl SignalSlot {
    pub fn new() -> Self { Self::default() }

    // A panicking source thread must not take the render loop with it.
    fn lock(&self) -> MutexGuard<'_, SlotInner> {
        self.inner.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    pub fn latest(&self) -> GestureSignal  { self.lock().signal }
    pub fn status(&self) -> TrackingStatus { self.lock().status.clone() }
    pub fn frames(&self) -> u64            { self.lock().frames }

    pub fn publish(&self, signal: GestureSignal) {
        let mut inner = self.lock();
        inner.signal = signal;
        inner.frames += 1;
    }

    pub fn set_status(&self, status: TrackingStatus) {
        let mut inner = self.lock();
        if inner.status != status {
            log::info!("tracking: {:?}", status);
            inner.status = status;
        }
    }

    /// Ask the source thread to stop at its next poll.
    pub fn close(&self)            { self.lock().closed = true; }
    pub fn is_closed(&self) -> bool { self.lock().closed }
}

// ════════════════════════════════════════════════════════════════════════════
// FrameSink: what a source writes into
// ════════════════════════════════════════════════════════════════════════════

/// A source's write end: interprets landmark frames and publishes the result.
pub struct FrameSink {
    slot:        SignalSlot,
    interpreter: GestureInterpreter,
}

impl FrameSink {
    pub fn new(slot: SignalSlot) -> Self {
        FrameSink { slot, interpreter: GestureInterpreter::new() }
    }

    pub fn submit(&mut self, hands: &[HandLandmarkSet]) -> GestureSignal {
        let signal = self.interpreter.update(hands);
        self.slot.publish(signal);
        signal
    }

    pub fn set_status(&self, status: TrackingStatus) { self.slot.set_status(status); }
    pub fn is_closed(&self) -> bool                  { self.slot.is_closed() }
}

// ════════════════════════════════════════════════════════════════════════════
// LandmarkSource trait
// ════════════════════════════════════════════════════════════════════════════

/// Anything that can deliver hand-landmark frames.
pub trait LandmarkSource: Send + 'static {
    fn run(self: Box<Self>, sink: FrameSink);
}

/// Spawn a landmark source on its own thread, publishing into `slot`.
pub fn spawn_landmark_source<S: LandmarkSource>(source: S, slot: &SignalSlot) -> JoinHandle<()> {
    let sink = FrameSink::new(slot.clone());
    thread::spawn(move || Box::new(source).run(sink))
}

// ════════════════════════════════════════════════════════════════════════════
// SimLandmarkSource: keyboard simulation (always available)
// ════════════════════════════════════════════════════════════════════════════

/// Raw input event from the visualizer window.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum SimInput {
    KeyDown(SimKey),
    KeyUp(SimKey),
}

/// Simulated hand controls (mapped from minifb keys).
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SimKey {
    CycleHands, // H
    Pinch,      // Space (held)
    Widen,      // Right arrow (held)
    Narrow,     // Left arrow (held)
}

const SIM_PALM:        f32 = 0.12;
const SIM_OPEN_RATIO:  f32 = 0.6;   // pinch/palm ratio of a relaxed hand
const SIM_PINCH_RATIO: f32 = 0.05;
const SIM_PINCH_EASE:  f32 = 10.0;  // per second
const SIM_SPREAD_RATE: f32 = 0.5;   // wrist separation per second
const SIM_WRIST_Y:     f32 = 0.7;

/// Hand pose synthesised from the simulation keys.
#[derive(Clone, Debug, PartialEq)]
pub struct SimHands {
    hand_count: usize,
    pinching:   bool,
    widening:   bool,
    narrowing:  bool,
    pinch:      f32,
    spread:     f32,
}

impl Default for SimHands {
    fn default() -> Self {
        SimHands {
            hand_count: 0,
            pinching:   false,
            widening:   false,
            narrowing:  false,
            pinch:      SIM_OPEN_RATIO,
            spread:     0.4,
        }
    }
}

impl SimHands {
    pub fn new() -> Self { Self::default() }

    pub fn hand_count(&self) -> usize { self.hand_count }
    pub fn spread(&self)     -> f32   { self.spread }

    pub fn apply(&mut self, input: &SimInput) {
        match *input {
            SimInput::KeyDown(SimKey::CycleHands) => self.hand_count = (self.hand_count + 1) % 3,
            SimInput::KeyUp(SimKey::CycleHands)   => {}
            SimInput::KeyDown(SimKey::Pinch)      => self.pinching  = true,
            SimInput::KeyUp(SimKey::Pinch)        => self.pinching  = false,
            SimInput::KeyDown(SimKey::Widen)      => self.widening  = true,
            SimInput::KeyUp(SimKey::Widen)        => self.widening  = false,
            SimInput::KeyDown(SimKey::Narrow)     => self.narrowing = true,
            SimInput::KeyUp(SimKey::Narrow)       => self.narrowing = false,
        }
    }

    /// Ease the pinch toward its held/released pose and slide the wrists.
    pub fn advance(&mut self, dt: f32) {
        let dt = if dt.is_finite() { dt.max(0.0) } else { 0.0 };
        let target = if self.pinching { SIM_PINCH_RATIO } else { SIM_OPEN_RATIO };
        self.pinch += (target - self.pinch) * (SIM_PINCH_EASE * dt).min(1.0);

        if self.widening  { self.spread += SIM_SPREAD_RATE * dt; }
        if self.narrowing { self.spread -= SIM_SPREAD_RATE * dt; }
        self.spread = self.spread.clamp(0.05, 0.9);
    }

    pub fn hands(&self) -> Vec<HandLandmarkSet> {
        match self.hand_count {
            0 => Vec::new(),
            1 => vec![HandLandmarkSet::synthetic([0.5, SIM_WRIST_Y], SIM_PALM, self.pinch)],
            _ => {
                let half = self.spread / 2.0;
                vec![
                    HandLandmarkSet::synthetic([0.5 - half, SIM_WRIST_Y], SIM_PALM, self.pinch),
                    HandLandmarkSet::synthetic([0.5 + half, SIM_WRIST_Y], SIM_PALM, self.pinch),
                ]
            }
        }
    }
}

/// Landmark source driven by [`SimInput`] events from the visualizer.
pub struct SimLandmarkSource {
    pub rx: Receiver<SimInput>,
}

impl LandmarkSource for SimLandmarkSource {
    fn run(self: Box<Self>, mut sink: FrameSink) {
        const FRAME: Duration = Duration::from_millis(16);

        let mut hands = SimHands::new();
        let mut last  = Instant::now();
        sink.set_status(TrackingStatus::Active);

        while !sink.is_closed() {
            match self.rx.recv_timeout(FRAME) {
                Ok(input) => hands.apply(&input),
                Err(RecvTimeoutError::Timeout) => {}
                Err(RecvTimeoutError::Disconnected) => {
                    log::debug!("simulation input closed");
                    return;
                }
            }
            let now = Instant::now();
            hands.advance((now - last).as_secs_f32());
            last = now;
            sink.submit(&hands.hands());
        }
    }
}

// ════════════════════════════════════════════════════════════════════════════
// ReplayLandmarkSource: JSON-lines recording
// ════════════════════════════════════════════════════════════════════════════

/// Parse a recording, one frame per line.  Blank lines are ignored and bad
/// lines are logged and skipped.
pub fn parse_recording(text: &str) -> Vec<Vec<HandLandmarkSet>> {
    text.lines()
        .enumerate()
        .filter(|(_, line)| !line.trim().is_empty())
        .filter_map(|(n, line)| match parse_frame(line) {
            Ok(hands) => Some(hands),
            Err(e) => {
                log::warn!("recording line {}: {}; skipped", n + 1, e);
                None
            }
        })
        .collect()
}

pub fn load_recording(path: &Path) -> io::Result<Vec<Vec<HandLandmarkSet>>> {
    Ok(parse_recording(&fs::read_to_string(path)?))
}

/// Plays back a recording made with `hand_signal::frame_to_json`.
pub struct ReplayLandmarkSource {
    pub path:           PathBuf,
    pub frame_interval: Duration,
    pub looping:        bool,
}

impl ReplayLandmarkSource {
    pub fn new(path: PathBuf) -> Self {
        ReplayLandmarkSource { path, frame_interval: Duration::from_millis(33), looping: true }
    }
}

impl LandmarkSource for ReplayLandmarkSource {
    fn run(self: Box<Self>, mut sink: FrameSink) {
        let frames = match load_recording(&self.path) {
            Ok(f) if f.is_empty() => {
                sink.set_status(TrackingStatus::Unavailable(
                    format!("{}: no frames", self.path.display())));
                return;
            }
            Ok(f) => f,
            Err(e) => {
                log::warn!("cannot read {}: {}", self.path.display(), e);
                sink.set_status(TrackingStatus::Unavailable(e.to_string()));
                return;
            }
        };
        log::info!("replaying {} frames from {}", frames.len(), self.path.display());
        sink.set_status(TrackingStatus::Active);

        loop {
            for hands in &frames {
                if sink.is_closed() { return; }
                sink.submit(hands);
                thread::sleep(self.frame_interval);
            }
            if !self.looping {
                sink.submit(&[]);
                sink.set_status(TrackingStatus::Unavailable("replay finished".into()));
                return;
            }
        }
    }
}

// ════════════════════════════════════════════════════════════════════════════
// LeapLandmarkSource: real hardware (feature = "leap")
// ════════════════════════════════════════════════════════════════════════════

/// Map a LeapMotion position (millimetres, origin at the device) onto the
/// normalised image-plane coordinates hand landmarks use: x and y in 0–1
/// with y growing downward, z in palm-widths.
pub fn leap_mm_to_landmark(x: f32, y: f32, z: f32) -> Landmark {
    Landmark::new((x + 250.0) / 500.0, 1.0 - (y - 50.0) / 450.0, z / 250.0)
}

/// Landmark source backed by a real LeapMotion controller.
///
/// Requires the `leap` feature flag and the LeapC shared library installed.
/// Each tracked hand becomes a 21-point set: the wrist is taken from the
/// base of the middle metacarpal, and every digit contributes the start of
/// its proximal, intermediate and distal bones plus its tip.
#[cfg(feature = "leap")]
pub struct LeapLandmarkSource;

#[cfg(feature = "leap")]
impl LandmarkSource for LeapLandmarkSource {
    fn run(self: Box<Self>, mut sink: FrameSink) {
        use leaprs::*;

        let mut connection = match Connection::create(ConnectionConfig::default()) {
            Ok(c)  => c,
            Err(e) => {
                sink.set_status(TrackingStatus::Unavailable(format!("LeapC: {:?}", e)));
                return;
            }
        };
        if let Err(e) = connection.open() {
            sink.set_status(TrackingStatus::Unavailable(format!("LeapMotion device: {:?}", e)));
            return;
        }

        while !sink.is_closed() {
            let msg = match connection.poll(100) {
                Ok(m)  => m,
                Err(_) => continue,
            };
            if let Event::Tracking(frame) = msg.event() {
                sink.set_status(TrackingStatus::Active);
                let hands: Vec<HandLandmarkSet> = frame.hands().map(|h| leap_hand(&h)).collect();
                sink.submit(&hands);
            }
        }
    }
}

#[cfg(feature = "leap")]
fn leap_hand(hand: &leaprs::Hand) -> HandLandmarkSet {
    let mut points = [Landmark::default(); hand_signal::LANDMARK_COUNT];
    let digits: Vec<_> = hand.digits().collect();

    if let Some(middle) = digits.get(2) {
        let j = middle.metacarpal().prev_joint();
        points[hand_signal::WRIST] = leap_mm_to_landmark(j.x, j.y, j.z);
    }
    for (f, digit) in digits.iter().take(5).enumerate() {
        let base = 1 + 4 * f;
        let j = digit.proximal().prev_joint();
        points[base]     = leap_mm_to_landmark(j.x, j.y, j.z);
        let j = digit.intermediate().prev_joint();
        points[base + 1] = leap_mm_to_landmark(j.x, j.y, j.z);
        let j = digit.distal().prev_joint();
        points[base + 2] = leap_mm_to_landmark(j.x, j.y, j.z);
        let j = digit.distal().next_joint();
        points[base + 3] = leap_mm_to_landmark(j.x, j.y, j.z);
    }
    HandLandmarkSet::new(points)
}

// ════════════════════════════════════════════════════════════════════════════
// Tests
// ════════════════════════════════════════════════════════════════════════════

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use hand_signal::frame_to_json;
    use std::sync::mpsc;

    #[test]
    fn slot_starts_idle_and_initializing() {
        let slot = SignalSlot::new();
        assert_eq!(slot.latest(), GestureSignal::IDLE);
        assert_eq!(slot.status(), TrackingStatus::Initializing);
        assert_eq!(slot.frames(), 0);
    }

    #[test]
    fn slot_is_last_write_wins() {
        let slot = SignalSlot::new();
        let mut sink = FrameSink::new(slot.clone());
        let open = HandLandmarkSet::synthetic([0.5, 0.5], 0.1, 0.6);
        let fist = HandLandmarkSet::synthetic([0.5, 0.5], 0.1, 0.0);
        sink.submit(&[open]);
        sink.submit(&[fist]);
        assert_eq!(slot.frames(), 2);
        assert_relative_eq!(slot.latest().tension, 1.0, epsilon = 1e-5);
    }

    #[test]
    fn sink_keeps_span_through_one_hand_frames() {
        let mut sink = FrameSink::new(SignalSlot::new());
        let a = HandLandmarkSet::synthetic([0.2, 0.5], 0.1, 0.3);
        let b = HandLandmarkSet::synthetic([0.6, 0.5], 0.1, 0.3);
        let two = sink.submit(&[a.clone(), b]);
        let one = sink.submit(&[a]);
        assert_relative_eq!(two.span, 0.4, epsilon = 1e-5);
        assert_relative_eq!(one.span, 0.4, epsilon = 1e-5);
        assert_eq!(sink.submit(&[]), GestureSignal::IDLE);
    }

    #[test]
    fn closing_is_visible_to_sinks() {
        let slot = SignalSlot::new();
        let sink = FrameSink::new(slot.clone());
        assert!(!sink.is_closed());
        slot.close();
        assert!(sink.is_closed());
    }

    #[test]
    fn sim_hands_cycle_zero_one_two() {
        let mut h = SimHands::new();
        assert!(h.hands().is_empty());
        h.apply(&SimInput::KeyDown(SimKey::CycleHands));
        assert_eq!(h.hands().len(), 1);
        h.apply(&SimInput::KeyDown(SimKey::CycleHands));
        assert_eq!(h.hands().len(), 2);
        h.apply(&SimInput::KeyDown(SimKey::CycleHands));
        assert_eq!(h.hand_count(), 0);
    }

    #[test]
    fn sim_relaxed_hand_is_open_and_pinch_closes_it() {
        let mut h = SimHands::new();
        h.apply(&SimInput::KeyDown(SimKey::CycleHands));
        let relaxed = hand_signal::interpret(&h.hands());
        assert!(relaxed.tension < 1e-4, "relaxed tension {}", relaxed.tension);

        h.apply(&SimInput::KeyDown(SimKey::Pinch));
        for _ in 0..60 { h.advance(1.0 / 60.0); }
        let pinched = hand_signal::interpret(&h.hands());
        assert!(pinched.tension > 0.99, "pinched tension {}", pinched.tension);

        h.apply(&SimInput::KeyUp(SimKey::Pinch));
        for _ in 0..120 { h.advance(1.0 / 60.0); }
        assert!(hand_signal::interpret(&h.hands()).tension < 1e-3);
    }

    #[test]
    fn sim_span_follows_spread_and_clamps() {
        let mut h = SimHands::new();
        h.apply(&SimInput::KeyDown(SimKey::CycleHands));
        h.apply(&SimInput::KeyDown(SimKey::CycleHands));
        let s = hand_signal::interpret(&h.hands());
        assert_relative_eq!(s.span, h.spread(), epsilon = 1e-5);

        h.apply(&SimInput::KeyDown(SimKey::Widen));
        h.advance(10.0);
        assert_relative_eq!(h.spread(), 0.9);
        h.apply(&SimInput::KeyUp(SimKey::Widen));
        h.apply(&SimInput::KeyDown(SimKey::Narrow));
        h.advance(10.0);
        assert_relative_eq!(h.spread(), 0.05);
    }

    #[test]
    fn sim_advance_ignores_bad_deltas() {
        let mut h = SimHands::new();
        h.apply(&SimInput::KeyDown(SimKey::Widen));
        let before = h.clone();
        h.advance(f32::NAN);
        h.advance(-1.0);
        assert_eq!(h, before);
    }

    #[test]
    fn sim_source_publishes_and_stops_when_input_closes() {
        let slot = SignalSlot::new();
        let (tx, rx) = mpsc::channel();
        let handle = spawn_landmark_source(SimLandmarkSource { rx }, &slot);
        tx.send(SimInput::KeyDown(SimKey::CycleHands)).unwrap();
        thread::sleep(Duration::from_millis(60));
        drop(tx);
        handle.join().unwrap();
        assert_eq!(slot.status(), TrackingStatus::Active);
        assert!(slot.frames() >= 1);
        assert_eq!(slot.latest().hand_count, 1);
    }

    #[test]
    fn recording_skips_blank_and_bad_lines() {
        let a = HandLandmarkSet::synthetic([0.3, 0.5], 0.1, 0.2);
        let line = frame_to_json(&[a]).unwrap();
        let text = format!("{}\n\nnot json\n[]\n{}\n", line, line);
        let frames = parse_recording(&text);
        assert_eq!(frames.len(), 3);
        assert_eq!(frames[0].len(), 1);
        assert!(frames[1].is_empty());
    }

    #[test]
    fn missing_recording_marks_tracking_unavailable() {
        let slot = SignalSlot::new();
        let source = ReplayLandmarkSource::new(PathBuf::from("/nonexistent/recording.jsonl"));
        spawn_landmark_source(source, &slot).join().unwrap();
        assert!(matches!(slot.status(), TrackingStatus::Unavailable(_)));
        assert_eq!(slot.latest(), GestureSignal::IDLE);
    }

    #[test]
    fn leap_mapping_centres_the_interaction_box() {
        let p = leap_mm_to_landmark(0.0, 275.0, 0.0);
        assert_relative_eq!(p.x, 0.5);
        assert_relative_eq!(p.y, 0.5);
        assert_relative_eq!(p.z, 0.0);
        // Higher hands sit nearer the top of the image.
        assert!(leap_mm_to_landmark(0.0, 400.0, 0.0).y < p.y);
    }

    #[test]
    fn status_labels() {
        assert_eq!(TrackingStatus::Active.label(), "tracking");
        assert_eq!(TrackingStatus::Unavailable("x".into()).label(), "no tracking");
    }
}
