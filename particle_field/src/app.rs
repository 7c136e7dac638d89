//! Top-level application state.
//!
//! `AppState` owns the current [`ShapeSelection`], the [`MorphEngine`] and
//! the [`GenerationWorker`].  It applies [`AppCommand`]s from the window and
//! advances the morph once per frame with the latest gesture signal.
//!
//! The morph target is derived lazily: commands only edit the selection,
//! and the next tick rebuilds the target cloud if the selection's key has
//! changed since the last build.  Flicking through several shapes between
//! two frames therefore generates only the last one.

use std::io::{self, BufRead, Write};
use std::path::PathBuf;
use std::sync::mpsc::{self, Sender};
use std::thread;
use std::time::Instant;

use cloud_shapes::{generate, PointCloud, ShapeKind};
use hand_signal::GestureSignal;
use morph_engine::{MorphEngine, MorphParams};

use crate::error::FieldError;
use crate::gesture::{spawn_landmark_source, SignalSlot, SimInput, SimLandmarkSource, ReplayLandmarkSource};
#[cfg(not(feature = "leap"))]
use crate::gesture::TrackingStatus;
use crate::generator::{GenerationWorker, GeneratorChoice, ShapeGenerator};
use crate::palette::{self, Rgb};
use crate::visualizer::Visualizer;

/// Upper bound for the particle count.
pub const MAX_PARTICLES: usize = 200_000;

// ════════════════════════════════════════════════════════════════════════════
// AppConfig
// ════════════════════════════════════════════════════════════════════════════

/// Where hand landmarks come from.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum SourceChoice {
    /// Keyboard-driven hands (`H`, `Space`, arrows).
    Simulated,
    /// A JSON-lines landmark recording, looped.
    Replay(PathBuf),
    /// LeapMotion hardware; unavailable unless built with `--features leap`.
    Leap,
}

/// Configuration for the full application.
#[derive(Clone, Debug)]
pub struct AppConfig {
    pub shape:          ShapeKind,
    pub particle_count: usize,
    pub color:          Rgb,
    pub morph:          MorphParams,
    pub generator:      GeneratorChoice,
    pub source:         SourceChoice,
    /// Points to start from as a Custom shape (e.g. loaded with `--points`).
    pub custom_points:  Option<Vec<f32>>,
}

impl Default for AppConfig {
    fn default() -> Self {
        AppConfig {
            shape:          ShapeKind::Heart,
            particle_count: 3000,
            color:          Rgb::CYAN,
            morph:          MorphParams::default(),
            generator:      GeneratorChoice::default(),
            source:         SourceChoice::Simulated,
            custom_points:  None,
        }
    }
}

// ════════════════════════════════════════════════════════════════════════════
// Selection and commands
// ════════════════════════════════════════════════════════════════════════════

/// What the user has asked to see.
#[derive(Clone, Debug, PartialEq)]
pub struct ShapeSelection {
    pub kind:           ShapeKind,
    pub particle_count: usize,
    pub color:          Rgb,
    /// Raw coordinates for [`ShapeKind::Custom`]; cleared by any procedural
    /// selection.
    pub custom_points:  Option<Vec<f32>>,
}

#[derive(Clone, Debug, PartialEq)]
pub enum AppCommand {
    SelectShape(ShapeKind),
    SetColor(Rgb),
    CycleColor,
    SetParticleCount(usize),
    /// Relative change, saturating at 0 and [`MAX_PARTICLES`].
    AdjustParticleCount(isize),
    GenerateFromPrompt(String),
    /// Use these coordinates as the Custom shape.
    LoadPoints(Vec<f32>),
    /// Ask the user for a prompt (read off the render thread).
    RequestPrompt,
    Quit,
}

/// Everything the target cloud depends on.  `serial` bumps on every
/// selection so choosing the same shape again re-samples it.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
struct TargetKey {
    kind:       ShapeKind,
    count:      usize,
    custom_rev: u64,
    serial:     u64,
}

/// Build the target cloud for a selection.
///
/// A Custom selection takes its point list as-is (an empty list gives a
/// field at the origin); with no list it falls back to the generator's
/// sphere.
pub fn derive_target(sel: &ShapeSelection) -> PointCloud {
    match (&sel.custom_points, sel.kind) {
        (Some(points), ShapeKind::Custom) =>
            PointCloud::from_external(points, sel.particle_count),
        _ => generate(sel.kind, sel.particle_count),
    }
}

// ════════════════════════════════════════════════════════════════════════════
// AppState
// ════════════════════════════════════════════════════════════════════════════

pub struct AppState {
    // ── selection ────────────────────────────────────────────────────────
    selection:  ShapeSelection,
    serial:     u64,
    custom_rev: u64,
    built:      Option<TargetKey>,

    // ── animation ────────────────────────────────────────────────────────
    engine: MorphEngine,
    signal: GestureSignal,
    spin:   f32,

    // ── AI generation ────────────────────────────────────────────────────
    worker:     GenerationWorker,
    pending:    Option<u64>,
    next_token: u64,

    // ── status message ───────────────────────────────────────────────────
    pub status: String,
}

impl AppState {
    pub fn new(cfg: &AppConfig) -> Self {
        Self::with_generator(cfg, cfg.generator.build())
    }

    pub fn with_generator(cfg: &AppConfig, generator: Box<dyn ShapeGenerator>) -> Self {
        let count = cfg.particle_count.min(MAX_PARTICLES);
        let (kind, custom_rev) = match cfg.custom_points {
            Some(_) => (ShapeKind::Custom, 1),
            None    => (cfg.shape, 0),
        };

        AppState {
            selection: ShapeSelection {
                kind,
                particle_count: count,
                color:          cfg.color,
                custom_points:  cfg.custom_points.clone(),
            },
            serial: 0,
            custom_rev,
            built:  None,

            engine: MorphEngine::new(count).with_params(cfg.morph),
            signal: GestureSignal::IDLE,
            spin:   0.0,

            worker:     GenerationWorker::spawn(generator),
            pending:    None,
            next_token: 1,

            status: format!("Ready: {}, {} particles", kind.name(), count),
        }
    }

    // ── commands ─────────────────────────────────────────────────────────

    pub fn handle_command(&mut self, cmd: AppCommand) {
        match cmd {
            AppCommand::SelectShape(kind) => self.select_shape(kind),

            AppCommand::SetColor(color) => {
                self.selection.color = color;
                self.status = format!("Colour {}", color);
            }
            AppCommand::CycleColor => {
                let color = palette::next_preset(self.selection.color);
                self.handle_command(AppCommand::SetColor(color));
            }

            AppCommand::SetParticleCount(n) => self.set_particle_count(n),
            AppCommand::AdjustParticleCount(d) => {
                let n = self.selection.particle_count.saturating_add_signed(d);
                self.set_particle_count(n);
            }

            AppCommand::GenerateFromPrompt(text) => self.generate_from_prompt(&text),

            AppCommand::LoadPoints(points) => {
                self.status = format!("Loaded {} coordinates", points.len());
                self.pending = None;
                self.apply_custom(points);
            }

            // Handled in the run loop.
            AppCommand::RequestPrompt | AppCommand::Quit => {}
        }
    }

    fn select_shape(&mut self, kind: ShapeKind) {
        if kind.is_procedural() {
            self.selection.custom_points = None;
        }
        self.selection.kind = kind;
        self.serial += 1;
        if self.pending.take().is_some() {
            log::info!("generation superseded by {}", kind.name());
        }
        self.status = format!("Shape: {}", kind.name());
    }

    fn set_particle_count(&mut self, n: usize) {
        let n = n.min(MAX_PARTICLES);
        if n == self.selection.particle_count { return; }
        self.selection.particle_count = n;
        self.engine.resize(n);
        self.status = format!("Particles: {}", n);
    }

    fn generate_from_prompt(&mut self, text: &str) {
        let prompt = text.trim();
        if prompt.is_empty() {
            self.status = "AI generation failed: prompt is empty".to_string();
            return;
        }
        if self.pending.is_some() {
            self.status = "Still generating; wait for the current shape".to_string();
            return;
        }

        let token = self.next_token;
        self.next_token += 1;
        match self.worker.request(token, prompt.to_string()) {
            Ok(()) => {
                self.pending = Some(token);
                self.status = format!("Generating \"{}\"...", prompt);
            }
            Err(e) => self.status = format!("AI generation failed: {}", e),
        }
    }

    fn apply_custom(&mut self, points: Vec<f32>) {
        self.selection.custom_points = Some(points);
        self.selection.kind = ShapeKind::Custom;
        self.custom_rev += 1;
        self.serial += 1;
    }

    // ── per-frame ────────────────────────────────────────────────────────

    /// Apply finished generations whose token is still the pending one.
    fn drain_generations(&mut self) {
        for outcome in self.worker.drain() {
            if self.pending != Some(outcome.token) {
                log::debug!("dropping stale generation result {}", outcome.token);
                continue;
            }
            self.pending = None;
            match outcome.result {
                Ok(points) => {
                    self.status = format!("AI shape ready ({} points)", points.len() / 3);
                    self.apply_custom(points);
                }
                Err(e) => self.status = format!("AI generation failed: {}", e),
            }
        }
    }

    /// Rebuild the morph target if the selection changed.  Returns `true`
    /// when a new target was built.
    pub fn refresh_target(&mut self) -> bool {
        let key = TargetKey {
            kind:       self.selection.kind,
            count:      self.selection.particle_count,
            custom_rev: self.custom_rev,
            serial:     self.serial,
        };
        if self.built == Some(key) { return false; }

        self.engine.set_target(derive_target(&self.selection));
        self.built = Some(key);
        log::debug!("target rebuilt: {:?}", key);
        true
    }

    pub fn tick(&mut self, signal: GestureSignal, delta: f32) {
        self.drain_generations();
        self.refresh_target();
        self.signal = signal;
        self.spin = self.engine.tick(&signal, delta);
    }

    // ── accessors for the render loop ────────────────────────────────────

    pub fn selection(&self)     -> &ShapeSelection { &self.selection }
    pub fn engine(&self)        -> &MorphEngine    { &self.engine }
    pub fn signal(&self)        -> GestureSignal   { self.signal }
    pub fn last_spin(&self)     -> f32             { self.spin }
    pub fn is_generating(&self) -> bool            { self.pending.is_some() }
}

// ════════════════════════════════════════════════════════════════════════════
// run(): the main application loop
// ════════════════════════════════════════════════════════════════════════════

/// One trimmed line from `input`.  A read error or end of input gives an
/// empty prompt, which the app reports as a failed generation.
fn read_prompt(input: &mut impl BufRead) -> String {
    let mut buf = String::new();
    match input.read_line(&mut buf) {
        Ok(_)  => buf.trim().to_string(),
        Err(e) => {
            log::warn!("could not read prompt: {}", e);
            String::new()
        }
    }
}

/// Read one prompt from stdin on a helper thread so the window keeps
/// animating while the user types.  Always answers, so the caller can
/// accept another prompt afterwards.
fn spawn_prompt_reader(tx: Sender<String>) {
    thread::spawn(move || {
        print!("\n  Describe a shape: ");
        io::stdout().flush().ok();
        let _ = tx.send(read_prompt(&mut io::stdin().lock()));
    });
}

/// Run the full application.
///
/// Creates the landmark source and the visualizer window, then drives the
/// input/tick/render loop at the window's ~60 fps until the window closes
/// or the user quits.
pub fn run(cfg: AppConfig) -> Result<(), FieldError> {
    let slot = SignalSlot::new();
    let (sim_tx, sim_rx) = mpsc::channel::<SimInput>();

    match &cfg.source {
        SourceChoice::Simulated => {
            spawn_landmark_source(SimLandmarkSource { rx: sim_rx }, &slot);
        }
        SourceChoice::Replay(path) => {
            spawn_landmark_source(ReplayLandmarkSource::new(path.clone()), &slot);
        }
        SourceChoice::Leap => {
            #[cfg(feature = "leap")]
            spawn_landmark_source(crate::gesture::LeapLandmarkSource, &slot);
            #[cfg(not(feature = "leap"))]
            slot.set_status(TrackingStatus::Unavailable(
                "built without the `leap` feature".into()));
        }
    }

    let mut vis = Visualizer::new(sim_tx)?;
    let mut app = AppState::new(&cfg);
    log::info!("generator: {}", cfg.generator.describe());

    let (prompt_tx, prompt_rx) = mpsc::channel::<String>();
    let mut prompt_open = false;
    let mut last = Instant::now();

    while vis.is_open() {
        // 1. Window input
        for cmd in vis.poll_input() {
            match cmd {
                AppCommand::Quit => {
                    slot.close();
                    return Ok(());
                }
                AppCommand::RequestPrompt if app.is_generating() => {
                    app.status = "Still generating; wait for the current shape".to_string();
                }
                AppCommand::RequestPrompt => {
                    if !prompt_open {
                        prompt_open = true;
                        app.status = "Type a prompt in the terminal".to_string();
                        spawn_prompt_reader(prompt_tx.clone());
                    }
                }
                other => app.handle_command(other),
            }
        }

        // 2. Prompt typed in the terminal
        if let Ok(text) = prompt_rx.try_recv() {
            prompt_open = false;
            app.handle_command(AppCommand::GenerateFromPrompt(text));
        }

        // 3. Per-frame logic
        let now = Instant::now();
        app.tick(slot.latest(), (now - last).as_secs_f32());
        last = now;

        // 4. Render
        vis.render(&app, &slot.status())?;
    }

    slot.close();
    Ok(())
}

// ════════════════════════════════════════════════════════════════════════════
// Tests
// ════════════════════════════════════════════════════════════════════════════

#[cfg(test)]
mod tests {
    use super::*;
    use crate::generator::GenerationError;
    use approx::assert_relative_eq;
    use std::sync::mpsc::{Receiver, RecvTimeoutError};
    use std::time::Duration;

    /// Answers every prompt with the same points, or fails when `None`.
    struct Canned(Option<Vec<f32>>);

    impl ShapeGenerator for Canned {
        fn generate(&self, _prompt: &str) -> Result<Vec<f32>, GenerationError> {
            self.0.clone().ok_or_else(|| GenerationError::Transport("offline".into()))
        }
    }

    /// Blocks until released; reports on `done` just before answering.
    struct Gated {
        release: Receiver<()>,
        done:    Sender<()>,
        points:  Vec<f32>,
    }

    impl ShapeGenerator for Gated {
        fn generate(&self, _prompt: &str) -> Result<Vec<f32>, GenerationError> {
            let _ = self.release.recv();
            let _ = self.done.send(());
            Ok(self.points.clone())
        }
    }

    fn gated(points: Vec<f32>) -> (Gated, Sender<()>, Receiver<()>) {
        let (release_tx, release) = mpsc::channel();
        let (done, done_rx) = mpsc::channel();
        (Gated { release, done, points }, release_tx, done_rx)
    }

    fn app_with(generator: impl ShapeGenerator, count: usize) -> AppState {
        let cfg = AppConfig { particle_count: count, ..AppConfig::default() };
        AppState::with_generator(&cfg, Box::new(generator))
    }

    /// Tick until no generation is pending.
    fn settle(app: &mut AppState) {
        let deadline = Instant::now() + Duration::from_secs(5);
        while app.is_generating() && Instant::now() < deadline {
            app.tick(GestureSignal::IDLE, 0.0);
            thread::sleep(Duration::from_millis(2));
        }
        assert!(!app.is_generating(), "generation did not finish");
    }

    /// Tick for a while so any in-flight result gets drained.
    fn idle_ticks(app: &mut AppState) {
        for _ in 0..50 {
            app.tick(GestureSignal::IDLE, 0.0);
            thread::sleep(Duration::from_millis(2));
        }
    }

    fn radius(p: [f32; 3]) -> f32 { (p[0] * p[0] + p[1] * p[1] + p[2] * p[2]).sqrt() }

    #[test]
    fn defaults_match_the_stock_scene() {
        let cfg = AppConfig::default();
        assert_eq!(cfg.shape, ShapeKind::Heart);
        assert_eq!(cfg.particle_count, 3000);
        assert_eq!(cfg.color.to_string(), "#00ffff");
        assert_eq!(cfg.source, SourceChoice::Simulated);
    }

    #[test]
    fn first_tick_builds_the_target() {
        let mut app = app_with(Canned(None), 50);
        assert!(app.engine().target().as_slice().iter().all(|&v| v == 0.0));
        app.tick(GestureSignal::IDLE, 0.0);
        assert_eq!(app.engine().target().as_slice().len(), 150);
        assert!(app.engine().target().as_slice().iter().any(|&v| v != 0.0));
        assert!(!app.refresh_target(), "unchanged selection must not rebuild");
    }

    #[test]
    fn generated_payload_is_padded_to_particle_count() {
        let mut app = app_with(Canned(Some(vec![1.0, 2.0, 3.0, 4.0, 5.0])), 2);
        app.handle_command(AppCommand::GenerateFromPrompt("a tiny thing".into()));
        assert!(app.is_generating());
        settle(&mut app);
        app.tick(GestureSignal::IDLE, 0.0);

        assert_eq!(app.selection().kind, ShapeKind::Custom);
        assert_eq!(app.engine().target().as_slice(), &[1.0, 2.0, 3.0, 4.0, 5.0, 0.0]);
        assert!(app.status.contains("ready"), "status: {}", app.status);
    }

    #[test]
    fn rapid_reselection_leaves_last_shape_as_target() {
        let mut app = app_with(Canned(None), 400);
        app.handle_command(AppCommand::SelectShape(ShapeKind::Sphere));
        app.handle_command(AppCommand::SelectShape(ShapeKind::Heart));
        app.handle_command(AppCommand::SelectShape(ShapeKind::Sphere));
        app.tick(GestureSignal::IDLE, 0.0);

        assert_eq!(app.selection().kind, ShapeKind::Sphere);
        let target = app.engine().target();
        for i in 0..target.len_points() {
            assert_relative_eq!(radius(target.point(i)), 2.0, epsilon = 1e-3);
        }
    }

    #[test]
    fn reselecting_the_same_shape_resamples() {
        let mut app = app_with(Canned(None), 100);
        app.tick(GestureSignal::IDLE, 0.0);
        let before = app.engine().target().clone();
        app.handle_command(AppCommand::SelectShape(ShapeKind::Heart));
        assert!(app.refresh_target());
        assert_ne!(app.engine().target(), &before);
    }

    #[test]
    fn failed_generation_keeps_selection() {
        let mut app = app_with(Canned(None), 10);
        let before = app.selection().clone();
        app.handle_command(AppCommand::GenerateFromPrompt("a dragon".into()));
        settle(&mut app);
        assert_eq!(app.selection(), &before);
        assert!(app.status.contains("failed"), "status: {}", app.status);
    }

    #[test]
    fn empty_prompt_fails_without_a_request() {
        let mut app = app_with(Canned(Some(vec![1.0; 3])), 10);
        app.handle_command(AppCommand::GenerateFromPrompt("   ".into()));
        assert!(!app.is_generating());
        assert!(app.status.contains("failed"));
    }

    #[test]
    fn second_request_while_pending_is_rejected() {
        let (gen, release, done) = gated(vec![9.0; 6]);
        let mut app = app_with(gen, 2);
        app.handle_command(AppCommand::GenerateFromPrompt("one".into()));
        app.handle_command(AppCommand::GenerateFromPrompt("two".into()));
        assert!(app.status.contains("Still generating"));

        release.send(()).unwrap();
        done.recv().unwrap();
        settle(&mut app);
        assert_eq!(app.selection().custom_points, Some(vec![9.0; 6]));
    }

    #[test]
    fn manual_selection_supersedes_pending_generation() {
        let (gen, release, done) = gated(vec![9.0; 6]);
        let mut app = app_with(gen, 2);
        app.handle_command(AppCommand::GenerateFromPrompt("a boat".into()));
        app.handle_command(AppCommand::SelectShape(ShapeKind::Sphere));
        assert!(!app.is_generating());

        release.send(()).unwrap();
        done.recv().unwrap();
        idle_ticks(&mut app);

        assert_eq!(app.selection().kind, ShapeKind::Sphere);
        assert_eq!(app.selection().custom_points, None);
    }

    #[test]
    fn particle_count_change_reallocates_at_origin() {
        let mut app = app_with(Canned(None), 100);
        app.tick(GestureSignal::IDLE, 0.1);
        app.handle_command(AppCommand::SetParticleCount(10));
        assert_eq!(app.engine().particle_count(), 10);
        assert!(app.engine().state().positions().iter().all(|&v| v == 0.0));

        app.tick(GestureSignal::IDLE, 0.0);
        assert_eq!(app.engine().target().as_slice().len(), 30);
    }

    #[test]
    fn particle_count_is_bounded() {
        let mut app = app_with(Canned(None), 100);
        app.handle_command(AppCommand::AdjustParticleCount(-500));
        assert_eq!(app.selection().particle_count, 0);
        app.handle_command(AppCommand::SetParticleCount(usize::MAX));
        assert_eq!(app.selection().particle_count, MAX_PARTICLES);
    }

    #[test]
    fn colour_commands_only_touch_colour() {
        let mut app = app_with(Canned(None), 10);
        app.tick(GestureSignal::IDLE, 0.0);
        app.handle_command(AppCommand::CycleColor);
        assert_ne!(app.selection().color, Rgb::CYAN);
        app.handle_command(AppCommand::SetColor(Rgb::new(1, 2, 3)));
        assert_eq!(app.selection().color, Rgb::new(1, 2, 3));
        assert!(!app.refresh_target());
    }

    #[test]
    fn loaded_points_survive_custom_reselection() {
        let mut app = app_with(Canned(None), 1);
        app.handle_command(AppCommand::LoadPoints(vec![0.5, 0.5, 0.5]));
        app.handle_command(AppCommand::SelectShape(ShapeKind::Custom));
        app.tick(GestureSignal::IDLE, 0.0);
        assert_eq!(app.engine().target().as_slice(), &[0.5, 0.5, 0.5]);

        app.handle_command(AppCommand::SelectShape(ShapeKind::Rose));
        assert_eq!(app.selection().custom_points, None);
    }

    #[test]
    fn config_points_start_as_custom() {
        let cfg = AppConfig { particle_count: 1, custom_points: Some(vec![1.0, 1.0, 1.0]), ..AppConfig::default() };
        let mut app = AppState::with_generator(&cfg, Box::new(Canned(None)));
        assert_eq!(app.selection().kind, ShapeKind::Custom);
        app.tick(GestureSignal::IDLE, 0.0);
        assert_eq!(app.engine().target().as_slice(), &[1.0, 1.0, 1.0]);
    }

    #[test]
    fn tick_records_signal_and_spin() {
        let mut app = app_with(Canned(None), 10);
        let s = GestureSignal { tension: 1.0, span: 0.3, hand_count: 1 };
        app.tick(s, 1.0 / 60.0);
        assert_eq!(app.signal(), s);
        assert_relative_eq!(app.last_spin(), 0.051, epsilon = 1e-6);
    }

    #[test]
    fn dropping_the_app_mid_generation_ends_the_worker() {
        let (gen, release, done) = gated(vec![1.0; 3]);
        let mut app = app_with(gen, 1);
        app.handle_command(AppCommand::GenerateFromPrompt("a star".into()));
        drop(app);
        release.send(()).unwrap();

        // The answer is produced, then the worker finds nobody listening,
        // returns, and drops the generator with its `done` sender.
        let wait = Duration::from_secs(5);
        assert_eq!(done.recv_timeout(wait), Ok(()));
        assert_eq!(done.recv_timeout(wait), Err(RecvTimeoutError::Disconnected));
    }

    #[test]
    fn live_app_keeps_its_worker() {
        let (gen, release, done) = gated(vec![1.0; 3]);
        let mut app = app_with(gen, 1);
        app.handle_command(AppCommand::GenerateFromPrompt("a star".into()));
        release.send(()).unwrap();
        assert_eq!(done.recv_timeout(Duration::from_secs(5)), Ok(()));
        assert_eq!(
            done.recv_timeout(Duration::from_millis(50)),
            Err(RecvTimeoutError::Timeout),
        );
        settle(&mut app);
    }

    #[test]
    fn empty_custom_list_gives_a_field_at_the_origin() {
        let sel = ShapeSelection {
            kind:           ShapeKind::Custom,
            particle_count: 2,
            color:          Rgb::CYAN,
            custom_points:  Some(Vec::new()),
        };
        assert_eq!(derive_target(&sel).as_slice(), &[0.0; 6]);
    }

    #[test]
    fn empty_ai_reply_is_applied_as_is() {
        let mut app = app_with(Canned(Some(Vec::new())), 2);
        app.handle_command(AppCommand::GenerateFromPrompt("nothing".into()));
        settle(&mut app);
        app.tick(GestureSignal::IDLE, 0.0);
        assert_eq!(app.selection().kind, ShapeKind::Custom);
        assert_eq!(app.engine().target().as_slice(), &[0.0; 6]);
    }

    #[test]
    fn custom_without_points_falls_back_to_sphere() {
        let sel = ShapeSelection {
            kind:           ShapeKind::Custom,
            particle_count: 50,
            color:          Rgb::CYAN,
            custom_points:  None,
        };
        let cloud = derive_target(&sel);
        for i in 0..cloud.len_points() {
            assert_relative_eq!(radius(cloud.point(i)), 2.0, epsilon = 1e-3);
        }
    }

    /// A reader whose every read fails.
    struct Broken;

    impl io::Read for Broken {
        fn read(&mut self, _buf: &mut [u8]) -> io::Result<usize> {
            Err(io::Error::new(io::ErrorKind::Other, "stdin closed"))
        }
    }

    #[test]
    fn prompt_reader_always_answers() {
        assert_eq!(read_prompt(&mut io::Cursor::new("  a lighthouse \n")), "a lighthouse");
        assert_eq!(read_prompt(&mut io::Cursor::new("")), "");
        assert_eq!(read_prompt(&mut io::BufReader::new(Broken)), "");
    }

    #[test]
    fn failed_prompt_read_reports_failure() {
        let mut app = app_with(Canned(Some(vec![1.0; 3])), 1);
        let text = read_prompt(&mut io::BufReader::new(Broken));
        app.handle_command(AppCommand::GenerateFromPrompt(text));
        assert!(!app.is_generating());
        assert!(app.status.contains("failed"));
    }
}
