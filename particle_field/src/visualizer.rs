//! Software-rendered visualizer using `minifb`.
//!
//! Layout:
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────┐
//! │ PARTICLE FIELD                              2 HANDS DETECTED │
//! │ SHAPE  PARTICLES  COLOR                     PINCH / SPAN     │
//! │                                             tracking         │
//! │                    .  ..:::::..  .                           │
//! │                  .:::::::::::::::::.                         │
//! │                    ':::::::::::::'                           │
//! │                        ':::::'                               │
//! ├──────────────────────────────────────────────────────────────┤
//! │ status message                                               │
//! │ key legend                                                   │
//! └──────────────────────────────────────────────────────────────┘
//! ```
//!
//! Particles are projected through a perspective camera on the +z axis
//! looking at the origin and splatted additively, so dense regions glow.

use std::sync::mpsc::Sender;
use std::time::Duration;

use minifb::{Key, KeyRepeat, Window, WindowOptions};

use cloud_shapes::ShapeKind;

use crate::app::{AppCommand, AppState};
use crate::error::FieldError;
use crate::gesture::{SimInput, SimKey, TrackingStatus};
use crate::palette::{add_argb, blend};

// ════════════════════════════════════════════════════════════════════════════
// Layout constants
// ════════════════════════════════════════════════════════════════════════════

pub const WIN_W:     usize = 960;
pub const WIN_H:     usize = 640;
const STATUS_H:      usize = 52;
const STATUS_Y:      usize = WIN_H - STATUS_H;
const HUD_X:         usize = WIN_W - 230;
const BG_COLOR:      u32   = 0xFF050505;
const STATUS_BG:     u32   = 0xFF101018;
const TEXT_COLOR:    u32   = 0xFFEEEEEE;
const DIM_TEXT:      u32   = 0xFF888888;
const HANDS_ON:      u32   = 0xFF66FF99;
const HANDS_OFF:     u32   = 0xFFFF6666;
const GLYPH_SCALE:   usize = 2;
const GLYPH_ADVANCE: usize = 4 * GLYPH_SCALE;

/// Particle count change per `+`/`-` press.
pub const COUNT_STEP: usize = 500;

// ── camera ────────────────────────────────────────────────────────────────

const CAMERA_Z:      f32 = 8.0;
const FOV_Y_DEG:     f32 = 60.0;
const NEAR:          f32 = 0.1;
const POINT_SIZE:    f32 = 0.08;
const POINT_OPACITY: f32 = 0.8;

/// Screen position and splat size (pixels) of a world-space point, or
/// `None` when it is behind the camera.
pub fn project(p: [f32; 3]) -> Option<(f32, f32, f32)> {
    let depth = CAMERA_Z - p[2];
    if !depth.is_finite() || depth <= NEAR {
        return None;
    }
    let focal = (WIN_H as f32 / 2.0) / (FOV_Y_DEG.to_radians() / 2.0).tan();
    let k = focal / depth;
    Some((
        WIN_W as f32 / 2.0 + p[0] * k,
        STATUS_Y as f32 / 2.0 - p[1] * k,
        POINT_SIZE * k,
    ))
}

// ════════════════════════════════════════════════════════════════════════════
// Visualizer
// ════════════════════════════════════════════════════════════════════════════

pub struct Visualizer {
    window: Window,
    buf:    Vec<u32>,
    sim_tx: Sender<SimInput>,
    frame:  u64,
}

impl Visualizer {
    pub fn new(sim_tx: Sender<SimInput>) -> Result<Self, FieldError> {
        let mut window = Window::new(
            "Particle Field",
            WIN_W, WIN_H,
            WindowOptions {
                resize: false,
                ..WindowOptions::default()
            },
        )?;

        window.limit_update_rate(Some(Duration::from_millis(16))); // ~60fps

        Ok(Visualizer {
            window,
            buf: vec![BG_COLOR; WIN_W * WIN_H],
            sim_tx,
            frame: 0,
        })
    }

    pub fn is_open(&self) -> bool { self.window.is_open() }

    /// Poll the keyboard.  Simulated-hand keys go to the landmark source;
    /// everything else comes back as commands for the app.
    pub fn poll_input(&mut self) -> Vec<AppCommand> {
        let mut cmds = Vec::new();
        if !self.window.is_open() {
            cmds.push(AppCommand::Quit);
            return cmds;
        }

        let window   = &self.window;
        let one_shot = |k: Key| window.is_key_pressed(k, KeyRepeat::No);
        let held     = |k: Key| window.is_key_pressed(k, KeyRepeat::Yes);

        if one_shot(Key::Q) || one_shot(Key::Escape) {
            cmds.push(AppCommand::Quit);
            return cmds;
        }

        let shape_keys = [Key::Key1, Key::Key2, Key::Key3, Key::Key4, Key::Key5, Key::Key6];
        for (key, kind) in shape_keys.iter().zip(ShapeKind::PROCEDURAL) {
            if one_shot(*key) { cmds.push(AppCommand::SelectShape(kind)); }
        }
        if one_shot(Key::C) { cmds.push(AppCommand::CycleColor); }
        if one_shot(Key::G) { cmds.push(AppCommand::RequestPrompt); }
        if held(Key::Equal) || held(Key::NumPadPlus) {
            cmds.push(AppCommand::AdjustParticleCount(COUNT_STEP as isize));
        }
        if held(Key::Minus) || held(Key::NumPadMinus) {
            cmds.push(AppCommand::AdjustParticleCount(-(COUNT_STEP as isize)));
        }

        // ── simulated hands ───────────────────────────────────────────────
        // Send failures mean another source is active; ignore them.
        if one_shot(Key::H) {
            let _ = self.sim_tx.send(SimInput::KeyDown(SimKey::CycleHands));
        }
        for (key, sim) in [(Key::Space, SimKey::Pinch), (Key::Right, SimKey::Widen), (Key::Left, SimKey::Narrow)] {
            if one_shot(key)                 { let _ = self.sim_tx.send(SimInput::KeyDown(sim)); }
            if window.is_key_released(key)   { let _ = self.sim_tx.send(SimInput::KeyUp(sim));   }
        }

        cmds
    }

    /// Render one frame.
    pub fn render(&mut self, app: &AppState, tracking: &TrackingStatus) -> Result<(), FieldError> {
        self.frame += 1;
        self.buf.fill(BG_COLOR);

        // ── Particles ─────────────────────────────────────────────────────
        let sel   = app.selection();
        let color = sel.color.scaled(POINT_OPACITY).to_argb();
        let state = app.engine().state();
        for i in 0..state.count() {
            if let Some((sx, sy, size)) = project(state.rotated_point(i)) {
                self.splat(sx, sy, size, color);
            }
        }

        // ── Selection ─────────────────────────────────────────────────────
        self.draw_label("PARTICLE FIELD", 12, 12, sel.color.to_argb());
        let info = format!(
            "SHAPE {}   PARTICLES {}   COLOR {}",
            sel.kind.name(), sel.particle_count, sel.color,
        );
        self.draw_label(&info, 12, 34, DIM_TEXT);

        // ── Hands ─────────────────────────────────────────────────────────
        let signal = app.signal();
        let (hands, hands_color) = match signal.hand_count {
            0 => ("NO HANDS".to_string(), HANDS_OFF),
            1 => ("1 HAND DETECTED".to_string(), HANDS_ON),
            n => (format!("{} HANDS DETECTED", n), HANDS_ON),
        };
        self.draw_label(&hands, HUD_X, 12, hands_color);
        let pinch = format!("PINCH {:>3}%", (signal.tension * 100.0).round() as u32);
        let span  = format!("SPAN  {:>3}%", (signal.span.clamp(0.0, 1.0) * 100.0).round() as u32);
        self.draw_label(&pinch, HUD_X, 34, TEXT_COLOR);
        self.draw_label(&span,  HUD_X, 52, TEXT_COLOR);
        let tracking_color = match tracking {
            TrackingStatus::Active => DIM_TEXT,
            _                      => HANDS_OFF,
        };
        self.draw_label(tracking.label(), HUD_X, 70, tracking_color);

        if app.is_generating() {
            let pulse = (self.frame as f32 * 0.12).sin() * 0.5 + 0.5;
            let c = blend(DIM_TEXT, sel.color.to_argb(), pulse);
            self.draw_label("GENERATING...", HUD_X, 92, c);
        }

        // ── Status bar ────────────────────────────────────────────────────
        self.fill_rect(0, STATUS_Y, WIN_W, STATUS_H, STATUS_BG);
        self.draw_label(&app.status, 12, STATUS_Y + 10, TEXT_COLOR);
        self.draw_label(
            "1-6 SHAPE  C COLOR  +/- POINTS  G PROMPT  H HANDS  SPACE PINCH  ARROWS SPAN  Q QUIT",
            12, STATUS_Y + 32, DIM_TEXT,
        );

        self.window.update_with_buffer(&self.buf, WIN_W, WIN_H)?;
        Ok(())
    }

    // ── Primitive drawing helpers ─────────────────────────────────────────

    /// Additive square splat centred on `(sx, sy)`, clipped above the
    /// status bar.
    fn splat(&mut self, sx: f32, sy: f32, size: f32, color: u32) {
        let half = (size / 2.0).max(0.5);
        let x0 = (sx - half).round().max(0.0) as usize;
        let y0 = (sy - half).round().max(0.0) as usize;
        let x1 = ((sx + half).round().max(0.0) as usize).min(WIN_W);
        let y1 = ((sy + half).round().max(0.0) as usize).min(STATUS_Y);
        for row in y0..y1 {
            for col in x0..x1 {
                let px = &mut self.buf[row * WIN_W + col];
                *px = add_argb(*px, color);
            }
        }
    }

    fn fill_rect(&mut self, x: usize, y: usize, w: usize, h: usize, color: u32) {
        for row in y..(y+h).min(WIN_H) {
            for col in x..(x+w).min(WIN_W) {
                self.buf[row * WIN_W + col] = color;
            }
        }
    }

    fn set_pixel(&mut self, x: usize, y: usize, color: u32) {
        if x < WIN_W && y < WIN_H {
            self.buf[y * WIN_W + x] = color;
        }
    }

    /// 3×5 bitmap font drawn at `GLYPH_SCALE`.
    fn draw_label(&mut self, text: &str, x: usize, y: usize, color: u32) {
        let mut cx = x;
        for ch in text.chars() {
            if cx + GLYPH_ADVANCE > WIN_W { break; }
            for (row, &bits) in char_glyph(ch).iter().enumerate() {
                for col in 0..3usize {
                    if bits & (1 << (2 - col)) == 0 { continue; }
                    for dy in 0..GLYPH_SCALE {
                        for dx in 0..GLYPH_SCALE {
                            self.set_pixel(
                                cx + col * GLYPH_SCALE + dx,
                                y + row * GLYPH_SCALE + dy,
                                color,
                            );
                        }
                    }
                }
            }
            cx += GLYPH_ADVANCE;
        }
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Minimal 3×5 bitmap font
// ────────────────────────────────────────────────────────────────────────────

fn char_glyph(c: char) -> [u8; 5] {
    match c.to_ascii_uppercase() {
        '0' => [0b111, 0b101, 0b101, 0b101, 0b111],
        '1' => [0b010, 0b110, 0b010, 0b010, 0b111],
        '2' => [0b111, 0b001, 0b111, 0b100, 0b111],
        '3' => [0b111, 0b001, 0b111, 0b001, 0b111],
        '4' => [0b101, 0b101, 0b111, 0b001, 0b001],
        '5' => [0b111, 0b100, 0b111, 0b001, 0b111],
        '6' => [0b111, 0b100, 0b111, 0b101, 0b111],
        '7' => [0b111, 0b001, 0b001, 0b001, 0b001],
        '8' => [0b111, 0b101, 0b111, 0b101, 0b111],
        '9' => [0b111, 0b101, 0b111, 0b001, 0b111],
        'A' => [0b111, 0b101, 0b111, 0b101, 0b101],
        'B' => [0b110, 0b101, 0b110, 0b101, 0b110],
        'C' => [0b111, 0b100, 0b100, 0b100, 0b111],
        'D' => [0b110, 0b101, 0b101, 0b101, 0b110],
        'E' => [0b111, 0b100, 0b111, 0b100, 0b111],
        'F' => [0b111, 0b100, 0b111, 0b100, 0b100],
        'G' => [0b111, 0b100, 0b101, 0b101, 0b111],
        'H' => [0b101, 0b101, 0b111, 0b101, 0b101],
        'I' => [0b111, 0b010, 0b010, 0b010, 0b111],
        'J' => [0b001, 0b001, 0b001, 0b101, 0b111],
        'K' => [0b101, 0b101, 0b110, 0b101, 0b101],
        'L' => [0b100, 0b100, 0b100, 0b100, 0b111],
        'M' => [0b101, 0b111, 0b101, 0b101, 0b101],
        'N' => [0b111, 0b101, 0b101, 0b101, 0b101],
        'O' => [0b111, 0b101, 0b101, 0b101, 0b111],
        'P' => [0b111, 0b101, 0b111, 0b100, 0b100],
        'Q' => [0b111, 0b101, 0b101, 0b111, 0b001],
        'R' => [0b110, 0b101, 0b110, 0b101, 0b101],
        'S' => [0b111, 0b100, 0b111, 0b001, 0b111],
        'T' => [0b111, 0b010, 0b010, 0b010, 0b010],
        'U' => [0b101, 0b101, 0b101, 0b101, 0b111],
        'V' => [0b101, 0b101, 0b101, 0b010, 0b010],
        'W' => [0b101, 0b101, 0b101, 0b111, 0b101],
        'X' => [0b101, 0b101, 0b010, 0b101, 0b101],
        'Y' => [0b101, 0b101, 0b111, 0b010, 0b010],
        'Z' => [0b111, 0b001, 0b010, 0b100, 0b111],
        '/' => [0b001, 0b001, 0b010, 0b100, 0b100],
        '-' => [0b000, 0b000, 0b111, 0b000, 0b000],
        '.' => [0b000, 0b000, 0b000, 0b000, 0b010],
        ',' => [0b000, 0b000, 0b000, 0b010, 0b100],
        ':' => [0b000, 0b010, 0b000, 0b010, 0b000],
        ';' => [0b000, 0b010, 0b000, 0b010, 0b100],
        '=' => [0b000, 0b111, 0b000, 0b111, 0b000],
        '+' => [0b000, 0b010, 0b111, 0b010, 0b000],
        '%' => [0b101, 0b001, 0b010, 0b100, 0b101],
        '#' => [0b101, 0b111, 0b101, 0b111, 0b101],
        '(' => [0b001, 0b010, 0b010, 0b010, 0b001],
        ')' => [0b100, 0b010, 0b010, 0b010, 0b100],
        '"' => [0b101, 0b101, 0b000, 0b000, 0b000],
        '\'' => [0b010, 0b010, 0b000, 0b000, 0b000],
        '!' => [0b010, 0b010, 0b010, 0b000, 0b010],
        '?' => [0b111, 0b001, 0b010, 0b000, 0b010],
        '_' => [0b000, 0b000, 0b000, 0b000, 0b111],
        ' ' => [0b000, 0b000, 0b000, 0b000, 0b000],
        _   => [0b000, 0b000, 0b010, 0b000, 0b000], // fallback dot
    }
}

// ════════════════════════════════════════════════════════════════════════════
// Tests
// ════════════════════════════════════════════════════════════════════════════
