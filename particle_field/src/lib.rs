//! # particle_field
//!
//! A cloud of particles that morphs between shapes and answers to your
//! hands: pinch to clench and spin it, spread two hands apart to grow it.
//!
//! ## Gesture → effect
//!
//! | Gesture | Effect |
//! |---|---|
//! | No hands | Current shape breathes slowly |
//! | Pinch / fist (tension) | Field contracts, vibrates and spins faster |
//! | Two hands apart (span) | Field expands with the wrist distance |
//!
//! ## Shapes
//!
//! Six procedural shapes (heart, sphere, ringed planet, rose, seated
//! figure, burst) come from `cloud_shapes`.  A text prompt can ask an AI
//! model for any other shape; the returned point list becomes the Custom
//! target.  Generation runs on a worker thread and never stalls the frame.
//!
//! ## Feature flags
//!
//! * (default): **Simulation mode**: keyboard-driven hands, or a recorded
//!   landmark file with `--replay`.
//! * `leap`: **Hardware mode**: polls a real LeapMotion controller via LeapC.
//!
//! ### Keyboard
//!
//! | Key | Action |
//! |---|---|
//! | `1`–`6` | Heart, Sphere, Saturn, Flower, Buddha, Fireworks |
//! | `C` | Next colour |
//! | `+` / `-` | More / fewer particles |
//! | `G` | Type a prompt in the terminal for an AI shape |
//! | `H` | Simulated hands: none → one → two |
//! | `Space` (hold) | Simulated pinch |
//! | `←` / `→` (hold) | Move simulated hands together / apart |
//! | `Q` / `Esc` | Quit |

pub mod error;
pub mod palette;
pub mod gesture;
pub mod generator;
pub mod visualizer;
pub mod app;

pub use error::FieldError;
