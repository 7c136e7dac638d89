//! particle_field: interactive entry point.

use std::io::{self, Write};
use std::path::PathBuf;

use clap::Parser;
use cloud_shapes::{parse_points_payload, ShapeKind};
use particle_field::app::{run, AppConfig, SourceChoice};
use particle_field::generator::{GeminiConfig, GeneratorChoice};
use particle_field::palette::Rgb;
use particle_field::FieldError;

#[derive(Parser, Debug)]
#[command(name = "particle_field", about = "Gesture-driven particle field")]
struct Args {
    /// Skip the start-up questions.
    #[arg(long)]
    quick: bool,

    /// Starting shape: heart, sphere, planet, rose, humanoid or burst.
    #[arg(long)]
    shape: Option<ShapeKind>,

    /// Number of particles.
    #[arg(long)]
    count: Option<usize>,

    /// Particle colour as #rrggbb.
    #[arg(long)]
    color: Option<Rgb>,

    /// Drive the field from a recorded landmark file (JSON lines).
    #[arg(long, value_name = "PATH", conflicts_with = "leap")]
    replay: Option<PathBuf>,

    /// Use a LeapMotion controller (needs the `leap` feature).
    #[arg(long)]
    leap: bool,

    /// Send prompts to this URL instead of Gemini.
    #[arg(long, value_name = "URL")]
    endpoint: Option<String>,

    /// Gemini model name.
    #[arg(long)]
    model: Option<String>,

    /// Start from a saved {"points": [...]} payload.
    #[arg(long, value_name = "FILE")]
    points: Option<PathBuf>,
}

fn main() {
    env_logger::init();
    let args = Args::parse();

    println!();
    println!("╔══════════════════════════════════════════════════════╗");
    println!("║          Particle Field — gesture sculpting          ║");
    println!("╚══════════════════════════════════════════════════════╝");
    println!();

    #[cfg(feature = "leap")]
    println!("  Mode: LeapMotion hardware available (--leap)");
    #[cfg(not(feature = "leap"))]
    println!("  Mode: Keyboard simulation  (use --features leap for hardware)");
    println!();

    let cfg = match configure(&args) {
        Ok(cfg) => cfg,
        Err(e)  => {
            eprintln!("Error: {}", e);
            std::process::exit(1);
        }
    };

    println!();
    println!("  {} × {} particles, colour {}", shape_label(&cfg), cfg.particle_count, cfg.color);
    println!("  Shape generation: {}", cfg.generator.describe());
    println!("  Opening visualizer window…");
    println!();

    if let Err(e) = run(cfg) {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}

fn shape_label(cfg: &AppConfig) -> &'static str {
    if cfg.custom_points.is_some() { ShapeKind::Custom.name() } else { cfg.shape.name() }
}

fn configure(args: &Args) -> Result<AppConfig, FieldError> {
    let mut cfg = AppConfig::default();

    cfg.generator = match &args.endpoint {
        Some(url) => GeneratorChoice::Endpoint { url: url.clone() },
        None => {
            let mut gemini = GeminiConfig::from_env();
            if let Some(model) = &args.model { gemini.model = model.clone(); }
            GeneratorChoice::Gemini(gemini)
        }
    };

    cfg.source = match (&args.replay, args.leap) {
        (Some(path), _) => SourceChoice::Replay(path.clone()),
        (None, true)    => SourceChoice::Leap,
        (None, false)   => SourceChoice::Simulated,
    };

    if let Some(path) = &args.points {
        let points = parse_points_payload(&std::fs::read_to_string(path)?)?;
        println!("  Loaded {} points from {}", points.len() / 3, path.display());
        cfg.custom_points = Some(points);
    }

    if !args.quick {
        configure_interactively(&mut cfg);
    }

    if let Some(shape) = args.shape { cfg.shape = shape; }
    if let Some(count) = args.count { cfg.particle_count = count; }
    if let Some(color) = args.color { cfg.color = color; }
    Ok(cfg)
}

fn configure_interactively(cfg: &mut AppConfig) {
    if cfg.custom_points.is_none() {
        println!("  Starting shape:");
        for (i, kind) in ShapeKind::PROCEDURAL.iter().enumerate() {
            println!("    {}. {}", i + 1, kind.name());
        }
        let choice = read_line("  Choice (1–6, default 1): ");
        cfg.shape = match choice.trim().parse::<usize>() {
            Ok(n) if (1..=ShapeKind::PROCEDURAL.len()).contains(&n) => ShapeKind::PROCEDURAL[n - 1],
            _ => cfg.shape,
        };
    }

    cfg.particle_count = read_line(&format!("  Particles (default {}): ", cfg.particle_count))
        .trim().parse().unwrap_or(cfg.particle_count);

    cfg.color = loop {
        let c = read_line(&format!("  Colour #rrggbb (default {}): ", cfg.color));
        if c.trim().is_empty() { break cfg.color; }
        match c.parse::<Rgb>() {
            Ok(rgb) => break rgb,
            Err(e)  => println!("    ⚠  {}", e),
        }
    };
}

fn read_line(prompt: &str) -> String {
    print!("{}", prompt);
    io::stdout().flush().ok();
    let mut buf = String::new();
    io::stdin().read_line(&mut buf).ok();
    buf
}
