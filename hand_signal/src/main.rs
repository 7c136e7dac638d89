//! signal_replay: print the gesture signal for every frame of a landmark
//! recording (one JSON frame per line; see `hand_signal::parse_frame`).

use std::fs::File;
use std::io::{self, BufRead, BufReader};
use std::path::PathBuf;

use clap::Parser;
use hand_signal::{parse_frame, GestureInterpreter};

#[derive(Parser, Debug)]
#[command(name = "signal_replay", about = "Interpret recorded hand-landmark frames")]
struct Args {
    /// Recording to read; stdin when omitted.
    path: Option<PathBuf>,

    /// Use the stateless interpreter (single-hand frames report idle span).
    #[arg(long)]
    stateless: bool,
}

fn main() {
    env_logger::init();
    let args = Args::parse();

    if let Err(e) = run(&args) {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}

fn run(args: &Args) -> io::Result<()> {
    let reader: Box<dyn BufRead> = match &args.path {
        Some(p) => Box::new(BufReader::new(File::open(p)?)),
        None    => Box::new(BufReader::new(io::stdin())),
    };

    let mut interpreter = GestureInterpreter::new();
    println!("{:>6}  {:>5}  {:>7}  {:>7}", "frame", "hands", "tension", "span");

    for (n, line) in reader.lines().enumerate() {
        let line = line?;
        if line.trim().is_empty() { continue; }

        let hands = match parse_frame(&line) {
            Ok(h)  => h,
            Err(e) => {
                log::warn!("frame {}: {}; skipped", n, e);
                continue;
            }
        };
        let s = if args.stateless {
            hand_signal::interpret(&hands)
        } else {
            interpreter.update(&hands)
        };
        println!("{:>6}  {:>5}  {:>7.3}  {:>7.3}", n, s.hand_count, s.tension, s.span);
    }
    Ok(())
}
