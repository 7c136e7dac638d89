//! Interactive menu for sampling the procedural point clouds.
//! Prints bounds, centroid and a few sample points; optionally writes the
//! cloud as a `{"points": [...]}` payload file.

use cloud_shapes::{generate, PointCloud, ShapeKind};
use std::io::{self, Write};

fn main() {
    env_logger::init();

    println!();
    println!("╔══════════════════════════════════════════════════════╗");
    println!("║            Particle Point-Cloud Explorer             ║");
    println!("╚══════════════════════════════════════════════════════╝");
    println!();

    loop {
        print_menu();
        let choice = read_line("Select a shape (1–6, or q to quit): ");

        if choice.trim().eq_ignore_ascii_case("q") {
            println!("\nGoodbye!\n");
            break;
        }

        let kind = match choice.trim().parse::<usize>() {
            Ok(n) if (1..=ShapeKind::PROCEDURAL.len()).contains(&n) => ShapeKind::PROCEDURAL[n - 1],
            _ => { println!("  ⚠  Please enter 1–6 or q.\n"); continue; }
        };

        let n: usize = read_line("  How many points? (default 3000): ")
            .trim().parse().unwrap_or(3000);
        let n = n.min(200_000);

        let cloud = generate(kind, n);
        print_summary(kind, &cloud);

        let path = read_line("  Save payload to file (blank to skip): ");
        let path = path.trim();
        if !path.is_empty() {
            match save_payload(&cloud, path) {
                Ok(())  => println!("  → {}\n", path),
                Err(e)  => {
                    log::error!("could not write {}: {}", path, e);
                    println!("  ⚠  {}\n", e);
                }
            }
        }
    }
}

fn print_menu() {
    println!("  ┌───────────────────────────────┐");
    for (i, kind) in ShapeKind::PROCEDURAL.iter().enumerate() {
        println!("  │  {}. {:<12} ({:<8})   │", i + 1, kind.name(), kind.key());
    }
    println!("  └───────────────────────────────┘");
}

fn print_summary(kind: ShapeKind, cloud: &PointCloud) {
    println!();
    println!("  ┌─ {} × {} points ─", kind.name(), cloud.len_points());
    match (cloud.bounds(), cloud.centroid()) {
        (Some((lo, hi)), Some(c)) => {
            println!("  │  min      : [{:>7.3}, {:>7.3}, {:>7.3}]", lo[0], lo[1], lo[2]);
            println!("  │  max      : [{:>7.3}, {:>7.3}, {:>7.3}]", hi[0], hi[1], hi[2]);
            println!("  │  centroid : [{:>7.3}, {:>7.3}, {:>7.3}]", c[0], c[1], c[2]);
            println!("  │");
            for i in 0..cloud.len_points().min(5) {
                let p = cloud.point(i);
                println!("  │  [{:>4}]  ({:>7.3}, {:>7.3}, {:>7.3})", i, p[0], p[1], p[2]);
            }
        }
        _ => println!("  │  (empty)"),
    }
    println!("  └─");
    println!();
}

fn save_payload(cloud: &PointCloud, path: &str) -> Result<(), cloud_shapes::CloudError> {
    let text = cloud.to_json_payload()?;
    std::fs::write(path, text)?;
    Ok(())
}

fn read_line(prompt: &str) -> String {
    print!("{}", prompt);
    io::stdout().flush().ok();
    let mut buf = String::new();
    io::stdin().read_line(&mut buf).ok();
    buf
}
