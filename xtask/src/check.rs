use anyhow::Result;
use colored::Colorize;
use std::time::Instant;

use crate::step::{cargo, Severity};

/// Library crates that must build without std.
const NO_STD_CRATES: [&str; 3] = ["platform", "dsi", "panel"];

/// Logging backends; each is checked on its own since they are exclusive.
const LOG_FEATURES: [&str; 2] = ["defmt", "tracing"];

pub fn run() -> Result<()> {
    println!();
    println!("{}", "🔍 Checking display stack builds...".cyan().bold());
    println!();

    let total_start = Instant::now();

    for krate in NO_STD_CRATES {
        cargo(
            &format!("Checking {krate} (no_std)"),
            &["check", "-p", krate, "--no-default-features"],
            Severity::Required,
        )?;
    }
    println!();

    for feature in LOG_FEATURES {
        for krate in ["dsi", "panel"] {
            cargo(
                &format!("Checking {krate} with {feature}"),
                &["check", "-p", krate, "--features", feature],
                Severity::Required,
            )?;
        }
    }
    println!();

    cargo(
        "Running clippy lints",
        &["clippy", "--workspace", "--all-targets", "--", "-D", "warnings"],
        Severity::Advisory,
    )?;
    println!();

    if cargo("Checking code formatting", &["fmt", "--all", "--check"], Severity::Advisory)?.is_none() {
        eprintln!("     Run 'cargo fmt --all' to fix");
    }
    println!();

    println!(
        "{}",
        format!("✓ All checks completed in {:.2}s", total_start.elapsed().as_secs_f64())
            .green()
            .bold()
    );
    println!();

    Ok(())
}
