use std::time::Duration;

use crate::batch::{BatchEntry, BatchStatus};

use super::TileFailure;

pub fn format_duration(d: Duration) -> String {
    let ms = d.as_millis();
    if ms < 1000 {
        format!("{ms}ms")
    } else {
        format!("{:.1}s", d.as_secs_f64())
    }
}

/// Print a single comparison result line.
pub fn print_line(name: &str, status: &BatchStatus, threshold: f64, elapsed: Duration) {
    let time_suffix = format!("  \x1b[2m{}\x1b[0m", format_duration(elapsed));

    match status {
        BatchStatus::Pass => {
            println!("  \x1b[32mPASS\x1b[0m  {name}{time_suffix}");
        }
        BatchStatus::Fail {
            tile_row,
            tile_col,
            percent,
        } => {
            let reason = TileFailure {
                tile_row: *tile_row,
                tile_col: *tile_col,
                percent: *percent,
                threshold,
            };
            println!("  \x1b[31mFAIL\x1b[0m  {name}  ({reason}){time_suffix}");
        }
        BatchStatus::Missing => {
            println!("  \x1b[33mMISS\x1b[0m  {name}  (no current image){time_suffix}");
        }
        BatchStatus::Error { message } => {
            println!("  \x1b[31m ERR\x1b[0m  {name}  ({message}){time_suffix}");
        }
    }
}

/// Print the names of everything that did not pass, grouped by status.
pub fn print_actionable_summary(entries: &[BatchEntry]) {
    let mut failed = Vec::new();
    let mut missing = Vec::new();
    let mut errored = Vec::new();
    for entry in entries {
        match entry.status {
            BatchStatus::Pass => {}
            BatchStatus::Fail { .. } => failed.push(entry.name.as_str()),
            BatchStatus::Missing => missing.push(entry.name.as_str()),
            BatchStatus::Error { .. } => errored.push(entry.name.as_str()),
        }
    }
    if failed.is_empty() && missing.is_empty() && errored.is_empty() {
        return;
    }

    println!();
    println!("Actionable images:");
    for (label, names) in [
        ("Failed", &failed),
        ("Missing", &missing),
        ("Errored", &errored),
    ] {
        if !names.is_empty() {
            println!();
            println!("  {label} ({}):", names.len());
            for name in names {
                println!("    {name}");
            }
        }
    }
}

/// Print the final batch summary.
pub fn print_summary(entries: &[BatchEntry], elapsed: Duration) {
    let total = entries.len();
    let count = |f: fn(&BatchStatus) -> bool| entries.iter().filter(|e| f(&e.status)).count();
    let passed = count(|s| matches!(s, BatchStatus::Pass));
    let failed = count(|s| matches!(s, BatchStatus::Fail { .. }));
    let missing = count(|s| matches!(s, BatchStatus::Missing));
    let errored = count(|s| matches!(s, BatchStatus::Error { .. }));

    println!();
    print!(
        "Images:  {total} total, \x1b[32m{passed} passed\x1b[0m, \x1b[31m{failed} failed\x1b[0m"
    );
    if missing > 0 {
        print!(", \x1b[33m{missing} missing\x1b[0m");
    }
    if errored > 0 {
        print!(", \x1b[31m{errored} errored\x1b[0m");
    }
    println!();
    println!("Time:    {}", format_duration(elapsed));
}
