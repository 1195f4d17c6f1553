//! Display utilities for the gzpipe CLI

use console::style;
use gzpipe_alloc::AllocationSnapshot;
use gzpipe_types::CompressionStats;
use indicatif::{ProgressBar, ProgressStyle};
use std::time::Duration;

/// Create a byte progress bar covering `total_bytes` of input
pub fn create_progress_bar(total_bytes: u64, quiet: bool) -> Option<ProgressBar> {
    if quiet {
        return None;
    }

    let pb = ProgressBar::new(total_bytes);
    let style = ProgressStyle::default_bar()
        .template("{spinner:.green} {msg} [{wide_bar:.cyan/blue}] {bytes}/{total_bytes} ({eta})")
        .unwrap_or_else(|_| ProgressStyle::default_bar())
        .progress_chars("█▉▊▋▌▍▎▏  ");
    pb.set_style(style);
    pb.enable_steady_tick(Duration::from_millis(100));
    Some(pb)
}

/// Print the summary of a compression run
pub fn print_summary(
    files: usize,
    failed: usize,
    stats: &CompressionStats,
    duration: Duration,
    allocations: Option<AllocationSnapshot>,
) {
    println!();
    println!("{}", style("Compression Statistics:").bold().underlined());
    println!("  Files compressed: {}", style(files).green());
    println!(
        "  Failures: {}",
        if failed > 0 {
            style(failed).red()
        } else {
            style(failed).green()
        }
    );
    println!("  Bytes in: {}", style(format_bytes(stats.bytes_in)).green());
    println!("  Bytes out: {}", style(format_bytes(stats.bytes_out)).green());
    println!(
        "  Ratio: {}",
        style(format!("{:.1}%", stats.compression_ratio() * 100.0)).cyan()
    );
    println!("  Duration: {}", style(format_duration(duration)).blue());
    println!(
        "  Throughput: {}",
        style(format!(
            "{:.2} MB/s",
            throughput(stats.bytes_in, duration) / 1024.0 / 1024.0
        ))
        .blue()
    );

    if let Some(snapshot) = allocations {
        println!();
        println!("{}", style("Engine Memory:").bold().underlined());
        println!("  Allocations: {}", style(snapshot.allocations).cyan());
        println!("  Refused: {}", style(snapshot.failures).yellow());
        println!(
            "  Peak usage: {}",
            style(format_bytes(snapshot.peak_bytes as u64)).cyan()
        );
        println!(
            "  Still live: {}",
            style(format_bytes(snapshot.live_bytes as u64)).cyan()
        );
    }
}

fn throughput(bytes: u64, duration: Duration) -> f64 {
    let secs = duration.as_secs_f64();
    if secs > 0.0 {
        bytes as f64 / secs
    } else {
        0.0
    }
}

/// Format a byte count with a binary unit
pub fn format_bytes(bytes: u64) -> String {
    const UNITS: &[&str] = &["B", "KB", "MB", "GB", "TB"];
    let mut size = bytes as f64;
    let mut unit_index = 0;

    while size >= 1024.0 && unit_index < UNITS.len() - 1 {
        size /= 1024.0;
        unit_index += 1;
    }

    format!("{:.2} {}", size, UNITS[unit_index])
}

/// Format a duration for humans
pub fn format_duration(duration: Duration) -> String {
    let secs = duration.as_secs();
    if secs < 60 {
        format!("{:.2}s", duration.as_secs_f64())
    } else if secs < 3600 {
        format!("{}m {}s", secs / 60, secs % 60)
    } else {
        format!("{}h {}m {}s", secs / 3600, (secs % 3600) / 60, secs % 60)
    }
}
