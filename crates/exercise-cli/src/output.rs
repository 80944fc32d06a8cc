use exercise_core::run_log::RunSummary;
use exercise_core::selector::WorkQueue;
use serde::Serialize;

pub fn print_json<T: Serialize>(value: &T) -> anyhow::Result<()> {
    let json = serde_json::to_string_pretty(value)?;
    println!("{}", json);
    Ok(())
}

pub fn print_table(headers: &[&str], rows: Vec<Vec<String>>) {
    let mut widths: Vec<usize> = headers.iter().map(|h| h.len()).collect();
    for row in &rows {
        for (i, cell) in row.iter().enumerate() {
            if i < widths.len() {
                widths[i] = widths[i].max(cell.len());
            }
        }
    }

    let header_row: Vec<String> = headers
        .iter()
        .enumerate()
        .map(|(i, h)| format!("{:width$}", h, width = widths[i]))
        .collect();
    println!("{}", header_row.join("  ").trim_end());

    let sep: Vec<String> = widths.iter().map(|&w| "-".repeat(w)).collect();
    println!("{}", sep.join("  "));

    for row in &rows {
        let cells: Vec<String> = row
            .iter()
            .enumerate()
            .map(|(i, cell)| {
                let w = widths.get(i).copied().unwrap_or(0);
                format!("{:width$}", cell, width = w)
            })
            .collect();
        println!("{}", cells.join("  ").trim_end());
    }
}

/// Name / Mag / Altitude / Azimuth table of a work queue.
pub fn print_targets(queue: &WorkQueue) {
    if queue.is_empty() {
        println!("No stars inside the altitude window.");
        return;
    }
    let rows = queue
        .iter()
        .map(|t| {
            vec![
                t.name.clone(),
                format!("{:.1}", t.magnitude),
                format!("{:.2}", t.altitude),
                format!("{:.2}", t.azimuth),
            ]
        })
        .collect();
    print_table(&["Name", "Mag", "Altitude", "Azimuth"], rows);
}

/// Plain-text run summary. Dither lines appear only when dithering ran,
/// the guide line only when guiding ran.
pub fn print_summary(summary: &RunSummary, dither: bool, guide: bool) {
    for line in summary_lines(summary, dither, guide) {
        println!("{line}");
    }
}

fn summary_lines(summary: &RunSummary, dither: bool, guide: bool) -> Vec<String> {
    let mut lines = vec![
        format!("Run: {}", summary.run_id),
        format!(
            "Targets completed: {}  skipped: {}",
            summary.completed, summary.skipped
        ),
        format!("Slew times: {}", seconds_list(&summary.slew_times)),
        format!("Number of slew errors:   {}", summary.bad_slews),
        format!("Maximum slew time: {}", maximum(summary.max_slew_time)),
    ];
    if dither {
        lines.push(format!("Dither times: {}", seconds_list(&summary.dither_times)));
        lines.push(format!(
            "Maximum dither time: {}",
            maximum(summary.max_dither_time)
        ));
        lines.push(format!("Number of dither errors: {}", summary.bad_dithers));
    }
    if guide {
        lines.push(format!("Number of guide errors: {}", summary.bad_guides));
        if summary.advisory_failures > 0 {
            lines.push(format!(
                "Guide plots not sent: {}",
                summary.advisory_failures
            ));
        }
    }
    lines.push(format!("Bad stars: [{}]", summary.failed_targets.join(", ")));
    let times: Vec<String> = summary
        .error_times
        .iter()
        .map(|t| t.format("%H:%M:%S").to_string())
        .collect();
    lines.push(format!("Error times: [{}]", times.join(", ")));
    lines
}

fn seconds_list(values: &[f64]) -> String {
    let parts: Vec<String> = values.iter().map(|v| format!("{v:.1}")).collect();
    format!("[{}]", parts.join(", "))
}

fn maximum(value: Option<f64>) -> String {
    match value {
        Some(v) => format!("{v:.1}"),
        None => "no data".to_string(),
    }
}
