//! Plain-text report for operators.
//!
//! Platforms with history get a change section; platforms on their first
//! capture get an overview of the current board instead.

use std::collections::{BTreeMap, BTreeSet};

use dramatrack_core::{PlatformsFile, Snapshot};

use crate::types::{AnalysisResult, PlatformAnalysis, TrendResult};

/// Upper bound used for chat-style delivery of the report.
pub const DEFAULT_REPORT_MAX_CHARS: usize = 1950;

const OVERVIEW_TOP: usize = 10;
const GENRE_DISTRIBUTION_TOP: usize = 8;
const MOST_COLLECTED_TOP: usize = 5;
const SECTION_ITEMS: usize = 6;
const RISING_GENRES: usize = 3;
const FALLING_GENRES: usize = 2;
const TRUNCATION_MARKER: &str = "\n\n(report truncated; the full version is in the saved report file)";

/// Render the report for `analyses`, optionally cut to `max_chars`
/// characters plus a truncation marker.
#[must_use]
pub fn render_report(
    analyses: &[PlatformAnalysis],
    catalog: &PlatformsFile,
    max_chars: Option<usize>,
) -> String {
    let Some(latest) = analyses
        .iter()
        .filter_map(|a| a.current.as_ref().map(|s| s.captured_at))
        .max()
    else {
        return "No data to analyze. Run `dramatrack collect` first.".to_string();
    };

    let mut lines = vec![
        format!(
            "Short drama ranking report: {}",
            latest.format("%Y-%m-%d %H:%M UTC")
        ),
        String::new(),
    ];

    for analysis in analyses {
        let name = catalog.display_name(&analysis.platform);
        match (&analysis.analysis, &analysis.current) {
            (Some(result), _) => change_section(&mut lines, name, result, analysis.trend.as_ref()),
            (None, Some(current)) => overview_section(&mut lines, name, current),
            (None, None) => {
                lines.push(format!("## {name}"));
                lines.push("No snapshots stored yet.".to_string());
                lines.push(String::new());
            }
        }
    }

    let report = lines.join("\n");
    match max_chars {
        Some(max) if report.chars().count() > max => {
            let mut cut: String = report.chars().take(max).collect();
            cut.push_str(TRUNCATION_MARKER);
            cut
        }
        _ => report,
    }
}

fn overview_section(lines: &mut Vec<String>, name: &str, current: &Snapshot) {
    lines.push(format!("## {name} ({} items)", current.len()));
    lines.push("First capture, no comparison yet. Full change analysis starts with the next run.".to_string());
    lines.push(String::new());

    lines.push(format!("Top {OVERVIEW_TOP}"));
    for item in current.items.iter().take(OVERVIEW_TOP) {
        lines.push(format!(
            "  #{} {}{} | reads {} | collects {}",
            item.rank,
            item.title,
            genre_tag(&item.genres),
            fmt_count(item.read_count),
            fmt_count(item.collect_count),
        ));
    }
    lines.push(String::new());

    let mut distribution: BTreeMap<&str, usize> = BTreeMap::new();
    for genre in current.items.iter().flat_map(|i| i.genres.iter()) {
        *distribution.entry(genre.as_str()).or_default() += 1;
    }
    if !distribution.is_empty() {
        let mut by_count: Vec<(&str, usize)> = distribution.into_iter().collect();
        by_count.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(b.0)));
        let rendered: Vec<String> = by_count
            .iter()
            .take(GENRE_DISTRIBUTION_TOP)
            .map(|(genre, count)| format!("{genre}: {count}"))
            .collect();
        lines.push(format!("Genre distribution: {}", rendered.join(" | ")));
        lines.push(String::new());
    }

    let mut by_collects: Vec<_> = current.items.iter().collect();
    by_collects.sort_by(|a, b| {
        b.collect_count
            .cmp(&a.collect_count)
            .then_with(|| a.rank.cmp(&b.rank))
    });
    lines.push("Most collected".to_string());
    for item in by_collects.into_iter().take(MOST_COLLECTED_TOP) {
        lines.push(format!(
            "  {} | collects {} | reads {}",
            item.title,
            fmt_count(item.collect_count),
            fmt_count(item.read_count),
        ));
    }
    lines.push(String::new());
}

fn change_section(
    lines: &mut Vec<String>,
    name: &str,
    result: &AnalysisResult,
    trend: Option<&TrendResult>,
) {
    let totals = &result.totals;
    lines.push(format!("## {name}"));
    lines.push(format!(
        "Surges {} | Drops {} | New {} | Dropped out {}",
        totals.rank_surges, totals.rank_drops, totals.new_entries, totals.dropped_entries
    ));
    lines.push(String::new());

    if !result.rank_surges.is_empty() {
        lines.push("Rank surges".to_string());
        for change in &result.rank_surges {
            lines.push(format!(
                "  +{} {}{} #{} -> #{}",
                change.rank_delta,
                change.title,
                genre_tag(&change.genres),
                change.previous_rank,
                change.current_rank,
            ));
        }
        lines.push(String::new());
    }

    if !result.read_count_surges.is_empty() {
        lines.push("Read-count surges".to_string());
        for surge in result.read_count_surges.iter().take(SECTION_ITEMS) {
            lines.push(format!(
                "  {} {} ({} -> {})",
                surge.title,
                surge.growth,
                fmt_count(surge.previous_value),
                fmt_count(surge.current_value),
            ));
        }
        lines.push(String::new());
    }

    if !result.new_entries.is_empty() {
        lines.push("New entries".to_string());
        for entry in result.new_entries.iter().take(SECTION_ITEMS) {
            lines.push(format!(
                "  #{} {}{} | reads {}",
                entry.current_rank,
                entry.title,
                genre_tag(&entry.genres),
                fmt_count(entry.read_count),
            ));
        }
        let shown = result.new_entries.len().min(SECTION_ITEMS);
        let remaining = totals.new_entries.saturating_sub(shown);
        if remaining > 0 {
            lines.push(format!("  ...and {remaining} more"));
        }
        lines.push(String::new());
    }

    if !result.rank_drops.is_empty() {
        lines.push("Rank drops".to_string());
        for change in result.rank_drops.iter().take(SECTION_ITEMS) {
            lines.push(format!(
                "  {} {} #{} -> #{}",
                change.rank_delta, change.title, change.previous_rank, change.current_rank,
            ));
        }
        lines.push(String::new());
    }

    if let Some(trend) = trend.filter(|t| !t.genres.is_empty()) {
        lines.push("Genre trends".to_string());
        for genre in trend.rising().take(RISING_GENRES) {
            lines.push(format!(
                "  rising {} +{} ({} -> {})",
                genre.genre, genre.delta, genre.count_start, genre.count_end
            ));
        }
        for genre in trend.falling().take(FALLING_GENRES) {
            lines.push(format!(
                "  falling {} {} ({} -> {})",
                genre.genre, genre.delta, genre.count_start, genre.count_end
            ));
        }
        lines.push(String::new());
    }

    if result.is_stable() {
        lines.push("Board is stable this round, no significant movement.".to_string());
        lines.push(String::new());
    }
}

/// First two genres as ` [A, B]`, or nothing.
fn genre_tag(genres: &BTreeSet<String>) -> String {
    if genres.is_empty() {
        return String::new();
    }
    let shown: Vec<&str> = genres.iter().take(2).map(String::as_str).collect();
    format!(" [{}]", shown.join(", "))
}

#[allow(clippy::cast_precision_loss)]
fn fmt_count(n: u64) -> String {
    if n >= 1_000_000 {
        format!("{:.1}M", n as f64 / 1_000_000.0)
    } else if n >= 1_000 {
        format!("{:.1}K", n as f64 / 1_000.0)
    } else {
        n.to_string()
    }
}

#[cfg(test)]
#[path = "report_test.rs"]
mod tests;
