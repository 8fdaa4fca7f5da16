//! Plain-text views over the client snapshot.

use std::fmt::Write as _;

use audit_client::{ClientSnapshot, Freshness, TrendSummary};
use shared::domain::{AuditResult, HistoryEntry, TrendPoint, MAX_SCORE};

const TREND_BAR_WIDTH: usize = 20;
const TITLE_WIDTH: usize = 32;

pub fn render_result(result: &AuditResult) -> String {
    let mut out = String::new();
    let _ = writeln!(
        out,
        "quality score: {:.1}/10   flags: {}{}",
        result.score,
        result.mistake_count,
        result
            .status
            .as_deref()
            .map(|status| format!("   status: {status}"))
            .unwrap_or_default()
    );
    if let Some(title) = &result.title {
        let _ = writeln!(out, "manuscript:    {title}");
    }
    let _ = writeln!(out, "methodology:   {}", result.method_text);
    let _ = writeln!(out, "statistics:    {}", result.stat_text);
    for category in &result.breakdown {
        let _ = writeln!(out, "  {:<12} {:.1}", category.name, category.score);
    }
    let _ = writeln!(out, "annotated pdf: {}", result.pdf_url);
    let _ = writeln!(out, "\n{}", result.ai_report.trim());
    out
}

pub fn render_history(entries: &[HistoryEntry], freshness: Freshness) -> String {
    let mut out = String::new();
    if freshness == Freshness::Stale {
        let _ = writeln!(out, "(history could not be refreshed; showing last known list)");
    }
    if entries.is_empty() {
        let _ = writeln!(out, "no audits recorded yet");
        return out;
    }

    let _ = writeln!(
        out,
        "{:<12} {:<width$} {:>7}  REPORT",
        "DATE",
        "MANUSCRIPT TITLE",
        "SCORE",
        width = TITLE_WIDTH
    );
    for entry in entries {
        let _ = writeln!(
            out,
            "{:<12} {:<width$} {:>7}  {}",
            entry.date,
            truncate(&entry.title, TITLE_WIDTH),
            format!("{:.1}/10", entry.score),
            entry.pdf_url.as_deref().unwrap_or("-"),
            width = TITLE_WIDTH
        );
    }
    out
}

pub fn render_trend(points: &[TrendPoint], summary: Option<&TrendSummary>) -> String {
    let mut out = String::new();
    let Some(summary) = summary else {
        let _ = writeln!(out, "no scores to chart yet");
        return out;
    };

    for point in points {
        let _ = writeln!(
            out,
            "{:<12} {:<bar$} {:.1}",
            point.date,
            bar(point.score),
            point.score,
            bar = TREND_BAR_WIDTH
        );
    }
    let _ = writeln!(
        out,
        "\n{} audits   mean {:.2}   min {:.1}   max {:.1}",
        summary.count, summary.mean, summary.min, summary.max
    );
    out
}

pub fn render_status(snapshot: &ClientSnapshot) -> String {
    let mut out = String::new();
    match &snapshot.session.display_name {
        Some(name) if snapshot.session.authenticated => {
            let _ = writeln!(out, "signed in as {name}");
        }
        _ => {
            let _ = writeln!(out, "signed out");
            return out;
        }
    }
    let _ = writeln!(
        out,
        "submission: {}{}",
        snapshot.phase.label(),
        snapshot
            .selected_file
            .as_deref()
            .map(|file| format!(" ({file})"))
            .unwrap_or_default()
    );
    let freshness = match snapshot.history_freshness {
        Freshness::NeverLoaded => "not loaded",
        Freshness::Fresh => "fresh",
        Freshness::Stale => "stale",
    };
    let _ = writeln!(
        out,
        "history: {} entries ({freshness}){}",
        snapshot.history.len(),
        snapshot
            .history_refreshed_at
            .map(|at| format!(", last refreshed {}", at.format("%Y-%m-%d %H:%M:%S UTC")))
            .unwrap_or_default()
    );
    out
}

fn bar(score: f64) -> String {
    let filled = ((score / MAX_SCORE) * TREND_BAR_WIDTH as f64).round() as usize;
    "#".repeat(filled.min(TREND_BAR_WIDTH))
}

fn truncate(text: &str, width: usize) -> String {
    if text.chars().count() <= width {
        return text.to_string();
    }
    let mut cut: String = text.chars().take(width.saturating_sub(3)).collect();
    cut.push_str("...");
    cut
}
