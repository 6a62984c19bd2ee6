//! Terminal rendering of notifications, sessions and model results.

use std::fmt::Write as _;
use trafficops_core::analysis::{ActiveAlgorithm, ModelRunReport, Navigator, ResultsRoute};
use trafficops_core::notification::{Notification, NotificationLevel};
use trafficops_core::session::{ActiveSessionInfo, UploadSession};

/// Hub listener that prints each notification on its own line.
pub fn print_notification(notification: &Notification) {
    let line = format_notification(notification);
    match notification.level {
        NotificationLevel::Error => eprintln!("{}", line),
        _ => println!("{}", line),
    }
}

fn format_notification(notification: &Notification) -> String {
    let icon = match notification.level {
        NotificationLevel::Info => "ℹ️ ",
        NotificationLevel::Success => "✅",
        NotificationLevel::Warning => "⚠️ ",
        NotificationLevel::Error => "❌",
    };
    format!("{} {}", icon, notification.message)
}

/// Stands in for the results page: prints the route and the ranking table.
pub struct ConsoleNavigator;

impl Navigator for ConsoleNavigator {
    fn navigate(&self, route: &ResultsRoute, report: &ModelRunReport) {
        print!("{}", format_report(route, report));
    }
}

pub fn format_report(route: &ResultsRoute, report: &ModelRunReport) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "\n📋 Results: {}", route.to_path());
    let _ = writeln!(
        out,
        "Top {} bottlenecks ({}, {} min horizon){}",
        report.bottlenecks.len(),
        route.model_type,
        route.time_horizon,
        if report.cached { " [cached]" } else { "" }
    );
    if report.bottlenecks.is_empty() {
        return out;
    }

    let _ = writeln!(
        out,
        "{:>4}  {:<32}  {:>10}  {:>8}  {}",
        "#", "Road", "Benefit", "Affected", "Location"
    );
    for b in &report.bottlenecks {
        let road = match (&b.road_name, &b.road_id) {
            (Some(name), Some(id)) => format!("{} ({})", name, id),
            (Some(name), None) => name.clone(),
            (None, Some(id)) => id.clone(),
            (None, None) => "-".to_string(),
        };
        let benefit = b
            .benefit_score
            .map(|score| format!("{:.4}", score))
            .unwrap_or_else(|| "-".to_string());
        let affected = b
            .affected_roads_count
            .map(|count| count.to_string())
            .unwrap_or_else(|| "-".to_string());
        let location = match (b.lat, b.lon) {
            (Some(lat), Some(lon)) => format!("{:.5}, {:.5}", lat, lon),
            _ => "-".to_string(),
        };
        let _ = writeln!(
            out,
            "{:>4}  {:<32}  {:>10}  {:>8}  {}",
            b.rank, road, benefit, affected, location
        );
    }
    out
}

pub fn format_session(session: &UploadSession) -> String {
    let mut out = String::new();
    let _ = writeln!(
        out,
        "Session {}: {}",
        session
            .id()
            .map(|id| id.to_string())
            .unwrap_or_else(|| "-".to_string()),
        session.status()
    );
    if let Some(stats) = session.stats() {
        let _ = write!(
            out,
            "  {} roads, {} GPS points",
            stats.road_count, stats.gps_point_count
        );
        if let Some(secs) = stats.processing_seconds {
            let _ = write!(out, ", preprocessed in {:.2}s", secs);
        }
        out.push('\n');
    }
    if let Some(error) = session.error_message() {
        let _ = writeln!(out, "  Error: {}", error);
    }
    out
}

pub fn format_active_session(info: &ActiveSessionInfo) -> String {
    format!(
        "Active session {}: {}{}\n  {} roads, {} GPS points\n",
        info.session_id,
        info.status,
        if info.is_preinserted { " (sample data)" } else { "" },
        info.road_count,
        info.gps_count
    )
}

/// One line per algorithm, `*` marking the selection runs will use.
pub fn format_algorithms(algorithms: &[ActiveAlgorithm], selected: Option<&str>) -> String {
    let mut out = String::new();
    for algorithm in algorithms {
        let Some(key) = algorithm.key() else {
            continue;
        };
        let marker = if Some(key) == selected { "*" } else { " " };
        let _ = write!(out, "{} {:<8} {}", marker, key, algorithm.label());
        if let Some(description) = algorithm.description.as_deref().filter(|d| !d.is_empty()) {
            let _ = write!(out, " - {}", description);
        }
        out.push('\n');
    }
    out
}
