//! Aggregated cost report and its HTML table fragments.

use std::collections::BTreeMap;
use std::fmt::Write;

use chrono::{DateTime, Utc};
use quill_domain::constants::COST_WINDOW_DAYS;
use quill_domain::CostWindow;

use crate::telemetry::render::escape_into;

/// Windows shown as table columns, in column order.
pub const COST_WINDOWS: [CostWindow; 3] = [
    CostWindow::days(COST_WINDOW_DAYS[0]),
    CostWindow::days(COST_WINDOW_DAYS[1]),
    CostWindow::days(COST_WINDOW_DAYS[2]),
];

const TABLE_HEAD: &str =
    "<thead><tr><th>Service</th><th>7d</th><th>30d</th><th>90d</th></tr></thead>";
const EMPTY_CELL_STYLE: &str = "text-align: center; padding: 20px;";

/// Service totals per window.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CostReport {
    services: BTreeMap<String, BTreeMap<CostWindow, f64>>,
}

impl CostReport {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add `amount` to the running total of `service` within `window`.
    pub fn add(&mut self, window: CostWindow, service: &str, amount: f64) {
        *self.services.entry(service.to_owned()).or_default().entry(window).or_insert(0.0) +=
            amount;
    }

    pub fn amount(&self, service: &str, window: CostWindow) -> Option<f64> {
        self.services.get(service)?.get(&window).copied()
    }

    /// Service names in ascending order.
    pub fn services(&self) -> impl Iterator<Item = &str> {
        self.services.keys().map(String::as_str)
    }

    pub fn is_empty(&self) -> bool {
        self.services.is_empty()
    }

    /// Render the full table fragment, services sorted by name.
    ///
    /// A window with no amount for a service renders an empty cell.
    pub fn render_table(&self, updated_at: DateTime<Utc>) -> String {
        let mut out = String::with_capacity(256 + self.services.len() * 128);
        out.push_str(TABLE_HEAD);
        out.push_str("<tbody>");

        if self.services.is_empty() {
            let _ = write!(
                out,
                r#"<tr><td colspan="4" style="{EMPTY_CELL_STYLE}">No cost data available</td></tr>"#
            );
        }
        for (service, windows) in &self.services {
            out.push_str("<tr><td>");
            escape_into(&mut out, service);
            out.push_str("</td>");
            for window in COST_WINDOWS {
                out.push_str("<td>");
                if let Some(amount) = windows.get(&window) {
                    out.push_str(&format_amount(*amount));
                }
                out.push_str("</td>");
            }
            out.push_str("</tr>");
        }

        out.push_str("</tbody>");
        push_footer(&mut out, &format_timestamp(updated_at));
        out
    }
}

/// Static fragment shown when cost tracking is turned off.
pub fn disabled_fragment() -> String {
    status_fragment("#76ff03", "Cost tracking disabled", "N/A")
}

/// Fragment shown when the very first fetch fails.
pub fn failure_fragment(at: DateTime<Utc>) -> String {
    status_fragment(
        "#ff0000",
        "Failed to fetch cost data. Check logs for details.",
        &format_timestamp(at),
    )
}

/// `$` followed by the amount with two decimals.
pub fn format_amount(amount: f64) -> String {
    format!("${amount:.2}")
}

pub fn format_timestamp(at: DateTime<Utc>) -> String {
    at.format("%Y-%m-%d %H:%M:%S UTC").to_string()
}

fn status_fragment(color: &str, message: &str, updated: &str) -> String {
    let mut out = String::with_capacity(384);
    out.push_str(TABLE_HEAD);
    let _ = write!(
        out,
        r#"<tbody><tr><td colspan="4" style="{EMPTY_CELL_STYLE} color: {color};">{message}</td></tr></tbody>"#
    );
    push_footer(&mut out, updated);
    out
}

fn push_footer(out: &mut String, updated: &str) {
    let _ = write!(
        out,
        r#"<tfoot><tr><td colspan="4" class="cost-updated">Last updated: {updated}</td></tr></tfoot>"#
    );
}

#[cfg(test)]
mod tests {
    use chrono::TimeZone;

    use super::*;

    fn at() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 3, 14, 9, 26, 53).single().expect("valid timestamp")
    }

    #[test]
    fn amounts_accumulate_per_window() {
        let mut report = CostReport::new();
        let week = COST_WINDOWS[0];
        report.add(week, "Amazon Lightsail", 1.25);
        report.add(week, "Amazon Lightsail", 2.5);

        assert_eq!(report.amount("Amazon Lightsail", week), Some(3.75));
        assert_eq!(report.amount("Amazon Lightsail", COST_WINDOWS[1]), None);
    }

    #[test]
    fn renders_sorted_rows_with_blank_missing_windows() {
        let mut report = CostReport::new();
        report.add(COST_WINDOWS[0], "AmazonCloudWatch", 0.004);
        report.add(COST_WINDOWS[2], "AmazonCloudWatch", 1.0);
        report.add(COST_WINDOWS[0], "Amazon Lightsail", 3.5);
        report.add(COST_WINDOWS[1], "Amazon Lightsail", 14.0);
        report.add(COST_WINDOWS[2], "Amazon Lightsail", 42.129);

        insta::assert_snapshot!(report.render_table(at()), @r#"<thead><tr><th>Service</th><th>7d</th><th>30d</th><th>90d</th></tr></thead><tbody><tr><td>Amazon Lightsail</td><td>$3.50</td><td>$14.00</td><td>$42.13</td></tr><tr><td>AmazonCloudWatch</td><td>$0.00</td><td></td><td>$1.00</td></tr></tbody><tfoot><tr><td colspan="4" class="cost-updated">Last updated: 2026-03-14 09:26:53 UTC</td></tr></tfoot>"#);
    }

    #[test]
    fn empty_report_renders_placeholder_row() {
        let html = CostReport::new().render_table(at());
        assert!(html.contains(
            r#"<td colspan="4" style="text-align: center; padding: 20px;">No cost data available</td>"#
        ));
        assert!(html.ends_with("Last updated: 2026-03-14 09:26:53 UTC</td></tr></tfoot>"));
    }

    #[test]
    fn status_fragments() {
        assert_eq!(
            disabled_fragment(),
            "<thead><tr><th>Service</th><th>7d</th><th>30d</th><th>90d</th></tr></thead>\
             <tbody><tr><td colspan=\"4\" style=\"text-align: center; padding: 20px; \
             color: #76ff03;\">Cost tracking disabled</td></tr></tbody>\
             <tfoot><tr><td colspan=\"4\" class=\"cost-updated\">Last updated: N/A</td></tr></tfoot>"
        );
        let failed = failure_fragment(at());
        assert!(failed
            .contains("color: #ff0000;\">Failed to fetch cost data. Check logs for details."));
        assert!(failed.contains("Last updated: 2026-03-14 09:26:53 UTC"));
    }

    #[test]
    fn service_names_are_escaped() {
        let mut report = CostReport::new();
        report.add(COST_WINDOWS[0], "<script>", 1.0);
        assert!(report.render_table(at()).contains("<td>&lt;script&gt;</td>"));
    }
}
