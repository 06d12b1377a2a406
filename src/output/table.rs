use comfy_table::presets::UTF8_FULL;
use comfy_table::{Cell, Color, ContentArrangement, Row, Table};

use crate::index::DateIndex;
use crate::reconcile::{StalenessReport, StalenessStatus};

pub fn render_report_table(report: &StalenessReport) -> String {
    let mut table = Table::new();
    table
        .load_preset(UTF8_FULL)
        .set_content_arrangement(ContentArrangement::Dynamic);
    table.set_header(vec![
        "Technique",
        "Status",
        "Remote Commit",
        "Local Test",
        "Source File",
    ]);

    for entry in &report.entries {
        let (label, color) = match entry.status {
            StalenessStatus::Dated => ("DATED", Color::Green),
            StalenessStatus::NotFoundRemotely => ("NOT FOUND", Color::Red),
        };
        table.add_row(Row::from(vec![
            Cell::new(entry.technique.to_string()),
            Cell::new(label).fg(color),
            Cell::new(
                entry
                    .remote_timestamp
                    .map(|t| t.to_rfc3339())
                    .unwrap_or_else(|| "-".to_string()),
            ),
            Cell::new(entry.test_id.clone()),
            Cell::new(entry.source_file.clone()),
        ]));
    }
    table.to_string()
}

pub fn render_index_table(index: &DateIndex) -> String {
    let mut table = Table::new();
    table
        .load_preset(UTF8_FULL)
        .set_content_arrangement(ContentArrangement::Dynamic);
    table.set_header(vec!["Technique", "Last Commit"]);
    for (technique, timestamp) in index.iter() {
        table.add_row(vec![technique.to_string(), timestamp.to_rfc3339()]);
    }
    table.to_string()
}
