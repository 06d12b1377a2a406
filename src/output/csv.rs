use anyhow::Result;

use crate::reconcile::{StalenessReport, StalenessStatus};

pub fn report_to_csv(report: &StalenessReport) -> Result<String> {
    let mut writer = csv::Writer::from_writer(vec![]);
    writer.write_record([
        "technique",
        "status",
        "remote_timestamp",
        "test_id",
        "source_file",
    ])?;
    for entry in &report.entries {
        let status = match entry.status {
            StalenessStatus::Dated => "dated",
            StalenessStatus::NotFoundRemotely => "not_found_remotely",
        };
        writer.write_record([
            entry.technique.to_string(),
            status.to_string(),
            entry
                .remote_timestamp
                .map(|t| t.to_rfc3339())
                .unwrap_or_default(),
            entry.test_id.clone(),
            entry.source_file.clone(),
        ])?;
    }
    let data = writer.into_inner()?;
    Ok(String::from_utf8_lossy(&data).to_string())
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;

    use chrono::{TimeZone, Utc};

    use crate::index::DateIndex;
    use crate::localindex::LocalTestSpec;
    use crate::output::csv::report_to_csv;
    use crate::reconcile::reconcile;

    #[test]
    fn renders_one_row_per_entry() {
        let mut index = DateIndex::new();
        let technique = "T1027".parse().unwrap();
        index.insert(
            technique,
            Utc.with_ymd_and_hms(2023, 5, 25, 20, 38, 57).unwrap(),
        );
        let mut local = BTreeMap::new();
        local.insert(
            technique,
            vec![LocalTestSpec {
                technique,
                test_id: "guid-1".to_string(),
                source_file: "windows-index.csv".to_string(),
            }],
        );

        let rendered = report_to_csv(&reconcile(&index, &local)).expect("csv render failed");
        let mut lines = rendered.lines();
        assert_eq!(
            lines.next(),
            Some("technique,status,remote_timestamp,test_id,source_file")
        );
        let row = lines.next().expect("missing data row");
        assert!(row.starts_with("T1027,dated,2023-05-25T20:38:57"));
    }
}
