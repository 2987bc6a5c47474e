//! Left join of two harvested CSV files on the race key columns.
//!
//! Works on raw records, so any pair of race-level outputs can be combined
//! (e.g. results with lap weather, pit stops with race weather). Every left
//! row is kept; a left row with several right matches is repeated once per
//! match, and a left row without one gets empty right columns.

use std::collections::HashMap;
use std::fs;
use std::path::Path;

use crate::errors::AppError;
use crate::store::models::RACE_KEY_COLUMNS;

/// Appended to a right-hand column whose name already exists on the left.
const RIGHT_SUFFIX: &str = "_right";

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct JoinSummary {
    pub left_rows: usize,
    pub written: usize,
    /// Left rows without any right match.
    pub unmatched: usize,
}

type RaceKeyValues = Vec<String>;

pub fn left_join(left: &Path, right: &Path, output: &Path) -> Result<JoinSummary, AppError> {
    let mut right_reader = csv::Reader::from_path(right)?;
    let right_headers = right_reader.headers()?.clone();
    let right_keys = key_indices(&right_headers, right)?;
    let right_extra: Vec<usize> = (0..right_headers.len())
        .filter(|i| !right_keys.contains(i))
        .collect();

    let mut by_key: HashMap<RaceKeyValues, Vec<csv::StringRecord>> = HashMap::new();
    for record in right_reader.records() {
        let record = record?;
        by_key
            .entry(key_values(&record, &right_keys))
            .or_default()
            .push(record);
    }

    let mut left_reader = csv::Reader::from_path(left)?;
    let left_headers = left_reader.headers()?.clone();
    let left_keys = key_indices(&left_headers, left)?;

    if let Some(parent) = output.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent)?;
        }
    }
    let mut writer = csv::Writer::from_path(output)?;

    let mut header = left_headers.clone();
    for &i in &right_extra {
        let name = &right_headers[i];
        if left_headers.iter().any(|h| h == name) {
            header.push_field(&format!("{}{}", name, RIGHT_SUFFIX));
        } else {
            header.push_field(name);
        }
    }
    writer.write_record(&header)?;

    let empty_right = vec![""; right_extra.len()];
    let mut summary = JoinSummary::default();

    for record in left_reader.records() {
        let record = record?;
        summary.left_rows += 1;

        match by_key.get(&key_values(&record, &left_keys)) {
            Some(matches) => {
                for m in matches {
                    let mut row = record.clone();
                    for &i in &right_extra {
                        row.push_field(m.get(i).unwrap_or(""));
                    }
                    writer.write_record(&row)?;
                    summary.written += 1;
                }
            }
            None => {
                let mut row = record.clone();
                row.extend(empty_right.iter().copied());
                writer.write_record(&row)?;
                summary.written += 1;
                summary.unmatched += 1;
            }
        }
    }
    writer.flush()?;

    tracing::info!(
        "join: {} left row(s) → {} row(s) in {} ({} without a match)",
        summary.left_rows,
        summary.written,
        output.display(),
        summary.unmatched
    );
    Ok(summary)
}

/// Positions of the race key columns, in `RACE_KEY_COLUMNS` order.
fn key_indices(headers: &csv::StringRecord, path: &Path) -> Result<Vec<usize>, AppError> {
    RACE_KEY_COLUMNS
        .iter()
        .map(|column| {
            headers
                .iter()
                .position(|h| h.trim() == *column)
                .ok_or_else(|| {
                    AppError::BadRequest(format!(
                        "{} has no '{}' column",
                        path.display(),
                        column
                    ))
                })
        })
        .collect()
}

fn key_values(record: &csv::StringRecord, indices: &[usize]) -> RaceKeyValues {
    indices
        .iter()
        .map(|&i| record.get(i).unwrap_or("").trim().to_string())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    fn tmp_dir(name: &str) -> PathBuf {
        let mut p = std::env::temp_dir();
        p.push(format!("pitlane_join_{}_{}", std::process::id(), name));
        let _ = fs::remove_dir_all(&p);
        fs::create_dir_all(&p).unwrap();
        p
    }

    const RESULTS: &str = "\
Season,Round,Circuit,Date,Time (UTC),Race Name,Driver Id
2023,1,Bahrain International Circuit,2023-03-05,15:00:00Z,Bahrain Grand Prix,max_verstappen
2023,1,Bahrain International Circuit,2023-03-05,15:00:00Z,Bahrain Grand Prix,perez
2023,2,Jeddah Corniche Circuit,2023-03-19,17:00:00Z,Saudi Arabian Grand Prix,perez
";

    const LAP_WEATHER: &str = "\
Season,Round,Circuit,Date,Time (UTC),Lap,Air Temperature (°C)
2023,1,Bahrain International Circuit,2023-03-05,15:00:00Z,1,20.0
2023,1,Bahrain International Circuit,2023-03-05,15:00:00Z,2,20.5
2023,1,Bahrain International Circuit,2023-03-05,15:00:00Z,3,21.0
";

    #[test]
    fn test_fan_out_and_unmatched_rows() {
        let dir = tmp_dir("fan_out");
        let (left, right, out) = (dir.join("l.csv"), dir.join("r.csv"), dir.join("o.csv"));
        fs::write(&left, RESULTS).unwrap();
        fs::write(&right, LAP_WEATHER).unwrap();

        let summary = left_join(&left, &right, &out).unwrap();
        assert_eq!(
            summary,
            JoinSummary {
                left_rows: 3,
                written: 7,
                unmatched: 1
            }
        );

        let text = fs::read_to_string(&out).unwrap();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(
            lines[0],
            "Season,Round,Circuit,Date,Time (UTC),Race Name,Driver Id,Lap,Air Temperature (°C)"
        );
        assert!(lines[1].ends_with("max_verstappen,1,20.0"));
        assert!(lines[4].ends_with("perez,1,20.0"));
        assert_eq!(
            lines[7],
            "2023,2,Jeddah Corniche Circuit,2023-03-19,17:00:00Z,Saudi Arabian Grand Prix,perez,,"
        );
    }

    #[test]
    fn test_clashing_column_names_are_suffixed() {
        let dir = tmp_dir("suffix");
        let (left, right, out) = (dir.join("l.csv"), dir.join("r.csv"), dir.join("o.csv"));
        fs::write(
            &left,
            "Season,Round,Circuit,Date,Time (UTC),Laps\n2023,1,Sakhir,2023-03-05,Unknown,57\n",
        )
        .unwrap();
        fs::write(
            &right,
            "Season,Round,Circuit,Date,Time (UTC),Laps\n2023,1,Sakhir,2023-03-05,Unknown,56\n",
        )
        .unwrap();

        left_join(&left, &right, &out).unwrap();
        let text = fs::read_to_string(&out).unwrap();
        assert!(text.starts_with("Season,Round,Circuit,Date,Time (UTC),Laps,Laps_right\n"));
        assert!(text.contains("Unknown,57,56"));
    }

    #[test]
    fn test_missing_key_column_is_rejected() {
        let dir = tmp_dir("no_key");
        let (left, right, out) = (dir.join("l.csv"), dir.join("r.csv"), dir.join("o.csv"));
        fs::write(&left, RESULTS).unwrap();
        fs::write(&right, "Season,Round,Lap\n2023,1,1\n").unwrap();

        let err = left_join(&left, &right, &out).unwrap_err();
        assert!(matches!(err, AppError::BadRequest(_)));
        assert!(err.to_string().contains("Circuit"));
    }
}
