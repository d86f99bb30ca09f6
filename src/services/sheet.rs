//! Ceremony spreadsheets exported as CSV.
//!
//! Layout: the first cell holds `"DD/MM/YYYY - UNIT; UNIT"`, the second line
//! holds headers, and every following line is `unit, course, graduates, ...`.

use chrono::NaiveDate;
use reqwest::Client;
use serde::Serialize;
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, warn};

use crate::config::SheetConfig;

const DATE_FORMAT: &str = "%d/%m/%Y";
const DEFAULT_UNITS: &str = "Ceremony";

#[derive(Debug, Error)]
pub enum SheetError {
    #[error("sheet does not contain enough data")]
    NotEnoughData,

    #[error("sheet download failed: {0}")]
    Fetch(#[from] reqwest::Error),

    #[error("sheet download returned HTTP {0}")]
    Status(u16),

    #[error("malformed CSV: {0}")]
    Csv(#[from] csv::Error),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SheetCourse {
    pub name: String,
    pub graduates: u32,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SheetData {
    pub ceremony_name: String,
    pub date: Option<NaiveDate>,
    pub courses: Vec<SheetCourse>,
}

#[derive(Clone)]
pub struct SheetImporter {
    client: Client,
}

impl SheetImporter {
    pub fn new(config: &SheetConfig) -> Result<Self, SheetError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_seconds))
            .build()?;
        Ok(Self { client })
    }

    pub async fn fetch(&self, url: &str) -> Result<SheetData, SheetError> {
        debug!("Downloading sheet from {}", url);
        let response = self.client.get(url).send().await?;
        let status = response.status();
        if !status.is_success() {
            warn!("Sheet download from {} returned {}", url, status);
            return Err(SheetError::Status(status.as_u16()));
        }
        let text = response.text().await?;
        parse_sheet(&text)
    }
}

pub fn parse_sheet(text: &str) -> Result<SheetData, SheetError> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .from_reader(text.as_bytes());
    let records = reader
        .records()
        .collect::<Result<Vec<csv::StringRecord>, _>>()?;

    if records.len() < 3 {
        return Err(SheetError::NotEnoughData);
    }

    let title = records[0].get(0).unwrap_or_default();
    let (ceremony_name, date) = parse_title(title);
    let courses = records[2..].iter().filter_map(parse_course).collect();

    Ok(SheetData {
        ceremony_name,
        date,
        courses,
    })
}

fn parse_title(title: &str) -> (String, Option<NaiveDate>) {
    let title = title.trim_start_matches('\u{feff}').trim();
    let (date_part, units) = match title.split_once(" - ") {
        Some((date, units)) => (date.trim(), units.trim()),
        None => (title, ""),
    };
    let units = if units.is_empty() { DEFAULT_UNITS } else { units };
    let date = NaiveDate::parse_from_str(date_part, DATE_FORMAT).ok();
    (format!("Graduation {units}"), date)
}

fn parse_course(record: &csv::StringRecord) -> Option<SheetCourse> {
    if record.len() < 3 {
        return None;
    }
    let name = record.get(1)?.trim().to_uppercase();
    if name.is_empty() || name.starts_with("TOTAL") {
        return None;
    }
    let graduates: u32 = record.get(2)?.trim().parse().ok()?;
    (graduates > 0).then_some(SheetCourse { name, graduates })
}

#[cfg(test)]
mod tests {
    use super::*;

    const SHEET: &str = "\
26/08/2025 - FAMED; FFOE,,,
Unit,Course,Graduates,Present
FAMED,Medicine,40,38
FFOE, nursing ,12,12
FFOE,Pharmacy,0,0
ICA,Design,n/a,
ICA,,7,
TOTAL,Total FFOE,52,50
short,row
";

    #[test]
    fn parses_title_and_courses() {
        let data = parse_sheet(SHEET).unwrap();
        assert_eq!(data.ceremony_name, "Graduation FAMED; FFOE");
        assert_eq!(data.date, NaiveDate::from_ymd_opt(2025, 8, 26));
        assert_eq!(
            data.courses,
            vec![
                SheetCourse { name: "MEDICINE".into(), graduates: 40 },
                SheetCourse { name: "NURSING".into(), graduates: 12 },
            ]
        );
    }

    #[test]
    fn bad_date_keeps_the_name() {
        let data = parse_sheet("31/02/2025 - ICA\nh\nICA,Design,3\n").unwrap();
        assert_eq!(data.ceremony_name, "Graduation ICA");
        assert_eq!(data.date, None);
    }

    #[test]
    fn title_without_units_gets_default_name() {
        let data = parse_sheet("01/12/2025\nh\nICA,Design,3\n").unwrap();
        assert_eq!(data.ceremony_name, "Graduation Ceremony");
        assert_eq!(data.date, NaiveDate::from_ymd_opt(2025, 12, 1));
    }

    #[test]
    fn too_few_lines_is_an_error() {
        assert!(matches!(
            parse_sheet("01/12/2025 - ICA\nheaders\n"),
            Err(SheetError::NotEnoughData)
        ));
        assert!(matches!(parse_sheet(""), Err(SheetError::NotEnoughData)));
    }

    #[test]
    fn negative_counts_are_skipped() {
        let data = parse_sheet("01/12/2025 - ICA\nh\nICA,Design,-3\nICA,Music,2\n").unwrap();
        assert_eq!(data.courses, vec![SheetCourse { name: "MUSIC".into(), graduates: 2 }]);
    }
}
