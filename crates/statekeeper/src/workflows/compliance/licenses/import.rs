use std::fmt;
use std::io::Read;

use chrono::NaiveDate;
use serde::{Deserialize, Deserializer};

use crate::workflows::compliance::domain::{License, LicenseStatus};
use crate::workflows::compliance::registry::generate_id;
use crate::workflows::errors::EngineError;

#[derive(Debug)]
pub enum LicenseImportError {
    Io(std::io::Error),
    Csv(csv::Error),
    InvalidDate { row: usize, value: String },
    InvalidStatus { row: usize, value: String },
    Invalid { row: usize, source: EngineError },
}

impl fmt::Display for LicenseImportError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LicenseImportError::Io(err) => write!(f, "failed to read license roster: {}", err),
            LicenseImportError::Csv(err) => write!(f, "invalid license CSV data: {}", err),
            LicenseImportError::InvalidDate { row, value } => {
                write!(f, "row {}: '{}' is not a YYYY-MM-DD or MM/DD/YYYY date", row, value)
            }
            LicenseImportError::InvalidStatus { row, value } => {
                write!(f, "row {}: unknown license status '{}'", row, value)
            }
            LicenseImportError::Invalid { row, source } => write!(f, "row {}: {}", row, source),
        }
    }
}

impl std::error::Error for LicenseImportError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            LicenseImportError::Io(err) => Some(err),
            LicenseImportError::Csv(err) => Some(err),
            LicenseImportError::Invalid { source, .. } => Some(source),
            _ => None,
        }
    }
}

impl From<std::io::Error> for LicenseImportError {
    fn from(err: std::io::Error) -> Self {
        Self::Io(err)
    }
}

impl From<csv::Error> for LicenseImportError {
    fn from(err: csv::Error) -> Self {
        Self::Csv(err)
    }
}

#[derive(Debug, Deserialize)]
struct LicenseRow {
    #[serde(rename = "License Number")]
    license_number: String,
    #[serde(rename = "License Type")]
    license_type: String,
    #[serde(rename = "State")]
    state: String,
    #[serde(rename = "Issuance Date")]
    issuance_date: String,
    #[serde(rename = "Expiration Date")]
    expiration_date: String,
    #[serde(rename = "Status", default, deserialize_with = "empty_string_as_none")]
    status: Option<String>,
}

/// Parse a license roster export. Row numbers in errors are 1-based and
/// count the header line.
pub fn parse_licenses<R: Read>(reader: R) -> Result<Vec<License>, LicenseImportError> {
    let mut csv_reader = csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .from_reader(reader);
    let mut licenses = Vec::new();

    for (index, record) in csv_reader.deserialize::<LicenseRow>().enumerate() {
        let row_number = index + 2;
        let row = record?;

        let license = License {
            id: generate_id(),
            license_number: row.license_number,
            license_type: row.license_type,
            state: row.state.to_ascii_uppercase(),
            issuance_date: parse_date(row_number, &row.issuance_date)?,
            expiration_date: parse_date(row_number, &row.expiration_date)?,
            status: parse_status(row_number, row.status.as_deref())?,
        };
        license
            .validate()
            .map_err(|source| LicenseImportError::Invalid {
                row: row_number,
                source,
            })?;
        licenses.push(license);
    }

    Ok(licenses)
}

fn parse_date(row: usize, raw: &str) -> Result<NaiveDate, LicenseImportError> {
    let trimmed = raw.trim();
    NaiveDate::parse_from_str(trimmed, "%Y-%m-%d")
        .or_else(|_| NaiveDate::parse_from_str(trimmed, "%m/%d/%Y"))
        .map_err(|_| LicenseImportError::InvalidDate {
            row,
            value: raw.to_string(),
        })
}

fn parse_status(row: usize, raw: Option<&str>) -> Result<LicenseStatus, LicenseImportError> {
    let Some(raw) = raw else {
        return Ok(LicenseStatus::Active);
    };
    match raw.trim().to_ascii_lowercase().as_str() {
        "active" => Ok(LicenseStatus::Active),
        "inactive" => Ok(LicenseStatus::Inactive),
        "pending" => Ok(LicenseStatus::Pending),
        "expired" => Ok(LicenseStatus::Expired),
        _ => Err(LicenseImportError::InvalidStatus {
            row,
            value: raw.to_string(),
        }),
    }
}

fn empty_string_as_none<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let opt = Option::<String>::deserialize(deserializer)?;
    Ok(opt.and_then(|value| {
        let trimmed = value.trim();
        if trimmed.is_empty() {
            None
        } else {
            Some(trimmed.to_string())
        }
    }))
}

#[cfg(test)]
mod tests {
    use super::*;

    const ROSTER: &str = "License Number,License Type,State,Issuance Date,Expiration Date,Status\n\
RN-123,RN,tx,2023-05-01,2025-05-01,\n\
LPC-9,LPC,CA,01/15/2022,01/15/2026,inactive\n";

    #[test]
    fn parses_roster_rows() {
        let licenses = parse_licenses(ROSTER.as_bytes()).expect("roster parses");
        assert_eq!(licenses.len(), 2);

        let rn = &licenses[0];
        assert_eq!(rn.license_number, "RN-123");
        assert_eq!(rn.state, "TX");
        assert_eq!(rn.status, LicenseStatus::Active);
        assert_eq!(
            rn.expiration_date,
            NaiveDate::from_ymd_opt(2025, 5, 1).expect("valid date")
        );

        let lpc = &licenses[1];
        assert_eq!(lpc.status, LicenseStatus::Inactive);
        assert_eq!(
            lpc.issuance_date,
            NaiveDate::from_ymd_opt(2022, 1, 15).expect("valid date")
        );
        assert_ne!(rn.id, lpc.id);
    }

    #[test]
    fn reports_row_of_bad_date() {
        let csv = "License Number,License Type,State,Issuance Date,Expiration Date,Status\n\
A1,RN,TX,2023-05-01,next spring,active\n";
        match parse_licenses(csv.as_bytes()) {
            Err(LicenseImportError::InvalidDate { row, value }) => {
                assert_eq!(row, 2);
                assert_eq!(value, "next spring");
            }
            other => panic!("expected invalid date, got {other:?}"),
        }
    }

    #[test]
    fn rejects_license_expiring_before_issuance() {
        let csv = "License Number,License Type,State,Issuance Date,Expiration Date,Status\n\
A1,RN,TX,2025-05-01,2024-05-01,\n";
        assert!(matches!(
            parse_licenses(csv.as_bytes()),
            Err(LicenseImportError::Invalid { row: 2, .. })
        ));
    }
}
