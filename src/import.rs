//! Import of researcher lists from comma- or semicolon-separated files.

use crate::identifiers::{is_valid_orcid, OrcidId};
use crate::{Error, Result};
use once_cell::sync::Lazy;
use regex::Regex;
use std::path::Path;
use tracing::{debug, info, warn};

/// Name of the required identifier column (matched case-insensitively)
pub const ORCID_COLUMN: &str = "orcid";

/// How many rejected values are quoted in the summary
const REJECTION_SAMPLE: usize = 3;

static FIELD_SEPARATOR: Lazy<Regex> =
    Lazy::new(|| Regex::new("[,;]").expect("valid separator pattern"));

/// Outcome of reading an identifier table
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ImportReport {
    /// Valid identifiers in file order
    pub valid: Vec<OrcidId>,
    /// Raw values of the identifier column that failed validation
    pub rejected: Vec<String>,
}

impl ImportReport {
    /// Short user-facing summary of skipped rows, if any
    #[must_use]
    pub fn rejection_summary(&self) -> Option<String> {
        if self.rejected.is_empty() {
            return None;
        }

        let sample = self
            .rejected
            .iter()
            .take(REJECTION_SAMPLE)
            .map(String::as_str)
            .collect::<Vec<_>>()
            .join(", ");
        let ellipsis = if self.rejected.len() > REJECTION_SAMPLE {
            "..."
        } else {
            ""
        };

        Some(format!(
            "Skipped {} invalid IDs: {sample}{ellipsis}",
            self.rejected.len()
        ))
    }

    /// Valid identifiers, failing when there is nothing to analyze
    pub fn into_batch(self) -> Result<Vec<OrcidId>> {
        if self.valid.is_empty() {
            return Err(Error::invalid_input(
                ORCID_COLUMN,
                "no valid ORCID iDs to analyze",
            ));
        }
        Ok(self.valid)
    }
}

fn split_fields(line: &str) -> Vec<&str> {
    FIELD_SEPARATOR.split(line).collect()
}

/// Parse delimited text whose header contains an `orcid` column
pub fn parse_orcid_table(text: &str) -> Result<ImportReport> {
    let mut lines = text.lines();
    let header = lines.next().ok_or_else(|| Error::MissingColumn {
        column: ORCID_COLUMN.to_string(),
    })?;

    let column = split_fields(header)
        .iter()
        .position(|name| name.trim().eq_ignore_ascii_case(ORCID_COLUMN))
        .ok_or_else(|| Error::MissingColumn {
            column: ORCID_COLUMN.to_string(),
        })?;
    debug!("Identifier column found at index {}", column);

    let mut report = ImportReport::default();
    for line in lines {
        let fields = split_fields(line);
        let Some(value) = fields.get(column).map(|v| v.trim()) else {
            continue;
        };
        if value.is_empty() {
            continue;
        }

        if is_valid_orcid(value) {
            report.valid.push(OrcidId::new(value)?);
        } else {
            report.rejected.push(value.to_string());
        }
    }

    if let Some(summary) = report.rejection_summary() {
        warn!("{}", summary);
    }

    Ok(report)
}

/// Read and parse an identifier table from disk
pub async fn read_orcid_file(path: impl AsRef<Path>) -> Result<ImportReport> {
    let path = path.as_ref();
    let text = tokio::fs::read_to_string(path).await?;
    let report = parse_orcid_table(&text)?;
    info!(
        "Imported {} valid ORCID iDs from {} ({} rejected)",
        report.valid.len(),
        path.display(),
        report.rejected.len()
    );
    Ok(report)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_comma_separated_table() {
        let text = "name,ORCID,dept\n\
                    Ada,0000-0002-1825-0097,CS\n\
                    Bob,0000-0001-5109-370X,Math\n";
        let report = parse_orcid_table(text).unwrap();

        assert_eq!(report.valid.len(), 2);
        assert_eq!(report.valid[1].as_str(), "0000-0001-5109-370X");
        assert!(report.rejected.is_empty());
        assert!(report.rejection_summary().is_none());
    }

    #[test]
    fn test_semicolon_separated_table_with_rejects() {
        let text = "Orcid;name\r\n\
                    0000-0002-1825-0097;Ada\r\n\
                    1234;Bad\r\n\
                    \r\n\
                    ;Empty\r\n\
                    0000-0002-1825-009;Short\r\n";
        let report = parse_orcid_table(text).unwrap();

        assert_eq!(report.valid.len(), 1);
        assert_eq!(report.rejected, vec!["1234", "0000-0002-1825-009"]);
        assert_eq!(
            report.rejection_summary().unwrap(),
            "Skipped 2 invalid IDs: 1234, 0000-0002-1825-009"
        );
    }

    #[test]
    fn test_rejection_sample_is_truncated() {
        let text = "orcid\na\nb\nc\nd\n";
        let report = parse_orcid_table(text).unwrap();
        assert_eq!(
            report.rejection_summary().unwrap(),
            "Skipped 4 invalid IDs: a, b, c..."
        );
    }

    #[test]
    fn test_missing_column_is_fatal() {
        let err = parse_orcid_table("name,email\nAda,ada@example.org\n").unwrap_err();
        assert!(matches!(err, Error::MissingColumn { .. }));
        assert!(err.is_validation());

        assert!(matches!(
            parse_orcid_table(""),
            Err(Error::MissingColumn { .. })
        ));
    }

    #[test]
    fn test_empty_batch_is_rejected() {
        let report = parse_orcid_table("orcid\nnope\n").unwrap();
        assert!(report.into_batch().unwrap_err().is_validation());
    }
}
