//! Registry payloads and their conversion into [`Publication`] records.
//!
//! Each work group returned by the registry represents one work as reported
//! by one or more sources. Only the first summary of a group is read; the
//! alternate-source summaries are ignored rather than merged.

use crate::models::{Publication, SubjectProfile, OTHER_TYPE, UNTITLED};
use serde::Deserialize;
use tracing::debug;

/// External id type carrying a DOI
pub const DOI_ID_TYPE: &str = "doi";
/// External id type of the secondary index (Scopus EID)
pub const SECONDARY_INDEX_ID_TYPE: &str = "eid";
/// External id type of the citation index (Web of Science UID)
pub const CITATION_INDEX_ID_TYPE: &str = "wosuid";

/// `{ "value": ... }` wrapper used throughout the registry schema
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Valued<T> {
    pub value: Option<T>,
}

/// Response of `GET /{orcid}/works`
#[derive(Debug, Clone, Default, Deserialize)]
pub struct WorksResponse {
    #[serde(default)]
    pub group: Option<Vec<WorkGroup>>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct WorkGroup {
    #[serde(rename = "work-summary", default)]
    pub work_summary: Option<Vec<WorkSummary>>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct WorkSummary {
    #[serde(rename = "publication-date", default)]
    pub publication_date: Option<PublicationDate>,
    #[serde(rename = "type", default)]
    pub work_type: Option<String>,
    #[serde(default)]
    pub title: Option<WorkTitle>,
    #[serde(rename = "journal-title", default)]
    pub journal_title: Option<Valued<String>>,
    #[serde(rename = "external-ids", default)]
    pub external_ids: Option<ExternalIds>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct PublicationDate {
    /// The registry sends years as strings; numbers are accepted too
    #[serde(default)]
    pub year: Option<Valued<serde_json::Value>>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct WorkTitle {
    #[serde(default)]
    pub title: Option<Valued<String>>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ExternalIds {
    #[serde(rename = "external-id", default)]
    pub external_id: Option<Vec<ExternalId>>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ExternalId {
    #[serde(rename = "external-id-type", default)]
    pub id_type: Option<String>,
    #[serde(rename = "external-id-value", default)]
    pub id_value: Option<String>,
}

/// Response of `GET /{orcid}/person`
#[derive(Debug, Clone, Default, Deserialize)]
pub struct PersonResponse {
    #[serde(default)]
    pub name: Option<PersonName>,
    #[serde(rename = "employment-summary", default)]
    pub employment_summary: Option<Vec<EmploymentSummary>>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct PersonName {
    #[serde(rename = "given-names", default)]
    pub given_names: Option<Valued<String>>,
    #[serde(rename = "family-name", default)]
    pub family_name: Option<Valued<String>>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct EmploymentSummary {
    #[serde(default)]
    pub organization: Option<Organization>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Organization {
    #[serde(default)]
    pub name: Option<String>,
}

fn parse_year(value: &serde_json::Value) -> Option<i32> {
    match value {
        serde_json::Value::String(s) => s.trim().parse().ok(),
        serde_json::Value::Number(n) => n.as_i64().and_then(|y| i32::try_from(y).ok()),
        _ => None,
    }
}

fn non_empty(value: Option<&String>) -> Option<String> {
    value
        .map(|v| v.trim())
        .filter(|v| !v.is_empty())
        .map(ToString::to_string)
}

/// Identifier values found on a work summary
#[derive(Debug, Default)]
struct FoundIds {
    doi: Option<String>,
    scopus_eid: Option<String>,
    wos_uid: Option<String>,
}

fn scan_external_ids(ids: Option<&ExternalIds>) -> FoundIds {
    let mut found = FoundIds::default();

    for id in ids
        .and_then(|ids| ids.external_id.as_deref())
        .unwrap_or_default()
    {
        let Some(id_type) = id.id_type.as_deref() else {
            continue;
        };
        let value = id.id_value.clone();

        if id_type.eq_ignore_ascii_case(DOI_ID_TYPE) {
            found.doi = value;
        } else if id_type.eq_ignore_ascii_case(SECONDARY_INDEX_ID_TYPE) {
            found.scopus_eid = value;
        } else if id_type.eq_ignore_ascii_case(CITATION_INDEX_ID_TYPE) {
            found.wos_uid = value;
        }
    }

    found
}

/// Convert one work group into a publication, using its first summary only
#[must_use]
pub fn parse_work_group(group: &WorkGroup) -> Option<Publication> {
    let summary = group.work_summary.as_deref()?.first()?;

    let year = summary
        .publication_date
        .as_ref()
        .and_then(|date| date.year.as_ref())
        .and_then(|year| year.value.as_ref())
        .and_then(parse_year);

    let work_type = summary
        .work_type
        .as_deref()
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .map_or_else(|| OTHER_TYPE.to_string(), str::to_lowercase);

    let title = summary
        .title
        .as_ref()
        .and_then(|t| t.title.as_ref())
        .and_then(|t| non_empty(t.value.as_ref()))
        .unwrap_or_else(|| UNTITLED.to_string());

    let journal = summary
        .journal_title
        .as_ref()
        .and_then(|j| non_empty(j.value.as_ref()));

    let ids = scan_external_ids(summary.external_ids.as_ref());

    Some(Publication {
        title,
        year,
        work_type,
        doi: ids.doi,
        journal,
        has_secondary_index: ids.scopus_eid.is_some(),
        has_citation_index: ids.wos_uid.is_some(),
        scopus_eid: ids.scopus_eid,
        wos_uid: ids.wos_uid,
    })
}

/// Convert every work group of a works response, preserving order
#[must_use]
pub fn parse_works(response: &WorksResponse) -> Vec<Publication> {
    let groups = response.group.as_deref().unwrap_or_default();
    let publications: Vec<Publication> = groups.iter().filter_map(parse_work_group).collect();

    debug!(
        "Parsed {} publications from {} work groups",
        publications.len(),
        groups.len()
    );
    publications
}

/// Extract display name and primary affiliation from a person response
#[must_use]
pub fn parse_person(response: &PersonResponse) -> SubjectProfile {
    let name = response.name.as_ref();
    let given = name
        .and_then(|n| n.given_names.as_ref())
        .and_then(|v| v.value.as_deref())
        .unwrap_or_default();
    let family = name
        .and_then(|n| n.family_name.as_ref())
        .and_then(|v| v.value.as_deref())
        .unwrap_or_default();

    let full_name = format!("{} {}", family.trim(), given.trim())
        .trim()
        .to_string();

    let affiliation = response
        .employment_summary
        .as_deref()
        .and_then(<[EmploymentSummary]>::first)
        .and_then(|e| e.organization.as_ref())
        .and_then(|o| non_empty(o.name.as_ref()));

    SubjectProfile {
        full_name: (!full_name.is_empty()).then_some(full_name),
        affiliation,
    }
}
