//! Publication records and the analyses derived from them.

use crate::identifiers::OrcidId;
use serde::{Deserialize, Serialize};
use std::borrow::Cow;
use std::collections::BTreeMap;

/// Title used when the registry record has none
pub const UNTITLED: &str = "Untitled";

/// Work type used when the registry record has none
pub const OTHER_TYPE: &str = "other";

/// Year range shown when no publication carries a year
pub const NO_YEAR_RANGE: &str = "-";

/// Publications per year, ordered by year
pub type YearCounts = BTreeMap<i32, usize>;

/// Publications per work type tag, ordered by tag
pub type TypeCounts = BTreeMap<String, usize>;

/// One bibliographic work
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Publication {
    pub title: String,
    pub year: Option<i32>,
    /// Lower-cased registry work type, e.g. `journal-article`
    #[serde(rename = "type")]
    pub work_type: String,
    pub doi: Option<String>,
    pub journal: Option<String>,
    /// Scopus EID, when the record carries one
    #[serde(default)]
    pub scopus_eid: Option<String>,
    /// Web of Science UID, when the record carries one
    #[serde(default)]
    pub wos_uid: Option<String>,
    /// Indexed by the secondary index (Scopus)
    #[serde(rename = "hasScopus")]
    pub has_secondary_index: bool,
    /// Indexed by the citation index (Web of Science)
    #[serde(rename = "hasWos")]
    pub has_citation_index: bool,
}

impl Publication {
    #[must_use]
    pub const fn is_indexed(&self) -> bool {
        self.has_secondary_index || self.has_citation_index
    }

    #[must_use]
    pub fn type_label(&self) -> Cow<'_, str> {
        type_label(&self.work_type)
    }

    #[must_use]
    pub fn doi_url(&self) -> Option<String> {
        self.doi.as_ref().map(|doi| format!("https://doi.org/{doi}"))
    }
}

/// Human-readable name of a work type tag
#[must_use]
pub fn type_label(work_type: &str) -> Cow<'_, str> {
    match work_type {
        "journal-article" => Cow::Borrowed("Journal article"),
        "book" => Cow::Borrowed("Book"),
        "book-chapter" => Cow::Borrowed("Book chapter"),
        "conference-paper" => Cow::Borrowed("Conference paper"),
        "dissertation" | "dissertation-thesis" => Cow::Borrowed("Dissertation"),
        "preprint" => Cow::Borrowed("Preprint"),
        "report" => Cow::Borrowed("Report"),
        OTHER_TYPE => Cow::Borrowed("Other"),
        other => Cow::Owned(other.replace('-', " ")),
    }
}

/// Indexing coverage of a publication collection
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IndexingStatistics {
    pub total: usize,
    pub with_doi: usize,
    pub doi_percentage: f64,
    #[serde(rename = "scopusIndexed")]
    pub secondary_indexed: usize,
    #[serde(rename = "scopusPercentage")]
    pub secondary_percentage: f64,
    #[serde(rename = "wosIndexed")]
    pub citation_indexed: usize,
    #[serde(rename = "wosPercentage")]
    pub citation_percentage: f64,
    /// Indexed by both sources
    pub both_indexed: usize,
    pub both_percentage: f64,
    /// Indexed by at least one source
    pub indexed: usize,
    pub indexed_percentage: f64,
    /// Indexed by neither source
    pub not_indexed: usize,
    pub not_indexed_percentage: f64,
}

/// Profile metadata of a researcher
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubjectProfile {
    pub full_name: Option<String>,
    pub affiliation: Option<String>,
}

/// Analysis of a single researcher
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubjectAnalysis {
    #[serde(rename = "orcid_id")]
    pub orcid_id: OrcidId,
    pub full_name: Option<String>,
    pub affiliation: Option<String>,
    pub total_publications: usize,
    pub year_range: String,
    pub by_year: YearCounts,
    pub by_type: TypeCounts,
    pub publications: Vec<Publication>,
    pub indexing_stats: IndexingStatistics,
}

/// Aggregated analysis of a group of researchers
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GroupAnalysis {
    /// Researchers whose works were retrieved successfully
    pub total_researchers: usize,
    pub total_publications: usize,
    pub avg_publications: f64,
    pub year_range: String,
    pub by_year: YearCounts,
    pub by_type: TypeCounts,
    pub publications: Vec<Publication>,
    /// Absent from payloads built by older clients
    #[serde(default)]
    pub indexing_stats: IndexingStatistics,
    /// Identifiers whose retrieval failed, in input order
    pub failed_orcids: Vec<OrcidId>,
}

impl GroupAnalysis {
    /// Recompute the indexing statistics when they do not cover the publications
    pub fn fill_indexing_stats(&mut self) {
        if self.indexing_stats.total != self.publications.len() {
            self.indexing_stats = IndexingStatistics::from_publications(&self.publications);
        }
    }
}

/// The analysis currently shown to the user
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "analysis", rename_all = "lowercase")]
pub enum ActiveAnalysis {
    #[default]
    None,
    Single(SubjectAnalysis),
    Group(GroupAnalysis),
}

impl ActiveAnalysis {
    #[must_use]
    pub const fn is_none(&self) -> bool {
        matches!(self, Self::None)
    }

    #[must_use]
    pub const fn single(&self) -> Option<&SubjectAnalysis> {
        match self {
            Self::Single(analysis) => Some(analysis),
            _ => None,
        }
    }

    #[must_use]
    pub const fn group(&self) -> Option<&GroupAnalysis> {
        match self {
            Self::Group(analysis) => Some(analysis),
            _ => None,
        }
    }

    /// Publications of whichever analysis is active
    #[must_use]
    pub fn publications(&self) -> &[Publication] {
        match self {
            Self::None => &[],
            Self::Single(analysis) => &analysis.publications,
            Self::Group(analysis) => &analysis.publications,
        }
    }

    /// Build from the optional pair used on the wire, preferring the group
    #[must_use]
    pub fn from_parts(single: Option<SubjectAnalysis>, group: Option<GroupAnalysis>) -> Self {
        match (single, group) {
            (_, Some(mut group)) => {
                group.fill_indexing_stats();
                Self::Group(group)
            }
            (Some(single), None) => Self::Single(single),
            (None, None) => Self::None,
        }
    }
}

impl From<SubjectAnalysis> for ActiveAnalysis {
    fn from(analysis: SubjectAnalysis) -> Self {
        Self::Single(analysis)
    }
}

impl From<GroupAnalysis> for ActiveAnalysis {
    fn from(analysis: GroupAnalysis) -> Self {
        Self::Group(analysis)
    }
}

/// Author of a chat message
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChatRole {
    User,
    Assistant,
}

/// One turn of the assistant conversation
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: ChatRole,
    pub content: String,
}

impl ChatMessage {
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: ChatRole::User,
            content: content.into(),
        }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: ChatRole::Assistant,
            content: content.into(),
        }
    }
}
