//! Narrowing a publication list by title, type, year and indexing coverage.

use crate::models::Publication;
use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::str::FromStr;

/// Indexing coverage a publication must have to pass the filter
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum IndexingFilter {
    #[default]
    All,
    Doi,
    /// Indexed by the secondary index (Scopus)
    Scopus,
    /// Indexed by the citation index (Web of Science)
    Wos,
    Both,
    Indexed,
    NotIndexed,
}

impl IndexingFilter {
    #[must_use]
    pub const fn matches(self, publication: &Publication) -> bool {
        match self {
            Self::All => true,
            Self::Doi => publication.doi.is_some(),
            Self::Scopus => publication.has_secondary_index,
            Self::Wos => publication.has_citation_index,
            Self::Both => publication.has_secondary_index && publication.has_citation_index,
            Self::Indexed => publication.is_indexed(),
            Self::NotIndexed => !publication.is_indexed(),
        }
    }
}

impl FromStr for IndexingFilter {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "all" => Ok(Self::All),
            "doi" => Ok(Self::Doi),
            "scopus" => Ok(Self::Scopus),
            "wos" => Ok(Self::Wos),
            "both" => Ok(Self::Both),
            "indexed" => Ok(Self::Indexed),
            "not-indexed" => Ok(Self::NotIndexed),
            other => Err(Error::invalid_input(
                "indexing",
                format!(
                    "unknown filter '{other}' (expected all, doi, scopus, wos, both, indexed, not-indexed)"
                ),
            )),
        }
    }
}

/// Criteria combined with logical AND
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PublicationFilter {
    /// Case-insensitive substring of the title
    pub search: Option<String>,
    pub work_type: Option<String>,
    pub year: Option<i32>,
    #[serde(default)]
    pub indexing: IndexingFilter,
}

impl PublicationFilter {
    #[must_use]
    pub fn matches(&self, publication: &Publication) -> bool {
        let matches_search = self.search.as_deref().map_or(true, |term| {
            term.is_empty() || publication.title.to_lowercase().contains(&term.to_lowercase())
        });
        let matches_type = self
            .work_type
            .as_deref()
            .map_or(true, |t| publication.work_type == t);
        let matches_year = self.year.map_or(true, |y| publication.year == Some(y));

        matches_search && matches_type && matches_year && self.indexing.matches(publication)
    }

    /// Publications passing the filter, in their original order
    #[must_use]
    pub fn apply<'a>(&self, publications: &'a [Publication]) -> Vec<&'a Publication> {
        publications.iter().filter(|p| self.matches(p)).collect()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self == &Self::default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn publication(title: &str, year: i32, work_type: &str, scopus: bool, wos: bool) -> Publication {
        Publication {
            title: title.to_string(),
            year: Some(year),
            work_type: work_type.to_string(),
            doi: None,
            journal: None,
            scopus_eid: None,
            wos_uid: None,
            has_secondary_index: scopus,
            has_citation_index: wos,
        }
    }

    #[test]
    fn test_combined_filter() {
        let publications = vec![
            publication("Graph Theory Today", 2020, "journal-article", true, false),
            publication("graph coloring", 2021, "journal-article", true, true),
            publication("Graphs for Kids", 2021, "book", false, false),
        ];

        let filter = PublicationFilter {
            search: Some("GRAPH".to_string()),
            work_type: Some("journal-article".to_string()),
            year: Some(2021),
            indexing: IndexingFilter::Both,
        };
        let found = filter.apply(&publications);
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].title, "graph coloring");

        assert_eq!(PublicationFilter::default().apply(&publications).len(), 3);
        assert!(PublicationFilter::default().is_empty());
    }

    #[test]
    fn test_indexing_filters() {
        let neither = publication("a", 2020, "book", false, false);
        let scopus = publication("b", 2020, "book", true, false);

        assert!(IndexingFilter::NotIndexed.matches(&neither));
        assert!(!IndexingFilter::Indexed.matches(&neither));
        assert!(IndexingFilter::Scopus.matches(&scopus));
        assert!(!IndexingFilter::Wos.matches(&scopus));
        assert!(!IndexingFilter::Doi.matches(&scopus));
    }

    #[test]
    fn test_parse_indexing_filter() {
        assert_eq!("not-indexed".parse::<IndexingFilter>().unwrap(), IndexingFilter::NotIndexed);
        assert_eq!(" Scopus ".parse::<IndexingFilter>().unwrap(), IndexingFilter::Scopus);
        assert!("scopes".parse::<IndexingFilter>().is_err());
    }
}
