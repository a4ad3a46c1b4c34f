//! Pure aggregation over publication collections.

use crate::models::{IndexingStatistics, Publication, TypeCounts, YearCounts, NO_YEAR_RANGE};
use std::collections::BTreeMap;

/// Counts derived from a publication collection
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Aggregate {
    pub by_year: YearCounts,
    pub by_type: TypeCounts,
    pub indexing: IndexingStatistics,
}

impl Aggregate {
    /// `"{min}-{max}"` over the years present in `by_year`
    #[must_use]
    pub fn year_range(&self) -> String {
        year_range(self.by_year.keys().copied())
    }
}

/// Fold publications into per-year and per-type counts plus indexing coverage.
///
/// Publications without a year are left out of `by_year` but still counted
/// in `by_type` and in the indexing statistics.
#[must_use]
pub fn aggregate(publications: &[Publication]) -> Aggregate {
    let mut by_year = YearCounts::new();
    let mut by_type = TypeCounts::new();

    for publication in publications {
        if let Some(year) = publication.year {
            *by_year.entry(year).or_default() += 1;
        }
        *by_type.entry(publication.work_type.clone()).or_default() += 1;
    }

    Aggregate {
        by_year,
        by_type,
        indexing: IndexingStatistics::from_publications(publications),
    }
}

/// Share of `count` in `total` as a percentage, 0 for an empty collection
#[allow(clippy::cast_precision_loss)]
fn percentage(count: usize, total: usize) -> f64 {
    if total == 0 {
        0.0
    } else {
        count as f64 / total as f64 * 100.0
    }
}

impl IndexingStatistics {
    #[must_use]
    pub fn from_publications(publications: &[Publication]) -> Self {
        let total = publications.len();
        let count = |predicate: fn(&Publication) -> bool| {
            publications.iter().filter(|p| predicate(p)).count()
        };

        let with_doi = count(|p| p.doi.is_some());
        let secondary_indexed = count(|p| p.has_secondary_index);
        let citation_indexed = count(|p| p.has_citation_index);
        let both_indexed = count(|p| p.has_secondary_index && p.has_citation_index);
        let indexed = count(Publication::is_indexed);
        let not_indexed = total - indexed;

        Self {
            total,
            with_doi,
            doi_percentage: percentage(with_doi, total),
            secondary_indexed,
            secondary_percentage: percentage(secondary_indexed, total),
            citation_indexed,
            citation_percentage: percentage(citation_indexed, total),
            both_indexed,
            both_percentage: percentage(both_indexed, total),
            indexed,
            indexed_percentage: percentage(indexed, total),
            not_indexed,
            not_indexed_percentage: percentage(not_indexed, total),
        }
    }
}

/// Format the span of observed years, or `"-"` when there are none
pub fn year_range(years: impl IntoIterator<Item = i32>) -> String {
    let mut years = years.into_iter();
    let Some(first) = years.next() else {
        return NO_YEAR_RANGE.to_string();
    };

    let (min, max) = years.fold((first, first), |(min, max), y| (min.min(y), max.max(y)));
    format!("{min}-{max}")
}

/// Sum two count maps key by key
#[must_use]
pub fn merge_counts<K: Ord + Clone>(
    mut into: BTreeMap<K, usize>,
    from: &BTreeMap<K, usize>,
) -> BTreeMap<K, usize> {
    for (key, count) in from {
        *into.entry(key.clone()).or_default() += count;
    }
    into
}

/// Average number of publications per researcher, 0 when nobody succeeded
#[allow(clippy::cast_precision_loss)]
#[must_use]
pub fn average(total: usize, researchers: usize) -> f64 {
    if researchers == 0 {
        0.0
    } else {
        total as f64 / researchers as f64
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn publication(year: Option<i32>, work_type: &str, doi: bool, scopus: bool, wos: bool) -> Publication {
        Publication {
            title: "t".to_string(),
            year,
            work_type: work_type.to_string(),
            doi: doi.then(|| "10.1/x".to_string()),
            journal: None,
            scopus_eid: scopus.then(|| "eid".to_string()),
            wos_uid: wos.then(|| "wos".to_string()),
            has_secondary_index: scopus,
            has_citation_index: wos,
        }
    }

    #[test]
    fn test_counts_by_year_and_type() {
        let publications = vec![
            publication(Some(2020), "journal-article", true, true, false),
            publication(Some(2020), "book", false, false, false),
            publication(None, "journal-article", true, true, true),
            publication(Some(2018), "other", false, false, true),
        ];

        let agg = aggregate(&publications);
        assert_eq!(agg.by_year.get(&2020), Some(&2));
        assert_eq!(agg.by_year.get(&2018), Some(&1));
        assert_eq!(agg.by_year.values().sum::<usize>(), 3);
        assert_eq!(agg.by_type.get("journal-article"), Some(&2));
        assert_eq!(agg.by_type.values().sum::<usize>(), 4);
        assert_eq!(agg.year_range(), "2018-2020");
    }

    #[test]
    fn test_indexing_statistics() {
        let publications = vec![
            publication(Some(2020), "a", true, true, false),
            publication(Some(2020), "a", true, true, true),
            publication(Some(2020), "a", false, false, true),
            publication(Some(2020), "a", false, false, false),
        ];

        let stats = IndexingStatistics::from_publications(&publications);
        assert_eq!(stats.total, 4);
        assert_eq!(stats.with_doi, 2);
        assert_eq!(stats.secondary_indexed, 2);
        assert_eq!(stats.citation_indexed, 2);
        assert_eq!(stats.both_indexed, 1);
        assert_eq!(stats.indexed, 3);
        assert_eq!(stats.not_indexed, 1);
        assert!((stats.doi_percentage - 50.0).abs() < f64::EPSILON);
        assert!((stats.indexed_percentage - 75.0).abs() < f64::EPSILON);
        assert!((stats.not_indexed_percentage - 25.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_empty_collection_has_zero_percentages() {
        let stats = IndexingStatistics::from_publications(&[]);
        assert_eq!(stats, IndexingStatistics::default());
        assert!(stats.doi_percentage.abs() < f64::EPSILON);
        assert!(stats.not_indexed_percentage.abs() < f64::EPSILON);
    }

    #[test]
    fn test_year_range() {
        assert_eq!(year_range([2019, 2021, 2020]), "2019-2021");
        assert_eq!(year_range([2005]), "2005-2005");
        assert_eq!(year_range(std::iter::empty()), "-");
    }

    #[test]
    fn test_aggregation_is_repeatable() {
        let publications = vec![
            publication(Some(2021), "book", true, false, true),
            publication(None, "preprint", false, true, false),
        ];
        assert_eq!(aggregate(&publications), aggregate(&publications));
    }

    #[test]
    fn test_merge_and_average() {
        let a: YearCounts = [(2020, 2), (2021, 1)].into_iter().collect();
        let b: YearCounts = [(2021, 3), (2022, 1)].into_iter().collect();
        let merged = merge_counts(a, &b);
        assert_eq!(merged.get(&2021), Some(&4));
        assert_eq!(merged.len(), 3);

        assert!((average(7, 2) - 3.5).abs() < f64::EPSILON);
        assert!(average(7, 0).abs() < f64::EPSILON);
    }
}
