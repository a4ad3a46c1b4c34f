use orcid_analyst::aggregate::{aggregate, year_range};
use orcid_analyst::import::parse_orcid_table;
use orcid_analyst::retriever::{build_group_analysis, SubjectOutcome};
use orcid_analyst::{is_valid_orcid, OrcidId, Publication};
use proptest::prelude::*;

/// Property-based tests for identifier validation
mod identifier_props {
    use super::*;

    proptest! {
        #[test]
        fn test_well_formed_ids_accepted(id in r"[0-9]{4}-[0-9]{4}-[0-9]{4}-[0-9]{3}[0-9X]") {
            prop_assert!(is_valid_orcid(&id), "Valid ORCID iD should be accepted: {}", id);
            let parsed = OrcidId::new(&id).unwrap();
            prop_assert_eq!(parsed.as_str(), id.as_str());
        }

        #[test]
        fn test_lowercase_checksum_rejected(id in r"[0-9]{4}-[0-9]{4}-[0-9]{4}-[0-9]{3}x") {
            prop_assert!(!is_valid_orcid(&id));
        }

        #[test]
        fn test_wrong_group_lengths_rejected(id in r"[0-9]{3}-[0-9]{4}-[0-9]{4}-[0-9]{4}|[0-9]{4}-[0-9]{5}-[0-9]{4}-[0-9]{4}|[0-9]{16}") {
            prop_assert!(!is_valid_orcid(&id), "Malformed iD should be rejected: {}", id);
        }

        #[test]
        fn test_surrounding_whitespace_ignored(id in r"[0-9]{4}-[0-9]{4}-[0-9]{4}-[0-9]{4}", pad in r"[ \t]{0,3}") {
            let padded = format!("{pad}{id}{pad}");
            prop_assert!(is_valid_orcid(&padded));
        }
    }
}

fn publication_strategy() -> impl Strategy<Value = Publication> {
    (
        prop::option::of(1990i32..2030),
        prop::sample::select(vec!["journal-article", "book", "conference-paper", "other"]),
        any::<bool>(),
        any::<bool>(),
        any::<bool>(),
    )
        .prop_map(|(year, work_type, doi, scopus, wos)| Publication {
            title: "t".to_string(),
            year,
            work_type: work_type.to_string(),
            doi: doi.then(|| "10.1/x".to_string()),
            journal: None,
            scopus_eid: scopus.then(|| "eid".to_string()),
            wos_uid: wos.then(|| "wos".to_string()),
            has_secondary_index: scopus,
            has_citation_index: wos,
        })
}

/// Property-based tests for aggregation
mod aggregation_props {
    use super::*;

    proptest! {
        #[test]
        fn test_indexing_inclusion_exclusion(publications in prop::collection::vec(publication_strategy(), 0..40)) {
            let stats = aggregate(&publications).indexing;

            prop_assert_eq!(stats.total, publications.len());
            prop_assert_eq!(
                stats.indexed,
                stats.secondary_indexed + stats.citation_indexed - stats.both_indexed
            );
            prop_assert_eq!(stats.not_indexed, stats.total - stats.indexed);
            prop_assert!(stats.both_indexed <= stats.secondary_indexed.min(stats.citation_indexed));
        }

        #[test]
        fn test_counts_partition_collection(publications in prop::collection::vec(publication_strategy(), 0..40)) {
            let agg = aggregate(&publications);
            let dated = publications.iter().filter(|p| p.year.is_some()).count();

            prop_assert_eq!(agg.by_type.values().sum::<usize>(), publications.len());
            prop_assert_eq!(agg.by_year.values().sum::<usize>(), dated);
            prop_assert!(agg.by_year.values().all(|&count| count > 0));
        }

        #[test]
        fn test_percentages_bounded(publications in prop::collection::vec(publication_strategy(), 0..40)) {
            let stats = aggregate(&publications).indexing;
            for percentage in [
                stats.doi_percentage,
                stats.secondary_percentage,
                stats.citation_percentage,
                stats.both_percentage,
                stats.indexed_percentage,
                stats.not_indexed_percentage,
            ] {
                prop_assert!((0.0..=100.0).contains(&percentage));
            }
        }

        #[test]
        fn test_year_range_spans_observed_years(years in prop::collection::vec(1950i32..2050, 1..20)) {
            let min = *years.iter().min().unwrap();
            let max = *years.iter().max().unwrap();
            prop_assert_eq!(year_range(years), format!("{min}-{max}"));
        }

        #[test]
        fn test_group_merge_is_consistent(
            subjects in prop::collection::vec(prop::collection::vec(publication_strategy(), 0..10), 0..6)
        ) {
            let expected_total: usize = subjects.iter().map(Vec::len).sum();
            let outcomes: Vec<SubjectOutcome> = subjects.into_iter().map(Ok).collect();
            let researchers = outcomes.len();

            let group = build_group_analysis(outcomes);
            prop_assert_eq!(group.total_researchers, researchers);
            prop_assert_eq!(group.total_publications, expected_total);
            prop_assert_eq!(group.publications.len(), expected_total);
            prop_assert_eq!(group.by_type.values().sum::<usize>(), expected_total);
            prop_assert!(group.failed_orcids.is_empty());
        }
    }
}

/// Property-based tests for table import
mod import_props {
    use super::*;

    proptest! {
        #[test]
        fn test_every_row_is_classified(
            ids in prop::collection::vec(r"[0-9]{4}-[0-9]{4}-[0-9]{4}-[0-9]{3}[0-9X]|[a-z]{1,8}", 1..20),
            separator in prop::sample::select(vec![",", ";"])
        ) {
            let mut text = format!("name{separator}orcid\n");
            for id in &ids {
                text.push_str(&format!("someone{separator}{id}\n"));
            }

            let report = parse_orcid_table(&text).unwrap();
            prop_assert_eq!(report.valid.len() + report.rejected.len(), ids.len());
            prop_assert!(report.valid.iter().all(|id| is_valid_orcid(id.as_str())));
        }
    }
}
