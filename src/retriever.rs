//! Single-subject and batch retrieval against the registry.

use crate::aggregate::{aggregate, average, merge_counts, year_range, Aggregate};
use crate::client::{OrcidClient, RegistrySource};
use crate::config::RegistryConfig;
use crate::identifiers::OrcidId;
use crate::models::{
    GroupAnalysis, IndexingStatistics, Publication, SubjectAnalysis, TypeCounts, YearCounts,
};
use crate::parser::{parse_person, parse_works};
use crate::Result;
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info, instrument, warn};

/// Outcome of one batch member: its publications, or its identifier on failure
pub type SubjectOutcome = std::result::Result<Vec<Publication>, OrcidId>;

/// Progress notification emitted after each batch member completes
#[derive(Debug, Clone, Copy)]
pub struct BatchProgress<'a> {
    /// 1-based position in the batch
    pub index: usize,
    pub total: usize,
    pub orcid: &'a OrcidId,
    pub succeeded: bool,
}

/// Fetches researcher records and turns them into analyses
#[derive(Clone)]
pub struct Retriever {
    source: Arc<dyn RegistrySource>,
}

impl Retriever {
    pub fn new(source: Arc<dyn RegistrySource>) -> Self {
        Self { source }
    }

    /// Retriever backed by the public registry API
    pub fn from_config(config: &RegistryConfig) -> Result<Self> {
        Ok(Self::new(Arc::new(OrcidClient::new(config)?)))
    }

    /// Analyze one researcher.
    ///
    /// Works and person data are requested concurrently. A failed works
    /// request fails the analysis; a failed person request only leaves the
    /// name and affiliation empty.
    #[instrument(skip(self, orcid), fields(orcid = %orcid))]
    pub async fn analyze_subject(&self, orcid: &OrcidId) -> Result<SubjectAnalysis> {
        let start = Instant::now();
        let (works, person) = tokio::join!(
            self.source.fetch_works(orcid),
            self.source.fetch_person(orcid)
        );

        let publications = parse_works(&works?);
        let profile = match person {
            Ok(person) => parse_person(&person),
            Err(e) => {
                warn!(
                    "Person data unavailable for {} from {}: {}",
                    orcid,
                    self.source.name(),
                    e
                );
                Default::default()
            }
        };

        let Aggregate {
            by_year,
            by_type,
            indexing,
        } = aggregate(&publications);

        info!(
            "Analyzed {} via {}: {} publications in {:?}",
            orcid,
            self.source.name(),
            publications.len(),
            start.elapsed()
        );

        Ok(SubjectAnalysis {
            orcid_id: orcid.clone(),
            full_name: profile.full_name,
            affiliation: profile.affiliation,
            total_publications: publications.len(),
            year_range: year_range(by_year.keys().copied()),
            by_year,
            by_type,
            publications,
            indexing_stats: indexing,
        })
    }

    /// Fetch and parse the works of one researcher
    pub async fn fetch_publications(&self, orcid: &OrcidId) -> Result<Vec<Publication>> {
        let works = self.source.fetch_works(orcid).await?;
        Ok(parse_works(&works))
    }

    /// Analyze a group of researchers, see [`Self::analyze_batch_with_progress`]
    pub async fn analyze_batch(&self, orcids: &[OrcidId]) -> GroupAnalysis {
        self.analyze_batch_with_progress(orcids, |_| {}).await
    }

    /// Analyze a group of researchers one after another.
    ///
    /// Only works are fetched. Failures never abort the batch; the failed
    /// identifiers are listed in the result in input order.
    #[instrument(skip(self, orcids, progress), fields(batch_size = orcids.len()))]
    pub async fn analyze_batch_with_progress<F>(
        &self,
        orcids: &[OrcidId],
        mut progress: F,
    ) -> GroupAnalysis
    where
        F: FnMut(BatchProgress<'_>),
    {
        let start = Instant::now();
        let total = orcids.len();
        let mut outcomes = Vec::with_capacity(total);

        for (position, orcid) in orcids.iter().enumerate() {
            let outcome = match self.fetch_publications(orcid).await {
                Ok(publications) => {
                    debug!("{}: {} publications", orcid, publications.len());
                    Ok(publications)
                }
                Err(e) => {
                    warn!(
                        "Retrieval from {} failed for {}: {}",
                        self.source.name(),
                        orcid,
                        e
                    );
                    Err(orcid.clone())
                }
            };

            progress(BatchProgress {
                index: position + 1,
                total,
                orcid,
                succeeded: outcome.is_ok(),
            });
            outcomes.push(outcome);
        }

        let group = build_group_analysis(outcomes);
        info!(
            "Batch finished in {:?}: {} succeeded, {} failed, {} publications",
            start.elapsed(),
            group.total_researchers,
            group.failed_orcids.len(),
            group.total_publications
        );
        group
    }
}

/// Merge per-subject outcomes into a group analysis
#[must_use]
pub fn build_group_analysis(outcomes: Vec<SubjectOutcome>) -> GroupAnalysis {
    let mut publications = Vec::new();
    let mut failed_orcids = Vec::new();
    let mut total_researchers = 0;
    let mut by_year = YearCounts::new();
    let mut by_type = TypeCounts::new();

    for outcome in outcomes {
        match outcome {
            Ok(subject_publications) => {
                let subject = aggregate(&subject_publications);
                by_year = merge_counts(by_year, &subject.by_year);
                by_type = merge_counts(by_type, &subject.by_type);
                publications.extend(subject_publications);
                total_researchers += 1;
            }
            Err(orcid) => failed_orcids.push(orcid),
        }
    }

    GroupAnalysis {
        total_researchers,
        total_publications: publications.len(),
        avg_publications: average(publications.len(), total_researchers),
        year_range: year_range(by_year.keys().copied()),
        by_year,
        by_type,
        indexing_stats: IndexingStatistics::from_publications(&publications),
        publications,
        failed_orcids,
    }
}
