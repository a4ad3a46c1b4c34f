//! # ORCID Analyst
//!
//! Publication analytics for researchers registered in ORCID: retrieves a
//! researcher's works (or those of a whole group), aggregates them by year,
//! type and indexing coverage, and lets an LLM-backed assistant answer
//! questions about the result.
//!
//! ## Usage Example
//!
//! ```no_run
//! use orcid_analyst::{Config, OrcidId, Retriever};
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let config = Config::load(None)?;
//! let retriever = Retriever::from_config(&config.registry)?;
//!
//! let orcid: OrcidId = "0000-0002-1825-0097".parse()?;
//! let analysis = retriever.analyze_subject(&orcid).await?;
//! println!("{} publications ({})", analysis.total_publications, analysis.year_range);
//! # Ok(())
//! # }
//! ```

pub mod aggregate;
pub mod chat;
pub mod client;
pub mod config;
pub mod error;
pub mod filter;
pub mod identifiers;
pub mod import;
pub mod models;
pub mod parser;
pub mod repositories;
pub mod retriever;
pub mod server;

pub use chat::{ChatContextBuilder, ChatSession};
pub use client::{OrcidClient, RegistrySource, TextGenerator};
pub use config::{Config, ConfigOverrides};
pub use error::{Error, ErrorKind, Result};
pub use filter::{IndexingFilter, PublicationFilter};
pub use identifiers::{extract_orcid, is_valid_orcid, OrcidId};
pub use models::{
    ActiveAnalysis, ChatMessage, ChatRole, GroupAnalysis, IndexingStatistics, Publication,
    SubjectAnalysis,
};
pub use repositories::HistoryRepository;
pub use retriever::{BatchProgress, Retriever};
pub use server::Server;
