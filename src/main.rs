use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use orcid_analyst::chat::ChatSession;
use orcid_analyst::client::generator_from_config;
use orcid_analyst::import::read_orcid_file;
use orcid_analyst::models::type_label;
use orcid_analyst::repositories::HistoryRepository;
use orcid_analyst::{
    extract_orcid, ActiveAnalysis, Config, ConfigOverrides, GroupAnalysis, IndexingFilter,
    IndexingStatistics, OrcidId, Publication, PublicationFilter, Retriever, Server,
    SubjectAnalysis,
};
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};
use tracing_subscriber::EnvFilter;

// ─── CLI Definition ─────────────────────────────────────────────────────────

#[derive(Parser)]
#[command(
    name = "orcid-analyst",
    about = "Publication analytics for ORCID researchers",
    version,
    long_about = None
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Configuration file (defaults to the user config directory)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Log level used when RUST_LOG is not set
    #[arg(long, global = true, default_value = "info")]
    log_level: String,

    /// Log output format (json is also used when stderr is not a terminal)
    #[arg(long, global = true, value_enum)]
    log_format: Option<LogFormat>,

    /// Override the registry API base URL
    #[arg(long, global = true)]
    registry_url: Option<String>,
}

#[derive(Clone, Copy, PartialEq, Eq, ValueEnum)]
enum LogFormat {
    Text,
    Json,
}

#[derive(Subcommand)]
enum Commands {
    /// Analyze the publications of one researcher.
    Analyze {
        orcid: String,
        /// Print the analysis as JSON
        #[arg(long)]
        json: bool,
        /// Save the analysis to history
        #[arg(long)]
        save: bool,
        /// Only list publications whose title contains this text
        #[arg(long)]
        search: Option<String>,
        /// Only list publications of this work type (e.g. journal-article)
        #[arg(long = "type")]
        work_type: Option<String>,
        #[arg(long)]
        year: Option<i32>,
        /// all, doi, scopus, wos, both, indexed or not-indexed
        #[arg(long, default_value = "all")]
        indexing: IndexingFilter,
    },

    /// Analyze a group of researchers listed in a CSV file with an `orcid` column.
    Batch {
        file: PathBuf,
        #[arg(long)]
        json: bool,
        #[arg(long)]
        save: bool,
        /// Name of the saved group (defaults to the file name)
        #[arg(long)]
        name: Option<String>,
    },

    /// Ask the research assistant a question.
    Chat {
        question: Option<String>,
        /// Analyze this researcher and discuss the result
        #[arg(long, conflicts_with = "file")]
        orcid: Option<String>,
        /// Analyze the researchers in this CSV file and discuss the result
        #[arg(long)]
        file: Option<PathBuf>,
        /// Forget the stored conversation first
        #[arg(long)]
        clear: bool,
        /// Use a chat proxy instead of a local API key
        #[arg(long)]
        proxy_url: Option<String>,
    },

    /// Saved analyses and conversation.
    History {
        #[command(subcommand)]
        action: HistoryAction,
    },

    /// Run the HTTP API and chat proxy.
    Serve {
        #[arg(long)]
        host: Option<String>,
        #[arg(long)]
        port: Option<u16>,
    },

    /// Config management.
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

#[derive(Subcommand)]
enum HistoryAction {
    /// List saved analyses and groups.
    List,
    /// Delete saved analyses, groups and the conversation.
    Clear,
}

#[derive(Subcommand)]
enum ConfigAction {
    /// Print the effective configuration.
    Show,
}

// ─── Entry point ────────────────────────────────────────────────────────────

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(&cli.log_level, cli.log_format)?;

    let mut config = Config::load(cli.config.as_deref()).context("failed to load configuration")?;
    let mut overrides = ConfigOverrides {
        registry_url: cli.registry_url.clone(),
        ..ConfigOverrides::default()
    };
    match &cli.command {
        Commands::Serve { host, port } => {
            overrides.host.clone_from(host);
            overrides.port = *port;
        }
        Commands::Chat { proxy_url, .. } => overrides.proxy_url.clone_from(proxy_url),
        _ => {}
    }
    config.apply_overrides(&overrides)?;
    debug!("Configuration loaded");

    match cli.command {
        Commands::Analyze {
            orcid,
            json,
            save,
            search,
            work_type,
            year,
            indexing,
        } => {
            let filter = PublicationFilter {
                search,
                work_type,
                year,
                indexing,
            };
            analyze(&config, &orcid, json, save, &filter).await
        }
        Commands::Batch {
            file,
            json,
            save,
            name,
        } => batch(&config, file, json, save, name).await,
        Commands::Chat {
            question,
            orcid,
            file,
            clear,
            ..
        } => chat(&config, question, orcid, file, clear).await,
        Commands::History { action } => history(&config, action).await,
        Commands::Serve { .. } => {
            info!("Starting HTTP server");
            Server::new(config).run().await?;
            Ok(())
        }
        Commands::Config {
            action: ConfigAction::Show,
        } => {
            print!("{}", config.to_toml()?);
            Ok(())
        }
    }
}

fn init_tracing(level: &str, format: Option<LogFormat>) -> Result<()> {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(format!("orcid_analyst={level}")))
        .context("invalid log level")?;

    let json = match format {
        Some(format) => format == LogFormat::Json,
        None => !atty::is(atty::Stream::Stderr),
    };

    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false);

    let result = if json {
        builder.json().try_init()
    } else {
        builder.try_init()
    };
    result.map_err(|e| anyhow::anyhow!("failed to install tracing subscriber: {e}"))
}

// ─── Commands ───────────────────────────────────────────────────────────────

async fn analyze(
    config: &Config,
    orcid: &str,
    json: bool,
    save: bool,
    filter: &PublicationFilter,
) -> Result<()> {
    let orcid = OrcidId::new(orcid)?;
    let retriever = Retriever::from_config(&config.registry)?;
    let analysis = retriever
        .analyze_subject(&orcid)
        .await
        .with_context(|| format!("failed to analyze {orcid}"))?;

    if save {
        let name = analysis
            .full_name
            .clone()
            .unwrap_or_else(|| orcid.to_string());
        let entry = HistoryRepository::from_config(&config.history)
            .save_analysis(name, analysis.clone())
            .await?;
        info!("Saved analysis {}", entry.id);
    }

    if json {
        println!("{}", serde_json::to_string_pretty(&analysis)?);
    } else {
        print_subject(&analysis, filter);
    }
    Ok(())
}

async fn batch(
    config: &Config,
    file: PathBuf,
    json: bool,
    save: bool,
    name: Option<String>,
) -> Result<()> {
    let group = load_group(config, &file).await?;

    if save {
        let name = name.unwrap_or_else(|| {
            file.file_stem()
                .map_or_else(|| "group".to_string(), |s| s.to_string_lossy().into_owned())
        });
        let entry = HistoryRepository::from_config(&config.history)
            .save_group(name, group.clone())
            .await?;
        info!("Saved group {}", entry.id);
    }

    if json {
        println!("{}", serde_json::to_string_pretty(&group)?);
    } else {
        print_group(&group);
    }
    Ok(())
}

async fn load_group(config: &Config, file: &Path) -> Result<GroupAnalysis> {
    let report = read_orcid_file(file)
        .await
        .with_context(|| format!("failed to import {}", file.display()))?;
    if let Some(summary) = report.rejection_summary() {
        eprintln!("{summary}");
    }
    let orcids = report.into_batch()?;

    let retriever = Retriever::from_config(&config.registry)?;
    let group = retriever
        .analyze_batch_with_progress(&orcids, |progress| {
            eprintln!(
                "[{}/{}] {} {}",
                progress.index,
                progress.total,
                progress.orcid,
                if progress.succeeded { "ok" } else { "failed" }
            );
        })
        .await;
    Ok(group)
}

async fn chat(
    config: &Config,
    question: Option<String>,
    orcid: Option<String>,
    file: Option<PathBuf>,
    clear: bool,
) -> Result<()> {
    let history = HistoryRepository::from_config(&config.history);
    if clear {
        history.clear_chat().await?;
        info!("Conversation cleared");
    }

    let Some(question) = question else {
        if clear {
            return Ok(());
        }
        bail!("a question is required");
    };

    let generator = generator_from_config(&config.generation)?;

    // An ORCID iD mentioned in the question is analyzed when no data was requested
    let subject = match orcid {
        Some(orcid) => Some(OrcidId::new(&orcid)?),
        None if file.is_none() => extract_orcid(&question),
        None => None,
    };

    let analysis = if let Some(file) = &file {
        ActiveAnalysis::Group(load_group(config, file).await?)
    } else if let Some(orcid) = subject {
        let retriever = Retriever::from_config(&config.registry)?;
        ActiveAnalysis::Single(retriever.analyze_subject(&orcid).await?)
    } else {
        ActiveAnalysis::None
    };

    let mut session = ChatSession::with_history(generator, history.load_chat().await?);
    let reply = session.ask(&question, &analysis).await;
    history.save_chat(session.messages()).await?;

    println!("{}", reply?);
    Ok(())
}

async fn history(config: &Config, action: HistoryAction) -> Result<()> {
    let history = HistoryRepository::from_config(&config.history);
    match action {
        HistoryAction::List => {
            let analyses = history.analyses().await?;
            let groups = history.groups().await?;
            let messages = history.load_chat().await?;

            println!("Analyses ({}):", analyses.len());
            for entry in &analyses {
                println!(
                    "  {}  {}  {} ({} publications)",
                    entry.timestamp.format("%Y-%m-%d %H:%M"),
                    entry.id,
                    entry.name,
                    entry.analysis.total_publications
                );
            }
            println!("Groups ({}):", groups.len());
            for entry in &groups {
                println!(
                    "  {}  {}  {} ({} researchers, {} publications)",
                    entry.timestamp.format("%Y-%m-%d %H:%M"),
                    entry.id,
                    entry.name,
                    entry.analysis.total_researchers,
                    entry.analysis.total_publications
                );
            }
            println!("Conversation: {} messages", messages.len());
        }
        HistoryAction::Clear => {
            history.clear_all().await?;
            println!("History cleared");
        }
    }
    Ok(())
}

// ─── Output ─────────────────────────────────────────────────────────────────

fn print_subject(analysis: &SubjectAnalysis, filter: &PublicationFilter) {
    println!("ORCID iD:      {}", analysis.orcid_id.profile_url());
    if let Some(name) = &analysis.full_name {
        println!("Name:          {name}");
    }
    if let Some(affiliation) = &analysis.affiliation {
        println!("Affiliation:   {affiliation}");
    }
    println!("Publications:  {}", analysis.total_publications);
    println!("Years:         {}", analysis.year_range);
    print_counts(analysis.by_year.iter().map(|(y, c)| (y.to_string(), *c)), &analysis.by_type);
    print_indexing(&analysis.indexing_stats);
    print_publications(&analysis.publications, filter);
}

fn print_group(group: &GroupAnalysis) {
    println!("Researchers:   {}", group.total_researchers);
    println!("Publications:  {}", group.total_publications);
    println!("Average:       {:.2}", group.avg_publications);
    println!("Years:         {}", group.year_range);
    print_counts(group.by_year.iter().map(|(y, c)| (y.to_string(), *c)), &group.by_type);
    print_indexing(&group.indexing_stats);
    if !group.failed_orcids.is_empty() {
        warn!("{} researchers could not be retrieved", group.failed_orcids.len());
        println!("\nFailed:");
        for orcid in &group.failed_orcids {
            println!("  {orcid}");
        }
    }
}

fn print_counts(
    by_year: impl Iterator<Item = (String, usize)>,
    by_type: &orcid_analyst::models::TypeCounts,
) {
    println!("\nBy year:");
    for (year, count) in by_year {
        println!("  {year}  {count}");
    }
    println!("\nBy type:");
    for (work_type, count) in by_type {
        println!("  {:<20} {count}", type_label(work_type));
    }
}

fn print_indexing(stats: &IndexingStatistics) {
    println!("\nIndexing:");
    let rows = [
        ("DOI", stats.with_doi, stats.doi_percentage),
        ("Scopus", stats.secondary_indexed, stats.secondary_percentage),
        ("Web of Science", stats.citation_indexed, stats.citation_percentage),
        ("Both", stats.both_indexed, stats.both_percentage),
        ("Indexed", stats.indexed, stats.indexed_percentage),
        ("Not indexed", stats.not_indexed, stats.not_indexed_percentage),
    ];
    for (label, count, percentage) in rows {
        println!("  {label:<16} {count:>5}  {percentage:>5.1}%");
    }
}

fn print_publications(publications: &[Publication], filter: &PublicationFilter) {
    let shown = filter.apply(publications);
    if filter.is_empty() {
        println!("\nPublications:");
    } else {
        println!("\nPublications ({} of {} match):", shown.len(), publications.len());
    }

    for publication in shown {
        let year = publication
            .year
            .map_or_else(|| "----".to_string(), |y| y.to_string());
        let mut flags = Vec::new();
        if publication.has_secondary_index {
            flags.push("Scopus");
        }
        if publication.has_citation_index {
            flags.push("WoS");
        }
        println!(
            "  {year}  {}  [{}]{}",
            publication.title,
            publication.type_label(),
            if flags.is_empty() {
                String::new()
            } else {
                format!(" {}", flags.join(", "))
            }
        );
        if let Some(url) = publication.doi_url() {
            println!("        {url}");
        }
    }
}
