use crate::client::generation::{
    Content, ContentRole, GenerateContentRequest, GenerationParameters,
};
use crate::config::GenerationConfig;
use crate::models::{ActiveAnalysis, ChatMessage, ChatRole, GroupAnalysis, SubjectAnalysis};
use crate::Result;
use serde::Serialize;

/// Number of publications included verbatim in the digest
pub const CONTEXT_PUBLICATIONS: usize = 10;

const DIGEST_FOOTER: &str = "Use this real data when answering the user's question.";

/// Builds generation requests from the conversation and the active analysis
#[derive(Debug, Clone)]
pub struct ChatContextBuilder {
    system_instruction: String,
    parameters: GenerationParameters,
}

impl ChatContextBuilder {
    #[must_use]
    pub fn new(config: &GenerationConfig) -> Self {
        Self {
            system_instruction: system_instruction(&config.response_language),
            parameters: GenerationParameters::from(config),
        }
    }

    #[must_use]
    pub fn system_instruction(&self) -> &str {
        &self.system_instruction
    }

    /// Assemble the request: prior turns, then the trimmed question with the
    /// analysis digest appended.
    pub fn build(
        &self,
        analysis: &ActiveAnalysis,
        history: &[ChatMessage],
        question: &str,
    ) -> Result<GenerateContentRequest> {
        let mut contents: Vec<Content> = history
            .iter()
            .map(|message| {
                let role = match message.role {
                    ChatRole::User => ContentRole::User,
                    ChatRole::Assistant => ContentRole::Model,
                };
                Content::turn(role, message.content.clone())
            })
            .collect();

        let mut prompt = question.trim().to_string();
        if let Some(digest) = digest(analysis)? {
            prompt.push_str("\n\n");
            prompt.push_str(&digest);
        }
        contents.push(Content::turn(ContentRole::User, prompt));

        Ok(GenerateContentRequest {
            contents,
            system_instruction: Content::text(self.system_instruction.clone()),
            generation_config: self.parameters.clone(),
        })
    }
}

/// Persona and task description, answering in `language`
#[must_use]
pub fn system_instruction(language: &str) -> String {
    format!(
        "You are an analyst of researchers' publication activity. Your main task is to help \
         analyse data from ORCID (Open Researcher and Contributor ID).\n\n\
         Your capabilities:\n\
         1. Analyse researchers' ORCID iDs\n\
         2. Provide publication statistics (counts, types, years)\n\
         3. Explain trends in publication activity\n\
         4. Compare the indicators of different researchers\n\
         5. Give recommendations for increasing publication activity\n\n\
         ORCID iD format: XXXX-XXXX-XXXX-XXXX (for example 0000-0002-1825-0097)\n\n\
         When the user provides an ORCID iD:\n\
         1. Confirm that a valid ORCID iD was received\n\
         2. Explain that the publications will be analysed\n\
         3. Give a short overview of the results\n\n\
         Always answer in {language}. Be professional and helpful."
    )
}

/// Textual summary of the active analysis, `None` when nothing is loaded
pub fn digest(analysis: &ActiveAnalysis) -> Result<Option<String>> {
    match analysis {
        ActiveAnalysis::None => Ok(None),
        ActiveAnalysis::Single(single) => single_digest(single).map(Some),
        ActiveAnalysis::Group(group) => group_digest(group).map(Some),
    }
}

fn single_digest(analysis: &SubjectAnalysis) -> Result<String> {
    let mut lines = vec![
        "AVAILABLE ANALYSIS DATA (single researcher):".to_string(),
        format!("- ORCID iD: {}", analysis.orcid_id),
    ];
    if let Some(name) = &analysis.full_name {
        lines.push(format!("- Name: {name}"));
    }
    if let Some(affiliation) = &analysis.affiliation {
        lines.push(format!("- Affiliation: {affiliation}"));
    }
    lines.extend([
        format!("- Total publications: {}", analysis.total_publications),
        format!("- Year range: {}", analysis.year_range),
        format!("- Publications by year: {}", pretty(&analysis.by_year)?),
        format!("- Publications by type: {}", pretty(&analysis.by_type)?),
        format!(
            "- Publications (first {CONTEXT_PUBLICATIONS}): {}",
            pretty(first_publications(&analysis.publications))?
        ),
    ]);
    Ok(finish_digest(&lines))
}

fn group_digest(analysis: &GroupAnalysis) -> Result<String> {
    let mut lines = vec![
        "AVAILABLE ANALYSIS DATA (group of researchers):".to_string(),
        format!("- Researchers: {}", analysis.total_researchers),
        format!("- Total publications: {}", analysis.total_publications),
        format!("- Average publications: {:.2}", analysis.avg_publications),
        format!("- Year range: {}", analysis.year_range),
        format!("- Publications by year: {}", pretty(&analysis.by_year)?),
        format!("- Publications by type: {}", pretty(&analysis.by_type)?),
        format!(
            "- Publications (first {CONTEXT_PUBLICATIONS}): {}",
            pretty(first_publications(&analysis.publications))?
        ),
    ];
    if !analysis.failed_orcids.is_empty() {
        let failed: Vec<&str> = analysis.failed_orcids.iter().map(|id| id.as_str()).collect();
        lines.push(format!("- Failed ORCID iDs: {}", failed.join(", ")));
    }
    Ok(finish_digest(&lines))
}

/// One line per entry, a blank line, then the footer
fn finish_digest(lines: &[String]) -> String {
    let mut out = lines.join("\n");
    out.push_str("\n\n");
    out.push_str(DIGEST_FOOTER);
    out
}

fn first_publications<T>(publications: &[T]) -> &[T] {
    &publications[..publications.len().min(CONTEXT_PUBLICATIONS)]
}

fn pretty<T: Serialize + ?Sized>(value: &T) -> Result<String> {
    Ok(serde_json::to_string_pretty(value)?)
}
