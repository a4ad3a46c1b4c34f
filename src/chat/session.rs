use crate::client::TextGenerator;
use crate::models::{ActiveAnalysis, ChatMessage};
use crate::{Error, Result};
use std::sync::Arc;
use tracing::{info, warn};

/// An ongoing conversation with the research assistant
pub struct ChatSession {
    generator: Arc<dyn TextGenerator>,
    messages: Vec<ChatMessage>,
}

impl ChatSession {
    pub fn new(generator: Arc<dyn TextGenerator>) -> Self {
        Self::with_history(generator, Vec::new())
    }

    /// Resume a conversation from stored messages
    pub fn with_history(generator: Arc<dyn TextGenerator>, messages: Vec<ChatMessage>) -> Self {
        Self {
            generator,
            messages,
        }
    }

    pub fn messages(&self) -> &[ChatMessage] {
        &self.messages
    }

    pub fn clear(&mut self) {
        self.messages.clear();
    }

    /// Ask a question about `analysis`.
    ///
    /// The question is recorded before generation starts and stays in the
    /// conversation when generation fails; the reply is recorded on success.
    pub async fn ask(&mut self, question: &str, analysis: &ActiveAnalysis) -> Result<String> {
        let question = question.trim();
        if question.is_empty() {
            return Err(Error::invalid_input("question", "question cannot be empty"));
        }

        let prior = self.messages.len();
        self.messages.push(ChatMessage::user(question));

        info!(
            "Asking {} backend ({} prior messages)",
            self.generator.name(),
            prior
        );

        match self
            .generator
            .generate(analysis, &self.messages[..prior], question)
            .await
        {
            Ok(reply) => {
                self.messages.push(ChatMessage::assistant(reply.clone()));
                Ok(reply)
            }
            Err(e) => {
                warn!("Generation failed: {}", e);
                Err(e)
            }
        }
    }
}
