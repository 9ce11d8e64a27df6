//! Chat orchestration.
//!
//! One exchange runs Requesting → Streaming → Completed | Failed:
//! retrieve context, compose the request from the system instruction +
//! memory window + retrieved excerpts + the new prompt, stream the answer
//! to the caller's sink, then persist the exchange.
//!
//! Exactly one backend request is issued per prompt, and at most one
//! exchange is in flight per orchestrator — [`ChatOrchestrator::ask`]
//! takes `&mut self`, so a second submit is rejected by construction.
//!
//! Persistence policy: a failed or cancelled exchange writes nothing
//! (memory and transcript are untouched). On success the memory update
//! and the transcript append are attempted independently; a transcript
//! write failure is reported on stderr but does not roll back memory.

use anyhow::Result;
use tokio_util::sync::CancellationToken;

use crate::backend::{ChatBackend, ChatMessage, ChatRequest};
use crate::memory::ConversationWindow;
use crate::models::ConversationTurn;
use crate::retrieve::Retriever;
use crate::transcript::TranscriptWriter;

/// Fixed system instruction: language and scope constraint.
pub const SYSTEM_INSTRUCTION: &str = "You are a support assistant. Answer briefly and in \
English, using only the reference excerpts provided with each question. If the excerpts do \
not cover the question, say that you do not know.";

pub struct ChatOrchestrator {
    backend: Box<dyn ChatBackend>,
    retriever: Retriever,
    memory: ConversationWindow,
    transcript: TranscriptWriter,
    temperature: f64,
}

impl ChatOrchestrator {
    pub fn new(
        backend: Box<dyn ChatBackend>,
        retriever: Retriever,
        memory: ConversationWindow,
        transcript: TranscriptWriter,
        temperature: f64,
    ) -> Self {
        Self {
            backend,
            retriever,
            memory,
            transcript,
            temperature,
        }
    }

    /// Run one exchange, streaming fragments to `on_fragment` as they
    /// arrive and returning the full answer text.
    ///
    /// On any backend error, timeout, or cancellation the exchange is
    /// discarded whole: no memory turn and no transcript entry.
    pub async fn ask(
        &mut self,
        prompt: &str,
        cancel: &CancellationToken,
        on_fragment: &mut (dyn FnMut(&str) + Send),
    ) -> Result<String> {
        let context = self.retriever.retrieve(prompt).await?;
        let messages = self.compose(&context, prompt);

        let answer = self
            .backend
            .stream_chat(
                ChatRequest {
                    messages,
                    temperature: self.temperature,
                },
                cancel,
                on_fragment,
            )
            .await?;

        // Completed: memory first, then transcript. The memory window
        // stores the raw prompt, not the context-augmented message.
        self.memory.push(ConversationTurn::user(prompt));
        self.memory.push(ConversationTurn::assistant(answer.clone()));

        if let Err(e) = self.transcript.append(prompt, &answer) {
            eprintln!("Transcript write failed (answer kept in memory): {:#}", e);
        }

        Ok(answer)
    }

    /// System instruction, then the memory window oldest-to-newest, then
    /// the new prompt with the retrieved excerpts attached to it.
    fn compose(&self, context: &[String], prompt: &str) -> Vec<ChatMessage> {
        let mut messages = vec![ChatMessage::new("system", SYSTEM_INSTRUCTION)];

        for turn in self.memory.as_context() {
            messages.push(ChatMessage::new(turn.role.as_str(), turn.text.clone()));
        }

        messages.push(ChatMessage::new("user", augment_prompt(context, prompt)));
        messages
    }

    pub fn memory(&self) -> &ConversationWindow {
        &self.memory
    }

    pub fn transcript_path(&self) -> &std::path::Path {
        self.transcript.path()
    }
}

/// Attach retrieved excerpts to the user prompt. A prompt with no
/// matching excerpts is sent as-is.
fn augment_prompt(context: &[String], prompt: &str) -> String {
    if context.is_empty() {
        return prompt.to_string();
    }

    let mut text = String::from(prompt);
    text.push_str("\n\nReference excerpts:\n");
    for excerpt in context {
        text.push_str("- ");
        text.push_str(excerpt);
        text.push('\n');
    }
    text
}
