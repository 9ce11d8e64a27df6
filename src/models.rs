//! Core data types used throughout ragchat.
//!
//! These types represent the documents, segments, and conversation turns
//! that flow through the ingestion and chat pipeline.

/// A raw text document loaded from the corpus path.
#[derive(Debug, Clone)]
pub struct Document {
    /// Source identifier (the file path it was read from).
    pub source: String,
    pub text: String,
}

/// A bounded-size chunk of a document, the unit of retrieval.
///
/// Segments from one chunking pass do not overlap and concatenate back
/// to the document text modulo whitespace normalization.
#[derive(Debug, Clone, PartialEq)]
pub struct Segment {
    pub source: String,
    /// Position within the document's chunking pass, contiguous from 0.
    pub index: usize,
    pub text: String,
}

/// An embedding vector paired with the segment it was computed from.
///
/// Created once at ingestion time and never mutated or deleted.
#[derive(Debug, Clone)]
pub struct EmbeddingRecord {
    pub vector: Vec<f32>,
    pub segment: Segment,
}

/// A segment returned from an index query, with its similarity score.
#[derive(Debug, Clone)]
pub struct ScoredSegment {
    pub segment: Segment,
    pub score: f32,
}

/// Who produced a conversation turn.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    User,
    Assistant,
}

impl Role {
    /// Wire name used in chat requests.
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::User => "user",
            Role::Assistant => "assistant",
        }
    }
}

/// One message in the conversation history.
#[derive(Debug, Clone, PartialEq)]
pub struct ConversationTurn {
    pub role: Role,
    pub text: String,
}

impl ConversationTurn {
    pub fn user(text: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            text: text.into(),
        }
    }

    pub fn assistant(text: impl Into<String>) -> Self {
        Self {
            role: Role::Assistant,
            text: text.into(),
        }
    }
}
