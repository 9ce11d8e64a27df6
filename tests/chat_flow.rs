//! End-to-end exchange tests against mock embedding and generation
//! backends: success persists exactly one exchange, failure and
//! cancellation persist nothing, and memory conditions later requests.

use anyhow::{bail, Result};
use async_trait::async_trait;
use std::fs;
use std::sync::{Arc, Mutex};
use tempfile::TempDir;
use tokio_util::sync::CancellationToken;

use ragchat::backend::{ChatBackend, ChatRequest};
use ragchat::chat::ChatOrchestrator;
use ragchat::config::Config;
use ragchat::embedding::EmbeddingClient;
use ragchat::index::EmbeddingIndex;
use ragchat::memory::ConversationWindow;
use ragchat::models::Segment;
use ragchat::retrieve::Retriever;
use ragchat::transcript::TranscriptWriter;

// ============ Mocks ============

/// Maps known words onto fixed axes so similarity is predictable.
struct AxisEmbedder;

#[async_trait]
impl EmbeddingClient for AxisEmbedder {
    async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        let mut v = vec![0.0f32; 2];
        for word in text.split_whitespace() {
            match word {
                "shipping" => v[0] += 1.0,
                "returns" => v[1] += 1.0,
                _ => {}
            }
        }
        Ok(v)
    }
}

/// Scripted backend: emits fixed fragments, optionally failing after a
/// prefix. Records every request it receives.
struct ScriptedBackend {
    fragments: Vec<&'static str>,
    fail_after: Option<usize>,
    requests: Arc<Mutex<Vec<ChatRequest>>>,
}

impl ScriptedBackend {
    fn new(fragments: Vec<&'static str>) -> Self {
        Self {
            fragments,
            fail_after: None,
            requests: Arc::new(Mutex::new(Vec::new())),
        }
    }

    fn failing_after(fragments: Vec<&'static str>, fail_after: usize) -> Self {
        Self {
            fail_after: Some(fail_after),
            ..Self::new(fragments)
        }
    }

    fn requests(&self) -> Arc<Mutex<Vec<ChatRequest>>> {
        Arc::clone(&self.requests)
    }
}

#[async_trait]
impl ChatBackend for ScriptedBackend {
    async fn stream_chat(
        &self,
        request: ChatRequest,
        cancel: &CancellationToken,
        on_fragment: &mut (dyn for<'a> FnMut(&'a str) + Send),
    ) -> Result<String> {
        self.requests.lock().unwrap().push(request);

        let mut answer = String::new();
        for (i, fragment) in self.fragments.iter().enumerate() {
            if cancel.is_cancelled() {
                bail!("Generation cancelled");
            }
            if self.fail_after == Some(i) {
                bail!("Backend dropped the stream");
            }
            on_fragment(fragment);
            answer.push_str(fragment);
        }
        Ok(answer)
    }
}

// ============ Fixture ============

fn test_config() -> Config {
    toml::from_str(
        r#"
[corpus]
path = "./docs"

[model]
name = "llama3"
temperature = 0.7

[chunking]
max_tokens = 300

[retrieval]
min_score = 0.5
max_results = 3
"#,
    )
    .unwrap()
}

async fn build_orchestrator(
    tmp: &TempDir,
    backend: ScriptedBackend,
    history_size: usize,
) -> ChatOrchestrator {
    let segments = vec![
        Segment {
            source: "faq.txt".to_string(),
            index: 0,
            text: "shipping takes three days".to_string(),
        },
        Segment {
            source: "faq.txt".to_string(),
            index: 1,
            text: "returns accepted within thirty days".to_string(),
        },
    ];

    let mut index = EmbeddingIndex::new();
    index.ingest(segments, &AxisEmbedder).await.unwrap();
    let retriever = Retriever::new(index, Arc::new(AxisEmbedder), 0.5, 3);

    let started_at = chrono::NaiveDate::from_ymd_opt(2025, 3, 14)
        .unwrap()
        .and_hms_opt(9, 26, 0)
        .unwrap();
    let transcript = TranscriptWriter::new(tmp.path(), started_at, &test_config());

    ChatOrchestrator::new(
        Box::new(backend),
        retriever,
        ConversationWindow::new(history_size),
        transcript,
        0.7,
    )
}

fn transcript_file(tmp: &TempDir) -> Option<std::path::PathBuf> {
    fs::read_dir(tmp.path())
        .unwrap()
        .filter_map(|e| e.ok())
        .map(|e| e.path())
        .find(|p| p.extension().map(|e| e == "txt").unwrap_or(false))
}

// ============ Tests ============

#[tokio::test]
async fn test_successful_exchange_persists_once() {
    let tmp = TempDir::new().unwrap();
    let backend = ScriptedBackend::new(vec!["Three", " days", "."]);
    let requests = backend.requests();
    let mut orchestrator = build_orchestrator(&tmp, backend, 10).await;

    let mut seen = String::new();
    let mut sink = |fragment: &str| seen.push_str(fragment);

    let answer = orchestrator
        .ask("How long is shipping ?", &CancellationToken::new(), &mut sink)
        .await
        .unwrap();

    // Fragment concatenation equals the resolved answer
    assert_eq!(answer, "Three days.");
    assert_eq!(seen, answer);

    // Exactly one backend request per prompt
    assert_eq!(requests.lock().unwrap().len(), 1);

    // Exactly one user turn and one assistant turn appended
    let turns: Vec<_> = orchestrator.memory().as_context().collect();
    assert_eq!(turns.len(), 2);
    assert_eq!(turns[0].text, "How long is shipping ?");
    assert_eq!(turns[1].text, "Three days.");

    // Exactly one transcript entry, recording the same answer
    let content = fs::read_to_string(transcript_file(&tmp).unwrap()).unwrap();
    assert_eq!(content, "User: How long is shipping ?\nModel: Three days.\n\n");
}

#[tokio::test]
async fn test_failed_exchange_leaves_no_trace() {
    let tmp = TempDir::new().unwrap();
    let backend = ScriptedBackend::failing_after(vec!["par", "tial"], 1);
    let mut orchestrator = build_orchestrator(&tmp, backend, 10).await;

    let mut seen = String::new();
    let mut sink = |fragment: &str| seen.push_str(fragment);

    let result = orchestrator
        .ask("anything about shipping", &CancellationToken::new(), &mut sink)
        .await;

    assert!(result.is_err());
    // The partial fragment reached the sink, but nothing was persisted
    assert_eq!(seen, "par");
    assert!(orchestrator.memory().is_empty());
    assert!(transcript_file(&tmp).is_none());
}

#[tokio::test]
async fn test_cancelled_exchange_leaves_no_trace() {
    let tmp = TempDir::new().unwrap();
    let backend = ScriptedBackend::new(vec!["never", " delivered"]);
    let mut orchestrator = build_orchestrator(&tmp, backend, 10).await;

    let cancel = CancellationToken::new();
    cancel.cancel();

    let mut sink = |_: &str| {};
    let result = orchestrator.ask("shipping", &cancel, &mut sink).await;

    assert!(result.is_err());
    assert!(orchestrator.memory().is_empty());
    assert!(transcript_file(&tmp).is_none());
}

#[tokio::test]
async fn test_memory_conditions_next_request() {
    let tmp = TempDir::new().unwrap();
    let backend = ScriptedBackend::new(vec!["ok"]);
    let requests = backend.requests();
    let mut orchestrator = build_orchestrator(&tmp, backend, 10).await;

    let mut sink = |_: &str| {};
    let cancel = CancellationToken::new();
    orchestrator.ask("first shipping question", &cancel, &mut sink).await.unwrap();
    orchestrator.ask("second shipping question", &cancel, &mut sink).await.unwrap();

    let requests = requests.lock().unwrap();
    assert_eq!(requests.len(), 2);

    // First message is always the system instruction
    let second = &requests[1];
    assert_eq!(second.messages[0].role, "system");

    // The second request carries the first exchange as memory turns
    assert_eq!(second.messages[1].role, "user");
    assert_eq!(second.messages[1].content, "first shipping question");
    assert_eq!(second.messages[2].role, "assistant");
    assert_eq!(second.messages[2].content, "ok");

    // The new prompt comes last, with retrieved excerpts attached
    let last = second.messages.last().unwrap();
    assert_eq!(last.role, "user");
    assert!(last.content.starts_with("second shipping question"));
    assert!(last.content.contains("shipping takes three days"));
}

#[tokio::test]
async fn test_memory_window_evicts_across_exchanges() {
    let tmp = TempDir::new().unwrap();
    let backend = ScriptedBackend::new(vec!["answer"]);
    let mut orchestrator = build_orchestrator(&tmp, backend, 4).await;

    let mut sink = |_: &str| {};
    let cancel = CancellationToken::new();
    for prompt in ["q1", "q2", "q3"] {
        orchestrator.ask(prompt, &cancel, &mut sink).await.unwrap();
    }

    // Cap 4 keeps the last two exchanges; q1 is gone
    let texts: Vec<_> = orchestrator
        .memory()
        .as_context()
        .map(|t| t.text.as_str())
        .collect();
    assert_eq!(texts, vec!["q2", "answer", "q3", "answer"]);
}

#[tokio::test]
async fn test_unmatched_prompt_sent_without_excerpts() {
    let tmp = TempDir::new().unwrap();
    let backend = ScriptedBackend::new(vec!["ok"]);
    let requests = backend.requests();
    let mut orchestrator = build_orchestrator(&tmp, backend, 10).await;

    let mut sink = |_: &str| {};
    orchestrator
        .ask("completely unrelated topic", &CancellationToken::new(), &mut sink)
        .await
        .unwrap();

    let requests = requests.lock().unwrap();
    let last = requests[0].messages.last().unwrap();
    assert_eq!(last.content, "completely unrelated topic");
}
