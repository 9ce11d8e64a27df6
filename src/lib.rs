//! # ragchat
//!
//! A retrieval-augmented streaming chat CLI for local models.
//!
//! ragchat loads a plain-text corpus, chunks and embeds it into an
//! in-memory vector index, and routes each console prompt through a
//! similarity-search retrieval step into a streaming chat model behind an
//! Ollama-compatible HTTP API. Answers stream to the terminal token by
//! token and every completed exchange is appended to a per-run transcript
//! file.
//!
//! ## Data flow
//!
//! ```text
//! stdin ─▶ repl ─▶ chat ─▶ { retrieve ─▶ index, memory } ─▶ backend
//!                    │                                        │
//!                    ▼                                        ▼
//!               transcript                            streamed fragments
//! ```
//!
//! ## Modules
//!
//! | Module | Purpose |
//! |--------|---------|
//! | [`config`] | TOML configuration parsing |
//! | [`models`] | Core data types |
//! | [`corpus`] | Corpus loading from the filesystem |
//! | [`chunk`] | Token-budget text chunking |
//! | [`embedding`] | Embedding client + cosine similarity |
//! | [`index`] | In-memory vector index |
//! | [`retrieve`] | Query-time retrieval |
//! | [`memory`] | Bounded conversation window |
//! | [`backend`] | Streaming chat backend |
//! | [`transcript`] | Per-run transcript file |
//! | [`chat`] | Exchange orchestration |
//! | [`repl`] | Interactive console loop |

pub mod backend;
pub mod chat;
pub mod chunk;
pub mod config;
pub mod corpus;
pub mod embedding;
pub mod index;
pub mod memory;
pub mod models;
pub mod repl;
pub mod retrieve;
pub mod transcript;
