//! # docqa
//!
//! A small retrieval-augmented question-answering service for uploaded
//! PDFs. A document is extracted, split into overlapping segments,
//! embedded, and held in an in-memory vector index; questions are
//! answered by a chat model constrained to the retrieved segments.
//!
//! ## Pipeline
//!
//! ```text
//! ┌─────────┐   ┌─────────┐   ┌──────────┐   ┌──────────────┐
//! │ PDF     │──▶│ Chunker │──▶│ Embedder │──▶│ Vector index │
//! │ extract │   │ + clean │   │ (OpenAI) │   │ (in-memory)  │
//! └─────────┘   └─────────┘   └──────────┘   └──────┬───────┘
//!                                                   │
//!                 ┌─────────┐   ┌───────────┐       ▼
//!   answer ◀──────│ Chat    │◀──│ Retriever │◀── question
//!   + sources     │ model   │   │ (top-k)   │
//!                 └─────────┘   └───────────┘
//! ```
//!
//! ## Modules
//!
//! | Module | Purpose |
//! |--------|---------|
//! | [`config`] | TOML configuration parsing |
//! | [`error`] | Pipeline error taxonomy |
//! | [`extract`] | PDF text extraction |
//! | [`chunk`] | Overlapping chunker and segment cleaner |
//! | [`embedding`] | Embedding provider abstraction |
//! | [`index`] | In-memory vector similarity index |
//! | [`retriever`] | Top-k segment retrieval |
//! | [`answer`] | Grounded answer synthesis |
//! | [`session`] | Single-slot upload/session orchestration |
//! | [`server`] | HTTP upload and QA endpoints |

pub mod answer;
pub mod chunk;
pub mod config;
pub mod embedding;
pub mod error;
pub mod extract;
pub mod index;
pub mod retriever;
pub mod server;
pub mod session;

#[cfg(test)]
pub(crate) mod testing;
