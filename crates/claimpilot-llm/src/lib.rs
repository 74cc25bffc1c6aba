//! Generation providers and embedders for ClaimPilot.
//!
//! Pipeline stages never talk to a model directly. They hold a
//! [`GenerationProvider`], usually a [`Generator`] wrapping a shared
//! [`LlmBackend`] with per-stage sampling settings.
//!
//! ```text
//! ┌──────────────────────────────────────────┐
//! │  GenerationProvider::generate(prompt)    │
//! │     Generator { backend, settings }      │
//! └──────────────────────────────────────────┘
//!                     │
//!        ┌────────────┼────────────┐
//!        ▼            ▼            ▼
//!   ┌─────────┐  ┌────────┐  ┌────────┐
//!   │Anthropic│  │ OpenAI │  │ Ollama │
//!   └─────────┘  └────────┘  └────────┘
//! ```

pub mod backend;
pub mod client;
pub mod embeddings;
pub mod error;
pub mod generator;
pub mod types;

// Provider implementations
pub mod anthropic;
pub mod openai;

pub use backend::{LlmBackend, SharedBackend};
#[cfg(any(test, feature = "testing"))]
pub use backend::{MockBackend, MockResponse};
pub use error::{LlmError, Result};
pub use generator::{GenerationProvider, GenerationSettings, Generator, SharedProvider};
pub use types::{CompletionRequest, CompletionResponse, Message, Role, StopReason, Usage};

pub use embeddings::{
    Embedder, EmbedderSpec, MockEmbedder, OllamaEmbedder, OpenAiEmbedder, OpenAiEmbedderConfig,
    SharedEmbedder, build_embedder, cosine_similarity,
};

pub use anthropic::{AnthropicBackend, AnthropicConfig};
pub use openai::{OpenAiBackend, OpenAiConfig};

pub use client::{BackendSpec, Provider, build_backend};
