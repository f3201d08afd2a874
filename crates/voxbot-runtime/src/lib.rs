//! `voxbot-runtime` – the voicebot's brain and its route to the outside world.
//!
//! # Modules
//!
//! - [`client`] – [`ActionExecutionClient`][client::ActionExecutionClient]:
//!   the single entry point for executing an action.  Local handlers win;
//!   everything else goes to the transport picked from the endpoint scheme.
//! - [`collaborators`] – the seams the voicebot talks through:
//!   [`SpeechRecognizer`][collaborators::SpeechRecognizer],
//!   [`SpeechSynthesizer`][collaborators::SpeechSynthesizer] and
//!   [`LanguageOracle`][collaborators::LanguageOracle].
//! - [`decision`] – [`DecisionEngine`][decision::DecisionEngine]: rule-based
//!   mapping from an understood intent to an optional [`Action`][voxbot_types::Action].
//! - [`context`] – [`ConversationContext`][context::ConversationContext]
//!   (bounded turn history) and [`AgentMemory`][context::AgentMemory].
//! - [`llm_oracle`] – [`LlmOracle`][llm_oracle::LlmOracle]: a
//!   [`LanguageOracle`][collaborators::LanguageOracle] backed by an
//!   OpenAI-compatible `/v1/chat/completions` endpoint.
//! - [`voicebot`] – [`Voicebot`][voicebot::Voicebot]: one conversational
//!   turn, from utterance to spoken reply.
//! - [`telemetry`] – [`init_tracing`][telemetry::init_tracing]:
//!   initialises the global `tracing` subscriber with an optional OTLP span
//!   exporter.

pub mod client;
pub mod collaborators;
pub mod context;
pub mod decision;
pub mod llm_oracle;
pub mod telemetry;
pub mod voicebot;

pub use client::ActionExecutionClient;
pub use collaborators::{LanguageOracle, Reply, SpeechRecognizer, SpeechSynthesizer, Understanding};
pub use context::{AgentMemory, ConversationContext};
pub use decision::DecisionEngine;
pub use llm_oracle::{ChatMessage, LlmOracle, OracleError, Role};
pub use telemetry::{TracerProviderGuard, init_tracing};
pub use voicebot::{FALLBACK_REPLY, Voicebot};
