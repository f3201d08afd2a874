//! Collaborator seams for the [`Voicebot`][crate::voicebot::Voicebot].
//!
//! Speech capture, speech output and language understanding are external
//! services; the voicebot only sees these traits.  Tests and the CLI plug in
//! their own implementations.

use async_trait::async_trait;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use voxbot_types::{Emotion, Params, VoxError};

use crate::context::ConversationContext;

/// Result of understanding one utterance.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize, JsonSchema)]
pub struct Understanding {
    /// Intent label, e.g. `greeting`, `information_request`, `task_specific`.
    pub intent: String,
    /// Entities extracted from the utterance.
    #[serde(default)]
    pub entities: Params,
}

impl Understanding {
    pub fn new(intent: impl Into<String>) -> Self {
        Self {
            intent: intent.into(),
            entities: Params::new(),
        }
    }

    pub fn with_entity(mut self, name: impl Into<String>, value: impl Into<serde_json::Value>) -> Self {
        self.entities.insert(name.into(), value.into());
        self
    }
}

/// What the assistant says, and how it should sound.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize, JsonSchema)]
pub struct Reply {
    pub text: String,
    #[serde(default)]
    pub emotion: Emotion,
}

impl Reply {
    pub fn new(text: impl Into<String>, emotion: Emotion) -> Self {
        Self {
            text: text.into(),
            emotion,
        }
    }
}

/// Audio in, transcript out.
#[async_trait]
pub trait SpeechRecognizer: Send + Sync {
    /// Transcribe `audio`.  An empty transcript means nothing was said.
    async fn transcribe(&self, audio: &[u8]) -> Result<String, VoxError>;
}

/// Text in, audible speech out.
#[async_trait]
pub trait SpeechSynthesizer: Send + Sync {
    /// Speak `text` with `emotion`.  Returns `false` if playback failed.
    async fn speak(&self, text: &str, emotion: Emotion) -> bool;
}

/// Intent extraction and reply generation.
#[async_trait]
pub trait LanguageOracle: Send + Sync {
    async fn understand(&self, text: &str) -> Result<Understanding, VoxError>;

    /// Produce a reply for `intent`.  `context` holds the conversation so
    /// far, including the user turn being answered.
    async fn generate(
        &self,
        intent: &str,
        entities: &Params,
        context: &ConversationContext,
    ) -> Result<Reply, VoxError>;
}
