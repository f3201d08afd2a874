//! [`Voicebot`] – one conversational turn, from utterance to spoken reply.
//!
//! ```text
//!  utterance ─▶ understand ─▶ decide ─┬─ action ─▶ execute ─▶ generate(action_success | action_failure)
//!                                     └─ none   ─────────────▶ generate(intent)
//!                                                                   │
//!                                                          speak(reply, emotion)
//! ```
//!
//! Oracle failures never end the session: the turn degrades to
//! [`FALLBACK_REPLY`] spoken with [`Emotion::Concerned`].

use std::sync::Arc;
use std::time::Instant;

use serde_json::json;
use tracing::{info, warn};
use voxbot_types::{Emotion, VoxError};

use crate::client::ActionExecutionClient;
use crate::collaborators::{LanguageOracle, Reply, SpeechRecognizer, SpeechSynthesizer};
use crate::context::{AgentMemory, ConversationContext};
use crate::decision::DecisionEngine;

/// Spoken when a turn cannot be processed.
pub const FALLBACK_REPLY: &str = "I'm having trouble processing that right now.";

/// Spoken for the very first greeting of a session.
pub const WELCOME_REPLY: &str = "Hello! I'm your emotional voicebot assistant. How can I help you today?";

/// Clarifications asked within five minutes before unknown intents are
/// answered directly.
const MAX_CLARIFICATIONS: u32 = 2;

pub struct Voicebot {
    client: Arc<ActionExecutionClient>,
    oracle: Box<dyn LanguageOracle>,
    synthesizer: Box<dyn SpeechSynthesizer>,
    recognizer: Option<Box<dyn SpeechRecognizer>>,
    decision: DecisionEngine,
    context: ConversationContext,
    memory: AgentMemory,
}

impl Voicebot {
    pub fn new(
        client: Arc<ActionExecutionClient>,
        oracle: Box<dyn LanguageOracle>,
        synthesizer: Box<dyn SpeechSynthesizer>,
    ) -> Self {
        Self {
            client,
            oracle,
            synthesizer,
            recognizer: None,
            decision: DecisionEngine::new(),
            context: ConversationContext::default(),
            memory: AgentMemory::new(),
        }
    }

    /// Enable [`handle_audio`][Self::handle_audio].
    pub fn with_recognizer(mut self, recognizer: Box<dyn SpeechRecognizer>) -> Self {
        self.recognizer = Some(recognizer);
        self
    }

    pub fn with_context(mut self, context: ConversationContext) -> Self {
        self.context = context;
        self
    }

    pub fn context(&self) -> &ConversationContext {
        &self.context
    }

    pub fn memory(&self) -> &AgentMemory {
        &self.memory
    }

    /// Transcribe `audio` and answer it.  `None` when nothing was heard or
    /// no recognizer is configured.
    pub async fn handle_audio(&mut self, audio: &[u8]) -> Option<Reply> {
        let Some(recognizer) = &self.recognizer else {
            warn!("audio received but no speech recognizer is configured");
            return None;
        };
        let transcript = match recognizer.transcribe(audio).await {
            Ok(t) => t,
            Err(e) => {
                warn!(error = %e, "transcription failed");
                return None;
            }
        };
        let transcript = transcript.trim();
        if transcript.is_empty() {
            return None;
        }
        info!(transcript, "speech recognized");
        Some(self.handle_text(transcript).await)
    }

    /// Answer one typed or transcribed utterance and speak the reply.
    pub async fn handle_text(&mut self, text: &str) -> Reply {
        self.context.add_user_message(text);

        let reply = match self.respond(text).await {
            Ok(reply) => reply,
            Err(e) => {
                warn!(error = %e, "turn failed; using fallback reply");
                Reply::new(FALLBACK_REPLY, Emotion::Concerned)
            }
        };

        self.context.add_assistant_message(&reply.text);
        info!(emotion = %reply.emotion, "speaking reply");
        if !self.synthesizer.speak(&reply.text, reply.emotion).await {
            warn!("speech synthesis failed");
        }
        reply
    }

    async fn respond(&mut self, text: &str) -> Result<Reply, VoxError> {
        let understanding = self.oracle.understand(text).await?;
        info!(intent = %understanding.intent, "intent recognized");

        let first = self.memory.is_first_interaction();
        self.memory.record_interaction(&understanding.intent);

        match understanding.intent.as_str() {
            "greeting" if first => return Ok(Reply::new(WELCOME_REPLY, Emotion::Happy)),
            "unknown" if self.memory.recent_clarifications(Instant::now()) < MAX_CLARIFICATIONS => {
                self.memory.record_clarification(Instant::now());
                let mut reason = voxbot_types::Params::new();
                reason.insert("reason".into(), json!("unclear_intent"));
                return self
                    .oracle
                    .generate("request_clarification", &reason, &self.context)
                    .await;
            }
            _ => {}
        }

        let Some(action) = self
            .decision
            .decide(&understanding.intent, &understanding.entities, &self.memory)
        else {
            return self
                .oracle
                .generate(&understanding.intent, &understanding.entities, &self.context)
                .await;
        };

        info!(action = %action.action_type, "executing action");
        let result = self.client.execute(&action).await;
        self.memory.record_result(&action, &result);

        let outcome = if result.success { "action_success" } else { "action_failure" };
        let mut entities = understanding.entities;
        entities.insert("action".into(), json!(action.action_type));
        entities.insert("result".into(), serde_json::to_value(&result)?);

        let mut reply = self.oracle.generate(outcome, &entities, &self.context).await?;
        if reply.emotion == Emotion::Neutral {
            reply.emotion = if result.success { Emotion::Happy } else { Emotion::Concerned };
        }
        Ok(reply)
    }
}
