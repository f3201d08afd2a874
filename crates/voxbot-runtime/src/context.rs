//! In-memory session state: [`ConversationContext`] and [`AgentMemory`].
//!
//! Nothing here is persisted; both live as long as the
//! [`Voicebot`][crate::voicebot::Voicebot] that owns them.

use std::collections::{BTreeSet, VecDeque};
use std::time::{Duration, Instant};

use chrono::{DateTime, Utc};
use tracing::debug;
use voxbot_types::{Action, ActionResult};

use crate::llm_oracle::{ChatMessage, Role};

/// Default number of user/assistant turn pairs remembered.
pub const DEFAULT_MAX_TURNS: usize = 10;

/// Clarification requests older than this no longer count.
const CLARIFICATION_WINDOW: Duration = Duration::from_secs(300);

/// Number of interactions [`AgentMemory`] keeps.
const RECENT_INTERACTIONS: usize = 20;

// ─────────────────────────────────────────────────────────────────────────────
// ConversationContext
// ─────────────────────────────────────────────────────────────────────────────

/// Rolling conversation history holding at most `2 * max_turns` messages.
#[derive(Debug, Clone)]
pub struct ConversationContext {
    max_turns: usize,
    history: VecDeque<ChatMessage>,
}

impl Default for ConversationContext {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_TURNS)
    }
}

impl ConversationContext {
    pub fn new(max_turns: usize) -> Self {
        Self {
            max_turns,
            history: VecDeque::with_capacity(max_turns * 2),
        }
    }

    pub fn max_turns(&self) -> usize {
        self.max_turns
    }

    /// Append a user message.  Empty strings are ignored.
    pub fn add_user_message(&mut self, message: &str) {
        self.push(Role::User, message);
    }

    /// Append an assistant message.  Empty strings are ignored.
    pub fn add_assistant_message(&mut self, message: &str) {
        self.push(Role::Assistant, message);
    }

    fn push(&mut self, role: Role, message: &str) {
        let capacity = self.max_turns * 2;
        if message.is_empty() || capacity == 0 {
            return;
        }
        while self.history.len() >= capacity {
            self.history.pop_front();
        }
        debug!(?role, len = message.len(), "message added to context");
        self.history.push_back(ChatMessage {
            role,
            content: message.to_string(),
        });
    }

    pub fn history(&self) -> impl Iterator<Item = &ChatMessage> {
        self.history.iter()
    }

    pub fn len(&self) -> usize {
        self.history.len()
    }

    pub fn is_empty(&self) -> bool {
        self.history.is_empty()
    }

    /// History as `"User: …\nAssistant: …"` lines.
    pub fn formatted_history(&self) -> String {
        self.history
            .iter()
            .map(|m| {
                let speaker = match m.role {
                    Role::System => "System",
                    Role::User => "User",
                    Role::Assistant => "Assistant",
                };
                format!("{speaker}: {}", m.content)
            })
            .collect::<Vec<_>>()
            .join("\n")
    }

    /// Most recent user message, or `""`.
    pub fn last_user_message(&self) -> &str {
        self.last_by(Role::User)
    }

    /// Most recent assistant message, or `""`.
    pub fn last_assistant_message(&self) -> &str {
        self.last_by(Role::Assistant)
    }

    fn last_by(&self, role: Role) -> &str {
        self.history
            .iter()
            .rev()
            .find(|m| m.role == role)
            .map(|m| m.content.as_str())
            .unwrap_or("")
    }

    pub fn clear(&mut self) {
        self.history.clear();
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// AgentMemory
// ─────────────────────────────────────────────────────────────────────────────

/// One remembered interaction.
#[derive(Debug, Clone)]
pub struct Interaction {
    pub at: DateTime<Utc>,
    pub intent: String,
}

/// What the agent has learned during this session.
#[derive(Debug, Default)]
pub struct AgentMemory {
    interaction_count: u64,
    recent: VecDeque<Interaction>,
    known_topics: BTreeSet<String>,
    clarification_count: u32,
    last_clarification: Option<Instant>,
}

impl AgentMemory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_interaction(&mut self, intent: &str) {
        if self.recent.len() >= RECENT_INTERACTIONS {
            self.recent.pop_front();
        }
        self.recent.push_back(Interaction {
            at: Utc::now(),
            intent: intent.to_string(),
        });
        self.interaction_count += 1;
    }

    /// Learn from an executed action.  A successful `fetch_information`
    /// makes its topic known.
    pub fn record_result(&mut self, action: &Action, result: &ActionResult) {
        if !result.success || action.action_type != "fetch_information" {
            return;
        }
        let topic = result
            .data_field("topic")
            .or_else(|| action.param("topic"))
            .and_then(|v| v.as_str());
        if let Some(topic) = topic {
            debug!(topic, "topic learned");
            self.known_topics.insert(topic.to_lowercase());
        }
    }

    pub fn is_first_interaction(&self) -> bool {
        self.interaction_count == 0
    }

    pub fn interaction_count(&self) -> u64 {
        self.interaction_count
    }

    pub fn recent_interactions(&self) -> impl Iterator<Item = &Interaction> {
        self.recent.iter()
    }

    /// Case-insensitive.
    pub fn knows_topic(&self, topic: &str) -> bool {
        self.known_topics.contains(&topic.to_lowercase())
    }

    pub fn known_topics(&self) -> impl Iterator<Item = &str> {
        self.known_topics.iter().map(String::as_str)
    }

    /// Clarifications asked within the last five minutes.
    pub fn recent_clarifications(&self, now: Instant) -> u32 {
        match self.last_clarification {
            Some(at) if now.saturating_duration_since(at) <= CLARIFICATION_WINDOW => {
                self.clarification_count
            }
            _ => 0,
        }
    }

    pub fn record_clarification(&mut self, now: Instant) {
        self.clarification_count = self.recent_clarifications(now) + 1;
        self.last_clarification = Some(now);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn history_is_bounded_to_twice_max_turns() {
        let mut ctx = ConversationContext::new(2);
        for i in 0..3 {
            ctx.add_user_message(&format!("q{i}"));
            ctx.add_assistant_message(&format!("a{i}"));
        }
        assert_eq!(ctx.len(), 4);
        assert_eq!(ctx.formatted_history(), "User: q1\nAssistant: a1\nUser: q2\nAssistant: a2");
    }

    #[test]
    fn empty_messages_are_ignored() {
        let mut ctx = ConversationContext::default();
        ctx.add_user_message("");
        ctx.add_assistant_message("");
        assert!(ctx.is_empty());
        assert_eq!(ctx.last_user_message(), "");
    }

    #[test]
    fn last_messages_by_role() {
        let mut ctx = ConversationContext::default();
        ctx.add_user_message("hello");
        ctx.add_assistant_message("hi there");
        ctx.add_user_message("weather?");
        assert_eq!(ctx.last_user_message(), "weather?");
        assert_eq!(ctx.last_assistant_message(), "hi there");

        ctx.clear();
        assert_eq!(ctx.last_assistant_message(), "");
    }

    #[test]
    fn successful_fetch_teaches_topic() {
        let mut memory = AgentMemory::new();
        let action = Action::new("fetch_information").with_param("topic", "Weather");
        let mut data = voxbot_types::Params::new();
        data.insert("topic".into(), json!("Weather"));

        memory.record_result(&action, &ActionResult::failure("down"));
        assert!(!memory.knows_topic("weather"));

        memory.record_result(&action, &ActionResult::ok(data));
        assert!(memory.knows_topic("weather"));
        assert!(memory.knows_topic("WEATHER"));
        assert_eq!(memory.known_topics().collect::<Vec<_>>(), vec!["weather"]);
    }

    #[test]
    fn interactions_are_counted_and_bounded() {
        let mut memory = AgentMemory::new();
        assert!(memory.is_first_interaction());
        for _ in 0..25 {
            memory.record_interaction("greeting");
        }
        assert!(!memory.is_first_interaction());
        assert_eq!(memory.interaction_count(), 25);
        assert_eq!(memory.recent_interactions().count(), RECENT_INTERACTIONS);
    }

    #[test]
    fn clarifications_expire_after_window() {
        let mut memory = AgentMemory::new();
        let t0 = Instant::now();
        memory.record_clarification(t0);
        memory.record_clarification(t0);
        assert_eq!(memory.recent_clarifications(t0), 2);
        assert_eq!(memory.recent_clarifications(t0 + Duration::from_secs(301)), 0);

        memory.record_clarification(t0 + Duration::from_secs(400));
        assert_eq!(memory.recent_clarifications(t0 + Duration::from_secs(400)), 1);
    }
}
