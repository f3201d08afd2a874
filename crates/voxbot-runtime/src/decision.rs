//! [`DecisionEngine`] – rule-based mapping from an understood intent to an
//! optional [`Action`].
//!
//! | intent | outcome |
//! |---|---|
//! | `language_change` | no action |
//! | a catalogued action type | that action, catalogued params copied from entities |
//! | `action_request` | no action for content generation, else `entities.action_type` (default `execute_task`) |
//! | `information_request` | `fetch_information` unless the topic is missing or already known |
//! | `task_specific` | task keyword → action type (default `execute_task`) |
//! | anything else | no action |

use serde_json::{Value, json};
use tracing::{debug, info};
use voxbot_types::{Action, Params, VoxError};

use crate::context::AgentMemory;

/// Catalogue entry for one action type.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ActionSpec {
    pub action_type: &'static str,
    pub description: &'static str,
    pub required: &'static [&'static str],
    pub optional: &'static [&'static str],
}

/// Every action the engine may produce.
pub const ACTION_CATALOGUE: &[ActionSpec] = &[
    ActionSpec {
        action_type: "fetch_information",
        description: "Fetch information on a topic",
        required: &["topic"],
        optional: &["filters"],
    },
    ActionSpec {
        action_type: "send_message",
        description: "Send a message",
        required: &["recipient", "content"],
        optional: &["priority"],
    },
    ActionSpec {
        action_type: "create_item",
        description: "Create a new item",
        required: &["item_type", "details"],
        optional: &[],
    },
    ActionSpec {
        action_type: "update_item",
        description: "Update an existing item",
        required: &["item_id", "updates"],
        optional: &[],
    },
    ActionSpec {
        action_type: "delete_item",
        description: "Delete an item",
        required: &["item_id"],
        optional: &["confirm"],
    },
    ActionSpec {
        action_type: "execute_task",
        description: "Execute a specific task",
        required: &["task"],
        optional: &["details"],
    },
    ActionSpec {
        action_type: "search",
        description: "Search for information",
        required: &["query"],
        optional: &["filters", "limit"],
    },
];

/// Fallback action type for requests that name no catalogued action.
const GENERIC_ACTION: &str = "execute_task";

/// Tasks answered by the assistant itself rather than an action.
const CONTENT_TASKS: &[&str] = &["recite a poem", "tell a story", "sing a song", "read poetry"];

const CONTENT_KEYWORDS: &[&str] = &[
    "poem", "poetry", "诗", "朗读", "念", "recite", "read", // poems
    "story", "tale", "narrative", "故事", // stories
    "song", "sing", "歌", // songs
    "summary", "summarize", "summarization", "overview", "brief",
];

const SUMMARY_KEYWORDS: &[&str] = &["summary", "summarize", "summarization", "overview", "brief"];

/// First match wins.
const TASK_KEYWORDS: &[(&str, &str)] = &[
    ("send", "send_message"),
    ("create", "create_item"),
    ("update", "update_item"),
    ("delete", "delete_item"),
    ("search", "search"),
    ("find", "search"),
];

#[derive(Debug, Default, Clone)]
pub struct DecisionEngine;

impl DecisionEngine {
    pub fn new() -> Self {
        Self
    }

    pub fn spec(&self, action_type: &str) -> Option<&'static ActionSpec> {
        ACTION_CATALOGUE.iter().find(|s| s.action_type == action_type)
    }

    /// Decide what, if anything, to execute for `intent`.
    pub fn decide(&self, intent: &str, entities: &Params, memory: &AgentMemory) -> Option<Action> {
        info!(intent, "deciding action");

        if intent == "language_change" {
            debug!(language = ?entities.get("language"), "language change needs no action");
            return None;
        }
        if let Some(spec) = self.spec(intent) {
            return Some(action_from_intent(spec, entities));
        }
        match intent {
            "action_request" => self.action_request(entities),
            "information_request" => information_request(entities, memory),
            "task_specific" => task_specific(entities),
            _ => None,
        }
    }

    /// Check that `action` names a catalogued type and carries its required
    /// parameters.
    pub fn validate(&self, action: &Action) -> Result<(), VoxError> {
        if action.action_type.is_empty() {
            return Err(VoxError::MissingActionType);
        }
        let spec = self
            .spec(&action.action_type)
            .ok_or_else(|| VoxError::UnsupportedAction(action.action_type.clone()))?;
        match spec.required.iter().find(|p| !action.parameters.contains_key(**p)) {
            Some(missing) => Err(VoxError::MissingParameter((*missing).to_string())),
            None => Ok(()),
        }
    }

    fn action_request(&self, entities: &Params) -> Option<Action> {
        let task = entities.get("task").and_then(Value::as_str);
        let task_specific = entities
            .get("task_specific")
            .and_then(Value::as_str)
            .map(str::to_lowercase)
            .unwrap_or_default();

        if let Some(task) = task {
            if CONTENT_TASKS.contains(&task) || contains_any(&task.to_lowercase(), SUMMARY_KEYWORDS) {
                info!(task, "content generation request; no action");
                return None;
            }
        }
        if contains_any(&task_specific, CONTENT_KEYWORDS) {
            info!(task_specific = %task_specific, "content generation request; no action");
            return None;
        }

        let action_type = entities
            .get("action_type")
            .and_then(Value::as_str)
            .filter(|t| self.spec(t).is_some())
            .unwrap_or(GENERIC_ACTION);

        let mut action = Action::new(action_type);
        action.parameters = entities
            .iter()
            .filter(|(k, _)| k.as_str() != "action_type")
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect();
        Some(action)
    }
}

fn contains_any(haystack: &str, needles: &[&str]) -> bool {
    needles.iter().any(|n| haystack.contains(n))
}

fn action_from_intent(spec: &ActionSpec, entities: &Params) -> Action {
    let mut action = Action::new(spec.action_type);
    for name in spec.required.iter().chain(spec.optional) {
        if let Some(value) = entities.get(*name) {
            action.parameters.insert((*name).to_string(), value.clone());
        }
    }
    action
}

fn information_request(entities: &Params, memory: &AgentMemory) -> Option<Action> {
    let topic = entities.get("topic").and_then(Value::as_str).filter(|t| !t.is_empty())?;
    if memory.knows_topic(topic) {
        debug!(topic, "topic already known; no action");
        return None;
    }
    let filters = entities.get("filters").cloned().unwrap_or_else(|| json!({}));
    Some(
        Action::new("fetch_information")
            .with_param("topic", topic)
            .with_param("filters", filters),
    )
}

fn task_specific(entities: &Params) -> Option<Action> {
    let task = entities.get("task").and_then(Value::as_str).filter(|t| !t.is_empty())?;
    let lowered = task.to_lowercase();
    let action_type = TASK_KEYWORDS
        .iter()
        .find(|(keyword, _)| lowered.contains(keyword))
        .map(|(_, action_type)| *action_type)
        .unwrap_or(GENERIC_ACTION);

    Some(
        Action::new(action_type)
            .with_param("task", task)
            .with_param("details", Value::Object(entities.clone())),
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entities(value: Value) -> Params {
        match value {
            Value::Object(map) => map,
            _ => panic!("entities must be an object"),
        }
    }

    fn decide(intent: &str, e: Value) -> Option<Action> {
        DecisionEngine::new().decide(intent, &entities(e), &AgentMemory::new())
    }

    #[test]
    fn language_change_needs_no_action() {
        assert_eq!(decide("language_change", json!({"language": "es"})), None);
    }

    #[test]
    fn catalogued_intent_copies_only_known_params() {
        let action = decide(
            "send_message",
            json!({"recipient": "sam", "content": "hi", "priority": "high", "mood": "cheery"}),
        )
        .unwrap();
        assert_eq!(action.action_type, "send_message");
        assert_eq!(
            Value::Object(action.parameters),
            json!({"recipient": "sam", "content": "hi", "priority": "high"})
        );
    }

    #[test]
    fn action_request_skips_content_generation() {
        assert_eq!(decide("action_request", json!({"task": "tell a story"})), None);
        assert_eq!(decide("action_request", json!({"task_specific": "Recite a POEM please"})), None);
        assert_eq!(decide("action_request", json!({"task": "give me a brief"})), None);
    }

    #[test]
    fn action_request_uses_named_or_generic_type() {
        let named = decide("action_request", json!({"action_type": "search", "query": "rust"})).unwrap();
        assert_eq!(named.action_type, "search");
        assert_eq!(Value::Object(named.parameters), json!({"query": "rust"}));

        let unknown = decide("action_request", json!({"action_type": "launch", "task": "go"})).unwrap();
        assert_eq!(unknown.action_type, "execute_task");
        assert_eq!(unknown.param("task"), Some(&json!("go")));
        assert!(unknown.param("action_type").is_none());
    }

    #[test]
    fn information_request_fetches_unknown_topics_only() {
        let engine = DecisionEngine::new();
        let mut memory = AgentMemory::new();
        let e = entities(json!({"topic": "weather"}));

        let action = engine.decide("information_request", &e, &memory).unwrap();
        assert_eq!(action.action_type, "fetch_information");
        assert_eq!(action.param("filters"), Some(&json!({})));

        let mut data = Params::new();
        data.insert("topic".into(), json!("weather"));
        memory.record_result(&action, &voxbot_types::ActionResult::ok(data));
        assert_eq!(engine.decide("information_request", &e, &memory), None);

        assert_eq!(engine.decide("information_request", &Params::new(), &memory), None);
    }

    #[test]
    fn task_specific_maps_keywords_in_order() {
        let cases = [
            ("Send the report", "send_message"),
            ("create a note", "create_item"),
            ("find my keys", "search"),
            ("delete and search", "delete_item"),
            ("water the plants", "execute_task"),
        ];
        for (task, expected) in cases {
            let action = decide("task_specific", json!({"task": task})).unwrap();
            assert_eq!(action.action_type, expected, "task {task:?}");
            assert_eq!(action.param("task"), Some(&json!(task)));
            assert_eq!(action.param("details"), Some(&json!({"task": task})));
        }
        assert_eq!(decide("task_specific", json!({})), None);
    }

    #[test]
    fn other_intents_need_no_action() {
        assert_eq!(decide("greeting", json!({})), None);
        assert_eq!(decide("farewell", json!({})), None);
    }

    #[test]
    fn validate_checks_type_and_required_params() {
        let engine = DecisionEngine::new();
        assert_eq!(engine.validate(&Action::new("")), Err(VoxError::MissingActionType));
        assert_eq!(
            engine.validate(&Action::new("launch")),
            Err(VoxError::UnsupportedAction("launch".into()))
        );
        assert_eq!(
            engine.validate(&Action::new("send_message").with_param("recipient", "sam")),
            Err(VoxError::MissingParameter("content".into()))
        );
        assert_eq!(engine.validate(&Action::new("search").with_param("query", "x")), Ok(()));
    }
}
