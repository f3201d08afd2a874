//! Built-in local handlers.
//!
//! None of these reach the network.  Data is canned so the assistant can
//! answer common requests while the remote execution service is absent.

use serde_json::{Value, json};
use tracing::info;
use uuid::Uuid;
use voxbot_types::{ActionResult, Params};

use crate::handler::{ActionHandler, HandlerError, optional_u64, required_str};

/// Default number of results returned by [`SearchHandler`].
pub const DEFAULT_SEARCH_LIMIT: u64 = 5;

fn into_params(value: Value) -> Params {
    match value {
        Value::Object(map) => map,
        _ => Params::new(),
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// fetch_information
// ─────────────────────────────────────────────────────────────────────────────

/// `fetch_information { topic, filters? }`
///
/// `filters` may be a list of key names or an object whose keys are used.
/// When the filter selects at least one key only those keys are returned;
/// otherwise the full topic payload is.
pub struct FetchInformationHandler;

impl FetchInformationHandler {
    fn topic_data(topic: &str) -> Params {
        let value = match topic.to_lowercase().as_str() {
            "weather" => json!({
                "temperature": 72,
                "condition": "sunny",
                "humidity": 45,
                "wind_speed": 5
            }),
            "news" => json!({
                "headlines": [
                    "New AI breakthrough announced",
                    "Global climate summit begins today",
                    "Stock market reaches record high"
                ]
            }),
            "schedule" => json!({
                "upcoming_events": [
                    {"time": "2:00 PM", "title": "Team meeting"},
                    {"time": "4:30 PM", "title": "Client call"}
                ]
            }),
            _ => json!({ "info": format!("No specific data available for {topic}") }),
        };
        into_params(value)
    }

    fn filter_keys(filters: Option<&Value>) -> Vec<String> {
        match filters {
            Some(Value::Array(items)) => items
                .iter()
                .filter_map(|v| v.as_str().map(str::to_string))
                .collect(),
            Some(Value::Object(map)) => map.keys().cloned().collect(),
            _ => Vec::new(),
        }
    }
}

impl ActionHandler for FetchInformationHandler {
    fn action_type(&self) -> &str {
        "fetch_information"
    }

    fn handle(&self, params: &Params) -> Result<ActionResult, HandlerError> {
        let topic = required_str(params, "topic")?;
        info!(topic, "fetching information");

        let mut data = Self::topic_data(topic);
        let keys = Self::filter_keys(params.get("filters"));
        if !keys.is_empty() {
            let filtered: Params = data
                .iter()
                .filter(|(k, _)| keys.iter().any(|f| f == *k))
                .map(|(k, v)| (k.clone(), v.clone()))
                .collect();
            if !filtered.is_empty() {
                data = filtered;
            }
        }

        data.insert("topic".into(), json!(topic));
        Ok(ActionResult::ok(data))
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// send_message
// ─────────────────────────────────────────────────────────────────────────────

/// `send_message { recipient, content }`
pub struct SendMessageHandler;

impl ActionHandler for SendMessageHandler {
    fn action_type(&self) -> &str {
        "send_message"
    }

    fn handle(&self, params: &Params) -> Result<ActionResult, HandlerError> {
        let recipient = required_str(params, "recipient")?;
        let _content = required_str(params, "content")?;
        info!(recipient, "sending message");

        Ok(ActionResult::ok(into_params(json!({
            "message_id": format!("msg_{}", Uuid::new_v4().simple()),
            "recipient": recipient,
            "status": "sent"
        }))))
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// execute_task
// ─────────────────────────────────────────────────────────────────────────────

/// `execute_task { task, details? }`
pub struct ExecuteTaskHandler;

impl ActionHandler for ExecuteTaskHandler {
    fn action_type(&self) -> &str {
        "execute_task"
    }

    fn handle(&self, params: &Params) -> Result<ActionResult, HandlerError> {
        let task = required_str(params, "task")?;
        info!(task, "executing task");

        Ok(ActionResult::ok(into_params(json!({
            "task": task,
            "status": "completed",
            "result": format!("Task '{task}' executed successfully")
        }))))
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// search
// ─────────────────────────────────────────────────────────────────────────────

/// `search { query, limit?, filters? }`
pub struct SearchHandler;

impl ActionHandler for SearchHandler {
    fn action_type(&self) -> &str {
        "search"
    }

    fn handle(&self, params: &Params) -> Result<ActionResult, HandlerError> {
        let query = required_str(params, "query")?;
        let limit = optional_u64(params, "limit")?.unwrap_or(DEFAULT_SEARCH_LIMIT);
        info!(query, limit, "searching");

        let results: Vec<Value> = (1..=DEFAULT_SEARCH_LIMIT)
            .take(limit as usize)
            .map(|n| {
                json!({
                    "title": format!("Result {n}"),
                    "description": format!("Description for result {n}")
                })
            })
            .collect();

        Ok(ActionResult::ok(into_params(json!({
            "query": query,
            "total_results": results.len(),
            "results": results
        }))))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn params(v: Value) -> Params {
        into_params(v)
    }

    #[test]
    fn fetch_weather_returns_canned_data_with_topic() {
        let result = FetchInformationHandler
            .handle(&params(json!({"topic": "Weather"})))
            .unwrap();
        assert!(result.success);
        assert_eq!(result.data_field("topic"), Some(&json!("Weather")));
        assert_eq!(result.data_field("condition"), Some(&json!("sunny")));
    }

    #[test]
    fn fetch_unknown_topic_returns_info_message() {
        let result = FetchInformationHandler
            .handle(&params(json!({"topic": "volcanoes"})))
            .unwrap();
        assert_eq!(
            result.data_field("info"),
            Some(&json!("No specific data available for volcanoes"))
        );
    }

    #[test]
    fn fetch_filters_select_subset_of_keys() {
        let result = FetchInformationHandler
            .handle(&params(json!({"topic": "weather", "filters": ["humidity"]})))
            .unwrap();
        let data = result.data.unwrap();
        assert_eq!(data.len(), 2, "filtered key plus topic");
        assert_eq!(data.get("humidity"), Some(&json!(45)));
        assert!(data.get("condition").is_none());
    }

    #[test]
    fn fetch_filters_matching_nothing_keep_full_payload() {
        let result = FetchInformationHandler
            .handle(&params(json!({"topic": "weather", "filters": {"pressure": true}})))
            .unwrap();
        assert!(result.data_field("condition").is_some());
    }

    #[test]
    fn fetch_without_topic_is_rejected() {
        let err = FetchInformationHandler.handle(&Params::new()).unwrap_err();
        assert_eq!(err.to_string(), "Missing required parameter: topic");
    }

    #[test]
    fn send_message_checks_recipient_before_content() {
        let err = SendMessageHandler.handle(&Params::new()).unwrap_err();
        assert_eq!(err, HandlerError::MissingParameter("recipient".into()));

        let err = SendMessageHandler
            .handle(&params(json!({"recipient": "alice"})))
            .unwrap_err();
        assert_eq!(err, HandlerError::MissingParameter("content".into()));
    }

    #[test]
    fn send_message_reports_sent_status() {
        let result = SendMessageHandler
            .handle(&params(json!({"recipient": "alice", "content": "hi"})))
            .unwrap();
        assert_eq!(result.data_field("status"), Some(&json!("sent")));
        let id = result.data_field("message_id").and_then(Value::as_str).unwrap();
        assert!(id.starts_with("msg_"));
    }

    #[test]
    fn execute_task_echoes_task_name() {
        let result = ExecuteTaskHandler
            .handle(&params(json!({"task": "water plants"})))
            .unwrap();
        assert_eq!(
            result.data_field("result"),
            Some(&json!("Task 'water plants' executed successfully"))
        );
    }

    #[test]
    fn search_defaults_to_five_results() {
        let result = SearchHandler.handle(&params(json!({"query": "rust"}))).unwrap();
        assert_eq!(result.data_field("total_results"), Some(&json!(5)));
    }

    #[test]
    fn search_respects_limit() {
        let result = SearchHandler
            .handle(&params(json!({"query": "rust", "limit": 2})))
            .unwrap();
        assert_eq!(result.data_field("total_results"), Some(&json!(2)));
        let results = result.data_field("results").and_then(Value::as_array).unwrap();
        assert_eq!(results[1]["title"], "Result 2");
    }
}
