//! `voxbot-handlers` – in-process action handlers.
//!
//! Actions whose type has a registered handler are satisfied locally without
//! any network call.
//!
//! # Modules
//!
//! - [`handler`] – the [`ActionHandler`] trait every local handler implements,
//!   plus [`HandlerError`] and parameter extraction helpers.
//! - [`registry`] – [`HandlerRegistry`]: maps action types to handlers and
//!   converts every handler failure (including panics) into a failed
//!   [`ActionResult`][voxbot_types::ActionResult].
//! - [`builtin`] – the stock handlers: `fetch_information`, `send_message`,
//!   `execute_task` and `search`.

pub mod builtin;
pub mod handler;
pub mod registry;

pub use builtin::{ExecuteTaskHandler, FetchInformationHandler, SearchHandler, SendMessageHandler};
pub use handler::{ActionHandler, HandlerError};
pub use registry::HandlerRegistry;
