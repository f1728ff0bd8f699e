//! AI-coach chat core: keyword-rule replies and a busy/idle chat session,
//! plus the egui window that drives them.

pub mod ai;
pub mod config;
pub mod core;
pub mod logger;
pub mod ui;

pub use crate::ai::{KeywordRule, ResponseSelector, Selection};
pub use crate::config::{Config, ConfigError, SessionConfig};
pub use crate::core::{ChatSession, Message, ReplyStats, Role, SessionStatus, SubmitError};
