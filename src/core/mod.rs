pub mod message;
pub mod session;

pub use message::{Message, Role, SessionStatus};
pub use session::{ChatSession, ReplyStats, SubmitError};
