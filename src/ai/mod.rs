pub mod local;

pub use local::{KeywordRule, ResponseSelector, Selection};
