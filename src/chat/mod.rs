//! Conversational assistant over the active analysis.

pub mod context;
pub mod session;

pub use context::{ChatContextBuilder, CONTEXT_PUBLICATIONS};
pub use session::ChatSession;
