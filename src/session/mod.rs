pub mod manager;
pub mod store;

pub use manager::{ConversationManager, TurnResult};
pub use store::{Message, Role, Session, SessionConfig, SessionStore};
