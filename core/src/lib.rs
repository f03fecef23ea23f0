pub mod agents;
pub mod chat;
pub mod error;
pub mod reply;
