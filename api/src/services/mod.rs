pub mod accounts;
pub mod journal;
pub mod messages;
pub mod push;
pub mod push_tokens;
pub mod reactions;
pub mod signals;
pub mod users;
