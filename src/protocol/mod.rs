pub mod chunk;
pub mod events;
pub mod message;
pub mod prompt;
