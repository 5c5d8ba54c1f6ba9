pub mod chat;
pub mod memory;
pub mod messages;
pub mod summary;
pub mod utils;
