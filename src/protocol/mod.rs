//! Message vocabulary spoken between the console and the speech service.

pub mod client_messages;
pub mod frame;
pub mod models;
pub mod server_messages;
