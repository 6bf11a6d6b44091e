// Library exports for inbox-relay crate
// This allows tests and the binary to use the modules

pub mod config;
pub mod credentials;
pub mod email;
pub mod error;
pub mod gmail_client;
pub mod inbox;
pub mod mailbox;
pub mod server;
