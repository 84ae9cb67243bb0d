// Library root: the resolution engine plus the QR server's settings.
// The binary entry point is src/main.rs.

pub mod config;
pub mod error;
pub mod logger;
pub mod server_config;
