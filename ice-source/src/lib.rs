//! IceCast source client: TCP connection, SOURCE login session and config.

pub mod config;
pub mod connection;
pub mod session;

pub use config::Config;
pub use connection::{Connection, ConnectionEvent, DisconnectHandle};
pub use session::{ServerConfig, Session, SessionError};
