//! ircprobe - async wait-and-match harness for IRC servers
//!
//! Drives one or more simulated users against a live server and asserts on
//! its unordered, asynchronous replies:
//!
//! ```rust,ignore
//! use ircprobe::{create_test_client, ClientConfig};
//!
//! let client = create_test_client(ClientConfig::new("u1").with_server("127.0.0.1", 6667)).await?;
//! client.join("#test");
//! let line = client.wait_for_raw("(?i)JOIN.*#test").await?;
//! assert!(line.contains("#test"));
//! client.disconnect("done").await;
//! ```

pub mod buffer;
pub mod client;
pub mod config;
pub mod connection;
pub mod error;
pub mod lifecycle;
pub mod wait;

pub use buffer::{Line, LineBuffer};
pub use client::{create_test_client, unique_name, TestClient};
pub use config::{ClientConfig, HarnessConfig};
pub use connection::{Event, Message, RawLine};
pub use error::{Error, Result};
pub use lifecycle::ConnectionState;
pub use wait::{await_first, Deadline, IntoPattern};
