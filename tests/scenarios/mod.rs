//! Scenario tests against the in-process ircd
//!
//! - Connection: join, nick change, keepalive
//! - Messaging: channel and private traffic between two clients
//! - Services: service bots answering with NOTICE
//! - Waits: ordering, timeouts and isolation of the wait engine

pub mod connection;
pub mod services;
pub mod waits;
