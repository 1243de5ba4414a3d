//! Cached data-access layer for the Metlink (Wellington) public transit API.
//!
//! The stop and service lists are kept in a local SQLite store and repopulated
//! from the API once they are older than a day. Favourite marks live in their
//! own tables and survive every repopulation.

pub mod cache;
pub mod config;
pub mod db;
pub mod error;
pub mod logging;
pub mod metlink;

pub use error::{Error, Result};
