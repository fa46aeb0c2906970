//! Recipient resolution and grouping.
//!
//! Internal recipients (known users) are grouped by locale so translated
//! boilerplate is rendered once per language; all other addresses form a
//! single external group.
//!
//! # Modules
//!
//! - `address` - Mail addresses and header roles
//! - `directory` - User lookup seam and an in-memory directory
//! - `splitter` - Internal/external partitioning
//! - `error` - Directory error types

pub mod address;
pub mod directory;
pub mod error;
pub mod splitter;

#[cfg(test)]
mod splitter_props;

pub use address::{MailAddress, Recipient, RecipientKind};
pub use directory::{DirectoryUser, StaticDirectory, UserResolver};
pub use error::DirectoryError;
pub use splitter::{RecipientGroup, RecipientSplitter, dedup_recipients};
