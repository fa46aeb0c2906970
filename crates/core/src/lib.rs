//! Core logic for Attachlink.
//!
//! Decides, for the attachments of one outbound mail, whether they are sent
//! inline, rejected, or published to durable storage and replaced by links.
//! Publishing is all-or-nothing per compose request.
//!
//! # Modules
//!
//! - `quota` - Per-file and per-mail upload limits
//! - `compose` - Attachment handlers and outbound mail generation
//! - `recipients` - Internal/external recipient grouping by locale
//! - `publish` - Publishing strategies with compensating rollback
//! - `i18n` - Translated boilerplate
//! - `storage` - OpenDAL-backed document store and drive
//! - `transport` - SMTP handoff

pub mod compose;
pub mod i18n;
pub mod publish;
pub mod quota;
pub mod recipients;
pub mod storage;
pub mod transport;
