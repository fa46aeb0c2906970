//! Object storage backing published attachments, using Apache OpenDAL.
//!
//! This module provides vendor-agnostic object storage with support for:
//! - S3-compatible: Cloudflare R2, Supabase Storage, AWS S3, DigitalOcean Spaces
//! - Azure Blob Storage
//! - Local filesystem (development only)
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────┐
//! │                      Apache OpenDAL                              │
//! │                   (Unified Storage API)                          │
//! ├────────────────────────────────┬────────────────────────────────┤
//! │ StorageService                 │ StorageDrive                   │
//! │  AttachmentStore               │  FolderAccess + FileAccess     │
//! │  {ctx}/{user}/{doc}/{file}     │  path folders, journaled       │
//! ├────────────────────────────────┴────────────────────────────────┤
//! │ StorageShareService: shares/{token}.json guest records          │
//! └─────────────────────────────────────────────────────────────────┘
//! ```

mod config;
mod drive;
mod error;
mod service;
mod shares;

pub use config::{StorageConfig, StorageProvider};
pub use drive::{DriveView, StorageDrive};
pub use error::StorageError;
pub use service::{PresignedUrl, StorageService};
pub use shares::StorageShareService;
