//! Publishing of oversized attachments.
//!
//! When an attachment batch exceeds the upload quota the attachments are
//! stored durably and recipients receive links instead. Two strategies
//! exist:
//! - `store` - one stored document per attachment
//! - `sharelink` - one guest-shared folder holding every attachment
//!
//! Both are all-or-nothing per compose request: a failure discards
//! everything published so far.

mod error;
mod publisher;
mod share;
mod sharelink;
mod store;
mod types;

#[cfg(test)]
pub(crate) mod testing;
#[cfg(test)]
mod tests;

pub use error::{PublishError, ServiceError};
pub use publisher::Publisher;
pub use share::{GuestShare, ShareUrls, TokenShareService};
pub use sharelink::{FileAccess, FolderAccess, ShareLinkPublisher, ShareService, Transactional};
pub use store::{AttachmentStore, StorePublisher};
pub use types::{
    FolderInfo, GuestInfo, GuestOptions, LinkedAttachment, Principal, PublishContext,
    PublishMetadata, PublishRecord, PublishedLinks, ShareTarget, StoreMode,
};
