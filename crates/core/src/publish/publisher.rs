//! Publishing strategy used when an attachment batch exceeds the quota.

use super::error::PublishError;
use super::types::{PublishContext, PublishedLinks};
use crate::compose::AttachmentPart;

/// Stores oversized attachments durably and hands back links to them.
///
/// The handler brackets [`Publisher::publish_attachments`] and the rest of
/// mail generation with `start_transaction`, then `commit` or `rollback`,
/// and always `finish`. A publisher that stores anything must undo it in
/// `rollback`; the set of publications is all-or-nothing per compose request.
pub trait Publisher: Send {
    /// Begin the publish transaction.
    fn start_transaction(
        &mut self,
    ) -> impl std::future::Future<Output = Result<(), PublishError>> + Send {
        async { Ok(()) }
    }

    /// Publish every attachment and return the links to render.
    fn publish_attachments(
        &mut self,
        ctx: &PublishContext<'_>,
        attachments: &[AttachmentPart],
    ) -> impl std::future::Future<Output = Result<PublishedLinks, PublishError>> + Send;

    /// Make the publications permanent.
    fn commit(&mut self) -> impl std::future::Future<Output = Result<(), PublishError>> + Send {
        async { Ok(()) }
    }

    /// Undo every publication of this transaction. Best effort; never fails.
    fn rollback(&mut self) -> impl std::future::Future<Output = ()> + Send {
        async {}
    }

    /// Release resources. Runs on every exit path.
    fn finish(&mut self) -> impl std::future::Future<Output = ()> + Send {
        async {}
    }
}
