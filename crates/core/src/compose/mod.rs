//! Attachment handling for one mail-compose request.
//!
//! A handler accumulates the text part and the attachments of a mail, checks
//! every attachment against the upload quota and finally produces the
//! outbound mails. The policy is picked per request:
//!
//! - `abort` - fail on the first quota violation
//! - `linking` - keep accepting, then publish the attachments and send links
//!
//! # Modules
//!
//! - `handler` - Policy selection and the common interface
//! - `render` - Link list rendering (askama templates)
//! - `state` - Accumulated attachments, body and quota
//! - `types` - Mails, attachments and sessions

mod abort;
mod error;
mod handler;
mod linking;
pub mod render;
mod state;
pub mod types;

#[cfg(test)]
mod handler_props;

pub use abort::AbortHandler;
pub use error::ComposeError;
pub use handler::{AttachmentHandler, HandlerSettings};
pub use linking::LinkingHandler;
pub use render::{LINKS_FILE_NAME, LinkRenderer, RenderedLinks};
pub use state::HandlerState;
pub use types::{
    AttachmentPart, Audience, ComposeOutcome, ComposeSession, ComposeWarning, ComposedMail,
    MailDraft, PRIMARY_ACCOUNT_ID, TextBody, TextKind,
};
