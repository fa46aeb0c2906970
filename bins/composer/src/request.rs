//! JSON compose requests and result summaries.

use std::path::{Path, PathBuf};

use anyhow::Context;
use attachlink_core::compose::{
    AttachmentPart, Audience, ComposeOutcome, ComposeWarning, ComposedMail, MailDraft, TextBody,
    TextKind,
};
use attachlink_core::recipients::MailAddress;
use serde::{Deserialize, Serialize};

/// A mail to compose, as read from the request file.
#[derive(Debug, Deserialize)]
pub struct ComposeRequest {
    /// Sender address.
    pub from: String,
    /// `To` recipients.
    #[serde(default)]
    pub to: Vec<String>,
    /// `Cc` recipients.
    #[serde(default)]
    pub cc: Vec<String>,
    /// `Bcc` recipients.
    #[serde(default)]
    pub bcc: Vec<String>,
    /// Subject.
    #[serde(default)]
    pub subject: String,
    /// Body text.
    #[serde(default)]
    pub body: Option<String>,
    /// Whether `body` is HTML.
    #[serde(default)]
    pub html: bool,
    /// Files to attach, relative to the request file.
    #[serde(default)]
    pub attachments: Vec<PathBuf>,
}

impl ComposeRequest {
    /// Parse a request.
    pub fn from_json(json: &str) -> anyhow::Result<Self> {
        serde_json::from_str(json).context("invalid compose request")
    }

    /// Sender mailbox.
    pub fn sender(&self) -> anyhow::Result<MailAddress> {
        MailAddress::parse(&self.from).with_context(|| format!("invalid sender '{}'", self.from))
    }

    /// Envelope of the request.
    pub fn draft(&self) -> anyhow::Result<MailDraft> {
        Ok(MailDraft {
            from: Some(self.sender()?),
            to: parse_all(&self.to)?,
            cc: parse_all(&self.cc)?,
            bcc: parse_all(&self.bcc)?,
            subject: self.subject.clone(),
        })
    }

    /// Text part of the request.
    pub fn text(&self) -> Option<TextBody> {
        self.body.as_ref().map(|body| {
            if self.html {
                TextBody::html(body.clone())
            } else {
                TextBody::plain(body.clone())
            }
        })
    }

    /// Read the attachments, resolving relative paths against `base`.
    pub async fn read_attachments(&self, base: &Path) -> anyhow::Result<Vec<AttachmentPart>> {
        let mut parts = Vec::with_capacity(self.attachments.len());
        for path in &self.attachments {
            let path = base.join(path);
            let content = tokio::fs::read(&path)
                .await
                .with_context(|| format!("cannot read attachment {}", path.display()))?;
            let file_name = path
                .file_name()
                .map_or_else(|| "attachment".to_string(), |n| n.to_string_lossy().into_owned());
            parts.push(AttachmentPart::new(
                file_name,
                content_type_for(&path),
                content,
            ));
        }
        Ok(parts)
    }
}

fn parse_all(addresses: &[String]) -> anyhow::Result<Vec<MailAddress>> {
    addresses
        .iter()
        .map(|a| MailAddress::parse(a).with_context(|| format!("invalid recipient '{a}'")))
        .collect()
}

/// MIME type guessed from the file extension.
fn content_type_for(path: &Path) -> String {
    mime_guess::from_path(path)
        .first_or_octet_stream()
        .essence_str()
        .to_string()
}

/// Mails with at least one envelope recipient.
///
/// A mail without recipients cannot be handed to a relay.
pub fn deliverable(mails: &[ComposedMail]) -> impl Iterator<Item = &ComposedMail> {
    mails.iter().filter(|mail| mail.recipients().next().is_some())
}

/// Printable summary of a compose run.
#[derive(Debug, Serialize)]
pub struct OutcomeSummary {
    /// Soft warnings.
    pub warnings: Vec<ComposeWarning>,
    /// Outbound mails.
    pub mails: Vec<MailSummary>,
}

/// Printable summary of one outbound mail.
#[derive(Debug, Serialize)]
pub struct MailSummary {
    /// Intended audience.
    pub audience: Audience,
    /// Locale of the boilerplate.
    pub locale: String,
    /// `To` recipients.
    pub to: Vec<String>,
    /// `Cc` recipients.
    pub cc: Vec<String>,
    /// `Bcc` recipients.
    pub bcc: Vec<String>,
    /// Subject.
    pub subject: String,
    /// Body format, if there is a body.
    pub body_kind: Option<TextKind>,
    /// Body content.
    pub body: Option<String>,
    /// Attachment file names.
    pub attachments: Vec<String>,
}

impl From<&ComposedMail> for MailSummary {
    fn from(mail: &ComposedMail) -> Self {
        let emails = |list: &[MailAddress]| list.iter().map(ToString::to_string).collect();
        Self {
            audience: mail.audience,
            locale: mail.locale.to_string(),
            to: emails(&mail.to),
            cc: emails(&mail.cc),
            bcc: emails(&mail.bcc),
            subject: mail.subject.clone(),
            body_kind: mail.text.as_ref().map(|t| t.kind),
            body: mail.text.as_ref().map(|t| t.content.clone()),
            attachments: mail
                .attachments
                .iter()
                .map(|a| a.file_name.clone())
                .collect(),
        }
    }
}

impl From<&ComposeOutcome> for OutcomeSummary {
    fn from(outcome: &ComposeOutcome) -> Self {
        Self {
            warnings: outcome.warnings.clone(),
            mails: outcome.mails.iter().map(MailSummary::from).collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use attachlink_core::i18n::Locale;

    use super::*;

    #[test]
    fn test_parse_request() {
        let request = ComposeRequest::from_json(
            r#"{"from": "Sender <sender@corp.example>", "to": ["anna@corp.example"],
                "subject": "Q3", "body": "<p>hi</p>", "html": true,
                "attachments": ["q3.pdf"]}"#,
        )
        .expect("valid request");

        let draft = request.draft().expect("valid addresses");
        assert_eq!(draft.from.and_then(|f| f.name).as_deref(), Some("Sender"));
        assert_eq!(draft.to, vec![MailAddress::new("anna@corp.example")]);
        assert!(draft.cc.is_empty());
        assert_eq!(request.text(), Some(TextBody::html("<p>hi</p>")));
    }

    #[test]
    fn test_invalid_recipient() {
        let request = ComposeRequest::from_json(
            r#"{"from": "sender@corp.example", "to": ["not an address"]}"#,
        )
        .expect("valid request");
        assert!(request.draft().is_err());
    }

    #[test]
    fn test_content_type_for() {
        assert_eq!(content_type_for(Path::new("a/Report.PDF")), "application/pdf");
        assert_eq!(content_type_for(Path::new("q3.csv")), "text/csv");
        assert_eq!(content_type_for(Path::new("invite.ics")), "text/calendar");
        assert_eq!(content_type_for(Path::new("notes")), "application/octet-stream");
    }

    #[test]
    fn test_mails_without_recipients_are_not_deliverable() {
        let mail = |to: &[&str]| ComposedMail {
            from: MailAddress::new("sender@corp.example"),
            to: to.iter().map(|a| MailAddress::new(*a)).collect(),
            cc: Vec::new(),
            bcc: Vec::new(),
            subject: "Q3".to_string(),
            text: None,
            attachments: Vec::new(),
            locale: Locale::english(),
            audience: Audience::Internal,
        };
        let mails = [mail(&[]), mail(&["anna@corp.example"])];

        let sendable: Vec<_> = deliverable(&mails).collect();
        assert_eq!(sendable.len(), 1);
        assert_eq!(sendable[0].to, vec![MailAddress::new("anna@corp.example")]);
    }

    #[tokio::test]
    async fn test_read_attachments_relative_to_base() {
        let dir = tempfile::tempdir().expect("temp dir");
        tokio::fs::write(dir.path().join("q3.txt"), b"numbers")
            .await
            .expect("written");
        let request = ComposeRequest::from_json(
            r#"{"from": "sender@corp.example", "attachments": ["q3.txt"]}"#,
        )
        .expect("valid request");

        let parts = request
            .read_attachments(dir.path())
            .await
            .expect("readable");
        assert_eq!(parts.len(), 1);
        assert_eq!(parts[0].file_name, "q3.txt");
        assert_eq!(parts[0].content_type, "text/plain");
        assert_eq!(parts[0].size, 7);
    }
}
