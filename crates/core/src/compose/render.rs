//! Rendering of published-attachment links into mail bodies.

use askama::Template;
use chrono::{DateTime, Utc};

use super::error::ComposeError;
use super::types::{AttachmentPart, TextBody, TextKind};
use crate::i18n::{Locale, MessageKey, Translator};
use crate::publish::LinkedAttachment;
use crate::recipients::MailAddress;

/// File name of the separate links part.
pub const LINKS_FILE_NAME: &str = "links.html";

struct RenderedLink {
    name: String,
    url: String,
}

#[derive(Template)]
#[template(
    source = r#"<div class="published-attachments">
<p>{{ preface }}</p>
<ul>
{% for link in links %}<li><a href="{{ link.url }}">{{ link.name }}</a></li>
{% endfor %}</ul>
{% if let Some(notice) = expiry %}<p>{{ notice }}</p>
{% endif %}</div>"#,
    ext = "html"
)]
struct LinksFragment<'a> {
    preface: &'a str,
    links: &'a [RenderedLink],
    expiry: Option<&'a str>,
}

#[derive(Template)]
#[template(
    source = r#"<!DOCTYPE html>
<html lang="{{ lang }}">
<head><meta charset="utf-8"><title>{{ title }}</title></head>
<body>
{{ fragment|safe }}
</body>
</html>"#,
    ext = "html"
)]
struct LinksDocument<'a> {
    lang: &'a str,
    title: &'a str,
    fragment: &'a str,
}

#[derive(Template)]
#[template(source = r#"<p class="published-attachments">{{ notice }}</p>"#, ext = "html")]
struct NoticeFragment<'a> {
    notice: &'a str,
}

/// Link list rendered for one locale and one audience.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderedLinks {
    /// HTML fragment.
    pub html: String,
    /// Plain-text rendition.
    pub plain: String,
    locale: Locale,
}

impl RenderedLinks {
    /// Add the links to `body`, creating an HTML body if there is none.
    #[must_use]
    pub fn inline_into(&self, body: Option<TextBody>) -> TextBody {
        match body {
            Some(TextBody {
                content,
                kind: TextKind::Html,
            }) => TextBody::html(insert_before_body_end(&content, &self.html)),
            Some(TextBody {
                content,
                kind: TextKind::Plain,
            }) => TextBody::plain(append_block(&content, &self.plain)),
            None => TextBody::html(self.html.clone()),
        }
    }

    /// Stand-alone HTML document holding the links.
    ///
    /// # Errors
    ///
    /// Returns an error if the template fails to render.
    pub fn as_attachment(&self, title: &str) -> Result<AttachmentPart, ComposeError> {
        let document = LinksDocument {
            lang: self.locale.language(),
            title,
            fragment: &self.html,
        }
        .render()
        .map_err(|e| ComposeError::render(e.to_string()))?;
        Ok(AttachmentPart::new(
            LINKS_FILE_NAME,
            "text/html; charset=utf-8",
            document,
        ))
    }
}

/// Renders link lists with translated boilerplate.
pub struct LinkRenderer<'a> {
    translator: &'a dyn Translator,
}

impl<'a> LinkRenderer<'a> {
    /// Create a renderer using `translator`.
    #[must_use]
    pub fn new(translator: &'a dyn Translator) -> Self {
        Self { translator }
    }

    /// Translated string.
    #[must_use]
    pub fn text(&self, key: MessageKey, locale: &Locale) -> String {
        self.translator.translate(key, locale)
    }

    /// Render `links` for `locale`, personalized for `recipient` if given.
    ///
    /// # Errors
    ///
    /// Returns an error if the template fails to render.
    pub fn render(
        &self,
        links: &[LinkedAttachment],
        locale: &Locale,
        recipient: Option<&MailAddress>,
        expires_at: Option<DateTime<Utc>>,
    ) -> Result<RenderedLinks, ComposeError> {
        let preface = self.text(MessageKey::PublishedPreface, locale);
        let expiry = expires_at.map(|at| {
            self.text(MessageKey::ExpiryNotice, locale)
                .replace("{date}", &at.format("%Y-%m-%d").to_string())
        });
        let rendered: Vec<RenderedLink> = links
            .iter()
            .map(|link| RenderedLink {
                name: link.display_name.clone(),
                url: link.url_for(recipient),
            })
            .collect();

        let html = LinksFragment {
            preface: &preface,
            links: &rendered,
            expiry: expiry.as_deref(),
        }
        .render()
        .map_err(|e| ComposeError::render(e.to_string()))?;

        let mut plain = preface;
        plain.push('\n');
        for link in &rendered {
            plain.push_str(&format!("\n- {}: {}", link.name, link.url));
        }
        if let Some(notice) = expiry {
            plain.push_str("\n\n");
            plain.push_str(&notice);
        }

        Ok(RenderedLinks {
            html,
            plain,
            locale: locale.clone(),
        })
    }
}

/// Add a short notice to `body`, creating an HTML body if there is none.
///
/// # Errors
///
/// Returns an error if the template fails to render.
pub fn with_notice(body: Option<TextBody>, notice: &str) -> Result<TextBody, ComposeError> {
    let html = || {
        NoticeFragment { notice }
            .render()
            .map_err(|e| ComposeError::render(e.to_string()))
    };
    Ok(match body {
        Some(TextBody {
            content,
            kind: TextKind::Html,
        }) => TextBody::html(insert_before_body_end(&content, &html()?)),
        Some(TextBody {
            content,
            kind: TextKind::Plain,
        }) => TextBody::plain(append_block(&content, notice)),
        None => TextBody::html(html()?),
    })
}

/// Insert `fragment` right before the closing `</body>` tag, or append it.
fn insert_before_body_end(html: &str, fragment: &str) -> String {
    match html.to_ascii_lowercase().rfind("</body>") {
        Some(pos) => format!("{}{fragment}\n{}", &html[..pos], &html[pos..]),
        None => format!("{html}\n{fragment}"),
    }
}

fn append_block(text: &str, block: &str) -> String {
    if text.is_empty() {
        block.to_string()
    } else {
        format!("{}\n\n{block}", text.trim_end())
    }
}
