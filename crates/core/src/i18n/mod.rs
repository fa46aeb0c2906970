//! Locales and translated boilerplate for published-attachment messages.
//!
//! English is the fallback language; German, Spanish and French are built in.

use std::fmt;

use serde::{Deserialize, Serialize};

/// A language/region identifier such as `de_DE` or `en`.
///
/// Stored normalized: lower-case language, upper-case region, joined by `_`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Locale(String);

impl Locale {
    /// Parse a locale code (e.g. "en", "de-de", "pt_BR").
    #[must_use]
    pub fn parse(code: &str) -> Self {
        let mut parts = code.trim().split(['_', '-']);
        let language = parts.next().unwrap_or("").to_lowercase();
        match parts.next().filter(|r| !r.is_empty()) {
            Some(region) => Self(format!("{language}_{}", region.to_uppercase())),
            None => Self(language),
        }
    }

    /// The fallback locale.
    #[must_use]
    pub fn english() -> Self {
        Self("en_US".to_string())
    }

    /// ISO 639-1 language part.
    #[must_use]
    pub fn language(&self) -> &str {
        self.0.split('_').next().unwrap_or("")
    }

    /// Full normalized code.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Locale {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Keys of translatable strings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MessageKey {
    /// Text introducing the list of links.
    PublishedPreface,
    /// Expiry notice; `{date}` is replaced by the expiry date.
    ExpiryNotice,
    /// Body hint when the links travel in a separate part.
    LinksAttached,
}

/// Looks up translated strings.
pub trait Translator: Send + Sync {
    /// Returns the string for `key` in `locale`.
    fn translate(&self, key: MessageKey, locale: &Locale) -> String;
}

/// Built-in string table.
#[derive(Debug, Clone, Copy, Default)]
pub struct Catalog;

impl Catalog {
    fn lookup(key: MessageKey, language: &str) -> Option<&'static str> {
        let text = match (language, key) {
            ("en", MessageKey::PublishedPreface) => {
                "The attachments of this mail exceeded the size limit and have been published. \
                 They are available at the following links:"
            }
            ("en", MessageKey::ExpiryNotice) => "The links will expire on {date}.",
            ("en", MessageKey::LinksAttached) => {
                "The links to the published attachments are contained in the attached file."
            }
            ("de", MessageKey::PublishedPreface) => {
                "Die Anhänge dieser E-Mail haben die Größenbeschränkung überschritten und wurden \
                 veröffentlicht. Sie sind unter folgenden Links verfügbar:"
            }
            ("de", MessageKey::ExpiryNotice) => "Die Links laufen am {date} ab.",
            ("de", MessageKey::LinksAttached) => {
                "Die Links zu den veröffentlichten Anhängen befinden sich in der angehängten Datei."
            }
            ("es", MessageKey::PublishedPreface) => {
                "Los adjuntos de este correo superaron el límite de tamaño y se han publicado. \
                 Están disponibles en los siguientes enlaces:"
            }
            ("es", MessageKey::ExpiryNotice) => "Los enlaces caducarán el {date}.",
            ("es", MessageKey::LinksAttached) => {
                "Los enlaces a los adjuntos publicados se encuentran en el archivo adjunto."
            }
            ("fr", MessageKey::PublishedPreface) => {
                "Les pièces jointes de ce message dépassaient la taille autorisée et ont été \
                 publiées. Elles sont disponibles aux liens suivants :"
            }
            ("fr", MessageKey::ExpiryNotice) => "Les liens expireront le {date}.",
            ("fr", MessageKey::LinksAttached) => {
                "Les liens vers les pièces jointes publiées se trouvent dans le fichier joint."
            }
            _ => return None,
        };
        Some(text)
    }
}

impl Translator for Catalog {
    fn translate(&self, key: MessageKey, locale: &Locale) -> String {
        Self::lookup(key, locale.language())
            .or_else(|| Self::lookup(key, "en"))
            .unwrap_or_default()
            .to_string()
    }
}

#[cfg(test)]
mod tests {
    use rstest::rstest;

    use super::*;

    #[rstest]
    #[case("en", "en")]
    #[case("de-de", "de_DE")]
    #[case("pt_BR", "pt_BR")]
    #[case(" FR_fr ", "fr_FR")]
    #[case("es_", "es")]
    fn test_locale_parse(#[case] code: &str, #[case] expected: &str) {
        assert_eq!(Locale::parse(code).as_str(), expected);
    }

    #[test]
    fn test_locale_language() {
        assert_eq!(Locale::parse("de_AT").language(), "de");
        assert_eq!(Locale::english().language(), "en");
    }

    #[test]
    fn test_catalog_translates() {
        let text = Catalog.translate(MessageKey::ExpiryNotice, &Locale::parse("de_DE"));
        assert_eq!(text, "Die Links laufen am {date} ab.");
    }

    #[test]
    fn test_catalog_falls_back_to_english() {
        let text = Catalog.translate(MessageKey::ExpiryNotice, &Locale::parse("ja_JP"));
        assert_eq!(text, "The links will expire on {date}.");
    }
}
