//! Bilingual text fields.
//!
//! Every translatable column has a French value (the catalog's default
//! language, always present) and an optional English mirror. Resolution
//! order: the requested language, then the default.

use crate::db::entities::{ingredient, recipe, unit};

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum Language {
    #[default]
    French,
    English,
}

impl Language {
    pub fn code(self) -> &'static str {
        match self {
            Language::French => "fr",
            Language::English => "en",
        }
    }

    /// Parse a language tag such as `en`, `en-US` or `fr-CA`.
    pub fn from_tag(tag: &str) -> Option<Self> {
        let primary = tag.trim().split(['-', '_']).next()?.to_ascii_lowercase();
        match primary.as_str() {
            "fr" => Some(Language::French),
            "en" => Some(Language::English),
            _ => None,
        }
    }

    /// An explicit `?lang=` wins over `Accept-Language`; anything unknown
    /// falls back to the default.
    pub fn negotiate(explicit: Option<&str>, accept_language: Option<&str>) -> Self {
        if let Some(lang) = explicit.and_then(Self::from_tag) {
            return lang;
        }
        accept_language
            .into_iter()
            .flat_map(|header| header.split(','))
            .filter_map(|item| Self::from_tag(item.split(';').next().unwrap_or("")))
            .next()
            .unwrap_or_default()
    }
}

/// A default-language value with its optional English translation.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct LocalizedText<'a> {
    default: &'a str,
    english: Option<&'a str>,
}

impl<'a> LocalizedText<'a> {
    pub fn new(default: &'a str, english: Option<&'a str>) -> Self {
        Self { default, english }
    }

    pub fn resolve(&self, lang: Language) -> &'a str {
        match lang {
            Language::English => self
                .english
                .filter(|s| !s.trim().is_empty())
                .unwrap_or(self.default),
            Language::French => self.default,
        }
    }
}

/// Normalize a submitted translation: trimmed, blank means absent.
pub fn clean_translation(value: Option<String>) -> Option<String> {
    value
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
}

impl unit::Model {
    pub fn localized_name(&self) -> LocalizedText<'_> {
        LocalizedText::new(&self.name, self.name_en.as_deref())
    }
}

impl ingredient::Model {
    pub fn localized_name(&self) -> LocalizedText<'_> {
        LocalizedText::new(&self.name, self.name_en.as_deref())
    }
}

impl recipe::Model {
    pub fn localized_title(&self) -> LocalizedText<'_> {
        LocalizedText::new(&self.title, self.title_en.as_deref())
    }

    pub fn localized_description(&self) -> LocalizedText<'_> {
        LocalizedText::new(&self.description, self.description_en.as_deref())
    }

    pub fn localized_instructions(&self) -> LocalizedText<'_> {
        LocalizedText::new(&self.instructions, self.instructions_en.as_deref())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_english_falls_back_to_default() {
        let with = LocalizedText::new("Farine", Some("Flour"));
        let without = LocalizedText::new("Farine", None);
        let blank = LocalizedText::new("Farine", Some("  "));

        assert_eq!(with.resolve(Language::English), "Flour");
        assert_eq!(with.resolve(Language::French), "Farine");
        assert_eq!(without.resolve(Language::English), "Farine");
        assert_eq!(blank.resolve(Language::English), "Farine");
    }

    #[test]
    fn test_negotiate() {
        assert_eq!(Language::negotiate(Some("en"), Some("fr-CA")), Language::English);
        assert_eq!(Language::negotiate(None, Some("en-US,en;q=0.9")), Language::English);
        assert_eq!(Language::negotiate(None, Some("de-DE, fr;q=0.5")), Language::French);
        assert_eq!(Language::negotiate(Some("xx"), None), Language::French);
        assert_eq!(Language::negotiate(None, None), Language::French);
    }

    #[test]
    fn test_clean_translation() {
        assert_eq!(clean_translation(Some("  Flour ".into())), Some("Flour".into()));
        assert_eq!(clean_translation(Some("   ".into())), None);
        assert_eq!(clean_translation(None), None);
    }
}
