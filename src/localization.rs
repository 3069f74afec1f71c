//! # Localization
//!
//! Fluent-based message catalogs for the marketplace bot. Russian is the
//! default and fallback language; Uzbek is the second supported locale.
//! Bundles are loaded once at startup and shared through the application
//! state rather than re-read per message.

use anyhow::Result;
use fluent_bundle::concurrent::FluentBundle;
use fluent_bundle::FluentResource;
use std::collections::HashMap;
use std::fs;
use unic_langid::LanguageIdentifier;

pub const DEFAULT_LANGUAGE: &str = "ru";
pub const SUPPORTED_LANGUAGES: &[&str] = &["ru", "uz"];

/// Localization manager for the marketplace bot.
///
/// Uses the concurrent bundle variant so the manager can be shared across
/// tokio tasks behind an `Arc`.
pub struct LocalizationManager {
    bundles: HashMap<String, FluentBundle<FluentResource>>,
}

impl LocalizationManager {
    /// Create a new localization manager with all supported locales loaded
    pub fn new() -> Result<Self> {
        let mut bundles = HashMap::new();

        for locale_str in SUPPORTED_LANGUAGES {
            let locale: LanguageIdentifier = locale_str.parse()?;
            let bundle = Self::create_bundle(&locale)?;
            bundles.insert(locale_str.to_string(), bundle);
        }

        Ok(Self { bundles })
    }

    /// Create a fluent bundle for a specific locale
    fn create_bundle(locale: &LanguageIdentifier) -> Result<FluentBundle<FluentResource>> {
        let mut bundle = FluentBundle::new_concurrent(vec![locale.clone()]);

        // Path relative to Cargo.toml
        let manifest_dir = std::env::var("CARGO_MANIFEST_DIR").unwrap_or_else(|_| ".".to_string());
        let resource_path = format!("{}/locales/{}/main.ftl", manifest_dir, locale);
        if let Ok(content) = fs::read_to_string(&resource_path) {
            if let Ok(resource) = FluentResource::try_new(content) {
                let _ = bundle.add_resource(resource);
            }
        }

        Ok(bundle)
    }

    /// Get a localized message in a specific language
    pub fn get_message_in_language(
        &self,
        key: &str,
        language: &str,
        args: Option<&HashMap<&str, String>>,
    ) -> String {
        let bundle = match self.bundles.get(language) {
            Some(bundle) => bundle,
            None => match self.bundles.get(DEFAULT_LANGUAGE) {
                Some(bundle) => bundle,
                None => return format!("Missing translation: {}", key),
            },
        };

        let msg = match bundle.get_message(key) {
            Some(msg) => msg,
            None => return format!("Missing translation: {}", key),
        };

        let pattern = match msg.value() {
            Some(pattern) => pattern,
            None => return format!("Missing value for key: {}", key),
        };

        let mut value = String::new();

        if let Some(args) = args {
            let fluent_args = fluent_bundle::FluentArgs::from_iter(
                args.iter()
                    .map(|(k, v)| (*k, fluent_bundle::FluentValue::from(v.as_str()))),
            );

            let _ = bundle.write_pattern(&mut value, pattern, Some(&fluent_args), &mut vec![]);
        } else {
            let _ = bundle.write_pattern(&mut value, pattern, None, &mut vec![]);
        }

        // Fluent wraps placeable substitutions in bidi isolation marks; they
        // render as tofu in Telegram clients, so strip them.
        value.replace(['\u{2068}', '\u{2069}'], "")
    }

    /// Get a localized message without arguments
    pub fn t(&self, key: &str, language: &str) -> String {
        self.get_message_in_language(key, language, None)
    }

    /// Get a localized message with arguments
    pub fn t_args(&self, key: &str, language: &str, args: &[(&str, String)]) -> String {
        let args_map: HashMap<&str, String> = args.iter().cloned().collect();
        self.get_message_in_language(key, language, Some(&args_map))
    }

    /// Check if a language is supported
    pub fn is_language_supported(&self, language: &str) -> bool {
        self.bundles.contains_key(language)
    }
}

/// Normalize a stored or Telegram-provided language code to a supported
/// locale, falling back to Russian
pub fn detect_language(language_code: Option<&str>) -> String {
    if let Some(code) = language_code {
        // "uz-UZ" -> "uz"
        let lang = code.split('-').next().unwrap_or(DEFAULT_LANGUAGE);
        if SUPPORTED_LANGUAGES.contains(&lang) {
            return lang.to_string();
        }
    }

    DEFAULT_LANGUAGE.to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_detect_language_strips_region() {
        assert_eq!(detect_language(Some("uz-UZ")), "uz");
        assert_eq!(detect_language(Some("ru")), "ru");
    }

    #[test]
    fn test_detect_language_falls_back_to_russian() {
        assert_eq!(detect_language(Some("en")), "ru");
        assert_eq!(detect_language(None), "ru");
    }
}
