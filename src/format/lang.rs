//! Language resolution

use anyhow::Result;
use tracing::debug;

use crate::config::LanguageDerivation;
use crate::entry::{extract_values, Entry, PropertyValue};
use crate::services::{Iso639Registry, LanguageDetector, UNDETERMINED_LANGUAGE};

/// Detect the entry language from its content
///
/// Runs only when the entry carries no `lang` of its own and has
/// content to look at. The detected code is kept when the detector is
/// confident and the whitelist, if any, allows it.
pub async fn detect_language(
    entry: &Entry,
    derivation: &LanguageDerivation,
    detector: &dyn LanguageDetector,
) -> Result<Option<String>> {
    let whitelist = match derivation {
        LanguageDerivation::Off => return Ok(None),
        LanguageDerivation::Any => None,
        LanguageDerivation::Whitelist(codes) => Some(codes.as_slice()),
    };

    if entry.has_property("lang") || !entry.has_property("content") {
        return Ok(None);
    }

    let text = extract_values(entry.property("content")).join("\n");
    if text.is_empty() {
        return Ok(None);
    }

    let detected = detector.detect(&text, whitelist).await?;
    if detected == UNDETERMINED_LANGUAGE {
        debug!("language detection was inconclusive");
        return Ok(None);
    }
    if let Some(allowed) = whitelist {
        if !allowed.iter().any(|code| code == &detected) {
            debug!(code = %detected, "detected language not in whitelist");
            return Ok(None);
        }
    }

    Ok(Some(detected))
}

/// Replace three-letter language codes with their two-letter forms
///
/// Applies to declared and detected codes alike. Codes missing from the
/// registry, and values of any other length, pass through untouched.
pub fn fold_language_codes(entry: &mut Entry, registry: &dyn Iso639Registry) {
    let Some(values) = entry.properties.get_mut("lang") else {
        return;
    };

    for value in values.iter_mut() {
        if let PropertyValue::Plain(code) = value {
            if code.chars().count() == 3 {
                if let Some(two_letter) = registry.two_letter(code) {
                    *code = two_letter.to_string();
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::BuiltinIso639Registry;
    use async_trait::async_trait;

    struct FixedDetector(&'static str);

    #[async_trait]
    impl LanguageDetector for FixedDetector {
        async fn detect(&self, _text: &str, _whitelist: Option<&[String]>) -> Result<String> {
            Ok(self.0.to_string())
        }
    }

    struct FailingDetector;

    #[async_trait]
    impl LanguageDetector for FailingDetector {
        async fn detect(&self, _text: &str, _whitelist: Option<&[String]>) -> Result<String> {
            anyhow::bail!("detector offline")
        }
    }

    fn entry_with_content() -> Entry {
        let mut entry = Entry::new();
        entry.set_plain("content", "hello world");
        entry
    }

    fn whitelist(codes: &[&str]) -> LanguageDerivation {
        LanguageDerivation::Whitelist(codes.iter().map(|c| c.to_string()).collect())
    }

    #[tokio::test]
    async fn test_detects_whitelisted_language() {
        let detected = detect_language(
            &entry_with_content(),
            &whitelist(&["eng", "swe"]),
            &FixedDetector("swe"),
        )
        .await
        .unwrap();

        assert_eq!(detected.as_deref(), Some("swe"));
    }

    #[tokio::test]
    async fn test_rejects_language_outside_whitelist() {
        let detected = detect_language(
            &entry_with_content(),
            &whitelist(&["eng", "swe"]),
            &FixedDetector("deu"),
        )
        .await
        .unwrap();

        assert_eq!(detected, None);
    }

    #[tokio::test]
    async fn test_any_language_without_whitelist() {
        let detected = detect_language(
            &entry_with_content(),
            &LanguageDerivation::Any,
            &FixedDetector("deu"),
        )
        .await
        .unwrap();

        assert_eq!(detected.as_deref(), Some("deu"));
    }

    #[tokio::test]
    async fn test_undetermined_is_dropped() {
        let detected = detect_language(
            &entry_with_content(),
            &LanguageDerivation::Any,
            &FixedDetector(UNDETERMINED_LANGUAGE),
        )
        .await
        .unwrap();

        assert_eq!(detected, None);
    }

    #[tokio::test]
    async fn test_declared_language_blocks_detection() {
        let mut entry = entry_with_content();
        entry.set_plain("lang", "sv");

        let detected = detect_language(&entry, &LanguageDerivation::Any, &FixedDetector("eng"))
            .await
            .unwrap();

        assert_eq!(detected, None);
    }

    #[tokio::test]
    async fn test_derivation_off() {
        let detected = detect_language(
            &entry_with_content(),
            &LanguageDerivation::Off,
            &FixedDetector("eng"),
        )
        .await
        .unwrap();

        assert_eq!(detected, None);
    }

    #[tokio::test]
    async fn test_detector_errors_propagate() {
        let result =
            detect_language(&entry_with_content(), &LanguageDerivation::Any, &FailingDetector)
                .await;

        assert!(result.is_err());
    }

    #[test]
    fn test_fold_three_letter_codes() {
        let mut entry = Entry::new();
        entry.set_plain("lang", "eng");
        fold_language_codes(&mut entry, &BuiltinIso639Registry);
        assert_eq!(entry.values("lang"), vec!["en"]);
    }

    #[test]
    fn test_fold_keeps_unknown_codes() {
        let mut entry = Entry::new();
        entry.set_plain("lang", "123");
        fold_language_codes(&mut entry, &BuiltinIso639Registry);
        assert_eq!(entry.values("lang"), vec!["123"]);
    }

    #[test]
    fn test_fold_keeps_two_letter_codes() {
        let mut entry = Entry::new();
        entry.set_plain("lang", "en");
        fold_language_codes(&mut entry, &BuiltinIso639Registry);
        assert_eq!(entry.values("lang"), vec!["en"]);
    }
}
