/*!
 * ISO language code validation and normalization.
 *
 * Routing works on lowercase ISO 639-1 (2-letter) codes; this module
 * validates user-supplied codes early, converts 3-letter codes down to
 * 2-letter where one exists, and recognizes NLLB-style script tags
 * (e.g. `deu_Latn`) which pass through untouched.
 */

use anyhow::{Result, anyhow};
use isolang::Language;

/// Check whether a code is an NLLB-style language tag (`deu_Latn`)
pub fn is_nllb_tag(code: &str) -> bool {
    let mut parts = code.splitn(2, '_');
    let (Some(lang), Some(script)) = (parts.next(), parts.next()) else {
        return false;
    };
    let lang_ok = (lang.len() == 2 || lang.len() == 3)
        && lang.chars().all(|c| c.is_ascii_lowercase());
    let mut script_chars = script.chars();
    let script_ok = script.len() == 4
        && script_chars.next().is_some_and(|c| c.is_ascii_uppercase())
        && script_chars.all(|c| c.is_ascii_lowercase());
    lang_ok && script_ok
}

/// Normalize a language code to lowercase ISO 639-1
///
/// Accepts 2-letter and 3-letter ISO codes in any case; NLLB script tags
/// are returned unchanged.
///
/// # Errors
/// Returns an error when the code is not a recognized ISO language code.
pub fn normalize_lang_code(code: &str) -> Result<String> {
    let trimmed = code.trim();
    if is_nllb_tag(trimmed) {
        return Ok(trimmed.to_string());
    }

    let normalized = trimmed.to_lowercase();
    if normalized.len() == 2 {
        if Language::from_639_1(&normalized).is_some() {
            return Ok(normalized);
        }
    } else if normalized.len() == 3 {
        if let Some(lang) = Language::from_639_3(&normalized) {
            // Prefer the 2-letter form when one exists
            if let Some(part1) = lang.to_639_1() {
                return Ok(part1.to_string());
            }
            return Ok(normalized);
        }
    }

    Err(anyhow!("Invalid language code: {}", code))
}

/// Get the English language name for a code, for log output
pub fn language_name(code: &str) -> Result<String> {
    let normalized = normalize_lang_code(code)?;
    let lang = if normalized.len() == 2 {
        Language::from_639_1(&normalized)
    } else {
        Language::from_639_3(&normalized)
    };
    lang.map(|l| l.to_name().to_string())
        .ok_or_else(|| anyhow!("Failed to get language from code: {}", code))
}
