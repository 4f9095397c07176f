use anyhow::{Result, anyhow};
use isolang::Language;
use once_cell::sync::Lazy;
use regex::Regex;

/// Language utilities for language tag handling
///
/// Engines receive BCP 47-ish tags (`es`, `pt-br`, `zh_TW`, `mni-mtei`).
/// This module normalizes their casing and resolves display names through
/// ISO 639 codes.

/// ISO 639-2/B codes that differ from their ISO 639-2/T counterpart
const PART2B_TO_PART2T: &[(&str, &str)] = &[
    ("fre", "fra"),
    ("ger", "deu"),
    ("dut", "nld"),
    ("gre", "ell"),
    ("chi", "zho"),
    ("cze", "ces"),
    ("ice", "isl"),
    ("alb", "sqi"),
    ("arm", "hye"),
    ("baq", "eus"),
    ("bur", "mya"),
    ("per", "fas"),
    ("geo", "kat"),
    ("may", "msa"),
    ("mac", "mkd"),
    ("rum", "ron"),
    ("slo", "slk"),
    ("wel", "cym"),
];

/// Subtag separators accepted in incoming tags
static SUBTAG_SEPARATOR: Lazy<Regex> = Lazy::new(|| Regex::new(r"[-_]").unwrap());

/// Normalize the casing of a language tag.
///
/// The primary language is lowercased, two-letter regions are uppercased,
/// four-letter scripts are title-cased and numeric regions are kept.
/// `zh_cn` becomes `zh-CN`, `pt-br` becomes `pt-BR`, `mni-mtei` becomes `mni-Mtei`.
pub fn normalize_language_tag(tag: &str) -> String {
    let trimmed = tag.trim();
    if trimmed.is_empty() || trimmed.eq_ignore_ascii_case("auto") {
        return trimmed.to_lowercase();
    }

    let parts: Vec<String> = SUBTAG_SEPARATOR
        .split(trimmed)
        .enumerate()
        .map(|(idx, part)| {
            let is_alpha = part.chars().all(|c| c.is_ascii_alphabetic());
            match (idx, part.len()) {
                (0, _) => part.to_lowercase(),
                (_, 2) if is_alpha => part.to_uppercase(),
                (_, 4) if is_alpha => {
                    let lower = part.to_lowercase();
                    let mut chars = lower.chars();
                    match chars.next() {
                        Some(first) => first.to_uppercase().chain(chars).collect(),
                        None => String::new(),
                    }
                }
                _ => part.to_string(),
            }
        })
        .collect();

    parts.join("-")
}

/// Primary language subtag of a tag, lowercased (`pt-BR` gives `pt`)
pub fn primary_subtag(tag: &str) -> String {
    SUBTAG_SEPARATOR
        .split(tag.trim())
        .next()
        .unwrap_or_default()
        .to_lowercase()
}

/// Resolve an ISO 639-1 or ISO 639-2 code to a language
fn resolve_language(code: &str) -> Option<Language> {
    let code = code.trim().to_lowercase();
    match code.len() {
        2 => Language::from_639_1(&code),
        3 => {
            let part2t = PART2B_TO_PART2T
                .iter()
                .find(|(b, _)| *b == code)
                .map(|(_, t)| *t)
                .unwrap_or(&code);
            Language::from_639_3(part2t)
        }
        _ => None,
    }
}

/// Get the English language name from a tag
pub fn get_language_name(tag: &str) -> Result<String> {
    let primary = primary_subtag(tag);
    let lang = resolve_language(&primary)
        .ok_or_else(|| anyhow!("Failed to get language from code: {}", tag))?;

    Ok(lang.to_name().to_string())
}

/// Language name for display, falling back to the tag itself
pub fn display_name(tag: &str) -> String {
    get_language_name(tag).unwrap_or_else(|_| tag.trim().to_string())
}
