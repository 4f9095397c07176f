/*!
 * Tests for language tag utilities
 */

use yttrans::language_utils::{display_name, get_language_name, normalize_language_tag, primary_subtag};

#[test]
fn test_normalizeLanguageTag_shouldFixCasing() {
    assert_eq!(normalize_language_tag(" ZH_cn "), "zh-CN");
    assert_eq!(normalize_language_tag("pt-br"), "pt-BR");
    assert_eq!(normalize_language_tag("mni-mtei"), "mni-Mtei");
    assert_eq!(normalize_language_tag("es-419"), "es-419");
    assert_eq!(normalize_language_tag("AUTO"), "auto");
}

#[test]
fn test_primarySubtag_shouldDropRegion() {
    assert_eq!(primary_subtag("pt-BR"), "pt");
    assert_eq!(primary_subtag("EN"), "en");
}

#[test]
fn test_getLanguageName_withKnownCodes_shouldResolve() {
    assert_eq!(get_language_name("fr").unwrap(), "French");
    assert_eq!(get_language_name("deu").unwrap(), "German");
    assert_eq!(get_language_name("ger").unwrap(), "German");
    assert!(get_language_name("xx-unsupported").is_err());
}

#[test]
fn test_displayName_withUnknownCode_shouldEchoTag() {
    assert_eq!(display_name("es-MX"), "Spanish");
    assert_eq!(display_name("qq"), "qq");
}
