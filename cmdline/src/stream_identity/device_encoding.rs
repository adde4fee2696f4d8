// Copyright (c) 2025 R3BL LLC. Licensed under Apache License, Version 2.0.

use encoding_rs::Encoding;
use rustix::fd::AsFd;

/// Locale variables in the order the C library consults them for `LC_CTYPE`.
const LOCALE_VARS: [&str; 3] = ["LC_ALL", "LC_CTYPE", "LANG"];

/// The encoding the OS uses for a terminal device: the codeset of the current locale.
/// Returns [`None`] for anything that is not a tty, and for locales without a codeset.
pub fn device_encoding(fd: impl AsFd) -> Option<&'static Encoding> {
    if !rustix::termios::isatty(fd) {
        return None;
    }
    let locale = locale_from(|name| std::env::var(name).ok())?;
    codeset_from_locale(&locale)
}

/// First non-empty locale variable, as looked up by `lookup`.
pub fn locale_from(lookup: impl Fn(&str) -> Option<String>) -> Option<String> {
    LOCALE_VARS
        .iter()
        .filter_map(|name| lookup(name))
        .find(|value| !value.is_empty())
}

/// `language[_territory][.codeset][@modifier]` → encoding of `codeset`.
#[must_use]
pub fn codeset_from_locale(locale: &str) -> Option<&'static Encoding> {
    let (_, rest) = locale.split_once('.')?;
    let codeset = rest.split_once('@').map_or(rest, |(codeset, _)| codeset);
    Encoding::for_label(normalize_codeset(codeset).as_bytes())
}

/// C library codeset names that are not encoding labels as they stand, eg: `eucJP` is
/// spelled `euc-jp` as a label.
fn normalize_codeset(codeset: &str) -> String {
    let lowercase = codeset.to_ascii_lowercase();
    let hyphenated = match lowercase.strip_prefix("euc") {
        Some(region) if !region.is_empty() && !region.starts_with('-') => {
            format!("euc-{region}")
        }
        _ => lowercase,
    };
    match hyphenated.as_str() {
        "euc-cn" => "gb2312".to_string(),
        _ => hyphenated,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use test_case::test_case;

    #[test_case("en_US.UTF-8", Some("UTF-8"))]
    #[test_case("en_US.utf8", Some("UTF-8"))]
    #[test_case("de_DE.ISO-8859-15@euro", Some("ISO-8859-15"))]
    #[test_case("ja_JP.eucJP", Some("EUC-JP"))]
    #[test_case("ja_JP.EUC-JP", Some("EUC-JP"))]
    #[test_case("ko_KR.eucKR", Some("EUC-KR"))]
    #[test_case("zh_CN.eucCN", Some("GBK"))]
    #[test_case("zh_TW.eucTW", None)]
    #[test_case("C", None)]
    #[test_case("POSIX", None)]
    #[test_case("en_US", None)]
    #[test_case("xx_XX.no-such-codeset", None)]
    fn codesets(locale: &str, expected: Option<&str>) {
        assert_eq!(codeset_from_locale(locale).map(Encoding::name), expected);
    }

    #[test]
    fn first_non_empty_variable_wins() {
        let env = |name: &str| match name {
            "LC_ALL" => Some(String::new()),
            "LC_CTYPE" => Some("fr_FR.UTF-8".to_string()),
            "LANG" => Some("ja_JP.eucJP".to_string()),
            _ => None,
        };
        assert_eq!(locale_from(env).as_deref(), Some("fr_FR.UTF-8"));
    }

    #[test]
    fn no_locale_set() {
        assert_eq!(locale_from(|_| None), None);
    }

    #[test]
    fn pipes_have_no_device_encoding() {
        let (read_end, _write_end) = rustix::pipe::pipe().unwrap();
        assert!(device_encoding(&read_end).is_none());
    }
}
