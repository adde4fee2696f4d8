// Copyright (c) 2025 R3BL LLC. Licensed under Apache License, Version 2.0.

use crate::CmdlineError;
use encoding_rs::Encoding;

/// Resolve an encoding label (`"utf-8"`, `"latin1"`, `"shift_jis"`, ...) using the
/// WHATWG label table.
///
/// Note that WHATWG maps `latin1` and `ascii` to `windows-1252`.
///
/// # Errors
///
/// Returns [`CmdlineError::UnknownEncoding`] if the label is not recognized.
pub fn lookup_encoding(label: &str) -> Result<&'static Encoding, CmdlineError> {
    Encoding::for_label(label.trim().as_bytes()).ok_or_else(|| {
        CmdlineError::UnknownEncoding {
            label: label.to_string(),
        }
    })
}

/// Scratch space needed for `len` more input units, falling back to a generous
/// estimate when the codec reports an arithmetic overflow.
pub(crate) fn reserve_hint(hint: Option<usize>, len: usize) -> usize {
    hint.unwrap_or_else(|| len.saturating_mul(4).saturating_add(16))
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use test_case::test_case;

    #[test_case("utf-8", "UTF-8")]
    #[test_case("UTF8", "UTF-8")]
    #[test_case(" utf-8 ", "UTF-8")]
    #[test_case("latin1", "windows-1252")]
    #[test_case("shift_jis", "Shift_JIS")]
    #[test_case("iso-2022-jp", "ISO-2022-JP")]
    fn known_labels(label: &str, expected_name: &str) {
        assert_eq!(lookup_encoding(label).unwrap().name(), expected_name);
    }

    #[test]
    fn unknown_label() {
        let err = lookup_encoding("klingon-8").unwrap_err();
        assert!(matches!(
            err,
            CmdlineError::UnknownEncoding { ref label } if label == "klingon-8"
        ));
    }
}
