// Copyright (c) 2025 R3BL LLC. Licensed under Apache License, Version 2.0.

use crate::IncrementalDecoder;
use encoding_rs::Encoding;

/// Splits incoming bytes into decoded lines.
///
/// A `\n` completes the decode of its line, so a malformed or truncated sequence right
/// before a newline becomes U+FFFD instead of leaking into the next line. Bytes after the
/// last newline are decoded incrementally and kept until their line completes.
#[derive(Debug)]
pub struct LineAssembler {
    decoder: IncrementalDecoder,
    pending: String,
}

impl LineAssembler {
    #[must_use]
    pub fn new(encoding: &'static Encoding) -> Self {
        Self {
            decoder: IncrementalDecoder::new(encoding),
            pending: String::new(),
        }
    }

    /// Returns every line completed by `bytes`, without the `\n`.
    pub fn feed(&mut self, bytes: &[u8]) -> Vec<String> {
        let mut lines = Vec::new();
        let mut rest = bytes;

        while let Some(pos) = rest.iter().position(|&byte| byte == b'\n') {
            self.pending.push_str(&self.decoder.decode(&rest[..pos], true));
            lines.push(std::mem::take(&mut self.pending));
            rest = &rest[pos + 1..];
        }

        if !rest.is_empty() {
            self.pending.push_str(&self.decoder.decode(rest, false));
        }
        lines
    }

    /// End of input: flush the unterminated tail, if there is one.
    pub fn finish(&mut self) -> Option<String> {
        self.pending.push_str(&self.decoder.decode(&[], true));
        let line = std::mem::take(&mut self.pending);
        (!line.is_empty()).then_some(line)
    }

    /// Decoded text waiting for its newline.
    #[must_use]
    pub fn pending(&self) -> &str { &self.pending }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn k_newlines_make_k_lines() {
        let mut assembler = LineAssembler::new(encoding_rs::UTF_8);
        assert_eq!(assembler.feed(b"a\nb\n\nc"), vec!["a", "b", ""]);
        assert_eq!(assembler.pending(), "c");
        assert_eq!(assembler.feed(b"d\n"), vec!["cd"]);
        assert_eq!(assembler.finish(), None);
    }

    #[test]
    fn lines_span_many_chunks() {
        let mut assembler = LineAssembler::new(encoding_rs::UTF_8);
        assert!(assembler.feed(b"hel").is_empty());
        assert!(assembler.feed(b"lo wor").is_empty());
        assert_eq!(assembler.feed(b"ld\nnext"), vec!["hello world"]);
        assert_eq!(assembler.finish().as_deref(), Some("next"));
    }

    #[test]
    fn split_multi_byte_sequence() {
        let bytes = "日本\n".as_bytes();
        for split in 1..bytes.len() {
            let mut assembler = LineAssembler::new(encoding_rs::UTF_8);
            let mut lines = assembler.feed(&bytes[..split]);
            lines.extend(assembler.feed(&bytes[split..]));
            assert_eq!(lines, vec!["日本"], "split at {split}");
        }
    }

    #[test]
    fn newline_completes_truncated_sequence() {
        let mut assembler = LineAssembler::new(encoding_rs::UTF_8);
        // "日" is E6 97 A5; the line ends after two of its bytes.
        assert_eq!(assembler.feed(b"x\xE6\x97\nok\n"), vec!["x\u{FFFD}", "ok"]);
    }

    #[test]
    fn truncated_tail_at_end_of_input() {
        let mut assembler = LineAssembler::new(encoding_rs::UTF_8);
        assert!(assembler.feed(b"ab\xE6").is_empty());
        assert_eq!(assembler.finish().as_deref(), Some("ab\u{FFFD}"));
    }
}
