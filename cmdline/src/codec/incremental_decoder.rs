// Copyright (c) 2025 R3BL LLC. Licensed under Apache License, Version 2.0.

use super::encoding_lookup::reserve_hint;
use crate::CmdlineError;
use encoding_rs::{CoderResult, Decoder, DecoderResult, Encoding};

/// Byte → text decoder that survives chunk boundaries.
///
/// Feed it chunks with `is_final = false` and an incomplete multi-byte sequence at the
/// end of a chunk is held back and prefixed to the next chunk. Pass `is_final = true`
/// to flush: a still-incomplete tail is replaced with U+FFFD and the decoder is reset.
///
/// ```
/// use r3bl_cmdline::IncrementalDecoder;
///
/// let mut decoder = IncrementalDecoder::new(encoding_rs::UTF_8);
/// // "é" is `0xC3 0xA9`, split across two reads.
/// assert_eq!(decoder.decode(b"caf\xC3", false), "caf");
/// assert_eq!(decoder.decode(b"\xA9", false), "é");
/// ```
pub struct IncrementalDecoder {
    encoding: &'static Encoding,
    decoder: Decoder,
}

impl IncrementalDecoder {
    #[must_use]
    pub fn new(encoding: &'static Encoding) -> Self {
        Self {
            encoding,
            decoder: encoding.new_decoder_without_bom_handling(),
        }
    }

    #[must_use]
    pub fn encoding(&self) -> &'static Encoding { self.encoding }

    /// Decode as much of `bytes` as forms complete characters. Malformed sequences
    /// become U+FFFD, this never fails.
    pub fn decode(&mut self, bytes: &[u8], is_final: bool) -> String {
        let mut text = String::new();
        let mut remaining = bytes;

        loop {
            text.reserve(reserve_hint(
                self.decoder.max_utf8_buffer_length(remaining.len()),
                remaining.len(),
            ));
            let (result, read, _had_replacements) =
                self.decoder.decode_to_string(remaining, &mut text, is_final);
            remaining = &remaining[read..];
            match result {
                CoderResult::InputEmpty => break,
                CoderResult::OutputFull => {}
            }
        }

        if is_final {
            self.reset();
        }
        text
    }

    /// Strict variant of [`decode()`](Self::decode), used by text views over pipes and
    /// files. The decoder is reset when malformed input is found.
    ///
    /// # Errors
    ///
    /// Returns [`CmdlineError::MalformedInput`] on the first invalid sequence.
    pub fn try_decode(
        &mut self,
        bytes: &[u8],
        is_final: bool,
    ) -> Result<String, CmdlineError> {
        let mut text = String::new();
        let mut remaining = bytes;

        loop {
            text.reserve(reserve_hint(
                self.decoder
                    .max_utf8_buffer_length_without_replacement(remaining.len()),
                remaining.len(),
            ));
            let (result, read) = self.decoder.decode_to_string_without_replacement(
                remaining,
                &mut text,
                is_final,
            );
            remaining = &remaining[read..];
            match result {
                DecoderResult::InputEmpty => break,
                DecoderResult::OutputFull => {}
                DecoderResult::Malformed(_, _) => {
                    self.reset();
                    return Err(CmdlineError::MalformedInput {
                        encoding: self.encoding.name(),
                    });
                }
            }
        }

        if is_final {
            self.reset();
        }
        Ok(text)
    }

    /// Drop any retained partial sequence.
    pub fn reset(&mut self) { self.decoder = self.encoding.new_decoder_without_bom_handling(); }
}

impl std::fmt::Debug for IncrementalDecoder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("IncrementalDecoder")
            .field("encoding", &self.encoding.name())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn ascii_passes_through() {
        let mut decoder = IncrementalDecoder::new(encoding_rs::UTF_8);
        assert_eq!(decoder.decode(b"hello", false), "hello");
    }

    #[test]
    fn split_multi_byte_matches_single_chunk() {
        let whole = "naïve 日本語 🦀".as_bytes();

        let mut single = IncrementalDecoder::new(encoding_rs::UTF_8);
        let expected = single.decode(whole, true);

        // Split at every possible boundary.
        for split in 0..=whole.len() {
            let mut decoder = IncrementalDecoder::new(encoding_rs::UTF_8);
            let mut text = decoder.decode(&whole[..split], false);
            text.push_str(&decoder.decode(&whole[split..], true));
            assert_eq!(text, expected, "split at {split}");
        }
    }

    #[test]
    fn incomplete_tail_is_replaced_on_final() {
        let mut decoder = IncrementalDecoder::new(encoding_rs::UTF_8);
        assert_eq!(decoder.decode(b"ab\xE6\x97", false), "ab");
        assert_eq!(decoder.decode(b"", true), "\u{FFFD}");
        // State was reset: a fresh sequence decodes cleanly.
        assert_eq!(decoder.decode(b"ok", true), "ok");
    }

    #[test]
    fn invalid_bytes_are_replaced() {
        let mut decoder = IncrementalDecoder::new(encoding_rs::UTF_8);
        assert_eq!(decoder.decode(b"a\xFFb", true), "a\u{FFFD}b");
    }

    #[test]
    fn reset_discards_partial_sequence() {
        let mut decoder = IncrementalDecoder::new(encoding_rs::UTF_8);
        assert_eq!(decoder.decode(b"\xE6\x97", false), "");
        decoder.reset();
        assert_eq!(decoder.decode(b"x", false), "x");
    }

    #[test]
    fn legacy_single_byte_encoding() {
        let mut decoder = IncrementalDecoder::new(encoding_rs::WINDOWS_1252);
        assert_eq!(decoder.decode(b"caf\xE9 \x80", true), "café €");
    }

    #[test]
    fn strict_decode_reports_malformed_input() {
        let mut decoder = IncrementalDecoder::new(encoding_rs::UTF_8);
        let err = decoder.try_decode(b"ok\xFF", false).unwrap_err();
        assert!(matches!(err, CmdlineError::MalformedInput { encoding: "UTF-8" }));
    }

    #[test]
    fn strict_decode_keeps_partial_sequence() {
        let mut decoder = IncrementalDecoder::new(encoding_rs::UTF_8);
        assert_eq!(decoder.try_decode(b"\xF0\x9F", false).unwrap(), "");
        assert_eq!(decoder.try_decode(b"\xA6\x80", true).unwrap(), "🦀");
    }
}
