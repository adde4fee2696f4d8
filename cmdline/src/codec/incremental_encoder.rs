// Copyright (c) 2025 R3BL LLC. Licensed under Apache License, Version 2.0.

use super::encoding_lookup::reserve_hint;
use crate::DEBUG_CMDLINE_TRANSPORT;
use encoding_rs::{Encoder, EncoderResult, Encoding};

/// Text → byte encoder, the mirror of [`IncrementalDecoder`].
///
/// Characters that the target encoding cannot represent are dropped. Passing
/// `is_final = true` emits any bytes needed to return a stateful encoding (such as
/// `ISO-2022-JP`) to its initial shift state, then resets the encoder.
///
/// [`encoding_rs`] only encodes to its [output encoding], so a `UTF-16` label yields a
/// `UTF-8` encoder.
///
/// [`IncrementalDecoder`]: crate::IncrementalDecoder
/// [output encoding]: encoding_rs::Encoding::output_encoding
pub struct IncrementalEncoder {
    encoding: &'static Encoding,
    encoder: Encoder,
}

impl IncrementalEncoder {
    #[must_use]
    pub fn new(encoding: &'static Encoding) -> Self {
        Self {
            encoding,
            encoder: encoding.new_encoder(),
        }
    }

    /// The encoding bytes are actually produced in.
    #[must_use]
    pub fn encoding(&self) -> &'static Encoding { self.encoder.encoding() }

    pub fn encode(&mut self, text: &str, is_final: bool) -> Vec<u8> {
        let mut bytes = Vec::new();
        let mut remaining = text;

        loop {
            bytes.reserve(reserve_hint(
                self.encoder
                    .max_buffer_length_from_utf8_without_replacement(remaining.len()),
                remaining.len(),
            ));
            let (result, read) = self.encoder.encode_from_utf8_to_vec_without_replacement(
                remaining,
                &mut bytes,
                is_final,
            );
            remaining = &remaining[read..];
            match result {
                EncoderResult::InputEmpty => break,
                EncoderResult::OutputFull => {}
                EncoderResult::Unmappable(ch) => {
                    DEBUG_CMDLINE_TRANSPORT.then(|| {
                        tracing::debug!(
                            message = "encoder: dropped unmappable character",
                            ch = ?ch,
                            encoding = self.encoder.encoding().name()
                        );
                    });
                }
            }
        }

        if is_final {
            self.encoder = self.encoding.new_encoder();
        }
        bytes
    }
}

impl std::fmt::Debug for IncrementalEncoder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("IncrementalEncoder")
            .field("encoding", &self.encoding.name())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn utf8_round_trip_bytes() {
        let mut encoder = IncrementalEncoder::new(encoding_rs::UTF_8);
        assert_eq!(encoder.encode("héllo 🦀", true), "héllo 🦀".as_bytes());
    }

    #[test]
    fn empty_text_is_empty_bytes() {
        let mut encoder = IncrementalEncoder::new(encoding_rs::UTF_8);
        assert!(encoder.encode("", true).is_empty());
    }

    #[test]
    fn unmappable_characters_are_dropped() {
        let mut encoder = IncrementalEncoder::new(encoding_rs::WINDOWS_1252);
        assert_eq!(encoder.encode("a日b€", true), b"ab\x80");
    }

    #[test]
    fn final_flush_returns_to_initial_shift_state() {
        let mut encoder = IncrementalEncoder::new(encoding_rs::ISO_2022_JP);
        let bytes = encoder.encode("日", false);
        // ESC $ B introduces JIS X 0208, and nothing has switched back yet.
        assert!(bytes.starts_with(b"\x1B$B"));
        assert!(!bytes.ends_with(b"\x1B(B"));

        let tail = encoder.encode("", true);
        assert_eq!(tail, b"\x1B(B");
    }

    #[test]
    fn finalized_write_is_self_contained() {
        let mut encoder = IncrementalEncoder::new(encoding_rs::ISO_2022_JP);
        let bytes = encoder.encode("日", true);
        assert!(bytes.ends_with(b"\x1B(B"));
        // Stateless after a final call.
        assert!(encoder.encode("", true).is_empty());
    }

    #[test]
    fn utf16_label_encodes_as_utf8() {
        let mut encoder = IncrementalEncoder::new(encoding_rs::UTF_16LE);
        assert_eq!(encoder.encoding().name(), "UTF-8");
        assert_eq!(encoder.encode("ok", true), b"ok");
    }
}
