// Copyright (c) 2025 R3BL LLC. Licensed under Apache License, Version 2.0.

//! Incremental text codecs.
//!
//! Bytes arrive from the OS in arbitrary chunks, so a multi-byte character can be split
//! across two reads. [`IncrementalDecoder`] keeps the incomplete tail between calls and
//! only resolves it when told the input is final. [`IncrementalEncoder`] mirrors this
//! for output, but the transport finalizes it on every write since each write is
//! self-contained text.
//!
//! Both are thin wrappers around [`encoding_rs`].

// Attach sources.
pub mod decode_error_policy;
pub mod encoding_lookup;
pub mod incremental_decoder;
pub mod incremental_encoder;

// Re-export.
pub use decode_error_policy::*;
pub use encoding_lookup::*;
pub use incremental_decoder::*;
pub use incremental_encoder::*;
