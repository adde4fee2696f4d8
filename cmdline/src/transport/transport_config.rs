// Copyright (c) 2025 R3BL LLC. Licensed under Apache License, Version 2.0.

use crate::{READ_CHUNK_SIZE, WRITE_CHUNK_SIZE};

/// Knobs for [`CmdlineTransport::new()`](crate::CmdlineTransport::new).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransportConfig {
    /// Encoding label for the input, overriding whatever the stream reports.
    pub input_encoding: Option<String>,
    /// Encoding label for the output, overriding whatever the stream reports.
    pub output_encoding: Option<String>,
    pub read_chunk_size: usize,
    pub write_chunk_size: usize,
}

impl Default for TransportConfig {
    fn default() -> Self {
        Self {
            input_encoding: None,
            output_encoding: None,
            read_chunk_size: READ_CHUNK_SIZE,
            write_chunk_size: WRITE_CHUNK_SIZE,
        }
    }
}
