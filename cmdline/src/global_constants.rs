// Copyright (c) 2025 R3BL LLC. Licensed under Apache License, Version 2.0.

/// Enable chatty per-turn [`tracing`] events from
/// [`CmdlineTransport`](crate::CmdlineTransport) (reads, writes, queue draining).
pub const DEBUG_CMDLINE_TRANSPORT: bool = false;

/// Enable chatty per-turn [`tracing`] events from [`MioReactor`](crate::MioReactor).
pub const DEBUG_CMDLINE_REACTOR: bool = false;

/// Maximum number of bytes read from the input descriptor per read-ready signal.
pub const READ_CHUNK_SIZE: usize = 4_096;

/// Maximum number of bytes handed to a single `write(2)` per write-ready signal.
/// Larger chunks are split across several write-ready turns.
pub const WRITE_CHUNK_SIZE: usize = 4_096;

/// Capacity of buffered byte views created by the resolver.
pub const DEFAULT_BUFFER_CAPACITY: usize = 8_192;
