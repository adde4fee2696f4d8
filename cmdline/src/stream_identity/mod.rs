// Copyright (c) 2025 R3BL LLC. Licensed under Apache License, Version 2.0.

//! Turn "something that looks like stdin" into a [`StreamDescriptor`].
//!
//! A handle may be a bare descriptor, a buffered byte stream, or a text stream that wraps
//! both. [`resolve()`] finds the OS descriptor underneath, works out whether it is a tty
//! and which encoding it speaks, and makes sure all three layers exist and agree on the
//! access mode.

// Attach sources.
pub mod access_mode;
pub mod buffered_stream;
pub mod device_encoding;
pub mod fd_raw_stream;
pub mod shared_fd;
pub mod stream_descriptor;
pub mod stream_traits;
pub mod text_file;

// Re-export.
pub use access_mode::*;
pub use buffered_stream::*;
pub use device_encoding::*;
pub use fd_raw_stream::*;
pub use shared_fd::*;
pub use stream_descriptor::*;
pub use stream_traits::*;
pub use text_file::*;
