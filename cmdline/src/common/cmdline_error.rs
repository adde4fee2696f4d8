// Copyright (c) 2025 R3BL LLC. Licensed under Apache License, Version 2.0.

// cspell:words ttyname

//! Error type shared by every module in this crate. See [`CmdlineError`].

/// Errors produced by the resolver, the codecs, the terminal mode controller and the
/// transport.
///
/// | Variant                | Raised by                                | When                                  |
/// | :--------------------- | :--------------------------------------- | :------------------------------------ |
/// | [`InvalidHandle`]      | [`resolve()`]                            | Handle can neither read nor write     |
/// | [`InvalidMode`]        | [`OpenMode::parse()`], [`resolve()`]     | Mode string is not a legal combination|
/// | [`UnknownEncoding`]    | [`lookup_encoding()`], [`resolve()`]     | Encoding label is not recognized      |
/// | [`NotATty`]            | [`StreamDescriptor::tty_path()`]         | A tty was required                    |
/// | [`MissingDescriptor`]  | [`CmdlineTransport::new()`]              | Stream has no OS descriptor           |
/// | [`MalformedInput`]     | [`IncrementalDecoder::try_decode()`]     | Strict decode saw invalid bytes       |
/// | [`TerminalAttributes`] | [`enter_raw()`], [`restore()`]           | `tcgetattr` / `tcsetattr` failed      |
/// | [`TransportClosed`]    | [`CmdlineTransport::write()`]            | Write after close                     |
/// | [`NotSupported`]       | flow-control operations                  | Always (not designed yet)             |
/// | [`Io`]                 | anywhere                                 | Any other OS error                    |
///
/// The construction-fatal variants ([`InvalidHandle`], [`InvalidMode`],
/// [`UnknownEncoding`], [`MissingDescriptor`]) mean no transport was built.
///
/// [`CmdlineTransport::new()`]: crate::CmdlineTransport::new
/// [`CmdlineTransport::write()`]: crate::CmdlineTransport::write
/// [`IncrementalDecoder::try_decode()`]: crate::IncrementalDecoder::try_decode
/// [`InvalidHandle`]: Self::InvalidHandle
/// [`InvalidMode`]: Self::InvalidMode
/// [`Io`]: Self::Io
/// [`MalformedInput`]: Self::MalformedInput
/// [`MissingDescriptor`]: Self::MissingDescriptor
/// [`NotATty`]: Self::NotATty
/// [`NotSupported`]: Self::NotSupported
/// [`OpenMode::parse()`]: crate::OpenMode::parse
/// [`StreamDescriptor::tty_path()`]: crate::StreamDescriptor::tty_path
/// [`TerminalAttributes`]: Self::TerminalAttributes
/// [`TransportClosed`]: Self::TransportClosed
/// [`UnknownEncoding`]: Self::UnknownEncoding
/// [`enter_raw()`]: crate::enter_raw
/// [`lookup_encoding()`]: crate::lookup_encoding
/// [`resolve()`]: crate::resolve
/// [`restore()`]: crate::restore
#[derive(Debug, thiserror::Error, miette::Diagnostic)]
pub enum CmdlineError {
    /// The handle failed the minimal capability check.
    #[error("Invalid stream handle: {reason}")]
    #[diagnostic(
        code(r3bl_cmdline::stream::invalid_handle),
        help("The handle must be readable or writable; a closed descriptor is neither")
    )]
    InvalidHandle { reason: String },

    #[error("Invalid mode {mode:?}")]
    #[diagnostic(
        code(r3bl_cmdline::stream::invalid_mode),
        help(
            "Use exactly one of `r`, `w`, `x`, `a`, optionally followed by `+`, \
             optionally with one of `b` or `t`"
        )
    )]
    InvalidMode { mode: String },

    #[error("Unknown encoding {label:?}")]
    #[diagnostic(
        code(r3bl_cmdline::codec::unknown_encoding),
        help("Use a WHATWG encoding label such as `utf-8`, `latin1` or `shift_jis`")
    )]
    UnknownEncoding { label: String },

    #[error("Stream is not a tty: {reason}")]
    #[diagnostic(code(r3bl_cmdline::stream::not_a_tty))]
    NotATty { reason: &'static str },

    #[error("The {which} stream has no file descriptor")]
    #[diagnostic(
        code(r3bl_cmdline::transport::missing_descriptor),
        help("The reactor can only watch streams backed by an OS file descriptor")
    )]
    MissingDescriptor { which: &'static str },

    #[error("Malformed {encoding} input")]
    #[diagnostic(code(r3bl_cmdline::codec::malformed_input))]
    MalformedInput { encoding: &'static str },

    #[error("Failed to {action} terminal attributes")]
    #[diagnostic(code(r3bl_cmdline::terminal_mode::attributes))]
    TerminalAttributes {
        /// `"read"` or `"apply"`.
        action: &'static str,
        #[source]
        source: std::io::Error,
    },

    #[error("Transport is closed")]
    #[diagnostic(code(r3bl_cmdline::transport::closed))]
    TransportClosed,

    #[error("{operation} is not supported yet")]
    #[diagnostic(
        code(r3bl_cmdline::transport::not_supported),
        help("Backpressure and reading flow control are not implemented by this transport")
    )]
    NotSupported { operation: &'static str },

    #[error("I/O error")]
    #[diagnostic(code(r3bl_cmdline::io))]
    Io(#[from] std::io::Error),
}

impl From<rustix::io::Errno> for CmdlineError {
    fn from(errno: rustix::io::Errno) -> Self { CmdlineError::Io(errno.into()) }
}
