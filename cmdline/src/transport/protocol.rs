// Copyright (c) 2025 R3BL LLC. Licensed under Apache License, Version 2.0.

use crate::CmdlineTransport;
use std::{cell::RefCell, io, rc::Rc};

/// Your side of the connection. Every callback is delivered on a later reactor turn,
/// never from inside a [`CmdlineTransport`] method, so it is safe to call
/// [`write()`](CmdlineTransport::write) from any of them.
///
/// Order of calls: `connection_made`, any number of `data_received`, then at most one
/// `eof_received`. Nothing is delivered after the transport is closed.
///
/// The transport mutably borrows the [`SharedProtocol`] for the length of each callback.
/// Inside one, [`get_protocol()`](CmdlineTransport::get_protocol) hands back that same
/// cell, so only `try_borrow()` is safe on it. Likewise, a borrow held by the
/// application while the reactor runs makes the transport drop the event with a
/// warning instead of panicking.
pub trait Protocol {
    /// Keep `transport` to write back.
    fn connection_made(&mut self, transport: CmdlineTransport);

    /// One decoded line, without its trailing `\n`. A final line that was not terminated
    /// before end of input is also delivered.
    fn data_received(&mut self, line: String);

    fn eof_received(&mut self) {}

    /// Not called by the transport itself. Applications call it once they have closed
    /// the transport, as the `cmdline_echo` demo does.
    fn connection_lost(&mut self, _error: Option<io::Error>) {}

    /// Never called, this transport has no flow control.
    fn pause_writing(&mut self) {}

    /// Never called, this transport has no flow control.
    fn resume_writing(&mut self) {}
}

/// How the transport holds on to its protocol.
pub type SharedProtocol = Rc<RefCell<dyn Protocol>>;
