// Copyright (c) 2025 R3BL LLC. Licensed under Apache License, Version 2.0.

use crate::{CmdlineError, CmdlineTransport, Protocol, Reactor, StreamHandle,
            TransportConfig};
use std::{cell::RefCell, rc::Rc};

/// Build a protocol with `protocol_factory` and connect it to `input` and `output`.
///
/// Returns the transport and a typed handle to the protocol, so the caller can inspect
/// it once the reactor has run.
///
/// # Errors
///
/// Anything [`CmdlineTransport::new()`] reports.
pub fn connect_console<P: Protocol + 'static>(
    reactor: Rc<dyn Reactor>,
    protocol_factory: impl FnOnce() -> P,
    input: StreamHandle,
    output: StreamHandle,
    config: &TransportConfig,
) -> Result<(CmdlineTransport, Rc<RefCell<P>>), CmdlineError> {
    let protocol = Rc::new(RefCell::new(protocol_factory()));
    let transport = CmdlineTransport::new(reactor, protocol.clone(), input, output, config)?;
    Ok((transport, protocol))
}
