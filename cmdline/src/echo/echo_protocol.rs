// Copyright (c) 2025 R3BL LLC. Licensed under Apache License, Version 2.0.

use crate::{CmdlineTransport, Protocol};
use std::io;

/// Writes every received line back as its debug representation, eg: `héllo` becomes
/// `"héllo"`, so invisible characters are easy to spot.
#[derive(Debug, Default)]
pub struct EchoProtocol {
    transport: Option<CmdlineTransport>,
    lines_echoed: usize,
    eof_received: bool,
    connection_lost: bool,
}

impl EchoProtocol {
    #[must_use]
    pub fn lines_echoed(&self) -> usize { self.lines_echoed }

    #[must_use]
    pub fn is_eof_received(&self) -> bool { self.eof_received }

    #[must_use]
    pub fn is_connection_lost(&self) -> bool { self.connection_lost }
}

impl Protocol for EchoProtocol {
    fn connection_made(&mut self, transport: CmdlineTransport) {
        self.transport = Some(transport);
    }

    fn data_received(&mut self, line: String) {
        let Some(transport) = &self.transport else {
            return;
        };
        match transport.write(&format!("{line:?}\n")) {
            Ok(()) => self.lines_echoed += 1,
            Err(err) => tracing::warn!(message = "echo: write failed", error = %err),
        }
    }

    fn eof_received(&mut self) {
        self.eof_received = true;
        let Some(transport) = &self.transport else {
            return;
        };
        if let Err(err) = transport.write_eof() {
            tracing::warn!(message = "echo: write_eof failed", error = %err);
        }
    }

    fn connection_lost(&mut self, error: Option<io::Error>) {
        tracing::debug!(
            message = "echo: connection lost",
            lines_echoed = self.lines_echoed,
            error = ?error
        );
        self.connection_lost = true;
        self.transport = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{AccessMode, SharedFd, StreamHandle, TransportConfig, connect_console,
                test_fixtures::{MockReactor, ReadStep, ScriptedRawStream}};
    use pretty_assertions::assert_eq;
    use std::rc::Rc;

    #[test]
    fn lines_come_back_quoted() {
        let (input_end, _unused_write_end) = rustix::pipe::pipe().unwrap();
        let (_unused_read_end, output_end) = rustix::pipe::pipe().unwrap();
        let input_fd = SharedFd::owned(input_end);
        let output_fd = SharedFd::owned(output_end);
        let (input_raw_fd, output_raw_fd) = (input_fd.as_raw_fd(), output_fd.as_raw_fd());

        let input = Rc::new(
            ScriptedRawStream::new(Some(input_fd), AccessMode::Read).with_reads([
                ReadStep::Data(b"plain\ntab\there\n\"quoted\"".to_vec()),
                ReadStep::Eof,
            ]),
        );
        let output = Rc::new(ScriptedRawStream::new(Some(output_fd), AccessMode::Write));

        let reactor = Rc::new(MockReactor::default());
        let (transport, protocol) = connect_console(
            reactor.clone(),
            EchoProtocol::default,
            StreamHandle::Raw(input),
            StreamHandle::Raw(output.clone()),
            &TransportConfig::default(),
        )
        .unwrap();

        reactor.run_deferred();
        assert!(reactor.fire_reader(input_raw_fd).unwrap());
        assert!(reactor.fire_reader(input_raw_fd).unwrap());
        reactor.run_deferred();
        assert!(protocol.borrow().is_eof_received());

        while reactor.is_writer_registered(output_raw_fd) {
            reactor.fire_writer(output_raw_fd).unwrap();
        }
        assert_eq!(
            String::from_utf8(output.written()).unwrap(),
            "\"plain\"\n\"tab\\there\"\n\"\\\"quoted\\\"\"\n"
        );
        assert_eq!(protocol.borrow().lines_echoed(), 3);

        transport.close().unwrap();
        protocol.borrow_mut().connection_lost(None);
        assert!(protocol.borrow().is_connection_lost());
    }
}
