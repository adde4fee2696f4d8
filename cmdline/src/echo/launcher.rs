// Copyright (c) 2025 R3BL LLC. Licensed under Apache License, Version 2.0.

use crate::{MioReactor, Protocol, StreamHandle, TransportConfig, connect_console,
            echo::EchoProtocol};
use miette::IntoDiagnostic;
use signal_hook::consts::{SIGINT, SIGTERM};
use std::{ffi::c_int, rc::Rc};

/// Signals that end the echo loop early. The terminal is restored either way.
pub const TERMINATION_SIGNALS: [c_int; 2] = [SIGINT, SIGTERM];

/// Echo `input` to `output` until end of input or one of [`TERMINATION_SIGNALS`], then
/// wait for the output to drain, close the transport and tell the protocol the
/// connection is gone.
///
/// # Errors
///
/// The streams can't be resolved, the signal handlers can't be installed, or the
/// reactor fails.
pub fn run_app(
    input: StreamHandle,
    output: StreamHandle,
    transport_config: &TransportConfig,
) -> miette::Result<()> {
    let reactor = Rc::new(MioReactor::try_new().into_diagnostic()?);
    // Before the terminal changes mode, so an early Ctrl+C can't leave it changed.
    reactor
        .stop_on_signals(&TERMINATION_SIGNALS)
        .into_diagnostic()?;
    let (transport, protocol) = connect_console(
        reactor.clone(),
        EchoProtocol::default,
        input,
        output,
        transport_config,
    )?;

    // Also ends early if nothing is left to watch, eg: stdin is a regular file that
    // the reactor refused.
    let ran = reactor
        .run_until(|| protocol.borrow().is_eof_received() && !transport.is_writer_registered())
        .into_diagnostic();
    let closed = transport.close();
    protocol.borrow_mut().connection_lost(None);

    tracing::debug!(
        message = "echo: done",
        lines_echoed = protocol.borrow().lines_echoed(),
        caught_signal = ?reactor.caught_signal(),
        registration_status = ?transport.registration_status()
    );

    ran?;
    closed?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_fixtures::open_pty_pair;
    use pretty_assertions::assert_eq;
    use rustix::{fs::OFlags,
                 termios::{LocalModes, tcgetattr}};
    use serial_test::serial;
    use std::{fs::File,
              io::{Read, Write},
              thread,
              time::{Duration, Instant}};

    // Every test here shares the process-wide SIGINT handlers, hence serial.
    #[test]
    #[serial]
    fn echoes_a_pipe_until_eof() {
        let (input_read, input_write) = rustix::pipe::pipe().unwrap();
        let (output_read, output_write) = rustix::pipe::pipe().unwrap();

        let mut input = File::from(input_write);
        input.write_all("hi\nthere 日本".as_bytes()).unwrap();
        drop(input);

        run_app(
            StreamHandle::from_fd(input_read),
            StreamHandle::from_fd(output_write),
            &TransportConfig::default(),
        )
        .unwrap();

        // Every write end is closed once the transport is gone.
        let mut echoed = String::new();
        File::from(output_read).read_to_string(&mut echoed).unwrap();
        assert_eq!(echoed, "\"hi\"\n\"there 日本\"\n");
    }

    #[test]
    #[serial]
    fn latin1_input() {
        let (input_read, input_write) = rustix::pipe::pipe().unwrap();
        let (output_read, output_write) = rustix::pipe::pipe().unwrap();

        let mut input = File::from(input_write);
        input.write_all(b"caf\xE9\n").unwrap();
        drop(input);

        run_app(
            StreamHandle::from_fd(input_read),
            StreamHandle::from_fd(output_write),
            &TransportConfig {
                input_encoding: Some("latin1".into()),
                ..Default::default()
            },
        )
        .unwrap();

        let mut echoed = String::new();
        File::from(output_read).read_to_string(&mut echoed).unwrap();
        assert_eq!(echoed, "\"café\"\n");
    }

    #[test]
    #[serial]
    fn interrupt_restores_the_terminal() {
        let pty = open_pty_pair().unwrap();
        let before = tcgetattr(&pty.slave).unwrap();
        let input = rustix::io::dup(&pty.slave).unwrap();
        let output = rustix::io::dup(&pty.slave).unwrap();
        let watched = rustix::io::dup(&pty.slave).unwrap();

        // Raw mode means the handlers are already installed.
        let interrupter = thread::spawn(move || {
            let deadline = Instant::now() + Duration::from_secs(5);
            let mut saw_raw_mode = false;
            while !saw_raw_mode && Instant::now() < deadline {
                let attributes = tcgetattr(&watched).unwrap();
                saw_raw_mode = !attributes.local_modes.contains(LocalModes::ICANON);
                thread::sleep(Duration::from_millis(10));
            }
            signal_hook::low_level::raise(SIGINT).unwrap();
            saw_raw_mode
        });

        run_app(
            StreamHandle::from_fd(input),
            StreamHandle::from_fd(output),
            &TransportConfig::default(),
        )
        .unwrap();
        assert!(interrupter.join().unwrap());

        let after = tcgetattr(&pty.slave).unwrap();
        assert_eq!(after.local_modes, before.local_modes);
        assert!(!rustix::fs::fcntl_getfl(&pty.slave).unwrap().contains(OFlags::NONBLOCK));
    }
}
