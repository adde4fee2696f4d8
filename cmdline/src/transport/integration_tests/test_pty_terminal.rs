// Copyright (c) 2025 R3BL LLC. Licensed under Apache License, Version 2.0.

use crate::{MioReactor, StreamHandle, TransportConfig, VMIN_RAW_MODE, connect_console,
            test_fixtures::{ProtocolRecorder, open_pty_pair, reopen_slave}};
use pretty_assertions::assert_eq;
use rustix::{fs::OFlags,
             termios::{LocalModes, SpecialCodeIndex, tcgetattr}};
use serial_test::serial;
use std::{rc::Rc, time::Duration};

const TURN: Duration = Duration::from_millis(50);

#[test]
#[serial]
fn tty_input_is_non_canonical_until_close() {
    let pty = open_pty_pair().unwrap();
    let before = tcgetattr(&pty.slave).unwrap();
    assert!(before.local_modes.contains(LocalModes::ICANON));

    let output = rustix::io::dup(&pty.slave).unwrap();
    let input = rustix::io::dup(&pty.slave).unwrap();

    let reactor = Rc::new(MioReactor::try_new().unwrap());
    let (transport, _protocol) = connect_console(
        reactor,
        ProtocolRecorder::default,
        StreamHandle::from_fd(input),
        StreamHandle::from_fd(output),
        &TransportConfig::default(),
    )
    .unwrap();

    let during = tcgetattr(&pty.slave).unwrap();
    assert!(!during.local_modes.contains(LocalModes::ICANON));
    assert_eq!(during.special_codes[SpecialCodeIndex::VMIN], VMIN_RAW_MODE);
    assert!(transport.input().is_tty);

    // Same terminal on both sides, so the output doubles as the terminal stream.
    assert!(transport.is_terminal_shared());
    assert!(transport.terminal().is_some());

    transport.close().unwrap();
    let after = tcgetattr(&pty.slave).unwrap();
    assert_eq!(after.local_modes, before.local_modes);
    assert_eq!(
        after.special_codes[SpecialCodeIndex::VMIN],
        before.special_codes[SpecialCodeIndex::VMIN]
    );
    assert_eq!(
        after.special_codes[SpecialCodeIndex::VTIME],
        before.special_codes[SpecialCodeIndex::VTIME]
    );
}

#[test]
#[serial]
fn separately_opened_slave_is_the_same_terminal() {
    let pty = open_pty_pair().unwrap();
    let output = reopen_slave(&pty, OFlags::WRONLY).unwrap();
    let input = rustix::io::dup(&pty.slave).unwrap();

    let reactor = Rc::new(MioReactor::try_new().unwrap());
    let (transport, _protocol) = connect_console(
        reactor,
        ProtocolRecorder::default,
        StreamHandle::from_fd(input),
        StreamHandle::from_fd(output),
        &TransportConfig::default(),
    )
    .unwrap();

    assert!(transport.is_terminal_shared());
    transport.close().unwrap();
}

#[test]
#[serial]
fn piped_output_opens_the_terminal_by_name() {
    let pty = open_pty_pair().unwrap();
    let input = rustix::io::dup(&pty.slave).unwrap();
    let (_output_read, output_write) = rustix::pipe::pipe().unwrap();

    let reactor = Rc::new(MioReactor::try_new().unwrap());
    let (transport, _protocol) = connect_console(
        reactor,
        ProtocolRecorder::default,
        StreamHandle::from_fd(input),
        StreamHandle::from_fd(output_write),
        &TransportConfig::default(),
    )
    .unwrap();

    assert!(!transport.is_terminal_shared());
    let terminal = transport.terminal().unwrap();
    assert!(terminal.is_tty);
    assert!(terminal.fd.is_some());
    assert!(terminal.mode.access().can_write());
    assert!(!transport.output().is_tty);

    transport.close().unwrap();
}

#[test]
#[serial]
fn typed_lines_then_hangup() {
    let pty = open_pty_pair().unwrap();
    let input = rustix::io::dup(&pty.slave).unwrap();
    let output = rustix::io::dup(&pty.slave).unwrap();

    let reactor = Rc::new(MioReactor::try_new().unwrap());
    let (transport, protocol) = connect_console(
        reactor.clone(),
        ProtocolRecorder::default,
        StreamHandle::from_fd(input),
        StreamHandle::from_fd(output),
        &TransportConfig::default(),
    )
    .unwrap();

    // Typed after the switch to non-canonical mode, so bytes are readable right away.
    rustix::io::write(&pty.master, b"abc\ndef").unwrap();
    for _ in 0..100 {
        if !protocol.borrow().lines().is_empty() {
            break;
        }
        reactor.run_once(Some(TURN)).unwrap();
    }
    // Let the unterminated tail reach the line assembler before hanging up, since a
    // hangup discards unread input.
    for _ in 0..5 {
        reactor.run_once(Some(TURN)).unwrap();
    }

    drop(pty.master);
    for _ in 0..100 {
        if protocol.borrow().saw_eof() {
            break;
        }
        reactor.run_once(Some(TURN)).unwrap();
    }

    assert_eq!(protocol.borrow().lines(), vec!["abc", "def"]);
    assert!(protocol.borrow().saw_eof());

    // Restoring attributes on a hung up terminal may fail with EIO.
    let _unused = transport.close();
}
