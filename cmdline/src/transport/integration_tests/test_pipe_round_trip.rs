// Copyright (c) 2025 R3BL LLC. Licensed under Apache License, Version 2.0.

use crate::{MioReactor, StreamHandle, TransportConfig, WatchStatus, connect_console,
            test_fixtures::{ProtocolEvent, ProtocolRecorder}};
use pretty_assertions::assert_eq;
use rustix::fs::OFlags;
use std::{fs::File,
          io::{Read, Write},
          rc::Rc,
          thread};

fn read_exactly(file: &mut File, len: usize) -> Vec<u8> {
    let mut bytes = vec![0_u8; len];
    file.read_exact(&mut bytes).unwrap();
    bytes
}

#[test]
fn lines_in_then_text_out() {
    let (input_read, input_write) = rustix::pipe::pipe().unwrap();
    let (output_read, output_write) = rustix::pipe::pipe().unwrap();

    let reactor = Rc::new(MioReactor::try_new().unwrap());
    let (transport, protocol) = connect_console(
        reactor.clone(),
        ProtocolRecorder::default,
        StreamHandle::from_fd(input_read),
        StreamHandle::from_fd(output_write),
        &TransportConfig::default(),
    )
    .unwrap();

    let mut input = File::from(input_write);
    input.write_all("one\nzwei 日本\nthree".as_bytes()).unwrap();
    drop(input);

    reactor.run_until(|| protocol.borrow().saw_eof()).unwrap();
    assert_eq!(
        protocol.borrow().events,
        vec![
            ProtocolEvent::ConnectionMade,
            ProtocolEvent::Data("one".into()),
            ProtocolEvent::Data("zwei 日本".into()),
            ProtocolEvent::Data("three".into()),
            ProtocolEvent::Eof,
        ]
    );
    assert!(!transport.is_reader_registered());

    transport.write("bye 日本\n").unwrap();
    assert!(transport.is_writer_registered());
    // Runs until the writer drains and nothing is registered.
    reactor.run().unwrap();
    assert!(!transport.is_writer_registered());

    let expected = "bye 日本\n".as_bytes();
    let mut output = File::from(output_read);
    assert_eq!(read_exactly(&mut output, expected.len()), expected);

    transport.close().unwrap();
}

#[test]
fn close_puts_the_input_back_in_blocking_mode() {
    let (input_read, _input_write) = rustix::pipe::pipe().unwrap();
    let (_output_read, output_write) = rustix::pipe::pipe().unwrap();
    let watched = rustix::io::dup(&input_read).unwrap();

    let reactor = Rc::new(MioReactor::try_new().unwrap());
    let (transport, _protocol) = connect_console(
        reactor,
        ProtocolRecorder::default,
        StreamHandle::from_fd(input_read),
        StreamHandle::from_fd(output_write),
        &TransportConfig::default(),
    )
    .unwrap();

    // Duplicates share the open file description, so they see the same flags.
    assert!(transport.input().made_non_blocking);
    assert!(rustix::fs::fcntl_getfl(&watched).unwrap().contains(OFlags::NONBLOCK));

    transport.close().unwrap();
    assert!(!rustix::fs::fcntl_getfl(&watched).unwrap().contains(OFlags::NONBLOCK));
}

#[test]
fn output_larger_than_the_pipe_buffer() {
    let (input_read, _input_write) = rustix::pipe::pipe().unwrap();
    let (output_read, output_write) = rustix::pipe::pipe().unwrap();

    let line = "0123456789abcdef0123456789abcdef0123456789abcdef0123456789abcde\n";
    let text = line.repeat(4096);
    let total = text.len();

    let drain = thread::spawn(move || read_exactly(&mut File::from(output_read), total));

    let reactor = Rc::new(MioReactor::try_new().unwrap());
    let (transport, _protocol) = connect_console(
        reactor.clone(),
        ProtocolRecorder::default,
        StreamHandle::from_fd(input_read),
        StreamHandle::from_fd(output_write),
        &TransportConfig::default(),
    )
    .unwrap();

    transport.write(&text).unwrap();
    reactor
        .run_until(|| transport.queued_bytes() == 0 && !transport.is_writer_registered())
        .unwrap();

    let received = drain.join().unwrap();
    assert_eq!(received.len(), total);
    assert!(received == text.as_bytes());

    transport.close().unwrap();
}

#[test]
fn regular_file_input_degrades_gracefully() {
    let path = std::env::temp_dir().join(format!(
        "r3bl_cmdline_regular_file_input_{}",
        std::process::id()
    ));
    std::fs::write(&path, "ignored\n").unwrap();
    let file = File::open(&path).unwrap();
    let (_output_read, output_write) = rustix::pipe::pipe().unwrap();

    let reactor = Rc::new(MioReactor::try_new().unwrap());
    let (transport, protocol) = connect_console(
        reactor.clone(),
        ProtocolRecorder::default,
        StreamHandle::from_fd(rustix::fd::OwnedFd::from(file)),
        StreamHandle::from_fd(output_write),
        &TransportConfig::default(),
    )
    .unwrap();

    reactor.run().unwrap();

    // epoll refuses regular files, but the protocol is still connected.
    assert!(protocol.borrow().is_connected());
    assert_eq!(
        transport.registration_status().reader,
        WatchStatus::Refused(std::io::ErrorKind::PermissionDenied)
    );
    assert!(transport.registration_status().is_degraded());

    transport.close().unwrap();
    std::fs::remove_file(&path).unwrap();
}
