// Copyright (c) 2025 R3BL LLC. Licensed under Apache License, Version 2.0.

use crate::{AccessMode, CmdlineError, CmdlineTransport, Protocol, SharedFd, StreamHandle,
            TransportConfig, TransportLifecycle, WatchStatus, connect_console,
            test_fixtures::{MockReactor, ProtocolEvent, ProtocolRecorder, ReadStep,
                            ScriptedRawStream, WriteStep}};
use pretty_assertions::assert_eq;
use std::{cell::RefCell, io::ErrorKind, os::fd::RawFd, rc::Rc};

struct Harness {
    reactor: Rc<MockReactor>,
    transport: CmdlineTransport,
    protocol: Rc<RefCell<ProtocolRecorder>>,
    input: Rc<ScriptedRawStream>,
    output: Rc<ScriptedRawStream>,
    input_fd: RawFd,
    output_fd: RawFd,
}

impl Harness {
    fn new(config: &TransportConfig) -> Self {
        // Real descriptors so the transport accepts the streams; bytes never touch them.
        let (input_end, _unused_write_end) = rustix::pipe::pipe().unwrap();
        let (_unused_read_end, output_end) = rustix::pipe::pipe().unwrap();
        let input_fd = SharedFd::owned(input_end);
        let output_fd = SharedFd::owned(output_end);
        let (input_raw_fd, output_raw_fd) = (input_fd.as_raw_fd(), output_fd.as_raw_fd());

        let input = Rc::new(ScriptedRawStream::new(Some(input_fd), AccessMode::Read));
        let output = Rc::new(ScriptedRawStream::new(Some(output_fd), AccessMode::Write));
        let reactor = Rc::new(MockReactor::default());

        let (transport, protocol) = connect_console(
            reactor.clone(),
            ProtocolRecorder::default,
            StreamHandle::Raw(input.clone()),
            StreamHandle::Raw(output.clone()),
            config,
        )
        .unwrap();

        Self {
            reactor,
            transport,
            protocol,
            input,
            output,
            input_fd: input_raw_fd,
            output_fd: output_raw_fd,
        }
    }

    /// Construct and run the scheduled setup tasks.
    fn connected() -> Self {
        let it = Self::new(&TransportConfig::default());
        it.reactor.run_deferred();
        it
    }

    fn fire_reader(&self) { assert!(self.reactor.fire_reader(self.input_fd).unwrap()); }

    fn fire_writer(&self) { assert!(self.reactor.fire_writer(self.output_fd).unwrap()); }

    fn events(&self) -> Vec<ProtocolEvent> { self.protocol.borrow().events.clone() }

    fn lines(&self) -> Vec<String> { self.protocol.borrow().lines() }
}

#[test]
fn construction_defers_everything() {
    let it = Harness::new(&TransportConfig::default());

    assert!(it.events().is_empty());
    assert_eq!(it.transport.lifecycle(), TransportLifecycle::Unconnected);
    assert!(!it.reactor.is_reader_registered(it.input_fd));
    assert_eq!(it.reactor.pending_tasks(), 2);

    it.reactor.run_deferred();
    assert_eq!(it.events(), vec![ProtocolEvent::ConnectionMade]);
    assert_eq!(it.transport.lifecycle(), TransportLifecycle::Connected);
    assert!(it.reactor.is_reader_registered(it.input_fd));
    assert!(it.transport.is_reader_registered());
    assert!(it.protocol.borrow().transport.is_some());
    assert!(!it.transport.input().is_tty);
    assert!(it.transport.terminal().is_none());
}

#[test]
fn each_newline_delivers_one_line() {
    let it = Harness::connected();
    it.input.push_read(ReadStep::Data(b"abc\nde".to_vec()));
    it.input.push_read(ReadStep::Data(b"f\n\nghi".to_vec()));

    it.fire_reader();
    it.fire_reader();
    // Nothing is delivered until the deferred notifications run.
    assert_eq!(it.lines(), Vec::<String>::new());

    it.reactor.run_deferred();
    assert_eq!(it.lines(), vec!["abc", "def", ""]);
}

#[test]
fn multi_byte_character_split_across_reads() {
    let it = Harness::connected();
    let bytes = "né日🦀\n".as_bytes();
    for byte in bytes {
        it.input.push_read(ReadStep::Data(vec![*byte]));
    }
    for _ in bytes {
        it.fire_reader();
    }
    it.reactor.run_deferred();
    assert_eq!(it.lines(), vec!["né日🦀"]);
}

#[test]
fn transient_read_results_are_ignored() {
    let it = Harness::connected();
    it.input.push_read(ReadStep::WouldBlock);
    it.input.push_read(ReadStep::Interrupted);
    it.fire_reader();
    it.fire_reader();
    it.reactor.run_deferred();
    assert_eq!(it.events(), vec![ProtocolEvent::ConnectionMade]);
    assert!(it.transport.is_reader_registered());
}

#[test]
fn end_of_input_flushes_tail_then_eof() {
    let it = Harness::connected();
    it.input.push_read(ReadStep::Data(b"one\ntwo".to_vec()));
    it.input.push_read(ReadStep::Eof);

    it.fire_reader();
    it.fire_reader();
    assert!(!it.reactor.is_reader_registered(it.input_fd));
    assert!(!it.transport.is_reader_registered());

    it.reactor.run_deferred();
    assert_eq!(
        it.events(),
        vec![
            ProtocolEvent::ConnectionMade,
            ProtocolEvent::Data("one".into()),
            ProtocolEvent::Data("two".into()),
            ProtocolEvent::Eof,
        ]
    );
}

#[test]
fn read_errors_propagate() {
    let it = Harness::connected();
    it.input.push_read(ReadStep::Fail(ErrorKind::ConnectionReset));
    let err = it.reactor.fire_reader(it.input_fd).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::ConnectionReset);
}

#[test]
fn short_writes_are_retried_until_drained() {
    let it = Harness::connected();
    for step in [
        WriteStep::Accept(3),
        WriteStep::WouldBlock,
        WriteStep::Accept(0),
        WriteStep::Accept(2),
    ] {
        it.output.push_write(step);
    }

    it.transport.write("hello world").unwrap();
    assert!(it.reactor.is_writer_registered(it.output_fd));

    for _ in 0..4 {
        it.fire_writer();
        // Registered exactly while bytes are queued.
        assert!(it.transport.queued_bytes() > 0);
        assert!(it.reactor.is_writer_registered(it.output_fd));
    }

    it.fire_writer();
    assert_eq!(it.transport.queued_bytes(), 0);
    assert!(!it.reactor.is_writer_registered(it.output_fd));
    assert!(!it.transport.is_writer_registered());
    assert_eq!(it.output.written(), b"hello world");
}

#[test]
fn large_writes_are_chunked() {
    let it = Harness::new(&TransportConfig {
        write_chunk_size: 4,
        ..Default::default()
    });
    it.reactor.run_deferred();

    it.transport.write("0123456789").unwrap();
    it.fire_writer();
    it.fire_writer();
    assert!(it.reactor.is_writer_registered(it.output_fd));
    // The last chunk drains the queue and drops the writer in the same turn.
    it.fire_writer();
    assert!(!it.reactor.is_writer_registered(it.output_fd));

    assert_eq!(it.output.write_calls(), 3);
    assert_eq!(it.output.written(), b"0123456789");
}

#[test]
fn writes_keep_their_order() {
    let it = Harness::connected();
    it.output.push_write(WriteStep::Accept(1));
    it.transport.write("ab").unwrap();
    it.transport.write("cd").unwrap();
    while it.reactor.is_writer_registered(it.output_fd) {
        it.fire_writer();
    }
    assert_eq!(it.output.written(), b"abcd");
}

#[test]
fn write_errors_keep_the_chunk() {
    let it = Harness::connected();
    it.output.push_write(WriteStep::Fail(ErrorKind::BrokenPipe));
    it.transport.write("keep").unwrap();

    let err = it.reactor.fire_writer(it.output_fd).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::BrokenPipe);
    assert_eq!(it.transport.queued_bytes(), 4);

    it.fire_writer();
    assert_eq!(it.output.written(), b"keep");
}

#[test]
fn empty_writes_do_nothing() {
    let it = Harness::connected();
    it.transport.write("").unwrap();
    it.transport.write_eof().unwrap();
    assert!(it.transport.can_write_eof());
    assert!(!it.reactor.is_writer_registered(it.output_fd));
}

#[test]
fn encoding_overrides() {
    let it = Harness::new(&TransportConfig {
        input_encoding: Some("latin1".into()),
        output_encoding: Some("latin1".into()),
        ..Default::default()
    });
    it.reactor.run_deferred();

    it.input.push_read(ReadStep::Data(b"caf\xE9\n".to_vec()));
    it.fire_reader();
    it.reactor.run_deferred();
    assert_eq!(it.lines(), vec!["café"]);

    // "日" has no windows-1252 mapping and is dropped.
    it.transport.write("é日!").unwrap();
    it.fire_writer();
    assert_eq!(it.output.written(), b"\xE9!");
}

#[test]
fn close_is_idempotent_and_silent() {
    let it = Harness::connected();
    it.input.push_read(ReadStep::Data(b"late\n".to_vec()));
    it.fire_reader();
    it.transport.write("abandoned").unwrap();

    it.transport.close().unwrap();
    it.transport.close().unwrap();

    // The notification queued before close is dropped.
    it.reactor.run_deferred();
    assert_eq!(it.events(), vec![ProtocolEvent::ConnectionMade]);

    assert!(it.transport.is_closing());
    assert!(it.transport.get_protocol().is_none());
    assert_eq!(it.transport.queued_bytes(), 0);
    assert!(!it.reactor.is_reader_registered(it.input_fd));
    assert!(!it.reactor.is_writer_registered(it.output_fd));
    assert!(matches!(
        it.transport.write("x"),
        Err(CmdlineError::TransportClosed)
    ));
}

#[test]
fn close_before_connection_made() {
    let it = Harness::new(&TransportConfig::default());
    it.transport.close().unwrap();
    it.reactor.run_deferred();
    assert!(it.events().is_empty());
    assert!(!it.reactor.is_reader_registered(it.input_fd));
}

#[test]
fn notifications_go_to_the_protocol_current_when_scheduled() {
    let it = Harness::connected();
    let replacement = Rc::new(RefCell::new(ProtocolRecorder::default()));
    replacement
        .borrow_mut()
        .connection_made(it.transport.clone());

    it.input.push_read(ReadStep::Data(b"first\n".to_vec()));
    it.fire_reader();
    it.transport.set_protocol(replacement.clone());
    it.input.push_read(ReadStep::Data(b"second\n".to_vec()));
    it.fire_reader();

    it.reactor.run_deferred();
    assert_eq!(it.lines(), vec!["first"]);
    assert_eq!(replacement.borrow().lines(), vec!["second"]);
}

#[test]
fn refused_registration_is_degraded_mode() {
    let it = Harness::new(&TransportConfig::default());
    it.reactor.refuse_registrations(ErrorKind::PermissionDenied);
    it.reactor.run_deferred();

    // Construction succeeded and the protocol is connected anyway.
    assert_eq!(it.events(), vec![ProtocolEvent::ConnectionMade]);
    let status = it.transport.registration_status();
    assert_eq!(status.reader, WatchStatus::Refused(ErrorKind::PermissionDenied));
    assert_eq!(status.writer, WatchStatus::NotRegistered);

    it.transport.write("stuck").unwrap();
    let status = it.transport.registration_status();
    assert_eq!(status.writer, WatchStatus::Refused(ErrorKind::PermissionDenied));
    assert!(status.is_degraded());
    assert_eq!(it.transport.queued_bytes(), 5);
}

#[test]
fn flow_control_is_not_supported() {
    let it = Harness::connected();
    let operations = [
        it.transport.get_write_buffer_size().map(|_| ()),
        it.transport.set_write_buffer_limits(Some(1), None),
        it.transport.abort(),
        it.transport.pause_reading(),
        it.transport.resume_reading(),
    ];
    let names: Vec<&str> = operations
        .iter()
        .map(|result| match result {
            Err(CmdlineError::NotSupported { operation }) => *operation,
            other => panic!("unexpected {other:?}"),
        })
        .collect();
    assert_eq!(
        names,
        vec![
            "get_write_buffer_size",
            "set_write_buffer_limits",
            "abort",
            "pause_reading",
            "resume_reading",
        ]
    );
    // Still usable afterwards.
    assert!(!it.transport.is_closing());
}

#[test]
fn streams_without_descriptors_are_rejected() {
    let reactor = Rc::new(MockReactor::default());
    let (_read_end, write_end) = rustix::pipe::pipe().unwrap();
    let result = connect_console(
        reactor,
        ProtocolRecorder::default,
        StreamHandle::Raw(Rc::new(ScriptedRawStream::without_fd(AccessMode::Read))),
        StreamHandle::from_fd(write_end),
        &TransportConfig::default(),
    );
    assert!(matches!(
        result,
        Err(CmdlineError::MissingDescriptor { which: "input" })
    ));
}

#[test]
fn borrowed_protocol_misses_events_without_panicking() {
    let it = Harness::connected();
    it.input.push_read(ReadStep::Data(b"a\nb\n".to_vec()));
    it.fire_reader();
    {
        let _held = it.protocol.borrow();
        it.reactor.run_deferred();
    }
    assert_eq!(it.lines(), Vec::<String>::new());

    it.input.push_read(ReadStep::Data(b"c\n".to_vec()));
    it.fire_reader();
    it.reactor.run_deferred();
    assert_eq!(it.lines(), vec!["c"]);
}

/// Looks itself up through the transport while handling a line.
#[derive(Default)]
struct SelfInspecting {
    transport: Option<CmdlineTransport>,
    cell_was_busy: Vec<bool>,
}

impl Protocol for SelfInspecting {
    fn connection_made(&mut self, transport: CmdlineTransport) {
        self.transport = Some(transport);
    }

    fn data_received(&mut self, _line: String) {
        let busy = self
            .transport
            .as_ref()
            .and_then(CmdlineTransport::get_protocol)
            .is_some_and(|it| it.try_borrow().is_err());
        self.cell_was_busy.push(busy);
    }
}

#[test]
fn protocol_cell_is_borrowed_during_callbacks() {
    let (input_end, _unused_write_end) = rustix::pipe::pipe().unwrap();
    let (_unused_read_end, output_end) = rustix::pipe::pipe().unwrap();
    let input_fd = SharedFd::owned(input_end);
    let input_raw_fd = input_fd.as_raw_fd();
    let input = Rc::new(ScriptedRawStream::new(Some(input_fd), AccessMode::Read));
    let reactor = Rc::new(MockReactor::default());

    let (transport, protocol) = connect_console(
        reactor.clone(),
        SelfInspecting::default,
        StreamHandle::Raw(input.clone()),
        StreamHandle::from_fd(output_end),
        &TransportConfig::default(),
    )
    .unwrap();
    reactor.run_deferred();

    input.push_read(ReadStep::Data(b"line\n".to_vec()));
    assert!(reactor.fire_reader(input_raw_fd).unwrap());
    reactor.run_deferred();

    assert_eq!(protocol.borrow().cell_was_busy, vec![true]);
    transport.close().unwrap();
}
