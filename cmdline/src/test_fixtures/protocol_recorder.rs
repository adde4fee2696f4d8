// Copyright (c) 2025 R3BL LLC. Licensed under Apache License, Version 2.0.

use crate::{CmdlineTransport, Protocol};
use std::io;

/// One callback, as seen by [`ProtocolRecorder`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProtocolEvent {
    ConnectionMade,
    Data(String),
    Eof,
    ConnectionLost(Option<io::ErrorKind>),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
enum RecorderState {
    #[default]
    Initial,
    Connected,
    EofReceived,
    Closed,
}

/// A [`Protocol`] that records every callback and panics if they arrive out of order:
/// `connection_made`, then `data_received`*, then `eof_received`?, then
/// `connection_lost`.
#[derive(Debug, Default)]
pub struct ProtocolRecorder {
    pub transport: Option<CmdlineTransport>,
    pub events: Vec<ProtocolEvent>,
    state: RecorderState,
}

impl ProtocolRecorder {
    /// Every line received so far.
    #[must_use]
    pub fn lines(&self) -> Vec<String> {
        self.events
            .iter()
            .filter_map(|event| match event {
                ProtocolEvent::Data(line) => Some(line.clone()),
                _ => None,
            })
            .collect()
    }

    #[must_use]
    pub fn is_connected(&self) -> bool { self.state != RecorderState::Initial }

    #[must_use]
    pub fn saw_eof(&self) -> bool { self.events.contains(&ProtocolEvent::Eof) }
}

impl Protocol for ProtocolRecorder {
    fn connection_made(&mut self, transport: CmdlineTransport) {
        assert_eq!(self.state, RecorderState::Initial, "connection_made twice");
        self.state = RecorderState::Connected;
        self.transport = Some(transport);
        self.events.push(ProtocolEvent::ConnectionMade);
    }

    fn data_received(&mut self, line: String) {
        assert_eq!(self.state, RecorderState::Connected, "data_received out of order");
        self.events.push(ProtocolEvent::Data(line));
    }

    fn eof_received(&mut self) {
        assert_eq!(self.state, RecorderState::Connected, "eof_received out of order");
        self.state = RecorderState::EofReceived;
        self.events.push(ProtocolEvent::Eof);
    }

    fn connection_lost(&mut self, error: Option<io::Error>) {
        assert!(
            matches!(
                self.state,
                RecorderState::Connected | RecorderState::EofReceived
            ),
            "connection_lost out of order"
        );
        self.state = RecorderState::Closed;
        self.transport = None;
        self.events
            .push(ProtocolEvent::ConnectionLost(error.map(|it| it.kind())));
    }
}
