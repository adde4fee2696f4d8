// Copyright (c) 2025 R3BL LLC. Licensed under Apache License, Version 2.0.

use std::collections::VecDeque;

/// Encoded chunks waiting for the output descriptor to become writable. The front chunk
/// is the one being written; a partially written chunk goes back to the front.
#[derive(Debug, Default)]
pub struct OutboundQueue {
    chunks: VecDeque<Vec<u8>>,
}

impl OutboundQueue {
    pub fn push_back(&mut self, chunk: Vec<u8>) { self.chunks.push_back(chunk); }

    pub fn pop_front(&mut self) -> Option<Vec<u8>> { self.chunks.pop_front() }

    pub fn requeue_front(&mut self, chunk: Vec<u8>) { self.chunks.push_front(chunk); }

    #[must_use]
    pub fn is_empty(&self) -> bool { self.chunks.is_empty() }

    #[must_use]
    pub fn len(&self) -> usize { self.chunks.len() }

    #[must_use]
    pub fn total_bytes(&self) -> usize { self.chunks.iter().map(Vec::len).sum() }

    /// Drop everything. Returns how many bytes were abandoned.
    pub fn clear(&mut self) -> usize {
        let abandoned = self.total_bytes();
        self.chunks.clear();
        abandoned
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn partial_write_goes_back_to_the_front() {
        let mut queue = OutboundQueue::default();
        queue.push_back(b"first".to_vec());
        queue.push_back(b"second".to_vec());

        let mut chunk = queue.pop_front().unwrap();
        chunk.drain(..2);
        queue.requeue_front(chunk);

        assert_eq!(queue.len(), 2);
        assert_eq!(queue.total_bytes(), 9);
        assert_eq!(queue.pop_front().unwrap(), b"rst");
        assert_eq!(queue.clear(), 6);
        assert!(queue.is_empty());
    }
}
