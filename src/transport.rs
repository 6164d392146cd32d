//! Line-framed peer links.
//!
//! Each peer board is reached over its own UART. A [`LineChannel`] wraps one
//! [`SerialPort`] and turns its byte stream into `\r\n`-terminated ASCII lines.
//! Reads never block; writes are fire-and-forget. Ports backed by a small
//! hardware FIFO park outbound bytes in a [`TxQueue`] instead of waiting.

use heapless::{Deque, String, Vec};

use crate::config::MAX_LINE_LEN;
use crate::protocol::{LINE_END, Peer};

/// Byte-level access to one serial link.
pub trait SerialPort {
    /// Returns the next buffered byte, or `None` right away if nothing is waiting.
    fn read_byte(&mut self) -> Option<u8>;

    /// Queues `bytes` for transmission. Failures are not reported.
    fn write_all(&mut self, bytes: &[u8]);
}

pub type Line = String<MAX_LINE_LEN>;

pub struct LineChannel<P> {
    peer: Peer,
    port: P,
    partial: Vec<u8, MAX_LINE_LEN>,
    // Set after an overlong line until its terminator is seen.
    discarding: bool,
}

impl<P: SerialPort> LineChannel<P> {
    pub fn new(peer: Peer, port: P) -> Self {
        Self {
            peer,
            port,
            partial: Vec::new(),
            discarding: false,
        }
    }

    pub fn peer(&self) -> Peer {
        self.peer
    }

    /// Returns the next complete line without its terminator.
    ///
    /// Bytes of an unfinished line stay buffered across calls. Blank lines,
    /// lines longer than [`MAX_LINE_LEN`] and non-ASCII lines are dropped.
    pub fn receive_line(&mut self) -> Option<Line> {
        while let Some(byte) = self.port.read_byte() {
            match byte {
                b'\n' => {
                    if self.discarding {
                        self.discarding = false;
                        continue;
                    }
                    if let Some(line) = self.take_line() {
                        return Some(line);
                    }
                }
                // Stripped here so a bare '\n' terminator also works.
                b'\r' => {}
                _ if self.discarding => {}
                _ => {
                    if self.partial.push(byte).is_err() {
                        warn!("{}: line too long, discarding", self.peer);
                        self.partial.clear();
                        self.discarding = true;
                    }
                }
            }
        }
        None
    }

    fn take_line(&mut self) -> Option<Line> {
        let bytes = core::mem::take(&mut self.partial);
        if bytes.is_empty() {
            return None;
        }
        if !bytes.is_ascii() {
            warn!("{}: dropping non-ASCII line", self.peer);
            return None;
        }
        // ASCII is always valid UTF-8.
        String::from_utf8(bytes).ok()
    }

    /// Sends `line` followed by `\r\n` in a single write, so a port that
    /// drops what it cannot queue never emits half a line.
    pub fn send(&mut self, line: &str) {
        trace!("{} <- {}", self.peer, line);
        let mut framed: Vec<u8, { MAX_LINE_LEN + 2 }> = Vec::new();
        if framed.extend_from_slice(line.as_bytes()).is_err()
            || framed.extend_from_slice(LINE_END.as_bytes()).is_err()
        {
            warn!("{}: outbound line too long, dropped", self.peer);
            return;
        }
        self.port.write_all(&framed);
    }

    pub fn port_mut(&mut self) -> &mut P {
        &mut self.port
    }
}

/// Outbound bytes waiting for room in a transmit FIFO.
pub struct TxQueue<const N: usize> {
    bytes: Deque<u8, N>,
}

impl<const N: usize> Default for TxQueue<N> {
    fn default() -> Self {
        Self::new()
    }
}

impl<const N: usize> TxQueue<N> {
    pub const fn new() -> Self {
        Self { bytes: Deque::new() }
    }

    /// Queues all of `bytes`, or none of them if they do not fit.
    pub fn push(&mut self, bytes: &[u8]) -> bool {
        if N - self.bytes.len() < bytes.len() {
            return false;
        }
        for &byte in bytes {
            let _ = self.bytes.push_back(byte);
        }
        true
    }

    /// Offers queued bytes to `write`, which returns how many it took.
    /// Stops as soon as `write` takes nothing.
    pub fn pump(&mut self, mut write: impl FnMut(&[u8]) -> usize) {
        while !self.bytes.is_empty() {
            let (front, _) = self.bytes.as_slices();
            let taken = write(front).min(front.len());
            if taken == 0 {
                break;
            }
            for _ in 0..taken {
                self.bytes.pop_front();
            }
        }
    }

    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use std::collections::VecDeque;
    use std::vec::Vec as StdVec;

    /// In-memory serial port: `rx` feeds reads, writes land in `tx`.
    #[derive(Default)]
    pub struct LoopbackPort {
        pub rx: VecDeque<u8>,
        pub tx: StdVec<u8>,
    }

    impl LoopbackPort {
        pub fn feed(&mut self, text: &str) {
            self.rx.extend(text.bytes());
        }

        pub fn sent_lines(&self) -> StdVec<std::string::String> {
            std::string::String::from_utf8(self.tx.clone())
                .unwrap()
                .split_terminator("\r\n")
                .map(|s| s.to_string())
                .collect()
        }
    }

    impl SerialPort for LoopbackPort {
        fn read_byte(&mut self) -> Option<u8> {
            self.rx.pop_front()
        }

        fn write_all(&mut self, bytes: &[u8]) {
            self.tx.extend_from_slice(bytes);
        }
    }

    fn channel() -> LineChannel<LoopbackPort> {
        LineChannel::new(Peer::Solenoid, LoopbackPort::default())
    }

    #[test]
    fn returns_none_until_line_complete() {
        let mut ch = channel();
        assert_eq!(ch.receive_line(), None);

        ch.port_mut().feed("DT ");
        assert_eq!(ch.receive_line(), None);

        ch.port_mut().feed("2\r\n");
        assert_eq!(ch.receive_line().as_deref(), Some("DT 2"));
        assert_eq!(ch.receive_line(), None);
    }

    #[test]
    fn drains_burst_one_line_at_a_time() {
        let mut ch = channel();
        ch.port_mut().feed("PB\r\nPB\r\n\r\nSLG\r\n");

        assert_eq!(ch.receive_line().as_deref(), Some("PB"));
        assert_eq!(ch.receive_line().as_deref(), Some("PB"));
        assert_eq!(ch.receive_line().as_deref(), Some("SLG"));
        assert_eq!(ch.receive_line(), None);
    }

    #[test]
    fn discards_overlong_line_and_recovers() {
        let mut ch = channel();
        let long = "X".repeat(MAX_LINE_LEN + 5);
        ch.port_mut().feed(&long);
        ch.port_mut().feed("\r\nHYP\r\n");

        assert_eq!(ch.receive_line().as_deref(), Some("HYP"));
    }

    #[test]
    fn drops_non_ascii() {
        let mut ch = channel();
        ch.port_mut().rx.extend([0xC3, 0xA9, b'\r', b'\n']);
        ch.port_mut().feed("DRN\r\n");

        assert_eq!(ch.receive_line().as_deref(), Some("DRN"));
    }

    #[test]
    fn send_appends_terminator() {
        let mut ch = channel();
        ch.send("RLD");
        ch.send("SND 11");

        assert_eq!(ch.port_mut().tx, b"RLD\r\nSND 11\r\n");
    }

    #[test]
    fn tx_queue_drains_only_what_the_fifo_takes() {
        let mut queue: TxQueue<8> = TxQueue::new();
        assert!(queue.push(b"RLD\r\n"));
        assert!(!queue.push(b"ACC\r\n"));
        assert_eq!(queue.len(), 5);

        let mut wire = StdVec::new();
        queue.pump(|chunk| {
            let n = chunk.len().min(2);
            wire.extend_from_slice(&chunk[..n]);
            n
        });
        // The FIFO keeps accepting until the queue is empty.
        assert_eq!(wire, b"RLD\r\n");
        assert!(queue.is_empty());

        assert!(queue.push(b"ACC\r\n"));
        queue.pump(|_| 0);
        assert_eq!(queue.len(), 5);
    }

    #[test]
    fn tx_queue_wraps_around() {
        let mut queue: TxQueue<6> = TxQueue::new();
        let mut wire = StdVec::new();
        for line in [&b"PNT\r\n"[..], &b"GOV\r\n"[..], &b"RST\r\n"[..]] {
            assert!(queue.push(line));
            queue.pump(|chunk| {
                wire.extend_from_slice(chunk);
                chunk.len()
            });
        }
        assert_eq!(wire, b"PNT\r\nGOV\r\nRST\r\n");
    }
}
