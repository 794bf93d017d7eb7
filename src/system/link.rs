//! Serial link framing and liveness
//!
//! The broker bridge exchanges one message per line, `<topic> <payload>\n`. There
//! is no explicit handshake: the link is up while lines keep arriving within the
//! heartbeat timeout, and the first line after a silence counts as a reconnect.

use heapless::Vec;

/// Split one received line into topic and payload
///
/// Trailing `\r`/`\n` are dropped. A line without a space is a topic with an
/// empty payload; an empty line is `None`.
pub fn split_line(line: &[u8]) -> Option<(&str, &[u8])> {
    let end = line.iter().rposition(|b| !matches!(b, b'\r' | b'\n')).map_or(0, |i| i + 1);
    let line = &line[..end];
    if line.is_empty() {
        return None;
    }
    let (topic, payload) = match line.iter().position(|b| *b == b' ') {
        Some(space) => (&line[..space], &line[space + 1..]),
        None => (line, &[][..]),
    };
    let topic = core::str::from_utf8(topic).ok()?;
    Some((topic, payload))
}

/// Connection state derived from inbound traffic
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LinkMonitor {
    heartbeat_ms: u64,
    last_line: Option<u64>,
}

impl LinkMonitor {
    pub fn new(heartbeat_ms: u64) -> Self {
        Self {
            heartbeat_ms,
            last_line: None,
        }
    }

    pub fn is_connected(&self) -> bool {
        self.last_line.is_some()
    }

    /// Record a line at `now_ms`, returns true if this (re)connects the link
    pub fn on_line(&mut self, now_ms: u64) -> bool {
        let reconnected = self.last_line.is_none();
        self.last_line = Some(now_ms);
        reconnected
    }

    /// Expire the link at `now_ms`, returns true if it just went down
    pub fn poll(&mut self, now_ms: u64) -> bool {
        match self.last_line {
            Some(last) if now_ms.saturating_sub(last) > self.heartbeat_ms => {
                self.last_line = None;
                true
            }
            _ => false,
        }
    }
}

/// Collects received bytes into lines of at most `N` bytes
///
/// A line that does not fit is dropped whole: everything up to its newline is
/// discarded, so no fragment of it is ever handed out as a line.
#[derive(Debug, Default)]
pub struct LineAssembler<const N: usize> {
    buf: Vec<u8, N>,
    discarding: bool,
    complete: bool,
}

impl<const N: usize> LineAssembler<N> {
    pub fn new() -> Self {
        Self {
            buf: Vec::new(),
            discarding: false,
            complete: false,
        }
    }

    /// Feed one byte, returns the finished line (without `\n`) on a newline
    pub fn push(&mut self, byte: u8) -> Option<&[u8]> {
        if self.complete {
            self.buf.clear();
            self.complete = false;
        }

        if byte == b'\n' {
            if self.discarding {
                self.discarding = false;
                return None;
            }
            self.complete = true;
            return Some(&self.buf);
        }

        if !self.discarding && self.buf.push(byte).is_err() {
            log_warn!("Link line longer than {} bytes, dropped", N);
            self.buf.clear();
            self.discarding = true;
        }
        None
    }

    /// Drop the partial line and resynchronise on the next newline
    pub fn abort(&mut self) {
        self.buf.clear();
        self.complete = false;
        self.discarding = true;
    }
}
