//! Recording transport for unit tests

use std::collections::HashMap;

use crate::transport::{RmiTransport, TransportError};

/// One call made against the mock, in order
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Event {
    Read(u16, usize),
    Write(u16, Vec<u8>),
    Attention(bool),
    Delay(u32),
    Rebind,
}

/// Register file that records every access
///
/// The F34 status register (if configured) reads back as busy for
/// `busy_reads` polls after every write, then as `status_value`.
pub struct MockTransport {
    regs: HashMap<u16, u8>,
    pub events: Vec<Event>,
    pub status_addr: Option<u16>,
    pub status_value: u8,
    pub busy_value: u8,
    pub busy_reads: usize,
    pub stuck_busy: bool,
    busy_remaining: usize,
    pub attention: bool,
    pub fail_write_at: Option<u16>,
}

impl MockTransport {
    pub fn new() -> Self {
        Self {
            regs: HashMap::new(),
            events: Vec::new(),
            status_addr: None,
            status_value: 0x80,
            busy_value: 0x82,
            busy_reads: 0,
            stuck_busy: false,
            busy_remaining: 0,
            attention: true,
            fail_write_at: None,
        }
    }

    /// Preload registers starting at `addr`
    pub fn load(&mut self, addr: u16, data: &[u8]) {
        for (i, &b) in data.iter().enumerate() {
            self.regs.insert(addr + i as u16, b);
        }
    }

    pub fn writes(&self) -> Vec<(u16, Vec<u8>)> {
        self.events
            .iter()
            .filter_map(|e| match e {
                Event::Write(addr, data) => Some((*addr, data.clone())),
                _ => None,
            })
            .collect()
    }

    /// Payloads of every write to `addr`
    pub fn writes_to(&self, addr: u16) -> Vec<Vec<u8>> {
        self.writes()
            .into_iter()
            .filter(|(a, _)| *a == addr)
            .map(|(_, d)| d)
            .collect()
    }

    pub fn count(&self, pred: impl Fn(&Event) -> bool) -> usize {
        self.events.iter().filter(|e| pred(e)).count()
    }

    pub fn position(&self, pred: impl Fn(&Event) -> bool) -> Option<usize> {
        self.events.iter().position(pred)
    }
}

impl RmiTransport for MockTransport {
    fn read(&mut self, addr: u16, len: usize) -> Result<Vec<u8>, TransportError> {
        self.events.push(Event::Read(addr, len));
        if self.status_addr == Some(addr) {
            let value = if self.stuck_busy || self.busy_remaining > 0 {
                self.busy_remaining = self.busy_remaining.saturating_sub(1);
                self.busy_value
            } else {
                self.status_value
            };
            let mut out = vec![0u8; len];
            if let Some(first) = out.first_mut() {
                *first = value;
            }
            return Ok(out);
        }
        Ok((0..len)
            .map(|i| self.regs.get(&(addr + i as u16)).copied().unwrap_or(0))
            .collect())
    }

    fn write(&mut self, addr: u16, data: &[u8]) -> Result<(), TransportError> {
        self.events.push(Event::Write(addr, data.to_vec()));
        if self.fail_write_at == Some(addr) {
            return Err(TransportError::Other("injected write failure".into()));
        }
        self.load(addr, data);
        self.busy_remaining = self.busy_reads;
        Ok(())
    }

    fn take_attention(&mut self) -> Result<bool, TransportError> {
        self.events.push(Event::Attention(self.attention));
        Ok(self.attention)
    }

    fn delay_ms(&mut self, ms: u32) {
        self.events.push(Event::Delay(ms));
    }

    fn rebind_driver(&mut self) -> Result<(), TransportError> {
        self.events.push(Event::Rebind);
        Ok(())
    }
}
