use crate::PrintObserver;
use serde::Serialize;
use std::sync::atomic::{AtomicU64, Ordering};

#[derive(Debug, Default)]
pub struct PrintMetrics {
    print_count: AtomicU64,
    payload_bytes: AtomicU64,
    // indexed by tag 1..=5, slot 0 for anything else
    per_tag: [AtomicU64; 6],
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MetricsReport {
    pub prints: u64,
    pub payload_bytes: u64,
    pub hex16: u64,
    pub text: u64,
    pub dec16: u64,
    pub hex32: u64,
    pub dec32: u64,
    pub preformatted: u64,
}

impl PrintMetrics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn reset(&self) {
        self.print_count.store(0, Ordering::SeqCst);
        self.payload_bytes.store(0, Ordering::SeqCst);
        for slot in &self.per_tag {
            slot.store(0, Ordering::SeqCst);
        }
    }

    pub fn get_prints(&self) -> u64 {
        self.print_count.load(Ordering::SeqCst)
    }

    pub fn get_payload_bytes(&self) -> u64 {
        self.payload_bytes.load(Ordering::SeqCst)
    }

    pub fn get_tag_count(&self, tag: u8) -> u64 {
        self.per_tag[Self::slot(tag)].load(Ordering::SeqCst)
    }

    fn slot(tag: u8) -> usize {
        match tag {
            1..=5 => tag as usize,
            _ => 0,
        }
    }

    pub fn report(&self) -> MetricsReport {
        MetricsReport {
            prints: self.get_prints(),
            payload_bytes: self.get_payload_bytes(),
            hex16: self.get_tag_count(1),
            text: self.get_tag_count(2),
            dec16: self.get_tag_count(3),
            hex32: self.get_tag_count(4),
            dec32: self.get_tag_count(5),
            preformatted: self.get_tag_count(0),
        }
    }
}

impl PrintObserver for PrintMetrics {
    fn on_print(&self, tag: u8, payload_len: usize) {
        self.print_count.fetch_add(1, Ordering::SeqCst);
        self.payload_bytes
            .fetch_add(payload_len as u64, Ordering::SeqCst);
        self.per_tag[Self::slot(tag)].fetch_add(1, Ordering::SeqCst);
    }
}
