use crate::encoder::DebugBuffer;
use crate::peripherals::print_monitor::{PrintMonitor, PrintRecord};
use serde::{Deserialize, Serialize};

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct BufferSnapshot {
    pub tag: u8,
    pub payload: Vec<u8>,
}

impl From<&DebugBuffer> for BufferSnapshot {
    fn from(buf: &DebugBuffer) -> Self {
        Self {
            tag: buf.tag(),
            payload: buf.payload().to_vec(),
        }
    }
}

#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct MonitorSnapshot {
    pub base: u64,
    pub node_id: u32,
    pub prints: usize,
    pub records: Vec<PrintRecord>,
}

impl From<&PrintMonitor> for MonitorSnapshot {
    fn from(monitor: &PrintMonitor) -> Self {
        Self {
            base: monitor.base(),
            node_id: monitor.node_id(),
            prints: monitor.records().len(),
            records: monitor.records().to_vec(),
        }
    }
}
