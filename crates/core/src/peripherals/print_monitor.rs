use crate::decoder::{self, PrintValue};
use crate::memory::LinearMemory;
use crate::{PrintObserver, WriteWatch};
use serde::{Deserialize, Serialize};
use std::any::Any;
use std::fs::{File, OpenOptions};
use std::io::Write;
use std::path::PathBuf;
use std::sync::Arc;

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct PrintRecord {
    pub cycle: u64,
    pub tag: u8,
    pub kind: String,
    /// Rendered value as written to the log file.
    pub text: String,
    /// Full screen line, `None` when nothing was shown.
    pub line: Option<String>,
}

/// Print monitor.
/// Watches the tag byte of the firmware's debug buffer; each tag write is
/// decoded and printed to stdout, and appended to the log file if one is set.
#[derive(Debug)]
pub struct PrintMonitor {
    base: u64,
    max: usize,
    node_id: u32,
    echo: bool,
    log_path: Option<PathBuf>,
    records: Vec<PrintRecord>,
    observers: Vec<Arc<dyn PrintObserver>>,
}

impl PrintMonitor {
    pub fn new(base: u64, max: usize, node_id: u32) -> Self {
        Self {
            base,
            max,
            node_id,
            echo: true,
            log_path: None,
            records: Vec::new(),
            observers: Vec::new(),
        }
    }

    pub fn from_config(config: &tagprint_config::MonitorConfig, base: u64) -> Self {
        let monitor = Self::new(base, config.max, config.node_id);
        match &config.log_file {
            Some(prefix) => monitor.with_log_file(prefix),
            None => monitor,
        }
    }

    /// Logs to `<prefix><node id>`, truncating any previous contents.
    pub fn with_log_file(mut self, prefix: &str) -> Self {
        let path = PathBuf::from(format!("{}{}", prefix, self.node_id));
        if let Err(e) = File::create(&path) {
            tracing::warn!("Failed to create print log {:?}: {}", path, e);
        }
        self.log_path = Some(path);
        self
    }

    pub fn with_echo(mut self, echo: bool) -> Self {
        self.echo = echo;
        self
    }

    pub fn add_observer(&mut self, observer: Arc<dyn PrintObserver>) {
        observer.on_monitor_start(self.base);
        self.observers.push(observer);
    }

    pub fn base(&self) -> u64 {
        self.base
    }

    pub fn node_id(&self) -> u32 {
        self.node_id
    }

    pub fn log_path(&self) -> Option<&PathBuf> {
        self.log_path.as_ref()
    }

    pub fn records(&self) -> &[PrintRecord] {
        &self.records
    }

    /// Screen lines printed so far.
    pub fn lines(&self) -> Vec<String> {
        self.records
            .iter()
            .filter_map(|r| r.line.clone())
            .collect()
    }

    fn id_time_prefix(&self, cycle: u64) -> String {
        format!("{:>4}  {:>10}  ", self.node_id, cycle)
    }

    fn append_to_log(&self, text: &str) {
        let Some(path) = &self.log_path else {
            return;
        };
        let result = OpenOptions::new()
            .append(true)
            .create(true)
            .open(path)
            .and_then(|mut f| f.write_all(text.as_bytes()));
        if let Err(e) = result {
            tracing::warn!("Failed to write print log {:?}: {}", path, e);
        }
    }

    fn report(&mut self, value: PrintValue, tag: u8, cycle: u64) {
        let text = value.render();
        let line = value
            .screen_text()
            .map(|s| format!("{}{}", self.id_time_prefix(cycle), s));

        if let Some(line) = &line {
            if self.echo {
                println!("{}", line);
            }
        }
        if !text.is_empty() {
            self.append_to_log(&text);
        }

        for observer in &self.observers {
            observer.on_print(tag, value.payload_len());
        }

        self.records.push(PrintRecord {
            cycle,
            tag,
            kind: value.kind().to_string(),
            text,
            line,
        });
    }
}

impl WriteWatch for PrintMonitor {
    fn fire_before_write(&mut self, mem: &LinearMemory, addr: u64, value: u8, cycle: u64) {
        if addr != self.base {
            tracing::warn!(
                "Unexpected interception by printer at {:#x} (watching {:#x})",
                addr,
                self.base
            );
        }

        let decoded = decoder::decode_from_memory(mem, self.base, value, self.max);
        tracing::debug!("Print tag {} at cycle {}: {:?}", value, cycle, decoded);
        self.report(decoded, value, cycle);
    }

    fn as_any(&self) -> Option<&dyn Any> {
        Some(self)
    }

    fn as_any_mut(&mut self) -> Option<&mut dyn Any> {
        Some(self)
    }
}
