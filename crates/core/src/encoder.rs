//! Firmware side of the print protocol.
//!
//! A print writes the value into the payload region of a [`DebugBuffer`] and
//! then stores a format tag in byte 0. The monitor samples the tag, so the
//! payload must be complete before the tag is written.

use crate::{Bus, SimResult};
use tagprint_config::Statement;

pub const PAYLOAD_CAPACITY: usize = 64;
pub const BUFFER_SIZE: usize = PAYLOAD_CAPACITY + 1;

/// Display format of a payload. The width is implied by the tag.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum Tag {
    /// 2-byte value shown as hex (also used by 8-bit hex prints)
    Hex16 = 1,
    /// NUL-terminated text (also used by character prints)
    Text = 2,
    /// 2-byte value shown as decimal (also used by 8-bit prints)
    Dec16 = 3,
    Hex32 = 4,
    Dec32 = 5,
}

impl Tag {
    pub fn from_byte(b: u8) -> Option<Self> {
        match b {
            1 => Some(Tag::Hex16),
            2 => Some(Tag::Text),
            3 => Some(Tag::Dec16),
            4 => Some(Tag::Hex32),
            5 => Some(Tag::Dec32),
            _ => None,
        }
    }

    /// Fixed payload width, `None` for text.
    pub fn payload_width(self) -> Option<usize> {
        match self {
            Tag::Hex16 | Tag::Dec16 => Some(2),
            Tag::Hex32 | Tag::Dec32 => Some(4),
            Tag::Text => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PrintError {
    #[error("String payload of {len} bytes exceeds capacity of {capacity} bytes")]
    PayloadTooLong { len: usize, capacity: usize },
}

/// The shared print buffer: byte 0 is the tag, bytes 1..=64 the payload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DebugBuffer {
    bytes: [u8; BUFFER_SIZE],
    // payload bytes written by the last print
    written: usize,
}

impl Default for DebugBuffer {
    fn default() -> Self {
        Self::new()
    }
}

impl DebugBuffer {
    pub fn new() -> Self {
        Self {
            bytes: [0; BUFFER_SIZE],
            written: 0,
        }
    }

    pub fn as_bytes(&self) -> &[u8; BUFFER_SIZE] {
        &self.bytes
    }

    pub fn tag(&self) -> u8 {
        self.bytes[0]
    }

    /// Payload bytes written by the most recent print.
    pub fn payload(&self) -> &[u8] {
        &self.bytes[1..1 + self.written]
    }

    fn emit(&mut self, payload: &[u8], tag: Tag) {
        debug_assert!(payload.len() <= PAYLOAD_CAPACITY);
        self.bytes[1..1 + payload.len()].copy_from_slice(payload);
        self.written = payload.len();
        // Tag goes last.
        self.bytes[0] = tag as u8;
    }

    pub fn print_char(&mut self, c: u8) {
        self.emit(&[c, 0], Tag::Text);
    }

    pub fn print_int8(&mut self, v: i8) {
        self.emit(&[v as u8, 0], Tag::Dec16);
    }

    pub fn print_int16(&mut self, v: i16) {
        self.emit(&v.to_le_bytes(), Tag::Dec16);
    }

    pub fn print_int32(&mut self, v: i32) {
        self.emit(&v.to_le_bytes(), Tag::Dec32);
    }

    /// Copies `s` up to its first NUL, then a terminator. Fails without
    /// touching the buffer if the terminated string does not fit.
    pub fn print_str(&mut self, s: impl AsRef<[u8]>) -> Result<(), PrintError> {
        let s = s.as_ref();
        let text = match s.iter().position(|&b| b == 0) {
            Some(nul) => &s[..nul],
            None => s,
        };

        let len = text.len() + 1;
        if len > PAYLOAD_CAPACITY {
            return Err(PrintError::PayloadTooLong {
                len,
                capacity: PAYLOAD_CAPACITY,
            });
        }

        self.bytes[1..1 + text.len()].copy_from_slice(text);
        self.bytes[len] = 0;
        self.written = len;
        self.bytes[0] = Tag::Text as u8;
        Ok(())
    }

    pub fn print_hex8(&mut self, v: u8) {
        self.emit(&[v, 0], Tag::Hex16);
    }

    pub fn print_hex16(&mut self, v: u16) {
        self.emit(&v.to_le_bytes(), Tag::Hex16);
    }

    pub fn print_hex32(&mut self, v: u32) {
        self.emit(&v.to_le_bytes(), Tag::Hex32);
    }

    /// Copies the last print into simulated memory at `base`, payload first,
    /// tag last. Does nothing before the first print.
    pub fn publish<B: Bus + ?Sized>(&self, bus: &mut B, base: u64) -> SimResult<()> {
        if self.written == 0 {
            return Ok(());
        }

        for (i, &b) in self.payload().iter().enumerate() {
            bus.write_u8(base + 1 + i as u64, b)?;
        }
        tracing::debug!(
            "Publishing tag {} with {} payload bytes at {:#x}",
            self.tag(),
            self.written,
            base
        );
        bus.write_u8(base, self.tag())
    }
}

/// Runs one script statement against the buffer.
pub fn encode(buf: &mut DebugBuffer, statement: &Statement) -> Result<(), PrintError> {
    match statement {
        Statement::Char(c) => buf.print_char(*c),
        Statement::Int8(v) => buf.print_int8(*v),
        Statement::Int16(v) => buf.print_int16(*v),
        Statement::Int32(v) => buf.print_int32(*v),
        Statement::Str(s) => buf.print_str(s)?,
        Statement::Hex8(v) => buf.print_hex8(*v),
        Statement::Hex16(v) => buf.print_hex16(*v),
        Statement::Hex32(v) => buf.print_hex32(*v),
    }
    Ok(())
}
