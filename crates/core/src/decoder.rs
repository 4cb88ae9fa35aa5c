use crate::encoder::Tag;
use crate::memory::LinearMemory;

/// A print as seen by the monitor.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PrintValue {
    Hex16(u16),
    Text(Vec<u8>),
    Dec16(u16),
    Hex32(u32),
    Dec32(i32),
    /// Unknown tag: payload is already formatted text (e.g. printf output).
    Preformatted(Vec<u8>),
}

impl PrintValue {
    /// Text written to the log file.
    pub fn render(&self) -> String {
        match self {
            PrintValue::Hex16(v) => format!("{:04X}", v),
            PrintValue::Dec16(v) => v.to_string(),
            PrintValue::Hex32(v) => format!("{:08X}", v),
            PrintValue::Dec32(v) => v.to_string(),
            PrintValue::Text(bytes) | PrintValue::Preformatted(bytes) => {
                bytes.iter().map(|&b| b as char).collect()
            }
        }
    }

    /// Text shown on screen, `None` when the print produces no screen line.
    /// Newlines are dropped; a text starting with a newline is suppressed.
    pub fn screen_text(&self) -> Option<String> {
        let text = match self {
            PrintValue::Text(bytes) | PrintValue::Preformatted(bytes) => {
                if bytes.first() == Some(&b'\n') {
                    return None;
                }
                bytes
                    .iter()
                    .filter(|&&b| b != b'\n')
                    .map(|&b| b as char)
                    .collect()
            }
            _ => self.render(),
        };
        if text.is_empty() {
            None
        } else {
            Some(text)
        }
    }

    /// Number of payload bytes the monitor consumed.
    pub fn payload_len(&self) -> usize {
        match self {
            PrintValue::Hex16(_) | PrintValue::Dec16(_) => 2,
            PrintValue::Hex32(_) | PrintValue::Dec32(_) => 4,
            PrintValue::Text(bytes) | PrintValue::Preformatted(bytes) => bytes.len(),
        }
    }

    pub fn kind(&self) -> &'static str {
        match self {
            PrintValue::Hex16(_) => "hex16",
            PrintValue::Text(_) => "text",
            PrintValue::Dec16(_) => "dec16",
            PrintValue::Hex32(_) => "hex32",
            PrintValue::Dec32(_) => "dec32",
            PrintValue::Preformatted(_) => "preformatted",
        }
    }
}

/// Little-endian 16-bit read; missing bytes count as zero.
pub fn decode_u16(payload: &[u8]) -> u16 {
    let b = |i: usize| payload.get(i).copied().unwrap_or(0) as u16;
    b(0) | (b(1) << 8)
}

/// Little-endian 32-bit read; missing bytes count as zero.
pub fn decode_u32(payload: &[u8]) -> u32 {
    let b = |i: usize| payload.get(i).copied().unwrap_or(0) as u32;
    b(0) | (b(1) << 8) | (b(2) << 16) | (b(3) << 24)
}

/// Text up to the first NUL, reading at most `max + 1` bytes.
fn take_text(payload: &[u8], max: usize) -> Vec<u8> {
    payload
        .iter()
        .take(max + 1)
        .take_while(|&&b| b != 0)
        .copied()
        .collect()
}

/// Decodes a payload according to the tag table.
pub fn decode_payload(tag: u8, payload: &[u8], max: usize) -> PrintValue {
    match Tag::from_byte(tag) {
        Some(Tag::Hex16) => PrintValue::Hex16(decode_u16(payload)),
        Some(Tag::Dec16) => PrintValue::Dec16(decode_u16(payload)),
        Some(Tag::Hex32) => PrintValue::Hex32(decode_u32(payload)),
        Some(Tag::Dec32) => PrintValue::Dec32(decode_u32(payload) as i32),
        Some(Tag::Text) => PrintValue::Text(take_text(payload, max)),
        None => PrintValue::Preformatted(take_text(payload, max)),
    }
}

/// Decodes the payload following the tag byte at `base` in data memory.
pub fn decode_from_memory(mem: &LinearMemory, base: u64, tag: u8, max: usize) -> PrintValue {
    let len = Tag::from_byte(tag)
        .and_then(Tag::payload_width)
        .unwrap_or(max + 1);
    let payload = mem.read_bytes(base + 1, len);
    decode_payload(tag, &payload, max)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::encoder::DebugBuffer;

    #[test]
    fn test_decode_int16_round_trip() {
        let mut buf = DebugBuffer::new();
        for v in [i16::MIN, -1234, -1, 0, 1, 3333, i16::MAX] {
            buf.print_int16(v);
            assert_eq!(decode_u16(buf.payload()) as i16, v);
            assert_eq!(
                decode_payload(buf.tag(), buf.payload(), 30),
                PrintValue::Dec16(v as u16)
            );
        }
    }

    #[test]
    fn test_decode_32_bit_round_trip() {
        let mut buf = DebugBuffer::new();
        for v in [i32::MIN, -55556666, 0, 55556666, i32::MAX] {
            buf.print_int32(v);
            assert_eq!(
                decode_payload(buf.tag(), buf.payload(), 30),
                PrintValue::Dec32(v)
            );
            buf.print_hex32(v as u32);
            assert_eq!(
                decode_payload(buf.tag(), buf.payload(), 30),
                PrintValue::Hex32(v as u32)
            );
        }
    }

    #[test]
    fn test_decode_8_bit_through_16_bit_slot() {
        let mut buf = DebugBuffer::new();
        for v in 0..=u8::MAX {
            buf.print_hex8(v);
            assert_eq!(decode_u16(buf.payload()), v as u16);
            buf.print_int8(v as i8);
            assert_eq!(decode_u16(buf.payload()) as u8 as i8, v as i8);
        }
    }

    #[test]
    fn test_render_formats() {
        assert_eq!(PrintValue::Hex16(0xFF).render(), "00FF");
        assert_eq!(PrintValue::Hex16(0xABCD).render(), "ABCD");
        assert_eq!(PrintValue::Hex32(0xFFFF_AAAA).render(), "FFFFAAAA");
        assert_eq!(PrintValue::Dec16(3333).render(), "3333");
        assert_eq!(PrintValue::Dec16(0xFFFF).render(), "65535");
        assert_eq!(PrintValue::Dec32(-7).render(), "-7");
        assert_eq!(PrintValue::Text(b"hello".to_vec()).render(), "hello");
    }

    #[test]
    fn test_high_bytes_render_as_latin1() {
        let value = PrintValue::Text(vec![b'c', b'a', b'f', 0xE9]);
        assert_eq!(value.render(), "caf\u{e9}");
        assert_eq!(value.render().chars().count(), 4);
    }

    #[test]
    fn test_text_respects_max() {
        let payload = b"abcdefgh\0";
        assert_eq!(
            decode_payload(2, payload, 3),
            PrintValue::Text(b"abcd".to_vec())
        );
        assert_eq!(
            decode_payload(2, payload, 30),
            PrintValue::Text(b"abcdefgh".to_vec())
        );
    }

    #[test]
    fn test_unknown_tag_is_preformatted() {
        let value = decode_payload(0x41, b"x=1\n\0", 30);
        assert_eq!(value, PrintValue::Preformatted(b"x=1\n".to_vec()));
        assert_eq!(value.render(), "x=1\n");
        assert_eq!(value.screen_text().as_deref(), Some("x=1"));
    }

    #[test]
    fn test_screen_text_newline_rules() {
        assert_eq!(PrintValue::Text(b"\nabc".to_vec()).screen_text(), None);
        assert_eq!(PrintValue::Text(Vec::new()).screen_text(), None);
        assert_eq!(
            PrintValue::Text(b"a\nb".to_vec()).screen_text().as_deref(),
            Some("ab")
        );
        assert_eq!(
            PrintValue::Dec32(5).screen_text().as_deref(),
            Some("5")
        );
    }

    #[test]
    fn test_decode_from_memory_stops_at_end() {
        let mut mem = LinearMemory::new(4, 0x100);
        mem.write_u8(0x101, b'o');
        mem.write_u8(0x102, b'k');
        mem.write_u8(0x103, b'!');
        assert_eq!(
            decode_from_memory(&mem, 0x100, 2, 30),
            PrintValue::Text(b"ok!".to_vec())
        );
        assert_eq!(
            decode_from_memory(&mem, 0x100, 4, 30),
            PrintValue::Hex32(0x0021_6B6F)
        );
    }
}
