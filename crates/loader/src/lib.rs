use anyhow::{Context, Result};
use goblin::elf::Elf;
use std::fs;
use std::path::Path;
use tracing::{debug, info, warn};

/// avr-gcc links the data space at this virtual offset.
pub const AVR_DATA_OFFSET: u64 = 0x80_0000;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DataSymbol {
    pub name: String,
    /// Virtual address as stored in the symbol table.
    pub vma: u64,
    pub size: u64,
}

impl DataSymbol {
    /// Address in the simulated data space.
    pub fn data_address(&self) -> u64 {
        to_data_address(self.vma)
    }
}

pub fn to_data_address(vma: u64) -> u64 {
    if vma >= AVR_DATA_OFFSET {
        vma - AVR_DATA_OFFSET
    } else {
        vma
    }
}

/// Looks up `name` in the symbol table of the ELF at `path`.
pub fn find_symbol(path: &Path, name: &str) -> Result<Option<DataSymbol>> {
    let buffer = fs::read(path).with_context(|| format!("Failed to read ELF file: {:?}", path))?;
    let symbol = find_symbol_in(&buffer, name)?;

    match &symbol {
        Some(sym) => info!(
            "Symbol '{}' at {:#x} (data address {:#x}, {} bytes)",
            sym.name,
            sym.vma,
            sym.data_address(),
            sym.size
        ),
        None => warn!("Symbol '{}' not found in {:?}", name, path),
    }

    Ok(symbol)
}

pub fn find_symbol_in(buffer: &[u8], name: &str) -> Result<Option<DataSymbol>> {
    let elf = Elf::parse(buffer).context("Failed to parse ELF binary")?;

    debug!("Scanning {} symbols", elf.syms.len());

    let symbol = elf.syms.iter().find_map(|sym| {
        let sym_name = elf.strtab.get_at(sym.st_name)?;
        (sym_name == name).then(|| DataSymbol {
            name: sym_name.to_string(),
            vma: sym.st_value,
            size: sym.st_size,
        })
    });

    Ok(symbol)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_data_address_strips_avr_offset() {
        assert_eq!(to_data_address(0x80_0100), 0x100);
        assert_eq!(to_data_address(0x80_0A3C), 0xA3C);
        assert_eq!(to_data_address(0x200), 0x200);

        let sym = DataSymbol {
            name: "debugbuf1".into(),
            vma: 0x80_0160,
            size: 65,
        };
        assert_eq!(sym.data_address(), 0x160);
    }

    #[test]
    fn test_rejects_non_elf() {
        let err = find_symbol_in(b"definitely not an elf file", "debugbuf1").unwrap_err();
        assert!(err.to_string().contains("Failed to parse ELF"));
    }

    #[test]
    fn test_missing_file() {
        let err = find_symbol(Path::new("no_such_firmware.elf"), "debugbuf1").unwrap_err();
        assert!(err.to_string().contains("Failed to read ELF"));
    }

    const FIXTURE: &str = "../../tests/fixtures/avr-debugbuf.elf";

    #[test]
    fn test_finds_debug_buffer_symbol() {
        let sym = find_symbol(Path::new(FIXTURE), "debugbuf1")
            .unwrap()
            .expect("debugbuf1 present in fixture");
        assert_eq!(sym.name, "debugbuf1");
        assert_eq!(sym.vma, 0x80_0160);
        assert_eq!(sym.size, 65);
        assert_eq!(sym.data_address(), 0x160);
    }

    #[test]
    fn test_symbol_lookup_by_name() {
        let buffer = std::fs::read(FIXTURE).unwrap();
        let main = find_symbol_in(&buffer, "main").unwrap().unwrap();
        assert_eq!(main.vma, 0);
        assert_eq!(main.size, 10);
        assert!(find_symbol_in(&buffer, "debugbuf").unwrap().is_none());
        assert!(find_symbol_in(&buffer, "missing_buf").unwrap().is_none());
    }
}

