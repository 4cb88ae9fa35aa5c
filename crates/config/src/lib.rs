use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Size of the firmware-side buffer: one tag byte plus 64 payload bytes.
pub const DEBUG_BUFFER_SIZE: u64 = 65;

#[derive(Debug, Serialize, Deserialize, Clone)]
#[serde(deny_unknown_fields)]
pub struct MemoryRange {
    pub base: u64,
    pub size: String, // e.g. "4KiB"
}

impl Default for MemoryRange {
    fn default() -> Self {
        // ATmega128 internal SRAM
        Self {
            base: 0x100,
            size: "4KiB".to_string(),
        }
    }
}

fn default_variable_name() -> String {
    "debugbuf1".to_string()
}

fn default_max() -> usize {
    30
}

#[derive(Debug, Serialize, Deserialize, Clone)]
#[serde(deny_unknown_fields)]
pub struct MonitorConfig {
    /// Symbol looked up in the firmware when no explicit base is given.
    #[serde(default = "default_variable_name")]
    pub variable_name: String,
    #[serde(default)]
    pub base: Option<u64>,
    /// Highest payload index read back for text prints.
    #[serde(default = "default_max")]
    pub max: usize,
    /// Log file prefix; the node id is appended.
    #[serde(default)]
    pub log_file: Option<String>,
    #[serde(default)]
    pub node_id: u32,
}

impl Default for MonitorConfig {
    fn default() -> Self {
        Self {
            variable_name: default_variable_name(),
            base: None,
            max: default_max(),
            log_file: None,
            node_id: 0,
        }
    }
}

/// One firmware print statement.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum Statement {
    Char(u8),
    Int8(i8),
    Int16(i16),
    Int32(i32),
    Str(String),
    Hex8(u8),
    Hex16(u16),
    Hex32(u32),
}

#[derive(Debug, Serialize, Deserialize, Clone)]
#[serde(deny_unknown_fields)]
pub struct PrintScript {
    pub schema_version: String,
    #[serde(default)]
    pub monitor: MonitorConfig,
    #[serde(default)]
    pub sram: MemoryRange,
    #[serde(default)]
    pub statements: Vec<Statement>,
}

impl PrintScript {
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let f = std::fs::File::open(&path)
            .with_context(|| format!("Failed to open print script at {:?}", path.as_ref()))?;
        let script: Self =
            serde_yaml::from_reader(f).context("Failed to parse Print Script YAML")?;
        script.validate()?;
        Ok(script)
    }

    pub fn validate(&self) -> Result<()> {
        if self.schema_version != "1.0" {
            anyhow::bail!(
                "Unsupported schema_version '{}'. Supported versions: '1.0'",
                self.schema_version
            );
        }

        if self.monitor.max == 0 {
            anyhow::bail!("Monitor 'max' must be greater than zero");
        }

        if self.monitor.variable_name.trim().is_empty() {
            anyhow::bail!("Monitor 'variable_name' cannot be empty");
        }

        let sram_size = self.sram_size()?;
        sram_end(self.sram.base, sram_size)?;
        if let Some(base) = self.monitor.base {
            check_buffer_fits(base, self.sram.base, sram_size)?;
        }

        Ok(())
    }

    pub fn sram_size(&self) -> Result<u64> {
        parse_size(&self.sram.size)
            .with_context(|| format!("Invalid sram size '{}'", self.sram.size))
    }
}

/// End of SRAM, failing if the range runs past the address space.
pub fn sram_end(sram_base: u64, sram_size: u64) -> Result<u64> {
    sram_base.checked_add(sram_size).with_context(|| {
        format!(
            "SRAM at {:#x} ({} bytes) exceeds the address space",
            sram_base, sram_size
        )
    })
}

/// Checks that the whole debug buffer at `base` lies inside SRAM.
pub fn check_buffer_fits(base: u64, sram_base: u64, sram_size: u64) -> Result<()> {
    let end_addr = sram_end(sram_base, sram_size)?;
    let fits = base >= sram_base
        && base
            .checked_add(DEBUG_BUFFER_SIZE)
            .is_some_and(|end| end <= end_addr);
    if !fits {
        anyhow::bail!(
            "Debug buffer at {:#x} ({} bytes) does not fit in SRAM {:#x}..{:#x}",
            base,
            DEBUG_BUFFER_SIZE,
            sram_base,
            end_addr
        );
    }
    Ok(())
}

pub fn parse_size(size_str: &str) -> Result<u64> {
    use human_size::{Byte, Size, SpecificSize};
    let s: Size = size_str
        .parse()
        .map_err(|e| anyhow::anyhow!("Invalid size format: {}", e))?;
    let bytes: SpecificSize<Byte> = s.into();
    Ok(bytes.value() as u64)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_valid_script() {
        let yaml = r#"
schema_version: "1.0"
monitor:
  base: 512
  max: 40
  log_file: "prints.log"
  node_id: 3
sram:
  base: 256
  size: "4KiB"
statements:
  - char: 97
  - int8: -5
  - int16: 3333
  - int32: 55556666
  - str: "hello world"
  - hex8: 255
  - hex16: 65535
  - hex32: 4294945450
"#;
        let script: PrintScript = serde_yaml::from_str(yaml).unwrap();
        assert!(script.validate().is_ok());
        assert_eq!(script.monitor.base, Some(512));
        assert_eq!(script.monitor.node_id, 3);
        assert_eq!(script.statements.len(), 8);
        assert_eq!(script.statements[1], Statement::Int8(-5));
        assert_eq!(script.statements[4], Statement::Str("hello world".into()));
        assert_eq!(script.statements[7], Statement::Hex32(0xFFFF_AAAA));
    }

    #[test]
    fn test_defaults() {
        let yaml = r#"
schema_version: "1.0"
"#;
        let script: PrintScript = serde_yaml::from_str(yaml).unwrap();
        assert!(script.validate().is_ok());
        assert_eq!(script.monitor.variable_name, "debugbuf1");
        assert_eq!(script.monitor.max, 30);
        assert_eq!(script.sram.base, 0x100);
        assert_eq!(script.sram_size().unwrap(), 4096);
        assert!(script.statements.is_empty());
    }

    #[test]
    fn test_invalid_version() {
        let yaml = r#"
schema_version: "2.0"
"#;
        let script: PrintScript = serde_yaml::from_str(yaml).unwrap();
        let err = script.validate().unwrap_err();
        assert!(err.to_string().contains("Unsupported schema_version"));
    }

    #[test]
    fn test_invalid_max() {
        let yaml = r#"
schema_version: "1.0"
monitor:
  max: 0
"#;
        let script: PrintScript = serde_yaml::from_str(yaml).unwrap();
        let err = script.validate().unwrap_err();
        assert!(err.to_string().contains("max"));
    }

    #[test]
    fn test_buffer_outside_sram() {
        let yaml = r#"
schema_version: "1.0"
monitor:
  base: 4300
sram:
  base: 256
  size: "4KiB"
"#;
        let script: PrintScript = serde_yaml::from_str(yaml).unwrap();
        let err = script.validate().unwrap_err();
        assert!(err.to_string().contains("does not fit"));
    }

    #[test]
    fn test_unknown_statement_rejected() {
        let yaml = r#"
schema_version: "1.0"
statements:
  - float: 1.5
"#;
        assert!(serde_yaml::from_str::<PrintScript>(yaml).is_err());
    }

    #[test]
    fn test_out_of_range_value_rejected() {
        let yaml = r#"
schema_version: "1.0"
statements:
  - int8: 200
"#;
        assert!(serde_yaml::from_str::<PrintScript>(yaml).is_err());
    }

    #[test]
    fn test_base_at_address_space_end() {
        let yaml = r#"
schema_version: "1.0"
monitor:
  base: 18446744073709551615
"#;
        let script: PrintScript = serde_yaml::from_str(yaml).unwrap();
        let err = script.validate().unwrap_err();
        assert!(err.to_string().contains("does not fit"));
        assert!(check_buffer_fits(u64::MAX - 10, 0, u64::MAX).is_err());
    }

    #[test]
    fn test_sram_past_address_space() {
        let yaml = r#"
schema_version: "1.0"
sram:
  base: 18446744073709551000
  size: "4KiB"
"#;
        let script: PrintScript = serde_yaml::from_str(yaml).unwrap();
        let err = script.validate().unwrap_err();
        assert!(err.to_string().contains("exceeds the address space"));
    }

    #[test]
    fn test_long_string_left_to_encoder() {
        // the encoder reports oversized strings per statement
        let yaml = format!(
            r#"
schema_version: "1.0"
statements:
  - str: "{}"
"#,
            "y".repeat(64)
        );
        let script: PrintScript = serde_yaml::from_str(&yaml).unwrap();
        assert!(script.validate().is_ok());
    }
}
