use crate::memory::LinearMemory;
use crate::{SimResult, SimulationError, WriteWatch};

#[derive(Debug)]
pub struct WatchEntry {
    pub name: String,
    pub addr: u64,
    pub watch: Box<dyn WriteWatch>,
}

#[derive(Debug)]
pub struct SystemBus {
    pub ram: LinearMemory,
    pub watches: Vec<WatchEntry>,
    /// One cycle per bus write.
    pub cycles: u64,
}

impl SystemBus {
    pub fn new(ram_base: u64, ram_size: usize) -> Self {
        Self {
            ram: LinearMemory::new(ram_size, ram_base),
            watches: Vec::new(),
            cycles: 0,
        }
    }

    pub fn from_config(script: &tagprint_config::PrintScript) -> anyhow::Result<Self> {
        let size = script.sram_size()? as usize;
        Ok(Self::new(script.sram.base, size))
    }

    pub fn insert_watch(&mut self, name: &str, addr: u64, watch: Box<dyn WriteWatch>) {
        tracing::debug!("Watch '{}' inserted at {:#x}", name, addr);
        self.watches.push(WatchEntry {
            name: name.to_string(),
            addr,
            watch,
        });
    }

    pub fn watch<T: 'static>(&self, name: &str) -> Option<&T> {
        self.watches
            .iter()
            .find(|w| w.name == name)
            .and_then(|w| w.watch.as_any())
            .and_then(|a| a.downcast_ref::<T>())
    }

    pub fn watch_mut<T: 'static>(&mut self, name: &str) -> Option<&mut T> {
        self.watches
            .iter_mut()
            .find(|w| w.name == name)
            .and_then(|w| w.watch.as_any_mut())
            .and_then(|a| a.downcast_mut::<T>())
    }
}

impl crate::Bus for SystemBus {
    fn read_u8(&self, addr: u64) -> SimResult<u8> {
        self.ram
            .read_u8(addr)
            .ok_or(SimulationError::MemoryViolation(addr))
    }

    fn write_u8(&mut self, addr: u64, value: u8) -> SimResult<()> {
        if !self.ram.contains(addr) {
            return Err(SimulationError::MemoryViolation(addr));
        }

        self.cycles += 1;
        for entry in self.watches.iter_mut().filter(|w| w.addr == addr) {
            entry
                .watch
                .fire_before_write(&self.ram, addr, value, self.cycles);
        }

        self.ram.write_u8(addr, value);
        Ok(())
    }
}
