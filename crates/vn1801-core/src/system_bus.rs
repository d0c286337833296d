//! Composes the L1 cache, write buffer and memory into the single address
//! space the execution thread reads and writes through.

use std::sync::{Arc, Mutex};

use emu_core::Bus;

use crate::cache::{fill_line, L1Cache};
use crate::memory::Memory;
use crate::word::Word;
use crate::writebuffer::{WriteBuffer, WriteBufferElement};

/// The execution thread's single entry point to addressable storage:
/// cache-then-memory reads, write-through-via-write-buffer writes.
///
/// Addresses passed in are assumed already range-checked (0..2048): the
/// engine performs that check itself and routes out-of-range addresses to
/// the machine fault handler before ever calling here.
pub struct SystemBus {
    cache: Arc<Mutex<L1Cache>>,
    memory: Arc<Mutex<Memory>>,
    write_buffer: WriteBuffer,
}

impl SystemBus {
    #[must_use]
    pub fn new(
        cache: Arc<Mutex<L1Cache>>,
        memory: Arc<Mutex<Memory>>,
        write_buffer: WriteBuffer,
    ) -> Self {
        Self { cache, memory, write_buffer }
    }

    /// Fill the cache line containing `addr` from memory, evicting a clean
    /// line if the cache is full. If every line is dirty,
    /// stall until the memory controller drains at least one.
    fn fill(&self, addr: i32) {
        let tag = addr & !7;
        let block =
            self.memory.lock().unwrap().block(addr).expect("address range-checked by caller");
        loop {
            let mut cache = self.cache.lock().unwrap();
            if cache.add(fill_line(tag, block)) {
                return;
            }
            drop(cache);
            std::thread::yield_now();
        }
    }
}

impl Bus for SystemBus {
    type Address = i32;
    type Value = Word;

    fn read(&mut self, address: i32) -> Word {
        loop {
            if let Some(w) = self.cache.lock().unwrap().read(address) {
                return w;
            }
            self.fill(address);
        }
    }

    fn write(&mut self, address: i32, value: Word) {
        loop {
            let hit_tag = self.cache.lock().unwrap().write(value, address);
            if let Some(line_tag) = hit_tag {
                self.write_buffer.push(WriteBufferElement { address, word: value, line_tag });
                return;
            }
            self.fill(address);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::word::word;
    use crate::writebuffer::MemoryController;

    #[test]
    fn write_then_read_through_cache() {
        let memory = Arc::new(Mutex::new(Memory::new()));
        let cache = Arc::new(Mutex::new(L1Cache::new()));
        let (write_buffer, mut controller) =
            MemoryController::spawn(Arc::clone(&memory), Arc::clone(&cache));
        let mut bus = SystemBus::new(cache, memory, write_buffer);

        bus.write(50, word(123));
        assert_eq!(bus.read(50).as_unsigned(), 123);
        controller.stop();
    }

    #[test]
    fn read_miss_fills_from_memory() {
        let memory = Arc::new(Mutex::new(Memory::new()));
        memory.lock().unwrap().write(word(7), 40).unwrap();
        let cache = Arc::new(Mutex::new(L1Cache::new()));
        let (write_buffer, mut controller) =
            MemoryController::spawn(Arc::clone(&memory), Arc::clone(&cache));
        let mut bus = SystemBus::new(cache, memory, write_buffer);

        assert_eq!(bus.read(40).as_unsigned(), 7);
        controller.stop();
    }
}
