/*!
 * User Address Space
 *
 * Flat paged memory private to one process. Layout, lowest address first:
 *
 * ```text
 * [ image sections | stack (grows down) | argument page ]
 * 0                code_end             initial_sp     size
 * ```
 *
 * Partial transfers follow the usual kernel convention: the raw
 * `read_virtual_memory`/`write_virtual_memory` calls return the number of
 * bytes actually copied and never fail, the `*_exact` helpers turn a short
 * copy into `MemoryError::InvalidAddress`.
 */

use super::frames::{FramePool, FrameReservation};
use super::types::{MemoryError, MemoryResult};
use crate::core::limits::{ARG_PAGES, PAGE_SIZE};
use crate::core::types::{VAddr, Vpn};

#[derive(Debug)]
pub struct AddressSpace {
    memory: Box<[u8]>,
    code_pages: usize,
    stack_pages: usize,
    _frames: FrameReservation,
}

impl AddressSpace {
    /// Allocate a zeroed address space backed by frames from `pool`
    pub fn new(pool: &FramePool, code_pages: usize, stack_pages: usize) -> MemoryResult<Self> {
        let pages = code_pages + stack_pages + ARG_PAGES;
        let bytes = pages
            .checked_mul(PAGE_SIZE)
            .filter(|&b| b <= VAddr::MAX as usize)
            .ok_or(MemoryError::AddressSpaceTooLarge { pages })?;

        let frames = pool.reserve(pages)?;

        Ok(Self {
            memory: vec![0u8; bytes].into_boxed_slice(),
            code_pages,
            stack_pages,
            _frames: frames,
        })
    }

    #[inline]
    pub fn num_pages(&self) -> usize {
        self.code_pages + self.stack_pages + ARG_PAGES
    }

    #[inline]
    pub fn size(&self) -> usize {
        self.memory.len()
    }

    /// First address above the image sections; the stack may not grow below it
    #[inline]
    pub fn stack_limit(&self) -> VAddr {
        (self.code_pages * PAGE_SIZE) as VAddr
    }

    /// Top of the stack; the stack pointer starts here
    #[inline]
    pub fn initial_sp(&self) -> VAddr {
        ((self.code_pages + self.stack_pages) * PAGE_SIZE) as VAddr
    }

    /// Start of the page holding argv
    #[inline]
    pub fn arg_page(&self) -> VAddr {
        self.initial_sp()
    }

    /// Copy up to `data.len()` bytes out of user memory, returning the count copied
    pub fn read_virtual_memory(&self, vaddr: VAddr, data: &mut [u8]) -> usize {
        let start = vaddr as usize;
        if start >= self.memory.len() {
            return 0;
        }
        let amount = data.len().min(self.memory.len() - start);
        data[..amount].copy_from_slice(&self.memory[start..start + amount]);
        amount
    }

    /// Copy up to `data.len()` bytes into user memory, returning the count copied
    pub fn write_virtual_memory(&mut self, vaddr: VAddr, data: &[u8]) -> usize {
        let start = vaddr as usize;
        if start >= self.memory.len() {
            return 0;
        }
        let amount = data.len().min(self.memory.len() - start);
        self.memory[start..start + amount].copy_from_slice(&data[..amount]);
        amount
    }

    /// Read a NUL-terminated string of at most `max_length` bytes
    ///
    /// Returns `None` when no terminator is found within `max_length + 1` bytes.
    pub fn read_virtual_memory_string(&self, vaddr: VAddr, max_length: usize) -> Option<Vec<u8>> {
        let mut bytes = vec![0u8; max_length + 1];
        let read = self.read_virtual_memory(vaddr, &mut bytes);
        let end = bytes[..read].iter().position(|&b| b == 0)?;
        bytes.truncate(end);
        Some(bytes)
    }

    pub fn read_exact(&self, vaddr: VAddr, data: &mut [u8]) -> MemoryResult<()> {
        if self.read_virtual_memory(vaddr, data) == data.len() {
            Ok(())
        } else {
            Err(MemoryError::InvalidAddress {
                vaddr,
                len: data.len(),
            })
        }
    }

    pub fn write_exact(&mut self, vaddr: VAddr, data: &[u8]) -> MemoryResult<()> {
        if self.check_range(vaddr, data.len()) {
            self.write_virtual_memory(vaddr, data);
            Ok(())
        } else {
            Err(MemoryError::InvalidAddress {
                vaddr,
                len: data.len(),
            })
        }
    }

    pub fn read_u32(&self, vaddr: VAddr) -> MemoryResult<u32> {
        let mut word = [0u8; 4];
        self.read_exact(vaddr, &mut word)?;
        Ok(u32::from_le_bytes(word))
    }

    pub fn write_u32(&mut self, vaddr: VAddr, value: u32) -> MemoryResult<()> {
        self.write_exact(vaddr, &value.to_le_bytes())
    }

    /// Whether `[vaddr, vaddr + len)` lies entirely inside this space
    #[inline]
    pub fn check_range(&self, vaddr: VAddr, len: usize) -> bool {
        (vaddr as usize)
            .checked_add(len)
            .is_some_and(|end| end <= self.memory.len())
    }

    /// Fill one page from image data, zero-padding the remainder
    pub(crate) fn load_page(&mut self, vpn: Vpn, data: &[u8]) -> MemoryResult<()> {
        let start = vpn as usize * PAGE_SIZE;
        if data.len() > PAGE_SIZE || start + PAGE_SIZE > self.memory.len() {
            return Err(MemoryError::InvalidAddress {
                vaddr: start as VAddr,
                len: data.len(),
            });
        }
        let page = &mut self.memory[start..start + PAGE_SIZE];
        page[..data.len()].copy_from_slice(data);
        page[data.len()..].fill(0);
        Ok(())
    }
}
