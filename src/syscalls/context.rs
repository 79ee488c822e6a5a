/*!
 * User Context
 *
 * Everything a running process can touch: its PID, its address space,
 * its argument layout, a stack for building syscall arguments, and its
 * file descriptor table. The syscall entry points live in `handlers`.
 */

use super::trap::{ProgramResult, Trap};
use crate::core::limits::{MAX_OPEN_FILES, MAX_STRING_LENGTH, POINTER_SIZE};
use crate::core::types::{Fd, Pid, VAddr};
use crate::memory::AddressSpace;
use crate::process::marshal::{unmarshal, ArgLayout};
use crate::process::ProcessManager;

/// Open file descriptor targets
///
/// Only the console exists; there is no file system behind fds 2+.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum OpenFile {
    ConsoleIn,
    ConsoleOut,
}

const STACK_ALIGN: u32 = 4;

pub struct UserContext {
    pub(super) pid: Pid,
    pub(super) name: String,
    pub(super) manager: ProcessManager,
    pub(super) space: AddressSpace,
    pub(super) files: [Option<OpenFile>; MAX_OPEN_FILES],
    args: ArgLayout,
    sp: VAddr,
}

impl UserContext {
    pub(crate) fn new(
        pid: Pid,
        name: String,
        manager: ProcessManager,
        space: AddressSpace,
        args: ArgLayout,
    ) -> Self {
        let mut files = [None; MAX_OPEN_FILES];
        files[0] = Some(OpenFile::ConsoleIn);
        files[1] = Some(OpenFile::ConsoleOut);
        let sp = space.initial_sp();
        Self {
            pid,
            name,
            manager,
            space,
            files,
            args,
            sp,
        }
    }

    #[inline]
    pub fn pid(&self) -> Pid {
        self.pid
    }

    /// Name of the executable this process runs
    #[inline]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[inline]
    pub fn argc(&self) -> u32 {
        self.args.argc
    }

    /// Address of the argv pointer array
    #[inline]
    pub fn argv(&self) -> VAddr {
        self.args.argv
    }

    pub fn memory(&self) -> &AddressSpace {
        &self.space
    }

    pub fn memory_mut(&mut self) -> &mut AddressSpace {
        &mut self.space
    }

    /// Arguments as raw bytes, read back from this process's memory
    pub fn raw_args(&self) -> ProgramResult<Vec<Vec<u8>>> {
        unmarshal(&self.space, self.args).ok_or(Trap::AddressError {
            vaddr: self.args.argv,
            len: self.args.argc as usize * POINTER_SIZE,
        })
    }

    /// Arguments decoded lossily as UTF-8
    pub fn args(&self) -> ProgramResult<Vec<String>> {
        Ok(self
            .raw_args()?
            .into_iter()
            .map(|a| String::from_utf8_lossy(&a).into_owned())
            .collect())
    }

    // ------------------------------------------------------------------
    // Memory access; faults become traps
    // ------------------------------------------------------------------

    pub fn read_bytes(&self, vaddr: VAddr, len: usize) -> ProgramResult<Vec<u8>> {
        let mut buf = vec![0u8; len];
        self.space.read_exact(vaddr, &mut buf)?;
        Ok(buf)
    }

    pub fn write_bytes(&mut self, vaddr: VAddr, data: &[u8]) -> ProgramResult<()> {
        Ok(self.space.write_exact(vaddr, data)?)
    }

    pub fn read_i32(&self, vaddr: VAddr) -> ProgramResult<i32> {
        Ok(self.space.read_u32(vaddr)? as i32)
    }

    pub fn write_i32(&mut self, vaddr: VAddr, value: i32) -> ProgramResult<()> {
        Ok(self.space.write_u32(vaddr, value as u32)?)
    }

    /// NUL-terminated string at `vaddr`
    pub fn read_string(&self, vaddr: VAddr) -> ProgramResult<Vec<u8>> {
        self.space
            .read_virtual_memory_string(vaddr, MAX_STRING_LENGTH)
            .ok_or(Trap::AddressError {
                vaddr,
                len: MAX_STRING_LENGTH + 1,
            })
    }

    // ------------------------------------------------------------------
    // Stack
    // ------------------------------------------------------------------

    #[inline]
    pub fn stack_pointer(&self) -> VAddr {
        self.sp
    }

    /// Pop everything pushed since `sp` was read
    pub fn restore_stack(&mut self, sp: VAddr) {
        debug_assert!(sp >= self.sp && sp <= self.space.initial_sp());
        self.sp = sp;
    }

    /// Push raw bytes (4-byte aligned) and return their address
    pub fn push_bytes(&mut self, data: &[u8]) -> ProgramResult<VAddr> {
        let size = (data.len() as u32).div_ceil(STACK_ALIGN) * STACK_ALIGN;
        let new_sp = self
            .sp
            .checked_sub(size)
            .filter(|&sp| sp >= self.space.stack_limit())
            .ok_or(Trap::StackOverflow {
                requested: data.len(),
            })?;
        self.space.write_exact(new_sp, data)?;
        self.sp = new_sp;
        Ok(new_sp)
    }

    /// Push a NUL-terminated copy of `s`
    pub fn push_str(&mut self, s: &str) -> ProgramResult<VAddr> {
        let mut bytes = Vec::with_capacity(s.len() + 1);
        bytes.extend_from_slice(s.as_bytes());
        bytes.push(0);
        self.push_bytes(&bytes)
    }

    pub fn push_i32(&mut self, value: i32) -> ProgramResult<VAddr> {
        self.push_bytes(&value.to_le_bytes())
    }

    /// Push an array of user pointers, e.g. an argv
    pub fn push_pointers(&mut self, ptrs: &[VAddr]) -> ProgramResult<VAddr> {
        let bytes: Vec<u8> = ptrs.iter().flat_map(|p| p.to_le_bytes()).collect();
        self.push_bytes(&bytes)
    }

    /// Push each string and then the pointer array referring to them
    pub fn push_argv<S: AsRef<str>>(&mut self, args: &[S]) -> ProgramResult<VAddr> {
        let ptrs = args
            .iter()
            .map(|a| self.push_str(a.as_ref()))
            .collect::<ProgramResult<Vec<_>>>()?;
        self.push_pointers(&ptrs)
    }

    /// `printf`-style output through the write syscall
    pub fn print(&mut self, text: &str) -> ProgramResult<i32> {
        let saved = self.sp;
        let buf = self.push_bytes(text.as_bytes())?;
        let written = self.write(1, buf as i32, text.len() as i32);
        self.restore_stack(saved);
        written
    }

    pub(super) fn file(&self, fd: Fd) -> Option<OpenFile> {
        usize::try_from(fd)
            .ok()
            .and_then(|i| self.files.get(i).copied().flatten())
    }
}

impl std::fmt::Debug for UserContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("UserContext")
            .field("pid", &self.pid)
            .field("name", &self.name)
            .field("argc", &self.args.argc)
            .field("sp", &self.sp)
            .finish()
    }
}
