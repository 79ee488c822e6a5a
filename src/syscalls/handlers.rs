/*!
 * Syscall Handlers
 *
 * Decodes user arguments out of the caller's address space and collapses
 * every failure to -1. Faults in the program itself (bad syscall number)
 * are traps and end the process instead.
 */

use super::context::{OpenFile, UserContext};
use super::numbers::Syscall;
use super::trap::{ProgramResult, Trap};
use crate::core::limits::{MAX_ARGC, MAX_STRING_LENGTH, PAGE_SIZE, POINTER_SIZE};
use crate::core::types::{Fd, Pid, VAddr, SYSCALL_FAILURE};
use crate::monitoring::span_syscall;
use crate::process::ArgumentVector;
use tracing::{debug, trace};

impl UserContext {
    /// Numeric syscall entry: `number` selects the call, `a0..a3` are its registers
    pub fn syscall(&mut self, number: u32, a0: i32, a1: i32, a2: i32, a3: i32) -> ProgramResult<i32> {
        let call = Syscall::try_from(number).map_err(|n| {
            debug!(pid = self.pid, number = n, "Unknown syscall");
            Trap::IllegalSyscall(n)
        })?;
        let span = span_syscall(call, self.pid);
        let _entered = span.span().enter();
        trace!(pid = self.pid, %call, a0, a1, a2, a3, "Syscall");

        let result = match call {
            Syscall::Halt => self.handle_halt(),
            Syscall::Exit => Err(Trap::Exit(a0)),
            Syscall::Exec => Ok(self.handle_exec(a0 as VAddr, a1, a2 as VAddr)),
            Syscall::Join => Ok(self.handle_join(a0, a1 as VAddr)),
            Syscall::Creat | Syscall::Open | Syscall::Unlink => Ok(self.handle_file_op(call, a0 as VAddr)),
            Syscall::Read => Ok(self.handle_read(a0, a1 as VAddr, a2)),
            Syscall::Write => Ok(self.handle_write(a0, a1 as VAddr, a2)),
            Syscall::Close => Ok(self.handle_close(a0)),
        };
        if let Ok(value) = result {
            span.record_result(value);
        }
        result
    }

    // ------------------------------------------------------------------
    // Typed wrappers
    // ------------------------------------------------------------------

    pub fn halt(&mut self) -> ProgramResult<i32> {
        self.syscall(Syscall::Halt as u32, 0, 0, 0, 0)
    }

    /// Terminate this process; always returns `Err(Trap::Exit)` for `?`
    pub fn exit(&mut self, status: i32) -> ProgramResult<()> {
        self.syscall(Syscall::Exit as u32, status, 0, 0, 0).map(|_| ())
    }

    pub fn exec(&mut self, name: VAddr, argc: i32, argv: VAddr) -> ProgramResult<i32> {
        self.syscall(Syscall::Exec as u32, name as i32, argc, argv as i32, 0)
    }

    pub fn join(&mut self, pid: i32, status: VAddr) -> ProgramResult<i32> {
        self.syscall(Syscall::Join as u32, pid, status as i32, 0, 0)
    }

    pub fn read(&mut self, fd: Fd, buf: i32, count: i32) -> ProgramResult<i32> {
        self.syscall(Syscall::Read as u32, fd, buf, count, 0)
    }

    pub fn write(&mut self, fd: Fd, buf: i32, count: i32) -> ProgramResult<i32> {
        self.syscall(Syscall::Write as u32, fd, buf, count, 0)
    }

    pub fn close(&mut self, fd: Fd) -> ProgramResult<i32> {
        self.syscall(Syscall::Close as u32, fd, 0, 0, 0)
    }

    // ------------------------------------------------------------------
    // Handlers
    // ------------------------------------------------------------------

    fn handle_halt(&mut self) -> ProgramResult<i32> {
        if self.manager.halt(self.pid) {
            Err(Trap::Halt)
        } else {
            Ok(SYSCALL_FAILURE)
        }
    }

    fn handle_exec(&mut self, name_ptr: VAddr, argc: i32, argv_ptr: VAddr) -> i32 {
        let Some(name) = self.read_user_string(name_ptr) else {
            debug!(pid = self.pid, name_ptr, "exec: unreadable name");
            return SYSCALL_FAILURE;
        };
        let argc = match usize::try_from(argc) {
            Ok(n) if n <= MAX_ARGC => n,
            _ => {
                debug!(pid = self.pid, argc, "exec: bad argc");
                return SYSCALL_FAILURE;
            }
        };

        let mut args = ArgumentVector::new();
        for i in 0..argc {
            let slot = argv_ptr.wrapping_add((i * POINTER_SIZE) as VAddr);
            let Ok(ptr) = self.space.read_u32(slot) else {
                debug!(pid = self.pid, index = i, "exec: unreadable argv entry");
                return SYSCALL_FAILURE;
            };
            let Some(arg) = self.space.read_virtual_memory_string(ptr, MAX_STRING_LENGTH) else {
                debug!(pid = self.pid, index = i, "exec: unterminated argument");
                return SYSCALL_FAILURE;
            };
            args.push(arg);
        }

        match self.manager.exec(self.pid, &name, &args) {
            // The table never hands out a PID above i32::MAX
            Ok(child) => i32::try_from(child).unwrap_or(SYSCALL_FAILURE),
            Err(e) => {
                debug!(pid = self.pid, name = %name, error = %e, "exec failed");
                SYSCALL_FAILURE
            }
        }
    }

    fn handle_join(&mut self, target: i32, status_ptr: VAddr) -> i32 {
        let Ok(target) = Pid::try_from(target) else {
            return SYSCALL_FAILURE;
        };
        // Check the destination first so a bad pointer cannot consume the child's status
        if !self.space.check_range(status_ptr, 4) {
            debug!(pid = self.pid, status_ptr, "join: bad status pointer");
            return SYSCALL_FAILURE;
        }

        match self.manager.join(self.pid, target) {
            Ok(status) => match self.space.write_u32(status_ptr, status.code as u32) {
                Ok(()) => 0,
                Err(_) => SYSCALL_FAILURE,
            },
            Err(e) => {
                debug!(pid = self.pid, target, error = %e, "join failed");
                SYSCALL_FAILURE
            }
        }
    }

    fn handle_file_op(&mut self, call: Syscall, name_ptr: VAddr) -> i32 {
        let name = self.read_user_string(name_ptr);
        debug!(pid = self.pid, %call, ?name, "No file system available");
        SYSCALL_FAILURE
    }

    fn handle_read(&mut self, fd: Fd, buf: VAddr, count: i32) -> i32 {
        if self.file(fd) != Some(OpenFile::ConsoleIn) || count < 0 {
            return SYSCALL_FAILURE;
        }
        let mut chunk = vec![0u8; (count as usize).min(PAGE_SIZE)];
        let mut total = 0usize;
        while total < count as usize {
            let want = (count as usize - total).min(chunk.len());
            let got = self.manager.console().read(&mut chunk[..want]);
            if got == 0 {
                break;
            }
            let addr = buf.wrapping_add(total as VAddr);
            if self.space.write_virtual_memory(addr, &chunk[..got]) != got {
                return SYSCALL_FAILURE;
            }
            total += got;
        }
        total as i32
    }

    fn handle_write(&mut self, fd: Fd, buf: VAddr, count: i32) -> i32 {
        if self.file(fd) != Some(OpenFile::ConsoleOut) || count < 0 {
            return SYSCALL_FAILURE;
        }
        let count = count as usize;
        if !self.space.check_range(buf, count) {
            return SYSCALL_FAILURE;
        }
        let mut chunk = vec![0u8; count.min(PAGE_SIZE)];
        let mut written = 0usize;
        while written < count {
            let n = (count - written).min(chunk.len());
            let addr = buf.wrapping_add(written as VAddr);
            if self.space.read_virtual_memory(addr, &mut chunk[..n]) != n {
                return SYSCALL_FAILURE;
            }
            written += self.manager.console().write(&chunk[..n]);
        }
        written as i32
    }

    fn handle_close(&mut self, fd: Fd) -> i32 {
        let Some(slot) = usize::try_from(fd).ok().and_then(|i| self.files.get_mut(i)) else {
            return SYSCALL_FAILURE;
        };
        if slot.take().is_some() {
            0
        } else {
            SYSCALL_FAILURE
        }
    }

    fn read_user_string(&self, vaddr: VAddr) -> Option<String> {
        let bytes = self.space.read_virtual_memory_string(vaddr, MAX_STRING_LENGTH)?;
        String::from_utf8(bytes).ok()
    }
}
