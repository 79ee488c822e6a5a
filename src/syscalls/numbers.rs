/*!
 * Syscall Numbers
 *
 * | #  | prototype                                  |
 * |----|--------------------------------------------|
 * | 0  | `void halt();`                             |
 * | 1  | `void exit(int status);`                   |
 * | 2  | `int  exec(char *name, int argc, char **argv);` |
 * | 3  | `int  join(int pid, int *status);`         |
 * | 4  | `int  creat(char *name);`                  |
 * | 5  | `int  open(char *name);`                   |
 * | 6  | `int  read(int fd, char *buffer, int size);` |
 * | 7  | `int  write(int fd, char *buffer, int size);` |
 * | 8  | `int  close(int fd);`                      |
 * | 9  | `int  unlink(char *name);`                 |
 */

use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u32)]
pub enum Syscall {
    Halt = 0,
    Exit = 1,
    Exec = 2,
    Join = 3,
    Creat = 4,
    Open = 5,
    Read = 6,
    Write = 7,
    Close = 8,
    Unlink = 9,
}

impl Syscall {
    pub const fn name(self) -> &'static str {
        match self {
            Syscall::Halt => "halt",
            Syscall::Exit => "exit",
            Syscall::Exec => "exec",
            Syscall::Join => "join",
            Syscall::Creat => "creat",
            Syscall::Open => "open",
            Syscall::Read => "read",
            Syscall::Write => "write",
            Syscall::Close => "close",
            Syscall::Unlink => "unlink",
        }
    }
}

impl TryFrom<u32> for Syscall {
    type Error = u32;

    fn try_from(number: u32) -> Result<Self, Self::Error> {
        Ok(match number {
            0 => Syscall::Halt,
            1 => Syscall::Exit,
            2 => Syscall::Exec,
            3 => Syscall::Join,
            4 => Syscall::Creat,
            5 => Syscall::Open,
            6 => Syscall::Read,
            7 => Syscall::Write,
            8 => Syscall::Close,
            9 => Syscall::Unlink,
            other => return Err(other),
        })
    }
}

impl fmt::Display for Syscall {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}
