/*!
 * Argument Marshalling
 *
 * Copies an argument vector into the last page of a new address space:
 *
 * ```text
 * arg_page: [ptr 0][ptr 1]...[ptr n-1] "arg0\0" "arg1\0" ...
 * ```
 *
 * Pointers are 4-byte little-endian virtual addresses into the same page.
 * The child gets its own bytes; nothing is shared with the caller.
 */

use super::types::{MarshalError, MarshalResult};
use crate::core::limits::{MAX_ARGC, MAX_STRING_LENGTH, PAGE_SIZE, POINTER_SIZE};
use crate::core::types::VAddr;
use crate::memory::AddressSpace;

/// Ordered byte-string arguments for a new process
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ArgumentVector {
    args: Vec<Vec<u8>>,
}

impl ArgumentVector {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_strs<S: AsRef<str>>(args: &[S]) -> Self {
        Self {
            args: args.iter().map(|a| a.as_ref().as_bytes().to_vec()).collect(),
        }
    }

    pub fn from_bytes(args: Vec<Vec<u8>>) -> Self {
        Self { args }
    }

    pub fn push(&mut self, arg: impl Into<Vec<u8>>) {
        self.args.push(arg.into());
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.args.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.args.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &[u8]> {
        self.args.iter().map(Vec::as_slice)
    }

    /// Bytes the layout occupies in the argument page
    pub fn layout_size(&self) -> usize {
        self.args.iter().map(|a| POINTER_SIZE + a.len() + 1).sum()
    }

    /// Check every limit without touching any address space
    pub fn validate(&self) -> MarshalResult<()> {
        if self.args.len() > MAX_ARGC {
            return Err(MarshalError::TooManyArgs {
                count: self.args.len(),
                max: MAX_ARGC,
            });
        }
        for (index, arg) in self.args.iter().enumerate() {
            if arg.len() > MAX_STRING_LENGTH {
                return Err(MarshalError::ArgTooLong {
                    index,
                    len: arg.len(),
                    max: MAX_STRING_LENGTH,
                });
            }
            if arg.contains(&0) {
                return Err(MarshalError::EmbeddedNul { index });
            }
        }
        let needed = self.layout_size();
        if needed > PAGE_SIZE {
            return Err(MarshalError::ArgsTooLarge {
                needed,
                capacity: PAGE_SIZE,
            });
        }
        Ok(())
    }
}

impl<S: AsRef<str>> FromIterator<S> for ArgumentVector {
    fn from_iter<I: IntoIterator<Item = S>>(iter: I) -> Self {
        Self {
            args: iter.into_iter().map(|a| a.as_ref().as_bytes().to_vec()).collect(),
        }
    }
}

/// Where the marshalled arguments live in the child
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ArgLayout {
    pub argc: u32,
    pub argv: VAddr,
}

/// Write `args` into the argument page of `space`
pub fn marshal(space: &mut AddressSpace, args: &ArgumentVector) -> MarshalResult<ArgLayout> {
    args.validate()?;

    let base = space.arg_page();
    let mut entry = base;
    let mut string = base + (args.len() * POINTER_SIZE) as VAddr;

    for arg in args.iter() {
        space.write_u32(entry, string)?;
        entry += POINTER_SIZE as VAddr;

        space.write_exact(string, arg)?;
        string += arg.len() as VAddr;
        space.write_exact(string, &[0])?;
        string += 1;
    }

    Ok(ArgLayout {
        argc: args.len() as u32,
        argv: base,
    })
}

/// Read the argument vector back out of a process's own memory
pub fn unmarshal(space: &AddressSpace, layout: ArgLayout) -> Option<Vec<Vec<u8>>> {
    (0..layout.argc)
        .map(|i| {
            let ptr = space.read_u32(layout.argv + i * POINTER_SIZE as VAddr).ok()?;
            space.read_virtual_memory_string(ptr, MAX_STRING_LENGTH)
        })
        .collect()
}
