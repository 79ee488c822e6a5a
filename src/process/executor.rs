/*!
 * Process Executor
 * Runs each user process on its own OS thread
 */

use super::manager::ProcessManager;
use super::marshal::ArgLayout;
use super::types::ExitStatus;
use crate::core::types::Pid;
use crate::loader::UserProgram;
use crate::memory::AddressSpace;
use crate::syscalls::{Trap, UserContext};
use std::any::Any;
use std::io;
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;
use std::thread;
use tracing::{debug, info, warn};

/// Everything needed to start a process body
pub(crate) struct Launch {
    pub pid: Pid,
    pub name: String,
    pub program: Arc<dyn UserProgram>,
    pub space: AddressSpace,
    pub args: ArgLayout,
}

pub(crate) struct ProcessExecutor;

impl ProcessExecutor {
    /// Start `launch` on a new thread; it reports its own exit to `manager`
    pub fn spawn(manager: ProcessManager, launch: Launch) -> io::Result<()> {
        let thread_name = format!("{}#{}", launch.name, launch.pid);
        thread::Builder::new()
            .name(thread_name)
            .spawn(move || Self::run(manager, launch))
            .map(|_detached| ())
    }

    fn run(manager: ProcessManager, launch: Launch) {
        let Launch {
            pid,
            name,
            program,
            space,
            args,
        } = launch;

        debug!(pid, name = %name, argc = args.argc, "Process started");
        let mut ctx = UserContext::new(pid, name, manager.clone(), space, args);

        let outcome = panic::catch_unwind(AssertUnwindSafe(|| program.main(&mut ctx)));
        let status = match outcome {
            Ok(Ok(code)) => ExitStatus::normal(code),
            Ok(Err(trap)) => {
                match &trap {
                    Trap::Exit(_) | Trap::Halt => {}
                    fault => warn!(pid, name = %ctx.name(), %fault, "Process killed by trap"),
                }
                trap.exit_status()
            }
            Err(payload) => {
                warn!(
                    pid,
                    name = %ctx.name(),
                    panic = %panic_message(payload.as_ref()),
                    "Process panicked"
                );
                ExitStatus::abnormal()
            }
        };

        info!(pid, name = %ctx.name(), code = status.code, "Process exited");
        // Address space goes back to the frame pool before anyone can join
        drop(ctx);
        manager.terminate(pid, status);
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> &str {
    payload
        .downcast_ref::<&str>()
        .copied()
        .or_else(|| payload.downcast_ref::<String>().map(String::as_str))
        .unwrap_or("<non-string panic>")
}
