/*!
 * Driver Programs
 *
 * Root programs that exercise exec and join from user space and report
 * what they saw on the console.
 */

use super::spawn;
use crate::core::types::SYSCALL_FAILURE;
use crate::syscalls::{ProgramResult, UserContext};

const CHILDREN: usize = 10;

/// exec a real program and a missing one, then join the real one
pub fn exec_test(ctx: &mut UserContext) -> ProgramResult<i32> {
    let argv = ["first", "second"];

    let legal = spawn(ctx, "echo.coff", &argv)?;
    if legal == SYSCALL_FAILURE {
        ctx.print("exec failed\n")?;
        ctx.exit(1)?;
    }

    let illegal = spawn(ctx, "wagabagabooboo.coff", &argv)?;
    if illegal != SYSCALL_FAILURE {
        ctx.print("Failed: Exec with illegal name ran something\n")?;
        ctx.exit(1)?;
    }

    let status = ctx.push_i32(0)?;
    if ctx.join(legal, status)? == SYSCALL_FAILURE {
        ctx.print("Joined failed\n")?;
        ctx.exit(1)?;
    }
    let code = ctx.read_i32(status)?;
    ctx.print(&format!("Exit status: {code}\n"))?;
    Ok(0)
}

/// exec ten children, then join each in exec order
pub fn child_exit_test(ctx: &mut UserContext) -> ProgramResult<i32> {
    let pids = spawn_children(ctx, "child_exit.coff", &["first"])?;
    join_children(ctx, &pids, "Joined failed\n")
}

/// Pass a pointer into this process through argv and let children chase it
pub fn child_deref_test(ctx: &mut UserContext) -> ProgramResult<i32> {
    let mut val = ctx.push_i32(17)?;
    // A zero low byte would end the C string before the pointer starts
    if val.to_le_bytes()[0] == 0 {
        val = ctx.push_i32(17)?;
    }

    // argv[0] is "XXXX" overwritten with the pointer's bytes
    let mut arg: Vec<u8> = val
        .to_le_bytes()
        .into_iter()
        .take_while(|&b| b != 0)
        .collect();
    arg.push(0);

    let saved = ctx.stack_pointer();
    let arg_ptr = ctx.push_bytes(&arg)?;
    let name_ptr = ctx.push_str("child_deref.coff")?;
    let argv = ctx.push_pointers(&[arg_ptr])?;

    let mut pids = Vec::with_capacity(CHILDREN);
    for i in 0..CHILDREN {
        let pid = ctx.exec(name_ptr, 1, argv)?;
        ctx.print(&format!("child pid: {pid}\n"))?;
        if pid == SYSCALL_FAILURE {
            ctx.print(&format!("exec #{i} failed\n"))?;
            ctx.exit(1)?;
        }
        pids.push(pid);
    }
    ctx.restore_stack(saved);

    join_children(ctx, &pids, "Joined failed in some form\n")
}

fn spawn_children(ctx: &mut UserContext, name: &str, args: &[&str]) -> ProgramResult<Vec<i32>> {
    let mut pids = Vec::with_capacity(CHILDREN);
    for i in 0..CHILDREN {
        let pid = spawn(ctx, name, args)?;
        ctx.print(&format!("child pid: {pid}\n"))?;
        if pid == SYSCALL_FAILURE {
            ctx.print(&format!("exec #{i} failed\n"))?;
            ctx.exit(1)?;
        }
        pids.push(pid);
    }
    Ok(pids)
}

fn join_children(ctx: &mut UserContext, pids: &[i32], failure: &str) -> ProgramResult<i32> {
    let status = ctx.push_i32(0)?;
    for (i, &pid) in pids.iter().enumerate() {
        if ctx.join(pid, status)? != 0 {
            ctx.print(failure)?;
            ctx.exit(1)?;
        }
        let code = ctx.read_i32(status)?;
        if code == SYSCALL_FAILURE {
            ctx.print(&format!("child #{i} exited with {code} status\n"))?;
        }
    }
    Ok(0)
}
