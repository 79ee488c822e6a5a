/*!
 * Exec/Join Service Tests
 * Process creation, status collection, and resource reclamation
 */

use crate::common::Harness;
use pretty_assertions::assert_eq;
use std::sync::{Arc, Barrier};
use std::thread;
use std::time::Duration;
use userprog_kernel::loader::LoadError;
use userprog_kernel::{
    ArgumentVector, ExecError, ExitKind, ExitStatus, JoinError, KernelConfig, ProcessError,
    ProcessState, ProgramResult, UserContext, KERNEL_PID,
};

fn sleeper(ms: u64) -> impl Fn(&mut UserContext) -> ProgramResult<i32> + Send + Sync {
    move |_ctx: &mut UserContext| -> ProgramResult<i32> {
        thread::sleep(Duration::from_millis(ms));
        Ok(0)
    }
}

#[test]
fn test_exec_echo_and_join() {
    let h = Harness::new();
    let pid = h.exec("echo.coff", &["first", "second"]);
    assert!(pid >= 1);

    let status = h.manager.join(KERNEL_PID, pid).unwrap();
    assert_eq!(status, ExitStatus::normal(0));
    assert_eq!(h.output(), "2 arguments\narg 0: first\narg 1: second\n");
}

#[test]
fn test_exec_unknown_name_creates_nothing() {
    let h = Harness::new();
    let err = h
        .manager
        .exec(KERNEL_PID, "wagabagabooboo.coff", &ArgumentVector::from_strs(&["x"]))
        .unwrap_err();

    assert!(err.is_not_found());
    assert!(h.manager.list_processes().is_empty());
    assert_eq!(h.manager.frame_stats().used_frames, 0);
    assert_eq!(h.manager.stats().registered, 0);
}

#[test]
fn test_exec_rejects_bad_names() {
    let h = Harness::new();
    for name in ["", "echo", ".coff", "echo.txt"] {
        let err = h.manager.exec(KERNEL_PID, name, &ArgumentVector::new()).unwrap_err();
        assert!(
            matches!(err, ExecError::Load(LoadError::InvalidName(_))),
            "{name:?} gave {err:?}"
        );
    }
}

#[test]
fn test_exec_bad_args_creates_nothing() {
    let h = Harness::new();
    let args = ArgumentVector::from_bytes(vec![b"a\0b".to_vec()]);
    let err = h.manager.exec(KERNEL_PID, "echo.coff", &args).unwrap_err();

    assert!(matches!(err, ExecError::Marshal(_)));
    assert!(h.manager.list_processes().is_empty());
    assert_eq!(h.manager.frame_stats().used_frames, 0);
}

#[test]
fn test_exec_out_of_frames() {
    let h = Harness::with_config(KernelConfig::default().with_phys_pages(4));
    let err = h.manager.exec(KERNEL_PID, "echo.coff", &ArgumentVector::new()).unwrap_err();

    assert!(matches!(err, ExecError::Load(LoadError::Memory { .. })));
    assert!(h.manager.list_processes().is_empty());
}

#[test]
fn test_process_limit() {
    let h = Harness::with_config(KernelConfig::default().with_max_processes(2));
    h.install("nap.coff", sleeper(50));

    let a = h.exec("nap.coff", &[]);
    let b = h.exec("nap.coff", &[]);
    let err = h.manager.exec(KERNEL_PID, "nap.coff", &ArgumentVector::new()).unwrap_err();
    assert_eq!(
        err,
        ExecError::Process(ProcessError::LimitReached { current: 2, limit: 2 })
    );

    h.manager.join(KERNEL_PID, a).unwrap();
    h.manager.join(KERNEL_PID, b).unwrap();
    // Joined records free their slots
    let c = h.exec("nap.coff", &[]);
    assert!(h.manager.join(KERNEL_PID, c).is_ok());
}

#[test]
fn test_pids_are_unique_and_increasing() {
    let h = Harness::new();
    let pids: Vec<_> = (0..5).map(|_| h.exec("echo.coff", &[])).collect();
    for w in pids.windows(2) {
        assert!(w[1] > w[0]);
    }
    for pid in pids {
        h.manager.join(KERNEL_PID, pid).unwrap();
    }
}

#[test]
fn test_join_collects_each_status_once() {
    let h = Harness::new();
    let pid = h.exec("echo.coff", &[]);

    assert!(h.manager.join(KERNEL_PID, pid).is_ok());
    assert_eq!(
        h.manager.join(KERNEL_PID, pid),
        Err(JoinError::NoSuchProcess(pid))
    );
}

#[test]
fn test_join_unknown_pid_does_not_block() {
    let h = Harness::new();
    assert_eq!(
        h.manager.join(KERNEL_PID, 4242),
        Err(JoinError::NoSuchProcess(4242))
    );
}

#[test]
fn test_join_by_non_parent_fails() {
    let h = Harness::new();
    let pid = h.exec("echo.coff", &[]);

    assert_eq!(
        h.manager.join(99, pid),
        Err(JoinError::NotChild { pid, caller: 99 })
    );
    // The real parent can still collect it
    assert_eq!(h.manager.join(KERNEL_PID, pid), Ok(ExitStatus::normal(0)));
}

#[test]
fn test_minus_one_is_a_normal_status() {
    let h = Harness::new();
    h.install(
        "minus_one.coff",
        |_ctx: &mut UserContext| -> ProgramResult<i32> { Ok(-1) },
    );

    let status = h.run_to_exit("minus_one.coff", &[]);
    assert_eq!(status.code, -1);
    assert_eq!(status.kind, ExitKind::Normal);
}

#[test]
fn test_panic_is_abnormal_exit() {
    let h = Harness::new();
    h.install(
        "boom.coff",
        |_ctx: &mut UserContext| -> ProgramResult<i32> { panic!("boom") },
    );

    let status = h.run_to_exit("boom.coff", &[]);
    assert_eq!(status, ExitStatus::abnormal());
    assert_eq!(h.manager.frame_stats().used_frames, 0);
}

#[test]
fn test_address_fault_is_abnormal_exit() {
    let h = Harness::new();
    h.install(
        "fault.coff",
        |ctx: &mut UserContext| -> ProgramResult<i32> { ctx.read_i32(0xFFFF_FFF0) },
    );

    assert_eq!(h.run_to_exit("fault.coff", &[]), ExitStatus::abnormal());
}

#[test]
fn test_try_join_does_not_block() {
    let h = Harness::new();
    let gate = Arc::new(Barrier::new(2));
    let child_gate = Arc::clone(&gate);
    h.install(
        "gated.coff",
        move |_ctx: &mut UserContext| -> ProgramResult<i32> {
            child_gate.wait();
            Ok(5)
        },
    );

    let pid = h.exec("gated.coff", &[]);
    assert_eq!(h.manager.try_join(KERNEL_PID, pid), Ok(None));
    assert_eq!(
        h.manager.get_process(pid).map(|p| p.state),
        Some(ProcessState::Running)
    );

    gate.wait();
    assert_eq!(h.manager.join(KERNEL_PID, pid), Ok(ExitStatus::normal(5)));
}

#[test]
fn test_concurrent_joins_single_winner() {
    let h = Harness::new();
    h.install("nap.coff", sleeper(100));
    let pid = h.exec("nap.coff", &[]);

    let joiners: Vec<_> = (0..4)
        .map(|_| {
            let manager = h.manager.clone();
            thread::spawn(move || manager.join(KERNEL_PID, pid))
        })
        .collect();
    let results: Vec<_> = joiners.into_iter().map(|j| j.join().unwrap()).collect();

    let winners = results.iter().filter(|r| r.is_ok()).count();
    assert_eq!(winners, 1);
    for r in results.iter().filter(|r| r.is_err()) {
        assert_eq!(r, &Err(JoinError::NoSuchProcess(pid)));
    }
}

#[test]
fn test_children_exit_in_any_order() {
    let h = Harness::new();
    h.install("slow.coff", sleeper(60));
    h.install("fast.coff", sleeper(0));

    let slow = h.exec("slow.coff", &[]);
    let fast = h.exec("fast.coff", &[]);

    // Joining the slow one first still sees the fast one afterwards
    assert!(h.manager.join(KERNEL_PID, slow).is_ok());
    assert_eq!(
        h.manager.get_process(fast).map(|p| p.state),
        Some(ProcessState::Exited)
    );
    assert!(h.manager.join(KERNEL_PID, fast).is_ok());
}

#[test]
fn test_frames_return_after_all_exit() {
    let h = Harness::new();
    let pids: Vec<_> = (0..8).map(|_| h.exec("child_exit.coff", &["first"])).collect();

    for pid in pids {
        h.manager.join(KERNEL_PID, pid).unwrap();
    }
    assert_eq!(h.manager.frame_stats().used_frames, 0);
    assert!(h.manager.list_processes().is_empty());
}

#[test]
fn test_orphans_are_reclaimed() {
    let h = Harness::new();
    h.install("nap.coff", sleeper(50));
    h.install(
        "abandon.coff",
        |ctx: &mut UserContext| -> ProgramResult<i32> {
            let saved = ctx.stack_pointer();
            let name = ctx.push_str("nap.coff")?;
            let argv = ctx.push_argv::<&str>(&[])?;
            let child = ctx.exec(name, 0, argv)?;
            ctx.restore_stack(saved);
            Ok(child)
        },
    );

    let parent = h.exec("abandon.coff", &[]);
    let child = h.manager.join(KERNEL_PID, parent).unwrap().code as u32;
    assert!(child > parent);

    h.manager.wait_idle();
    assert!(h.manager.get_process(child).is_none());
    assert!(h.manager.list_processes().is_empty());
    assert_eq!(h.manager.stats().reclaimed, 2);
}

#[test]
fn test_stats_serialize() {
    let h = Harness::new();
    h.run_to_exit("echo.coff", &[]);

    let stats = h.manager.stats();
    assert_eq!(stats.registered, 1);
    assert_eq!(stats.reclaimed, 1);
    assert_eq!(stats.live_records, 0);

    let json = serde_json::to_value(&stats).unwrap();
    assert_eq!(json["registered"], 1);
    assert_eq!(json["halted"], false);
}

#[test]
fn test_exec_rejects_unknown_parent() {
    let h = Harness::new();
    let err = h
        .manager
        .exec(4242, "echo.coff", &ArgumentVector::new())
        .unwrap_err();
    assert_eq!(err, ExecError::Process(ProcessError::NotFound(4242)));
    assert!(h.manager.list_processes().is_empty());
    assert_eq!(h.manager.frame_stats().used_frames, 0);

    // A parent that has been joined is gone too
    let gone = h.exec("echo.coff", &[]);
    h.manager.join(KERNEL_PID, gone).unwrap();
    let err = h
        .manager
        .exec(gone, "echo.coff", &ArgumentVector::new())
        .unwrap_err();
    assert_eq!(err, ExecError::Process(ProcessError::NotFound(gone)));
    assert_eq!(h.manager.stats().live_records, 0);
}
