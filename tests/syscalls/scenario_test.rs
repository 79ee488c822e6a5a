/*!
 * Scenario Tests
 * The built-in driver programs run as root processes
 */

use crate::common::Harness;
use pretty_assertions::assert_eq;
use userprog_kernel::{ArgumentVector, ExitStatus, ProgramResult, UserContext};

fn child_pids(output: &str) -> Vec<i32> {
    output
        .lines()
        .filter_map(|l| l.strip_prefix("child pid: "))
        .map(|p| p.parse().unwrap())
        .collect()
}

#[test]
fn test_exec_test_driver() {
    let h = Harness::new();
    let shutdown = h.manager.run("exec_test.coff", &ArgumentVector::new()).unwrap();

    assert_eq!(shutdown.status, Some(ExitStatus::normal(0)));
    assert!(!shutdown.halted);

    let out = h.output();
    assert!(out.contains("2 arguments\narg 0: first\narg 1: second\n"), "{out}");
    assert!(out.ends_with("Exit status: 0\n"), "{out}");
    assert!(!out.contains("Failed"), "{out}");
}

#[test]
fn test_child_exit_driver() {
    let h = Harness::new();
    let shutdown = h
        .manager
        .run("child_exit_test.coff", &ArgumentVector::new())
        .unwrap();
    assert_eq!(shutdown.status, Some(ExitStatus::normal(0)));

    let out = h.output();
    let pids = child_pids(&out);
    assert_eq!(pids.len(), 10);
    assert!(pids.iter().all(|&p| p > 0));
    assert!(!out.contains("Joined failed"), "{out}");
    assert!(!out.contains("exited with -1"), "{out}");

    assert!(h.manager.list_processes().is_empty());
    assert_eq!(h.manager.frame_stats().used_frames, 0);
    assert_eq!(h.manager.stats().registered, 11);
}

#[test]
fn test_child_deref_driver() {
    let h = Harness::new();
    let shutdown = h
        .manager
        .run("child_deref_test.coff", &ArgumentVector::new())
        .unwrap();
    assert_eq!(shutdown.status, Some(ExitStatus::normal(0)));

    let out = h.output();
    assert_eq!(child_pids(&out).len(), 10);
    assert!(!out.contains("Joined failed in some form"), "{out}");
}

#[test]
fn test_parent_pointer_is_meaningless_in_child() {
    let h = Harness::new();
    // argv[0] = little-endian bytes of an address inside the child's stack
    let pid = h
        .manager
        .exec(
            0,
            "child_deref.coff",
            &ArgumentVector::from_bytes(vec![vec![0xFC, 0x23]]),
        )
        .unwrap();
    let status = h.manager.join(0, pid).unwrap();
    assert_ne!(status.code, 17);
    assert_eq!(status, ExitStatus::normal(0));

    // An address outside the child's memory is a fault, not a read of the parent
    let pid = h
        .manager
        .exec(
            0,
            "child_deref.coff",
            &ArgumentVector::from_bytes(vec![vec![0xF0, 0xFF, 0xFF, 0x7F]]),
        )
        .unwrap();
    assert_eq!(h.manager.join(0, pid).unwrap(), ExitStatus::abnormal());
}

#[test]
fn test_root_halt() {
    let h = Harness::new();
    let shutdown = h.manager.run("halt.coff", &ArgumentVector::new()).unwrap();

    assert!(shutdown.halted);
    assert_eq!(shutdown.status, Some(ExitStatus::normal(0)));
    assert!(h.manager.is_halted());
    assert!(h.manager.exec(0, "echo.coff", &ArgumentVector::new()).is_err());
}

#[test]
fn test_non_root_halt_refused() {
    let h = Harness::new();
    h.install(
        "spawn_halt.coff",
        |ctx: &mut UserContext| -> ProgramResult<i32> {
            let name = ctx.push_str("halt.coff")?;
            let argv = ctx.push_argv::<&str>(&[])?;
            let child = ctx.exec(name, 0, argv)?;
            let status = ctx.push_i32(0)?;
            ctx.join(child, status)?;
            ctx.read_i32(status)
        },
    );

    let shutdown = h
        .manager
        .run("spawn_halt.coff", &ArgumentVector::new())
        .unwrap();
    assert!(!shutdown.halted);
    // halt.coff printed its refusal and exited 1
    assert_eq!(shutdown.status, Some(ExitStatus::normal(1)));
    assert!(h.output().contains("Machine halt did not happen"));
}

#[test]
fn test_run_missing_root() {
    let h = Harness::new();
    let err = h
        .manager
        .run("wagabagabooboo.coff", &ArgumentVector::new())
        .unwrap_err();
    assert!(err.is_not_found());
}
