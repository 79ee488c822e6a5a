/*!
 * Process Table Tests
 * Concurrent registration and exit/join races on the raw table
 */

use pretty_assertions::assert_eq;
use std::collections::HashSet;
use std::sync::{Arc, Barrier};
use std::thread;
use std::time::Duration;
use userprog_kernel::process::ProcessTable;
use userprog_kernel::{ExitStatus, ProcessError, ProcessState};

#[test]
fn test_concurrent_register_gives_distinct_pids() {
    let table = Arc::new(ProcessTable::new(1024));

    let handles: Vec<_> = (0..8)
        .map(|t| {
            let table = Arc::clone(&table);
            thread::spawn(move || {
                (0..50)
                    .map(|_| table.register("child.coff", Some(t)).unwrap())
                    .collect::<Vec<_>>()
            })
        })
        .collect();

    let mut seen = HashSet::new();
    for h in handles {
        for pid in h.join().unwrap() {
            assert!(seen.insert(pid), "duplicate pid {pid}");
        }
    }
    assert_eq!(seen.len(), 400);
    assert_eq!(table.len(), 400);
    assert!(!seen.contains(&0));
}

#[test]
fn test_wait_and_take_wakes_on_exit() {
    let table = Arc::new(ProcessTable::new(8));
    let pid = table.register("child.coff", Some(1)).unwrap();
    table.mark_running(pid).unwrap();

    let waiter = {
        let table = Arc::clone(&table);
        thread::spawn(move || table.wait_and_take(pid, 1))
    };

    thread::sleep(Duration::from_millis(20));
    assert_eq!(table.get(pid).unwrap().state, ProcessState::Running);
    table.mark_exited(pid, ExitStatus::normal(42)).unwrap();

    assert_eq!(waiter.join().unwrap(), Ok(ExitStatus::normal(42)));
    assert!(table.is_empty());
}

#[test]
fn test_exit_and_join_race() {
    for _ in 0..50 {
        let table = Arc::new(ProcessTable::new(8));
        let pid = table.register("child.coff", Some(1)).unwrap();
        table.mark_running(pid).unwrap();

        let exiter = {
            let table = Arc::clone(&table);
            thread::spawn(move || table.mark_exited(pid, ExitStatus::normal(7)))
        };
        let status = table.wait_and_take(pid, 1);

        assert_eq!(exiter.join().unwrap(), Ok(()));
        assert_eq!(status, Ok(ExitStatus::normal(7)));
    }
}

#[test]
fn test_exited_record_survives_until_joined() {
    let table = ProcessTable::new(8);
    let pid = table.register("child.coff", Some(1)).unwrap();
    table.mark_running(pid).unwrap();
    table.mark_exited(pid, ExitStatus::abnormal()).unwrap();

    let info = table.get(pid).unwrap();
    assert_eq!(info.state, ProcessState::Exited);
    assert_eq!(info.exit_status, Some(ExitStatus::abnormal()));
    assert_eq!(
        table.take(pid, 2),
        Err(ProcessError::NotChild { pid, caller: 2 })
    );
    assert_eq!(table.take(pid, 1), Ok(ExitStatus::abnormal()));
}

#[test]
fn test_list_is_sorted() {
    let table = ProcessTable::new(8);
    let pids: Vec<_> = (0..4)
        .map(|_| table.register("x.coff", None).unwrap())
        .collect();
    let listed: Vec<_> = table.list().into_iter().map(|p| p.pid).collect();
    assert_eq!(listed, pids);
}

#[test]
fn test_concurrent_register_respects_limit() {
    let table = Arc::new(ProcessTable::new(1));

    for _ in 0..200 {
        let start = Arc::new(Barrier::new(16));
        let handles: Vec<_> = (0..16)
            .map(|_| {
                let table = Arc::clone(&table);
                let start = Arc::clone(&start);
                thread::spawn(move || {
                    start.wait();
                    table.register("x.coff", Some(0)).ok()
                })
            })
            .collect();

        let winners: Vec<_> = handles
            .into_iter()
            .filter_map(|h| h.join().unwrap())
            .collect();
        assert_eq!(winners.len(), 1);
        assert_eq!(table.len(), 1);

        table.discard(winners[0]).unwrap();
        assert!(table.is_empty());
    }
}
