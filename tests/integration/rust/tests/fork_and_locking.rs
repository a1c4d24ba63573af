//! The execution-session discipline: fork-epoch recovery and output
//! flushing at lock release.

use std::cell::RefCell;

use integration_tests::bridge_fixture;

use host_types::{HostValue, MetaStr};
use variable_bridge::{HostExec, VariableKind};

#[test]
fn test_post_fork_resync_happens_once_per_generation() {
    let bridge = bridge_fixture();
    let obj = bridge.runtime().new_int(1);
    bridge.declare("zembedI", VariableKind::Integer, obj).unwrap();

    assert_eq!(bridge.runtime().fork_resets(), 0);
    bridge.host().fork();

    // Any boundary crossing performs the one resynchronization
    assert_eq!(
        bridge.host().table.borrow().get("zembedI"),
        Some(HostValue::Integer(1))
    );
    assert_eq!(bridge.runtime().fork_resets(), 1);

    for _ in 0..3 {
        let _ = bridge.host().table.borrow().get("zembedI");
    }
    assert_eq!(bridge.runtime().fork_resets(), 1);
}

#[test]
fn test_nested_crossings_share_one_session() {
    let bridge = bridge_fixture();
    bridge.host().fork();
    bridge.with_session(|_| {
        // A nested crossing inside an open session must not resync again
        bridge.with_session(|_| {});
    });
    assert_eq!(bridge.runtime().fork_resets(), 1);
}

#[test]
fn test_output_written_under_the_lock_reaches_the_host() {
    let bridge = bridge_fixture();
    bridge.with_session(|rt| rt.write_output(b"line one\n"));
    bridge.with_session(|rt| rt.write_output(b"line two\n"));
    assert_eq!(bridge.host().take_output(), b"line one\nline two\n");
}

#[test]
fn test_host_exec_routes_through_a_session() {
    struct Recorder {
        sources: RefCell<Vec<Vec<u8>>>,
    }
    impl HostExec for Recorder {
        fn run_host_code(&self, source: &MetaStr) {
            self.sources.borrow_mut().push(source.plain());
        }
    }

    let bridge = bridge_fixture();
    let exec = Recorder {
        sources: RefCell::new(Vec::new()),
    };
    bridge.host().fork();

    // An embedder dispatching an eval request wraps it in a session, so
    // the fork recovery has already run by the time host code executes
    bridge.with_session(|_| {
        exec.run_host_code(&MetaStr::from("echo hi"));
    });

    assert_eq!(exec.sources.borrow().as_slice(), &[b"echo hi".to_vec()]);
    assert_eq!(bridge.runtime().fork_resets(), 1);
}

#[test]
fn test_fork_during_capture_clears_the_scan_slot() {
    let bridge = bridge_fixture();
    let dict = bridge.runtime().new_dict();
    let stale = bridge.begin_capture(dict).unwrap();

    bridge.host().fork();
    bridge.with_session(|_| {});
    assert!(!bridge.capture_in_flight());

    // A new capture can start, and dropping the stale guard afterwards
    // must not disturb it
    let other = bridge.runtime().new_dict();
    let fresh = bridge.begin_capture(other).unwrap();
    drop(stale);
    assert!(bridge.capture_in_flight());
    drop(fresh);
    assert!(!bridge.capture_in_flight());
}
