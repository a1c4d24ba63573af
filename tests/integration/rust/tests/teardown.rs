//! Shutdown teardown across shadowing, mixed kinds and foreign refcounts.

use integration_tests::{bridge_fixture, TextCell};

use host_params::PlainParam;
use host_types::{HostValue, MetaStr};
use variable_bridge::VariableKind;

#[test]
fn test_teardown_unbinds_every_kind_and_releases_references() {
    let bridge = bridge_fixture();
    let rt = bridge.runtime().clone();

    let s = rt.new_native(TextCell::new(b"s"));
    let i = rt.new_int(1);
    let item = rt.new_bytes(b"x");
    let a = rt.new_list(&[item]);
    rt.decref(item);
    let m = rt.new_dict();

    bridge.declare("zembedS", VariableKind::String, s).unwrap();
    bridge.declare("zembedI", VariableKind::Integer, i).unwrap();
    bridge.declare("zembedA", VariableKind::Array, a).unwrap();
    bridge.declare("zembedM", VariableKind::Map, m).unwrap();
    assert_eq!(bridge.descriptor_count(), 4);

    bridge.teardown();

    assert_eq!(bridge.descriptor_count(), 0);
    assert!(bridge.host().table.borrow().is_empty());
    for obj in [s, i, a, m] {
        assert_eq!(rt.refcount(obj), 1, "only the test's reference remains");
    }
    assert!(bridge.host().drain_diagnostics().is_empty());
}

#[test]
fn test_teardown_leaves_shadowing_host_bindings_alone() {
    let bridge = bridge_fixture();
    let obj = bridge.runtime().new_bytes(b"foreign");
    bridge.declare("zembedX", VariableKind::String, obj).unwrap();

    // The user shadows the foreign variable with an ordinary one
    bridge.host().table.borrow_mut().shadow(
        "zembedX",
        PlainParam::new(HostValue::Scalar(MetaStr::from("local"))),
    );

    bridge.teardown();

    assert_eq!(
        bridge.host().table.borrow().get("zembedX"),
        Some(HostValue::Scalar(MetaStr::from("local")))
    );
    assert_eq!(bridge.runtime().refcount(obj), 1);

    // The chain underneath is empty now
    bridge.host().table.borrow_mut().unset("zembedX").unwrap();
    assert!(!bridge.host().table.borrow().contains("zembedX"));
}

#[test]
fn test_teardown_is_idempotent() {
    let bridge = bridge_fixture();
    let obj = bridge.runtime().new_bytes(b"v");
    bridge.declare("zembedX", VariableKind::String, obj).unwrap();

    bridge.teardown();
    bridge.teardown();

    assert_eq!(bridge.descriptor_count(), 0);
    assert!(bridge.host().drain_diagnostics().is_empty());
}

#[test]
fn test_redeclaration_works_after_teardown() {
    let bridge = bridge_fixture();
    let obj = bridge.runtime().new_bytes(b"first");
    bridge.declare("zembedX", VariableKind::String, obj).unwrap();
    bridge.teardown();

    let obj = bridge.runtime().new_bytes(b"second");
    bridge.declare("zembedX", VariableKind::String, obj).unwrap();
    assert_eq!(
        bridge.host().table.borrow().get("zembedX"),
        Some(HostValue::Scalar(MetaStr::from("second")))
    );
}
