//! Declaration, access and unset of foreign-backed variables of every
//! kind, driven through the host parameter table.

use integration_tests::{bridge_fixture, TextCell};

use host_params::ParamKind;
use host_types::{HostValue, MetaStr};
use variable_bridge::{BridgeError, VariableKind};

#[test]
fn test_string_variable_declared_over_a_callable() {
    let bridge = bridge_fixture();
    let obj = bridge.runtime().new_native(TextCell::new(b""));
    bridge.declare("zembedX", VariableKind::String, obj).unwrap();

    {
        let table = bridge.host().table.borrow();
        table
            .set("zembedX", HostValue::Scalar(MetaStr::from("abc")))
            .unwrap();
        assert_eq!(
            table.get("zembedX"),
            Some(HostValue::Scalar(MetaStr::from("abc")))
        );
    }
    assert!(bridge.host().drain_diagnostics().is_empty());
}

#[test]
fn test_every_kind_dispatches_as_its_host_kind() {
    let bridge = bridge_fixture();
    let rt = bridge.runtime().clone();

    let s = rt.new_bytes(b"text");
    let i = rt.new_int(12);
    let f = rt.new_float(0.25);
    let item = rt.new_bytes(b"one");
    let a = rt.new_list(&[item]);
    rt.decref(item);
    let m = rt.new_dict();

    bridge.declare("zembedS", VariableKind::String, s).unwrap();
    bridge.declare("zembedI", VariableKind::Integer, i).unwrap();
    bridge.declare("zembedF", VariableKind::Float, f).unwrap();
    bridge.declare("zembedA", VariableKind::Array, a).unwrap();
    bridge.declare("zembedM", VariableKind::Map, m).unwrap();

    let table = bridge.host().table.borrow();
    assert_eq!(table.ops("zembedS").unwrap().kind(), ParamKind::Scalar);
    assert_eq!(table.ops("zembedI").unwrap().kind(), ParamKind::Integer);
    assert_eq!(table.ops("zembedF").unwrap().kind(), ParamKind::Float);
    assert_eq!(table.ops("zembedA").unwrap().kind(), ParamKind::Array);
    assert_eq!(table.ops("zembedM").unwrap().kind(), ParamKind::Map);

    assert_eq!(table.get("zembedS"), Some(HostValue::Scalar(MetaStr::from("text"))));
    assert_eq!(table.get("zembedI"), Some(HostValue::Integer(12)));
    assert_eq!(table.get("zembedF"), Some(HostValue::Float(0.25)));
    assert_eq!(
        table.get("zembedA"),
        Some(HostValue::Array(vec![MetaStr::from("one")]))
    );
    assert_eq!(table.get("zembedM"), Some(HostValue::Map(vec![])));
}

#[test]
fn test_foreign_mutation_is_visible_on_the_next_host_read() {
    let bridge = bridge_fixture();
    let obj = bridge.runtime().new_native(TextCell::new(b"before"));
    bridge.declare("zembedX", VariableKind::String, obj).unwrap();
    assert_eq!(
        bridge.host().table.borrow().get("zembedX"),
        Some(HostValue::Scalar(MetaStr::from("before")))
    );

    // Mutate the backing object directly, as foreign code would
    bridge.with_session(|rt| {
        let arg = rt.new_bytes(b"after");
        let result = rt.call(obj, &[arg]).unwrap();
        rt.decref(result);
        rt.decref(arg);
    });

    assert_eq!(
        bridge.host().table.borrow().get("zembedX"),
        Some(HostValue::Scalar(MetaStr::from("after")))
    );
}

#[test]
fn test_declaration_requires_a_fresh_reserved_name() {
    let bridge = bridge_fixture();
    let obj = bridge.runtime().new_bytes(b"v");

    assert!(matches!(
        bridge.declare("unreserved", VariableKind::String, obj),
        Err(BridgeError::NameInvalid)
    ));
    assert!(matches!(
        bridge.declare("zembed", VariableKind::String, obj),
        Err(BridgeError::NameInvalid)
    ));

    bridge.declare("zembedX", VariableKind::String, obj).unwrap();
    assert!(matches!(
        bridge.declare("zembedX", VariableKind::Integer, obj),
        Err(BridgeError::NameExists(_))
    ));
    assert_eq!(bridge.descriptor_count(), 1);
}

#[test]
fn test_unset_restores_the_pre_declaration_refcount() {
    let bridge = bridge_fixture();
    let obj = bridge.runtime().new_bytes(b"v");
    assert_eq!(bridge.runtime().refcount(obj), 1);

    bridge.declare("zembedX", VariableKind::String, obj).unwrap();
    assert_eq!(bridge.runtime().refcount(obj), 2);

    bridge.host().table.borrow_mut().unset("zembedX").unwrap();
    assert_eq!(bridge.runtime().refcount(obj), 1);
    assert!(!bridge.host().table.borrow().contains("zembedX"));
}
