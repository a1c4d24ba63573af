//! End-to-end unit tests for the variable bridge across its modules.

use std::rc::Rc;

use foreign_runtime::{ForeignResult, NativeObject, ObjRef, Runtime};
use host_params::{HostContext, ParamKind};
use host_types::{HostValue, MetaStr, META};
use variable_bridge::{marshal, Bridge, BridgeError, VariableKind};

/// Callable cell that reads as its stored text and accepts replacements.
struct TextCell {
    text: Vec<u8>,
}

impl NativeObject for TextCell {
    fn text(&self) -> ForeignResult<Vec<u8>> {
        Ok(self.text.clone())
    }
    fn is_callable(&self) -> bool {
        true
    }
    fn call(&mut self, rt: &Runtime, args: &[ObjRef]) -> ForeignResult<ObjRef> {
        if let Some(&arg) = args.first() {
            self.text = rt.str_bytes(arg)?;
        }
        Ok(rt.new_none())
    }
}

fn fixture() -> Rc<Bridge> {
    Bridge::new(Runtime::new(), HostContext::new())
}

#[test]
fn test_string_variable_full_lifecycle() {
    let bridge = fixture();
    let obj = bridge.runtime().new_native(TextCell { text: b"abc".to_vec() });

    bridge.declare("zembedX", VariableKind::String, obj).unwrap();
    assert_eq!(bridge.runtime().refcount(obj), 2);

    {
        let table = bridge.host().table.borrow();
        assert_eq!(table.ops("zembedX").unwrap().kind(), ParamKind::Scalar);
        assert_eq!(table.get("zembedX"), Some(HostValue::Scalar(MetaStr::from("abc"))));
        table
            .set("zembedX", HostValue::Scalar(MetaStr::from("next")))
            .unwrap();
        assert_eq!(table.get("zembedX"), Some(HostValue::Scalar(MetaStr::from("next"))));
    }

    bridge.host().table.borrow_mut().unset("zembedX").unwrap();
    assert_eq!(bridge.runtime().refcount(obj), 1);
    assert_eq!(bridge.descriptor_count(), 0);
    assert!(bridge.host().drain_diagnostics().is_empty());
}

#[test]
fn test_declaration_validation_leaves_no_trace() {
    let bridge = fixture();
    let obj = bridge.runtime().new_bytes(b"v");
    let live_before = bridge.runtime().live_objects();

    for name in ["zembed", "plain", "zembed-x", "1zembed"] {
        assert!(matches!(
            bridge.declare(name, VariableKind::String, obj),
            Err(BridgeError::NameInvalid)
        ));
    }
    assert!(matches!(
        bridge.declare("zembedN", VariableKind::Integer, obj),
        Err(BridgeError::WrongProtocol(_))
    ));

    assert_eq!(bridge.runtime().live_objects(), live_before);
    assert_eq!(bridge.runtime().refcount(obj), 1);
    assert_eq!(bridge.descriptor_count(), 0);
    assert!(bridge.host().table.borrow().is_empty());
}

#[test]
fn test_prefix_is_case_insensitive() {
    let bridge = fixture();
    let obj = bridge.runtime().new_bytes(b"v");
    bridge.declare("ZEMBEDUP", VariableKind::String, obj).unwrap();
    bridge.declare("ZeMbEd_mixed", VariableKind::String, obj).unwrap();
    assert_eq!(bridge.descriptor_count(), 2);
}

#[test]
fn test_map_variable_proxies_without_copying() {
    let bridge = fixture();
    let dict = bridge.runtime().new_dict();
    bridge.declare("zembedM", VariableKind::Map, dict).unwrap();

    // Host write, foreign read
    bridge
        .host()
        .table
        .borrow()
        .set(
            "zembedM",
            HostValue::Map(vec![
                (MetaStr::from("a"), MetaStr::from("1")),
                (MetaStr::from("b"), MetaStr::from("2")),
            ]),
        )
        .unwrap();
    assert_eq!(bridge.runtime().dict_len(dict).unwrap(), 2);

    // Foreign write, host read, no host-side refresh step in between
    let value = bridge.runtime().new_bytes(b"3");
    bridge.runtime().set_item(dict, b"c", value).unwrap();
    bridge.runtime().decref(value);
    assert_eq!(
        bridge.host().table.borrow().get("zembedM"),
        Some(HostValue::Map(vec![
            (MetaStr::from("a"), MetaStr::from("1")),
            (MetaStr::from("b"), MetaStr::from("2")),
            (MetaStr::from("c"), MetaStr::from("3")),
        ]))
    );
}

#[test]
fn test_fork_resyncs_exactly_once_per_generation() {
    let bridge = fixture();
    let obj = bridge.runtime().new_int(5);
    bridge.declare("zembedI", VariableKind::Integer, obj).unwrap();

    bridge.host().fork();
    // The first boundary crossing after the fork resynchronizes
    assert_eq!(bridge.host().table.borrow().get("zembedI"), Some(HostValue::Integer(5)));
    assert_eq!(bridge.runtime().fork_resets(), 1);

    // Later crossings in the same generation do not
    let _ = bridge.host().table.borrow().get("zembedI");
    bridge.with_session(|_| {});
    assert_eq!(bridge.runtime().fork_resets(), 1);

    bridge.host().fork();
    bridge.host().fork();
    let _ = bridge.host().table.borrow().get("zembedI");
    assert_eq!(bridge.runtime().fork_resets(), 2);
}

#[test]
fn test_session_flushes_foreign_output_to_the_host() {
    let bridge = fixture();
    bridge.with_session(|rt| rt.write_output(b"printed\n"));
    assert_eq!(bridge.host().take_output(), b"printed\n");
}

#[test]
fn test_marshal_round_trip_through_a_foreign_object() {
    let bridge = fixture();
    bridge
        .host()
        .table
        .borrow_mut()
        .define(
            "SRC",
            host_params::PlainParam::new(HostValue::Array(vec![
                MetaStr::from("one"),
                MetaStr::from("two"),
            ])),
        )
        .unwrap();

    let handle = marshal::param_to_foreign(&bridge, "SRC").unwrap();
    marshal::set_param_from_foreign(&bridge, "DST", handle.get()).unwrap();

    assert_eq!(
        bridge.host().table.borrow().get("DST"),
        Some(HostValue::Array(vec![MetaStr::from("one"), MetaStr::from("two")]))
    );
}

#[test]
fn test_reserved_bytes_round_trip_across_the_boundary() {
    let bridge = fixture();
    let raw = vec![b'a', META, 0u8, b'z'];
    let obj = bridge.runtime().new_bytes(&raw);
    bridge.declare("zembedS", VariableKind::String, obj).unwrap();

    let value = bridge.host().table.borrow().get("zembedS").unwrap();
    let HostValue::Scalar(scalar) = value else {
        panic!("string variable must read as a scalar");
    };
    // Metafied on the host side, identical bytes when unmetafied
    assert!(scalar.as_bytes().len() > raw.len());
    assert_eq!(scalar.plain(), raw);
}

#[test]
fn test_teardown_returns_the_heap_to_baseline() {
    let bridge = fixture();
    let rt = Rc::clone(bridge.runtime());
    let baseline = rt.live_objects();

    let s = rt.new_bytes(b"s");
    let dict = rt.new_dict();
    let item = rt.new_bytes(b"i");
    let list = rt.new_list(&[item]);
    bridge.declare("zembedS", VariableKind::String, s).unwrap();
    bridge.declare("zembedM", VariableKind::Map, dict).unwrap();
    bridge.declare("zembedA", VariableKind::Array, list).unwrap();
    rt.decref(s);
    rt.decref(dict);
    rt.decref(item);
    rt.decref(list);

    bridge.teardown();

    assert_eq!(bridge.descriptor_count(), 0);
    assert_eq!(rt.live_objects(), baseline);
    assert!(bridge.host().table.borrow().is_empty());
}

#[test]
fn test_capture_conflict_surfaces_as_an_error() {
    let bridge = fixture();
    bridge
        .host()
        .table
        .borrow_mut()
        .define(
            "M",
            host_params::PlainParam::new(HostValue::Map(vec![(
                MetaStr::from("k"),
                MetaStr::from("v"),
            )])),
        )
        .unwrap();

    let dict = bridge.runtime().new_dict();
    let guard = bridge.begin_capture(dict).unwrap();
    assert!(matches!(
        marshal::param_to_foreign(&bridge, "M"),
        Err(BridgeError::ScanConflict)
    ));
    drop(guard);

    // With the slot free the capture succeeds
    let handle = marshal::param_to_foreign(&bridge, "M").unwrap();
    assert_eq!(bridge.runtime().dict_len(handle.get()).unwrap(), 1);
}
