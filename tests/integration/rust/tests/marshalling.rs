//! Converting ordinary host variables to foreign objects and back.

use integration_tests::bridge_fixture;

use host_params::PlainParam;
use host_types::{HostValue, MetaStr};
use variable_bridge::{marshal, BridgeError};

#[test]
fn test_host_map_captures_into_a_foreign_dict() {
    let bridge = bridge_fixture();
    bridge
        .host()
        .table
        .borrow_mut()
        .define(
            "TABLE",
            PlainParam::new(HostValue::Map(vec![
                (MetaStr::from("x"), MetaStr::from("1")),
                (MetaStr::from("y"), MetaStr::from("2")),
            ])),
        )
        .unwrap();

    let handle = marshal::param_to_foreign(&bridge, "TABLE").unwrap();
    let rt = bridge.runtime();
    assert_eq!(
        rt.mapping_keys(handle.get()).unwrap(),
        vec![b"x".to_vec(), b"y".to_vec()]
    );
    let value = rt.get_item(handle.get(), b"y").unwrap();
    assert_eq!(rt.as_bytes(value).unwrap(), b"2");
    rt.decref(value);
    assert!(!bridge.capture_in_flight());
}

#[test]
fn test_capture_is_a_copy_not_a_view() {
    let bridge = bridge_fixture();
    bridge
        .host()
        .table
        .borrow_mut()
        .define(
            "TABLE",
            PlainParam::new(HostValue::Map(vec![(MetaStr::from("k"), MetaStr::from("v"))])),
        )
        .unwrap();

    let handle = marshal::param_to_foreign(&bridge, "TABLE").unwrap();
    bridge
        .host()
        .table
        .borrow()
        .set("TABLE", HostValue::Map(vec![]))
        .unwrap();
    // The captured dict is unaffected by later host mutation
    assert_eq!(bridge.runtime().dict_len(handle.get()).unwrap(), 1);
}

#[test]
fn test_store_round_trips_every_shape() {
    let bridge = bridge_fixture();

    let cases: Vec<(&str, HostValue)> = vec![
        ("S", HostValue::Scalar(MetaStr::from("text"))),
        ("I", HostValue::Integer(-7)),
        ("F", HostValue::Float(2.5)),
        (
            "A",
            HostValue::Array(vec![MetaStr::from("a"), MetaStr::from("b")]),
        ),
        (
            "M",
            HostValue::Map(vec![(MetaStr::from("k"), MetaStr::from("v"))]),
        ),
    ];
    for (name, value) in &cases {
        let handle = marshal::value_to_foreign(&bridge, value).unwrap();
        marshal::set_param_from_foreign(&bridge, name, handle.get()).unwrap();
    }

    let table = bridge.host().table.borrow();
    for (name, value) in &cases {
        assert_eq!(table.get(name).as_ref(), Some(value), "shape {}", name);
    }
}

#[test]
fn test_store_unit_unsets_and_missing_name_is_fine() {
    let bridge = bridge_fixture();
    bridge
        .host()
        .table
        .borrow_mut()
        .define("V", PlainParam::new(HostValue::Integer(1)))
        .unwrap();

    let none = bridge.runtime().new_none();
    marshal::set_param_from_foreign(&bridge, "V", none).unwrap();
    assert!(!bridge.host().table.borrow().contains("V"));
    marshal::set_param_from_foreign(&bridge, "V", none).unwrap();
}

#[test]
fn test_store_rejects_unconvertible_shapes() {
    let bridge = bridge_fixture();
    let rt = bridge.runtime().clone();

    let nested_item = rt.new_int(1);
    let list = rt.new_list(&[nested_item]);
    assert!(matches!(
        marshal::set_param_from_foreign(&bridge, "A", list),
        Err(BridgeError::Conversion(_))
    ));
    assert!(!bridge.host().table.borrow().contains("A"));

    assert!(matches!(
        marshal::set_param_from_foreign(&bridge, "bad name", list),
        Err(BridgeError::NameInvalid)
    ));
}
