use uuid::Uuid;
use whatevers_core::{Entity, Whatever};

#[test]
fn test_whatever_is_an_entity() {
    let id = Uuid::new_v4();
    let w = Whatever::with_id(id, "gizmo", Some("a gizmo".to_string())).unwrap();

    assert_eq!(w.id(), id);
    assert_eq!(Whatever::COLLECTION, "whatevers");
    assert_eq!(w.description.as_deref(), Some("a gizmo"));
}

#[test]
fn test_whatever_serialization_keeps_id() {
    let w = Whatever::new("gizmo", None).unwrap();
    let json = serde_json::to_value(&w).unwrap();

    assert_eq!(json["id"], serde_json::json!(w.id().to_string()));
    assert_eq!(json["name"], "gizmo");
    assert!(json["description"].is_null());

    let back: Whatever = serde_json::from_value(json).unwrap();
    assert_eq!(back, w);
}

#[test]
fn test_rename_keeps_id_and_bumps_updated_at() {
    let mut w = Whatever::new("gizmo", None).unwrap();
    let id = w.id();
    let before = w.updated_at;

    w.rename("gadget").unwrap();

    assert_eq!(w.id(), id);
    assert_eq!(w.name, "gadget");
    assert!(w.updated_at >= before);
    assert!(w.rename("").is_err());
    assert_eq!(w.name, "gadget");
}
