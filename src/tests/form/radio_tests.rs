use serde_json::{Value, json};

use crate::form::{FieldConfig, FormHandle, NodeId};

fn sizes(form: &FormHandle) -> Vec<NodeId> {
    form.update(|tree| {
        ["s", "m", "l"]
            .into_iter()
            .map(|size| {
                tree.add_field(
                    None,
                    FieldConfig::new(format!("size-{size}"))
                        .with_input_name(Some("size".into()))
                        .radio("size", json!(size)),
                )
            })
            .collect::<Result<Vec<_>, _>>()
    })
    .unwrap()
}

#[test]
fn checking_a_member_clears_its_siblings() {
    let form = FormHandle::default();
    let ids = sizes(&form);

    assert!(form.update(|tree| tree.check(ids[1])));
    assert_eq!(Value::Object(form.get_values()), json!({"size": "m"}));

    form.update(|tree| tree.check(ids[2]));
    assert!(form.get_value(ids[1]).is_null());
    assert_eq!(form.read(|tree| tree.checked_in_group("size")), Some(ids[2]));
    assert_eq!(Value::Object(form.get_values()), json!({"size": "l"}));
}

#[test]
fn removed_members_leave_the_group() {
    let form = FormHandle::default();
    let ids = sizes(&form);
    form.update(|tree| tree.check(ids[0]));
    form.remove(ids[0]);
    assert_eq!(form.read(|tree| tree.checked_in_group("size")), None);
    assert_eq!(form.read(|tree| tree.groups.members("size").len()), 2);
}

#[test]
fn plain_fields_cannot_be_checked() {
    let form = FormHandle::default();
    let id = form
        .update(|tree| tree.add_field(None, FieldConfig::new("plain")))
        .unwrap();
    assert!(!form.update(|tree| tree.check(id)));
}
