use std::{cell::RefCell, rc::Rc, time::Duration};

use futures::executor::block_on;
use serde_json::{Value, json};

use crate::form::{
    CompositeConfig, FieldConfig, FieldContext, FormEvent, FormHandle, PatternValidator,
    SchemaValidator, SharedValidator, Validator, ValidatorChain, Validity,
};
use crate::options::FormOptions;

#[test]
fn blank_required_field_uses_required_message() {
    let form = FormHandle::default();
    let id = form
        .update(|tree| tree.add_field(None, FieldConfig::new("email").allow_blank(false)))
        .unwrap();

    assert!(!form.has_error(id));
    assert!(!block_on(form.field_is_valid(id)));
    form.read(|tree| {
        let field = tree.field(id).unwrap();
        assert_eq!(
            field.validation_result(),
            &Validity::invalid("This field is required")
        );
        assert!(field.has_error());
        assert_eq!(field.help_text(), Some("This field is required"));
    });
}

#[test]
fn required_message_comes_from_options() {
    let form = FormHandle::with_options(FormOptions::default().with_required_message("Fill me"));
    let id = form
        .update(|tree| tree.add_field(None, FieldConfig::new("x").allow_blank(false)))
        .unwrap();
    assert_eq!(block_on(form.validate(id)), Validity::invalid("Fill me"));
}

#[test]
fn has_error_reads_the_cache_without_revalidating() {
    let form = FormHandle::default();
    let id = form
        .update(|tree| tree.add_field(None, FieldConfig::new("x").allow_blank(false)))
        .unwrap();
    block_on(form.field_is_valid(id));
    block_on(form.set_value(id, json!("filled"), false));
    assert!(form.has_error(id));
    assert!(block_on(form.field_is_valid(id)));
    assert!(!form.has_error(id));
}

#[test]
fn disabled_fields_are_valid_without_running_validators() {
    let runs = Rc::new(RefCell::new(0));
    let counter = Rc::clone(&runs);
    let validator: SharedValidator = Rc::new(move |_value: Value, _field: FieldContext| {
        *counter.borrow_mut() += 1;
        async { Validity::invalid("never") }
    });
    let form = FormHandle::default();
    let id = form
        .update(|tree| {
            tree.add_field(
                None,
                FieldConfig::new("x")
                    .allow_blank(false)
                    .disabled(true)
                    .with_validator(validator),
            )
        })
        .unwrap();

    assert!(block_on(form.field_is_valid(id)));
    assert!(block_on(form.validate_all()));
    assert_eq!(*runs.borrow(), 0);
    assert!(!form.read(|tree| tree.field(id).unwrap().error_visible()));
}

#[test]
fn closure_validators_see_value_and_identity() {
    let validator: SharedValidator = Rc::new(|value: Value, field: FieldContext| async move {
        if value == json!("ok") {
            Validity::Valid
        } else {
            Validity::invalid(format!("{} rejected {value}", field.name))
        }
    });
    let form = FormHandle::default();
    let id = form
        .update(|tree| {
            tree.add_field(
                None,
                FieldConfig::new("code")
                    .with_value(json!("no"))
                    .with_validator(validator),
            )
        })
        .unwrap();
    assert_eq!(
        block_on(form.validate(id)),
        Validity::invalid("code rejected \"no\"")
    );
    block_on(form.set_value(id, json!("ok"), false));
    assert!(block_on(form.field_is_valid(id)));
}

#[test]
fn pattern_validator_ignores_empty_values() {
    let validator = PatternValidator::new("^[^@]+@[^@]+$", "Not an email").unwrap();
    let form = FormHandle::default();
    let id = form
        .update(|tree| tree.add_field(None, FieldConfig::new("email")))
        .unwrap();
    let context = FieldContext {
        id,
        name: "email".into(),
        label: None,
    };
    assert!(block_on(validator.validate(json!(""), context.clone())).is_valid());
    assert!(block_on(validator.validate(json!("a@b"), context.clone())).is_valid());
    assert_eq!(
        block_on(validator.validate(json!("nope"), context)),
        Validity::invalid("Not an email")
    );
    assert!(PatternValidator::new("(", "broken").is_err());
}

#[test]
fn chain_reports_first_failure() {
    let schema: SharedValidator =
        Rc::new(SchemaValidator::new(&json!({"type": "integer", "minimum": 1}), None).unwrap());
    let custom: SharedValidator = Rc::new(|_value: Value, _field: FieldContext| async {
        Validity::invalid("custom")
    });
    let chain: SharedValidator = Rc::new(ValidatorChain::new(vec![schema, custom]));
    let form = FormHandle::default();
    let id = form
        .update(|tree| {
            tree.add_field(
                None,
                FieldConfig::new("count")
                    .with_value(json!(0))
                    .with_validator(chain),
            )
        })
        .unwrap();

    let first = block_on(form.validate(id));
    assert!(!first.is_valid());
    assert_ne!(first.message(), Some("custom"));

    block_on(form.set_value(id, json!(5), false));
    assert_eq!(block_on(form.validate(id)), Validity::invalid("custom"));
}

#[test]
fn scroll_targets_first_invalid_field_in_document_order() {
    let form = FormHandle::default();
    let (first, second) = form
        .update(|tree| {
            let set = tree.add_fieldset(None, CompositeConfig::default())?;
            let first = tree.add_field(Some(set), FieldConfig::new("a").with_value(json!("x")))?;
            let second = tree.add_field(Some(set), FieldConfig::new("b").allow_blank(false))?;
            tree.add_field(None, FieldConfig::new("c").allow_blank(false))?;
            Ok::<_, crate::form::DefinitionError>((first, second))
        })
        .unwrap();
    let log = form.event_log();

    assert!(!block_on(form.validate_all()));
    assert_eq!(form.scroll_to_error_field(), Some(second));
    assert!(!form.has_error(first));
    assert_eq!(log.borrow().last(), Some(&FormEvent::ScrollTo(second)));
}

#[test]
fn group_validation_only_covers_its_leaves() {
    let form = FormHandle::default();
    let (group, outside) = form
        .update(|tree| {
            let group = tree.add_container(None, CompositeConfig::labeled("Group"))?;
            tree.add_field(Some(group), FieldConfig::new("inside").with_value(json!(1)))?;
            let outside = tree.add_field(None, FieldConfig::new("outside").allow_blank(false))?;
            Ok::<_, crate::form::DefinitionError>((group, outside))
        })
        .unwrap();
    assert!(block_on(form.is_valid(group)));
    assert!(!form.has_error(outside));
}

#[tokio::test]
async fn validate_all_runs_validators_concurrently() {
    let trace = Rc::new(RefCell::new(Vec::<String>::new()));
    let form = FormHandle::default();
    for (name, delay) in [("slow", 30u64), ("fast", 5)] {
        let trace = Rc::clone(&trace);
        let validator: SharedValidator = Rc::new(move |_value: Value, field: FieldContext| {
            let trace = Rc::clone(&trace);
            async move {
                trace.borrow_mut().push(format!("start {}", field.name));
                tokio::time::sleep(Duration::from_millis(delay)).await;
                trace.borrow_mut().push(format!("end {}", field.name));
                Validity::from(field.name == "fast")
            }
        });
        form.update(|tree| tree.add_field(None, FieldConfig::new(name).with_validator(validator)))
            .unwrap();
    }

    assert!(!form.validate_all().await);
    assert_eq!(
        *trace.borrow(),
        vec!["start slow", "start fast", "end fast", "end slow"]
    );
    let slow = form.field_by_name("slow").unwrap();
    let fast = form.field_by_name("fast").unwrap();
    assert!(form.has_error(slow));
    assert!(!form.has_error(fast));
}
