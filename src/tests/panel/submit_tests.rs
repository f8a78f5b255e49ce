use std::{cell::RefCell, rc::Rc, time::Duration};

use futures::executor::block_on;
use indexmap::IndexMap;
use serde_json::{Value, json};

use super::account_panel;
use crate::form::{FieldConfig, FieldContext, FormEvent, FormHandle, SharedValidator, Validity};
use crate::panel::{FormPanel, FormRequest, PostOptions, Response, StaticTransport};

#[test]
fn submit_while_loading_refuses_without_posting() {
    let transport = Rc::new(StaticTransport::new());
    let panel = account_panel(transport.clone());
    let log = panel.form().event_log();
    panel.set_loading("grid", true, Some("Fetching grid".into()));

    let response = block_on(panel.submit(&FormRequest::new("/save"))).unwrap();

    assert!(!response.success);
    assert!(transport.posted().is_empty());
    assert_eq!(
        log.borrow().last(),
        Some(&FormEvent::Notice(
            "Please wait for the current request to finish".into()
        ))
    );
    assert!(
        !log.borrow()
            .iter()
            .any(|event| matches!(event, FormEvent::Submit { .. }))
    );
}

#[test]
fn is_valid_while_loading_leaves_fields_untouched() {
    let panel = account_panel(Rc::new(StaticTransport::new()));
    let email = panel.form().field_by_name("email").unwrap();
    panel.set_loading("panel", true, None);

    assert!(!block_on(panel.is_valid()));
    assert!(!panel.form().has_error(email));
}

#[test]
fn invalid_form_scrolls_instead_of_posting() {
    let transport = Rc::new(StaticTransport::new());
    let panel = account_panel(transport.clone());
    let email = panel.form().field_by_name("email").unwrap();
    let log = panel.form().event_log();

    let response = block_on(panel.submit(&FormRequest::new("/save"))).unwrap();

    assert!(!response.success);
    assert!(transport.posted().is_empty());
    assert!(log.borrow().contains(&FormEvent::ScrollTo(email)));
    assert!(!panel.is_loading());
}

#[test]
fn valid_form_posts_collected_values() {
    let transport = Rc::new(StaticTransport::new());
    let panel = account_panel(transport.clone());
    let form = panel.form().clone();
    let email = form.field_by_name("email").unwrap();
    let role = form.field_by_name("role").unwrap();
    block_on(form.set_value(email, json!("a@b.c"), false));
    block_on(form.set_value(role, json!("dev"), false));
    let log = form.event_log();

    let request = FormRequest::new("/save")
        .with_param("mode", json!("full"))
        .with_message("Saving...");
    let response = block_on(panel.submit(&request)).unwrap();

    assert!(response.success);
    let posted = transport.posted();
    assert_eq!(posted.len(), 1);
    assert_eq!(posted[0].url, "/save");
    assert_eq!(posted[0].data, json!({"email": "a@b.c", "role": "dev"}));
    assert_eq!(posted[0].params.get("mode"), Some(&json!("full")));

    let log = log.borrow();
    assert!(log.contains(&FormEvent::Loading {
        busy: true,
        message: Some("Saving...".into()),
    }));
    assert!(log.contains(&FormEvent::Loading {
        busy: false,
        message: None,
    }));
    assert_eq!(
        log.last(),
        Some(&FormEvent::Submit {
            response: Some(Response::ok(None)),
        })
    );
    assert!(!panel.is_loading());
}

#[test]
fn server_errors_land_on_named_fields() {
    let transport = Rc::new(StaticTransport::new());
    let panel = account_panel(transport.clone());
    let form = panel.form().clone();
    let email = form.field_by_name("email").unwrap();
    let role = form.field_by_name("role").unwrap();
    block_on(form.set_value(email, json!("taken@b.c"), false));

    let mut errors = IndexMap::new();
    errors.insert("email".to_string(), "Already taken".to_string());
    errors.insert("nickname".to_string(), "Unknown".to_string());
    transport.reply_to_posts(Response::with_errors(errors));
    let log = form.event_log();

    let response = block_on(panel.submit(&FormRequest::new("/save"))).unwrap();

    assert!(!response.success);
    assert!(form.has_error(email));
    assert!(!form.has_error(role));
    assert_eq!(form.read(|tree| tree.help_text(role).map(str::to_string)), None);
    assert_eq!(
        form.read(|tree| tree.help_text(email).map(str::to_string)),
        Some("Already taken".to_string())
    );
    assert_eq!(form.first_error_field(), Some(email));
    assert!(log.borrow().contains(&FormEvent::ScrollTo(email)));
    assert!(matches!(
        log.borrow().last(),
        Some(FormEvent::Submit { response: Some(response) }) if !response.success
    ));
}

#[test]
fn post_options_reach_the_transport() {
    let transport = Rc::new(StaticTransport::new());
    let panel = account_panel(transport.clone())
        .with_post_options(PostOptions::default().with_header("X-Token", "abc"));
    let email = panel.form().field_by_name("email").unwrap();
    block_on(panel.form().set_value(email, json!("a@b.c"), false));

    assert!(block_on(panel.submit(&FormRequest::new("/save"))).unwrap().success);

    let posted = transport.posted();
    assert_eq!(
        posted[0].headers.get("X-Token").map(String::as_str),
        Some("abc")
    );
}

type Settled = Rc<RefCell<Vec<String>>>;

/// Three fields whose validators settle after different delays.
fn timed_form(delays: [(&'static str, u64, bool); 3]) -> (FormHandle, Settled) {
    let settled = Rc::new(RefCell::new(Vec::new()));
    let form = FormHandle::default();
    for (name, delay, valid) in delays {
        let settled = Rc::clone(&settled);
        let validator: SharedValidator = Rc::new(move |_value: Value, field: FieldContext| {
            let settled = Rc::clone(&settled);
            async move {
                tokio::time::sleep(Duration::from_millis(delay)).await;
                settled.borrow_mut().push(field.name);
                Validity::from(valid)
            }
        });
        form.update(|tree| tree.add_field(None, FieldConfig::new(name).with_validator(validator)))
            .unwrap();
    }
    (form, settled)
}

#[tokio::test]
async fn panel_is_valid_waits_for_the_slowest_validator() {
    for delays in [
        [("first", 30, true), ("second", 5, false), ("third", 15, true)],
        [("first", 5, true), ("second", 30, false), ("third", 15, true)],
        [("first", 15, true), ("second", 5, true), ("third", 30, true)],
    ] {
        let expected = delays.iter().all(|(_, _, valid)| *valid);
        let (form, settled) = timed_form(delays);
        let panel = FormPanel::new(form, Rc::new(StaticTransport::new()));
        let started = tokio::time::Instant::now();

        assert_eq!(panel.is_valid().await, expected);

        assert!(started.elapsed() >= Duration::from_millis(30));
        assert_eq!(settled.borrow().len(), 3);
        let second = panel.form().field_by_name("second").unwrap();
        assert_eq!(panel.form().has_error(second), !delays[1].2);
    }
}

#[tokio::test]
async fn overlapping_submit_is_refused_while_validating() {
    let (form, _settled) =
        timed_form([("first", 10, true), ("second", 5, true), ("third", 1, true)]);
    let transport = Rc::new(StaticTransport::new());
    let panel = FormPanel::new(form, transport.clone());
    let request = FormRequest::new("/save");

    let (first, second) = futures::join!(panel.submit(&request), panel.submit(&request));

    assert!(first.unwrap().success);
    assert!(!second.unwrap().success);
    assert_eq!(transport.posted().len(), 1);
    assert!(!panel.is_loading());
}
