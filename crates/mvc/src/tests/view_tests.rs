use super::*;

use std::sync::atomic::{AtomicUsize, Ordering};

use crate::dom::{Event, Listener};

fn initialized_view() -> (Arc<Document>, ViewBase, NodeId) {
    let doc = Arc::new(Document::new());
    let base = ViewBase::new(Arc::clone(&doc));
    let stage = base.initialize().expect("initialize");
    (doc, base, stage)
}

fn counting(counter: &Arc<AtomicUsize>) -> Listener {
    let counter = Arc::clone(counter);
    Arc::new(move |_: &Event| {
        counter.fetch_add(1, Ordering::SeqCst);
    })
}

#[test]
fn attach_requires_initialize() {
    let doc = Arc::new(Document::new());
    let base = ViewBase::new(Arc::clone(&doc));
    assert_eq!(base.state(), ViewState::Constructed);
    assert_eq!(base.attach(doc.body()), Err(LifecycleError::NotInitialized));
}

#[test]
fn initialize_twice_is_rejected() {
    let (_doc, base, _stage) = initialized_view();
    assert_eq!(base.initialize(), Err(LifecycleError::AlreadyInitialized));
}

#[test]
fn attach_places_stage_under_host_exactly_once() {
    let (doc, base, stage) = initialized_view();
    base.attach(doc.body()).expect("attach");

    assert_eq!(base.state(), ViewState::Attached);
    assert_eq!(base.host(), Some(doc.body()));
    let occurrences = doc
        .children(doc.body())
        .into_iter()
        .filter(|child| *child == stage)
        .count();
    assert_eq!(occurrences, 1);
    assert!(doc.contains(doc.body(), stage));

    assert_eq!(
        base.attach(doc.body()),
        Err(LifecycleError::AlreadyAttached(doc.body()))
    );
    assert_eq!(doc.children(doc.body()).len(), 1);
}

#[test]
fn activate_requires_attach() {
    let (_doc, base, _stage) = initialized_view();
    let result = base.activate(|_, _| Ok(()));
    assert_eq!(result, Err(LifecycleError::NotAttached));
}

#[test]
fn deactivate_removes_exactly_what_activate_registered() {
    let (doc, base, stage) = initialized_view();
    base.attach(doc.body()).expect("attach");

    let foreign = Arc::new(AtomicUsize::new(0));
    doc.add_event_listener(stage, "click", counting(&foreign))
        .expect("foreign listener");

    let ours = Arc::new(AtomicUsize::new(0));
    let registered = base
        .activate(|doc, listeners| {
            listeners.add(doc, stage, "click", counting(&ours))?;
            listeners.add(doc, stage, "keydown", counting(&ours))?;
            Ok(())
        })
        .expect("activate");
    assert_eq!(registered, 2);
    assert_eq!(base.state(), ViewState::Active);
    assert_eq!(
        base.activate(|_, _| Ok(())),
        Err(LifecycleError::AlreadyActive)
    );

    assert_eq!(base.deactivate(), 2);
    assert_eq!(base.state(), ViewState::Inactive);
    assert_eq!(doc.listener_count_for(stage), 1);

    doc.dispatch_event(stage, "click").expect("dispatch");
    assert_eq!(ours.load(Ordering::SeqCst), 0);
    assert_eq!(foreign.load(Ordering::SeqCst), 1);
    assert!(doc.contains(doc.body(), stage));
}

#[test]
fn failed_activation_releases_partial_registrations() {
    let (doc, base, stage) = initialized_view();
    base.attach(doc.body()).expect("attach");

    let result = base.activate(|doc, listeners| {
        listeners.add(doc, stage, "click", Arc::new(|_: &Event| {}))?;
        listeners.add(doc, NodeId(9_999), "click", Arc::new(|_: &Event| {}))?;
        Ok(())
    });

    assert_eq!(
        result,
        Err(LifecycleError::Dom(DomError::UnknownNode(NodeId(9_999))))
    );
    assert_eq!(base.state(), ViewState::Attached);
    assert_eq!(doc.listener_count(), 0);
}

#[test]
fn view_can_be_reactivated_after_deactivate() {
    let (doc, base, stage) = initialized_view();
    base.attach(doc.body()).expect("attach");
    let hits = Arc::new(AtomicUsize::new(0));

    base.activate(|doc, listeners| {
        listeners.add(doc, stage, "click", counting(&hits))?;
        Ok(())
    })
    .expect("first activate");
    base.deactivate();
    assert_eq!(base.deactivate(), 0);

    base.activate(|doc, listeners| {
        listeners.add(doc, stage, "click", counting(&hits))?;
        Ok(())
    })
    .expect("second activate");
    doc.dispatch_event(stage, "click").expect("dispatch");
    assert_eq!(hits.load(Ordering::SeqCst), 1);
}
