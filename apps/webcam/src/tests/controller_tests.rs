use mvc::Document;
use serde_json::json;

use super::*;
use crate::{
    media::{SyntheticCamera, UnavailableMediaCapture},
    test_support::{active_mvc, data_fetch, sepia_filters},
};

fn click(document: &Document, node: mvc::NodeId) {
    document.dispatch_event(node, "click").expect("click");
}

#[tokio::test]
async fn sepia_click_applies_filter_and_unknown_is_ignored() {
    let (mvc, document) = active_mvc(
        data_fetch(json!(1)),
        sepia_filters(),
        Arc::new(UnavailableMediaCapture),
    )
    .await;
    let view = mvc.view();

    click(&document, view.filter_button("Sepia").expect("sepia"));
    assert_eq!(mvc.dispatch_pending().await.expect("dispatch"), 1);
    assert_eq!(view.visual_filter(), "sepia(400%)");
    let video = view.video().expect("video");
    assert_eq!(
        document.style(video, "-webkit-filter").as_deref(),
        Some("sepia(400%)")
    );

    mvc.submit(Intent::FilterChosen("Unknown".into()));
    assert_eq!(mvc.dispatch_pending().await.expect("dispatch"), 1);
    assert_eq!(view.visual_filter(), "sepia(400%)");
    assert_eq!(
        mvc.controller().last_filter().map(|f| f.name),
        Some("Sepia".to_string())
    );
}

#[tokio::test]
async fn reset_clears_the_filter() {
    let (mvc, _) = active_mvc(
        data_fetch(json!(1)),
        sepia_filters(),
        Arc::new(UnavailableMediaCapture),
    )
    .await;
    let controller = mvc.controller();

    assert!(controller.filter_chosen("Sepia").expect("sepia"));
    assert!(controller.filter_chosen("Reset").expect("reset"));
    assert_eq!(mvc.view().visual_filter(), "");
    assert!(!controller.filter_chosen("sepia").expect("names are case sensitive"));
}

#[tokio::test]
async fn capture_then_photo_through_intents() {
    let (mvc, document) = active_mvc(
        data_fetch(json!(1)),
        sepia_filters(),
        Arc::new(SyntheticCamera::new()),
    )
    .await;
    let view = mvc.view();

    click(&document, view.camera_button().expect("camera"));
    click(&document, view.filter_button("Sepia").expect("sepia"));
    click(&document, view.photo_button().expect("photo"));
    assert_eq!(mvc.dispatch_pending().await.expect("dispatch"), 3);

    let snapshots = view.snapshots();
    assert_eq!(snapshots.len(), 1);
    assert_eq!(
        document.style(snapshots[0], "filter").as_deref(),
        Some("sepia(400%)")
    );
    assert!(view.stream().is_some());
}

#[tokio::test]
async fn capture_failure_does_not_fail_dispatch() {
    let (mvc, _) = active_mvc(
        data_fetch(json!(1)),
        sepia_filters(),
        Arc::new(UnavailableMediaCapture),
    )
    .await;

    mvc.dispatch(Intent::CaptureStartRequested)
        .await
        .expect("logged only");
    assert!(mvc.view().stream().is_none());
}

#[tokio::test]
async fn controller_outside_a_container_is_detached() {
    let controller = CameraController::new();
    let err = controller.filter_chosen("Sepia").expect_err("detached");
    assert!(err.to_string().contains("not bound"));
}

#[test]
fn find_filter_matches_exact_names() {
    let filters = sepia_filters();
    assert_eq!(
        find_filter(&filters, "Sepia").map(|f| f.filter.as_str()),
        Some("sepia(400%)")
    );
    assert!(find_filter(&filters, "Unknown").is_none());
    assert!(find_filter(&[], "Reset").is_none());
}
