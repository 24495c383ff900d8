use std::sync::atomic::{AtomicU64, Ordering};

use serde_json::json;

use super::*;
use crate::{
    media::{Frame, MediaError, SyntheticCamera, UnavailableMediaCapture},
    test_support::{active_mvc, data_fetch, detached_mvc, sepia_filters, StaticFetch},
};

fn no_camera() -> Arc<dyn MediaCapture> {
    Arc::new(UnavailableMediaCapture)
}

#[tokio::test]
async fn builds_the_element_tree_under_the_stage() {
    let (mvc, document) = detached_mvc(data_fetch(json!(1)), sepia_filters(), no_camera());
    mvc.initialize().await.expect("initialize");
    let view = mvc.view();

    let stage = view.stage().expect("stage");
    let children = document.children(stage);
    let tags: Vec<_> = children
        .iter()
        .filter_map(|node| document.tag(*node))
        .collect();
    assert_eq!(tags, ["video", "canvas", "button", "button", "div"]);

    let video = view.video().expect("video");
    assert_eq!(document.class_name(video).as_deref(), Some("Video"));
    assert_eq!(document.attribute(video, "width").as_deref(), Some("400"));
    assert_eq!(document.attribute(video, "height").as_deref(), Some("300"));
    assert_eq!(document.style(video, "margin").as_deref(), Some("20px"));

    let camera = view.camera_button().expect("camera");
    assert_eq!(document.text(camera).as_deref(), Some("Camera"));
    let photo = view.photo_button().expect("photo");
    assert_eq!(document.text(photo).as_deref(), Some("Take Photo"));

    let sepia = view.filter_button("Sepia").expect("sepia button");
    assert_eq!(document.text(sepia).as_deref(), Some("Sepia"));
    assert_eq!(document.class_name(sepia).as_deref(), Some("Btnf"));
    assert_eq!(document.parent(sepia), view.filter_bar().ok());
    assert!(view.filter_button("Blur").is_none());

    // built but not yet on screen
    assert!(!document.contains(document.body(), stage));
    assert_eq!(view.state(), ViewState::Initialized);
}

#[tokio::test]
async fn failed_model_leaves_view_unbuilt() {
    let (mvc, _) = detached_mvc(Arc::new(StaticFetch::new()), sepia_filters(), no_camera());
    assert!(mvc.initialize().await.is_err());

    assert_eq!(mvc.view().state(), ViewState::Constructed);
    assert_eq!(mvc.view().video(), Err(LifecycleError::NotInitialized));
}

#[tokio::test]
async fn attaches_exactly_once() {
    let (mvc, document) = detached_mvc(data_fetch(json!(1)), sepia_filters(), no_camera());
    let body = document.body();
    assert_eq!(mvc.view().attach(body), Err(LifecycleError::NotInitialized));

    mvc.initialize().await.expect("initialize");
    mvc.view().attach(body).expect("attach");
    let stage = mvc.view().stage().expect("stage");
    assert_eq!(document.children(body), vec![stage]);

    let other = document.create_element("section");
    document.append_child(body, other).expect("append");
    assert_eq!(
        mvc.view().attach(other),
        Err(LifecycleError::AlreadyAttached(body))
    );
    assert_eq!(document.parent(stage), Some(body));
}

#[tokio::test]
async fn activation_cycle_leaves_no_listeners_behind() {
    let (mvc, document) = active_mvc(data_fetch(json!(1)), sepia_filters(), no_camera()).await;
    let view = mvc.view();
    assert_eq!(document.listener_count(), 3);
    assert_eq!(view.state(), ViewState::Active);

    view.deactivate();
    assert_eq!(document.listener_count(), 0);
    assert_eq!(view.state(), ViewState::Inactive);

    let sepia = view.filter_button("Sepia").expect("sepia");
    assert_eq!(document.dispatch_event(sepia, "click"), Ok(0));
    let photo = view.photo_button().expect("photo");
    assert_eq!(document.dispatch_event(photo, "click"), Ok(0));
    assert_eq!(mvc.dispatch_pending().await.expect("drain"), 0);

    view.activate().expect("reactivate");
    assert_eq!(document.listener_count(), 3);
    view.deactivate();
    view.deactivate();
    assert_eq!(document.listener_count(), 0);
}

#[tokio::test]
async fn clicks_become_intents() {
    let (mvc, document) = active_mvc(data_fetch(json!(1)), sepia_filters(), no_camera()).await;
    let view = mvc.view();

    document
        .dispatch_event(view.filter_button("Sepia").expect("sepia"), "click")
        .expect("click");
    document
        .dispatch_event(view.camera_button().expect("camera"), "click")
        .expect("click");
    // clicks on the bar itself, outside any button, are not filter choices
    document
        .dispatch_event(view.filter_bar().expect("bar"), "click")
        .expect("click");

    assert_eq!(
        mvc.next_intent().await,
        Some(Intent::FilterChosen("Sepia".into()))
    );
    assert_eq!(mvc.next_intent().await, Some(Intent::CaptureStartRequested));
    assert_eq!(mvc.dispatch_pending().await.expect("drain"), 0);
}

#[tokio::test]
async fn capture_routes_stream_into_video() {
    let (mvc, document) = active_mvc(
        data_fetch(json!(1)),
        sepia_filters(),
        Arc::new(SyntheticCamera::new()),
    )
    .await;
    let view = mvc.view();

    view.update_video().await.expect("update video");
    let video = view.video().expect("video");
    let stream = view.stream().expect("stream");
    assert_eq!(
        document.attribute(video, "src-object"),
        Some(stream.id.clone())
    );
    assert_eq!(
        document.attribute(video, "data-playing").as_deref(),
        Some("true")
    );
    assert_eq!((stream.width, stream.height), (1920, 1080));
}

#[tokio::test]
async fn capture_failure_is_contained() {
    let (mvc, document) = active_mvc(data_fetch(json!(1)), sepia_filters(), no_camera()).await;
    let view = mvc.view();
    let camera = view.camera_button().expect("camera");

    view.update_video().await.expect("failure is logged, not returned");
    let video = view.video().expect("video");
    assert!(document.attribute(video, "src-object").is_none());
    assert!(view.stream().is_none());

    // button still live for a retry
    assert_eq!(document.dispatch_event(camera, "click"), Ok(1));
    assert_eq!(mvc.next_intent().await, Some(Intent::CaptureStartRequested));
}

#[tokio::test]
async fn photo_carries_the_current_filter() {
    let (mvc, document) = active_mvc(
        data_fetch(json!(1)),
        sepia_filters(),
        Arc::new(SyntheticCamera::new()),
    )
    .await;
    let view = mvc.view();
    view.update_video().await.expect("video");
    view.update_filter(&FilterDescriptor::new("Sepia", "sepia(400%)"))
        .expect("filter");

    let image = view.save_photo().await.expect("photo");
    let canvas = view.canvas().expect("canvas");

    assert_eq!(document.parent(image), Some(canvas));
    assert_eq!(document.tag(image).as_deref(), Some("img"));
    let src = document.attribute(image, "src").expect("src");
    assert!(src.starts_with("data:image/x-portable-pixmap;base64,"));
    assert_eq!(document.attribute(canvas, "data-frame"), Some(src));
    for node in [image, canvas] {
        assert_eq!(document.style(node, "filter").as_deref(), Some("sepia(400%)"));
        assert_eq!(
            document.style(node, "-webkit-filter").as_deref(),
            Some("sepia(400%)")
        );
    }
    let taken_at = document.attribute(image, "data-taken-at").expect("timestamp");
    assert!(chrono::DateTime::parse_from_rfc3339(&taken_at).is_ok());
    assert_eq!(view.snapshots(), vec![image]);
}

#[tokio::test]
async fn photo_without_stream_is_blank() {
    let (mvc, document) = active_mvc(data_fetch(json!(1)), sepia_filters(), no_camera()).await;
    let view = mvc.view();

    let first = view.save_photo().await.expect("photo");
    let second = view.save_photo().await.expect("photo");
    assert_eq!(document.attribute(first, "src").as_deref(), Some("data:,"));
    assert_eq!(view.snapshots(), vec![first, second]);
    assert_eq!(
        document.children(view.canvas().expect("canvas")),
        vec![first, second]
    );
}

/// Streams open fine, but only the first one ever loads its metadata.
#[derive(Default)]
struct FirstStreamOnlyCamera {
    opened: AtomicU64,
}

#[async_trait]
impl MediaCapture for FirstStreamOnlyCamera {
    async fn open(&self, _constraints: MediaConstraints) -> Result<MediaStream, MediaError> {
        let n = self.opened.fetch_add(1, Ordering::SeqCst);
        Ok(MediaStream {
            id: format!("s{n}"),
            width: 640,
            height: 480,
        })
    }

    async fn metadata_loaded(&self, stream: &MediaStream) -> Result<(), MediaError> {
        if stream.id == "s0" {
            Ok(())
        } else {
            Err(MediaError::Ended(stream.id.clone()))
        }
    }

    async fn capture_frame(&self, stream: &MediaStream) -> Result<Frame, MediaError> {
        Err(MediaError::Ended(stream.id.clone()))
    }
}

#[tokio::test]
async fn stream_that_never_loads_is_not_marked_playing() {
    let (mvc, document) = active_mvc(
        data_fetch(json!(1)),
        sepia_filters(),
        Arc::new(FirstStreamOnlyCamera::default()),
    )
    .await;
    let view = mvc.view();
    let video = view.video().expect("video");

    view.update_video().await.expect("first capture");
    assert_eq!(document.attribute(video, "src-object").as_deref(), Some("s0"));
    assert_eq!(document.attribute(video, "data-playing").as_deref(), Some("true"));

    view.update_video().await.expect("metadata failure is logged");
    assert_eq!(document.attribute(video, "src-object").as_deref(), Some("s1"));
    assert_eq!(
        document.attribute(video, "data-playing").as_deref(),
        Some("false")
    );
    assert_eq!(view.stream().map(|stream| stream.id), Some("s1".to_string()));
}
