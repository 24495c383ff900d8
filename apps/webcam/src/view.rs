use std::sync::{Arc, OnceLock, Weak};

use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::Utc;
use mvc::{
    BackRef, Document, DomError, Event, LifecycleError, Listener, ListenerSet, NodeId, View,
    ViewBase, ViewState,
};
use parking_lot::Mutex;
use shared::domain::{FilterDescriptor, MediaConstraints};
use tracing::{debug, info, warn};

use crate::{
    controller::Intent,
    media::{MediaCapture, MediaStream},
    shell::{WebcamMvc, WebcamSlots},
};

const PREVIEW_WIDTH: &str = "400";
const PREVIEW_HEIGHT: &str = "300";
const PREVIEW_MARGIN: &str = "20px";
const FILTER_STYLES: [&str; 2] = ["filter", "-webkit-filter"];

struct ViewElements {
    video: NodeId,
    canvas: NodeId,
    camera_button: NodeId,
    photo_button: NodeId,
    filter_bar: NodeId,
}

/// Video preview, photo canvas, camera and photo buttons and one button per
/// filter, all under the stage created by [`ViewBase`].
pub struct CameraView {
    base: ViewBase,
    media: Arc<dyn MediaCapture>,
    mvc: BackRef<WebcamSlots>,
    elements: OnceLock<ViewElements>,
    stream: Mutex<Option<MediaStream>>,
    snapshots: Mutex<Vec<NodeId>>,
}

impl CameraView {
    pub fn new(document: Arc<Document>, media: Arc<dyn MediaCapture>) -> Self {
        Self {
            base: ViewBase::new(document),
            media,
            mvc: BackRef::default(),
            elements: OnceLock::new(),
            stream: Mutex::new(None),
            snapshots: Mutex::new(Vec::new()),
        }
    }

    pub fn document(&self) -> &Arc<Document> {
        self.base.document()
    }

    pub fn state(&self) -> ViewState {
        self.base.state()
    }

    pub fn stage(&self) -> Result<NodeId, LifecycleError> {
        self.base.stage()
    }

    pub fn video(&self) -> Result<NodeId, LifecycleError> {
        self.elements().map(|el| el.video)
    }

    pub fn canvas(&self) -> Result<NodeId, LifecycleError> {
        self.elements().map(|el| el.canvas)
    }

    pub fn camera_button(&self) -> Result<NodeId, LifecycleError> {
        self.elements().map(|el| el.camera_button)
    }

    pub fn photo_button(&self) -> Result<NodeId, LifecycleError> {
        self.elements().map(|el| el.photo_button)
    }

    pub fn filter_bar(&self) -> Result<NodeId, LifecycleError> {
        self.elements().map(|el| el.filter_bar)
    }

    pub fn filter_button(&self, name: &str) -> Option<NodeId> {
        let bar = self.filter_bar().ok()?;
        let document = self.document();
        document
            .children(bar)
            .into_iter()
            .find(|button| document.id(*button).as_deref() == Some(name))
    }

    /// Snapshot images taken so far, oldest first.
    pub fn snapshots(&self) -> Vec<NodeId> {
        self.snapshots.lock().clone()
    }

    pub fn stream(&self) -> Option<MediaStream> {
        self.stream.lock().clone()
    }

    /// Filter currently applied to the video preview; empty when none is.
    pub fn visual_filter(&self) -> String {
        self.video()
            .ok()
            .and_then(|video| self.document().style(video, "filter"))
            .unwrap_or_default()
    }

    pub fn update_filter(&self, filter: &FilterDescriptor) -> Result<(), LifecycleError> {
        let video = self.video()?;
        set_filter(self.document(), video, &filter.filter)?;
        Ok(())
    }

    /// Asks the capture backend for a stream and routes it into the video
    /// element. The video is marked playing only once the stream's metadata
    /// has loaded. Failures are logged, not returned.
    pub async fn update_video(&self) -> Result<()> {
        let video = self.video()?;
        let stream = match self.media.open(MediaConstraints::default()).await {
            Ok(stream) => stream,
            Err(err) => {
                warn!(error = err.name(), %err, "camera unavailable");
                return Ok(());
            }
        };
        let document = self.document();
        document.set_attribute(video, "src-object", stream.id.clone())?;
        document.set_attribute(video, "data-playing", "false")?;
        *self.stream.lock() = Some(stream.clone());

        match self.media.metadata_loaded(&stream).await {
            Ok(()) => {
                document.set_attribute(video, "data-playing", "true")?;
                info!(stream = %stream.id, width = stream.width, height = stream.height, "video playing");
            }
            Err(err) => warn!(stream = %stream.id, error = err.name(), %err, "video did not start"),
        }
        Ok(())
    }

    /// Draws the current frame into the canvas and keeps a filtered copy of
    /// it as an image under the canvas. Returns the new image.
    pub async fn save_photo(&self) -> Result<NodeId> {
        let elements = self.elements()?;
        let document = self.document();
        let filter = self.visual_filter();

        let stream = self.stream();
        let src = match &stream {
            Some(stream) => self
                .media
                .capture_frame(stream)
                .await
                .with_context(|| format!("failed to capture a frame from {}", stream.id))?
                .data_url(),
            None => {
                debug!("no active stream; taking a blank photo");
                String::from("data:,")
            }
        };

        document.set_attribute(elements.canvas, "data-frame", src.clone())?;
        set_filter(document, elements.canvas, &filter)?;
        let image = document.create_element("img");
        document.set_attribute(image, "src", src)?;
        document.set_attribute(image, "data-taken-at", Utc::now().to_rfc3339())?;
        set_filter(document, image, &filter)?;
        document.append_child(elements.canvas, image)?;

        self.snapshots.lock().push(image);
        info!(%image, %filter, "photo saved");
        Ok(image)
    }

    fn elements(&self) -> Result<&ViewElements, LifecycleError> {
        self.elements.get().ok_or(LifecycleError::NotInitialized)
    }

    fn build(&self, stage: NodeId, filters: &[FilterDescriptor]) -> Result<ViewElements, DomError> {
        let document = self.document();

        let video = document.create_element("video");
        document.append_child(stage, video)?;
        document.set_class_name(video, "Video")?;
        sized(document, video)?;

        let canvas = document.create_element("canvas");
        sized(document, canvas)?;
        document.set_class_name(canvas, "Canvas")?;
        document.append_child(stage, canvas)?;

        let camera_button = button(document, stage, "Camera", "Btn")?;
        let photo_button = button(document, stage, "Take Photo", "Btn")?;

        let filter_bar = document.create_element("div");
        document.set_class_name(filter_bar, "filterButtons")?;
        document.append_child(stage, filter_bar)?;
        for filter in filters {
            let filter_button = button(document, filter_bar, &filter.name, "Btnf")?;
            document.set_id(filter_button, filter.name.clone())?;
        }

        Ok(ViewElements {
            video,
            canvas,
            camera_button,
            photo_button,
            filter_bar,
        })
    }
}

fn sized(document: &Document, node: NodeId) -> Result<(), DomError> {
    document.set_attribute(node, "width", PREVIEW_WIDTH)?;
    document.set_attribute(node, "height", PREVIEW_HEIGHT)?;
    document.set_style(node, "margin", PREVIEW_MARGIN)
}

fn button(document: &Document, parent: NodeId, text: &str, class_name: &str) -> Result<NodeId, DomError> {
    let node = document.create_element("button");
    document.set_text(node, text)?;
    document.set_class_name(node, class_name)?;
    document.append_child(parent, node)?;
    Ok(node)
}

fn set_filter(document: &Document, node: NodeId, filter: &str) -> Result<(), DomError> {
    for property in FILTER_STYLES {
        document.set_style(node, property, filter)?;
    }
    Ok(())
}

/// Listener that turns a DOM event into an intent for the container's
/// controller. Holds the container weakly.
fn intent_listener<F>(mvc: Weak<WebcamMvc>, to_intent: F) -> Listener
where
    F: Fn(&Event) -> Option<Intent> + Send + Sync + 'static,
{
    Arc::new(move |event: &Event| {
        let Some(intent) = to_intent(event) else {
            return;
        };
        match mvc.upgrade() {
            Some(mvc) => mvc.submit(intent),
            None => debug!(?intent, "container gone; dropping intent"),
        }
    })
}

fn chosen_filter(event: &Event) -> Option<Intent> {
    if event.target_tag != "button" {
        return None;
    }
    event.target_id.clone().map(Intent::FilterChosen)
}

#[async_trait]
impl View<WebcamSlots> for CameraView {
    async fn initialize(&self, mvc: &Arc<WebcamMvc>) -> Result<()> {
        self.mvc.bind(mvc)?;
        let stage = self.base.initialize()?;
        let elements = self
            .build(stage, mvc.model().filters())
            .context("failed to build the camera view")?;
        if self.elements.set(elements).is_err() {
            return Err(LifecycleError::AlreadyInitialized.into());
        }
        debug!(%stage, "camera view built");
        Ok(())
    }

    fn attach(&self, host: NodeId) -> Result<(), LifecycleError> {
        self.base.attach(host)
    }

    fn activate(&self) -> Result<(), LifecycleError> {
        let elements = self.elements()?;
        let mvc = self
            .mvc
            .get()
            .map(|mvc| Arc::downgrade(&mvc))
            .map_err(|_| LifecycleError::NotInitialized)?;

        self.base.activate(|document, listeners: &mut ListenerSet| {
            listeners.add(
                document,
                elements.photo_button,
                "click",
                intent_listener(mvc.clone(), |_| Some(Intent::PhotoRequested)),
            )?;
            listeners.add(
                document,
                elements.filter_bar,
                "click",
                intent_listener(mvc.clone(), chosen_filter),
            )?;
            listeners.add(
                document,
                elements.camera_button,
                "click",
                intent_listener(mvc, |_| Some(Intent::CaptureStartRequested)),
            )?;
            Ok(())
        })?;
        Ok(())
    }

    fn deactivate(&self) {
        self.base.deactivate();
    }
}

#[cfg(test)]
#[path = "tests/view_tests.rs"]
mod tests;
