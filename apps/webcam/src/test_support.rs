use std::{
    collections::HashMap,
    sync::{Arc, Weak},
};

use anyhow::{anyhow, Result};
use async_trait::async_trait;
use client_core::RemoteFetch;
use mvc::{Document, Mvc, View};
use parking_lot::Mutex;
use serde_json::Value;
use shared::{domain::FilterDescriptor, protocol::FetchResult};

use crate::{
    controller::CameraController,
    media::MediaCapture,
    model::FilterModel,
    shell::{WebcamMvc, MVC_NAME},
    view::CameraView,
};

/// Answers from a fixed path table and records every request.
#[derive(Default)]
pub struct StaticFetch {
    responses: HashMap<String, Value>,
    calls: Mutex<Vec<String>>,
}

impl StaticFetch {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, path: &str, response: Value) -> Self {
        self.responses.insert(path.to_string(), response);
        self
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().clone()
    }
}

#[async_trait]
impl RemoteFetch for StaticFetch {
    async fn get(&self, path: &str) -> Result<FetchResult> {
        self.calls.lock().push(path.to_string());
        self.responses
            .get(path)
            .cloned()
            .map(FetchResult::new)
            .ok_or_else(|| anyhow!("GET {path}: 503 Service Unavailable"))
    }
}

pub fn sepia_filters() -> Vec<FilterDescriptor> {
    vec![
        FilterDescriptor::new("Reset", ""),
        FilterDescriptor::new("Sepia", "sepia(400%)"),
    ]
}

/// A container without an owning application.
pub fn detached_mvc(
    fetch: Arc<dyn RemoteFetch>,
    filters: Vec<FilterDescriptor>,
    media: Arc<dyn MediaCapture>,
) -> (Arc<WebcamMvc>, Arc<Document>) {
    let document = Arc::new(Document::new());
    let mvc = Mvc::new(
        MVC_NAME,
        Weak::new(),
        FilterModel::with_filters(fetch, filters),
        CameraView::new(Arc::clone(&document), media),
        CameraController::new(),
    );
    (mvc, document)
}

/// Initialized, attached to the body and active.
pub async fn active_mvc(
    fetch: Arc<dyn RemoteFetch>,
    filters: Vec<FilterDescriptor>,
    media: Arc<dyn MediaCapture>,
) -> (Arc<WebcamMvc>, Arc<Document>) {
    let (mvc, document) = detached_mvc(fetch, filters, media);
    mvc.initialize().await.expect("initialize");
    mvc.view().attach(document.body()).expect("attach");
    mvc.view().activate().expect("activate");
    (mvc, document)
}

pub fn data_fetch(response: Value) -> Arc<StaticFetch> {
    Arc::new(StaticFetch::new().with("data", response))
}
