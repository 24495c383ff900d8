use std::sync::{Arc, OnceLock};

use anyhow::{Context, Result};
use async_trait::async_trait;
use client_core::RemoteFetch;
use mvc::{BackRef, Model, MvcError};
use parking_lot::RwLock;
use serde_json::Value;
use shared::domain::{default_filter_presets, FilterDescriptor};
use tracing::{debug, info};

use crate::shell::{WebcamMvc, WebcamSlots};

const DATA_PATH: &str = "data";

/// Filter presets plus the payload fetched from the server's data endpoint.
pub struct FilterModel {
    comm: Arc<dyn RemoteFetch>,
    presets: Vec<FilterDescriptor>,
    filters: OnceLock<Vec<FilterDescriptor>>,
    data: RwLock<Option<Value>>,
    mvc: BackRef<WebcamSlots>,
}

impl FilterModel {
    pub fn new(comm: Arc<dyn RemoteFetch>) -> Self {
        Self::with_filters(comm, default_filter_presets())
    }

    pub fn with_filters(comm: Arc<dyn RemoteFetch>, presets: Vec<FilterDescriptor>) -> Self {
        Self {
            comm,
            presets,
            filters: OnceLock::new(),
            data: RwLock::new(None),
            mvc: BackRef::default(),
        }
    }

    /// Filters in display order; empty until the model is initialized.
    pub fn filters(&self) -> &[FilterDescriptor] {
        self.filters.get().map(Vec::as_slice).unwrap_or_default()
    }

    /// Last payload fetched from the data endpoint.
    pub fn data(&self) -> Option<Value> {
        self.data.read().clone()
    }

    pub async fn refresh_data(&self) -> Result<Value> {
        debug!("get data");
        let result = self
            .comm
            .get(DATA_PATH)
            .await
            .context("failed to fetch model data")?;
        *self.data.write() = Some(result.response.clone());
        Ok(result.response)
    }

    pub fn is_bound(&self) -> bool {
        self.mvc.is_bound()
    }
}

#[async_trait]
impl Model<WebcamSlots> for FilterModel {
    async fn initialize(&self, mvc: &Arc<WebcamMvc>) -> Result<()> {
        self.mvc.bind(mvc)?;
        self.filters
            .set(self.presets.clone())
            .map_err(|_| MvcError::AlreadyInitialized(mvc.name().to_string()))?;
        let data = self.refresh_data().await?;
        info!(filters = self.filters().len(), %data, "model ready");
        Ok(())
    }
}

#[cfg(test)]
#[path = "tests/model_tests.rs"]
mod tests;
