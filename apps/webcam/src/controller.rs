use std::sync::Arc;

use anyhow::Result;
use async_trait::async_trait;
use mvc::{BackRef, Controller};
use parking_lot::Mutex;
use shared::domain::FilterDescriptor;
use tracing::{debug, info};

use crate::shell::{WebcamMvc, WebcamSlots};

/// What the user asked for, independent of the DOM event that carried it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Intent {
    FilterChosen(String),
    CaptureStartRequested,
    PhotoRequested,
}

#[derive(Default)]
pub struct CameraController {
    mvc: BackRef<WebcamSlots>,
    last_filter: Mutex<Option<FilterDescriptor>>,
}

impl CameraController {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn last_filter(&self) -> Option<FilterDescriptor> {
        self.last_filter.lock().clone()
    }

    /// Applies the named filter to the video preview. Unknown names are
    /// ignored; returns whether a filter was applied.
    pub fn filter_chosen(&self, name: &str) -> Result<bool> {
        let mvc = self.mvc.get()?;
        let Some(filter) = find_filter(mvc.model().filters(), name) else {
            debug!(%name, "no filter with that name");
            return Ok(false);
        };
        mvc.view().update_filter(filter)?;
        info!(name = %filter.name, filter = %filter.filter, "filter applied");
        *self.last_filter.lock() = Some(filter.clone());
        Ok(true)
    }

    pub async fn capture_start_requested(&self) -> Result<()> {
        self.mvc.get()?.view().update_video().await
    }

    pub async fn photo_requested(&self) -> Result<()> {
        self.mvc.get()?.view().save_photo().await?;
        Ok(())
    }
}

pub fn find_filter<'a>(filters: &'a [FilterDescriptor], name: &str) -> Option<&'a FilterDescriptor> {
    filters.iter().find(|filter| filter.name == name)
}

#[async_trait]
impl Controller<WebcamSlots> for CameraController {
    type Intent = Intent;

    async fn initialize(&self, mvc: &Arc<WebcamMvc>) -> Result<()> {
        self.mvc.bind(mvc)?;
        Ok(())
    }

    async fn dispatch(&self, intent: Intent) -> Result<()> {
        debug!(?intent, "dispatching");
        match intent {
            Intent::FilterChosen(name) => self.filter_chosen(&name).map(|_| ()),
            Intent::CaptureStartRequested => self.capture_start_requested().await,
            Intent::PhotoRequested => self.photo_requested().await,
        }
    }
}

#[cfg(test)]
#[path = "tests/controller_tests.rs"]
mod tests;
