//! Camera access. The view only sees the [`MediaCapture`] trait; which
//! implementation backs it is a startup decision.

use std::sync::{
    atomic::{AtomicU64, Ordering},
    Arc,
};

use async_trait::async_trait;
use base64::{engine::general_purpose::STANDARD, Engine as _};
use shared::domain::MediaConstraints;
use thiserror::Error;

use crate::config::CameraKind;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MediaStream {
    pub id: String,
    pub width: u32,
    pub height: u32,
}

/// One captured still, as encoded bytes plus their MIME type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Frame {
    pub mime: &'static str,
    pub bytes: Vec<u8>,
}

impl Frame {
    pub fn data_url(&self) -> String {
        format!("data:{};base64,{}", self.mime, STANDARD.encode(&self.bytes))
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum MediaError {
    #[error("getUserMedia not supported")]
    NotSupported,
    #[error("stream {0} has ended")]
    Ended(String),
}

impl MediaError {
    /// DOM-style error name, as reported to the user.
    pub fn name(&self) -> &'static str {
        match self {
            MediaError::NotSupported => "NotSupportedError",
            MediaError::Ended(_) => "InvalidStateError",
        }
    }
}

#[async_trait]
pub trait MediaCapture: Send + Sync {
    async fn open(&self, constraints: MediaConstraints) -> Result<MediaStream, MediaError>;
    /// Resolves once the stream's dimensions are known and playback may start.
    async fn metadata_loaded(&self, stream: &MediaStream) -> Result<(), MediaError>;
    async fn capture_frame(&self, stream: &MediaStream) -> Result<Frame, MediaError>;
}

/// Host without any camera support.
pub struct UnavailableMediaCapture;

#[async_trait]
impl MediaCapture for UnavailableMediaCapture {
    async fn open(&self, _constraints: MediaConstraints) -> Result<MediaStream, MediaError> {
        Err(MediaError::NotSupported)
    }

    async fn metadata_loaded(&self, _stream: &MediaStream) -> Result<(), MediaError> {
        Err(MediaError::NotSupported)
    }

    async fn capture_frame(&self, _stream: &MediaStream) -> Result<Frame, MediaError> {
        Err(MediaError::NotSupported)
    }
}

/// Test-pattern camera: every frame is the same vertical gradient.
#[derive(Default)]
pub struct SyntheticCamera {
    opened: AtomicU64,
}

impl SyntheticCamera {
    const FRAME_SIDE: u32 = 8;
    const STREAM_PREFIX: &'static str = "synthetic-";
    const FRAME_MIME: &'static str = "image/x-portable-pixmap";

    pub fn new() -> Self {
        Self::default()
    }

    fn frame(&self) -> Frame {
        let side = Self::FRAME_SIDE;
        let mut frame = format!("P6 {side} {side} 255\n").into_bytes();
        for row in 0..side {
            let shade = u8::try_from(row * 255 / (side - 1)).unwrap_or(u8::MAX);
            for _ in 0..side {
                frame.extend_from_slice(&[shade, shade, shade]);
            }
        }
        Frame {
            mime: Self::FRAME_MIME,
            bytes: frame,
        }
    }
}

#[async_trait]
impl MediaCapture for SyntheticCamera {
    async fn open(&self, constraints: MediaConstraints) -> Result<MediaStream, MediaError> {
        let n = self.opened.fetch_add(1, Ordering::SeqCst);
        Ok(MediaStream {
            id: format!("{}{n}", Self::STREAM_PREFIX),
            width: constraints.video.width,
            height: constraints.video.height,
        })
    }

    async fn metadata_loaded(&self, _stream: &MediaStream) -> Result<(), MediaError> {
        Ok(())
    }

    async fn capture_frame(&self, stream: &MediaStream) -> Result<Frame, MediaError> {
        if !stream.id.starts_with(Self::STREAM_PREFIX) {
            return Err(MediaError::Ended(stream.id.clone()));
        }
        Ok(self.frame())
    }
}

pub fn capture_for(kind: CameraKind) -> Arc<dyn MediaCapture> {
    match kind {
        CameraKind::Disabled => Arc::new(UnavailableMediaCapture),
        CameraKind::Synthetic => Arc::new(SyntheticCamera::new()),
    }
}

#[cfg(test)]
#[path = "tests/media_tests.rs"]
mod tests;
