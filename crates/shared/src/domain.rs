use serde::{Deserialize, Serialize};

/// A named visual effect, expressed as a CSS filter string.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FilterDescriptor {
    pub name: String,
    pub filter: String,
}

impl FilterDescriptor {
    pub fn new(name: impl Into<String>, filter: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            filter: filter.into(),
        }
    }
}

/// Presets offered by the webcam view, in display order.
pub fn default_filter_presets() -> Vec<FilterDescriptor> {
    [
        ("Reset", ""),
        ("Contrast", "contrast(500%)"),
        ("BnW", "grayscale(100%)"),
        ("Bright", "brightness(300%)"),
        ("Sepia", "sepia(400%)"),
        ("Invert", "invert(100%)"),
        ("Saturate", "saturate(800%)"),
        ("Hue", "hue-rotate(90deg)"),
        ("Blur", "blur(3px)"),
    ]
    .into_iter()
    .map(|(name, filter)| FilterDescriptor::new(name, filter))
    .collect()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct VideoConstraints {
    pub width: u32,
    pub height: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct MediaConstraints {
    pub audio: bool,
    pub video: VideoConstraints,
}

impl Default for MediaConstraints {
    fn default() -> Self {
        Self {
            audio: false,
            video: VideoConstraints {
                width: 1920,
                height: 1080,
            },
        }
    }
}
