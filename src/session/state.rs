use serde::{Deserialize, Serialize};

use crate::formats::ReaderSettings;
use crate::layout::PageStyle;

pub const MIN_FONT_SIZE: f32 = 12.0;
pub const MAX_FONT_SIZE: f32 = 28.0;
pub const DEFAULT_FONT_SIZE: f32 = 16.0;
pub const LINE_HEIGHT_RATIO: f32 = 1.6;

const HORIZONTAL_PADDING: f32 = 40.0;
const HEADER_HEIGHT: f32 = 85.0;
const FOOTER_HEIGHT: f32 = 120.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Idle,
    Loading,
    Segmenting,
    Measuring,
    Paginated,
}

#[derive(
    Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq, clap::ValueEnum,
)]
#[serde(rename_all = "snake_case")]
pub enum Theme {
    #[default]
    Light,
    Sepia,
    Dark,
}

#[derive(
    Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq, clap::ValueEnum,
)]
#[serde(rename_all = "snake_case")]
pub enum TranslationService {
    #[default]
    Deepl,
    Chatgpt,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Next,
    Previous,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Viewport {
    pub width: f32,
    pub height: f32,
}

impl Default for ReaderSettings {
    fn default() -> Self {
        Self {
            font_size: DEFAULT_FONT_SIZE,
            theme: Theme::default(),
            translation_service: TranslationService::default(),
        }
    }
}

impl ReaderSettings {
    pub fn line_height(&self) -> f32 {
        self.font_size * LINE_HEIGHT_RATIO
    }

    /// The text box a page is laid out in, after the reader chrome takes its share.
    pub fn page_style(&self, viewport: Viewport) -> PageStyle {
        PageStyle {
            width: (viewport.width - HORIZONTAL_PADDING).max(1.0),
            height: (viewport.height - HEADER_HEIGHT - FOOTER_HEIGHT).max(1.0),
            font_size: self.font_size,
            line_height: self.line_height(),
        }
    }
}

pub fn clamp_font_size(size: f32) -> f32 {
    if size.is_nan() {
        return DEFAULT_FONT_SIZE;
    }
    size.clamp(MIN_FONT_SIZE, MAX_FONT_SIZE)
}

/// Word currently highlighted in the reader.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Selection {
    pub sequence_index: usize,
    pub word_index: usize,
}
