use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::session::state::{Theme, TranslationService};

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ChapterMetadata {
    pub title: String,
    pub order: u32,
    pub total_chapters: u32,
}

/// Response of the chapter content endpoint.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChapterContentResponse {
    pub chapter: ChapterBody,
    pub total_chapters: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChapterBody {
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub order: Option<u32>,
    #[serde(default)]
    pub content: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChapterContent {
    pub metadata: ChapterMetadata,
    pub paragraphs: Vec<String>,
}

impl ChapterContentResponse {
    pub fn into_content(self, requested_order: u32) -> ChapterContent {
        ChapterContent {
            metadata: ChapterMetadata {
                title: self.chapter.title,
                order: self.chapter.order.unwrap_or(requested_order),
                total_chapters: self.total_chapters,
            },
            paragraphs: self.chapter.content,
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct ReadingPosition {
    pub chapter_order: u32,
    pub page_number: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TranslateRequest<'a> {
    pub text: &'a str,
    pub book: u64,
    pub service: TranslationService,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Translation {
    pub original_text: String,
    pub translated_text: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub alternatives: Vec<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct TranslateResponse {
    #[serde(default)]
    pub original_text: String,
    #[serde(default)]
    pub translated_text: String,
    #[serde(default)]
    pub alternatives: Option<Vec<String>>,
    #[serde(default)]
    pub error: Option<String>,
}

impl TranslateResponse {
    pub fn into_result(self) -> anyhow::Result<Translation> {
        if let Some(error) = self.error.filter(|e| !e.trim().is_empty()) {
            anyhow::bail!(error);
        }
        Ok(Translation {
            original_text: self.original_text,
            translated_text: self.translated_text,
            alternatives: self.alternatives.unwrap_or_default(),
        })
    }
}

/// Reader preferences as persisted by a settings store.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct ReaderSettings {
    pub font_size: f32,
    pub theme: Theme,
    pub translation_service: TranslationService,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoredSettings {
    #[serde(flatten)]
    pub settings: ReaderSettings,
    pub saved_at: DateTime<Utc>,
}
