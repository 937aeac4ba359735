use std::ops::Range;

use serde::{Deserialize, Serialize};
use unicode_width::UnicodeWidthStr as _;

use crate::segment::{Chunk, ChunkKind};
use crate::tokenize::{TokenKind, tokenize_words};

/// Geometry of one rendered line of the flattened chapter text.
///
/// Offsets are byte offsets into [`FlatText::text`].
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LineMetric {
    pub start_offset: usize,
    pub end_offset: usize,
    pub vertical_position: f32,
    pub height: f32,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PageStyle {
    pub width: f32,
    pub height: f32,
    pub font_size: f32,
    pub line_height: f32,
}

/// The chapter rendered as one string, plus the byte range each chunk occupies in it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FlatText {
    pub text: String,
    pub spans: Vec<Range<usize>>,
}

/// Sentences are followed by a single space, paragraph breaks become a newline.
pub fn flatten_chunks(chunks: &[Chunk]) -> FlatText {
    let mut text = String::new();
    let mut spans = Vec::with_capacity(chunks.len());

    for chunk in chunks {
        let start = text.len();
        match chunk.kind {
            ChunkKind::Sentence => {
                text.push_str(chunk.text());
                text.push(' ');
            }
            ChunkKind::ParagraphBreak => text.push('\n'),
        }
        spans.push(start..text.len());
    }

    FlatText { text, spans }
}

/// Line-breaks text the way the real renderer would and reports the resulting geometry.
pub trait LineMeasurer: Send + Sync {
    fn measure_lines(&self, text: &str, style: &PageStyle) -> Vec<LineMetric>;
}

/// Greedy word-wrapping measurer for fixed-advance fonts.
///
/// Each terminal cell (as counted by `unicode-width`) is assumed to advance
/// `font_size * advance_ratio` units. Words wider than the line are placed alone on
/// their own line rather than broken.
#[derive(Debug, Clone, Copy)]
pub struct MonospaceMeasurer {
    pub advance_ratio: f32,
}

impl Default for MonospaceMeasurer {
    fn default() -> Self {
        Self { advance_ratio: 0.5 }
    }
}

impl MonospaceMeasurer {
    fn advance(&self, text: &str, style: &PageStyle) -> f32 {
        text.width() as f32 * style.font_size * self.advance_ratio
    }
}

impl LineMeasurer for MonospaceMeasurer {
    fn measure_lines(&self, text: &str, style: &PageStyle) -> Vec<LineMetric> {
        let mut lines = Vec::new();
        let mut y = 0.0f32;
        let mut push_line = |start: usize, end: usize| {
            lines.push(LineMetric {
                start_offset: start,
                end_offset: end,
                vertical_position: y,
                height: style.line_height,
            });
            y += style.line_height;
        };

        let mut hard_start = 0usize;
        while hard_start < text.len() {
            let (hard_end, next_start) = match text[hard_start..].find('\n') {
                Some(pos) => (hard_start + pos, hard_start + pos + 1),
                None => (text.len(), text.len()),
            };

            let segment = &text[hard_start..hard_end];
            let mut line_start = hard_start;
            let mut line_has_word = false;
            let mut used = 0.0f32;
            for token in tokenize_words(segment) {
                let advance = self.advance(token.text, style);
                if token.kind == TokenKind::Word {
                    if line_has_word && used + advance > style.width {
                        push_line(line_start, hard_start + token.offset);
                        line_start = hard_start + token.offset;
                        used = 0.0;
                    }
                    line_has_word = true;
                }
                used += advance;
            }
            // The newline belongs to the line it terminates.
            push_line(line_start, next_start);

            hard_start = next_start;
        }

        lines
    }
}
