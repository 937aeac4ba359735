use crate::formats::ChapterMetadata;
use crate::paginate::Page;
use crate::segment::ChunkKind;
use crate::session::state::Selection;
use crate::tokenize::{TokenKind, clean_lookup_word, tokenize_words};

/// Plain-text rendering of a page. Paragraph breaks become blank lines and the
/// selected word, if it is on this page, is wrapped in brackets.
pub fn render_page(page: &Page, selection: Option<Selection>) -> String {
    let mut out = String::new();
    let mut at_line_start = true;

    for chunk in &page.chunks {
        match chunk.kind {
            ChunkKind::ParagraphBreak => {
                out.push_str("\n\n");
                at_line_start = true;
            }
            ChunkKind::Sentence => {
                if !at_line_start {
                    out.push(' ');
                }
                at_line_start = false;
                let selected_word = selection
                    .filter(|s| s.sequence_index == chunk.sequence_index)
                    .map(|s| s.word_index);
                for token in tokenize_words(chunk.text()) {
                    let highlighted = token.kind == TokenKind::Word
                        && token.word_index.is_some()
                        && token.word_index == selected_word;
                    if highlighted {
                        out.push('[');
                        out.push_str(token.text);
                        out.push(']');
                    } else {
                        out.push_str(token.text);
                    }
                }
            }
        }
    }

    out
}

pub fn page_header(metadata: &ChapterMetadata, page_index: usize, page_count: usize) -> String {
    format!(
        "{} (chapter {} of {}) - page {} of {}",
        metadata.title,
        metadata.order,
        metadata.total_chapters,
        if page_count == 0 { 0 } else { page_index + 1 },
        page_count
    )
}

/// Finds the first word on `page` whose cleaned form equals `word`, case-insensitively.
/// Returns the word as written together with its chunk and word index.
pub fn find_word<'a>(page: &'a Page, word: &str) -> Option<(&'a str, Selection)> {
    let wanted = word.to_lowercase();
    page.chunks.iter().filter(|c| c.is_sentence()).find_map(|chunk| {
        tokenize_words(chunk.text()).into_iter().find_map(|token| {
            let word_index = token.word_index?;
            let cleaned = clean_lookup_word(token.text)?;
            (cleaned.to_lowercase() == wanted).then_some((
                token.text,
                Selection {
                    sequence_index: chunk.sequence_index,
                    word_index,
                },
            ))
        })
    })
}
