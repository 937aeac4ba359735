use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ChunkKind {
    Sentence,
    ParagraphBreak,
}

/// One atomic unit of a chapter: a sentence, or the break between two paragraphs.
///
/// `sequence_index` is assigned once at segmentation time and keys every piece of
/// per-chunk state (translations, selection) for the lifetime of the chapter.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Chunk {
    pub kind: ChunkKind,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
    pub sequence_index: usize,
}

impl Chunk {
    fn sentence(text: &str, sequence_index: usize) -> Self {
        Self {
            kind: ChunkKind::Sentence,
            text: Some(text.to_owned()),
            sequence_index,
        }
    }

    fn paragraph_break(sequence_index: usize) -> Self {
        Self {
            kind: ChunkKind::ParagraphBreak,
            text: None,
            sequence_index,
        }
    }

    pub fn is_sentence(&self) -> bool {
        self.kind == ChunkKind::Sentence
    }

    pub fn text(&self) -> &str {
        self.text.as_deref().unwrap_or("")
    }
}

pub fn segment_paragraphs<S: AsRef<str>>(paragraphs: &[S]) -> Vec<Chunk> {
    let mut chunks = Vec::new();

    for paragraph in paragraphs {
        let paragraph = paragraph.as_ref().trim();
        if paragraph.is_empty() {
            continue;
        }

        for sentence in split_sentences(paragraph) {
            let index = chunks.len();
            chunks.push(Chunk::sentence(sentence, index));
        }
        let index = chunks.len();
        chunks.push(Chunk::paragraph_break(index));
    }

    if chunks
        .last()
        .is_some_and(|chunk| chunk.kind == ChunkKind::ParagraphBreak)
    {
        chunks.pop();
    }

    chunks
}

/// Splits after `.`, `?` or `!` when followed by whitespace. The terminator stays on the
/// sentence it closes; the whitespace run between sentences is dropped.
pub fn split_sentences(paragraph: &str) -> Vec<&str> {
    let mut sentences = Vec::new();
    let mut start = 0;
    let mut prev: Option<char> = None;
    let mut skipping_gap = false;

    for (offset, ch) in paragraph.char_indices() {
        if skipping_gap {
            if ch.is_whitespace() {
                prev = Some(ch);
                continue;
            }
            skipping_gap = false;
            start = offset;
        } else if ch.is_whitespace() && matches!(prev, Some('.' | '?' | '!')) {
            push_trimmed(&mut sentences, &paragraph[start..offset]);
            skipping_gap = true;
        }
        prev = Some(ch);
    }

    if !skipping_gap {
        push_trimmed(&mut sentences, &paragraph[start..]);
    }

    sentences
}

fn push_trimmed<'a>(sentences: &mut Vec<&'a str>, candidate: &'a str) {
    let candidate = candidate.trim();
    if !candidate.is_empty() {
        sentences.push(candidate);
    }
}
