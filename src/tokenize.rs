use serde::Serialize;

#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum TokenKind {
    Word,
    Space,
}

/// A word or whitespace run borrowed from a chunk's text. Recomputed on demand, never stored.
#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq)]
pub struct WordToken<'a> {
    pub kind: TokenKind,
    pub text: &'a str,
    /// Byte offset of `text` inside the tokenized string.
    pub offset: usize,
    /// Left-to-right index among the word tokens of the same text. `None` for spaces.
    pub word_index: Option<usize>,
}

impl WordToken<'_> {
    pub fn end(&self) -> usize {
        self.offset + self.text.len()
    }
}

pub fn tokenize_words(text: &str) -> Vec<WordToken<'_>> {
    let mut tokens = Vec::new();
    let mut words = 0usize;
    let mut run_start = 0usize;
    let mut run_is_space: Option<bool> = None;

    for (offset, ch) in text.char_indices() {
        let is_space = ch.is_whitespace();
        match run_is_space {
            Some(current) if current == is_space => continue,
            Some(current) => {
                tokens.push(make_token(text, run_start, offset, current, &mut words));
                run_start = offset;
            }
            None => {}
        }
        run_is_space = Some(is_space);
    }

    if let Some(current) = run_is_space {
        tokens.push(make_token(text, run_start, text.len(), current, &mut words));
    }

    tokens
}

fn make_token<'a>(
    text: &'a str,
    start: usize,
    end: usize,
    is_space: bool,
    words: &mut usize,
) -> WordToken<'a> {
    if is_space {
        return WordToken {
            kind: TokenKind::Space,
            text: &text[start..end],
            offset: start,
            word_index: None,
        };
    }

    let word_index = *words;
    *words += 1;
    WordToken {
        kind: TokenKind::Word,
        text: &text[start..end],
        offset: start,
        word_index: Some(word_index),
    }
}

/// Normalises a tapped word for lookup: surrounding whitespace and trailing
/// `. , ! ? ; : "` are removed. Returns `None` when nothing is left to look up.
pub fn clean_lookup_word(word: &str) -> Option<&str> {
    let cleaned = word
        .trim()
        .trim_end_matches(['.', ',', '!', '?', ';', ':', '"']);
    if cleaned.is_empty() {
        None
    } else {
        Some(cleaned)
    }
}
