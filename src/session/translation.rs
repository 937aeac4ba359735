use std::collections::HashMap;

use crate::formats::Translation;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TranslationState {
    InFlight,
    Ready(Translation),
    Failed(String),
}

impl TranslationState {
    pub fn is_in_flight(&self) -> bool {
        matches!(self, Self::InFlight)
    }

    pub fn result_text(&self) -> Option<&str> {
        match self {
            Self::Ready(translation) => Some(&translation.translated_text),
            _ => None,
        }
    }

    pub fn error_message(&self) -> Option<&str> {
        match self {
            Self::Failed(message) => Some(message),
            _ => None,
        }
    }
}

/// Translations requested while reading one chapter. Nothing is evicted; the whole
/// cache is dropped when the reader moves to another chapter.
#[derive(Debug, Default)]
pub struct TranslationCache {
    chunks: HashMap<usize, TranslationState>,
    words: HashMap<String, TranslationState>,
}

impl TranslationCache {
    pub fn chunk(&self, sequence_index: usize) -> Option<&TranslationState> {
        self.chunks.get(&sequence_index)
    }

    pub fn word(&self, word: &str) -> Option<&TranslationState> {
        self.words.get(word)
    }

    /// Marks a chunk as in flight. Returns `false` if a request is already running or
    /// already succeeded, in which case nothing should be sent.
    pub fn begin_chunk(&mut self, sequence_index: usize) -> bool {
        match self.chunks.get(&sequence_index) {
            Some(TranslationState::InFlight | TranslationState::Ready(_)) => false,
            Some(TranslationState::Failed(_)) | None => {
                self.chunks
                    .insert(sequence_index, TranslationState::InFlight);
                true
            }
        }
    }

    pub fn finish_chunk(&mut self, sequence_index: usize, outcome: TranslationState) {
        self.chunks.insert(sequence_index, outcome);
    }

    pub fn begin_word(&mut self, word: &str) {
        self.words
            .insert(word.to_owned(), TranslationState::InFlight);
    }

    pub fn finish_word(&mut self, word: &str, outcome: TranslationState) {
        self.words.insert(word.to_owned(), outcome);
    }

    pub fn clear_words(&mut self) {
        self.words.clear();
    }

    pub fn clear(&mut self) {
        self.chunks.clear();
        self.words.clear();
    }
}

/// The word lookup whose result the reader is waiting for.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WordLookup {
    pub word: String,
}

/// Tracks the most recently requested lookup. Responses are matched against it by word,
/// so a late answer for an earlier tap never replaces what the reader asked for last.
#[derive(Debug, Default)]
pub struct LookupSequencer {
    active: Option<WordLookup>,
}

impl LookupSequencer {
    pub fn start(&mut self, word: &str) {
        self.active = Some(WordLookup {
            word: word.to_owned(),
        });
    }

    pub fn active(&self) -> Option<&WordLookup> {
        self.active.as_ref()
    }

    /// Whether a response for `word` should be shown.
    pub fn is_showing(&self, word: &str) -> bool {
        self.active.as_ref().is_some_and(|lookup| lookup.word == word)
    }

    pub fn dismiss(&mut self) {
        self.active = None;
    }
}
