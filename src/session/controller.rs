use std::sync::Arc;
use std::time::Duration;

use anyhow::Context as _;
use async_trait::async_trait;
use tokio::sync::mpsc;

use crate::api::ReaderBackend;
use crate::config::ReaderConfig;
use crate::formats::{
    ChapterContent, ChapterMetadata, ReaderSettings, ReadingPosition, Translation,
};
use crate::paginate::{Page, paginate};
use crate::layout::{LineMeasurer, PageStyle, flatten_chunks};
use crate::segment::{Chunk, segment_paragraphs};
use crate::session::debounce::{DebouncedSink, Debouncer};
use crate::session::state::{
    Direction, Phase, Selection, Theme, TranslationService, Viewport, clamp_font_size,
};
use crate::session::translation::{
    LookupSequencer, TranslationCache, TranslationState, WordLookup,
};
use crate::settings_store::SettingsStore;
use crate::tokenize::clean_lookup_word;

#[derive(Debug, Clone)]
pub struct SessionOptions {
    pub book_id: u64,
    pub viewport: Viewport,
    pub settings: ReaderSettings,
    pub progress_debounce: Duration,
    pub settings_debounce: Duration,
}

impl SessionOptions {
    pub fn from_config(book_id: u64, config: &ReaderConfig) -> Self {
        Self {
            book_id,
            viewport: config.viewport(),
            settings: ReaderSettings {
                font_size: clamp_font_size(config.font_size),
                theme: config.theme,
                translation_service: config.translation_service,
            },
            progress_debounce: config.progress_debounce(),
            settings_debounce: config.settings_debounce(),
        }
    }
}

/// What a processed event changed, for the presentation layer to react to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionUpdate {
    ChapterLoaded { chapter_order: u32 },
    ChapterFailed { chapter_order: u32 },
    Paginated { page_count: usize, page_index: usize },
    ChunkTranslation { sequence_index: usize },
    WordTranslation { word: String },
    Discarded,
}

enum SessionEvent {
    ChapterFetched {
        request: u64,
        chapter_order: u32,
        result: anyhow::Result<ChapterContent>,
    },
    LayoutFinished {
        request: u64,
        generation: u64,
        result: anyhow::Result<Vec<Page>>,
    },
    ChunkTranslated {
        request: u64,
        sequence_index: usize,
        outcome: TranslationState,
    },
    WordTranslated {
        word: String,
        service: TranslationService,
        outcome: TranslationState,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum PageTarget {
    Number(u32),
    Anchor(usize),
}

struct LoadedChapter {
    request: u64,
    metadata: ChapterMetadata,
    chunks: Arc<Vec<Chunk>>,
}

struct ProgressSink {
    backend: Arc<dyn ReaderBackend>,
    book_id: u64,
}

#[async_trait]
impl DebouncedSink<ReadingPosition> for ProgressSink {
    async fn deliver(&self, position: ReadingPosition) -> anyhow::Result<()> {
        self.backend
            .save_reading_progress(self.book_id, position)
            .await
            .context("save reading progress")
    }
}

struct SettingsSink {
    store: Arc<dyn SettingsStore>,
}

#[async_trait]
impl DebouncedSink<ReaderSettings> for SettingsSink {
    async fn deliver(&self, settings: ReaderSettings) -> anyhow::Result<()> {
        self.store.save(&settings).await
    }
}

/// Drives one book's reading session: chapter loading, pagination, position tracking
/// and lookups.
///
/// Handlers (`on_*`, navigation) start background work and return immediately. Results
/// come back as events that the owner feeds through [`ReadingSession::next_update`],
/// which keeps all state changes on the caller's task. Responses that were superseded
/// in the meantime are dropped there.
pub struct ReadingSession {
    book_id: u64,
    backend: Arc<dyn ReaderBackend>,
    measurer: Arc<dyn LineMeasurer>,
    viewport: Viewport,
    settings: ReaderSettings,
    phase: Phase,
    phase_before_fetch: Phase,

    fetch_request: u64,
    pending_order: Option<u32>,
    chapter: Option<LoadedChapter>,
    resume: Option<ReadingPosition>,

    layout_generation: u64,
    pages_generation: u64,
    measuring: bool,
    remeasure_pending: bool,
    target: Option<PageTarget>,
    pages: Vec<Page>,
    page_index: usize,

    translations: TranslationCache,
    lookups: LookupSequencer,
    selection: Option<Selection>,
    notice: Option<String>,

    progress: Debouncer<ReadingPosition>,
    settings_saver: Option<Debouncer<ReaderSettings>>,
    settings_debounce: Duration,

    events_tx: mpsc::UnboundedSender<SessionEvent>,
    events_rx: mpsc::UnboundedReceiver<SessionEvent>,
}

impl ReadingSession {
    pub fn new(
        options: SessionOptions,
        backend: Arc<dyn ReaderBackend>,
        measurer: Arc<dyn LineMeasurer>,
    ) -> Self {
        let (events_tx, events_rx) = mpsc::unbounded_channel();
        let sink: Arc<dyn DebouncedSink<ReadingPosition>> = Arc::new(ProgressSink {
            backend: Arc::clone(&backend),
            book_id: options.book_id,
        });

        Self {
            book_id: options.book_id,
            backend,
            measurer,
            viewport: options.viewport,
            settings: options.settings,
            phase: Phase::Idle,
            phase_before_fetch: Phase::Idle,
            fetch_request: 0,
            pending_order: None,
            chapter: None,
            resume: None,
            layout_generation: 0,
            pages_generation: 0,
            measuring: false,
            remeasure_pending: false,
            target: None,
            pages: Vec::new(),
            page_index: 0,
            translations: TranslationCache::default(),
            lookups: LookupSequencer::default(),
            selection: None,
            notice: None,
            progress: Debouncer::new("progress", options.progress_debounce, sink),
            settings_saver: None,
            settings_debounce: options.settings_debounce,
            events_tx,
            events_rx,
        }
    }

    /// Persist reader preferences through `store` whenever they change.
    pub fn with_settings_store(mut self, store: Arc<dyn SettingsStore>) -> Self {
        let sink: Arc<dyn DebouncedSink<ReaderSettings>> = Arc::new(SettingsSink { store });
        self.settings_saver = Some(Debouncer::new("settings", self.settings_debounce, sink));
        self
    }

    /// Starts reading at `chapter_order`. A saved position is honoured the first time
    /// its chapter is loaded in this session.
    pub fn open(&mut self, chapter_order: u32, resume: Option<ReadingPosition>) {
        self.resume = resume;
        self.start_fetch(chapter_order);
    }

    /// Loads `chapter_order` unconditionally, superseding any load still in flight.
    pub fn jump_to_chapter(&mut self, chapter_order: u32) -> bool {
        if chapter_order == 0 {
            return false;
        }
        if let Some(chapter) = &self.chapter
            && chapter_order > chapter.metadata.total_chapters
        {
            return false;
        }
        self.start_fetch(chapter_order);
        true
    }

    pub fn go_to_next_chapter(&mut self) -> bool {
        self.on_chapter_navigate(Direction::Next)
    }

    pub fn go_to_previous_chapter(&mut self) -> bool {
        self.on_chapter_navigate(Direction::Previous)
    }

    /// No-op while a chapter is loading or at either end of the book.
    pub fn on_chapter_navigate(&mut self, direction: Direction) -> bool {
        if self.pending_order.is_some() {
            return false;
        }
        let Some(chapter) = &self.chapter else {
            return false;
        };
        let current = chapter.metadata.order;
        let target = match direction {
            Direction::Next if current < chapter.metadata.total_chapters => current + 1,
            Direction::Previous if current > 1 => current - 1,
            _ => return false,
        };
        self.start_fetch(target);
        true
    }

    pub async fn on_page_changed(&mut self, page_index: usize) {
        if self.phase != Phase::Paginated
            || page_index >= self.pages.len()
            || page_index == self.page_index
        {
            return;
        }
        self.page_index = page_index;
        self.record_position().await;
    }

    pub async fn on_font_size_changed(&mut self, font_size: f32) {
        let font_size = clamp_font_size(font_size);
        if font_size == self.settings.font_size {
            return;
        }
        self.settings.font_size = font_size;
        self.persist_settings().await;
        self.invalidate_layout("font size");
    }

    pub async fn on_theme_changed(&mut self, theme: Theme) {
        if theme == self.settings.theme {
            return;
        }
        self.settings.theme = theme;
        self.persist_settings().await;
        self.invalidate_layout("theme");
    }

    pub fn on_viewport_changed(&mut self, viewport: Viewport) {
        if viewport == self.viewport {
            return;
        }
        self.viewport = viewport;
        self.invalidate_layout("viewport");
    }

    pub async fn set_translation_service(&mut self, service: TranslationService) {
        if service == self.settings.translation_service {
            return;
        }
        self.settings.translation_service = service;
        // Looked-up words were translated by the previous service.
        self.translations.clear_words();
        self.persist_settings().await;
    }

    /// Selects the tapped word and looks it up. Returns `false` when the word has
    /// nothing left after cleaning, in which case the selection is cleared.
    pub fn on_word_tapped(&mut self, word: &str, sequence_index: usize, word_index: usize) -> bool {
        let Some(cleaned) = clean_lookup_word(word) else {
            self.dismiss_lookup();
            return false;
        };
        self.selection = Some(Selection {
            sequence_index,
            word_index,
        });
        self.lookups.start(cleaned);

        match self.translations.word(cleaned) {
            Some(TranslationState::Ready(_) | TranslationState::InFlight) => return true,
            Some(TranslationState::Failed(_)) | None => {}
        }
        self.translations.begin_word(cleaned);

        let backend = Arc::clone(&self.backend);
        let tx = self.events_tx.clone();
        let book_id = self.book_id;
        let service = self.settings.translation_service;
        let word = cleaned.to_owned();
        tracing::debug!(word = %word, ?service, sequence_index, "word lookup");
        tokio::spawn(async move {
            let outcome = translation_outcome(backend.translate(&word, book_id, service).await);
            let _ = tx.send(SessionEvent::WordTranslated {
                word,
                service,
                outcome,
            });
        });
        true
    }

    pub fn on_chunk_translate_requested(&mut self, sequence_index: usize) -> bool {
        let Some(chapter) = &self.chapter else {
            return false;
        };
        let Some(text) = chapter
            .chunks
            .get(sequence_index)
            .filter(|chunk| chunk.is_sentence())
            .map(|chunk| chunk.text().to_owned())
        else {
            return false;
        };
        if !self.translations.begin_chunk(sequence_index) {
            return false;
        }

        let backend = Arc::clone(&self.backend);
        let tx = self.events_tx.clone();
        let request = chapter.request;
        let book_id = self.book_id;
        let service = self.settings.translation_service;
        tokio::spawn(async move {
            let outcome = translation_outcome(backend.translate(&text, book_id, service).await);
            let _ = tx.send(SessionEvent::ChunkTranslated {
                request,
                sequence_index,
                outcome,
            });
        });
        true
    }

    pub fn dismiss_lookup(&mut self) {
        self.selection = None;
        self.lookups.dismiss();
    }

    /// Waits for the next background result and applies it.
    pub async fn next_update(&mut self) -> Option<SessionUpdate> {
        let event = self.events_rx.recv().await?;
        Some(self.apply(event).await)
    }

    /// Cancels pending timers and makes a last attempt to save position and settings.
    pub async fn close(mut self) {
        self.progress.flush().await;
        if let Some(saver) = self.settings_saver.as_mut() {
            saver.flush().await;
        }
        tracing::debug!(book_id = self.book_id, "reading session closed");
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn settings(&self) -> &ReaderSettings {
        &self.settings
    }

    pub fn page_style(&self) -> PageStyle {
        self.settings.page_style(self.viewport)
    }

    /// Pages ready for display. Empty unless the chapter is paginated for the current
    /// layout settings.
    pub fn current_pages(&self) -> &[Page] {
        if self.phase == Phase::Paginated {
            &self.pages
        } else {
            &[]
        }
    }

    pub fn current_page_index(&self) -> usize {
        self.page_index
    }

    pub fn current_page(&self) -> Option<&Page> {
        self.current_pages().get(self.page_index)
    }

    pub fn current_chapter_metadata(&self) -> Option<&ChapterMetadata> {
        self.chapter.as_ref().map(|chapter| &chapter.metadata)
    }

    pub fn position(&self) -> Option<ReadingPosition> {
        let chapter = self.chapter.as_ref()?;
        (self.phase == Phase::Paginated).then(|| ReadingPosition {
            chapter_order: chapter.metadata.order,
            page_number: self.page_index as u32 + 1,
        })
    }

    pub fn progress_percent(&self) -> f32 {
        let pages = self.current_pages().len();
        if pages == 0 {
            return 0.0;
        }
        (self.page_index + 1) as f32 / pages as f32 * 100.0
    }

    pub fn selection(&self) -> Option<Selection> {
        self.selection
    }

    pub fn chunk_translation(&self, sequence_index: usize) -> Option<&TranslationState> {
        self.translations.chunk(sequence_index)
    }

    /// The word being looked up and its result so far.
    pub fn word_lookup(&self) -> Option<(&WordLookup, Option<&TranslationState>)> {
        let lookup = self.lookups.active()?;
        Some((lookup, self.translations.word(&lookup.word)))
    }

    /// A message for the user about a failed chapter load, if one is waiting.
    pub fn take_notice(&mut self) -> Option<String> {
        self.notice.take()
    }

    fn set_phase(&mut self, phase: Phase) {
        if self.phase != phase {
            tracing::debug!(from = ?self.phase, to = ?phase, "reader phase");
            self.phase = phase;
        }
    }

    fn start_fetch(&mut self, chapter_order: u32) {
        self.fetch_request += 1;
        let request = self.fetch_request;
        if self.phase != Phase::Loading {
            self.phase_before_fetch = self.phase;
        }
        self.pending_order = Some(chapter_order);
        self.set_phase(Phase::Loading);

        let backend = Arc::clone(&self.backend);
        let tx = self.events_tx.clone();
        let book_id = self.book_id;
        tracing::info!(book_id, chapter_order, request, "loading chapter");
        tokio::spawn(async move {
            let result = backend.fetch_chapter(book_id, chapter_order).await;
            let _ = tx.send(SessionEvent::ChapterFetched {
                request,
                chapter_order,
                result,
            });
        });
    }

    fn invalidate_layout(&mut self, reason: &str) {
        self.layout_generation += 1;
        if self.chapter.is_none() || self.phase == Phase::Loading {
            return;
        }
        if self.phase == Phase::Paginated {
            self.target = Some(self.anchor_target());
        }
        tracing::debug!(reason, generation = self.layout_generation, "layout invalidated");
        self.pages.clear();
        self.start_measuring();
    }

    fn start_measuring(&mut self) {
        if self.chapter.is_none() {
            return;
        }
        self.set_phase(Phase::Measuring);
        if self.measuring {
            self.remeasure_pending = true;
            return;
        }
        let Some((request, chunks)) = self
            .chapter
            .as_ref()
            .map(|chapter| (chapter.request, Arc::clone(&chapter.chunks)))
        else {
            return;
        };
        self.measuring = true;

        let generation = self.layout_generation;
        let measurer = Arc::clone(&self.measurer);
        let style = self.page_style();
        let tx = self.events_tx.clone();
        tokio::spawn(async move {
            let result = tokio::task::spawn_blocking(move || {
                let flat = flatten_chunks(&chunks);
                let lines = measurer.measure_lines(&flat.text, &style);
                paginate(&chunks, &flat, &lines, style.height)
            })
            .await
            .context("measure chapter lines");
            let _ = tx.send(SessionEvent::LayoutFinished {
                request,
                generation,
                result,
            });
        });
    }

    /// Where to land after re-pagination: the page holding the current leading chunk.
    fn anchor_target(&self) -> PageTarget {
        self.pages
            .get(self.page_index)
            .and_then(Page::leading_sequence_index)
            .map_or(PageTarget::Number(1), PageTarget::Anchor)
    }

    async fn record_position(&mut self) {
        let Some(position) = self.position() else {
            return;
        };
        if self.progress.latest() != Some(&position) {
            self.progress.schedule(position).await;
        }
    }

    async fn persist_settings(&mut self) {
        let settings = self.settings;
        if let Some(saver) = self.settings_saver.as_mut() {
            saver.schedule(settings).await;
        }
    }

    async fn apply(&mut self, event: SessionEvent) -> SessionUpdate {
        match event {
            SessionEvent::ChapterFetched {
                request,
                chapter_order,
                result,
            } => self.apply_chapter(request, chapter_order, result),
            SessionEvent::LayoutFinished {
                request,
                generation,
                result,
            } => self.apply_layout(request, generation, result).await,
            SessionEvent::ChunkTranslated {
                request,
                sequence_index,
                outcome,
            } => {
                if self.chapter.as_ref().map(|c| c.request) != Some(request) {
                    tracing::debug!(sequence_index, "dropping translation for a previous chapter");
                    return SessionUpdate::Discarded;
                }
                self.translations.finish_chunk(sequence_index, outcome);
                SessionUpdate::ChunkTranslation { sequence_index }
            }
            SessionEvent::WordTranslated {
                word,
                service,
                outcome,
            } => {
                if service != self.settings.translation_service {
                    tracing::debug!(word = %word, ?service, "dropping lookup from a previous service");
                    return SessionUpdate::Discarded;
                }
                if self.translations.word(&word).is_some_and(TranslationState::is_in_flight) {
                    self.translations.finish_word(&word, outcome);
                }
                let shown = self.lookups.is_showing(&word);
                if !shown {
                    tracing::debug!(word = %word, "late lookup response not shown");
                    return SessionUpdate::Discarded;
                }
                SessionUpdate::WordTranslation { word }
            }
        }
    }

    fn apply_chapter(
        &mut self,
        request: u64,
        chapter_order: u32,
        result: anyhow::Result<ChapterContent>,
    ) -> SessionUpdate {
        if request != self.fetch_request {
            tracing::debug!(request, chapter_order, "discarding superseded chapter response");
            return SessionUpdate::Discarded;
        }
        self.pending_order = None;

        let content = match result {
            Ok(content) => content,
            Err(err) => {
                tracing::warn!(chapter_order, ?err, "chapter load failed");
                self.notice = Some(format!("Could not load chapter {chapter_order}: {err:#}"));
                self.restore_after_failed_fetch();
                return SessionUpdate::ChapterFailed { chapter_order };
            }
        };

        self.set_phase(Phase::Segmenting);
        let chunks = segment_paragraphs(&content.paragraphs);
        let order = content.metadata.order;
        tracing::info!(
            chapter_order = order,
            paragraphs = content.paragraphs.len(),
            chunks = chunks.len(),
            "chapter segmented"
        );

        self.target = match self.resume {
            Some(resume) if resume.chapter_order == order => {
                self.resume = None;
                Some(PageTarget::Number(resume.page_number))
            }
            _ => Some(PageTarget::Number(1)),
        };
        self.chapter = Some(LoadedChapter {
            request,
            metadata: content.metadata,
            chunks: Arc::new(chunks),
        });
        self.translations.clear();
        self.dismiss_lookup();
        self.pages.clear();
        self.page_index = 0;
        self.start_measuring();

        SessionUpdate::ChapterLoaded {
            chapter_order: order,
        }
    }

    /// Goes back to showing the chapter that was open before the failed load,
    /// re-paginating it if layout settings changed while the load was in flight.
    fn restore_after_failed_fetch(&mut self) {
        let previous = self.phase_before_fetch;
        if self.chapter.is_none() || !matches!(previous, Phase::Measuring | Phase::Paginated) {
            self.set_phase(previous);
            return;
        }
        if previous == Phase::Paginated && self.pages_generation == self.layout_generation {
            self.set_phase(Phase::Paginated);
            return;
        }
        if previous == Phase::Paginated {
            self.target = Some(self.anchor_target());
        }
        self.pages.clear();
        self.start_measuring();
    }

    async fn apply_layout(
        &mut self,
        request: u64,
        generation: u64,
        result: anyhow::Result<Vec<Page>>,
    ) -> SessionUpdate {
        self.measuring = false;
        let remeasure = std::mem::take(&mut self.remeasure_pending);
        let current_request = self.chapter.as_ref().map(|c| c.request);
        let stale = remeasure
            || self.pending_order.is_some()
            || current_request != Some(request)
            || generation != self.layout_generation;
        if stale {
            tracing::debug!(request, generation, "discarding outdated pagination");
            if self.phase == Phase::Measuring {
                self.start_measuring();
            }
            return SessionUpdate::Discarded;
        }

        let pages = match result {
            Ok(pages) => pages,
            Err(err) => {
                tracing::warn!(?err, "pagination failed; showing an empty chapter");
                Vec::new()
            }
        };
        self.page_index = match self.target.take() {
            Some(PageTarget::Number(number)) => {
                (number.max(1) as usize).min(pages.len().max(1)) - 1
            }
            Some(PageTarget::Anchor(sequence_index)) => pages
                .iter()
                .position(|page| page.contains(sequence_index))
                .unwrap_or(0),
            None => self.page_index.min(pages.len().saturating_sub(1)),
        };
        self.pages = pages;
        self.pages_generation = generation;
        self.set_phase(Phase::Paginated);
        tracing::info!(
            pages = self.pages.len(),
            page_index = self.page_index,
            font_size = self.settings.font_size,
            "chapter paginated"
        );
        self.record_position().await;

        SessionUpdate::Paginated {
            page_count: self.pages.len(),
            page_index: self.page_index,
        }
    }
}

fn translation_outcome(result: anyhow::Result<Translation>) -> TranslationState {
    match result {
        Ok(translation) => TranslationState::Ready(translation),
        Err(err) => {
            tracing::warn!(?err, "translation failed");
            TranslationState::Failed(format!("{err:#}"))
        }
    }
}
