use std::io::Write as _;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use anyhow::Context as _;

use crate::api::{HttpBackend, ReaderBackend};
use crate::cli::ReadArgs;
use crate::config::ReaderConfig;
use crate::formats::ReadingPosition;
use crate::layout::MonospaceMeasurer;
use crate::render::{find_word, page_header, render_page};
use crate::session::state::Phase;
use crate::session::translation::TranslationState;
use crate::session::{ReadingSession, SessionOptions, SessionUpdate};
use crate::settings_store::{LocalFsSettingsStore, SettingsStore};

const WAIT_TIMEOUT: Duration = Duration::from_secs(30);

pub async fn run(args: ReadArgs) -> anyhow::Result<()> {
    let mut config =
        ReaderConfig::load(args.config.as_deref().map(Path::new)).context("load config")?;
    if let Some(url) = &args.api_url {
        config.api_base_url = url.clone();
    }
    if let Some(path) = &args.settings {
        config.settings_path = PathBuf::from(path);
    }

    let store = Arc::new(LocalFsSettingsStore::new(&config.settings_path));
    if let Some(saved) = store.load().await.context("load reader settings")? {
        tracing::debug!(?saved, "using saved reader settings");
        config.font_size = saved.font_size;
        config.theme = saved.theme;
        config.translation_service = saved.translation_service;
    }

    let backend: Arc<dyn ReaderBackend> = Arc::new(
        HttpBackend::new(&config.api_base_url, config.api_token.clone())
            .context("build backend client")?,
    );
    let mut session = ReadingSession::new(
        SessionOptions::from_config(args.book, &config),
        backend,
        Arc::new(MonospaceMeasurer::default()),
    )
    .with_settings_store(store);

    if let Some(font_size) = args.font_size {
        session.on_font_size_changed(font_size).await;
    }
    if let Some(theme) = args.theme {
        session.on_theme_changed(theme).await;
    }
    if let Some(service) = args.service {
        session.set_translation_service(service).await;
    }

    let resume = args.page.map(|page_number| ReadingPosition {
        chapter_order: args.chapter,
        page_number,
    });
    session.open(args.chapter, resume);
    let outcome = show_chapter(&mut session, args.lookup.as_deref()).await;

    session.close().await;
    outcome
}

async fn show_chapter(session: &mut ReadingSession, lookup: Option<&str>) -> anyhow::Result<()> {
    wait_for(session, |update, session| match update {
        SessionUpdate::ChapterFailed { .. } => Some(Err(anyhow::anyhow!(
            session
                .take_notice()
                .unwrap_or_else(|| "chapter failed to load".to_owned())
        ))),
        SessionUpdate::Paginated { .. } if session.phase() == Phase::Paginated => Some(Ok(())),
        _ => None,
    })
    .await?;

    let metadata = session
        .current_chapter_metadata()
        .context("chapter metadata missing after pagination")?;
    let mut stdout = std::io::stdout().lock();
    writeln!(
        stdout,
        "{}",
        page_header(
            metadata,
            session.current_page_index(),
            session.current_pages().len()
        )
    )
    .context("write stdout")?;
    if let Some(page) = session.current_page() {
        writeln!(stdout, "{}", render_page(page, None)).context("write stdout")?;
    }
    drop(stdout);

    let Some(word) = lookup else {
        return Ok(());
    };
    let (text, selection) = session
        .current_page()
        .and_then(|page| find_word(page, word))
        .map(|(text, selection)| (text.to_owned(), selection))
        .with_context(|| format!("word not found on this page: {word}"))?;
    if !session.on_word_tapped(&text, selection.sequence_index, selection.word_index) {
        anyhow::bail!("nothing to look up in {text:?}");
    }
    if !lookup_settled(session) {
        wait_for(session, |update, session| match update {
            SessionUpdate::WordTranslation { .. } if lookup_settled(session) => Some(Ok(())),
            _ => None,
        })
        .await?;
    }

    let (lookup, state) = session
        .word_lookup()
        .context("word lookup was dismissed")?;
    let line = match state {
        Some(TranslationState::Ready(translation)) => {
            let mut line = format!("{} -> {}", lookup.word, translation.translated_text);
            if !translation.alternatives.is_empty() {
                line.push_str(&format!(" ({})", translation.alternatives.join(", ")));
            }
            line
        }
        Some(TranslationState::Failed(message)) => {
            format!("{}: translation failed: {message}", lookup.word)
        }
        Some(TranslationState::InFlight) | None => {
            anyhow::bail!("translation for {} did not finish", lookup.word)
        }
    };
    writeln!(std::io::stdout().lock(), "{line}").context("write stdout")?;
    Ok(())
}

fn lookup_settled(session: &ReadingSession) -> bool {
    session
        .word_lookup()
        .and_then(|(_, state)| state)
        .is_some_and(|state| !state.is_in_flight())
}

async fn wait_for<F>(session: &mut ReadingSession, mut done: F) -> anyhow::Result<()>
where
    F: FnMut(&SessionUpdate, &mut ReadingSession) -> Option<anyhow::Result<()>>,
{
    loop {
        let update = tokio::time::timeout(WAIT_TIMEOUT, session.next_update())
            .await
            .context("timed out waiting for the reader")?
            .context("reader event channel closed")?;
        if let Some(result) = done(&update, session) {
            return result;
        }
    }
}
