use std::io::Write as _;
use std::path::Path;

use anyhow::Context as _;

use crate::cli::{PaginateArgs, SegmentArgs};
use crate::formats::{ChapterContentResponse, ReaderSettings};
use crate::paginate::paginate;
use crate::layout::{LineMeasurer as _, MonospaceMeasurer, flatten_chunks};
use crate::render::render_page;
use crate::segment::segment_paragraphs;
use crate::session::state::{Viewport, clamp_font_size};

pub fn segment(args: SegmentArgs) -> anyhow::Result<()> {
    let paragraphs = read_paragraphs(Path::new(&args.input))?;
    let chunks = segment_paragraphs(&paragraphs);
    tracing::debug!(paragraphs = paragraphs.len(), chunks = chunks.len(), "segmented");

    let mut stdout = std::io::stdout().lock();
    for chunk in &chunks {
        let line = serde_json::to_string(chunk).context("serialize chunk")?;
        writeln!(stdout, "{line}").context("write stdout")?;
    }
    Ok(())
}

pub fn paginate_file(args: PaginateArgs) -> anyhow::Result<()> {
    let paragraphs = read_paragraphs(Path::new(&args.input))?;
    let settings = ReaderSettings {
        font_size: clamp_font_size(args.font_size),
        ..ReaderSettings::default()
    };
    let style = settings.page_style(Viewport {
        width: args.width,
        height: args.height,
    });

    let chunks = segment_paragraphs(&paragraphs);
    let flat = flatten_chunks(&chunks);
    let lines = MonospaceMeasurer::default().measure_lines(&flat.text, &style);
    let pages = paginate(&chunks, &flat, &lines, style.height);
    tracing::info!(
        chunks = chunks.len(),
        lines = lines.len(),
        pages = pages.len(),
        "paginated"
    );

    let mut stdout = std::io::stdout().lock();
    for (index, page) in pages.iter().enumerate() {
        writeln!(stdout, "--- page {} of {} ---", index + 1, pages.len())
            .context("write stdout")?;
        writeln!(stdout, "{}", render_page(page, None)).context("write stdout")?;
    }
    Ok(())
}

/// Accepts either a bare JSON array of paragraphs or a saved chapter content response.
pub fn read_paragraphs(path: &Path) -> anyhow::Result<Vec<String>> {
    let raw = std::fs::read_to_string(path)
        .with_context(|| format!("read chapter file: {}", path.display()))?;
    let value: serde_json::Value = serde_json::from_str(&raw)
        .with_context(|| format!("parse chapter file: {}", path.display()))?;

    if value.is_array() {
        return serde_json::from_value(value).context("parse paragraph array");
    }
    let response: ChapterContentResponse =
        serde_json::from_value(value).context("parse chapter content response")?;
    Ok(response.chapter.content)
}
