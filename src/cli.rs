use clap::{Args, Parser, Subcommand};

use crate::session::state::{Theme, TranslationService};

#[derive(Debug, Parser)]
#[command(author, version, about)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    Segment(SegmentArgs),
    Paginate(PaginateArgs),
    Read(ReadArgs),
}

#[derive(Debug, Args)]
pub struct SegmentArgs {
    /// Chapter file: a JSON array of paragraphs or a chapter content response.
    #[arg(long)]
    pub input: String,
}

#[derive(Debug, Args)]
pub struct PaginateArgs {
    /// Chapter file: a JSON array of paragraphs or a chapter content response.
    #[arg(long)]
    pub input: String,

    /// Viewport width, including the reader's horizontal padding.
    #[arg(long, default_value_t = 390.0)]
    pub width: f32,

    /// Viewport height, including header and footer.
    #[arg(long, default_value_t = 844.0)]
    pub height: f32,

    #[arg(long, default_value_t = 16.0)]
    pub font_size: f32,
}

#[derive(Debug, Args)]
pub struct ReadArgs {
    #[arg(long)]
    pub book: u64,

    /// Chapter order, starting at 1.
    #[arg(long, default_value_t = 1)]
    pub chapter: u32,

    /// Page to open, starting at 1 (clamped to the chapter's page count).
    #[arg(long)]
    pub page: Option<u32>,

    /// YAML config file.
    #[arg(long)]
    pub config: Option<String>,

    /// Backend base URL (overrides config and LEXIPAGE_API_URL).
    #[arg(long)]
    pub api_url: Option<String>,

    /// Reader settings file (overrides config and LEXIPAGE_SETTINGS_PATH).
    #[arg(long)]
    pub settings: Option<String>,

    /// Change and remember the font size.
    #[arg(long)]
    pub font_size: Option<f32>,

    /// Change and remember the theme.
    #[arg(long, value_enum)]
    pub theme: Option<Theme>,

    /// Change and remember the translation service.
    #[arg(long, value_enum)]
    pub service: Option<TranslationService>,

    /// Look up the first occurrence of this word on the opened page.
    #[arg(long)]
    pub lookup: Option<String>,
}
