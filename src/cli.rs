use std::path::PathBuf;

use clap::Parser;
use url::Url;

#[derive(Debug, Parser)]
#[command(author, version, about)]
pub struct Args {
    /// HTML page to load.
    #[arg(long)]
    pub page: PathBuf,

    /// Directory holding `translations/<code>.json`. Defaults to the page's directory.
    #[arg(long, conflicts_with = "site_url")]
    pub site_dir: Option<PathBuf>,

    /// Site URL to fetch `translations/<code>.json` from instead of a local directory.
    #[arg(long)]
    pub site_url: Option<Url>,

    /// JSON file persisting preferences across runs. In-memory when omitted.
    #[arg(long)]
    pub state: Option<PathBuf>,

    /// Output HTML path. Writes to stdout when omitted.
    #[arg(long)]
    pub out: Option<PathBuf>,

    /// Browser-reported locale (e.g. `fr-CA`). Defaults to the system locale.
    #[arg(long)]
    pub browser_locale: Option<String>,

    /// Simulated browser User-Agent, used for the Safari notice.
    #[arg(long, default_value = "")]
    pub user_agent: String,

    /// Simulate a browser that defines `window.MSStream`.
    #[arg(long)]
    pub ms_stream: bool,

    /// After initialization, click the language option for this code.
    #[arg(long)]
    pub select: Option<String>,

    /// After initialization, set the dark-mode checkbox to this state.
    #[arg(long)]
    pub dark: Option<bool>,

    /// Click the compatibility notice's close control.
    #[arg(long)]
    pub dismiss_notice: bool,

    /// Delay before the initial language is applied, in milliseconds.
    #[arg(long, default_value_t = 50)]
    pub apply_delay_ms: u64,

    /// HTTP User-Agent used for fetching dictionaries with `--site-url`.
    #[arg(long, default_value = "site-switcher/0.1")]
    pub http_user_agent: String,
}
