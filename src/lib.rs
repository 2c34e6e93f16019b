pub mod browser;
pub mod cache;
mod cli;
pub mod dictionary;
pub mod error;
pub mod fetcher;
pub mod notice;
pub mod page;
pub mod storage;
pub mod switcher;
pub mod theme;

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Context as _;

use browser::BrowserEnv;
use dictionary::DirSource;
use fetcher::{Fetcher, HttpSource};
use page::Page;
use storage::{FileStorage, MemoryStorage, Storage};
use switcher::{LanguageSwitcher, SwitcherOptions};

pub use cli::Args as CliArgs;

pub async fn run(args: CliArgs) -> anyhow::Result<()> {
    let html = std::fs::read_to_string(&args.page)
        .with_context(|| format!("read {}", args.page.display()))?;
    let page = Page::parse(&html);

    let storage: Arc<dyn Storage> = match &args.state {
        Some(path) => Arc::new(FileStorage::open(path)?),
        None => Arc::new(MemoryStorage::new()),
    };

    let options = SwitcherOptions {
        apply_delay: Duration::from_millis(args.apply_delay_ms),
        ..SwitcherOptions::default()
    };
    let switcher = match &args.site_url {
        Some(url) => {
            let fetcher = Fetcher::new(&args.http_user_agent)?;
            LanguageSwitcher::with_options(
                HttpSource::new(url.clone(), fetcher),
                storage.clone(),
                options,
            )
        }
        None => {
            let root = args.site_dir.clone().unwrap_or_else(|| page_dir(&args));
            tracing::debug!(root = %root.display(), "reading dictionaries from disk");
            LanguageSwitcher::with_options(DirSource::new(root), storage.clone(), options)
        }
    };

    // Script load.
    theme::init_theme(&page, storage.as_ref());
    let env = BrowserEnv {
        user_agent: args.user_agent.clone(),
        ms_stream: args.ms_stream,
    };
    notice::show_if_needed(&page, storage.as_ref(), &env);

    // Page ready.
    let locale = args.browser_locale.clone().or_else(sys_locale::get_locale);
    let outcome = switcher.init(&page, locale.as_deref()).await;
    tracing::debug!(?outcome, "initial language");

    // User actions.
    if let Some(code) = &args.select {
        let outcome = switcher.select(&page, code).await;
        tracing::debug!(?outcome, "language selected");
    }
    if let Some(dark) = args.dark {
        theme::on_toggle_change(&page, storage.as_ref(), dark);
    }
    if args.dismiss_notice {
        notice::dismiss(&page, storage.as_ref());
    }

    let out = page.to_html()?;
    match &args.out {
        Some(path) => {
            if let Some(parent) = path.parent() {
                if !parent.as_os_str().is_empty() {
                    std::fs::create_dir_all(parent)
                        .with_context(|| format!("create {}", parent.display()))?;
                }
            }
            std::fs::write(path, out).with_context(|| format!("write {}", path.display()))?;
        }
        None => {
            use std::io::Write as _;
            std::io::stdout()
                .write_all(out.as_bytes())
                .context("write page to stdout")?;
        }
    }
    Ok(())
}

fn page_dir(args: &CliArgs) -> PathBuf {
    args.page
        .parent()
        .filter(|p| !p.as_os_str().is_empty())
        .map(|p| p.to_path_buf())
        .unwrap_or_else(|| PathBuf::from("."))
}
