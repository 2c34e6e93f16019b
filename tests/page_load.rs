use std::path::Path;
use std::sync::Arc;
use std::time::{Duration, Instant};

use httpmock::Method::GET;
use httpmock::MockServer;
use site_switcher::fetcher::{Fetcher, HttpSource};
use site_switcher::page::Page;
use site_switcher::storage::{FileStorage, LANGUAGE_KEY, MemoryStorage, Storage, THEME_KEY};
use site_switcher::switcher::{LanguageSwitcher, SwitchOutcome, SwitcherOptions};
use tempfile::tempdir;
use url::Url;

const PAGE: &str = r##"<!doctype html>
<html lang="en" data-bs-theme="light">
<head><title>Home</title></head>
<body>
<nav>
  <span id="currentLanguage">English</span>
  <a class="language-option" data-lang="en" href="#">English</a>
  <a class="language-option" data-lang="fr" href="#">Français</a>
  <input type="checkbox" id="darkModeToggle">
</nav>
<h1 data-i18n="heading">Welcome</h1>
<p data-i18n="tagline">Fast and simple</p>
<input data-i18n="search" placeholder="Search">
</body>
</html>"##;

const EN: &str = r#"{"language_name": "English", "page_title": "Home", "heading": "Welcome", "search": "Search"}"#;
const FR: &str = r#"{"language_name": "Français", "page_title": "Accueil", "heading": "Bienvenue", "search": "Rechercher"}"#;

const SAFARI_UA: &str = "Mozilla/5.0 (Macintosh; Intel Mac OS X 14_4) AppleWebKit/605.1.15 (KHTML, like Gecko) Version/17.4 Safari/605.1.15";

fn http_switcher(server: &MockServer, storage: Arc<dyn Storage>) -> LanguageSwitcher {
    let fetcher = Fetcher::new("test-agent").unwrap();
    let source = HttpSource::new(Url::parse(&server.url("/")).unwrap(), fetcher);
    LanguageSwitcher::with_options(
        source,
        storage,
        SwitcherOptions {
            apply_delay: Duration::ZERO,
            ..SwitcherOptions::default()
        },
    )
}

fn text_of(page: &Page, selector: &str) -> String {
    page.select_first(selector).unwrap().as_node().text_contents()
}

#[tokio::test]
async fn dictionary_is_fetched_once_per_code() {
    let server = MockServer::start();
    let fr = server.mock(|when, then| {
        when.method(GET).path("/translations/fr.json");
        then.status(200)
            .header("Content-Type", "application/json")
            .body(FR);
    });

    let storage = Arc::new(MemoryStorage::new());
    let switcher = http_switcher(&server, storage.clone());
    let page = Page::parse(PAGE);

    for _ in 0..2 {
        let outcome = switcher.switch_language(&page, "fr").await;
        assert_eq!(outcome.applied_code(), Some("fr"));
    }
    fr.assert_hits(1);

    assert_eq!(text_of(&page, "h1"), "Bienvenue");
    assert_eq!(text_of(&page, "p"), "Fast and simple");
    assert_eq!(text_of(&page, "#currentLanguage"), "Français");
    assert_eq!(page.title().as_deref(), Some("Accueil"));
    assert_eq!(page.lang().as_deref(), Some("fr"));
    assert_eq!(storage.get(LANGUAGE_KEY).as_deref(), Some("fr"));
}

#[tokio::test]
async fn missing_dictionary_falls_back_to_english() {
    let server = MockServer::start();
    let de = server.mock(|when, then| {
        when.method(GET).path("/translations/de.json");
        then.status(404);
    });
    let en = server.mock(|when, then| {
        when.method(GET).path("/translations/en.json");
        then.status(200)
            .header("Content-Type", "application/json")
            .body(EN);
    });

    let storage = Arc::new(MemoryStorage::new());
    let switcher = http_switcher(&server, storage.clone());
    let page = Page::parse(PAGE);

    let outcome = switcher.switch_language(&page, "de").await;
    assert!(matches!(
        &outcome,
        SwitchOutcome::FellBack { requested, applied, .. } if requested == "de" && applied == "en"
    ));
    assert_eq!(storage.get(LANGUAGE_KEY).as_deref(), Some("en"));
    assert_eq!(page.lang().as_deref(), Some("en"));

    // Failures are not cached; successes are.
    switcher.switch_language(&page, "de").await;
    de.assert_hits(2);
    en.assert_hits(1);
}

#[tokio::test]
async fn failing_default_leaves_state_untouched() {
    let server = MockServer::start();
    let en = server.mock(|when, then| {
        when.method(GET).path("/translations/en.json");
        then.status(500);
    });

    let storage = Arc::new(MemoryStorage::new());
    storage.set(LANGUAGE_KEY, "fr").unwrap();
    let switcher = http_switcher(&server, storage.clone());
    let page = Page::parse(PAGE);

    let outcome = switcher.switch_language(&page, "en").await;
    assert_eq!(
        outcome,
        SwitchOutcome::Failed {
            requested: "en".to_string()
        }
    );
    en.assert_hits(1);
    assert_eq!(storage.get(LANGUAGE_KEY).as_deref(), Some("fr"));
    assert_eq!(text_of(&page, "h1"), "Welcome");
    assert_eq!(page.lang().as_deref(), Some("en"));
}

#[tokio::test]
async fn unavailable_dictionary_falls_back_without_retrying() {
    let server = MockServer::start();
    let fr = server.mock(|when, then| {
        when.method(GET).path("/translations/fr.json");
        then.status(503).header("Retry-After", "30");
    });
    let en = server.mock(|when, then| {
        when.method(GET).path("/translations/en.json");
        then.status(200).body(EN);
    });

    let storage = Arc::new(MemoryStorage::new());
    let switcher = http_switcher(&server, storage.clone());
    let page = Page::parse(PAGE);

    let started = Instant::now();
    let outcome = switcher.switch_language(&page, "fr").await;
    assert!(started.elapsed() < Duration::from_secs(5));
    assert!(matches!(
        &outcome,
        SwitchOutcome::FellBack { requested, applied, .. } if requested == "fr" && applied == "en"
    ));
    fr.assert_hits(1);
    en.assert_hits(1);
    assert_eq!(storage.get(LANGUAGE_KEY).as_deref(), Some("en"));
}

#[tokio::test]
async fn malformed_dictionary_counts_as_missing() {
    let server = MockServer::start();
    server.mock(|when, then| {
        when.method(GET).path("/translations/fr.json");
        then.status(200).body("not json");
    });
    server.mock(|when, then| {
        when.method(GET).path("/translations/en.json");
        then.status(200).body(EN);
    });

    let storage = Arc::new(MemoryStorage::new());
    let switcher = http_switcher(&server, storage.clone());
    let page = Page::parse(PAGE);

    let outcome = switcher.switch_language(&page, "fr").await;
    assert_eq!(outcome.applied_code(), Some("en"));
}

fn write_site(root: &Path) -> std::path::PathBuf {
    std::fs::create_dir_all(root.join("translations")).unwrap();
    std::fs::write(root.join("translations/en.json"), EN).unwrap();
    std::fs::write(root.join("translations/fr.json"), FR).unwrap();
    let page = root.join("index.html");
    std::fs::write(&page, PAGE).unwrap();
    page
}

fn cli_args(page: &Path, state: &Path, out: &Path) -> site_switcher::CliArgs {
    site_switcher::CliArgs {
        page: page.to_path_buf(),
        site_dir: None,
        site_url: None,
        state: Some(state.to_path_buf()),
        out: Some(out.to_path_buf()),
        browser_locale: Some("en-US".to_string()),
        user_agent: SAFARI_UA.to_string(),
        ms_stream: false,
        select: None,
        dark: None,
        dismiss_notice: false,
        apply_delay_ms: 0,
        http_user_agent: "test-agent".to_string(),
    }
}

#[tokio::test]
async fn repeated_page_loads_keep_preferences() {
    let tmp = tempdir().unwrap();
    let page = write_site(tmp.path());
    let state = tmp.path().join("state.json");
    let out = tmp.path().join("out/index.html");

    // First visit: pick French, go dark.
    let mut args = cli_args(&page, &state, &out);
    args.select = Some("fr".to_string());
    args.dark = Some(true);
    site_switcher::run(args).await.unwrap();

    let rendered = Page::parse(&std::fs::read_to_string(&out).unwrap());
    assert_eq!(text_of(&rendered, "h1"), "Bienvenue");
    assert_eq!(rendered.lang().as_deref(), Some("fr"));
    assert_eq!(rendered.root_attribute("data-bs-theme").as_deref(), Some("dark"));
    assert_eq!(rendered.select_all(".safari-warning").len(), 1);

    let stored = FileStorage::open(&state).unwrap();
    assert_eq!(stored.get(LANGUAGE_KEY).as_deref(), Some("fr"));
    assert_eq!(stored.get(THEME_KEY).as_deref(), Some("dark"));

    // Second visit: preferences restored, banner shown again until dismissed.
    let mut args = cli_args(&page, &state, &out);
    args.dismiss_notice = true;
    site_switcher::run(args).await.unwrap();

    let rendered = Page::parse(&std::fs::read_to_string(&out).unwrap());
    assert_eq!(text_of(&rendered, "h1"), "Bienvenue");
    let toggle = rendered.element_by_id("darkModeToggle").unwrap();
    assert!(toggle.attributes.borrow().contains("checked"));
    assert!(rendered.select_all(".safari-warning").is_empty());

    // Third visit: the dismissal sticks.
    site_switcher::run(cli_args(&page, &state, &out)).await.unwrap();
    let html = std::fs::read_to_string(&out).unwrap();
    assert!(!html.contains("safari-warning"));
    assert!(html.contains("Bienvenue"));
}

#[tokio::test]
async fn unknown_locale_without_preference_falls_back() {
    let tmp = tempdir().unwrap();
    let page = write_site(tmp.path());
    let state = tmp.path().join("state.json");
    let out = tmp.path().join("index.out.html");

    let mut args = cli_args(&page, &state, &out);
    args.browser_locale = Some("ja-JP".to_string());
    args.user_agent = String::new();
    site_switcher::run(args).await.unwrap();

    let rendered = Page::parse(&std::fs::read_to_string(&out).unwrap());
    assert_eq!(rendered.lang().as_deref(), Some("en"));
    assert_eq!(text_of(&rendered, "#currentLanguage"), "English");
    assert!(rendered.select_all(".safari-warning").is_empty());

    let stored = FileStorage::open(&state).unwrap();
    assert_eq!(stored.get(LANGUAGE_KEY).as_deref(), Some("en"));
    assert_eq!(stored.get(THEME_KEY), None);
}
