use std::sync::Arc;
use std::time::Duration;

use kuchiki::{Attributes, ElementData, NodeDataRef, NodeRef};

use crate::cache::TranslationCache;
use crate::dictionary::{Dictionary, DictionarySource};
use crate::error::{ElementError, LoadError};
use crate::page::{Page, set_text_content};
use crate::storage::{LANGUAGE_KEY, Storage};

pub const TRANSLATION_KEY_ATTR: &str = "data-i18n";
pub const LANGUAGE_CODE_ATTR: &str = "data-lang";
pub const LANGUAGE_OPTION_SELECTOR: &str = ".language-option";
pub const LANGUAGE_DISPLAY_ID: &str = "currentLanguage";
pub const DEFAULT_LANGUAGE: &str = "en";
pub const DEFAULT_APPLY_DELAY: Duration = Duration::from_millis(50);

const VOID_ELEMENTS: &[&str] = &[
    "area", "base", "br", "col", "embed", "hr", "img", "input", "link", "meta", "source", "track",
    "wbr",
];
const PLACEHOLDER_ELEMENTS: &[&str] = &["input", "textarea"];
const ALT_ELEMENTS: &[&str] = &["img", "area", "input"];

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FallbackPolicy {
    pub target: String,
    // 0 disables the fallback; there is one target, so >1 behaves like 1.
    pub max_depth: usize,
}

impl Default for FallbackPolicy {
    fn default() -> Self {
        Self {
            target: DEFAULT_LANGUAGE.to_string(),
            max_depth: 1,
        }
    }
}

impl FallbackPolicy {
    pub fn attempts<'a>(&'a self, requested: &'a str) -> Vec<&'a str> {
        let mut codes = vec![requested];
        if self.max_depth > 0 && requested != self.target {
            codes.push(self.target.as_str());
        }
        codes
    }
}

#[derive(Debug, Clone)]
pub struct SwitcherOptions {
    pub fallback: FallbackPolicy,
    pub apply_delay: Duration,
}

impl Default for SwitcherOptions {
    fn default() -> Self {
        Self {
            fallback: FallbackPolicy::default(),
            apply_delay: DEFAULT_APPLY_DELAY,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ApplyReport {
    pub translated: usize,
    pub missing: usize,
    pub failed: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SwitchOutcome {
    Applied {
        code: String,
        report: ApplyReport,
    },
    FellBack {
        requested: String,
        applied: String,
        report: ApplyReport,
    },
    Failed {
        requested: String,
    },
}

impl SwitchOutcome {
    pub fn applied_code(&self) -> Option<&str> {
        match self {
            SwitchOutcome::Applied { code, .. } => Some(code),
            SwitchOutcome::FellBack { applied, .. } => Some(applied),
            SwitchOutcome::Failed { .. } => None,
        }
    }
}

pub fn apply_dictionary(page: &Page, dict: &Dictionary) -> ApplyReport {
    let mut report = ApplyReport::default();

    for node in page.select_all(&format!("[{TRANSLATION_KEY_ATTR}]")) {
        let key = match node.attributes.try_borrow() {
            Ok(attrs) => attrs.get(TRANSLATION_KEY_ATTR).unwrap_or("").to_string(),
            Err(_) => {
                let element = node.name.local.to_string();
                tracing::warn!(%element, "failed to read translation key");
                report.failed.push(element);
                continue;
            }
        };

        let Some(value) = dict.get(&key) else {
            report.missing += 1;
            continue;
        };

        match apply_to_element(&node, value) {
            Ok(()) => report.translated += 1,
            Err(e) => {
                tracing::warn!(key, error = %e, "failed to update element");
                report.failed.push(key);
            }
        }
    }

    if let Some(title) = dict.page_title() {
        page.set_title(title);
    }

    report
}

fn apply_to_element(node: &NodeDataRef<ElementData>, value: &str) -> Result<(), ElementError> {
    let name: &str = &node.name.local;
    let mut attrs = node
        .attributes
        .try_borrow_mut()
        .map_err(|_| ElementError::AttributesBusy {
            element: name.to_string(),
        })?;

    if !VOID_ELEMENTS.contains(&name) {
        set_text_content(node.as_node(), value);
    }
    if PLACEHOLDER_ELEMENTS.contains(&name) && has_value(&attrs, "placeholder") {
        attrs.insert("placeholder", value.to_string());
    }
    if ALT_ELEMENTS.contains(&name) && has_value(&attrs, "alt") {
        attrs.insert("alt", value.to_string());
    }
    Ok(())
}

fn has_value(attrs: &Attributes, name: &str) -> bool {
    attrs.get(name).is_some_and(|v| !v.is_empty())
}

pub fn initial_language(storage: &dyn Storage, browser_locale: Option<&str>) -> String {
    if let Some(saved) = storage.get(LANGUAGE_KEY).filter(|s| !s.is_empty()) {
        return saved;
    }
    browser_locale
        .and_then(|locale| locale.split(['-', '_']).next())
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .unwrap_or_else(|| DEFAULT_LANGUAGE.to_string())
}

#[derive(Debug, Clone)]
pub struct ClickEvent {
    target: NodeRef,
    default_prevented: bool,
}

impl ClickEvent {
    pub fn new(target: NodeRef) -> Self {
        Self {
            target,
            default_prevented: false,
        }
    }

    pub fn target(&self) -> &NodeRef {
        &self.target
    }

    pub fn prevent_default(&mut self) {
        self.default_prevented = true;
    }

    pub fn default_prevented(&self) -> bool {
        self.default_prevented
    }
}

#[derive(Debug, Clone)]
pub struct LanguageOption {
    element: NodeRef,
    code: Option<String>,
}

impl LanguageOption {
    pub fn code(&self) -> Option<&str> {
        self.code.as_deref()
    }

    pub fn click(&self) -> ClickEvent {
        ClickEvent::new(self.element.clone())
    }
}

pub fn language_options(page: &Page) -> Vec<LanguageOption> {
    page.select_all(LANGUAGE_OPTION_SELECTOR)
        .into_iter()
        .map(|node| {
            let code = node
                .attributes
                .borrow()
                .get(LANGUAGE_CODE_ATTR)
                .map(str::to_string);
            LanguageOption {
                element: node.as_node().clone(),
                code,
            }
        })
        .collect()
}

pub struct LanguageSwitcher {
    source: Box<dyn DictionarySource>,
    cache: TranslationCache,
    storage: Arc<dyn Storage>,
    options: SwitcherOptions,
}

impl LanguageSwitcher {
    pub fn new(source: impl DictionarySource + 'static, storage: Arc<dyn Storage>) -> Self {
        Self::with_options(source, storage, SwitcherOptions::default())
    }

    pub fn with_options(
        source: impl DictionarySource + 'static,
        storage: Arc<dyn Storage>,
        options: SwitcherOptions,
    ) -> Self {
        Self {
            source: Box::new(source),
            cache: TranslationCache::new(),
            storage,
            options,
        }
    }

    pub async fn load(&self, code: &str) -> Result<Arc<Dictionary>, LoadError> {
        if code.is_empty() {
            return Err(LoadError::UnusableCode(String::new()));
        }
        self.cache
            .get_or_load(code, || self.source.fetch(code))
            .await
    }

    // A terminal failure leaves the page and the persisted language untouched.
    pub async fn switch_language(&self, page: &Page, code: &str) -> SwitchOutcome {
        for attempt in self.options.fallback.attempts(code) {
            if attempt != code {
                tracing::info!(requested = code, fallback = attempt, "falling back");
            }
            match self.load(attempt).await {
                Ok(dict) => {
                    let report = self.apply(page, attempt, &dict);
                    return if attempt == code {
                        SwitchOutcome::Applied {
                            code: code.to_string(),
                            report,
                        }
                    } else {
                        SwitchOutcome::FellBack {
                            requested: code.to_string(),
                            applied: attempt.to_string(),
                            report,
                        }
                    };
                }
                Err(e) => {
                    tracing::error!(code = attempt, error = %e, "error loading translations");
                }
            }
        }

        SwitchOutcome::Failed {
            requested: code.to_string(),
        }
    }

    fn apply(&self, page: &Page, code: &str, dict: &Dictionary) -> ApplyReport {
        let report = apply_dictionary(page, dict);

        if let (Some(display), Some(name)) =
            (page.element_by_id(LANGUAGE_DISPLAY_ID), dict.language_name())
        {
            set_text_content(display.as_node(), name);
        }

        if let Err(e) = self.storage.set(LANGUAGE_KEY, code) {
            tracing::warn!(code, error = %e, "failed to persist language");
        }
        page.set_lang(code);

        tracing::info!(
            code,
            translated = report.translated,
            missing = report.missing,
            failed = report.failed.len(),
            "language applied"
        );
        report
    }

    pub async fn init(&self, page: &Page, browser_locale: Option<&str>) -> SwitchOutcome {
        let code = initial_language(self.storage.as_ref(), browser_locale);
        tracing::debug!(
            code,
            delay_ms = self.options.apply_delay.as_millis(),
            "initial language"
        );
        if !self.options.apply_delay.is_zero() {
            tokio::time::sleep(self.options.apply_delay).await;
        }
        self.switch_language(page, &code).await
    }

    pub async fn on_option_click(&self, page: &Page, event: &mut ClickEvent) -> SwitchOutcome {
        event.prevent_default();
        let code = event
            .target()
            .as_element()
            .and_then(|el| {
                el.attributes
                    .borrow()
                    .get(LANGUAGE_CODE_ATTR)
                    .map(str::to_string)
            })
            .unwrap_or_else(|| {
                tracing::warn!("language option has no {LANGUAGE_CODE_ATTR}");
                String::new()
            });
        self.switch_language(page, &code).await
    }

    pub async fn select(&self, page: &Page, code: &str) -> SwitchOutcome {
        let option = language_options(page)
            .into_iter()
            .find(|o| o.code() == Some(code));
        match option {
            Some(option) => self.on_option_click(page, &mut option.click()).await,
            None => {
                tracing::debug!(code, "no language option for code; switching directly");
                self.switch_language(page, code).await
            }
        }
    }
}
