use std::fmt;
use std::str::FromStr;

use crate::page::Page;
use crate::storage::{Storage, THEME_KEY};

pub const THEME_ATTR: &str = "data-bs-theme";
pub const THEME_TOGGLE_ID: &str = "darkModeToggle";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Theme {
    #[default]
    Light,
    Dark,
}

impl Theme {
    pub fn as_str(self) -> &'static str {
        match self {
            Theme::Light => "light",
            Theme::Dark => "dark",
        }
    }

    pub fn from_checked(checked: bool) -> Self {
        if checked { Theme::Dark } else { Theme::Light }
    }

    pub fn is_dark(self) -> bool {
        self == Theme::Dark
    }
}

impl fmt::Display for Theme {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, thiserror::Error)]
#[error("unknown theme {0:?}")]
pub struct UnknownTheme(String);

impl FromStr for Theme {
    type Err = UnknownTheme;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "light" => Ok(Theme::Light),
            "dark" => Ok(Theme::Dark),
            other => Err(UnknownTheme(other.to_string())),
        }
    }
}

pub fn toggle_checked(page: &Page) -> Option<bool> {
    let toggle = page.element_by_id(THEME_TOGGLE_ID)?;
    let checked = toggle.attributes.borrow().contains("checked");
    Some(checked)
}

fn set_toggle_checked(page: &Page, checked: bool) {
    let Some(toggle) = page.element_by_id(THEME_TOGGLE_ID) else {
        tracing::debug!("page has no #{THEME_TOGGLE_ID}");
        return;
    };
    let mut attrs = toggle.attributes.borrow_mut();
    if checked {
        attrs.insert("checked", String::new());
    } else {
        attrs.remove("checked");
    }
}

// The persisted preference (default light) overrides the root attribute.
pub fn init_theme(page: &Page, storage: &dyn Storage) -> Theme {
    let from_attr = page.root_attribute(THEME_ATTR).as_deref() == Some("dark");
    set_toggle_checked(page, from_attr);

    let theme = match storage.get(THEME_KEY) {
        Some(saved) => saved.parse::<Theme>().unwrap_or_else(|e| {
            tracing::warn!(error = %e, "ignoring persisted theme");
            Theme::default()
        }),
        None => Theme::default(),
    };

    page.set_root_attribute(THEME_ATTR, theme.as_str());
    set_toggle_checked(page, theme.is_dark());
    tracing::debug!(%theme, "theme initialized");
    theme
}

pub fn on_toggle_change(page: &Page, storage: &dyn Storage, checked: bool) -> Theme {
    let theme = Theme::from_checked(checked);
    set_toggle_checked(page, checked);
    page.set_root_attribute(THEME_ATTR, theme.as_str());
    if let Err(e) = storage.set(THEME_KEY, theme.as_str()) {
        tracing::warn!(%theme, error = %e, "failed to persist theme");
    }
    theme
}
