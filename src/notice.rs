use kuchiki::NodeRef;
use kuchiki::iter::NodeIterator as _;
use maud::{Markup, html};

use crate::browser::BrowserEnv;
use crate::page::{Page, parse_single_element};
use crate::storage::{NOTICE_DISMISSED_KEY, Storage};

pub const NOTICE_CLASS: &str = "safari-warning";
pub const DISMISS_BUTTON_ID: &str = "dismissSafariWarning";

pub fn notice_markup() -> Markup {
    html! {
        div {
            div class="safari-warning alert alert-warning alert-dismissible fade show fixed-bottom" role="alert" {
                div class="container" {
                    strong {
                        i class="bi bi-exclamation-triangle-fill" {}
                        " Browser Compatibility Notice:"
                    }
                    " You're using Safari which may not support all features of this website. "
                    "For best experience, we recommend using "
                    a href="https://www.google.com/chrome/" target="_blank" { "Chrome" }
                    ", "
                    a href="https://www.mozilla.org/firefox/" target="_blank" { "Firefox" }
                    ", or "
                    a href="https://www.microsoft.com/edge" target="_blank" { "Edge" }
                    "."
                    button type="button" class="btn-close" data-bs-dismiss="alert" aria-label="Close" id=(DISMISS_BUTTON_ID) {}
                }
            }
        }
    }
}

pub fn notice_present(page: &Page) -> bool {
    page.select_first(&format!(".{NOTICE_CLASS}")).is_some()
}

pub fn show_if_needed(page: &Page, storage: &dyn Storage, env: &BrowserEnv) -> bool {
    if storage.get(NOTICE_DISMISSED_KEY).is_some() {
        tracing::debug!("compatibility notice previously dismissed");
        return false;
    }
    if !env.is_safari() {
        return false;
    }
    if notice_present(page) {
        return false;
    }

    let markup = notice_markup().into_string();
    let Some(banner) = parse_single_element(&markup, "body > div") else {
        tracing::warn!("failed to build compatibility notice");
        return false;
    };
    if !page.prepend_to_body(banner) {
        tracing::warn!("page has no <body>; compatibility notice skipped");
        return false;
    }
    tracing::info!("compatibility notice shown");
    true
}

pub fn dismiss(page: &Page, storage: &dyn Storage) {
    for node in page.select_all(&format!(".{NOTICE_CLASS}")) {
        let node = node.as_node();
        // Drop the wrapper too when the banner is its only element.
        let wrapper = node
            .parent()
            .filter(|p| p.children().elements().count() == 1 && is_plain_div(p));
        match wrapper {
            Some(wrapper) => wrapper.detach(),
            None => node.detach(),
        }
    }
    if let Err(e) = storage.set(NOTICE_DISMISSED_KEY, "true") {
        tracing::warn!(error = %e, "failed to persist notice dismissal");
    }
}

fn is_plain_div(node: &NodeRef) -> bool {
    node.as_element()
        .is_some_and(|el| &*el.name.local == "div" && el.attributes.borrow().map.is_empty())
}
