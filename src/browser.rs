use std::sync::LazyLock;

use regex::Regex;

static SAFARI: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)safari").expect("safari regex"));
static NOT_SAFARI: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)chrome|android|crios|fxios").expect("exclusion regex"));
static IOS_DEVICE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"iPad|iPhone|iPod").expect("ios regex"));

#[derive(Debug, Clone, Default)]
pub struct BrowserEnv {
    pub user_agent: String,
    // `window.MSStream`: old IE Mobile spoofing an iPhone UA.
    pub ms_stream: bool,
}

impl BrowserEnv {
    pub fn new(user_agent: impl Into<String>) -> Self {
        Self {
            user_agent: user_agent.into(),
            ms_stream: false,
        }
    }

    pub fn is_safari(&self) -> bool {
        is_safari_browser(&self.user_agent, self.ms_stream)
    }
}

pub fn is_safari_browser(user_agent: &str, ms_stream: bool) -> bool {
    looks_like_safari(user_agent)
        || (IOS_DEVICE.is_match(user_agent) && user_agent.contains("AppleWebKit") && !ms_stream)
}

pub fn is_safari_user_agent(user_agent: &str) -> bool {
    is_safari_browser(user_agent, false)
}

fn looks_like_safari(user_agent: &str) -> bool {
    let Some(safari) = SAFARI.find(user_agent) else {
        return false;
    };
    // A later `safari` match has a strictly longer prefix, so only the first can qualify.
    !NOT_SAFARI
        .find_iter(user_agent)
        .any(|m| m.start() < safari.start())
}
