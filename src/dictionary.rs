use std::collections::HashMap;
use std::path::PathBuf;

use async_trait::async_trait;
use serde_json::Value;

use crate::error::LoadError;

pub const LANGUAGE_NAME_KEY: &str = "language_name";
pub const PAGE_TITLE_KEY: &str = "page_title";

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Dictionary {
    entries: HashMap<String, String>,
}

impl Dictionary {
    pub fn from_json(code: &str, bytes: &[u8]) -> Result<Self, LoadError> {
        let map: serde_json::Map<String, Value> =
            serde_json::from_slice(bytes).map_err(|source| LoadError::Parse {
                code: code.to_string(),
                source,
            })?;

        let mut entries = HashMap::with_capacity(map.len());
        for (key, value) in map {
            match value {
                Value::String(s) => {
                    entries.insert(key, s);
                }
                other => {
                    tracing::debug!(
                        code,
                        key = %key,
                        kind = json_kind(&other),
                        "skipping non-string entry"
                    );
                }
            }
        }
        Ok(Self { entries })
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.entries
            .get(key)
            .map(String::as_str)
            .filter(|v| !v.is_empty())
    }

    pub fn language_name(&self) -> Option<&str> {
        self.get(LANGUAGE_NAME_KEY)
    }

    pub fn page_title(&self) -> Option<&str> {
        self.get(PAGE_TITLE_KEY)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for Dictionary {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self {
            entries: iter
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        }
    }
}

fn json_kind(v: &Value) -> &'static str {
    match v {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

pub fn dictionary_path(code: &str) -> String {
    format!("translations/{code}.json")
}

#[async_trait]
pub trait DictionarySource: Send + Sync {
    async fn fetch(&self, code: &str) -> Result<Dictionary, LoadError>;
}

#[derive(Debug, Clone)]
pub struct DirSource {
    root: PathBuf,
}

impl DirSource {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }
}

#[async_trait]
impl DictionarySource for DirSource {
    async fn fetch(&self, code: &str) -> Result<Dictionary, LoadError> {
        if code.is_empty() || code.contains(['/', '\\']) || code.contains("..") {
            return Err(LoadError::UnusableCode(code.to_string()));
        }
        let path = self.root.join(dictionary_path(code));
        let bytes = tokio::fs::read(&path)
            .await
            .map_err(|source| LoadError::Io { path, source })?;
        Dictionary::from_json(code, &bytes)
    }
}
