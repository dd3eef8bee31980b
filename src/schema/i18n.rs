use camino::Utf8Path;
use std::collections::HashMap;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum TranslationError {
    #[error("Failed to read translation file {path}: {source}")]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse translation file {path}: {source}")]
    Parse {
        path: String,
        #[source]
        source: serde_json::Error,
    },
}

/// True for `$key` references; a lone `$` is plain text
pub fn is_i18n_string(s: &str) -> bool {
    s.len() > 1 && s.starts_with('$')
}

/// Strip the `$` prefix from a reference; other strings pass through
pub fn i18n_key(s: &str) -> &str {
    if is_i18n_string(s) { &s[1..] } else { s }
}

/// Translation table for one language
#[derive(Debug, Clone, Default)]
pub struct I18nResolver {
    translations: HashMap<String, String>,
}

impl I18nResolver {
    pub fn new(translations: HashMap<String, String>) -> Self {
        Self { translations }
    }

    pub fn load(path: &Utf8Path) -> Result<Self, TranslationError> {
        let content = std::fs::read_to_string(path).map_err(|source| TranslationError::Read {
            path: path.to_string(),
            source,
        })?;
        let translations =
            serde_json::from_str(&content).map_err(|source| TranslationError::Parse {
                path: path.to_string(),
                source,
            })?;
        Ok(Self { translations })
    }

    /// Translate a reference, keeping the original text when the key is unknown
    pub fn resolve<'a>(&'a self, s: &'a str) -> &'a str {
        if !is_i18n_string(s) {
            return s;
        }
        self.translations
            .get(i18n_key(s))
            .map(String::as_str)
            .unwrap_or(s)
    }

    pub fn len(&self) -> usize {
        self.translations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.translations.is_empty()
    }
}
