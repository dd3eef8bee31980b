//! Project schema loading and validation.
//!
//! A schema file (`interface.json`) describes the controllers, resources,
//! tasks and option tree of one automation project. Loading is two-stage:
//! the version discriminator is probed first, then a v2 document is
//! deserialized into [`raw`] mirror structs and converted into the typed
//! [`Interface`] by [`validate`], which fails on the first violation.
//!
//! [`LoadedInterface`] bundles the validated interface with the translation
//! tables declared in its `languages` map.

pub mod i18n;
mod raw;
mod validate;

pub use i18n::{I18nResolver, TranslationError, i18n_key, is_i18n_string};

use crate::models::Interface;
use camino::{Utf8Path, Utf8PathBuf};
use std::collections::HashMap;
use thiserror::Error;
use tracing::{debug, info, warn};

#[derive(Error, Debug)]
pub enum SchemaError {
    #[error("Failed to read schema file {path}: {source}")]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse schema JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Unknown interface version: {0}")]
    UnknownVersion(i64),

    #[error("Interface version 1 is not supported")]
    UnsupportedVersion,

    #[error("Version mismatch: expected 2, got {0}")]
    VersionMismatch(i64),

    #[error("Missing required field: name")]
    MissingName,

    #[error("controller[{index}]: missing name")]
    ControllerMissingName { index: usize },

    #[error("controller[{index}]: duplicate name: {name}")]
    DuplicateController { index: usize, name: String },

    #[error("controller[{index}]: invalid type: {kind}")]
    InvalidControllerType { index: usize, kind: String },

    #[error("controller[{index}]: display options are exclusive")]
    DisplayExclusive { index: usize },

    #[error("resource[{index}]: missing name")]
    ResourceMissingName { index: usize },

    #[error("resource[{index}]: duplicate name: {name}")]
    DuplicateResource { index: usize, name: String },

    #[error("resource[{index}]: missing path")]
    ResourceMissingPath { index: usize },

    #[error("resource[{index}]: reference to non-existent controller: {name}")]
    UnknownController { index: usize, name: String },

    #[error("agent: missing child_exec")]
    AgentMissingExec,

    #[error("task[{index}]: missing name")]
    TaskMissingName { index: usize },

    #[error("task[{index}]: missing entry")]
    TaskMissingEntry { index: usize },

    #[error("task[{index}]: reference to non-existent resource: {name}")]
    UnknownResource { index: usize, name: String },

    #[error("task[{index}]: reference to non-existent option: {name}")]
    UnknownTaskOption { index: usize, name: String },

    #[error("option[{option}]: invalid type: {kind}")]
    InvalidOptionType { option: String, kind: String },

    #[error("option[{option}]: missing cases")]
    MissingCases { option: String },

    #[error("option[{option}]: switch must have 2 cases, found {count}")]
    SwitchCaseCount { option: String, count: usize },

    #[error("option[{option}].cases[{index}]: missing name")]
    CaseMissingName { option: String, index: usize },

    #[error("option[{option}].cases[{index}]: reference to non-existent option: {name}")]
    UnknownCaseOption {
        option: String,
        index: usize,
        name: String,
    },

    #[error("option[{option}]: default_case does not exist: {name}")]
    UnknownDefaultCase { option: String, name: String },

    #[error("option[{option}]: missing inputs")]
    MissingInputs { option: String },

    #[error("option[{option}].inputs[{index}]: missing name")]
    InputMissingName { option: String, index: usize },

    #[error("option[{option}].inputs[{index}]: invalid regex: {source}")]
    InvalidInputPattern {
        option: String,
        index: usize,
        #[source]
        source: regex::Error,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InterfaceVersion {
    V1,
    V2,
}

/// Probe `interface_version` (absent means 0). 0 and 1 are v1, 2 is v2.
pub fn detect_version(data: &[u8]) -> Result<InterfaceVersion, SchemaError> {
    let probe: raw::VersionProbe = serde_json::from_slice(data)?;
    match probe.interface_version {
        0 | 1 => Ok(InterfaceVersion::V1),
        2 => Ok(InterfaceVersion::V2),
        other => Err(SchemaError::UnknownVersion(other)),
    }
}

/// Parse and validate a v2 document without version probing
pub fn parse_v2(data: &[u8]) -> Result<Interface, SchemaError> {
    let raw: raw::RawInterface = serde_json::from_slice(data)?;
    validate::validate_v2(raw)
}

/// Detect the version and parse a supported schema
pub fn parse_interface(data: &[u8]) -> Result<Interface, SchemaError> {
    match detect_version(data)? {
        InterfaceVersion::V1 => Err(SchemaError::UnsupportedVersion),
        InterfaceVersion::V2 => parse_v2(data),
    }
}

/// A validated interface plus its per-language translation tables
#[derive(Debug)]
pub struct LoadedInterface {
    pub interface: Interface,
    resolvers: HashMap<String, I18nResolver>,
    base_path: Utf8PathBuf,
}

impl LoadedInterface {
    /// Wrap an already parsed interface without translations
    pub fn new(interface: Interface, base_path: impl Into<Utf8PathBuf>) -> Self {
        Self {
            interface,
            resolvers: HashMap::new(),
            base_path: base_path.into(),
        }
    }

    /// Load a schema file and every translation file it declares.
    ///
    /// Translation files resolve relative to the schema's directory. A
    /// translation file that cannot be loaded is skipped.
    pub fn load_from_file(path: &Utf8Path) -> Result<Self, SchemaError> {
        let data = std::fs::read(path).map_err(|source| SchemaError::Read {
            path: path.to_string(),
            source,
        })?;
        let interface = parse_interface(&data)?;

        let base_path = path
            .parent()
            .map(Utf8Path::to_path_buf)
            .unwrap_or_default();

        let mut resolvers = HashMap::new();
        for (lang, file) in &interface.languages {
            let full_path = base_path.join(file);
            match I18nResolver::load(&full_path) {
                Ok(resolver) => {
                    debug!("Loaded {} translations for {}", resolver.len(), lang);
                    resolvers.insert(lang.clone(), resolver);
                }
                Err(e) => warn!("Skipping translations for {}: {}", lang, e),
            }
        }

        info!(
            "Loaded interface {} ({} tasks, {} options)",
            interface.name,
            interface.tasks.len(),
            interface.options.len()
        );

        Ok(Self {
            interface,
            resolvers,
            base_path,
        })
    }

    pub fn with_resolver(mut self, lang: impl Into<String>, resolver: I18nResolver) -> Self {
        self.resolvers.insert(lang.into(), resolver);
        self
    }

    /// Directory the schema was loaded from
    pub fn base_path(&self) -> &Utf8Path {
        &self.base_path
    }

    /// Declared languages, in declaration order
    pub fn languages(&self) -> Vec<&str> {
        self.interface.languages.keys().map(String::as_str).collect()
    }

    /// Resolve a display string for `lang`.
    ///
    /// Non-references pass through. For a loaded language the translation is
    /// used when present, otherwise the original text. For a language with
    /// no loaded table the bare key is returned.
    pub fn resolve_string<'a>(&'a self, s: &'a str, lang: &str) -> &'a str {
        if !is_i18n_string(s) {
            return s;
        }
        match self.resolvers.get(lang) {
            Some(resolver) => resolver.resolve(s),
            None => i18n_key(s),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_detect_version() {
        assert_eq!(detect_version(b"{}").unwrap(), InterfaceVersion::V1);
        assert_eq!(
            detect_version(br#"{"interface_version": 1}"#).unwrap(),
            InterfaceVersion::V1
        );
        assert_eq!(
            detect_version(br#"{"interface_version": 2}"#).unwrap(),
            InterfaceVersion::V2
        );
        assert!(matches!(
            detect_version(br#"{"interface_version": 3}"#),
            Err(SchemaError::UnknownVersion(3))
        ));
        assert!(matches!(detect_version(b"not json"), Err(SchemaError::Json(_))));
    }

    #[test]
    fn test_v1_is_unsupported() {
        let result = parse_interface(br#"{"name": "Old"}"#);
        assert!(matches!(result, Err(SchemaError::UnsupportedVersion)));
    }

    #[test]
    fn test_parse_v2_checks_version() {
        let result = parse_v2(br#"{"interface_version": 1, "name": "X"}"#);
        assert!(matches!(result, Err(SchemaError::VersionMismatch(1))));
    }

    #[test]
    fn test_resolve_string_unknown_language_returns_key() {
        let interface = parse_interface(br#"{"interface_version": 2, "name": "X"}"#).unwrap();
        let loaded = LoadedInterface::new(interface, "")
            .with_resolver("en", I18nResolver::new(HashMap::new()));

        assert_eq!(loaded.resolve_string("$title", "en"), "$title");
        assert_eq!(loaded.resolve_string("$title", "fr"), "title");
        assert_eq!(loaded.resolve_string("Title", "fr"), "Title");
    }
}
