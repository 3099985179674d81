use std::collections::HashMap;
use std::path::Path;

use serde::Deserialize;

use crate::error::{ImportError, Result};

/// Overrides for transactions whose payee (or narration) equals the key of the entry.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct MappingEntry {
    pub account: Option<String>,
    pub payee: Option<String>,
    pub narration: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum MappingFormat {
    Yaml,
    Json,
}

impl MappingFormat {
    fn from_path(path: &Path) -> Option<Self> {
        let extension = path.extension()?.to_str()?.to_lowercase();
        match extension.as_str() {
            "yaml" | "yml" => Some(MappingFormat::Yaml),
            "json" => Some(MappingFormat::Json),
            _ => None,
        }
    }
}

/// Lookup table from payee or narration text to account, payee and narration overrides.
///
/// The table is read once and never changes afterwards. Unknown keys are not an
/// error: every query simply answers "unknown".
#[derive(Debug, Clone, Default)]
pub struct AccountMapper {
    mappings: HashMap<String, MappingEntry>,
}

impl AccountMapper {
    /// Mapper without any entries.
    pub fn empty() -> Self {
        Self::default()
    }

    /// Reads the mapping table from a YAML (`.yaml`, `.yml`) or JSON (`.json`) file.
    /// Without a path the table stays empty.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let path = match path {
            Some(path) => path,
            None => return Ok(Self::empty()),
        };

        if !path.is_file() {
            return Err(ImportError::ConfigNotFound(path.to_path_buf()));
        }
        let format = MappingFormat::from_path(path)
            .ok_or_else(|| ImportError::UnsupportedFormat(path.to_path_buf()))?;
        let content = std::fs::read_to_string(path)
            .map_err(|_| ImportError::ConfigNotFound(path.to_path_buf()))?;

        let mapper = Self::parse(&content, format).map_err(|reason| ImportError::MappingParse {
            path: path.to_path_buf(),
            reason,
        })?;

        log::debug!(
            "loaded {} account mappings from {}",
            mapper.mappings.len(),
            path.display()
        );
        mapper
            .mappings
            .iter()
            .filter(|(_, entry)| entry.account.is_none())
            .for_each(|(key, _)| {
                log::warn!("mapping for \"{}\" has no account, no counter posting is created", key)
            });

        Ok(mapper)
    }

    fn parse(content: &str, format: MappingFormat) -> std::result::Result<Self, String> {
        if content.trim().is_empty() {
            return Ok(Self::empty());
        }

        // a key without a value is known, but carries no overrides
        let raw: Option<HashMap<String, Option<MappingEntry>>> = match format {
            MappingFormat::Yaml => serde_yaml::from_str(content).map_err(|e| e.to_string())?,
            MappingFormat::Json => serde_json::from_str(content).map_err(|e| e.to_string())?,
        };

        let mappings = raw
            .unwrap_or_default()
            .into_iter()
            .map(|(key, entry)| (key, entry.unwrap_or_default()))
            .collect();
        Ok(Self { mappings })
    }

    pub fn from_entries<I>(entries: I) -> Self
    where
        I: IntoIterator<Item = (String, MappingEntry)>,
    {
        Self {
            mappings: entries.into_iter().collect(),
        }
    }

    pub fn len(&self) -> usize {
        self.mappings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.mappings.is_empty()
    }

    pub fn is_known(&self, key: &str) -> bool {
        self.mappings.contains_key(key)
    }

    pub fn account(&self, key: &str) -> Option<&str> {
        self.field(key, |entry| &entry.account)
    }

    pub fn payee(&self, key: &str) -> Option<&str> {
        self.field(key, |entry| &entry.payee)
    }

    pub fn narration(&self, key: &str) -> Option<&str> {
        self.field(key, |entry| &entry.narration)
    }

    fn field<F>(&self, key: &str, select: F) -> Option<&str>
    where
        F: Fn(&MappingEntry) -> &Option<String>,
    {
        self.mappings
            .get(key)
            .and_then(|entry| select(entry).as_deref())
            .filter(|value| !value.is_empty())
    }
}
