use crate::error::{Error, Result};
use log::{debug, info};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::sync::RwLock;

pub mod render;

pub use render::{render, render_at};

pub const STATS_TEMPLATE: &str = "stats";
pub const STATUS_TEMPLATE: &str = "status";

/// Keys every template file must define.
pub const REQUIRED_TEMPLATES: [&str; 5] = [
    STATS_TEMPLATE,
    STATUS_TEMPLATE,
    "epoch_change",
    "cap_change",
    "tvl_change",
];

pub type SharedTemplates = Arc<RwLock<TemplateSet>>;

/// Message templates keyed by change kind or display context.
#[derive(Debug, Clone, PartialEq)]
pub struct TemplateSet {
    templates: BTreeMap<String, String>,
    source: Option<PathBuf>,
}

impl TemplateSet {
    pub fn load(path: &Path) -> Result<Self> {
        let raw = std::fs::read_to_string(path).map_err(|e| {
            Error::TemplateError(format!("cannot read {}: {}", path.display(), e))
        })?;
        let mut set = Self::from_yaml_str(&raw)?;
        set.source = Some(path.to_path_buf());
        info!("Loaded {} templates from {}", set.len(), path.display());
        Ok(set)
    }

    pub fn from_yaml_str(raw: &str) -> Result<Self> {
        let templates: BTreeMap<String, String> = serde_yaml::from_str(raw)?;
        Self::from_map(templates)
    }

    pub fn from_map(templates: BTreeMap<String, String>) -> Result<Self> {
        let missing: Vec<&str> = REQUIRED_TEMPLATES
            .iter()
            .copied()
            .filter(|key| !templates.contains_key(*key))
            .collect();
        if !missing.is_empty() {
            return Err(Error::TemplateError(format!(
                "missing template keys: {}",
                missing.join(", ")
            )));
        }
        for key in templates.keys() {
            if !REQUIRED_TEMPLATES.contains(&key.as_str()) {
                debug!("Template '{}' is not used by any notification", key);
            }
        }
        Ok(Self { templates, source: None })
    }

    pub fn get(&self, key: &str) -> Result<&str> {
        self.templates
            .get(key)
            .map(String::as_str)
            .ok_or_else(|| Error::TemplateMissing(key.to_string()))
    }

    pub fn len(&self) -> usize {
        self.templates.len()
    }

    pub fn is_empty(&self) -> bool {
        self.templates.is_empty()
    }

    pub fn source(&self) -> Option<&Path> {
        self.source.as_deref()
    }
}

pub fn shared(set: TemplateSet) -> SharedTemplates {
    Arc::new(RwLock::new(set))
}
