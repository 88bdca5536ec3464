use crate::api::AssetSource;
use crate::error::Result;
use crate::models::{AssetRecord, DisplayUnit};
use crate::poller::SharedSnapshot;
use crate::templates::{render, SharedTemplates, TemplateSet, STATS_TEMPLATE, STATUS_TEMPLATE};
use log::{info, warn};
use std::path::PathBuf;
use std::sync::Arc;

/// Public commands and the ticker each one looks up.
pub const COMMAND_MAP: [(&str, &str); 3] = [("usdc", "USDC"), ("spyx", "SPYx"), ("jitosol", "JITOSOL")];

pub fn ticker_for_command(command: &str) -> Option<&'static str> {
    COMMAND_MAP
        .iter()
        .find(|(name, _)| name.eq_ignore_ascii_case(command))
        .map(|(_, ticker)| *ticker)
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReloadOutcome {
    Reloaded(usize),
    Denied,
}

/// On-demand lookups behind the chat commands.
#[derive(Clone)]
pub struct AssetCommands {
    source: Arc<dyn AssetSource>,
    templates: SharedTemplates,
    snapshot: SharedSnapshot,
    templates_path: PathBuf,
    admin_id: u64,
}

impl AssetCommands {
    pub fn new(
        source: Arc<dyn AssetSource>,
        templates: SharedTemplates,
        snapshot: SharedSnapshot,
        templates_path: impl Into<PathBuf>,
        admin_id: u64,
    ) -> Self {
        Self {
            source,
            templates,
            snapshot,
            templates_path: templates_path.into(),
            admin_id,
        }
    }

    pub fn is_admin(&self, user_id: u64) -> bool {
        user_id == self.admin_id
    }

    /// Fetches fresh data and renders the `stats` template for `ticker`.
    /// Returns `None` when the source has no such asset.
    pub async fn stats(&self, ticker: &str) -> Result<Option<DisplayUnit>> {
        let assets = self.source.load_assets().await?;
        let asset = match assets.get(ticker) {
            Some(asset) if !asset.is_empty() => asset,
            _ => return Ok(None),
        };
        let template = self.templates.read().await.get(STATS_TEMPLATE)?.to_string();
        Ok(Some(render(&template, asset, &AssetRecord::new())))
    }

    /// Renders the `status` template for every asset of the last snapshot.
    pub async fn status(&self) -> Result<Vec<DisplayUnit>> {
        let snapshot = self.snapshot.read().await.clone();
        if snapshot.is_empty() {
            return Ok(Vec::new());
        }
        let template = self.templates.read().await.get(STATUS_TEMPLATE)?.to_string();
        let empty = AssetRecord::new();
        Ok(snapshot
            .iter()
            .map(|(_, asset)| render(&template, asset, &empty))
            .collect())
    }

    /// Reloads the template file for the admin. A broken file leaves the
    /// current templates in place.
    pub async fn reload_templates(&self, user_id: u64) -> Result<ReloadOutcome> {
        if !self.is_admin(user_id) {
            warn!("User {} attempted a template reload", user_id);
            return Ok(ReloadOutcome::Denied);
        }
        let fresh = TemplateSet::load(&self.templates_path)?;
        let count = fresh.len();
        *self.templates.write().await = fresh;
        info!("Templates reloaded by admin ({} templates)", count);
        Ok(ReloadOutcome::Reloaded(count))
    }
}
