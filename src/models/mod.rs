use serde::{Deserialize, Serialize};
use std::fmt;

pub mod asset;

pub use asset::{AssetRecord, Snapshot};

/// Telegram caps photo captions at this many characters.
pub const CAPTION_LIMIT: usize = 1024;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChangeKind {
    EpochChange,
    CapChange,
    TvlChange,
}

impl ChangeKind {
    /// Detection order of the change kinds.
    pub const ALL: [ChangeKind; 3] = [ChangeKind::EpochChange, ChangeKind::CapChange, ChangeKind::TvlChange];

    pub fn as_str(&self) -> &'static str {
        match self {
            ChangeKind::EpochChange => "epoch_change",
            ChangeKind::CapChange => "cap_change",
            ChangeKind::TvlChange => "tvl_change",
        }
    }

    /// Template announcing this kind of change.
    pub fn template_key(&self) -> &'static str {
        self.as_str()
    }

    /// Asset field whose value drives this kind of change.
    pub fn field(&self) -> &'static str {
        match self {
            ChangeKind::EpochChange => asset::EPOCH_FIELD,
            ChangeKind::CapChange => asset::CAP_FIELD,
            ChangeKind::TvlChange => asset::TVL_FIELD,
        }
    }
}

impl fmt::Display for ChangeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A rendered message ready for delivery.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DisplayUnit {
    pub text: String,
    pub thumbnail: Option<String>,
    pub footer: String,
}

impl DisplayUnit {
    /// Message body with the footer line appended.
    pub fn full_text(&self) -> String {
        format!("{}\n\nTicker : {}", self.text.trim_end(), self.footer)
    }

    pub fn fits_caption(&self) -> bool {
        self.full_text().chars().count() <= CAPTION_LIMIT
    }
}

/// Resolved chat that receives change notifications.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeliveryTarget {
    pub chat_id: i64,
    pub title: Option<String>,
}
