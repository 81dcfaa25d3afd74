//! Supported language tracks

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// A language track a novel's chapters can carry
#[derive(
    Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord,
)]
#[serde(rename_all = "lowercase")]
pub enum Language {
    /// English
    #[default]
    En,

    /// Indonesian
    Id,
}

impl Language {
    /// Every supported track, in storage column order
    pub const ALL: [Language; 2] = [Language::En, Language::Id];

    /// Short tag used in field names and APIs
    pub fn code(self) -> &'static str {
        match self {
            Language::En => "en",
            Language::Id => "id",
        }
    }

    /// Human-readable name
    pub fn display_name(self) -> &'static str {
        match self {
            Language::En => "English",
            Language::Id => "Indonesian",
        }
    }
}

impl fmt::Display for Language {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

impl FromStr for Language {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "en" | "english" => Ok(Language::En),
            "id" | "indonesian" => Ok(Language::Id),
            other => Err(format!("unsupported language '{}'", other)),
        }
    }
}
