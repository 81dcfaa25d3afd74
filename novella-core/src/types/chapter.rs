//! A chapter extracted from one spine entry

use serde::{Deserialize, Serialize};

/// A single chapter of a parsed book
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ParsedChapter {
    /// 1-based position in the filtered spine
    pub number: u32,

    /// Chapter title
    pub title: String,

    /// Body markup or plain text, possibly empty
    pub content: String,
}

impl ParsedChapter {
    pub fn new(number: u32, title: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            number,
            title: title.into(),
            content: content.into(),
        }
    }

    /// A chapter whose resource could not be read
    pub fn placeholder(number: u32) -> Self {
        Self::new(number, Self::fallback_title(number), String::new())
    }

    /// Title used when none can be detected
    pub fn fallback_title(number: u32) -> String {
        format!("Chapter {}", number)
    }
}
