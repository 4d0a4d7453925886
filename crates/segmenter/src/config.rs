use crate::error::{Result, SegmentError};
use serde::{Deserialize, Serialize};

/// Configuration for unit segmentation
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SegmenterConfig {
    /// Use brace balancing to find unit ends in brace languages
    /// (falls back to the indentation rule when braces never balance)
    pub brace_matching: bool,

    /// How many lines after the definition line may hold the opening brace
    pub brace_lookahead: usize,

    /// Drop `_`-prefixed names from `calls_out`
    pub skip_private_calls: bool,
}

impl Default for SegmenterConfig {
    fn default() -> Self {
        Self {
            brace_matching: true,
            brace_lookahead: 2,
            skip_private_calls: true,
        }
    }
}

impl SegmenterConfig {
    /// Pure indentation rule for every language
    pub fn indentation_only() -> Self {
        Self {
            brace_matching: false,
            ..Default::default()
        }
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<()> {
        if self.brace_matching && self.brace_lookahead > 16 {
            return Err(SegmentError::invalid_config(format!(
                "brace_lookahead ({}) cannot exceed 16",
                self.brace_lookahead
            )));
        }
        Ok(())
    }
}
