//! Runtime configuration.
//!
//! The only tunable today is the path syntax. Configuration can be built in
//! code or deserialized from JSON:
//!
//! ```rust
//! use tether_core::RuntimeConfig;
//!
//! let config = RuntimeConfig::from_json(r#"{ "syntax": { "separator": "/" } }"#).unwrap();
//! assert_eq!(config.syntax.separator, '/');
//! assert_eq!(config.syntax.absolute, '$');
//! ```

use serde::Deserialize;

use crate::error::{Error, Result};

/// Characters that drive path tokenizing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct PathSyntax {
    /// Splits a path into segments.
    pub separator: char,
    /// Placed before a separator to keep it inside the segment.
    pub escape: char,
    /// Leading marker that makes a path ignore the caller's base path.
    pub absolute: char,
}

impl Default for PathSyntax {
    fn default() -> Self {
        Self {
            separator: '.',
            escape: '\\',
            absolute: '$',
        }
    }
}

impl PathSyntax {
    /// Check that the three characters are pairwise distinct.
    pub fn validate(&self) -> Result<()> {
        if self.separator == self.escape
            || self.separator == self.absolute
            || self.escape == self.absolute
        {
            return Err(Error::InvalidConfig(format!(
                "separator {:?}, escape {:?} and absolute marker {:?} must differ",
                self.separator, self.escape, self.absolute
            )));
        }
        Ok(())
    }
}

/// Configuration for a [`Runtime`](crate::Runtime).
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct RuntimeConfig {
    pub syntax: PathSyntax,
}

impl RuntimeConfig {
    /// Parse and validate a JSON configuration document.
    pub fn from_json(raw: &str) -> Result<Self> {
        let config: Self =
            serde_json::from_str(raw).map_err(|e| Error::InvalidConfig(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Check the path syntax.
    pub fn validate(&self) -> Result<()> {
        self.syntax.validate()
    }
}
