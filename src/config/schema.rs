use crate::anchor::DEFAULT_MIN_PARAGRAPH_CHARS;
use crate::locator::LocatorConfig;
use crate::persist::autosave::DEFAULT_DEBOUNCE;
use crate::reconcile::ReconcilerConfig;
use serde::Deserialize;
use std::fmt;
use std::time::Duration;

/// Top-level `redline.toml`. Every section and key is optional.
#[derive(Debug, Deserialize, Default, Clone, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct RedlineConfig {
    #[serde(default)]
    pub anchors: AnchorConfig,
    #[serde(default)]
    pub locator: LocatorConfig,
    #[serde(default)]
    pub reconciler: ReconcilerConfig,
    #[serde(default)]
    pub autosave: AutosaveConfig,
}

#[derive(Debug, Deserialize, Clone, Copy, PartialEq, Eq)]
#[serde(default, deny_unknown_fields)]
pub struct AnchorConfig {
    pub min_paragraph_chars: usize,
}

impl Default for AnchorConfig {
    fn default() -> Self {
        Self {
            min_paragraph_chars: DEFAULT_MIN_PARAGRAPH_CHARS,
        }
    }
}

#[derive(Debug, Deserialize, Clone, Copy, PartialEq, Eq)]
#[serde(default, deny_unknown_fields)]
pub struct AutosaveConfig {
    pub enabled: bool,
    pub debounce_ms: u64,
}

impl Default for AutosaveConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            debounce_ms: DEFAULT_DEBOUNCE.as_millis() as u64,
        }
    }
}

impl AutosaveConfig {
    pub fn debounce(&self) -> Duration {
        Duration::from_millis(self.debounce_ms)
    }
}

impl RedlineConfig {
    /// Collect every problem rather than stopping at the first.
    pub fn validate(&self) -> Result<(), ValidationError> {
        let mut issues = Vec::new();

        let positive = [
            ("anchors.min_paragraph_chars", self.anchors.min_paragraph_chars as u64),
            ("locator.min_word_chars", self.locator.min_word_chars as u64),
            ("locator.max_span_expansion", self.locator.max_span_expansion as u64),
            ("autosave.debounce_ms", self.autosave.debounce_ms),
        ];
        for (field, value) in positive {
            if value == 0 {
                issues.push(ValidationIssue::NotPositive { field });
            }
        }

        if self.locator.window_chars < self.locator.min_word_chars {
            issues.push(ValidationIssue::InvalidCombo {
                message: format!(
                    "locator.window_chars ({}) is smaller than locator.min_word_chars ({})",
                    self.locator.window_chars, self.locator.min_word_chars
                ),
            });
        }

        if issues.is_empty() {
            Ok(())
        } else {
            Err(ValidationError { issues })
        }
    }
}

#[derive(Debug, Clone)]
pub struct ValidationError {
    pub issues: Vec<ValidationIssue>,
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (idx, issue) in self.issues.iter().enumerate() {
            if idx > 0 {
                writeln!(f)?;
            }
            write!(f, "{issue}")?;
        }
        Ok(())
    }
}

impl std::error::Error for ValidationError {}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ValidationIssue {
    NotPositive { field: &'static str },
    InvalidCombo { message: String },
}

impl fmt::Display for ValidationIssue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ValidationIssue::NotPositive { field } => write!(f, "'{field}' must be greater than 0"),
            ValidationIssue::InvalidCombo { message } => {
                write!(f, "invalid configuration: {message}")
            }
        }
    }
}
