use crate::analysis::AliasMode;
use crate::{CheckError, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AnalysisConfig {
    /// Function whose globals are seeded fresh instead of undecided.
    pub entry_point: String,
    pub alias_mode: AliasMode,
    pub report_unresolved_callees: bool,
    /// Plain reads of pointer variables are address references and are skipped unless set.
    pub check_pointer_reads: bool,
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            entry_point: "main".to_string(),
            alias_mode: AliasMode::SinglePass,
            report_unresolved_callees: true,
            check_pointer_reads: false,
        }
    }
}

impl AnalysisConfig {
    pub fn from_json(text: &str) -> Result<Self> {
        serde_json::from_str(text).map_err(|e| CheckError::Config(e.to_string()))
    }

    pub fn load_from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path)
            .map_err(|e| CheckError::Config(format!("{}: {}", path.display(), e)))?;
        Self::from_json(&text)
    }

    pub fn with_entry_point(mut self, name: impl Into<String>) -> Self {
        self.entry_point = name.into();
        self
    }

    pub fn with_alias_mode(mut self, mode: AliasMode) -> Self {
        self.alias_mode = mode;
        self
    }

    pub fn is_entry_point(&self, name: &str) -> bool {
        self.entry_point == name
    }
}
