use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum StorageClass {
    Global,
    Parameter,
    Local,
}

impl StorageClass {
    pub fn is_global(&self) -> bool {
        matches!(self, StorageClass::Global)
    }
}

impl fmt::Display for StorageClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StorageClass::Global => write!(f, "global"),
            StorageClass::Parameter => write!(f, "parameter"),
            StorageClass::Local => write!(f, "local"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Variable {
    pub name: String,
    pub storage: StorageClass,
    pub is_pointer: bool,
}

impl Variable {
    pub fn new(name: impl Into<String>, storage: StorageClass, is_pointer: bool) -> Self {
        Self {
            name: name.into(),
            storage,
            is_pointer,
        }
    }

    pub fn global(name: impl Into<String>, is_pointer: bool) -> Self {
        Self::new(name, StorageClass::Global, is_pointer)
    }

    pub fn parameter(name: impl Into<String>, is_pointer: bool) -> Self {
        Self::new(name, StorageClass::Parameter, is_pointer)
    }

    pub fn local(name: impl Into<String>, is_pointer: bool) -> Self {
        Self::new(name, StorageClass::Local, is_pointer)
    }
}

/// Freshness of a variable as seen by the current graph view.
///
/// `Stale` is never stored: a variable is stale exactly when it has no node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ValidityState {
    Fresh,
    Stale,
    Undecided,
}

impl ValidityState {
    pub fn is_fresh(&self) -> bool {
        matches!(self, ValidityState::Fresh)
    }
}

impl fmt::Display for ValidityState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ValidityState::Fresh => write!(f, "fresh"),
            ValidityState::Stale => write!(f, "stale"),
            ValidityState::Undecided => write!(f, "undecided"),
        }
    }
}
