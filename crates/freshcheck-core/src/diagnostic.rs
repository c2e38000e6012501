use crate::source_location::SourceLocation;
use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Severity {
    Error,
    Warning,
    Note,
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Severity::Error => write!(f, "error"),
            Severity::Warning => write!(f, "warning"),
            Severity::Note => write!(f, "note"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum DiagnosticKind {
    StaleUse {
        variable: String,
        reason: String,
    },
    StaleDereference {
        target: String,
        pointer: String,
        reason: String,
    },
    MissingPrecondition {
        callee: String,
        variable: String,
    },
    UnresolvedCallee {
        callee: String,
    },
    MalformedTrace {
        message: String,
    },
}

impl DiagnosticKind {
    pub fn severity(&self) -> Severity {
        match self {
            DiagnosticKind::StaleUse { .. }
            | DiagnosticKind::StaleDereference { .. }
            | DiagnosticKind::MissingPrecondition { .. } => Severity::Warning,
            DiagnosticKind::UnresolvedCallee { .. } => Severity::Note,
            DiagnosticKind::MalformedTrace { .. } => Severity::Error,
        }
    }

    /// The variable a warning is about, if any.
    pub fn variable(&self) -> Option<&str> {
        match self {
            DiagnosticKind::StaleUse { variable, .. }
            | DiagnosticKind::MissingPrecondition { variable, .. } => Some(variable),
            DiagnosticKind::StaleDereference { target, .. } => Some(target),
            _ => None,
        }
    }
}

impl fmt::Display for DiagnosticKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DiagnosticKind::StaleUse { variable, reason } => {
                write!(f, "`{}` is not updated", variable)?;
                if !reason.is_empty() {
                    write!(f, " ({})", reason)?;
                }
                Ok(())
            }
            DiagnosticKind::StaleDereference {
                target,
                pointer,
                reason,
            } => {
                write!(f, "`{}` from pointer `{}` is not updated", target, pointer)?;
                if !reason.is_empty() {
                    write!(f, " ({})", reason)?;
                }
                Ok(())
            }
            DiagnosticKind::MissingPrecondition { callee, variable } => write!(
                f,
                "`{}` is not updated before the call to `{}`",
                variable, callee
            ),
            DiagnosticKind::UnresolvedCallee { callee } => write!(
                f,
                "no summary for `{}` yet (recursive call), assuming it has no effect",
                callee
            ),
            DiagnosticKind::MalformedTrace { message } => write!(f, "malformed trace: {}", message),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Diagnostic {
    pub function: String,
    #[serde(flatten)]
    pub kind: DiagnosticKind,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub location: Option<SourceLocation>,
    pub severity: Severity,
}

impl Diagnostic {
    pub fn new(
        function: impl Into<String>,
        kind: DiagnosticKind,
        location: Option<SourceLocation>,
    ) -> Self {
        let severity = kind.severity();
        Self {
            function: function.into(),
            kind,
            location,
            severity,
        }
    }

    pub fn is_warning(&self) -> bool {
        self.severity == Severity::Warning
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.severity, self.kind)?;
        if let Some(location) = self.location {
            write!(f, " at {}", location)?;
        }
        write!(f, " in `{}`", self.function)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stale_use_message() {
        let diag = Diagnostic::new(
            "main",
            DiagnosticKind::StaleUse {
                variable: "b".to_string(),
                reason: "changed because of `a`".to_string(),
            },
            Some(SourceLocation::new(7, 5)),
        );
        assert_eq!(
            diag.to_string(),
            "warning: `b` is not updated (changed because of `a`) at 7:5 in `main`"
        );
        assert!(diag.is_warning());
    }

    #[test]
    fn test_unresolved_callee_is_a_note() {
        let diag = Diagnostic::new(
            "f",
            DiagnosticKind::UnresolvedCallee {
                callee: "f".to_string(),
            },
            None,
        );
        assert_eq!(diag.severity, Severity::Note);
        assert!(!diag.is_warning());
        assert_eq!(diag.kind.variable(), None);
    }

    #[test]
    fn test_json_is_flat() {
        let diag = Diagnostic::new(
            "main",
            DiagnosticKind::MissingPrecondition {
                callee: "foo".to_string(),
                variable: "g".to_string(),
            },
            None,
        );
        let value = serde_json::to_value(&diag).unwrap();
        assert_eq!(value["kind"], "missing_precondition");
        assert_eq!(value["callee"], "foo");
        assert_eq!(value["severity"], "warning");
        assert!(value.get("location").is_none());
    }
}
