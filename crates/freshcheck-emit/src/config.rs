use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EmitterConfig {
    pub use_colors: bool,
    pub indent_style: IndentStyle,
    pub verbosity: VerbosityLevel,
    pub show_summaries: bool,
}

impl Default for EmitterConfig {
    fn default() -> Self {
        Self {
            use_colors: true,
            indent_style: IndentStyle::Spaces(2),
            verbosity: VerbosityLevel::Normal,
            show_summaries: true,
        }
    }
}

impl EmitterConfig {
    pub fn plain() -> Self {
        Self {
            use_colors: false,
            ..Self::default()
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum IndentStyle {
    Spaces(usize),
    Tabs,
}

impl IndentStyle {
    pub fn as_indent(&self) -> String {
        match self {
            IndentStyle::Spaces(n) => " ".repeat(*n),
            IndentStyle::Tabs => "\t".to_string(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum VerbosityLevel {
    Quiet,
    Normal,
    Verbose,
    Debug,
}

impl VerbosityLevel {
    /// Quiet output keeps warnings and errors only.
    pub fn should_print_notes(&self) -> bool {
        !matches!(self, VerbosityLevel::Quiet)
    }

    pub fn should_print_order(&self) -> bool {
        matches!(self, VerbosityLevel::Verbose | VerbosityLevel::Debug)
    }

    pub fn should_print_points_to(&self) -> bool {
        matches!(self, VerbosityLevel::Debug)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_indent_styles() {
        assert_eq!(IndentStyle::Spaces(4).as_indent(), "    ");
        assert_eq!(IndentStyle::Tabs.as_indent(), "\t");
    }

    #[test]
    fn test_verbosity_gates() {
        assert!(!VerbosityLevel::Quiet.should_print_notes());
        assert!(VerbosityLevel::Normal.should_print_notes());
        assert!(!VerbosityLevel::Normal.should_print_order());
        assert!(VerbosityLevel::Verbose.should_print_order());
        assert!(!VerbosityLevel::Verbose.should_print_points_to());
        assert!(VerbosityLevel::Debug.should_print_points_to());
    }
}
