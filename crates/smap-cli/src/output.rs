//! Output format selection.

use clap::ValueEnum;

/// Output format options supported by the CLI
#[derive(ValueEnum, Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum OutputFormat {
    /// Human-readable text
    #[default]
    Text,
    /// Pretty-printed JSON
    Json,
}

impl OutputFormat {
    /// Whether stdout carries machine-readable output.
    pub const fn is_machine(self) -> bool {
        matches!(self, Self::Json)
    }
}
