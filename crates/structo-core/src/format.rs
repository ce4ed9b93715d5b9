//! Document formatting pipeline: parse → synthesize views → emit.
//!
//! Normalizes hand-written DSL into the canonical generated shape. The
//! first pass may add views and positions; after that the output is a
//! fixed point.

use crate::emitter::{EmitConfig, emit_document_with};
use crate::layout::GridLayout;
use crate::parser::{ParseError, ParseOptions, parse_with_report};

// ─── Config ──────────────────────────────────────────────────────────────

#[derive(Debug, Clone)]
pub struct FormatConfig {
    /// Add missing landscape / containers / deployment views. Default: **true**.
    pub synthesize_views: bool,
    /// Grid for elements without position metadata.
    pub grid: GridLayout,
    pub emit: EmitConfig,
}

impl Default for FormatConfig {
    fn default() -> Self {
        Self {
            synthesize_views: true,
            grid: GridLayout::default(),
            emit: EmitConfig::default(),
        }
    }
}

// ─── Pipeline ────────────────────────────────────────────────────────────

/// Parse a DSL document and re-emit it canonically.
///
/// Idempotent after the first pass:
/// `format_document(format_document(s, c), c) == format_document(s, c)`.
///
/// # Errors
/// Returns the parse error if the braces don't balance.
pub fn format_document(text: &str, config: &FormatConfig) -> Result<String, ParseError> {
    let options = ParseOptions {
        grid: config.grid,
        synthesize_views: config.synthesize_views,
    };
    let report = parse_with_report(text, &options)?;
    for warning in &report.warnings {
        log::debug!("format: {warning}");
    }
    Ok(emit_document_with(&report.workspace, &config.emit))
}

// ─── Tests ───────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    const HAND_WRITTEN: &str = r#"
workspace "Bank" {
    model {
        customer = person "Customer" "A bank customer"
        bank = softwareSystem "Internet Banking" {
            web = container "Web App" "" "Rust"
        }
        customer -> bank.web "Logs in"
    }
}
"#;

    #[test]
    fn format_is_idempotent() {
        let config = FormatConfig::default();
        let first = format_document(HAND_WRITTEN, &config).expect("first format failed");
        let second = format_document(&first, &config).expect("second format failed");
        assert_eq!(first, second, "format must be idempotent");
    }

    #[test]
    fn format_adds_synthesized_views() {
        let output = format_document(HAND_WRITTEN, &FormatConfig::default()).unwrap();
        assert!(output.contains("systemLandscape \"landscape\""));
        assert!(output.contains("container InternetBankingSystem \"InternetBankingSystem-containers\""));
    }

    #[test]
    fn format_without_synthesis() {
        let config = FormatConfig {
            synthesize_views: false,
            ..FormatConfig::default()
        };
        let output = format_document(HAND_WRITTEN, &config).unwrap();
        assert!(!output.contains("systemLandscape"));
    }

    #[test]
    fn format_rejects_unbalanced() {
        let err = format_document("workspace {", &FormatConfig::default()).unwrap_err();
        assert_eq!(err, ParseError::UnbalancedBraces { open: 1, close: 0 });
    }
}
