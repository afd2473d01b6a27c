//! The DOCX→PDF conversion cascade.
//!
//! Strategies run in fixed priority order and the first one to produce a
//! valid output (file exists, size > 0) wins. A strategy failure of any
//! kind, missing engine, nonzero exit, render error, or empty output, is
//! logged and the controller falls through to the next strategy. Nothing is
//! retried. When the chain is exhausted, the last failure surfaces inside
//! [`ConvertError::AllStrategiesFailed`].
//!
//! The chain itself comes from [`Capabilities::strategies`], probed once at
//! startup, so a host without LibreOffice simply never attempts it.

use crate::capabilities::{Capabilities, StrategyKind};
use crate::error::ConvertError;
use crate::output::ConversionResult;
use crate::pipeline::{html_bridge, layout, office, pandoc};
use std::path::Path;
use tracing::{info, warn};

/// Convert the DOCX at `input` to a PDF at `output` through the cascade.
///
/// On success the returned [`ConversionResult`] names the strategy that
/// produced the file.
pub fn convert_docx(
    caps: &Capabilities,
    input: &Path,
    output: &Path,
) -> Result<ConversionResult, ConvertError> {
    let strategies = caps.strategies();
    let attempts = strategies.len();
    let mut last_error: Option<ConvertError> = None;

    for strategy in strategies {
        info!(strategy = strategy.name(), input = %input.display(), "Attempting conversion");
        let attempt = run_strategy(caps, strategy, input, output)
            .and_then(|_| ConversionResult::validate(output, Some(strategy)));

        match attempt {
            Ok(result) => {
                info!(
                    strategy = strategy.name(),
                    bytes = result.bytes,
                    "Conversion succeeded"
                );
                return Ok(result);
            }
            Err(e) => {
                if e.is_missing_engine() {
                    warn!(strategy = strategy.name(), "Engine not available: {e}");
                } else {
                    warn!(strategy = strategy.name(), "Strategy failed: {e}");
                }
                // A half-written output must not satisfy the next
                // strategy's validation.
                let _ = std::fs::remove_file(output);
                last_error = Some(e);
            }
        }
    }

    Err(ConvertError::AllStrategiesFailed {
        attempts,
        last_error: last_error
            .map(|e| e.to_string())
            .unwrap_or_else(|| "no strategies attempted".to_string()),
    })
}

fn run_strategy(
    caps: &Capabilities,
    strategy: StrategyKind,
    input: &Path,
    output: &Path,
) -> Result<(), ConvertError> {
    match strategy {
        StrategyKind::Office => {
            let soffice = caps.soffice.as_deref().ok_or_else(|| ConvertError::EngineMissing {
                engine: "soffice".into(),
            })?;
            office::convert(soffice, input, output)
        }
        StrategyKind::PandocDirect => {
            let bin = caps.pandoc.as_deref().ok_or_else(|| ConvertError::EngineMissing {
                engine: "pandoc".into(),
            })?;
            pandoc::docx_to_pdf(bin, input, output)
        }
        StrategyKind::HtmlBridge => html_bridge::convert(caps, input, output),
        StrategyKind::ManualLayout => layout::render_docx(input, output),
    }
}
