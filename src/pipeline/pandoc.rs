//! pandoc invocations: direct DOCX→PDF and the bridge's DOCX→HTML step.

use crate::error::ConvertError;
use std::path::Path;
use std::process::{Command, Stdio};
use tracing::debug;

/// Convert DOCX straight to PDF. pandoc needs a TeX engine for PDF output;
/// XeLaTeX is requested for its unicode coverage, and its absence surfaces
/// as an [`ConvertError::EngineFailed`] that the cascade falls through.
pub fn docx_to_pdf(pandoc: &Path, input: &Path, output: &Path) -> Result<(), ConvertError> {
    run(
        pandoc,
        &[
            input.as_os_str(),
            "--pdf-engine=xelatex".as_ref(),
            "-o".as_ref(),
            output.as_os_str(),
        ],
    )
}

/// Convert DOCX to standalone HTML (complete markup with head and body).
pub fn docx_to_html(pandoc: &Path, input: &Path, output: &Path) -> Result<(), ConvertError> {
    run(
        pandoc,
        &[
            "-s".as_ref(),
            input.as_os_str(),
            "-o".as_ref(),
            output.as_os_str(),
        ],
    )
}

fn run(pandoc: &Path, args: &[&std::ffi::OsStr]) -> Result<(), ConvertError> {
    let output = Command::new(pandoc)
        .args(args)
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .output()
        .map_err(|e| ConvertError::EngineMissing {
            engine: format!("pandoc ({e})"),
        })?;

    if !output.status.success() {
        return Err(ConvertError::EngineFailed {
            engine: "pandoc".into(),
            detail: format!(
                "exit {}: {}",
                output.status,
                String::from_utf8_lossy(&output.stderr).trim()
            ),
        });
    }
    debug!("pandoc finished");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_binary_is_engine_missing() {
        let err = docx_to_pdf(
            Path::new("/nonexistent/pandoc-binary"),
            Path::new("in.docx"),
            Path::new("out.pdf"),
        )
        .unwrap_err();
        assert!(err.is_missing_engine());
    }
}
