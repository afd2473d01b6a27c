//! LibreOffice conversion: the cascade's highest-fidelity strategy.
//!
//! Shells out to `soffice --headless --convert-to pdf`. LibreOffice writes
//! the output into `--outdir` under the input's stem, so the produced file
//! is renamed to the caller's requested path afterwards.
//!
//! The soffice process is the one resource in this service that can leak: a
//! crash mid-conversion leaves a headless office instance holding its
//! profile lock, which blocks every later invocation on the host. The child
//! is therefore wrapped in a guard that kills it on every exit path that
//! did not already reap it.

use crate::error::ConvertError;
use std::path::{Path, PathBuf};
use std::process::{Child, Command, Stdio};
use tracing::{debug, warn};

/// Kills the child on drop unless it was explicitly waited on.
struct ChildGuard {
    child: Option<Child>,
}

impl ChildGuard {
    fn new(child: Child) -> Self {
        Self { child: Some(child) }
    }

    fn wait_output(mut self) -> std::io::Result<std::process::Output> {
        let child = self.child.take().expect("child already taken");
        child.wait_with_output()
    }
}

impl Drop for ChildGuard {
    fn drop(&mut self) {
        if let Some(mut child) = self.child.take() {
            warn!("Killing abandoned soffice process");
            let _ = child.kill();
            let _ = child.wait();
        }
    }
}

/// Convert `input` to PDF via LibreOffice, writing to `output`.
pub fn convert(soffice: &Path, input: &Path, output: &Path) -> Result<(), ConvertError> {
    let out_dir = output
        .parent()
        .filter(|p| !p.as_os_str().is_empty())
        .unwrap_or_else(|| Path::new("."));

    let child = Command::new(soffice)
        .arg("--headless")
        .arg("--norestore")
        .arg("--convert-to")
        .arg("pdf")
        .arg("--outdir")
        .arg(out_dir)
        .arg(input)
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .spawn()
        .map_err(|e| ConvertError::EngineMissing {
            engine: format!("soffice ({e})"),
        })?;

    let output_info = ChildGuard::new(child)
        .wait_output()
        .map_err(|e| ConvertError::EngineFailed {
            engine: "soffice".into(),
            detail: format!("wait failed: {e}"),
        })?;

    if !output_info.status.success() {
        return Err(ConvertError::EngineFailed {
            engine: "soffice".into(),
            detail: format!(
                "exit {}: {}",
                output_info.status,
                String::from_utf8_lossy(&output_info.stderr).trim()
            ),
        });
    }

    // soffice names the result after the input stem, ignoring any name we
    // might prefer; move it into place when the two differ.
    let produced = produced_path(input, out_dir);
    if produced != output {
        std::fs::rename(&produced, output).map_err(|e| ConvertError::EngineFailed {
            engine: "soffice".into(),
            detail: format!("expected output '{}' missing: {e}", produced.display()),
        })?;
    }

    debug!(output = %output.display(), "soffice conversion finished");
    Ok(())
}

fn produced_path(input: &Path, out_dir: &Path) -> PathBuf {
    let stem = input
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| "output".to_string());
    out_dir.join(format!("{stem}.pdf"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn produced_path_uses_input_stem() {
        let p = produced_path(Path::new("/tmp/up/report.docx"), Path::new("/tmp/out"));
        assert_eq!(p, PathBuf::from("/tmp/out/report.pdf"));
    }

    #[test]
    fn missing_binary_is_engine_missing() {
        let err = convert(
            Path::new("/nonexistent/soffice-binary"),
            Path::new("in.docx"),
            Path::new("out.pdf"),
        )
        .unwrap_err();
        assert!(err.is_missing_engine(), "got: {err}");
    }
}
