//! Result types returned by the conversion entry points.

use crate::capabilities::StrategyKind;
use crate::error::{ConvertError, ItemError};
use std::path::{Path, PathBuf};

/// A successfully produced output file.
///
/// The invariant callers may rely on: `path` exists and `bytes > 0`.
/// [`ConversionResult::validate`] is the only constructor, so an instance is
/// proof the file was there with content at the moment the conversion
/// finished.
#[derive(Debug, Clone)]
pub struct ConversionResult {
    /// Path to the produced file.
    pub path: PathBuf,
    /// File size at validation time.
    pub bytes: u64,
    /// Which cascade strategy produced it; `None` for the single-shot
    /// converters (text, image, batch, PDF-to-images) that have no cascade.
    pub strategy: Option<StrategyKind>,
}

impl ConversionResult {
    /// Check that `path` exists with non-zero size and wrap it.
    ///
    /// A missing or empty file is how a half-broken engine "succeeds", so
    /// this is the cascade's definition of strategy success.
    pub fn validate(
        path: &Path,
        strategy: Option<StrategyKind>,
    ) -> Result<Self, ConvertError> {
        let strategy_name = strategy.map(|s| s.name()).unwrap_or("direct");
        let meta = std::fs::metadata(path).map_err(|_| ConvertError::EmptyOutput {
            strategy: strategy_name.to_string(),
            path: path.to_path_buf(),
        })?;
        if !meta.is_file() || meta.len() == 0 {
            return Err(ConvertError::EmptyOutput {
                strategy: strategy_name.to_string(),
                path: path.to_path_buf(),
            });
        }
        Ok(Self {
            path: path.to_path_buf(),
            bytes: meta.len(),
            strategy,
        })
    }
}

/// Outcome of converting a ZIP archive of mixed documents and images.
///
/// Partial failure is the normal case for batches, so skipped members are
/// recorded here instead of only appearing in the server log.
#[derive(Debug)]
pub struct BatchOutcome {
    /// The flat output archive (`converted_files.zip`).
    pub archive_path: PathBuf,
    /// `(original member name, produced PDF path)` per converted document.
    pub converted: Vec<(String, PathBuf)>,
    /// Members that failed, with the reason. The batch continued past each.
    pub skipped: Vec<(String, ItemError)>,
    /// The merged image PDF, when the archive contained any usable images.
    pub merged_images: Option<PathBuf>,
}

impl BatchOutcome {
    /// True when nothing at all was converted.
    pub fn is_empty(&self) -> bool {
        self.converted.is_empty() && self.merged_images.is_none()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn validate_rejects_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nope.pdf");
        let err = ConversionResult::validate(&path, Some(StrategyKind::Office)).unwrap_err();
        assert!(err.to_string().contains("office"));
    }

    #[test]
    fn validate_rejects_empty_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("empty.pdf");
        std::fs::File::create(&path).unwrap();
        assert!(ConversionResult::validate(&path, None).is_err());
    }

    #[test]
    fn validate_accepts_non_empty_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out.pdf");
        let mut f = std::fs::File::create(&path).unwrap();
        f.write_all(b"%PDF-1.7 stub").unwrap();
        let result =
            ConversionResult::validate(&path, Some(StrategyKind::ManualLayout)).unwrap();
        assert_eq!(result.bytes, 13);
        assert_eq!(result.strategy, Some(StrategyKind::ManualLayout));
    }

    #[test]
    fn batch_outcome_emptiness() {
        let outcome = BatchOutcome {
            archive_path: "out.zip".into(),
            converted: vec![],
            skipped: vec![],
            merged_images: None,
        };
        assert!(outcome.is_empty());
    }
}
