//! Host capability probe for the conversion cascade.
//!
//! The cascade's first three strategies depend on external binaries that may
//! or may not exist on the host. Rather than checking the environment inline
//! on every request, [`Capabilities::probe`] scans `PATH` once at startup and
//! the result is injected into the controller. A request then only ever
//! attempts strategies the host can actually run, and the log shows at boot
//! exactly which chain a deployment will use.

use std::path::{Path, PathBuf};

/// Conversion strategies in fixed priority order.
///
/// The order is load-bearing: earlier strategies produce higher-fidelity
/// output when they work. [`crate::cascade::convert_docx`] tries them top to
/// bottom and returns the first valid result.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub enum StrategyKind {
    /// LibreOffice `soffice --headless --convert-to pdf`.
    Office,
    /// `pandoc` straight to PDF.
    PandocDirect,
    /// DOCX → HTML → PDF, via pandoc or structural extraction, then
    /// Chromium or the pure-library renderer.
    HtmlBridge,
    /// Structural reconstruction with no external engine. Always available.
    ManualLayout,
}

impl StrategyKind {
    /// Stable lowercase name used in logs and error messages.
    pub fn name(&self) -> &'static str {
        match self {
            StrategyKind::Office => "office",
            StrategyKind::PandocDirect => "pandoc-direct",
            StrategyKind::HtmlBridge => "html-bridge",
            StrategyKind::ManualLayout => "manual-layout",
        }
    }
}

/// External conversion engines found on the host at startup.
///
/// Built once via [`Capabilities::probe`] and shared by reference (or clone,
/// it is three optional paths) with every request.
#[derive(Debug, Clone, Default)]
pub struct Capabilities {
    /// LibreOffice binary, if present.
    pub soffice: Option<PathBuf>,
    /// pandoc binary, if present.
    pub pandoc: Option<PathBuf>,
    /// A Chromium-family browser binary, if present.
    pub chromium: Option<PathBuf>,
}

impl Capabilities {
    /// Scan `PATH` for the external engines the cascade can use.
    pub fn probe() -> Self {
        let caps = Self {
            soffice: which(&["soffice", "libreoffice"]),
            pandoc: which(&["pandoc"]),
            chromium: which(&["chromium", "chromium-browser", "google-chrome", "chrome"]),
        };
        tracing::info!(
            soffice = caps.soffice.is_some(),
            pandoc = caps.pandoc.is_some(),
            chromium = caps.chromium.is_some(),
            "Probed conversion engines"
        );
        caps
    }

    /// An empty capability set: only the manual-layout strategy remains.
    ///
    /// Useful in tests and as a degraded-host baseline.
    pub fn none() -> Self {
        Self::default()
    }

    /// The available strategies, in cascade priority order.
    ///
    /// [`StrategyKind::ManualLayout`] is always last and always present; the
    /// HTML bridge is listed even without pandoc or Chromium because the
    /// structural-extraction and pure-library fallbacks inside it need no
    /// external binary.
    pub fn strategies(&self) -> Vec<StrategyKind> {
        let mut chain = Vec::with_capacity(4);
        if self.soffice.is_some() {
            chain.push(StrategyKind::Office);
        }
        if self.pandoc.is_some() {
            chain.push(StrategyKind::PandocDirect);
        }
        chain.push(StrategyKind::HtmlBridge);
        chain.push(StrategyKind::ManualLayout);
        chain
    }
}

/// First of `names` found as a file in a `PATH` directory.
fn which(names: &[&str]) -> Option<PathBuf> {
    let path_var = std::env::var_os("PATH")?;
    for dir in std::env::split_paths(&path_var) {
        for name in names {
            let candidate = dir.join(name);
            if is_executable(&candidate) {
                return Some(candidate);
            }
        }
    }
    None
}

#[cfg(unix)]
fn is_executable(path: &Path) -> bool {
    use std::os::unix::fs::PermissionsExt;
    path.metadata()
        .map(|m| m.is_file() && m.permissions().mode() & 0o111 != 0)
        .unwrap_or(false)
}

#[cfg(not(unix))]
fn is_executable(path: &Path) -> bool {
    path.is_file()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn manual_layout_always_present_and_last() {
        let chain = Capabilities::none().strategies();
        assert_eq!(chain, vec![StrategyKind::HtmlBridge, StrategyKind::ManualLayout]);
    }

    #[test]
    fn full_capabilities_yield_full_chain() {
        let caps = Capabilities {
            soffice: Some("/usr/bin/soffice".into()),
            pandoc: Some("/usr/bin/pandoc".into()),
            chromium: Some("/usr/bin/chromium".into()),
        };
        assert_eq!(
            caps.strategies(),
            vec![
                StrategyKind::Office,
                StrategyKind::PandocDirect,
                StrategyKind::HtmlBridge,
                StrategyKind::ManualLayout,
            ]
        );
    }

    #[test]
    fn pandoc_only_skips_office() {
        let caps = Capabilities {
            pandoc: Some("/usr/bin/pandoc".into()),
            ..Capabilities::none()
        };
        let chain = caps.strategies();
        assert_eq!(chain[0], StrategyKind::PandocDirect);
        assert!(!chain.contains(&StrategyKind::Office));
    }

    #[test]
    fn strategy_names_are_stable() {
        assert_eq!(StrategyKind::Office.name(), "office");
        assert_eq!(StrategyKind::ManualLayout.name(), "manual-layout");
    }
}
