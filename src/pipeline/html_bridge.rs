//! DOCX → HTML → PDF bridge, the cascade's third strategy.
//!
//! Two independent choices are made per invocation, each with a fallback:
//!
//! * **HTML production** — pandoc when present (complete standalone markup,
//!   CSS injected into its head), otherwise structural extraction via
//!   [`crate::pipeline::docx`] wrapped in a styled page shell.
//! * **HTML rendering** — a headless Chromium when present, otherwise the
//!   pure-library `fullbleed` renderer, which needs no external binary.
//!
//! The intermediate HTML lives in a `TempDir`, so it is removed when this
//! function returns on every path, success or failure.

use crate::capabilities::Capabilities;
use crate::error::ConvertError;
use crate::pipeline::docx::DocModel;
use crate::pipeline::fonts::FALLBACK_FONT;
use crate::pipeline::pandoc;
use fullbleed::{FullBleed, Size};
use std::path::Path;
use std::process::{Command, Stdio};
use tracing::{debug, warn};

/// Stylesheet applied to bridge HTML: printable page, script-aware font
/// stack, bordered tables with a filled header row and zebra striping.
const BRIDGE_CSS: &str = r#"
@page { size: A4; margin: 20mm; }
body {
    font-family: "DejaVu Sans", "Noto Sans", "Noto Sans Devanagari",
                 "Noto Sans Arabic", "Noto Sans CJK SC", sans-serif;
    font-size: 11pt;
    line-height: 1.5;
}
h1 { font-size: 16pt; }
table { border-collapse: collapse; width: 100%; margin: 8pt 0; }
th, td { border: 1px solid #999999; padding: 4pt; text-align: left; }
th { background-color: #4472C4; color: #ffffff; }
tr:nth-child(even) td { background-color: #F2F2F2; }
"#;

/// Convert `input` to PDF at `output` through the HTML intermediate.
pub fn convert(caps: &Capabilities, input: &Path, output: &Path) -> Result<(), ConvertError> {
    let workdir = tempfile::tempdir().map_err(|e| ConvertError::Internal(format!("tempdir: {e}")))?;
    let html_path = workdir.path().join("bridge.html");

    let html = produce_html(caps, input, &html_path)?;
    std::fs::write(&html_path, &html).map_err(|e| ConvertError::OutputWriteFailed {
        path: html_path.clone(),
        source: e,
    })?;

    match caps.chromium.as_deref() {
        Some(chromium) => render_with_chromium(chromium, &html_path, output),
        None => render_with_fullbleed(&html, workdir.path(), output),
    }
    // workdir (and bridge.html inside it) dropped here on every path
}

/// Produce the HTML string: pandoc's standalone output with CSS injected,
/// or extracted markup wrapped in the page shell.
fn produce_html(caps: &Capabilities, input: &Path, html_path: &Path) -> Result<String, ConvertError> {
    if let Some(pandoc_bin) = caps.pandoc.as_deref() {
        match pandoc::docx_to_html(pandoc_bin, input, html_path) {
            Ok(()) => {
                let markup =
                    std::fs::read_to_string(html_path).map_err(|e| ConvertError::Internal(format!("read bridge html: {e}")))?;
                return Ok(inject_css(&markup, BRIDGE_CSS));
            }
            Err(e) => {
                warn!("pandoc HTML extraction failed ({e}); falling back to structural extraction");
            }
        }
    }

    let model = DocModel::parse(input)?;
    Ok(wrap_in_shell(&model.to_html_body(), BRIDGE_CSS))
}

/// Insert a `<style>` block before `</head>`; pandoc's standalone output
/// always has one, but prepend as a last resort if it does not.
fn inject_css(markup: &str, css: &str) -> String {
    let style = format!("<style>{css}</style>");
    if let Some(pos) = markup.to_ascii_lowercase().find("</head>") {
        let mut out = String::with_capacity(markup.len() + style.len());
        out.push_str(&markup[..pos]);
        out.push_str(&style);
        out.push_str(&markup[pos..]);
        out
    } else {
        format!("{style}{markup}")
    }
}

/// Wrap raw body markup (from structural extraction) in a complete page.
fn wrap_in_shell(body: &str, css: &str) -> String {
    format!(
        "<!DOCTYPE html>\n<html>\n<head>\n<meta charset=\"utf-8\">\n<style>{css}</style>\n</head>\n<body>\n{body}\n</body>\n</html>\n"
    )
}

fn render_with_chromium(chromium: &Path, html_path: &Path, output: &Path) -> Result<(), ConvertError> {
    let result = Command::new(chromium)
        .arg("--headless")
        .arg("--disable-gpu")
        .arg("--no-sandbox")
        .arg(format!("--print-to-pdf={}", output.display()))
        .arg(format!("file://{}", html_path.display()))
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .output()
        .map_err(|e| ConvertError::EngineMissing {
            engine: format!("chromium ({e})"),
        })?;

    if !result.status.success() {
        return Err(ConvertError::EngineFailed {
            engine: "chromium".into(),
            detail: format!(
                "exit {}: {}",
                result.status,
                String::from_utf8_lossy(&result.stderr).trim()
            ),
        });
    }
    debug!("chromium print-to-pdf finished");
    Ok(())
}

fn render_with_fullbleed(html: &str, workdir: &Path, output: &Path) -> Result<(), ConvertError> {
    // fullbleed loads fonts from files; materialise the bundled one so the
    // renderer works on hosts with no font packages at all.
    let font_path = workdir.join("fallback.ttf");
    std::fs::write(&font_path, FALLBACK_FONT).map_err(|e| ConvertError::OutputWriteFailed {
        path: font_path.clone(),
        source: e,
    })?;

    let engine = FullBleed::builder()
        .page_size(Size::a4())
        .margin_all(56.0)
        .register_font_dir("/usr/share/fonts")
        .register_font_file(&font_path)
        .build()
        .map_err(|e| ConvertError::EngineFailed {
            engine: "fullbleed".into(),
            detail: e.to_string(),
        })?;

    let pages = engine
        .render_to_file(html, BRIDGE_CSS, output)
        .map_err(|e| ConvertError::EngineFailed {
            engine: "fullbleed".into(),
            detail: e.to_string(),
        })?;
    debug!(pages, "fullbleed render finished");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn inject_css_lands_in_head() {
        let html = "<html><head><title>t</title></head><body>x</body></html>";
        let out = inject_css(html, "body{}");
        let style_pos = out.find("<style>").unwrap();
        let head_close = out.find("</head>").unwrap();
        assert!(style_pos < head_close);
    }

    #[test]
    fn inject_css_prepends_without_head() {
        let out = inject_css("<p>bare</p>", "body{}");
        assert!(out.starts_with("<style>"));
        assert!(out.ends_with("<p>bare</p>"));
    }

    #[test]
    fn shell_is_complete_markup() {
        let out = wrap_in_shell("<p>hi</p>", BRIDGE_CSS);
        assert!(out.contains("<!DOCTYPE html>"));
        assert!(out.contains("charset=\"utf-8\""));
        assert!(out.contains("<p>hi</p>"));
        assert!(out.contains("#4472C4"));
    }
}
