//! Script detection and font resolution for the manual layout renderer.
//!
//! The hosts this service runs on carry wildly different font sets, so the
//! resolver probes an ordered candidate list per script category and embeds
//! the first file that parses. The result is returned as a
//! [`FontResolution`] value and passed explicitly into the renderer; nothing
//! is cached across requests and there is no process-wide font state.
//!
//! One deliberate compromise is carried over from the service's history: the
//! first font registered overall becomes the "main" font applied to every
//! paragraph and table style. A document mixing scripts renders entirely in
//! that one font; paragraphs whose detected script has no registered font
//! get a per-paragraph warning in the log, not a font switch.

use printpdf::font::ParsedFont;
use printpdf::{FontId, PdfDocument};
use std::collections::BTreeMap;
use std::path::Path;
use tracing::{debug, warn};

/// Bundled Latin fallback, embedded so the manual renderer and the text
/// converter work on hosts with no usable system fonts at all.
pub const FALLBACK_FONT: &[u8] = include_bytes!("../../assets/fonts/DejaVuSans.ttf");

/// Script categories the renderer distinguishes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Script {
    /// Devanagari block U+0900–U+097F (Hindi, Marathi, Nepali).
    Devanagari,
    /// Arabic blocks U+0600–U+06FF and U+0750–U+077F (Arabic, Urdu).
    Arabic,
    /// CJK Unified Ideographs U+4E00–U+9FFF and Extension A U+3400–U+4DBF.
    Cjk,
    /// Everything else, Latin included.
    Latin,
}

impl Script {
    /// Classify text by unicode range membership. The first non-Latin
    /// character decides; pure-Latin (or empty) text is [`Script::Latin`].
    pub fn detect(text: &str) -> Script {
        for ch in text.chars() {
            let c = ch as u32;
            if (0x0900..=0x097F).contains(&c) {
                return Script::Devanagari;
            }
            if (0x0600..=0x06FF).contains(&c) || (0x0750..=0x077F).contains(&c) {
                return Script::Arabic;
            }
            if (0x4E00..=0x9FFF).contains(&c) || (0x3400..=0x4DBF).contains(&c) {
                return Script::Cjk;
            }
        }
        Script::Latin
    }
}

/// Candidate font files per script, in probe order. Paths cover the Debian
/// and Fedora layouts this service is deployed on.
fn candidates(script: Script) -> &'static [&'static str] {
    match script {
        Script::Devanagari => &[
            "/usr/share/fonts/truetype/noto/NotoSansDevanagari-Regular.ttf",
            "/usr/share/fonts/truetype/lohit-devanagari/Lohit-Devanagari.ttf",
            "/usr/share/fonts/lohit-devanagari-fonts/Lohit-Devanagari.ttf",
        ],
        Script::Arabic => &[
            "/usr/share/fonts/truetype/noto/NotoSansArabic-Regular.ttf",
            "/usr/share/fonts/truetype/noto/NotoNaskhArabic-Regular.ttf",
            "/usr/share/fonts/truetype/kacst-one/KacstOne.ttf",
        ],
        Script::Cjk => &[
            "/usr/share/fonts/opentype/noto/NotoSansCJK-Regular.ttc",
            "/usr/share/fonts/truetype/wqy/wqy-zenhei.ttc",
            "/usr/share/fonts/truetype/wqy/wqy-microhei.ttc",
        ],
        Script::Latin => &[
            "/usr/share/fonts/truetype/dejavu/DejaVuSans.ttf",
            "/usr/share/fonts/dejavu-sans-fonts/DejaVuSans.ttf",
            "/usr/share/fonts/truetype/liberation/LiberationSans-Regular.ttf",
        ],
    }
}

/// Fonts registered into one PDF document under construction.
///
/// Built once per manual-render invocation; the `FontId`s are only valid for
/// the document they were registered into.
#[derive(Debug)]
pub struct FontResolution {
    fonts: BTreeMap<Script, FontId>,
    main: Option<FontId>,
    /// True when not even a system font registered and the renderer is
    /// running on the bundled fallback alone.
    pub degraded: bool,
}

impl FontResolution {
    /// Probe the host and register one font per script category into `doc`.
    ///
    /// The first font that registers (in Devanagari, Arabic, CJK, Latin
    /// probe order) becomes the main font. If no Latin-capable file is found
    /// on the host, the bundled fallback is registered for Latin, so
    /// [`FontResolution::main`] is `None` only if even the embedded font
    /// fails to parse.
    pub fn resolve(doc: &mut PdfDocument) -> FontResolution {
        let mut fonts = BTreeMap::new();
        let mut main: Option<FontId> = None;

        for script in [Script::Devanagari, Script::Arabic, Script::Cjk, Script::Latin] {
            for candidate in candidates(script) {
                match register_file(doc, Path::new(candidate)) {
                    Some(id) => {
                        debug!(?script, font = candidate, "Registered script font");
                        if main.is_none() {
                            main = Some(id.clone());
                        }
                        fonts.insert(script, id);
                        break;
                    }
                    None => continue,
                }
            }
        }

        let mut degraded = false;
        if !fonts.contains_key(&Script::Latin) {
            let mut warnings = Vec::new();
            match ParsedFont::from_bytes(FALLBACK_FONT, 0, &mut warnings) {
                Some(parsed) => {
                    warn!("No system fonts found; using bundled fallback font");
                    let id = doc.add_font(&parsed);
                    if main.is_none() {
                        main = Some(id.clone());
                    }
                    fonts.insert(Script::Latin, id);
                    degraded = true;
                }
                None => {
                    warn!("Bundled fallback font failed to parse; rendering degraded");
                    degraded = true;
                }
            }
        }

        FontResolution {
            fonts,
            main,
            degraded,
        }
    }

    /// The font applied to all paragraph and table styles.
    pub fn main(&self) -> Option<&FontId> {
        self.main.as_ref()
    }

    /// Whether a font covering `script` was registered. Used only to decide
    /// per-paragraph support warnings; rendering always uses the main font.
    pub fn supports(&self, script: Script) -> bool {
        self.fonts.contains_key(&script)
    }
}

/// Read and parse one candidate file, registering it on success.
fn register_file(doc: &mut PdfDocument, path: &Path) -> Option<FontId> {
    let bytes = std::fs::read(path).ok()?;
    let mut warnings = Vec::new();
    let parsed = ParsedFont::from_bytes(&bytes, 0, &mut warnings)?;
    Some(doc.add_font(&parsed))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn detects_devanagari() {
        assert_eq!(Script::detect("नमस्ते दुनिया"), Script::Devanagari);
    }

    #[test]
    fn detects_arabic() {
        assert_eq!(Script::detect("مرحبا بالعالم"), Script::Arabic);
    }

    #[test]
    fn detects_cjk() {
        assert_eq!(Script::detect("你好世界"), Script::Cjk);
    }

    #[test]
    fn latin_and_empty_default_to_latin() {
        assert_eq!(Script::detect("hello world"), Script::Latin);
        assert_eq!(Script::detect(""), Script::Latin);
        assert_eq!(Script::detect("café naïve"), Script::Latin);
    }

    #[test]
    fn mixed_text_reports_first_non_latin_script() {
        assert_eq!(Script::detect("price: ١٢٣"), Script::Arabic);
    }

    #[test]
    fn fallback_font_always_resolves() {
        let mut doc = PdfDocument::new("font test");
        let resolution = FontResolution::resolve(&mut doc);
        // The bundled font guarantees a main font even on bare hosts.
        assert!(resolution.main().is_some());
        assert!(resolution.supports(Script::Latin));
    }
}
