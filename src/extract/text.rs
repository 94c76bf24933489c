//! Text normalisation: strip recognition artefacts from extracted text.
//!
//! When a PDF embeds a font subset without a usable ToUnicode map, the
//! converter cannot decode some glyphs and emits placeholder tokens instead,
//! e.g. `GLYPH<c=1,font=/AAAAAH+Calibri-Bold>` or `glyph<17>`. These carry
//! no content and break downstream tokenisation, so every text, caption and
//! table cell passes through [`clean_text`] before it is emitted.
//!
//! ## Rule Order
//!
//! Placeholders are replaced by a space (not removed) so the words on either
//! side never fuse; the whitespace pass then collapses the gap. Trimming runs
//! last. Only horizontal whitespace is collapsed: newlines separate lines of
//! a paragraph and are kept.

use once_cell::sync::Lazy;
use regex::Regex;

/// Apply all normalisation rules to a piece of extracted text.
///
/// Rules (applied in order):
/// 1. Replace glyph placeholders with a space
/// 2. Collapse runs of spaces and tabs to one space
/// 3. Trim leading and trailing whitespace
///
/// The function is idempotent: `clean_text(&clean_text(x)) == clean_text(x)`.
pub fn clean_text(input: &str) -> String {
    let s = replace_glyph_placeholders(input);
    let s = collapse_horizontal_whitespace(&s);
    s.trim().to_string()
}

// ── Rule 1: Glyph placeholders ───────────────────────────────────────────────

static RE_GLYPH: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)glyph<(?:c=\d+,font=/[A-Z0-9]+\+[A-Za-z0-9-]+|\d+)>").unwrap()
});

fn replace_glyph_placeholders(input: &str) -> String {
    RE_GLYPH.replace_all(input, " ").into_owned()
}

// ── Rule 2: Horizontal whitespace ────────────────────────────────────────────

static RE_HSPACE: Lazy<Regex> = Lazy::new(|| Regex::new(r"[ \t]+").unwrap());

fn collapse_horizontal_whitespace(input: &str) -> String {
    RE_HSPACE.replace_all(input, " ").into_owned()
}

// ── Tests ────────────────────────────────────────────────────────────────────
