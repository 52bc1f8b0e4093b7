//! Command normalization: reduce a raw command string to the canonical form
//! all deterministic matching runs against.
//!
//! The normalized form defeats the cheap obfuscations — fullwidth/compat
//! Unicode forms, zero-width spaces, backslash-splitting (`s\u\d\o`), line
//! continuations, and whitespace padding. The *original* string is what gets
//! executed once a command is permitted, so legitimate escapes survive.

use regex::Regex;
use std::sync::LazyLock;
use unicode_normalization::UnicodeNormalization;

fn line_continuation() -> &'static Regex {
    static RE: LazyLock<Regex> =
        LazyLock::new(|| Regex::new(r"\\\r?\n").expect("Failed to compile line continuation regex"));
    &RE
}

fn escaped_char() -> &'static Regex {
    static RE: LazyLock<Regex> =
        LazyLock::new(|| Regex::new(r"\\+(\S)").expect("Failed to compile escaped char regex"));
    &RE
}

fn escaped_whitespace() -> &'static Regex {
    static RE: LazyLock<Regex> = LazyLock::new(|| {
        Regex::new(r"\\+\s+").expect("Failed to compile escaped whitespace regex")
    });
    &RE
}

fn whitespace_run() -> &'static Regex {
    static RE: LazyLock<Regex> =
        LazyLock::new(|| Regex::new(r"\s+").expect("Failed to compile whitespace regex"));
    &RE
}

/// Normalize a raw command string. Total function; never fails, and
/// `normalize(normalize(s)) == normalize(s)` for every `s`.
pub fn normalize(raw: &str) -> String {
    // NFKC collapses fullwidth/halfwidth forms and compatibility ligatures.
    // It does NOT fold Latin/Cyrillic homoglyphs; that gap is documented in
    // the red-team suite.
    let composed: String = raw.nfkc().collect();
    let stripped = composed.replace('\u{200B}', "");

    let joined = line_continuation().replace_all(&stripped, "");
    let unescaped = escaped_char().replace_all(&joined, "$1");
    let spaced = escaped_whitespace().replace_all(&unescaped, " ");
    let collapsed = whitespace_run().replace_all(&spaced, " ");

    // Stripping can uncover combining sequences (e.g. base letter + ZWSP +
    // combining mark); recompose so the result is normalization-stable.
    collapsed.trim().nfkc().collect()
}
