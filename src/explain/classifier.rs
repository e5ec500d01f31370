//! Heuristic content classification
//!
//! Picks the [`Mode`] used to tailor backend prompts. Checks run in priority
//! order (code, legal, academic) and the first match wins.

use super::models::Mode;
use once_cell::sync::Lazy;
use regex::Regex;

static CODE_KEYWORDS: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)\b(class|def|function|console\.log|printf|#include|var\s)")
        .expect("code keyword pattern")
});

static BRACE_NEWLINE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\{\s*\n").expect("brace pattern"));

static LEGAL_TERMS: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)\b(agreement|lease|warranty|hereby|party|obligation|indemnif)")
        .expect("legal pattern")
});

static ACADEMIC_TERMS: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)\b(abstract|et al\.|study|methodology|conclusion|results)\b")
        .expect("academic pattern")
});

/// Classify free text into a content mode
pub fn classify(text: &str) -> Mode {
    let t = text.trim();
    if CODE_KEYWORDS.is_match(t) || BRACE_NEWLINE.is_match(t) {
        Mode::Code
    } else if LEGAL_TERMS.is_match(t) {
        Mode::Legal
    } else if ACADEMIC_TERMS.is_match(t) {
        Mode::Academic
    } else {
        Mode::General
    }
}

/// Explicit mode when it parses, otherwise the classified one
pub fn resolve_mode(explicit: Option<&str>, text: &str) -> Mode {
    explicit.and_then(Mode::parse).unwrap_or_else(|| classify(text))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_code_detection() {
        assert_eq!(classify("def f(): pass"), Mode::Code);
        assert_eq!(classify("console.log('x')"), Mode::Code);
        assert_eq!(classify("VAR x = 1"), Mode::Code);
        assert_eq!(classify("if (x) {\n  y();\n}"), Mode::Code);
    }

    #[test]
    fn test_code_precedes_legal() {
        assert_eq!(
            classify("function foo(){ return 'the parties hereby agree'; }"),
            Mode::Code
        );
    }

    #[test]
    fn test_legal_detection() {
        assert_eq!(classify("The Tenant shall indemnify the Landlord."), Mode::Legal);
        assert_eq!(classify("This Agreement is made between..."), Mode::Legal);
    }

    #[test]
    fn test_academic_detection() {
        assert_eq!(classify("Smith et al. report consistent results."), Mode::Academic);
        assert_eq!(classify("Our methodology follows prior work"), Mode::Academic);
        // whole words only
        assert_eq!(classify("studying the menu"), Mode::General);
    }

    #[test]
    fn test_general_fallback() {
        assert_eq!(classify(""), Mode::General);
        assert_eq!(classify("The weather is nice today."), Mode::General);
    }

    #[test]
    fn test_resolve_mode() {
        assert_eq!(resolve_mode(Some("legal"), "def f(): pass"), Mode::Legal);
        assert_eq!(resolve_mode(Some(""), "def f(): pass"), Mode::Code);
        assert_eq!(resolve_mode(Some("auto"), "plain words"), Mode::General);
        assert_eq!(resolve_mode(None, "hereby"), Mode::Legal);
    }
}
