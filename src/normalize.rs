//! Name normalization into canonical comparison keys.
//!
//! The fixed composition order is: transliterate to Latin/ASCII, apply
//! compatibility Unicode normalization (NFKD), drop remaining non-ASCII,
//! lowercase, replace non-alphanumerics with spaces, then (organizations
//! only) strip legal-form tokens, and collapse whitespace. Every function
//! here is total: missing or unrepresentable input yields an empty string,
//! and an empty normalized name is never a valid comparison key.

use regex::Regex;
use unicode_normalization::UnicodeNormalization;
use unidecode::unidecode;

use crate::error::ValidationError;
use crate::legal_forms;

/// Canonicalizes a raw name into the comparison alphabet `[a-z0-9 ]`.
///
/// Idempotent: normalizing an already-normalized name returns it unchanged.
///
/// # Examples
///
/// ```
/// use sanmatch::normalize::normalize_name;
///
/// assert_eq!(normalize_name("  Müller-Schmidt, José  "), "muller schmidt jose");
/// assert_eq!(normalize_name(""), "");
/// ```
#[must_use]
pub fn normalize_name(raw: &str) -> String {
    let latin = unidecode(raw);
    let folded: String = latin.nfkd().filter(char::is_ascii).collect();
    let mut cleaned = String::with_capacity(folded.len());
    for c in folded.chars() {
        if c.is_ascii_alphanumeric() {
            cleaned.push(c.to_ascii_lowercase());
        } else {
            cleaned.push(' ');
        }
    }
    collapse_whitespace(&cleaned)
}

/// Canonicalizes a city name for use as an organization blocking key.
///
/// Cities share the name alphabet and rules; an empty result means the
/// attribute is missing and must be stored as `None`, not as `""`.
#[must_use]
pub fn normalize_city(raw: &str) -> String {
    normalize_name(raw)
}

/// Collapses runs of whitespace to single spaces and trims the ends.
fn collapse_whitespace(s: &str) -> String {
    s.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Strips organizational legal-form tokens from normalized names.
///
/// Owns one compiled matcher built from a pattern table; the built-in
/// table lives in [`legal_forms::DEFAULT_PATTERNS`] and a custom table can
/// be supplied to grow locale coverage. Matching is case-insensitive with
/// exact word-boundary semantics. Applied to organization records only,
/// never to individuals.
#[derive(Debug, Clone)]
pub struct LegalFormStripper {
    matcher: Regex,
}

impl LegalFormStripper {
    /// Compiles a stripper from a pattern table.
    ///
    /// Each pattern is wrapped in word boundaries and the table is joined
    /// into a single preference-ordered alternation, so more specific
    /// forms must precede their prefixes.
    ///
    /// # Errors
    ///
    /// Returns [`ValidationError::EmptyPatternTable`] for an empty table
    /// and [`ValidationError::InvalidPattern`] if the joined alternation
    /// does not compile.
    pub fn new(patterns: &[&str]) -> Result<Self, ValidationError> {
        if patterns.is_empty() {
            return Err(ValidationError::EmptyPatternTable);
        }
        let joined = patterns
            .iter()
            .map(|p| format!(r"\b(?:{p})\b"))
            .collect::<Vec<_>>()
            .join("|");
        let matcher = Regex::new(&format!("(?i){joined}")).map_err(|e| {
            ValidationError::InvalidPattern {
                pattern: joined,
                reason: e.to_string(),
            }
        })?;
        Ok(Self { matcher })
    }

    /// A stripper over the built-in pattern table.
    #[must_use]
    pub fn builtin() -> Self {
        Self::new(legal_forms::DEFAULT_PATTERNS).expect("built-in legal-form table compiles")
    }

    /// Removes legal-form tokens and re-collapses whitespace.
    #[must_use]
    pub fn strip(&self, name: &str) -> String {
        let replaced = self.matcher.replace_all(name, " ");
        collapse_whitespace(&replaced)
    }

    /// Full organization-name canonicalization: normalize, then strip.
    #[must_use]
    pub fn normalize_org_name(&self, raw: &str) -> String {
        self.strip(&normalize_name(raw))
    }
}
