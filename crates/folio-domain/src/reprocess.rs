//! Reprocessing verdicts
//!
//! When a document that already has text is extracted again, [`decide`]
//! chooses between the stored text and the fresh result. Rules are applied
//! in order and the first match wins:
//!
//! 1. new length > 1.2 × prior length: use new
//! 2. new length < 0.5 × prior length: keep prior
//! 3. new method is strong and prior method is weak: use new
//! 4. new length ≥ prior length: use new
//! 5. otherwise keep prior
//!
//! Lengths are counted in characters.

use crate::extraction::MethodQuality;
use std::fmt;

const LONGER_FACTOR: f64 = 1.2;
const TOO_SHORT_FACTOR: f64 = 0.5;

/// Why a verdict was reached
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ReprocessReason {
    /// Rule 1
    NewTextLonger,
    /// Rule 2
    NewTooShort,
    /// Rule 3
    BetterMethod,
    /// Rule 4
    EqualOrLonger,
    /// Rule 5
    NewShorter,
}

impl ReprocessReason {
    /// Human-readable reason
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::NewTextLonger => "new text longer",
            Self::NewTooShort => "new too short",
            Self::BetterMethod => "better extraction method",
            Self::EqualOrLonger => "equal or longer",
            Self::NewShorter => "new shorter",
        }
    }
}

impl fmt::Display for ReprocessReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Outcome of comparing a fresh extraction with stored text
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReprocessVerdict {
    /// Replace the stored text with the new text
    pub use_new: bool,

    /// Rule that produced the verdict
    pub reason: ReprocessReason,

    /// Character count of the new text
    pub new_length: usize,
}

/// Decide whether a fresh extraction replaces the stored text
///
/// Pure and total: any input produces a verdict.
///
/// # Examples
///
/// ```
/// use folio_domain::{decide, ReprocessReason};
///
/// let verdict = decide(100, "basic", &"x".repeat(130), "improved_pdfpig");
/// assert!(verdict.use_new);
/// assert_eq!(verdict.reason, ReprocessReason::NewTextLonger);
///
/// let verdict = decide(100, "basic", &"x".repeat(40), "basic");
/// assert!(!verdict.use_new);
/// ```
pub fn decide(
    prior_length: usize,
    prior_method: &str,
    new_text: &str,
    new_method: &str,
) -> ReprocessVerdict {
    let new_length = new_text.chars().count();
    let prior = prior_length as f64;
    let new = new_length as f64;

    let (use_new, reason) = if new > prior * LONGER_FACTOR {
        (true, ReprocessReason::NewTextLonger)
    } else if new < prior * TOO_SHORT_FACTOR {
        (false, ReprocessReason::NewTooShort)
    } else if MethodQuality::of(new_method) == MethodQuality::Strong
        && MethodQuality::of(prior_method) == MethodQuality::Weak
    {
        (true, ReprocessReason::BetterMethod)
    } else if new_length >= prior_length {
        (true, ReprocessReason::EqualOrLonger)
    } else {
        (false, ReprocessReason::NewShorter)
    };

    ReprocessVerdict {
        use_new,
        reason,
        new_length,
    }
}
