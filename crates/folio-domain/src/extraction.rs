//! Extraction state and method quality
//!
//! The store keeps the extraction state in one compact text column. This
//! module is the only place that knows that encoding; everything above the
//! store boundary works with [`ExtractionState`].
//!
//! | State | Stored form |
//! |-------|-------------|
//! | `Pending` | `NULL` |
//! | `ReprocessPending` | `REPROCESS\|<prior length>\|<prior method>` |
//! | `Succeeded` | `<method>` |
//! | `Succeeded` (rechecked) | `RECHECKED\|<method>` |
//! | `Failed` (no text) | `extraction_failed` |
//! | `Failed` (error) | `error: <reason>` |

use std::fmt;

/// Maximum number of characters kept from a failure reason
pub const MAX_FAILURE_REASON_CHARS: usize = 100;

/// Reason recorded when the adapter returned no usable text
pub const NO_TEXT_REASON: &str = "no text extracted";

/// Stored prefix of a document flagged for reprocessing
pub const REPROCESS_PREFIX: &str = "REPROCESS|";

/// Method label stored when the adapter names none usable
pub const UNKNOWN_METHOD: &str = "unknown";

/// Maximum number of characters kept from a method label
pub const MAX_METHOD_CHARS: usize = 64;

const RECHECKED_PREFIX: &str = "RECHECKED|";
const NO_TEXT_LABEL: &str = "extraction_failed";
const ERROR_PREFIX: &str = "error:";

/// Extraction state of a document
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExtractionState {
    /// No extraction attempted yet
    Pending,

    /// Previously extracted; re-extract and compare before replacing
    ReprocessPending {
        /// Length of the stored text, in characters
        prior_length: usize,
        /// Method label that produced the stored text
        prior_method: String,
    },

    /// Extraction succeeded
    Succeeded {
        /// Method label reported by the adapter
        method: String,
        /// Reached through a reprocess comparison that kept the stored text
        rechecked: bool,
    },

    /// Extraction attempted and failed
    Failed {
        /// Failure reason, at most [`MAX_FAILURE_REASON_CHARS`] characters
        reason: String,
    },
}

/// Error returned when a stored state string cannot be decoded
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StateParseError(String);

impl fmt::Display for StateParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Invalid extraction state: {}", self.0)
    }
}

impl std::error::Error for StateParseError {}

impl ExtractionState {
    /// Build a `Failed` state, truncating the reason to the storage limit
    pub fn failed(reason: impl Into<String>) -> Self {
        Self::Failed {
            reason: truncate_chars(reason.into(), MAX_FAILURE_REASON_CHARS),
        }
    }

    /// Build the `Failed` state used when the adapter found no text
    pub fn no_text() -> Self {
        Self::Failed {
            reason: NO_TEXT_REASON.to_string(),
        }
    }

    /// Whether the batch scheduler selects documents in this state
    pub fn is_selectable(&self) -> bool {
        matches!(self, Self::Pending | Self::ReprocessPending { .. })
    }

    /// Encode into the stored column value (`None` is SQL `NULL`)
    ///
    /// Method labels pass through [`normalize_method`], so a label can never
    /// be read back as one of the reserved forms.
    ///
    /// # Examples
    ///
    /// ```
    /// use folio_domain::ExtractionState;
    ///
    /// let state = ExtractionState::ReprocessPending {
    ///     prior_length: 120,
    ///     prior_method: "basic".to_string(),
    /// };
    /// assert_eq!(state.encode().as_deref(), Some("REPROCESS|120|basic"));
    /// assert_eq!(ExtractionState::decode(Some("REPROCESS|120|basic")).unwrap(), state);
    /// ```
    pub fn encode(&self) -> Option<String> {
        match self {
            Self::Pending => None,
            Self::ReprocessPending {
                prior_length,
                prior_method,
            } => Some(format!(
                "{}{}|{}",
                REPROCESS_PREFIX,
                prior_length,
                normalize_method(prior_method)
            )),
            Self::Succeeded {
                method,
                rechecked: false,
            } => Some(normalize_method(method)),
            Self::Succeeded {
                method,
                rechecked: true,
            } => Some(format!("{}{}", RECHECKED_PREFIX, normalize_method(method))),
            Self::Failed { reason } if reason == NO_TEXT_REASON => Some(NO_TEXT_LABEL.to_string()),
            Self::Failed { reason } => Some(format!("{} {}", ERROR_PREFIX, reason)),
        }
    }

    /// Decode a stored column value
    ///
    /// `NULL` and the empty string both mean `Pending`. Any label that is not
    /// one of the reserved forms is a method label of a successful extraction.
    pub fn decode(stored: Option<&str>) -> Result<Self, StateParseError> {
        let raw = match stored {
            None => return Ok(Self::Pending),
            Some(s) if s.trim().is_empty() => return Ok(Self::Pending),
            Some(s) => s,
        };

        if let Some(rest) = raw.strip_prefix(REPROCESS_PREFIX) {
            let (length, method) = rest
                .split_once('|')
                .ok_or_else(|| StateParseError(raw.to_string()))?;
            let prior_length = length
                .trim()
                .parse::<usize>()
                .map_err(|_| StateParseError(raw.to_string()))?;
            return Ok(Self::ReprocessPending {
                prior_length,
                prior_method: method.to_string(),
            });
        }

        if let Some(method) = raw.strip_prefix(RECHECKED_PREFIX) {
            return Ok(Self::Succeeded {
                method: method.to_string(),
                rechecked: true,
            });
        }

        if raw == NO_TEXT_LABEL {
            return Ok(Self::no_text());
        }

        if let Some(reason) = raw.strip_prefix(ERROR_PREFIX) {
            return Ok(Self::failed(reason.trim_start()));
        }

        Ok(Self::Succeeded {
            method: raw.to_string(),
            rechecked: false,
        })
    }

    /// Short lowercase name of the variant, for logs and summaries
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::ReprocessPending { .. } => "reprocess_pending",
            Self::Succeeded { .. } => "succeeded",
            Self::Failed { .. } => "failed",
        }
    }
}

/// Make an adapter's method label safe to store
///
/// Characters other than ASCII alphanumerics, `_`, `-` and `.` become `_`,
/// and the result is cut to [`MAX_METHOD_CHARS`]. Empty labels and the
/// reserved no-text marker become [`UNKNOWN_METHOD`].
///
/// # Examples
///
/// ```
/// use folio_domain::extraction::normalize_method;
///
/// assert_eq!(normalize_method("improved_pdfpig"), "improved_pdfpig");
/// assert_eq!(normalize_method("REPROCESS|3|x"), "REPROCESS_3_x");
/// assert_eq!(normalize_method("  "), "unknown");
/// ```
pub fn normalize_method(label: &str) -> String {
    let cleaned: String = label
        .trim()
        .chars()
        .take(MAX_METHOD_CHARS)
        .map(|c| {
            if c.is_ascii_alphanumeric() || matches!(c, '_' | '-' | '.') {
                c
            } else {
                '_'
            }
        })
        .collect();

    if cleaned.is_empty() || cleaned == NO_TEXT_LABEL {
        UNKNOWN_METHOD.to_string()
    } else {
        cleaned
    }
}

fn truncate_chars(mut s: String, max: usize) -> String {
    if let Some((idx, _)) = s.char_indices().nth(max) {
        s.truncate(idx);
    }
    s
}

/// Relative quality of an extraction method label
///
/// Labels are free-form strings from the adapter. Quality is inferred from
/// well-known fragments: `improved` marks the strong PDF parser, `basic` and
/// `low_quality` mark the weak fallbacks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum MethodQuality {
    /// Fallback extractors (`basic_pdfpig`, low-confidence OCR)
    Weak,

    /// Everything not otherwise classified
    Standard,

    /// Improved extractors (`improved_pdfpig`)
    Strong,
}

impl MethodQuality {
    /// Classify a method label
    pub fn of(label: &str) -> Self {
        let label = label.to_ascii_lowercase();
        if label.contains("improved") {
            Self::Strong
        } else if label.contains("basic") || label.contains("low_quality") {
            Self::Weak
        } else {
            Self::Standard
        }
    }

    /// Get the quality name as a string
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Weak => "weak",
            Self::Standard => "standard",
            Self::Strong => "strong",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pending_is_null() {
        assert_eq!(ExtractionState::Pending.encode(), None);
        assert_eq!(ExtractionState::decode(None).unwrap(), ExtractionState::Pending);
        assert_eq!(ExtractionState::decode(Some("")).unwrap(), ExtractionState::Pending);
    }

    #[test]
    fn test_decode_reprocess() {
        let state = ExtractionState::decode(Some("REPROCESS|120|basic")).unwrap();
        assert_eq!(
            state,
            ExtractionState::ReprocessPending {
                prior_length: 120,
                prior_method: "basic".to_string()
            }
        );
        assert!(state.is_selectable());
    }

    #[test]
    fn test_decode_reprocess_malformed() {
        assert!(ExtractionState::decode(Some("REPROCESS|abc|basic")).is_err());
        assert!(ExtractionState::decode(Some("REPROCESS|120")).is_err());
    }

    #[test]
    fn test_decode_legacy_labels() {
        assert_eq!(
            ExtractionState::decode(Some("extraction_failed")).unwrap(),
            ExtractionState::no_text()
        );
        assert_eq!(
            ExtractionState::decode(Some("error: Access denied")).unwrap(),
            ExtractionState::Failed {
                reason: "Access denied".to_string()
            }
        );
        assert_eq!(
            ExtractionState::decode(Some("tesseract_ocr_0.87")).unwrap(),
            ExtractionState::Succeeded {
                method: "tesseract_ocr_0.87".to_string(),
                rechecked: false
            }
        );
    }

    #[test]
    fn test_rechecked_encoding() {
        let state = ExtractionState::Succeeded {
            method: "basic_pdfpig".to_string(),
            rechecked: true,
        };
        assert_eq!(state.encode().as_deref(), Some("RECHECKED|basic_pdfpig"));
        assert!(!state.is_selectable());
    }

    #[test]
    fn test_failed_reason_truncated() {
        let long = "x".repeat(250);
        match ExtractionState::failed(long) {
            ExtractionState::Failed { reason } => assert_eq!(reason.chars().count(), 100),
            other => panic!("unexpected state {:?}", other),
        }
    }

    #[test]
    fn test_failed_reason_truncated_on_char_boundary() {
        let long = "é".repeat(150);
        match ExtractionState::failed(long) {
            ExtractionState::Failed { reason } => {
                assert_eq!(reason.chars().count(), MAX_FAILURE_REASON_CHARS);
                assert_eq!(reason.len(), MAX_FAILURE_REASON_CHARS * 2);
            }
            other => panic!("unexpected state {:?}", other),
        }
    }

    #[test]
    fn test_reserved_method_labels_stay_succeeded() {
        let labels = [
            "REPROCESS|3|x",
            "REPROCESS|oops",
            "RECHECKED|basic_pdfpig",
            "error: boom",
            "error:",
            "extraction_failed",
            "",
        ];
        for label in labels {
            for rechecked in [false, true] {
                let state = ExtractionState::Succeeded {
                    method: label.to_string(),
                    rechecked,
                };
                let decoded = ExtractionState::decode(state.encode().as_deref()).unwrap();
                assert_eq!(
                    decoded,
                    ExtractionState::Succeeded {
                        method: normalize_method(label),
                        rechecked
                    },
                    "label {:?}",
                    label
                );
                assert!(!decoded.is_selectable());
            }
        }
    }

    #[test]
    fn test_normalize_method() {
        assert_eq!(normalize_method("tesseract_ocr_0.87"), "tesseract_ocr_0.87");
        assert_eq!(normalize_method("error: boom"), "error__boom");
        assert_eq!(normalize_method("extraction_failed"), UNKNOWN_METHOD);
        assert_eq!(normalize_method(" \t"), UNKNOWN_METHOD);
        assert_eq!(normalize_method(&"m".repeat(200)).len(), MAX_METHOD_CHARS);
    }

    #[test]
    fn test_reprocess_prior_method_normalized() {
        let state = ExtractionState::ReprocessPending {
            prior_length: 12,
            prior_method: "a|b".to_string(),
        };
        assert_eq!(state.encode().as_deref(), Some("REPROCESS|12|a_b"));
    }

    #[test]
    fn test_method_quality() {
        assert_eq!(MethodQuality::of("improved_pdfpig"), MethodQuality::Strong);
        assert_eq!(MethodQuality::of("basic_pdfpig"), MethodQuality::Weak);
        assert_eq!(MethodQuality::of("basic"), MethodQuality::Weak);
        assert_eq!(MethodQuality::of("tesseract_ocr_low_quality_0.31"), MethodQuality::Weak);
        assert_eq!(MethodQuality::of("google_drive_export"), MethodQuality::Standard);
        assert_eq!(MethodQuality::of("plain_text"), MethodQuality::Standard);
        assert!(MethodQuality::Strong > MethodQuality::Weak);
    }
}

#[cfg(test)]
mod proptests {
    use super::*;
    use proptest::prelude::*;

    fn method_label() -> impl Strategy<Value = String> {
        "[a-z_]{1,12}[0-9.]{0,4}".prop_filter("reserved label", |s| s != NO_TEXT_LABEL)
    }

    proptest! {
        /// Property: every non-pending state survives encode/decode
        #[test]
        fn test_state_codec_property(
            len in 0usize..1_000_000,
            method in method_label(),
            rechecked: bool,
            reason in "[a-zA-Z ]{1,150}",
        ) {
            let states = vec![
                ExtractionState::ReprocessPending {
                    prior_length: len,
                    prior_method: method.clone(),
                },
                ExtractionState::Succeeded { method, rechecked },
                ExtractionState::failed(reason.trim().to_string()),
            ];
            for state in states {
                if matches!(&state, ExtractionState::Failed { reason } if reason.is_empty()) {
                    continue;
                }
                let encoded = state.encode();
                prop_assert!(encoded.is_some());
                prop_assert_eq!(ExtractionState::decode(encoded.as_deref()).unwrap(), state);
            }
        }

        /// Property: any adapter label encodes to a non-selectable success
        #[test]
        fn test_any_method_label_is_stored_safely(label in ".{0,80}") {
            let state = ExtractionState::Succeeded { method: label.clone(), rechecked: false };
            let decoded = ExtractionState::decode(state.encode().as_deref()).unwrap();
            prop_assert!(!decoded.is_selectable());
            let expected = ExtractionState::Succeeded {
                method: normalize_method(&label),
                rechecked: false,
            };
            prop_assert_eq!(decoded, expected);
        }

        /// Property: decoding never panics and only `Pending`/`ReprocessPending` are selectable
        #[test]
        fn test_decode_total(raw in ".{0,40}") {
            if let Ok(state) = ExtractionState::decode(Some(&raw)) {
                let selectable = matches!(
                    state,
                    ExtractionState::Pending | ExtractionState::ReprocessPending { .. }
                );
                prop_assert_eq!(state.is_selectable(), selectable);
            }
        }
    }
}
