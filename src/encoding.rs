//! Heuristic text encoding detection for uploaded schedule files.
//!
//! School office exports arrive as Shift-JIS, UTF-8 or EUC-JP without any
//! declaration. Every candidate is decoded with replacement and scored by
//! the number of characters that signal mojibake; the lowest score wins.
//! This is a guess, not a proof: a file can decode "cleanly" under the
//! wrong encoding, and partially corrupted text is passed on so that the
//! value sanitizer can null the damaged cells.

use encoding_rs::{EUC_JP, Encoding, SHIFT_JIS, UTF_8};
use serde::Serialize;
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum CandidateEncoding {
    #[serde(rename = "shift_jis")]
    ShiftJis,
    #[serde(rename = "utf-8")]
    Utf8,
    #[serde(rename = "euc-jp")]
    EucJp,
}

impl CandidateEncoding {
    /// Candidates in preference order; earlier entries win ties.
    pub const PREFERENCE: [CandidateEncoding; 3] = [
        CandidateEncoding::ShiftJis,
        CandidateEncoding::Utf8,
        CandidateEncoding::EucJp,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            CandidateEncoding::ShiftJis => "shift_jis",
            CandidateEncoding::Utf8 => "utf-8",
            CandidateEncoding::EucJp => "euc-jp",
        }
    }

    fn codec(&self) -> &'static Encoding {
        match self {
            CandidateEncoding::ShiftJis => SHIFT_JIS,
            CandidateEncoding::Utf8 => UTF_8,
            CandidateEncoding::EucJp => EUC_JP,
        }
    }

    /// Decodes with replacement. Returns `None` when nothing was decoded.
    pub fn decode(&self, bytes: &[u8]) -> Option<ScoredCandidate> {
        let (text, _had_errors) = self.codec().decode_with_bom_removal(bytes);
        if text.is_empty() {
            return None;
        }
        let corruption = count_corruption(&text);
        Some(ScoredCandidate {
            encoding: *self,
            text: text.into_owned(),
            corruption,
        })
    }
}

impl fmt::Display for CandidateEncoding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One decoding attempt and its corruption score.
#[derive(Debug, Clone)]
pub struct ScoredCandidate {
    pub encoding: CandidateEncoding,
    pub text: String,
    pub corruption: usize,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DecodeError {
    attempted: Vec<CandidateEncoding>,
}

impl fmt::Display for DecodeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let names = self
            .attempted
            .iter()
            .map(CandidateEncoding::as_str)
            .collect::<Vec<_>>()
            .join(", ");
        write!(f, "could not determine file encoding (tried {names})")
    }
}

impl std::error::Error for DecodeError {}

/// U+FFFD or a C0 control other than tab, line feed and carriage return.
pub fn is_corruption_char(c: char) -> bool {
    matches!(
        c,
        '\u{FFFD}' | '\u{0000}'..='\u{0008}' | '\u{000B}'..='\u{000C}' | '\u{000E}'..='\u{001F}'
    )
}

pub fn count_corruption(text: &str) -> usize {
    text.chars().filter(|c| is_corruption_char(*c)).count()
}

pub fn contains_corruption(text: &str) -> bool {
    text.chars().any(is_corruption_char)
}

pub fn score_candidates(bytes: &[u8]) -> Vec<ScoredCandidate> {
    CandidateEncoding::PREFERENCE
        .iter()
        .filter_map(|candidate| candidate.decode(bytes))
        .collect()
}

pub fn detect_and_decode(bytes: &[u8]) -> Result<ScoredCandidate, DecodeError> {
    let candidates = score_candidates(bytes);
    for candidate in &candidates {
        tracing::debug!(
            encoding = %candidate.encoding,
            corruption = candidate.corruption,
            "scored encoding candidate"
        );
    }
    // min_by_key keeps the first minimum, which preserves preference order on ties.
    candidates
        .into_iter()
        .min_by_key(|candidate| candidate.corruption)
        .ok_or_else(|| DecodeError {
            attempted: CandidateEncoding::PREFERENCE.to_vec(),
        })
}
