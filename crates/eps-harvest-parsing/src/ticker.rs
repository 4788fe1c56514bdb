//! Security ticker inference from free text.

use std::collections::{HashMap, HashSet};

/// Financial jargon that looks like a ticker but never is one: currency
/// codes, exchanges, index names and ratio abbreviations.
pub const DEFAULT_TICKER_BLACKLIST: &[&str] = &[
    "MBS", "PDF", "EPS", "KKN", "CP", "QTR", "BCT", "KCN", "HNX", "HSX", "HOSE", "VNI", "VN30",
    "VN3", "UPCOM", "USD", "VND", "VIX", "VNINDEX", "FY2", "FY1", "ROE", "ROA", "NIM", "YOY",
    "QOQ", "YTD", "EUR", "GDP", "CPI", "TTM", "BVPS", "DPS", "LNST", "TTCK", "NPL", "CIR",
];

/// Infers the most plausible ticker from document text.
///
/// Candidates are runs of exactly three uppercase letters, or two uppercase
/// letters followed by one digit. A run counts only when neither neighbour is
/// an uppercase ASCII letter, so `HOSE` never yields `HOS`, while `VHM2023`
/// and `VHMcập` still yield `VHM`. Digits and lowercase letters do not break a
/// match, which is why `VN3` (from `VN30`) sits in the deny-list.
#[derive(Debug, Clone)]
pub struct TickerDetector {
    blacklist: HashSet<String>,
    allowlist: Option<HashSet<String>>,
}

impl Default for TickerDetector {
    fn default() -> Self {
        Self::new(DEFAULT_TICKER_BLACKLIST.iter().map(|s| s.to_string()))
    }
}

impl TickerDetector {
    pub fn new<I, S>(blacklist: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            blacklist: blacklist
                .into_iter()
                .map(|s| s.into().to_uppercase())
                .collect(),
            allowlist: None,
        }
    }

    /// Restrict results to a known set of listed codes.
    pub fn with_allowlist(mut self, codes: HashSet<String>) -> Self {
        self.allowlist = Some(codes.into_iter().map(|c| c.to_uppercase()).collect());
        self
    }

    /// Most frequent surviving candidate in `text`, if any.
    ///
    /// Ties go to the candidate seen first, with three-letter tokens ordered
    /// ahead of letter-letter-digit tokens.
    pub fn detect(&self, text: &str) -> Option<String> {
        let (letters, mixed) = scan_candidates(text);

        let mut counts: HashMap<&str, usize> = HashMap::new();
        let mut order: Vec<&str> = Vec::new();
        for token in letters.iter().chain(mixed.iter()).copied() {
            if !self.accepts(token) {
                continue;
            }
            let count = counts.entry(token).or_insert(0);
            if *count == 0 {
                order.push(token);
            }
            *count += 1;
        }

        let mut best: Option<(&str, usize)> = None;
        for token in order {
            let n = counts[token];
            if best.is_none_or(|(_, top)| n > top) {
                best = Some((token, n));
            }
        }

        match best {
            Some((token, n)) => {
                tracing::debug!(ticker = token, occurrences = n, "ticker detected");
                Some(token.to_string())
            }
            None => {
                tracing::debug!("no ticker candidate survived filtering");
                None
            }
        }
    }

    fn accepts(&self, token: &str) -> bool {
        if self.blacklist.contains(token) {
            return false;
        }
        match &self.allowlist {
            Some(allow) => allow.contains(token),
            None => true,
        }
    }
}

/// Collect every three-byte window with a ticker shape whose neighbours are
/// not uppercase ASCII letters, in order of appearance.
fn scan_candidates(text: &str) -> (Vec<&str>, Vec<&str>) {
    let b = text.as_bytes();
    let mut letters = Vec::new();
    let mut mixed = Vec::new();

    let mut i = 0;
    while i + 3 <= b.len() {
        let before = i.checked_sub(1).map(|j| b[j]);
        let after = b.get(i + 3).copied();
        let isolated = !before.is_some_and(|c| c.is_ascii_uppercase())
            && !after.is_some_and(|c| c.is_ascii_uppercase());
        // Only ASCII bytes here, so the slice falls on char boundaries.
        if isolated && b[i].is_ascii_uppercase() && b[i + 1].is_ascii_uppercase() {
            if b[i + 2].is_ascii_uppercase() {
                letters.push(&text[i..i + 3]);
                i += 3;
                continue;
            }
            if b[i + 2].is_ascii_digit() {
                mixed.push(&text[i..i + 3]);
                i += 3;
                continue;
            }
        }
        i += 1;
    }

    (letters, mixed)
}

/// True when `code` appears in `text` as a standalone word, ignoring case.
pub fn ticker_in_text(code: &str, text: &str) -> bool {
    let code = code.trim();
    if code.is_empty() {
        return false;
    }
    text.split(|c: char| !c.is_alphanumeric())
        .any(|word| word.eq_ignore_ascii_case(code))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_detect_skips_blacklisted() {
        let text = "VHM VHM USD VHM USD VHM USD VHM";
        assert_eq!(TickerDetector::default().detect(text).as_deref(), Some("VHM"));
    }

    #[test]
    fn test_detect_most_frequent() {
        let text = "Khuyến nghị MUA cổ phiếu FPT. FPT tăng trưởng; MWG đi ngang. FPT";
        assert_eq!(TickerDetector::default().detect(text).as_deref(), Some("FPT"));
    }

    #[test]
    fn test_detect_tie_first_seen_wins() {
        let detector = TickerDetector::default();
        assert_eq!(detector.detect("HPG then VNM").as_deref(), Some("HPG"));
        assert_eq!(detector.detect("VNM then HPG").as_deref(), Some("VNM"));
    }

    #[test]
    fn test_detect_letters_before_mixed_on_tie() {
        // The mixed token appears first in the text but letters win ties.
        let detector = TickerDetector::default();
        assert_eq!(detector.detect("HT1 then BMP").as_deref(), Some("BMP"));
    }

    #[test]
    fn test_detect_letter_digit_token() {
        let detector = TickerDetector::default();
        assert_eq!(detector.detect("Công ty HT1, HT1 và C32").as_deref(), Some("HT1"));
    }

    #[test]
    fn test_detect_requires_whole_token() {
        let detector = TickerDetector::default();
        // Longer uppercase runs never yield a 3-character slice.
        assert_eq!(detector.detect("HOSE VNINDEX ABCD VN30 HNX30"), None);
        // Lowercase words are ignored.
        assert_eq!(detector.detect("the cat sat"), None);
    }

    #[test]
    fn test_detect_token_glued_to_digits_or_lowercase() {
        let detector = TickerDetector::default();
        assert_eq!(
            detector.detect("VHM2023 VHM2024 VHM2025").as_deref(),
            Some("VHM")
        );
        assert_eq!(detector.detect("HT12 HT12").as_deref(), Some("HT1"));
        assert_eq!(detector.detect("VHMcập nhật VHMgiá").as_deref(), Some("VHM"));
        // The glued digit run of an index name stays filtered.
        assert_eq!(detector.detect("VN30 VN30 VN30 FPT").as_deref(), Some("FPT"));
    }

    #[test]
    fn test_detect_with_allowlist() {
        let allow: HashSet<String> = ["VCB".to_string()].into_iter().collect();
        let detector = TickerDetector::default().with_allowlist(allow);
        assert_eq!(detector.detect("ABC ABC ABC VCB").as_deref(), Some("VCB"));
        assert_eq!(detector.detect("ABC ABC"), None);
    }

    #[test]
    fn test_detect_custom_blacklist() {
        let detector = TickerDetector::new(["abc"]);
        assert_eq!(detector.detect("ABC ABC XYZ").as_deref(), Some("XYZ"));
    }

    #[test]
    fn test_detect_empty_text() {
        assert_eq!(TickerDetector::default().detect(""), None);
    }

    #[test]
    fn test_ticker_in_text() {
        assert!(ticker_in_text("VHM", "Báo cáo cập nhật vhm - Q3"));
        assert!(ticker_in_text("vhm", "(VHM)"));
        assert!(!ticker_in_text("VHM", "VHMX holdings"));
        assert!(!ticker_in_text("VHM", ""));
        assert!(!ticker_in_text("", "VHM"));
    }
}
