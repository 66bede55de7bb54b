//! Japanese collation for bridge names.
//!
//! Listing order is collation order, not code-unit order: e.g. katakana カ sorts
//! before hiragana き, and lower-case latin before upper-case of the next letter.

use std::cmp::Ordering;

use icu_collator::{Collator, CollatorOptions};
use icu_locid::locale;

use crate::error::{AppError, AppResult};

pub struct NameCollator {
    inner: Collator,
}

impl NameCollator {
    pub fn japanese() -> AppResult<Self> {
        let inner = Collator::try_new(&locale!("ja").into(), CollatorOptions::new())
            .map_err(|e| AppError::internal("collator_unavailable".to_string(), format!("japanese collation data unavailable: {:?}", e)))?;
        Ok(Self { inner })
    }

    pub fn compare(&self, a: &str, b: &str) -> Ordering {
        // Collation-equal names fall back to code units so the order is total
        self.inner.compare(a, b).then_with(|| a.cmp(b))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sorted(names: &[&str]) -> Vec<String> {
        let c = NameCollator::japanese().unwrap();
        let mut v: Vec<String> = names.iter().map(|s| s.to_string()).collect();
        v.sort_by(|a, b| c.compare(a, b));
        v
    }

    #[test]
    fn latin_then_kana_then_kanji() {
        assert_eq!(sorted(&["橋A", "あ橋", "Z橋"]), vec!["Z橋", "あ橋", "橋A"]);
    }

    #[test]
    fn differs_from_code_unit_order() {
        // code units: き (U+304D) < カ (U+30AB); collation: カ (ka) < き (ki)
        assert_eq!(sorted(&["き橋", "カ橋"]), vec!["カ橋", "き橋"]);
        // code units: B < a; collation: a < B
        assert_eq!(sorted(&["B橋", "a橋"]), vec!["a橋", "B橋"]);
    }
}
