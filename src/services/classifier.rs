//! Order-award announcement classification.
//!
//! Recall-oriented: a false positive only costs one document fetch, a false
//! negative loses an award from the day's results.

use crate::config::ClassifierConfig;

/// Separator placed between title and summary before matching.
const FIELD_SEPARATOR: &str = " || ";

/// Lowercase, turn `_`/`-` into spaces and collapse whitespace.
pub fn normalize_text(s: &str) -> String {
    s.trim()
        .to_lowercase()
        .replace(['_', '-'], " ")
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
}

/// Decides whether a title/summary pair announces an order award.
#[derive(Debug, Clone)]
pub struct AnnouncementClassifier {
    keywords: Vec<String>,
    category_phrase: String,
    award_phrases: Vec<String>,
}

impl AnnouncementClassifier {
    pub fn new(config: &ClassifierConfig) -> Self {
        let normalize_all = |list: &[String]| -> Vec<String> {
            list.iter()
                .map(|k| normalize_text(k))
                .filter(|k| !k.is_empty())
                .collect()
        };
        Self {
            keywords: normalize_all(&config.keywords),
            category_phrase: normalize_text(&config.category_phrase),
            award_phrases: normalize_all(&config.award_phrases),
        }
    }

    pub fn is_order_announcement(&self, title: &str, summary: &str) -> bool {
        let hay = format!(
            "{}{}{}",
            normalize_text(title),
            FIELD_SEPARATOR,
            normalize_text(summary)
        );

        if !self.category_phrase.is_empty()
            && hay.contains(&self.category_phrase)
            && self.award_phrases.iter().any(|p| hay.contains(p.as_str()))
        {
            return true;
        }

        self.keywords.iter().any(|k| hay.contains(k.as_str()))
    }
}

impl Default for AnnouncementClassifier {
    fn default() -> Self {
        Self::new(&ClassifierConfig::default())
    }
}
