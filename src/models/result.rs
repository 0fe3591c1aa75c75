//! Finalized per-date scrape results.
//!
//! The JSON shape of [`ScrapeResult`] is the persisted cache format; field
//! names must stay stable for existing consumers.

use serde::{Deserialize, Serialize};

use super::announcement::{round_to, AnnouncementCandidate};

/// Message attached to results with no surviving candidates.
pub const NO_AWARDS_MESSAGE: &str = "No order awards found for this date";

/// Candidate counts bucketed by total value in crores.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValueStatistics {
    /// `>= 100`
    pub high_value_count: usize,
    /// `[10, 100)`
    pub medium_value_count: usize,
    /// `(0, 10)`
    pub low_value_count: usize,
    /// `== 0`
    pub no_value_count: usize,
}

impl ValueStatistics {
    pub fn from_orders(orders: &[AnnouncementCandidate]) -> Self {
        let mut stats = Self::default();
        for order in orders {
            let v = order.total_value_crores;
            if v >= 100.0 {
                stats.high_value_count += 1;
            } else if v >= 10.0 {
                stats.medium_value_count += 1;
            } else if v > 0.0 {
                stats.low_value_count += 1;
            } else {
                stats.no_value_count += 1;
            }
        }
        stats
    }
}

/// Result of scraping one date.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScrapeResult {
    pub success: bool,
    /// Display date (`dd/mm/yyyy`), also the cache key.
    pub date: String,
    pub total_awards: usize,
    pub total_value_crores: f64,
    pub total_announcements: u64,
    /// Ordered by `total_value_crores`, descending.
    pub orders: Vec<AnnouncementCandidate>,
    #[serde(default)]
    pub statistics: ValueStatistics,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl ScrapeResult {
    /// Rank the candidates and compute totals.
    pub fn finalize(
        date: impl Into<String>,
        mut orders: Vec<AnnouncementCandidate>,
        total_announcements: u64,
    ) -> Self {
        // Stable sort keeps scrape order among equal totals.
        orders.sort_by(|a, b| b.total_value_crores.total_cmp(&a.total_value_crores));

        let total_value = round_to(orders.iter().map(|o| o.total_value_crores).sum(), 2);
        let message = orders.is_empty().then(|| NO_AWARDS_MESSAGE.to_string());

        Self {
            success: true,
            date: date.into(),
            total_awards: orders.len(),
            total_value_crores: total_value,
            total_announcements,
            statistics: ValueStatistics::from_orders(&orders),
            orders,
            message,
        }
    }
}
