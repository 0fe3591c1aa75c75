//! Collapse repeated candidates scraped from overlapping pages.

use std::collections::HashSet;

use crate::models::AnnouncementCandidate;

/// Keep the first occurrence of each (company, title, link) identity.
pub fn dedupe_candidates(candidates: Vec<AnnouncementCandidate>) -> Vec<AnnouncementCandidate> {
    let mut seen = HashSet::with_capacity(candidates.len());
    candidates
        .into_iter()
        .filter(|c| seen.insert(c.identity_key()))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::NOT_PARSED;

    fn candidate(page: u32, company: &str, title: &str, link: &str) -> AnnouncementCandidate {
        AnnouncementCandidate {
            page,
            announcement_num: 1,
            company: company.to_string(),
            raw_company: company.to_string(),
            title: title.to_string(),
            summary: String::new(),
            pdf_link: link.to_string(),
            order_values: Vec::new(),
            total_value_crores: 0.0,
            pdf_extract: NOT_PARSED.to_string(),
        }
    }

    #[test]
    fn test_case_insensitive_identity() {
        let out = dedupe_candidates(vec![
            candidate(1, "Acme Ltd", "Award of Order", "https://x/a.pdf"),
            candidate(2, "ACME LTD", "award of order", "https://x/A.pdf"),
        ]);
        assert_eq!(out.len(), 1);
        assert_eq!(out[0].page, 1);
    }

    #[test]
    fn test_distinct_links_kept() {
        let out = dedupe_candidates(vec![
            candidate(1, "Acme", "Award of Order", "https://x/a.pdf"),
            candidate(1, "Acme", "Award of Order", "https://x/b.pdf"),
        ]);
        assert_eq!(out.len(), 2);
    }

    #[test]
    fn test_idempotent() {
        let once = dedupe_candidates(vec![
            candidate(1, "A", "t", "l"),
            candidate(1, "a", "T", "L"),
            candidate(2, "B", "t", "l"),
        ]);
        let twice = dedupe_candidates(once.clone());
        assert_eq!(once, twice);
    }
}
