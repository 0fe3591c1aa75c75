//! Company label clean-up.

use regex::Regex;
use std::sync::LazyLock;

/// A trailing parenthetical such as " (NSE: ACME)".
static TRAILING_PARENTHETICAL: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\s*\([^)]*\)\s*$").unwrap());

/// Clean a raw company label, falling back to the title prefix before " - ".
///
/// Returns an empty string when nothing usable remains.
pub fn normalize_company_name(company: &str, title: &str) -> String {
    let mut name = company.trim().to_string();
    if name.is_empty() && !title.is_empty() {
        name = title
            .split(" - ")
            .next()
            .unwrap_or_default()
            .trim()
            .to_string();
    }

    // Repeated so "Acme (India) (BSE)" settles in one pass.
    while TRAILING_PARENTHETICAL.is_match(&name) {
        name = TRAILING_PARENTHETICAL.replace(&name, "").into_owned();
    }

    title_case(name.trim())
}

/// Capitalize the first letter of each alphabetic run and lowercase the rest.
fn title_case(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    let mut prev_cased = false;
    for c in s.chars() {
        if c.is_alphabetic() {
            if prev_cased {
                out.extend(c.to_lowercase());
            } else {
                out.extend(c.to_uppercase());
            }
            prev_cased = true;
        } else {
            out.push(c);
            prev_cased = false;
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_title_cases_company() {
        assert_eq!(
            normalize_company_name("  LARSEN & TOUBRO LTD. ", ""),
            "Larsen & Toubro Ltd."
        );
    }

    #[test]
    fn test_strips_trailing_parenthetical() {
        assert_eq!(normalize_company_name("ACME INFRA LTD (532123)", ""), "Acme Infra Ltd");
        assert_eq!(normalize_company_name("Acme (India) (BSE)", ""), "Acme");
    }

    #[test]
    fn test_falls_back_to_title_prefix() {
        assert_eq!(
            normalize_company_name("", "KEC INTERNATIONAL LTD. - 532714 - Award of Order"),
            "Kec International Ltd."
        );
    }

    #[test]
    fn test_empty_when_nothing_usable() {
        assert_eq!(normalize_company_name("   ", ""), "");
        assert_eq!(normalize_company_name("(532123)", ""), "");
    }

    #[test]
    fn test_idempotent_on_normalized_input() {
        for raw in ["RAIL VIKAS NIGAM LTD (RVNL)", "abc-def industries", "Acme (A) (B)"] {
            let once = normalize_company_name(raw, "");
            assert_eq!(normalize_company_name(&once, ""), once);
        }
    }
}
