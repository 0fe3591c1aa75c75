//! Shared output helpers for CLI commands.

use console::style;

use crate::models::ScrapeResult;
use crate::services::order_values::format_amount;

/// Truncate a string for tabular output, appending "..." when cut.
pub fn truncate_string(s: &str, max_chars: usize) -> String {
    if s.chars().count() <= max_chars {
        s.to_string()
    } else {
        let kept: String = s.chars().take(max_chars.saturating_sub(3)).collect();
        format!("{}...", kept)
    }
}

pub fn format_crores(value: f64) -> String {
    format!("₹{} Cr", format_amount(value))
}

/// Print the ranked summary of a finished scrape.
pub fn print_result(result: &ScrapeResult, top: usize) {
    let separator = "─".repeat(78);

    println!();
    println!(
        "{} {} awards out of {} announcements, {} in total",
        style("✓").green(),
        style(result.total_awards).bold(),
        result.total_announcements,
        style(format_crores(result.total_value_crores)).bold()
    );

    if let Some(message) = &result.message {
        println!("  {}", style(message).dim());
        return;
    }

    let stats = &result.statistics;
    println!(
        "  high {}  medium {}  low {}  no value {}",
        stats.high_value_count,
        stats.medium_value_count,
        stats.low_value_count,
        stats.no_value_count
    );
    println!("{}", separator);
    println!(
        "{:>3}  {:<28} {:>16}  {}",
        "#",
        style("COMPANY").cyan().bold(),
        "Value",
        "Title"
    );

    for (rank, order) in result.orders.iter().take(top).enumerate() {
        let value = if order.total_value_crores > 0.0 {
            format_crores(order.total_value_crores)
        } else {
            "-".to_string()
        };
        println!(
            "{:>3}  {:<28} {:>16}  {}",
            rank + 1,
            truncate_string(&order.company, 28),
            value,
            truncate_string(&order.title, 40)
        );
    }

    if result.orders.len() > top {
        println!(
            "     {} more not shown",
            style(result.orders.len() - top).dim()
        );
    }
}
