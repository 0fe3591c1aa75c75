//! Order value extraction over a local file.

use std::path::Path;

use anyhow::Context;
use console::style;

use crate::pdf::{ExtractorChain, TextExtractor};
use crate::services::extract_order_values;

const PDF_MAGIC: &[u8] = b"%PDF";

/// Print the order values found in a text file or PDF.
pub async fn cmd_values(file: &Path) -> anyhow::Result<()> {
    let bytes =
        std::fs::read(file).with_context(|| format!("Failed to read {}", file.display()))?;

    let text = if bytes.starts_with(PDF_MAGIC) {
        tokio::task::spawn_blocking(move || ExtractorChain::default().extract(&bytes)).await??
    } else {
        String::from_utf8_lossy(&bytes).into_owned()
    };

    let matches = extract_order_values(&text);
    if matches.is_empty() {
        println!("{} No order values found", style("!").yellow());
        return Ok(());
    }

    let total: f64 = matches.iter().map(|m| m.value_in_crores).sum();
    for m in &matches {
        println!(
            "  {} {:<28} = {:.4} Cr",
            style("•").green(),
            m.formatted,
            m.value_in_crores
        );
    }
    println!(
        "{} {} value(s), {:.2} Cr in total",
        style("✓").green(),
        matches.len(),
        total
    );
    Ok(())
}
