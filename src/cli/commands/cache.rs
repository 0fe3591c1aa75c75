//! Result cache inspection commands.

use console::style;

use crate::cache::ResultCache;
use crate::cli::helpers::format_crores;
use crate::config::Settings;
use crate::services::Calendar;

/// List cached dates from the date index.
pub fn cmd_cache_list(settings: &Settings) -> anyhow::Result<()> {
    let cache = ResultCache::new(&settings.cache, Calendar::new(&settings.calendar));
    let entries = cache.list();

    if entries.is_empty() {
        println!(
            "{} No cached results in {}",
            style("!").yellow(),
            cache.dir().display()
        );
        return Ok(());
    }

    println!(
        "{:<12} {:>8} {:>18}  {}",
        style("DATE").cyan().bold(),
        "Awards",
        "Value",
        "Stored"
    );
    for entry in entries {
        println!(
            "{:<12} {:>8} {:>18}  {}",
            entry.date,
            entry.total_awards,
            format_crores(entry.total_value_crores),
            entry.stored_at.format("%Y-%m-%d %H:%M")
        );
    }
    Ok(())
}

/// Print the cached result JSON for a date, if any.
pub fn cmd_cache_show(settings: &Settings, date: &str) -> anyhow::Result<()> {
    let calendar = Calendar::new(&settings.calendar);
    let validated = calendar.validate(date)?;
    let cache = ResultCache::new(&settings.cache, calendar);

    match cache.get(&validated) {
        Some(result) => println!("{}", serde_json::to_string_pretty(&*result)?),
        None => println!(
            "{} No cached result for {}",
            style("!").yellow(),
            validated.readable
        ),
    }
    Ok(())
}
