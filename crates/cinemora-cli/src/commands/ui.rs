use comfy_table::{presets, modifiers, Attribute, Cell, Color, Table};
use indicatif::{ProgressBar, ProgressStyle};
use library_sync_config::{CardDensity, DashboardPreferences};
use library_sync_models::{derive_id, LibraryItem, SearchResult, WatchStatus};
use library_sync_sources::poster_url;
use std::io::IsTerminal;
use std::time::Duration;

/// Spinner shown while a remote call is in flight.
///
/// In non-interactive runs it stays hidden and progress is logged instead.
pub struct Spinner {
    bar: Option<ProgressBar>,
}

impl Spinner {
    pub fn start(message: impl Into<String>) -> Self {
        let message = message.into();
        if !is_interactive() {
            tracing::info!(operation = "progress", message = %message, "Remote call started");
            return Self { bar: None };
        }

        let bar = ProgressBar::new_spinner();
        if let Ok(style) = ProgressStyle::default_spinner()
            .template("{spinner:.green} {msg}")
            .map(|s| s.tick_chars("⠋⠙⠹⠸⠼⠴⠦⠧⠇⠏"))
        {
            bar.set_style(style);
        }
        bar.set_message(message);
        bar.enable_steady_tick(Duration::from_millis(80));
        Self { bar: Some(bar) }
    }

    pub fn finish(self) {
        if let Some(bar) = self.bar {
            bar.finish_and_clear();
        }
    }
}

pub fn is_interactive() -> bool {
    std::io::stdout().is_terminal() && std::io::stderr().is_terminal()
}

fn styled(mut table: Table) -> Table {
    table.load_preset(presets::UTF8_FULL);
    table.apply_modifier(modifiers::UTF8_ROUND_CORNERS);
    table
}

fn rating(value: f64) -> String {
    format!("{:.1}", value)
}

pub fn search_table(results: &[SearchResult]) -> Table {
    let mut table = Table::new();
    table.set_header(vec![
        Cell::new("#").add_attribute(Attribute::Bold),
        Cell::new("Title").add_attribute(Attribute::Bold),
        Cell::new("Type").add_attribute(Attribute::Bold),
        Cell::new("Year").add_attribute(Attribute::Bold),
        Cell::new("TMDB").add_attribute(Attribute::Bold),
        Cell::new("Id").add_attribute(Attribute::Bold),
    ]);
    for (index, result) in results.iter().enumerate() {
        table.add_row(vec![
            Cell::new(index + 1),
            Cell::new(result.display_title()),
            Cell::new(result.media_type.as_str()),
            Cell::new(result.year().map(|y| y.to_string()).unwrap_or_default()),
            Cell::new(rating(result.vote_average)),
            Cell::new(derive_id(result.media_type, result.id)),
        ]);
    }
    styled(table)
}

/// One-line label used by selection prompts
pub fn search_label(result: &SearchResult) -> String {
    match result.year() {
        Some(year) => format!("{} ({}, {})", result.display_title(), year, result.media_type),
        None => format!("{} ({})", result.display_title(), result.media_type),
    }
}

pub fn item_label(item: &LibraryItem) -> String {
    format!("{} [{}] - {}", item.display_title(), item.id, item.status.label())
}

/// One table per status column, in board order; empty columns are skipped
pub fn board(items: &[LibraryItem], prefs: &DashboardPreferences, only: Option<WatchStatus>) -> Vec<Table> {
    WatchStatus::ALL
        .into_iter()
        .filter(|status| only.map_or(true, |wanted| wanted == *status))
        .filter_map(|status| {
            let column: Vec<&LibraryItem> = items.iter().filter(|i| i.status == status).collect();
            if column.is_empty() {
                None
            } else {
                Some(column_table(status, &column, prefs))
            }
        })
        .collect()
}

fn column_table(status: WatchStatus, items: &[&LibraryItem], prefs: &DashboardPreferences) -> Table {
    let mut header = vec![
        Cell::new(format!("{} ({})", status.label(), items.len()))
            .fg(Color::Cyan)
            .add_attribute(Attribute::Bold),
        Cell::new("Id"),
    ];
    if prefs.density != CardDensity::Compact {
        header.extend([Cell::new("Year"), Cell::new("TMDB"), Cell::new("Yours")]);
    }
    if prefs.density == CardDensity::Spacious {
        header.extend([Cell::new("Notes"), Cell::new("Poster")]);
    }

    let mut table = Table::new();
    table.set_header(header);
    for item in items {
        let mut row = vec![Cell::new(item.display_title()), Cell::new(&item.id)];
        if prefs.density != CardDensity::Compact {
            row.push(Cell::new(item.display_date().and_then(|d| d.get(..4)).unwrap_or("")));
            row.push(Cell::new(rating(item.vote_average)));
            row.push(Cell::new(item.personal_rating.map(rating).unwrap_or_default()));
        }
        if prefs.density == CardDensity::Spacious {
            row.push(Cell::new(item.notes.as_deref().unwrap_or("")));
            row.push(Cell::new(
                item.poster_path
                    .as_deref()
                    .map(|p| poster_url(p, prefs.poster_size.tmdb_size()))
                    .unwrap_or_default(),
            ));
        }
        table.add_row(row);
    }
    styled(table)
}
