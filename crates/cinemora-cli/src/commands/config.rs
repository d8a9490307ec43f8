use super::session::load_config;
use crate::output::Output;
use crate::ConfigCommands;
use color_eyre::eyre::eyre;
use color_eyre::Result;
use comfy_table::{modifiers, presets, Attribute, Cell, Color, Table};
use library_sync_config::{CardDensity, Config, PathManager, PosterSize};
use serde_json::json;

pub fn run_config(cmd: ConfigCommands, output: &Output) -> Result<()> {
    let paths = PathManager::default();
    match cmd {
        ConfigCommands::Show { full } => show_config(&paths, full, output),
        ConfigCommands::Init { force } => init_config(&paths, force, output),
        ConfigCommands::Path => show_paths(&paths, output),
        ConfigCommands::Dashboard {
            density,
            poster_size,
            reset,
        } => configure_dashboard(&paths, density, poster_size, reset, output),
    }
}

fn show_config(paths: &PathManager, full: bool, output: &Output) -> Result<()> {
    let config_file = paths.config_file();
    let config = match load_config(paths) {
        Ok(config) => config,
        Err(e) if !config_file.exists() => {
            output.warn(format!("Configuration file not found at: {}", config_file.display()));
            output.info("Create one with 'cinemora config init'");
            return Err(e);
        }
        Err(e) => return Err(e),
    };

    let secret = |value: &str| if full { value.to_string() } else { mask_string(value) };

    if !output.is_human() {
        output.json(&json!({
            "config_file": config_file.display().to_string(),
            "supabase": {
                "url": config.supabase.url,
                "anon_key": secret(&config.supabase.anon_key),
                "table": config.supabase.table,
            },
            "tmdb": {
                "access_token": secret(&config.tmdb.access_token),
                "language": config.tmdb.language,
            },
            "cache": {
                "stale_time_secs": config.cache.stale_time_secs,
                "gc_time_secs": config.cache.gc_time_secs,
            },
            "dashboard": config.dashboard,
        }));
        return Ok(());
    }

    let mut table = Table::new();
    table.load_preset(presets::UTF8_FULL);
    table.apply_modifier(modifiers::UTF8_ROUND_CORNERS);
    table.set_header(vec![
        Cell::new("Setting").fg(Color::Cyan).add_attribute(Attribute::Bold),
        Cell::new(config_file.display().to_string()),
    ]);
    table.add_row(vec![Cell::new("Supabase URL"), Cell::new(&config.supabase.url)]);
    table.add_row(vec![Cell::new("Supabase anon key"), Cell::new(secret(&config.supabase.anon_key))]);
    table.add_row(vec![Cell::new("Library table"), Cell::new(&config.supabase.table)]);
    table.add_row(vec![Cell::new("TMDB token"), Cell::new(secret(&config.tmdb.access_token))]);
    table.add_row(vec![Cell::new("TMDB language"), Cell::new(&config.tmdb.language)]);
    table.add_row(vec![
        Cell::new("Cache fresh for"),
        Cell::new(format!("{}s", config.cache.stale_time_secs)),
    ]);
    table.add_row(vec![
        Cell::new("Cache evicted after"),
        Cell::new(format!("{}s", config.cache.gc_time_secs)),
    ]);
    table.add_row(vec![
        Cell::new("Board density"),
        Cell::new(format!("{:?}", config.dashboard.density).to_lowercase()),
    ]);
    table.add_row(vec![
        Cell::new("Poster size"),
        Cell::new(format!("{:?}", config.dashboard.poster_size).to_lowercase()),
    ]);
    output.table(table);
    Ok(())
}

fn init_config(paths: &PathManager, force: bool, output: &Output) -> Result<()> {
    let config_file = paths.config_file();
    if config_file.exists() && !force {
        return Err(eyre!(
            "{} already exists; pass --force to overwrite it",
            config_file.display()
        ));
    }

    paths.ensure_directories().map_err(|e| eyre!("{}", e))?;
    Config::template()
        .save_to_file(&config_file)
        .map_err(|e| eyre!("Failed to write {}: {}", config_file.display(), e))?;

    output.success(format!("Wrote {}", config_file.display()));
    output.info("Fill in your Supabase project URL, anon key and TMDB access token, or set SUPABASE_URL, SUPABASE_ANON_KEY and TMDB_ACCESS_TOKEN");
    Ok(())
}

fn show_paths(paths: &PathManager, output: &Output) -> Result<()> {
    if !output.is_human() {
        output.json(&json!({
            "config_file": paths.config_file().display().to_string(),
            "credentials_file": paths.credentials_file().display().to_string(),
            "log_file": paths.log_file().display().to_string(),
        }));
        return Ok(());
    }
    output.info(format!("Config:      {}", paths.config_file().display()));
    output.info(format!("Credentials: {}", paths.credentials_file().display()));
    output.info(format!("Logs:        {}", paths.log_file().display()));
    Ok(())
}

fn configure_dashboard(
    paths: &PathManager,
    density: Option<CardDensity>,
    poster_size: Option<PosterSize>,
    reset: bool,
    output: &Output,
) -> Result<()> {
    let config_file = paths.config_file();
    if !config_file.exists() {
        return Err(eyre!("No configuration at {}; run 'cinemora config init' first", config_file.display()));
    }
    // Edit the file as written; environment overrides must not be persisted
    let mut config = Config::load_from_file(&config_file)
        .map_err(|e| eyre!("Failed to load config from {}: {}", config_file.display(), e))?;

    if reset {
        config.dashboard.reset();
    }
    if let Some(density) = density {
        config.dashboard.density = density;
    }
    if let Some(poster_size) = poster_size {
        config.dashboard.poster_size = poster_size;
    }

    config
        .save_to_file(&config_file)
        .map_err(|e| eyre!("Failed to write {}: {}", config_file.display(), e))?;
    output.success("Dashboard preferences saved");
    Ok(())
}

/// Keep the first and last four characters of a secret
fn mask_string(s: &str) -> String {
    let chars: Vec<char> = s.chars().collect();
    if chars.len() <= 8 {
        return "*".repeat(chars.len());
    }
    let head: String = chars[..4].iter().collect();
    let tail: String = chars[chars.len() - 4..].iter().collect();
    format!("{}{}{}", head, "*".repeat(chars.len() - 8), tail)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mask_string() {
        assert_eq!(mask_string("short"), "*****");
        assert_eq!(mask_string("abcd1234efgh"), "abcd****efgh");
    }
}
