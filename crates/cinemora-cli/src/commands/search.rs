use super::session::Session;
use super::ui::{self, Spinner};
use crate::output::Output;
use color_eyre::eyre::eyre;
use color_eyre::Result;
use library_sync_models::SearchResult;
use library_sync_sources::MetadataProvider;

/// Search results shown to the user at once
pub const MAX_RESULTS: usize = 8;

/// Run a metadata search, capped at `MAX_RESULTS`
pub async fn find_candidates(session: &Session, query: &str) -> Result<Vec<SearchResult>> {
    let spinner = Spinner::start(format!("Searching for \"{}\"...", query.trim()));
    let result = session.tmdb().search_multi(query).await;
    spinner.finish();

    let mut results = result.map_err(|e| eyre!("Search failed: {}", e))?;
    results.truncate(MAX_RESULTS);
    Ok(results)
}

pub async fn run_search(query: &str, output: &Output) -> Result<()> {
    let session = Session::open()?;
    let results = find_candidates(&session, query).await?;

    if !output.is_human() {
        output.json(&serde_json::to_value(&results)?);
        return Ok(());
    }

    if results.is_empty() {
        output.warn(format!("No movies or series found for \"{}\"", query.trim()));
        return Ok(());
    }
    output.table(ui::search_table(&results));
    output.info("Add one with 'cinemora library add <query> --pick N'");
    Ok(())
}
