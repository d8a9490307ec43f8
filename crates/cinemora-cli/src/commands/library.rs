use super::prompts;
use super::search::find_candidates;
use super::session::Session;
use super::ui::{self, Spinner};
use crate::output::Output;
use crate::LibraryCommands;
use color_eyre::eyre::eyre;
use color_eyre::Result;
use library_sync_config::DashboardPreferences;
use library_sync_core::{LibrarySyncStore, MutationOutcome};
use library_sync_models::{ItemUpdate, LibraryItem, SearchResult, WatchStatus};
use serde_json::json;
use thiserror::Error;

/// A write failed after the store already told the user why
#[derive(Debug, Error)]
#[error("{0}")]
pub struct AlreadyReported(pub String);

pub async fn run_library(cmd: LibraryCommands, output: &Output) -> Result<()> {
    let session = Session::open()?;
    let store = session.store(output);

    let outcome = match cmd {
        LibraryCommands::List { status } => {
            return list(&store, &session.config.dashboard, status, output).await;
        }
        LibraryCommands::Add { query, pick, status } => {
            let results = find_candidates(&session, &query).await?;
            let Some(candidate) = choose_candidate(&results, pick)? else {
                output.info("Nothing added");
                return Ok(());
            };
            load_quietly(&store, output).await;
            store.add(candidate, status).await
        }
        LibraryCommands::Move { item_id, status } => {
            load_quietly(&store, output).await;
            store.move_item(&item_id, status).await
        }
        LibraryCommands::Rate { item_id, rating } => {
            if !(0.0..=10.0).contains(&rating) {
                return Err(eyre!("Rating must be between 0 and 10"));
            }
            load_quietly(&store, output).await;
            let update = ItemUpdate {
                personal_rating: Some(rating),
                ..ItemUpdate::default()
            };
            store.update_item(&item_id, update).await
        }
        LibraryCommands::Note { item_id, text } => {
            load_quietly(&store, output).await;
            let update = ItemUpdate {
                notes: Some(text),
                ..ItemUpdate::default()
            };
            store.update_item(&item_id, update).await
        }
        LibraryCommands::Remove { item_id } => {
            load_quietly(&store, output).await;
            store.remove(&item_id).await
        }
        LibraryCommands::Clear { yes } => {
            if !yes && !confirm_clear()? {
                output.info("Library left untouched");
                return Ok(());
            }
            store.clear_all().await
        }
    };

    finish(outcome, output)
}

/// Board view of the library, optionally restricted to one column
pub async fn list(
    store: &LibrarySyncStore,
    prefs: &DashboardPreferences,
    status: Option<WatchStatus>,
    output: &Output,
) -> Result<()> {
    let spinner = Spinner::start("Loading your library...");
    let result = store.load().await;
    spinner.finish();

    let items: Vec<LibraryItem> = result
        .map_err(|e| eyre!("{}", e))?
        .into_iter()
        .filter(|item| status.map_or(true, |wanted| item.status == wanted))
        .collect();

    if !output.is_human() {
        output.json(&serde_json::to_value(&items)?);
        return Ok(());
    }

    if items.is_empty() {
        output.info("Your library is empty. Add something with 'cinemora library add <query>'");
        return Ok(());
    }
    for table in ui::board(&items, prefs, status) {
        output.table(table);
    }
    Ok(())
}

/// Prime the cache so the optimistic change is applied to the current list.
/// A failed read is not fatal: the write still goes through.
pub async fn load_quietly(store: &LibrarySyncStore, output: &Output) {
    if let Err(e) = store.load().await {
        tracing::debug!(error = %e, "Could not load library before write");
        if matches!(e, library_sync_core::StoreError::StoreUnavailable(_)) {
            output.warn(format!("{}", e));
        }
    }
}

/// Resolve `--pick N` (1-based), or ask when running in a terminal
pub fn choose_candidate(results: &[SearchResult], pick: Option<usize>) -> Result<Option<&SearchResult>> {
    if results.is_empty() {
        return Err(eyre!("No movies or series matched your search"));
    }

    if let Some(n) = pick {
        return results
            .get(n.wrapping_sub(1))
            .map(Some)
            .ok_or_else(|| eyre!("--pick must be between 1 and {}", results.len()));
    }

    if !ui::is_interactive() {
        return Err(eyre!("Several results matched; choose one with --pick N (see 'cinemora search')"));
    }

    let labels: Vec<String> = results.iter().map(ui::search_label).collect();
    Ok(prompts::prompt_select("Which one?", &labels)?.and_then(|index| results.get(index)))
}

fn confirm_clear() -> Result<bool> {
    if !ui::is_interactive() {
        return Err(eyre!("Refusing to clear the library without confirmation; pass --yes"));
    }
    prompts::prompt_yes_no("Remove every item from your library?", false)
}

/// The store has already printed the notification; only the exit status is left
fn finish(outcome: MutationOutcome, output: &Output) -> Result<()> {
    if !output.is_human() {
        output.json(&json!({
            "applied_optimistically": outcome.applied_optimistically,
            "committed": outcome.committed,
            "rolled_back": outcome.rolled_back,
            "error": outcome.error.as_ref().map(|e| e.to_string()),
        }));
    }
    outcome
        .into_result()
        .map_err(|e| AlreadyReported(e.to_string()).into())
}

#[cfg(test)]
mod tests {
    use super::*;
    use library_sync_core::StoreError;
    use library_sync_models::MediaType;

    fn result(id: u64) -> SearchResult {
        SearchResult {
            id,
            title: Some(format!("Movie {}", id)),
            name: None,
            poster_path: Some("/p.jpg".to_string()),
            vote_average: 6.0,
            release_date: None,
            first_air_date: None,
            media_type: MediaType::Movie,
            overview: None,
        }
    }

    #[test]
    fn test_pick_is_one_based() {
        let results = vec![result(1), result(2)];
        assert_eq!(choose_candidate(&results, Some(2)).unwrap().unwrap().id, 2);
        assert!(choose_candidate(&results, Some(0)).is_err());
        assert!(choose_candidate(&results, Some(3)).is_err());
    }

    #[test]
    fn test_empty_results_are_an_error() {
        assert!(choose_candidate(&[], Some(1)).is_err());
    }

    #[test]
    fn test_failed_outcome_is_already_reported() {
        let output = Output::new(crate::output::OutputFormat::Human, true);
        let failed = MutationOutcome {
            applied_optimistically: true,
            committed: false,
            rolled_back: true,
            error: Some(StoreError::RemoteFailure("Database error: boom".to_string())),
        };
        let err = finish(failed, &output).unwrap_err();
        assert_eq!(
            err.downcast_ref::<AlreadyReported>().map(|e| e.0.as_str()),
            Some("Database error: boom")
        );
    }

    #[test]
    fn test_benign_not_found_finishes_ok() {
        let output = Output::new(crate::output::OutputFormat::Human, true);
        let satisfied = MutationOutcome {
            applied_optimistically: true,
            committed: false,
            rolled_back: false,
            error: Some(StoreError::NotFound),
        };
        assert!(finish(satisfied, &output).is_ok());
    }
}
