use super::library::{choose_candidate, list, load_quietly};
use super::prompts;
use super::search::find_candidates;
use super::session::Session;
use crate::output::Output;
use color_eyre::eyre::eyre;
use color_eyre::Result;
use library_sync_core::LibrarySyncStore;
use library_sync_models::{ItemUpdate, WatchStatus};
use library_sync_sources::IdentityProvider;
use std::sync::Arc;
use tracing::{debug, info};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum MenuAction {
    ShowBoard,
    SearchAndAdd,
    Move,
    Rate,
    Note,
    Remove,
    Clear,
    Refresh,
    SignOut,
    Quit,
}

impl MenuAction {
    const ALL: [MenuAction; 10] = [
        MenuAction::ShowBoard,
        MenuAction::SearchAndAdd,
        MenuAction::Move,
        MenuAction::Rate,
        MenuAction::Note,
        MenuAction::Remove,
        MenuAction::Clear,
        MenuAction::Refresh,
        MenuAction::SignOut,
        MenuAction::Quit,
    ];

    fn label(self) -> &'static str {
        match self {
            MenuAction::ShowBoard => "Show library",
            MenuAction::SearchAndAdd => "Search and add",
            MenuAction::Move => "Move an item",
            MenuAction::Rate => "Rate an item",
            MenuAction::Note => "Add a note",
            MenuAction::Remove => "Remove an item",
            MenuAction::Clear => "Clear library",
            MenuAction::Refresh => "Refresh from server",
            MenuAction::SignOut => "Sign out",
            MenuAction::Quit => "Quit",
        }
    }
}

/// Menu loop over one long-lived store; the store lives as long as the session
pub async fn run_interactive(output: &Output) -> Result<()> {
    if !super::ui::is_interactive() {
        return Err(eyre!("Interactive mode needs a terminal"));
    }

    let session = Session::open()?;
    let Some(user) = session.supabase.current_user().await.map_err(|e| eyre!("{}", e))? else {
        output.warn("Not signed in. Run 'cinemora auth sign-in' first");
        return Ok(());
    };
    output.info(format!(
        "Signed in as {}. Logs: {}",
        user.email.as_deref().unwrap_or(user.id.as_str()),
        session.paths.log_file().display()
    ));

    let store = Arc::new(session.store(output));
    let watcher = spawn_change_logger(&store);
    if let Err(e) = list(&store, &session.config.dashboard, None, output).await {
        output.error(e.to_string());
    }

    loop {
        let labels: Vec<&str> = MenuAction::ALL.iter().map(|a| a.label()).collect();
        let prompt = format!("Library ({} items)", store.items().len());
        let Some(choice) = prompts::prompt_select(&prompt, &labels)? else {
            break;
        };
        let action = MenuAction::ALL[choice];
        debug!(action = action.label(), "Menu action");

        let result = match action {
            MenuAction::ShowBoard => list(&store, &session.config.dashboard, None, output).await,
            MenuAction::SearchAndAdd => search_and_add(&session, &store, output).await,
            MenuAction::Move => move_item(&store).await,
            MenuAction::Rate => rate_item(&store).await,
            MenuAction::Note => note_item(&store).await,
            MenuAction::Remove => remove_item(&store).await,
            MenuAction::Clear => clear(&store).await,
            MenuAction::Refresh => store.refresh().await.map(|_| ()).map_err(|e| eyre!("{}", e)),
            MenuAction::SignOut => {
                session.supabase.sign_out().await.map_err(|e| eyre!("{}", e))?;
                store.teardown().await;
                output.success("Signed out");
                break;
            }
            MenuAction::Quit => break,
        };
        if let Err(e) = result {
            output.error(e.to_string());
        }
    }

    watcher.abort();
    Ok(())
}

/// Log every change to the visible list
fn spawn_change_logger(store: &Arc<LibrarySyncStore>) -> tokio::task::JoinHandle<()> {
    let mut updates = store.subscribe();
    tokio::spawn(async move {
        while updates.changed().await.is_ok() {
            let count = updates.borrow_and_update().len();
            info!(operation = "library_changed", count, "Visible library changed");
        }
    })
}

async fn pick_item(store: &LibrarySyncStore, prompt: &str) -> Result<Option<String>> {
    let items = match store.load().await {
        Ok(items) => items,
        Err(e) => {
            debug!(error = %e, "Using cached items for selection");
            store.items()
        }
    };
    if items.is_empty() {
        return Err(eyre!("Your library is empty"));
    }
    let labels: Vec<String> = items.iter().map(super::ui::item_label).collect();
    Ok(prompts::prompt_select(prompt, &labels)?.map(|index| items[index].id.to_string()))
}

async fn search_and_add(session: &Session, store: &LibrarySyncStore, output: &Output) -> Result<()> {
    let query = prompts::prompt_string("Search", None)?;
    let results = find_candidates(session, &query).await?;
    let Some(candidate) = choose_candidate(&results, None)? else {
        return Ok(());
    };
    let statuses: Vec<&str> = WatchStatus::ALL.iter().map(|s| s.label()).collect();
    let Some(index) = prompts::prompt_select("Add to", &statuses)? else {
        return Ok(());
    };
    load_quietly(store, output).await;
    store.add(candidate, WatchStatus::ALL[index]).await;
    Ok(())
}

async fn move_item(store: &LibrarySyncStore) -> Result<()> {
    let Some(item_id) = pick_item(store, "Move which item?").await? else {
        return Ok(());
    };
    let statuses: Vec<&str> = WatchStatus::ALL.iter().map(|s| s.label()).collect();
    let Some(index) = prompts::prompt_select("Move to", &statuses)? else {
        return Ok(());
    };
    store.move_item(&item_id, WatchStatus::ALL[index]).await;
    Ok(())
}

async fn rate_item(store: &LibrarySyncStore) -> Result<()> {
    let Some(item_id) = pick_item(store, "Rate which item?").await? else {
        return Ok(());
    };
    let rating = prompts::prompt_rating("Your rating (0-10)")?;
    let update = ItemUpdate {
        personal_rating: Some(rating),
        ..ItemUpdate::default()
    };
    store.update_item(&item_id, update).await;
    Ok(())
}

async fn note_item(store: &LibrarySyncStore) -> Result<()> {
    let Some(item_id) = pick_item(store, "Note on which item?").await? else {
        return Ok(());
    };
    let notes = prompts::prompt_string("Note", None)?;
    let update = ItemUpdate {
        notes: Some(notes),
        ..ItemUpdate::default()
    };
    store.update_item(&item_id, update).await;
    Ok(())
}

async fn remove_item(store: &LibrarySyncStore) -> Result<()> {
    let Some(item_id) = pick_item(store, "Remove which item?").await? else {
        return Ok(());
    };
    store.remove(&item_id).await;
    Ok(())
}

async fn clear(store: &LibrarySyncStore) -> Result<()> {
    if prompts::prompt_yes_no("Remove every item from your library?", false)? {
        store.clear_all().await;
    }
    Ok(())
}
