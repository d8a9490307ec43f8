use super::prompts;
use super::session::Session;
use super::ui::Spinner;
use crate::output::Output;
use color_eyre::eyre::eyre;
use color_eyre::Result;
use library_sync_sources::{IdentityProvider, SignUpOutcome};
use serde_json::json;

fn credentials(email: Option<String>) -> Result<(String, String)> {
    let email = match email {
        Some(email) => email,
        None => prompts::prompt_string("Email", None)?,
    };
    let email = email.trim().to_string();
    if email.is_empty() {
        return Err(eyre!("An email address is required"));
    }
    let password = prompts::prompt_password("Password")?;
    Ok((email, password))
}

pub async fn sign_in(email: Option<String>, output: &Output) -> Result<()> {
    let session = Session::open()?;
    let (email, password) = credentials(email)?;

    let spinner = Spinner::start("Signing in...");
    let result = session.supabase.sign_in(&email, &password).await;
    spinner.finish();

    let user = result.map_err(|e| eyre!("{}", e))?;
    output.success(format!("Signed in as {}", user.email.as_deref().unwrap_or(&email)));
    Ok(())
}

pub async fn sign_up(email: Option<String>, output: &Output) -> Result<()> {
    let session = Session::open()?;
    let (email, password) = credentials(email)?;

    let spinner = Spinner::start("Creating account...");
    let result = session.supabase.sign_up(&email, &password).await;
    spinner.finish();

    match result.map_err(|e| eyre!("{}", e))? {
        SignUpOutcome::SignedIn(_) => output.success(format!("Account created. Signed in as {}", email)),
        SignUpOutcome::ConfirmationRequired { email } => {
            output.success("Account created");
            output.info(format!("Check {} for a confirmation link, then run 'cinemora auth sign-in'", email));
        }
    }
    Ok(())
}

pub async fn sign_out(output: &Output) -> Result<()> {
    let session = Session::open()?;
    session.supabase.sign_out().await.map_err(|e| eyre!("{}", e))?;
    output.success("Signed out");
    Ok(())
}

pub async fn status(output: &Output) -> Result<()> {
    let session = Session::open()?;
    let user = session.supabase.current_user().await.map_err(|e| eyre!("{}", e))?;

    if !output.is_human() {
        output.json(&json!({
            "signed_in": user.is_some(),
            "user_id": user.as_ref().map(|u| u.id.clone()),
            "email": user.as_ref().and_then(|u| u.email.clone()),
        }));
        return Ok(());
    }

    match user {
        Some(user) => output.success(format!(
            "Signed in as {}",
            user.email.as_deref().unwrap_or(user.id.as_str())
        )),
        None => output.warn("Not signed in. Run 'cinemora auth sign-in'"),
    }
    Ok(())
}
