use crate::error::SourceError;
use crate::traits::AuthUser;
use chrono::{Duration, Utc};
use library_sync_config::StoredSession;
use reqwest::{Client, Response};
use serde::{Deserialize, Serialize};

#[derive(Debug, Serialize)]
struct PasswordCredentials<'a> {
    email: &'a str,
    password: &'a str,
}

#[derive(Debug, Deserialize)]
struct UserResponse {
    id: String,
    #[serde(default)]
    email: Option<String>,
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
    #[serde(default)]
    refresh_token: Option<String>,
    #[serde(default = "default_expires_in")]
    expires_in: i64,
    user: UserResponse,
}

/// GoTrue reports errors under several different keys depending on version
#[derive(Debug, Deserialize, Default)]
struct AuthErrorBody {
    #[serde(default)]
    error_description: Option<String>,
    #[serde(default)]
    msg: Option<String>,
    #[serde(default)]
    message: Option<String>,
    #[serde(default)]
    error: Option<String>,
}

fn default_expires_in() -> i64 {
    3600 // Default to 1 hour if not provided
}

/// Result of a sign-up request
#[derive(Debug)]
pub enum SignUpOutcome {
    /// The project auto-confirms users; a session was issued
    SignedIn(StoredSession),
    /// A confirmation email was sent; no session yet
    ConfirmationRequired { email: String },
}

fn auth_url(base_url: &str, path: &str) -> String {
    format!("{}/auth/v1/{}", base_url.trim_end_matches('/'), path)
}

impl TokenResponse {
    fn into_session(self) -> StoredSession {
        StoredSession {
            access_token: self.access_token,
            refresh_token: self.refresh_token.unwrap_or_default(),
            expires_at: Utc::now() + Duration::seconds(self.expires_in),
            user_id: self.user.id,
            email: self.user.email,
        }
    }
}

async fn auth_error(response: Response) -> SourceError {
    let status = response.status().as_u16();
    let body = response.text().await.unwrap_or_default();
    let parsed: AuthErrorBody = serde_json::from_str(&body).unwrap_or_default();
    let raw = parsed
        .error_description
        .or(parsed.msg)
        .or(parsed.message)
        .or(parsed.error)
        .unwrap_or_else(|| format!("Authentication request failed with status {}", status));
    SourceError::Auth(auth_error_message(&raw))
}

pub async fn sign_in_with_password(
    client: &Client,
    base_url: &str,
    anon_key: &str,
    email: &str,
    password: &str,
) -> Result<StoredSession, SourceError> {
    let response = client
        .post(auth_url(base_url, "token"))
        .query(&[("grant_type", "password")])
        .header("apikey", anon_key)
        .json(&PasswordCredentials { email, password })
        .send()
        .await?;

    if !response.status().is_success() {
        return Err(auth_error(response).await);
    }
    let token: TokenResponse = response.json().await?;
    Ok(token.into_session())
}

pub async fn sign_up(
    client: &Client,
    base_url: &str,
    anon_key: &str,
    email: &str,
    password: &str,
) -> Result<SignUpOutcome, SourceError> {
    let response = client
        .post(auth_url(base_url, "signup"))
        .header("apikey", anon_key)
        .json(&PasswordCredentials { email, password })
        .send()
        .await?;

    if !response.status().is_success() {
        return Err(auth_error(response).await);
    }

    let body: serde_json::Value = response.json().await?;
    if body.get("access_token").is_some() {
        let token: TokenResponse = serde_json::from_value(body)?;
        return Ok(SignUpOutcome::SignedIn(token.into_session()));
    }
    Ok(SignUpOutcome::ConfirmationRequired {
        email: email.to_string(),
    })
}

pub async fn refresh_session(
    client: &Client,
    base_url: &str,
    anon_key: &str,
    refresh_token: &str,
) -> Result<StoredSession, SourceError> {
    let response = client
        .post(auth_url(base_url, "token"))
        .query(&[("grant_type", "refresh_token")])
        .header("apikey", anon_key)
        .json(&serde_json::json!({ "refresh_token": refresh_token }))
        .send()
        .await?;

    if !response.status().is_success() {
        return Err(auth_error(response).await);
    }
    let token: TokenResponse = response.json().await?;
    Ok(token.into_session())
}

/// Ask the auth server who owns `access_token`; `None` if the token is rejected
pub async fn get_user(
    client: &Client,
    base_url: &str,
    anon_key: &str,
    access_token: &str,
) -> Result<Option<AuthUser>, SourceError> {
    let response = client
        .get(auth_url(base_url, "user"))
        .header("apikey", anon_key)
        .header("Authorization", format!("Bearer {}", access_token))
        .send()
        .await?;

    match response.status().as_u16() {
        200..=299 => {
            let user: UserResponse = response.json().await?;
            Ok(Some(AuthUser {
                id: user.id,
                email: user.email,
            }))
        }
        401 | 403 => Ok(None),
        _ => Err(auth_error(response).await),
    }
}

pub async fn sign_out(
    client: &Client,
    base_url: &str,
    anon_key: &str,
    access_token: &str,
) -> Result<(), SourceError> {
    let response = client
        .post(auth_url(base_url, "logout"))
        .header("apikey", anon_key)
        .header("Authorization", format!("Bearer {}", access_token))
        .send()
        .await?;

    // An already-expired token means the session is gone anyway
    if response.status().is_success() || response.status().as_u16() == 401 {
        return Ok(());
    }
    Err(auth_error(response).await)
}

/// Map raw auth server messages to user-friendly text
pub fn auth_error_message(raw: &str) -> String {
    let exact = match raw {
        "Invalid login credentials" => {
            Some("Invalid email or password. Please check your credentials and try again.")
        }
        "Email not confirmed" => {
            Some("Please verify your email address. Check your inbox for a confirmation link.")
        }
        "User already registered" => {
            Some("An account with this email already exists. Please sign in instead.")
        }
        "Password should be at least 6 characters" => {
            Some("Password must be at least 6 characters long.")
        }
        "Signups not allowed for this instance" => {
            Some("New registrations are currently disabled. Please contact support.")
        }
        "Email link is invalid or has expired" => {
            Some("This verification link has expired. Please request a new one.")
        }
        "Token has expired or is invalid" => Some("Your session has expired. Please sign in again."),
        "Invalid email or password" => Some("Invalid email or password. Please try again."),
        _ => None,
    };
    if let Some(message) = exact {
        return message.to_string();
    }

    let lower = raw.to_lowercase();
    if lower.contains("rate limit") || lower.contains("too many requests") {
        return "Too many attempts. Please wait a few minutes and try again.".to_string();
    }
    if lower.contains("network") || lower.contains("fetch") {
        return "Network error. Please check your internet connection and try again.".to_string();
    }
    if lower.contains("timeout") {
        return "Request timed out. Please try again.".to_string();
    }
    if lower.contains("email") && lower.contains("invalid") {
        return "Please enter a valid email address.".to_string();
    }
    if lower.contains("password") && lower.contains("weak") {
        return "Password is too weak. Please use a stronger password with a mix of characters.".to_string();
    }

    if raw.is_empty() {
        "An unexpected error occurred. Please try again.".to_string()
    } else {
        raw.to_string()
    }
}
