use color_eyre::Result;
use dialoguer::{Confirm, Input, Password, Select};
use std::io::IsTerminal;

/// Prompt for a string value with optional default
pub fn prompt_string(prompt: &str, default: Option<&str>) -> Result<String> {
    let mut input_builder = Input::<String>::new().with_prompt(prompt);

    if let Some(default_value) = default {
        input_builder = input_builder.default(default_value.to_string());
    }

    input_builder
        .interact_text()
        .map_err(|e| color_eyre::eyre::eyre!("Failed to read input: {}", e))
}

/// Prompt for a password (masked input).
///
/// Falls back to reading a line from stdin when it is piped, so scripts can
/// do `echo $PASSWORD | cinemora auth sign-in --email me@example.com`.
pub fn prompt_password(prompt: &str) -> Result<String> {
    if !std::io::stdin().is_terminal() {
        return rpassword::read_password().map_err(|e| color_eyre::eyre::eyre!("Failed to read password: {}", e));
    }

    Password::new()
        .with_prompt(prompt)
        .interact()
        .map_err(|e| color_eyre::eyre::eyre!("Failed to read password: {}", e))
}

pub fn prompt_yes_no(prompt: &str, default: bool) -> Result<bool> {
    Confirm::new()
        .with_prompt(prompt)
        .default(default)
        .interact()
        .map_err(|e| color_eyre::eyre::eyre!("Failed to read confirmation: {}", e))
}

/// Pick one entry; `None` when the user backs out with Esc or q
pub fn prompt_select<T: ToString>(prompt: &str, items: &[T]) -> Result<Option<usize>> {
    Select::new()
        .with_prompt(prompt)
        .items(items)
        .default(0)
        .interact_opt()
        .map_err(|e| color_eyre::eyre::eyre!("Failed to read selection: {}", e))
}

/// A number parsed from free text, re-prompting until it is valid
pub fn prompt_rating(prompt: &str) -> Result<f64> {
    loop {
        let raw = prompt_string(prompt, None)?;
        match raw.trim().parse::<f64>() {
            Ok(value) if (0.0..=10.0).contains(&value) => return Ok(value),
            _ => eprintln!("Please enter a number between 0 and 10."),
        }
    }
}
