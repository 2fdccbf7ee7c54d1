//! Interactive console client for the taskvault API.
//!
//! Menu-driven: register, verify a login, fetch the protected task page, or
//! quit. Credentials are prompted per action and sent with HTTP Basic
//! Authentication; nothing is cached between actions.

use std::time::Duration;

use anyhow::{Context, Result};
use console::style;
use dialoguer::{theme::ColorfulTheme, Input, Password, Select};

const MENU_ITEMS: &[&str] = &["Register", "Login", "View tasks", "Quit"];

/// Run the interactive menu loop against `base_url`.
pub fn run_client(base_url: &str) -> Result<()> {
    let base_url = base_url.trim_end_matches('/').to_string();
    let http = reqwest::blocking::Client::builder()
        .timeout(Duration::from_secs(10))
        .build()
        .context("failed to build HTTP client")?;

    println!(
        "{} {}",
        style("taskvault console client:").bold(),
        style(&base_url).cyan()
    );

    loop {
        let choice = Select::with_theme(&ColorfulTheme::default())
            .with_prompt("Choose an action")
            .items(MENU_ITEMS)
            .default(0)
            .interact()?;

        let outcome = match choice {
            0 => register(&http, &base_url),
            1 => login(&http, &base_url),
            2 => view_tasks(&http, &base_url),
            _ => {
                println!("Bye!");
                return Ok(());
            }
        };

        // Transport failures are reported, not fatal; the menu continues.
        if let Err(e) = outcome {
            eprintln!("{} {e:#}", style("error:").red().bold());
        }
    }
}

fn prompt_credentials() -> Result<(String, String)> {
    let name: String = Input::with_theme(&ColorfulTheme::default())
        .with_prompt("Name")
        .interact_text()?;
    let secret = Password::with_theme(&ColorfulTheme::default())
        .with_prompt("Secret")
        .interact()?;
    Ok((name.trim().to_string(), secret))
}

fn register(http: &reqwest::blocking::Client, base_url: &str) -> Result<()> {
    let (name, secret) = prompt_credentials()?;
    let response = http
        .post(format!("{base_url}/api/register"))
        .json(&serde_json::json!({ "name": name, "secret": secret }))
        .send()
        .context("registration request failed")?;

    print_json_response(response)
}

fn login(http: &reqwest::blocking::Client, base_url: &str) -> Result<()> {
    let (name, secret) = prompt_credentials()?;
    let response = http
        .get(format!("{base_url}/login"))
        .basic_auth(&name, Some(&secret))
        .send()
        .context("login request failed")?;

    print_json_response(response)
}

fn view_tasks(http: &reqwest::blocking::Client, base_url: &str) -> Result<()> {
    let (name, secret) = prompt_credentials()?;
    let response = http
        .get(format!("{base_url}/tasks"))
        .basic_auth(&name, Some(&secret))
        .send()
        .context("tasks request failed")?;

    let status = response.status();
    if status.is_success() {
        println!("{}", style(status).green());
        println!("{}", response.text()?);
        return Ok(());
    }
    print_status_and_body(status, &response.text()?);
    Ok(())
}

fn print_json_response(response: reqwest::blocking::Response) -> Result<()> {
    let status = response.status();
    print_status_and_body(status, &response.text()?);
    Ok(())
}

fn print_status_and_body(status: reqwest::StatusCode, body: &str) {
    let status_display = if status.is_success() {
        style(status).green()
    } else {
        style(status).yellow()
    };

    match serde_json::from_str::<serde_json::Value>(body) {
        Ok(json) => println!(
            "{status_display} {}",
            serde_json::to_string_pretty(&json).unwrap_or_else(|_| body.to_string())
        ),
        Err(_) => println!("{status_display} {body}"),
    }
}
