//! CLI command implementations

use crate::credentials::{AutoLogin, CredentialRecord, CredentialRepository};
use crate::output::{self, format_announcement, print_output, LoginReport, UpdateReport};
use crate::progress::{DownloadProgress, Finished};
use crate::{demo, OutputFormat, RunArgs, SaveFlags};
use anyhow::{anyhow, bail, Context, Result};
use console::style;
use dialoguer::Password;
use gatekeep_core::{ChainOptions, GatekeepCore, StepFailurePolicy};
use gatekeep_types::{CoreEvent, Session, SessionField, UpdateStatus};
use std::io::BufRead;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{broadcast, mpsc};
use tracing::{debug, info, warn};

// ============================================================================
// Account Commands
// ============================================================================

pub async fn login(
    core: &GatekeepCore,
    store: &dyn CredentialRepository,
    username: &str,
    password: Option<String>,
    save: SaveFlags,
    format: OutputFormat,
) -> Result<()> {
    let password = match password {
        Some(password) => password,
        None => prompt_password("Password")?,
    };

    store.save(&CredentialRecord::for_password(
        username,
        &password,
        save.remember,
        save.auto_login,
    ))?;

    let session = core.login(username, &password).await?;
    report_and_logout(core, &session, format).await
}

pub async fn code_login(
    core: &GatekeepCore,
    store: &dyn CredentialRepository,
    code: &str,
    save: SaveFlags,
    format: OutputFormat,
) -> Result<()> {
    store.save(&CredentialRecord::for_code(code, save.remember, save.auto_login))?;
    let session = core.login_with_code(code).await?;
    report_and_logout(core, &session, format).await
}

async fn report_and_logout(
    core: &GatekeepCore,
    session: &Session,
    format: OutputFormat,
) -> Result<()> {
    let api = core.api();
    let credential = session.credential.as_deref();
    let expiry = session_field(api.get_expiry_time(&session.principal, credential).await);
    let points = session_field(api.get_remaining_points(&session.principal, credential).await);

    print_output(
        &LoginReport {
            principal: session.principal.clone(),
            login_type: session.login_type,
            expiry: Some(expiry),
            points: Some(points),
        },
        format,
    )?;

    // A one-shot login should not hold a concurrent-login slot
    let _ = core.logout(session).await;
    Ok(())
}

fn session_field(outcome: gatekeep_core::RequestOutcome) -> SessionField {
    match outcome {
        Ok(value) => SessionField::Value(value),
        Err(e) => SessionField::Unavailable(e.to_string()),
    }
}

pub async fn register(core: &GatekeepCore, username: &str, password: Option<String>) -> Result<()> {
    let password = match password {
        Some(password) => password,
        None => Password::new()
            .with_prompt("Password")
            .with_confirmation("Confirm password", "Passwords do not match")
            .interact()?,
    };

    core.register(username, &password).await?;
    output::success(format!(
        "Registered {}. Log in with `gatekeep login {}`",
        style(username).cyan(),
        username
    ));
    Ok(())
}

pub async fn recharge(core: &GatekeepCore, username: &str, card: &str) -> Result<()> {
    core.recharge(username, card).await?;
    output::success(format!("Recharged {}", style(username).cyan()));
    Ok(())
}

pub fn forget(store: &dyn CredentialRepository) -> Result<()> {
    store.clear()?;
    output::success("Saved login details removed");
    Ok(())
}

fn prompt_password(prompt: &str) -> Result<String> {
    Ok(Password::new().with_prompt(prompt).interact()?)
}

// ============================================================================
// Announcements and Updates
// ============================================================================

pub async fn announcement(core: &GatekeepCore, format: OutputFormat) -> Result<()> {
    let content = core.api().get_announcement().await?;

    match format {
        OutputFormat::Json => {
            println!("{}", serde_json::json!({ "announcement": content }));
        }
        OutputFormat::Human => {
            if content.is_empty() {
                println!("{}", style("No announcement").dim());
            } else {
                println!("{}", format_announcement(&content));
            }
        }
    }
    Ok(())
}

pub async fn update(core: &GatekeepCore, download: bool, format: OutputFormat) -> Result<()> {
    let status = core.check_update().await?;
    let url = match &status {
        UpdateStatus::Available { url, .. } => Some(url.clone()),
        UpdateStatus::UpToDate { .. } => None,
    };

    print_output(
        &UpdateReport {
            current: core.api().version().to_string(),
            status,
        },
        format,
    )?;

    let Some(url) = url.filter(|_| download) else {
        return Ok(());
    };

    let mut events = core.subscribe();
    let handle = core.start_update(&url)?;
    let progress = DownloadProgress::new(handle.id, &handle.destination.display().to_string());

    loop {
        match events.recv().await {
            Ok(event) => match progress.handle_event(&event) {
                Some(Finished::Completed) => break,
                Some(Finished::Failed(error)) => bail!("update download failed: {}", error),
                None => {}
            },
            Err(broadcast::error::RecvError::Lagged(skipped)) => {
                debug!(skipped, "Progress events dropped");
            }
            Err(broadcast::error::RecvError::Closed) => break,
        }
    }

    let path = handle.join().await?;
    match format {
        OutputFormat::Json => {
            println!("{}", serde_json::json!({ "downloaded": path }));
        }
        OutputFormat::Human => output::success(install_hint(&path)),
    }
    Ok(())
}

/// What the operator runs to apply a downloaded update
fn install_hint(path: &std::path::Path) -> String {
    format!(
        "Update downloaded to {}. Close gatekeep and run it to install",
        path.display()
    )
}

// ============================================================================
// Run
// ============================================================================

/// Operator input while a chain runs
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Control {
    Pause,
    Resume,
    Stop,
}

fn parse_control(line: &str) -> Option<Control> {
    match line.trim().to_ascii_lowercase().as_str() {
        "p" | "pause" => Some(Control::Pause),
        "r" | "resume" => Some(Control::Resume),
        "s" | "q" | "stop" | "quit" => Some(Control::Stop),
        _ => None,
    }
}

/// Forward control commands typed on stdin
fn spawn_control_reader(tx: mpsc::UnboundedSender<Control>) {
    std::thread::spawn(move || {
        let stdin = std::io::stdin();
        for line in stdin.lock().lines() {
            let Ok(line) = line else { break };
            match parse_control(&line) {
                Some(control) => {
                    if tx.send(control).is_err() {
                        break;
                    }
                }
                None => eprintln!("{}", style("commands: pause | resume | stop").dim()),
            }
        }
    });
}

async fn authenticate(
    core: &GatekeepCore,
    store: &dyn CredentialRepository,
    args: &RunArgs,
) -> Result<Arc<Session>> {
    let save = args.save;
    if let Some(user) = &args.user {
        let password = match &args.password {
            Some(password) => password.clone(),
            None => prompt_password("Password")?,
        };
        store.save(&CredentialRecord::for_password(
            user,
            &password,
            save.remember,
            save.auto_login,
        ))?;
        return Ok(core.login(user, &password).await?);
    }
    if let Some(code) = &args.code {
        store.save(&CredentialRecord::for_code(code, save.remember, save.auto_login))?;
        return Ok(core.login_with_code(code).await?);
    }
    if !args.auto {
        bail!("no credentials given; pass --user, --code or --auto");
    }

    let record = store
        .load()
        .context("failed to read saved login details")?
        .unwrap_or_default();
    match record.auto_login() {
        Some(AutoLogin::Password { username, password }) => {
            info!(user = %username, "Auto login with password");
            Ok(core.login(&username, &password).await?)
        }
        Some(AutoLogin::Code { code }) => {
            info!("Auto login with single code");
            Ok(core.login_with_code(&code).await?)
        }
        None => Err(anyhow!(
            "auto login is not set up; log in once with --remember --auto-login"
        )),
    }
}

pub async fn run(core: &GatekeepCore, store: &dyn CredentialRepository, args: RunArgs) -> Result<()> {
    let session = authenticate(core, store, &args).await?;
    println!(
        "{} Logged in as {}",
        style("✓").green().bold(),
        style(&session.principal).cyan()
    );

    let mut events = core.subscribe();
    let watchdog = core.start_watchdog(Arc::clone(&session));
    let announcements = args.announcements.then(|| core.watch_announcements());

    let options = ChainOptions {
        looping: !args.once,
        on_failure: if args.stop_on_error {
            StepFailurePolicy::StopChain
        } else {
            StepFailurePolicy::DropParamsAndContinue
        },
    };
    let operations = demo::counter_chain(
        usize::from(args.steps),
        Duration::from_millis(args.step_delay_ms),
    );
    let run_id = core.start_chain(operations, options)?;
    eprintln!("{}", style("Type pause, resume or stop and press Enter").dim());

    let (control_tx, mut control_rx) = mpsc::unbounded_channel();
    spawn_control_reader(control_tx);

    let outcome: Result<()> = loop {
        tokio::select! {
            event = events.recv() => match event {
                Ok(CoreEvent::ChainOutput { run_id: id, text }) if id == run_id => println!("{}", text),
                Ok(CoreEvent::ChainFinished { run_id: id }) if id == run_id => break Ok(()),
                Ok(CoreEvent::StatusCheck { healthy: true, .. }) => debug!("Session verified"),
                Ok(CoreEvent::SessionInfo { expiry, points }) => {
                    println!("{}", style(format!("Expires: {}  Points: {}", expiry, points)).dim());
                }
                Ok(CoreEvent::Announcement { content }) => println!("{}", format_announcement(&content)),
                Ok(CoreEvent::FatalFault { message }) => {
                    eprintln!("{} {}", style("✗ Authorization lost:").red().bold(), message);
                    break Err(anyhow!("authorization lost: {}", message));
                }
                Ok(_) => {}
                Err(broadcast::error::RecvError::Lagged(skipped)) => {
                    warn!(skipped, "Event stream lagged");
                }
                Err(broadcast::error::RecvError::Closed) => break Ok(()),
            },
            Some(control) = control_rx.recv() => match control {
                Control::Pause => {
                    core.pause_chain();
                    eprintln!("{}", style("Paused").yellow());
                }
                Control::Resume => {
                    core.resume_chain();
                    eprintln!("{}", style("Resumed").green());
                }
                Control::Stop => {
                    core.stop_chain();
                    eprintln!("{}", style("Stopping after the current step").dim());
                }
            },
            _ = tokio::signal::ctrl_c() => {
                core.stop_chain();
                eprintln!("{}", style("Interrupted, stopping after the current step").dim());
            }
        }
    };

    watchdog.stop();
    if let Some(handle) = &announcements {
        handle.stop();
    }
    let waiter = core.clone();
    tokio::task::spawn_blocking(move || {
        waiter.stop_chain();
        waiter.wait_chain();
    })
    .await?;

    if outcome.is_ok() {
        core.logout(&session).await.ok();
    }
    outcome
}
