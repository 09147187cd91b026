// ABOUTME: Operator collaborators: yes/no confirmation gates and URL opening.
// ABOUTME: Terminal implementations for the CLI; tests script their own.

use async_trait::async_trait;
use dialoguer::{Confirm, theme::ColorfulTheme};
use std::io::{self, IsTerminal};

/// Pauses a transition for an operator decision.
#[async_trait]
pub trait ConfirmationGate: Send + Sync {
    /// Ask `message`; `default` is the answer for an empty reply.
    async fn confirm(&self, message: &str, default: bool) -> bool;
}

/// Asks on the terminal. Declines when stdin is not a terminal.
pub struct TerminalGate;

#[async_trait]
impl ConfirmationGate for TerminalGate {
    async fn confirm(&self, message: &str, default: bool) -> bool {
        let message = message.to_string();
        tokio::task::spawn_blocking(move || ask(&message, default))
            .await
            .unwrap_or(false)
    }
}

fn ask(message: &str, default: bool) -> bool {
    if !io::stdin().is_terminal() {
        eprintln!("{message} (no terminal, answering no)");
        return false;
    }

    let reply = Confirm::with_theme(&ColorfulTheme::default())
        .with_prompt(message)
        .default(default)
        .interact_opt();
    decision(reply)
}

/// Escape and terminal errors count as "no".
fn decision(reply: Result<Option<bool>, dialoguer::Error>) -> bool {
    match reply {
        Ok(answer) => answer.unwrap_or(false),
        Err(e) => {
            tracing::warn!("confirmation prompt failed: {e}");
            false
        }
    }
}

/// Answers yes to everything (`--yes`).
pub struct AssumeYes;

#[async_trait]
impl ConfirmationGate for AssumeYes {
    async fn confirm(&self, message: &str, _default: bool) -> bool {
        tracing::info!("auto-confirmed: {message}");
        true
    }
}

/// Opens URLs after a host restarts.
#[async_trait]
pub trait UrlOpener: Send + Sync {
    async fn open(&self, url: &str);
}

/// Hands URLs to the desktop's default handler.
pub struct SystemOpener;

#[async_trait]
impl UrlOpener for SystemOpener {
    async fn open(&self, url: &str) {
        let program = if cfg!(target_os = "macos") {
            "open"
        } else {
            "xdg-open"
        };
        let spawned = tokio::process::Command::new(program)
            .arg(url)
            .stdout(std::process::Stdio::null())
            .stderr(std::process::Stdio::null())
            .status()
            .await;
        match spawned {
            Ok(status) if status.success() => tracing::debug!("opened {url}"),
            Ok(status) => tracing::warn!("{program} {url} exited with {status}"),
            Err(e) => tracing::warn!("failed to run {program} for {url}: {e}"),
        }
    }
}

/// Ignores URLs (`--no-open`).
pub struct NoopOpener;

#[async_trait]
impl UrlOpener for NoopOpener {
    async fn open(&self, url: &str) {
        tracing::debug!("not opening {url}");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn answers_pass_through() {
        assert!(decision(Ok(Some(true))));
        assert!(!decision(Ok(Some(false))));
    }

    #[test]
    fn escape_declines() {
        assert!(!decision(Ok(None)));
    }

    #[test]
    fn terminal_error_declines() {
        let err = dialoguer::Error::IO(io::Error::other("terminal went away"));
        assert!(!decision(Err(err)));
    }
}
