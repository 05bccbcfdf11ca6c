use std::process::{Command, Stdio};

use tracing::{debug, info, warn};

use yokai::error::{Error, Result};

/// Hands a resolved stream URL to an external media player.
pub struct ExternalPlayer {
    command: String,
    args: Vec<String>,
}

impl ExternalPlayer {
    pub fn new(command: impl Into<String>, args: Vec<String>) -> Self {
        Self {
            command: command.into(),
            args,
        }
    }

    pub fn command(&self) -> &str {
        &self.command
    }

    /// Launch the player on `url` without blocking the caller.
    pub fn play(&self, url: &str) -> Result<()> {
        let mut cmd = Command::new(&self.command);

        // Player output would scribble over the TUI
        cmd.stdin(Stdio::null());
        cmd.stdout(Stdio::null());
        cmd.stderr(Stdio::null());

        cmd.args(&self.args);
        cmd.arg(url);

        debug!(player = %self.command, url = %url, "Launching player");

        let mut child = cmd.spawn().map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                Error::PlayerNotFound(self.command.clone())
            } else {
                Error::PlayerLaunch(e.to_string())
            }
        })?;

        let player = self.command.clone();
        std::thread::spawn(move || match child.wait() {
            Ok(status) => info!(player = %player, success = status.success(), "Player exited"),
            Err(e) => warn!(player = %player, "Failed to wait for player: {}", e),
        });

        Ok(())
    }
}

impl Default for ExternalPlayer {
    fn default() -> Self {
        Self::new("mpv", Vec::new())
    }
}
