//! Remote control wiring
//!
//! The bridge invokes a plain callback from whatever thread the OS uses. The
//! callback only enqueues; a pump task executes commands one at a time
//! against the controller's public methods.

use crate::controller::PlaybackController;
use crate::error::Result;
use cadence_core::{CommandHandler, RemoteCommand};
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, warn};

/// Register a command handler on the bridge and spawn the pump
///
/// Returns `None` when remote control is unavailable.
pub(crate) fn attach(controller: &PlaybackController) -> Option<JoinHandle<()>> {
    let bridge = controller.inner.remote.bridge()?;

    let (tx, mut rx) = mpsc::unbounded_channel::<RemoteCommand>();
    let handler: CommandHandler = Arc::new(move |command| {
        if tx.send(command).is_err() {
            debug!("Remote command {:?} dropped, controller is gone", command);
        }
    });
    bridge.set_command_handler(handler);

    let weak = Arc::downgrade(&controller.inner);
    Some(tokio::spawn(async move {
        while let Some(command) = rx.recv().await {
            let Some(inner) = weak.upgrade() else {
                break;
            };
            let controller = PlaybackController { inner };
            if let Err(e) = controller.handle_remote_command(command).await {
                warn!("Remote command {:?} failed: {}", command, e);
            }
        }
    }))
}

impl PlaybackController {
    /// Execute a lock-screen / notification command
    ///
    /// # Errors
    /// Whatever the corresponding public method returns.
    pub async fn handle_remote_command(&self, command: RemoteCommand) -> Result<()> {
        debug!("Remote command: {:?}", command);
        match command {
            RemoteCommand::Play => self.play().await,
            RemoteCommand::Pause => self.pause().await,
            RemoteCommand::Toggle => self.toggle_play_pause().await,
            RemoteCommand::Next => self.play_next().await,
            RemoteCommand::Previous => self.play_previous().await,
            RemoteCommand::Seek(position) => self.seek_to(position).await,
        }
    }
}
