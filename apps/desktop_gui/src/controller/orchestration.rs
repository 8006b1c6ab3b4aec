//! Command orchestration helpers from UI actions to backend command queue.

use crossbeam_channel::{Sender, TrySendError};

use crate::backend_bridge::commands::BackendCommand;

pub fn dispatch_backend_command(
    cmd_tx: &Sender<BackendCommand>,
    cmd: BackendCommand,
    status: &mut String,
) {
    let cmd_name = cmd.name();
    match cmd_tx.try_send(cmd) {
        Ok(()) => tracing::debug!(command = cmd_name, "queued ui->backend command"),
        Err(TrySendError::Full(_)) => {
            *status = "UI command queue is full; please retry".to_string();
        }
        Err(TrySendError::Disconnected(_)) => {
            *status = "Backend worker disconnected; restart the app".to_string();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crossbeam_channel::bounded;

    #[test]
    fn full_queue_reports_retry_status() {
        let (tx, _rx) = bounded::<BackendCommand>(1);
        let mut status = String::new();
        dispatch_backend_command(&tx, BackendCommand::Submit, &mut status);
        assert!(status.is_empty());

        dispatch_backend_command(&tx, BackendCommand::DeleteAccount, &mut status);
        assert_eq!(status, "UI command queue is full; please retry");
    }

    #[test]
    fn disconnected_worker_is_reported() {
        let (tx, rx) = bounded::<BackendCommand>(4);
        drop(rx);
        let mut status = String::new();
        dispatch_backend_command(&tx, BackendCommand::Submit, &mut status);
        assert!(status.contains("disconnected"));
    }
}
