//! Worker thread that owns the tokio runtime and the profile session.

use std::{sync::Arc, thread};

use crossbeam_channel::{Receiver, Sender, TrySendError};
use profile_client::{build_http_client, PickedFile, ProfileSession, UserStore};
use shared::error::{ApiError, ErrorCode};

use crate::backend_bridge::commands::BackendCommand;
use crate::controller::events::{decode_preview_image, UiError, UiErrorContext, UiEvent};
use crate::ui::StartupConfig;

pub fn launch(startup: StartupConfig, cmd_rx: Receiver<BackendCommand>, ui_tx: Sender<UiEvent>) {
    thread::spawn(move || {
        let _ = ui_tx.try_send(UiEvent::Info("Backend worker starting...".to_string()));
        let runtime = match tokio::runtime::Builder::new_multi_thread()
            .enable_all()
            .build()
        {
            Ok(runtime) => runtime,
            Err(err) => {
                let _ = ui_tx.try_send(UiEvent::Error(UiError::startup(format!(
                    "backend worker startup failure: failed to build runtime: {err}"
                ))));
                tracing::error!("failed to build backend runtime: {err}");
                return;
            }
        };

        runtime.block_on(async move {
            let store = Arc::new(UserStore::signed_in(startup.user));
            let (session, http) = match profile_client::connect(&startup.settings, store)
                .and_then(|session| Ok((session, build_http_client(&startup.settings)?)))
            {
                Ok(pair) => pair,
                Err(err) => {
                    let _ = ui_tx.try_send(UiEvent::Error(UiError::startup(format!(
                        "backend worker startup failure: {err:#}"
                    ))));
                    tracing::error!("failed to wire profile session: {err:#}");
                    return;
                }
            };

            tokio::spawn(forward_view_updates(session.clone(), ui_tx.clone()));
            tokio::spawn(forward_notices(session.clone(), ui_tx.clone()));
            let _ = ui_tx.try_send(UiEvent::Info("Backend worker ready".to_string()));

            while let Ok(cmd) = cmd_rx.recv() {
                match cmd {
                    // Applied in order so fast typing never lands out of sequence.
                    BackendCommand::FieldChanged { field, value } => {
                        session.handle_change(field, value).await;
                    }
                    BackendCommand::UploadAvatar { path } => {
                        let session = session.clone();
                        let ui_tx = ui_tx.clone();
                        tokio::spawn(async move {
                            let result = match PickedFile::from_path(&path) {
                                Ok(file) => session
                                    .request_upload(file)
                                    .await
                                    .map(|_| ())
                                    .map_err(|err| ApiError::from(&err)),
                                Err(err) => {
                                    Err(ApiError::new(ErrorCode::Upload, format!("{err:#}")))
                                }
                            };
                            if let Err(err) = result {
                                report(&ui_tx, UiErrorContext::Upload, err);
                            }
                            // The pending avatar is set after the last status change.
                            let _ = ui_tx.try_send(UiEvent::ViewUpdated(session.view().await));
                        });
                    }
                    BackendCommand::FetchAvatar { url } => {
                        let http = http.clone();
                        let ui_tx = ui_tx.clone();
                        tokio::spawn(async move {
                            let event = match fetch_avatar(&http, &url).await {
                                Ok(image) => UiEvent::AvatarLoaded { url, image },
                                Err(reason) => {
                                    tracing::warn!(url = %url, "avatar fetch failed: {reason}");
                                    UiEvent::AvatarFailed { url, reason }
                                }
                            };
                            let _ = ui_tx.try_send(event);
                        });
                    }
                    BackendCommand::Submit => {
                        let session = session.clone();
                        let ui_tx = ui_tx.clone();
                        tokio::spawn(async move {
                            if let Err(err) = session.submit().await {
                                report(&ui_tx, UiErrorContext::Update, ApiError::from(&err));
                            }
                        });
                    }
                    BackendCommand::DeleteAccount => {
                        let session = session.clone();
                        let ui_tx = ui_tx.clone();
                        tokio::spawn(async move {
                            if let Err(err) = session.delete_account().await {
                                report(&ui_tx, UiErrorContext::Delete, ApiError::from(&err));
                            }
                        });
                    }
                }
            }
            tracing::info!("ui command queue closed; backend worker exiting");
        });
    });
}

fn report(ui_tx: &Sender<UiEvent>, context: UiErrorContext, err: ApiError) {
    tracing::debug!(?context, "profile operation failed: {err}");
    let _ = ui_tx.try_send(UiEvent::Error(UiError::from_api(context, err)));
}

async fn forward_view_updates(session: Arc<ProfileSession>, ui_tx: Sender<UiEvent>) {
    let mut store_rx = session.store().subscribe();
    let mut upload_rx = session.subscribe_upload_status();
    loop {
        if let Err(TrySendError::Disconnected(_)) =
            ui_tx.try_send(UiEvent::ViewUpdated(session.view().await))
        {
            break;
        }
        tokio::select! {
            changed = store_rx.changed() => if changed.is_err() { break },
            changed = upload_rx.changed() => if changed.is_err() { break },
        }
    }
}

async fn forward_notices(session: Arc<ProfileSession>, ui_tx: Sender<UiEvent>) {
    let mut notices = session.subscribe_notices();
    loop {
        match notices.recv().await {
            Ok(notice) => {
                let _ = ui_tx.try_send(UiEvent::Notice(notice));
            }
            Err(tokio::sync::broadcast::error::RecvError::Lagged(skipped)) => {
                tracing::warn!(skipped, "notice forwarder lagged");
            }
            Err(tokio::sync::broadcast::error::RecvError::Closed) => break,
        }
    }
}

async fn fetch_avatar(
    http: &reqwest::Client,
    url: &str,
) -> Result<crate::controller::events::PreviewImage, String> {
    let bytes = http
        .get(url)
        .send()
        .await
        .and_then(|response| response.error_for_status())
        .map_err(|err| err.to_string())?
        .bytes()
        .await
        .map_err(|err| err.to_string())?;
    decode_preview_image(&bytes)
}
