use std::{fs, path::PathBuf, sync::Arc};

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use profile_client::{
    load_settings, EditableField, PickedFile, ProfileSession, SessionError, UploadCaption,
    UserStore,
};
use shared::{domain::UserRecord, error::ApiError};
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
struct Args {
    #[arg(long)]
    config: Option<PathBuf>,
    #[arg(long)]
    api_url: Option<String>,
    /// JSON file holding the signed-in user as the backend returned it.
    #[arg(long)]
    user_json: PathBuf,
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    Show,
    Update {
        #[arg(long)]
        username: Option<String>,
        #[arg(long)]
        email: Option<String>,
        #[arg(long)]
        password: Option<String>,
        #[arg(long)]
        avatar: Option<PathBuf>,
        /// Extra `field=value` edits, applied after the named flags.
        #[arg(long = "set", value_parser = parse_field_edit)]
        edits: Vec<(EditableField, String)>,
    },
    Delete,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();
    let args = Args::parse();

    let mut settings = load_settings(args.config.as_deref())?;
    if let Some(api_url) = args.api_url {
        settings.api_base_url = profile_client::config::normalize_base_url(&api_url);
    }

    let raw = fs::read_to_string(&args.user_json)
        .with_context(|| format!("failed to read '{}'", args.user_json.display()))?;
    let user: UserRecord = serde_json::from_str(&raw).context("user json is not a user record")?;
    let store = Arc::new(UserStore::signed_in(user));
    let session = profile_client::connect(&settings, store)?;
    let mut notices = session.subscribe_notices();

    let outcome = match args.command {
        Command::Show => Ok(()),
        Command::Update {
            username,
            email,
            password,
            avatar,
            edits,
        } => {
            if let Some(path) = avatar {
                upload_avatar(&session, PickedFile::from_path(&path)?).await;
            }
            for (field, value) in [
                (EditableField::Username, username),
                (EditableField::Email, email),
                (EditableField::Password, password),
            ] {
                if let Some(value) = value {
                    session.handle_change(field, value).await;
                }
            }
            for (field, value) in edits {
                session.handle_change(field, value).await;
            }
            session.submit().await.map(|_| ())
        }
        Command::Delete => session.delete_account().await,
    };

    while let Ok(notice) = notices.try_recv() {
        println!("[{:?}] {}", notice.level, notice.text);
    }

    let view = session.view().await;
    let state = session.store().snapshot().await;
    println!(
        "{}",
        serde_json::to_string_pretty(&serde_json::json!({
            "current_user": state.current_user,
            "avatar": view.avatar_source,
            "error": view.error_line,
        }))?
    );

    if let Err(err) = outcome {
        report_failure(&err)?;
        std::process::exit(1);
    }
    Ok(())
}

async fn upload_avatar(session: &Arc<ProfileSession>, file: PickedFile) {
    let mut status = session.subscribe_upload_status();
    let printer = tokio::spawn(async move {
        let mut last = UploadCaption::Blank;
        while status.changed().await.is_ok() {
            let current = status.borrow_and_update().clone();
            let caption = UploadCaption::from_status(&current);
            if caption != last && caption != UploadCaption::Blank {
                println!("{}", caption.text());
            }
            last = caption;
            if !current.is_in_flight() {
                break;
            }
        }
    });

    // A failed upload leaves the current avatar in place; the caption says why.
    if let Err(err) = session.request_upload(file).await {
        tracing::warn!("avatar upload failed: {err}");
    }
    if let Err(err) = printer.await {
        tracing::debug!("caption printer ended early: {err}");
    }
}

fn report_failure(err: &SessionError) -> Result<()> {
    eprintln!("{}", serde_json::to_string(&ApiError::from(err))?);
    Ok(())
}

fn parse_field_edit(raw: &str) -> Result<(EditableField, String), String> {
    let (id, value) = raw
        .split_once('=')
        .ok_or_else(|| format!("expected field=value, got '{raw}'"))?;
    let field = EditableField::from_id(id.trim()).map_err(|err| err.to_string())?;
    Ok((field, value.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn field_edits_map_ids_through_the_form() {
        assert_eq!(
            parse_field_edit("email=bob@example.com"),
            Ok((EditableField::Email, "bob@example.com".to_string()))
        );
        assert_eq!(
            parse_field_edit("password=a=b"),
            Ok((EditableField::Password, "a=b".to_string()))
        );
    }

    #[test]
    fn avatar_and_unknown_fields_are_refused() {
        assert_eq!(
            parse_field_edit("avatar=https://x"),
            Err("unknown profile field 'avatar'".to_string())
        );
        assert!(parse_field_edit("username").is_err());
    }

    #[test]
    fn update_accepts_repeated_set_flags() {
        let args = Args::try_parse_from([
            "profile_desktop",
            "--user-json",
            "me.json",
            "update",
            "--username",
            "bob",
            "--set",
            "email=bob@example.com",
            "--set",
            "password=hunter2",
        ])
        .expect("args");
        match args.command {
            Command::Update { username, edits, .. } => {
                assert_eq!(username.as_deref(), Some("bob"));
                assert_eq!(
                    edits,
                    vec![
                        (EditableField::Email, "bob@example.com".to_string()),
                        (EditableField::Password, "hunter2".to_string()),
                    ]
                );
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }
}
