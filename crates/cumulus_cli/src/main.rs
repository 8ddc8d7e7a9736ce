//! Cumulus - cloud-disk file operations
//!
//! Thin command-line front-end: parses requests into operation-core
//! calls and serializes the outcomes as JSON objects.

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use cumulus_core::{AuthService, FileStore, ServiceConfig, UserStore};
use cumulus_store::{LocalStore, StoreClient};
use serde_json::json;
use std::path::PathBuf;
use std::sync::Arc;

#[derive(Parser)]
#[command(name = "cumulus", version, about = "File operations against a cumulus store")]
struct Cli {
    /// Base directory backing the store
    #[arg(long, default_value = "./cumulus-data")]
    data_dir: PathBuf,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Register a new user
    Register { username: String, password: String },

    /// Log in and print the user identifier
    Login { username: String, password: String },

    /// Upload a local file under a remote path
    Upload {
        owner_id: String,
        upload_path: String,
        local_file: PathBuf,

        /// Remote file name; defaults to the local file's name
        #[arg(long)]
        file_name: Option<String>,
    },

    /// Download a file into the staging directory
    Download { owner_id: String, upload_path: String },

    /// Delete a file or directory
    Delete { owner_id: String, upload_path: String },

    /// List the immediate children of a path
    List { owner_id: String, path: String },

    /// Rename a file in place
    Rename {
        owner_id: String,
        upload_path: String,
        new_file_name: String,
    },

    /// Copy a file under a target directory
    Copy {
        owner_id: String,
        source_upload_path: String,
        target_upload_path: String,
    },

    /// Move a file under a target directory
    Move {
        owner_id: String,
        source_upload_path: String,
        target_upload_path: String,
    },
}

fn main() -> Result<()> {
    cumulus_log::init()?;

    // Clean up old logs (7 days)
    if let Err(e) = cumulus_log::cleanup_old_logs(7) {
        tracing::warn!("failed to cleanup old logs: {}", e);
    }

    let cli = Cli::parse();
    let config = ServiceConfig::load().unwrap_or_default();

    let client: Arc<dyn StoreClient> =
        Arc::new(LocalStore::new(&cli.data_dir, config.store.root.clone()));
    let files = FileStore::from_config(Arc::clone(&client), &config);
    let auth = AuthService::new(UserStore::new(Arc::clone(&client), config.users_dir_uri()));

    match cli.command {
        Command::Register { username, password } => {
            match auth.register(&username, &password) {
                Ok(user_id) => print_json(json!({
                    "message": "registration succeeded",
                    "userId": user_id,
                })),
                Err(e) => print_json(json!({
                    "message": format!("registration failed: {}", e),
                })),
            }
        }

        Command::Login { username, password } => match auth.login(&username, &password) {
            Ok(user_id) => print_json(json!({
                "message": "login succeeded",
                "userId": user_id,
            })),
            Err(e) => print_json(json!({
                "message": format!("login failed: {}", e),
            })),
        },

        Command::Upload {
            owner_id,
            upload_path,
            local_file,
            file_name,
        } => {
            let name = match file_name {
                Some(name) => name,
                None => local_file
                    .file_name()
                    .map(|n| n.to_string_lossy().to_string())
                    .context("local file has no file name")?,
            };
            let size = std::fs::metadata(&local_file)
                .with_context(|| format!("cannot stat {}", local_file.display()))?
                .len()
                .to_string();
            let mut source = std::fs::File::open(&local_file)
                .with_context(|| format!("cannot open {}", local_file.display()))?;

            match files.upload(&owner_id, &upload_path, &name, &size, &mut source) {
                Ok(status) => print_json(json!({ "message": status })),
                Err(e) => print_json(json!({
                    "message": format!("file upload failed: {}", e),
                })),
            }
        }

        Command::Download { owner_id, upload_path } => {
            match files.download(&owner_id, &upload_path) {
                Ok(status) => print_json(json!({ "message": status })),
                Err(e) => print_json(json!({
                    "message": format!("file download failed: {}", e),
                })),
            }
        }

        Command::Delete { owner_id, upload_path } => {
            match files.delete(&owner_id, &upload_path) {
                Ok(status) => print_json(json!({ "message": status })),
                Err(e) => print_json(json!({
                    "message": format!("file delete failed: {}", e),
                })),
            }
        }

        Command::List { owner_id, path } => match files.list(&owner_id, &path) {
            Ok(records) => print_json(json!(records)),
            Err(e) => print_json(json!({
                "message": format!("file listing failed: {}", e),
            })),
        },

        Command::Rename {
            owner_id,
            upload_path,
            new_file_name,
        } => match files.rename(&owner_id, &upload_path, &new_file_name) {
            Ok(renamed) => print_json(json!({ "success": renamed })),
            Err(e) => print_json(json!({
                "message": format!("file rename failed: {}", e),
            })),
        },

        Command::Copy {
            owner_id,
            source_upload_path,
            target_upload_path,
        } => match files.copy_file(&owner_id, &source_upload_path, &target_upload_path) {
            Ok(copied) => print_json(json!({ "success": copied })),
            Err(e) => print_json(json!({
                "message": format!("file copy failed: {}", e),
            })),
        },

        Command::Move {
            owner_id,
            source_upload_path,
            target_upload_path,
        } => match files.move_file(&owner_id, &source_upload_path, &target_upload_path) {
            Ok(moved) => print_json(json!({ "success": moved })),
            Err(e) => print_json(json!({
                "message": format!("file move failed: {}", e),
            })),
        },
    }

    Ok(())
}

fn print_json(value: serde_json::Value) {
    println!("{}", value);
}
