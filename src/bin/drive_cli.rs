//! Terminal dashboard for the image drive.
//!
//! Signs in, lists files by tab, uploads images and manages stars, trash
//! and folders through a running `imagedrive` server.
//!
//! Usage:
//!   drive-cli sign-in --email alice@example.com
//!   export DRIVE_SESSION=<session id>
//!   drive-cli ls --tab starred
//!   drive-cli upload ./beach.jpg --folder <folder id>

use clap::{Parser, Subcommand};
use dialoguer::{Confirm, Password};
use std::io::Write;
use std::path::PathBuf;
use std::sync::Arc;
use tracing_subscriber::EnvFilter;
use uuid::Uuid;
use validator::Validate;

use imagedrive::client::confirm::{delete_confirmation, empty_trash_confirmation};
use imagedrive::client::dashboard::{download_name, greeting, render_listing, render_profile};
use imagedrive::client::tabs::actions_for;
use imagedrive::client::upload::{create_folder, format_size};
use imagedrive::client::{
    ConfirmationModal, DriveClient, FileAction, FileView, SelectedFile, Tab, UploadForm,
};
use imagedrive::error::AppError;
use imagedrive::validation::{SignInForm, SignUpForm};
use imagedrive::MAX_UPLOAD_BYTES;

#[derive(Parser, Debug)]
#[command(name = "drive-cli")]
#[command(about = "Browse and manage your image drive from the terminal")]
struct Args {
    /// Drive server URL
    #[arg(long, env = "DRIVE_SERVER_URL", default_value = "http://127.0.0.1:3000")]
    server: String,

    /// Session id from `sign-in`
    #[arg(long, env = "DRIVE_SESSION", hide_env_values = true)]
    session: Option<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Sign in and print the session id
    SignIn {
        #[arg(long)]
        email: String,
        /// Prompted for when omitted
        #[arg(long)]
        password: Option<String>,
    },
    /// Create an account
    SignUp {
        #[arg(long)]
        email: String,
        #[arg(long)]
        password: Option<String>,
        #[arg(long)]
        password_confirm: Option<String>,
    },
    /// List a folder
    Ls {
        /// Folder id; the root when omitted
        #[arg(long)]
        folder: Option<Uuid>,
        #[arg(long, value_enum, default_value_t = Tab::All)]
        tab: Tab,
    },
    /// Upload one image
    Upload {
        path: PathBuf,
        #[arg(long)]
        folder: Option<Uuid>,
    },
    /// Create a folder
    Mkdir {
        name: String,
        #[arg(long)]
        folder: Option<Uuid>,
    },
    /// Star or unstar
    Star { id: Uuid },
    /// Move to or out of the trash
    Trash { id: Uuid },
    /// Take out of the trash
    Restore { id: Uuid },
    /// Move into another folder
    Mv {
        id: Uuid,
        /// Target folder; the root when omitted
        #[arg(long)]
        to: Option<Uuid>,
    },
    /// Delete a trashed entry permanently
    Rm {
        id: Uuid,
        /// Skip the confirmation prompt
        #[arg(long)]
        yes: bool,
    },
    /// Delete everything in the trash
    EmptyTrash {
        #[arg(long)]
        yes: bool,
    },
    /// Save a file locally
    Download {
        id: Uuid,
        #[arg(long, short)]
        output: Option<PathBuf>,
    },
    /// Show the profile page
    Profile,
    /// Print parameters for a direct ImageKit upload
    UploadAuth,
}

/// Show the dialog and ask; the default answer is no.
fn confirm_gate(mut modal: ConfirmationModal, yes: bool) -> anyhow::Result<bool> {
    modal.open();
    if yes {
        return Ok(modal.confirm(|| true).unwrap_or(false));
    }

    eprintln!("{}", modal.render());
    let answer = Confirm::new()
        .with_prompt(modal.confirm_label.clone())
        .default(false)
        .interact()?;

    if answer {
        Ok(modal.confirm(|| true).unwrap_or(false))
    } else {
        modal.cancel();
        Ok(false)
    }
}

fn password_or_prompt(value: Option<String>, prompt: &str) -> anyhow::Result<String> {
    match value {
        Some(password) => Ok(password),
        None => Ok(Password::new().with_prompt(prompt).interact()?),
    }
}

fn print_entry(action: &str, entry: &imagedrive::drive::FileEntry) {
    println!("{} {} ({})", action, entry.path, entry.id);
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")))
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse();

    let mut client = DriveClient::new(args.server.clone())?;
    if let Some(session) = &args.session {
        client = client.with_session(session.clone());
    }

    match args.command {
        Command::SignIn { email, password } => {
            let form = SignInForm {
                identifier: email,
                password: password_or_prompt(password, "Password")?,
            };
            form.validate().map_err(AppError::from)?;

            let (session, _) = client.sign_in(&form).await?;
            eprintln!("Signed in as {}", session.user_id);
            println!("export DRIVE_SESSION={}", session.session_id);
        }

        Command::SignUp {
            email,
            password,
            password_confirm,
        } => {
            let password = password_or_prompt(password, "Password")?;
            let password_confirm = password_or_prompt(password_confirm, "Confirm password")?;
            let form = SignUpForm {
                email,
                password,
                password_confirm,
            };
            form.validate().map_err(AppError::from)?;

            let user = client.sign_up(&form).await?;
            println!("Account created for {} ({})", user.display_name(), user.id);
            println!("Sign in with `drive-cli sign-in --email {}`", form.email);
        }

        Command::Ls { folder, tab } => {
            let entries = client.list(folder).await?;
            let breadcrumb = match folder {
                Some(id) => client.ancestors(id).await?,
                None => Vec::new(),
            };
            if !breadcrumb.is_empty() {
                let trail: Vec<&str> = breadcrumb.iter().map(|e| e.name.as_str()).collect();
                println!("Home / {}", trail.join(" / "));
            }

            let mut view = FileView::new(entries);
            view.select(tab);
            print!("{}", render_listing(&view, &breadcrumb));
        }

        Command::Upload { path, folder } => {
            // Oversized files are refused here, before any request.
            let file = SelectedFile::from_path(&path, MAX_UPLOAD_BYTES).await?;
            let name = file.name.clone();
            let size = file.size();

            let mut form = UploadForm::new(MAX_UPLOAD_BYTES).with_progress_listener(Arc::new(
                |pct: u8| {
                    eprint!("\rUploading... {:>3}%", pct);
                    let _ = std::io::stderr().flush();
                },
            ));
            form.select(file)?;

            let entry = form
                .upload(&client, folder, |_| eprintln!())
                .await?;
            println!(
                "{} ({}) has been uploaded successfully as {}",
                name,
                format_size(size),
                entry.id
            );
        }

        Command::Mkdir { name, folder } => {
            let created = create_folder(&client, &name, folder, |_| {}).await?;
            println!("Folder \"{}\" created successfully ({})", created.name, created.id);
        }

        Command::Star { id } => {
            let entry = client.toggle_star(id).await?;
            print_entry(if entry.is_starred { "Starred" } else { "Unstarred" }, &entry);
        }

        Command::Trash { id } => {
            let entry = client.toggle_trash(id).await?;
            print_entry(
                if entry.is_trash { "Moved to trash:" } else { "Restored" },
                &entry,
            );
        }

        Command::Restore { id } => {
            let entry = client.restore(id).await?;
            print_entry("Restored", &entry);
        }

        Command::Mv { id, to } => {
            let entry = client.move_to(id, to).await?;
            print_entry("Moved to", &entry);
        }

        Command::Rm { id, yes } => {
            let entry = client.get(id).await?;
            if !actions_for(&entry).contains(&FileAction::DeletePermanently) {
                return Err(AppError::Validation(format!(
                    "'{}' is not in the trash; trash it first",
                    entry.name
                ))
                .into());
            }

            if confirm_gate(delete_confirmation(&entry.name), yes)? {
                let deleted = client.delete(id).await?;
                println!("Deleted {} permanently", deleted.deleted_id);
            } else {
                println!("Cancelled");
            }
        }

        Command::EmptyTrash { yes } => {
            let trashed = client.profile().await?.usage.trashed;
            if trashed == 0 {
                println!("Trash is empty");
                return Ok(());
            }

            if confirm_gate(empty_trash_confirmation(trashed as usize), yes)? {
                let result = client.empty_trash().await?;
                println!("Deleted {} item(s) from the trash", result.deleted_count);
            } else {
                println!("Cancelled");
            }
        }

        Command::Download { id, output } => {
            let entry = client.get(id).await?;
            if !actions_for(&entry).contains(&FileAction::Download) {
                return Err(AppError::Validation(format!(
                    "'{}' cannot be downloaded",
                    entry.name
                ))
                .into());
            }

            let data = client.download(id).await?;
            let output =
                output.unwrap_or_else(|| PathBuf::from(download_name(&entry.name, entry.id)));
            tokio::fs::write(&output, &data).await?;
            println!("Saved {} ({})", output.display(), format_size(data.len() as u64));
        }

        Command::Profile => {
            let profile = client.profile().await?;
            println!("{}\n", greeting(&profile.user.display_name()));
            print!("{}", render_profile(&profile));
        }

        Command::UploadAuth => {
            let auth = client.imagekit_auth().await?;
            println!("{}", serde_json::to_string_pretty(&auth)?);
        }
    }

    Ok(())
}
