//! Text rendering for the dashboard shell and the navbar.

use std::ffi::OsStr;
use std::fmt::Write;
use std::path::Path;
use uuid::Uuid;

use super::tabs::{actions_for, FileAction, FileView, Tab};
use super::upload::format_size;
use crate::api::types::ProfileResponse;
use crate::drive::FileEntry;
use crate::identity::UserProfile;

/// Name used in the greeting: long names are cut to ten characters,
/// short ones reduced to the first word.
pub fn greeting_name(name: &str) -> String {
    if name.chars().count() > 10 {
        let cut: String = name.chars().take(10).collect();
        return format!("{}...", cut);
    }
    match name.split(' ').next() {
        Some(first) if !first.is_empty() => first.to_string(),
        _ => "there".to_string(),
    }
}

pub fn greeting(name: &str) -> String {
    format!("Hi, {}!", greeting_name(name))
}

/// Avatar initials from first and last name, "U" when there are none.
pub fn initials(user: &UserProfile) -> String {
    let full = format!(
        "{} {}",
        user.first_name.as_deref().unwrap_or_default(),
        user.last_name.as_deref().unwrap_or_default()
    );
    let letters: String = full
        .split_whitespace()
        .filter_map(|part| part.chars().next())
        .collect::<String>()
        .to_uppercase();

    if letters.is_empty() {
        "U".to_string()
    } else {
        letters
    }
}

fn action_label(action: FileAction) -> &'static str {
    match action {
        FileAction::Download => "download",
        FileAction::Star => "star",
        FileAction::Unstar => "unstar",
        FileAction::Trash => "trash",
        FileAction::Restore => "restore",
        FileAction::DeletePermanently => "delete",
    }
}

/// The tab bar, e.g. `[All Files 3]  Starred 1  Trash 0`.
pub fn render_tabs(view: &FileView) -> String {
    let counts = view.counts();
    Tab::ALL
        .iter()
        .map(|&tab| {
            let count = match tab {
                Tab::All => counts.all,
                Tab::Starred => counts.starred,
                Tab::Trash => counts.trash,
            };
            if tab == view.active() {
                format!("[{} {}]", tab.label(), count)
            } else {
                format!("{} {}", tab.label(), count)
            }
        })
        .collect::<Vec<_>>()
        .join("  ")
}

/// The file list of the active tab with per-entry actions.
pub fn render_listing(view: &FileView, breadcrumb: &[FileEntry]) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "{}", render_tabs(view));
    let _ = writeln!(out, "\n{}", view.active().heading(breadcrumb));

    let visible = view.visible();
    if visible.is_empty() {
        let _ = writeln!(
            out,
            "{}",
            match view.active() {
                Tab::All => "No files yet. Upload an image to get started.",
                Tab::Starred => "No starred files.",
                Tab::Trash => "Trash is empty.",
            }
        );
        return out;
    }

    for entry in visible {
        let star = if entry.is_starred { "*" } else { " " };
        let size = if entry.is_folder {
            "-".to_string()
        } else {
            format_size(entry.size.max(0) as u64)
        };
        let actions = actions_for(entry)
            .into_iter()
            .map(action_label)
            .collect::<Vec<_>>()
            .join(",");
        let name = if entry.is_folder {
            format!("{}/", entry.name)
        } else {
            entry.name.clone()
        };
        let _ = writeln!(
            out,
            "{} {}  {:<32} {:>10}  {}  [{}]",
            star,
            entry.id,
            name,
            size,
            entry.updated_at.format("%Y-%m-%d %H:%M"),
            actions
        );
    }

    if view.can_empty_trash() {
        let _ = writeln!(out, "\nRun `drive-cli empty-trash` to delete everything above.");
    }
    out
}

/// The profile view: account details and storage usage.
pub fn render_profile(profile: &ProfileResponse) -> String {
    let user = &profile.user;
    let usage = &profile.usage;
    let mut out = String::new();

    let _ = writeln!(out, "({}) {}", initials(user), user.display_name());
    if let Some(email) = &user.email {
        let _ = writeln!(out, "Email:    {}", email);
    }
    let _ = writeln!(out, "User ID:  {}", user.id);
    if let Some(created) = user
        .created_at
        .and_then(chrono::DateTime::from_timestamp_millis)
    {
        let _ = writeln!(out, "Joined:   {}", created.format("%Y-%m-%d"));
    }

    let _ = writeln!(out, "\nStorage");
    let _ = writeln!(out, "  files:   {}", usage.files);
    let _ = writeln!(out, "  folders: {}", usage.folders);
    let _ = writeln!(out, "  starred: {}", usage.starred);
    let _ = writeln!(out, "  trash:   {}", usage.trashed);
    let _ = writeln!(
        out,
        "  used:    {}",
        format_size(usage.total_bytes.max(0) as u64)
    );
    out
}

/// Local file name for a download: the entry name when it is a plain file
/// name, the entry id otherwise.
pub fn download_name(name: &str, id: Uuid) -> String {
    if Path::new(name).file_name() == Some(OsStr::new(name)) && !name.contains(['/', '\\']) {
        name.to_string()
    } else {
        id.to_string()
    }
}
