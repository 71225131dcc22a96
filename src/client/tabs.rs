//! Tab filtering over an already-fetched listing.

use std::fmt;

use crate::drive::FileEntry;

/// Which slice of the listing is shown. Exactly one tab is active.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, clap::ValueEnum)]
pub enum Tab {
    #[default]
    All,
    Starred,
    Trash,
}

impl Tab {
    pub const ALL: [Tab; 3] = [Tab::All, Tab::Starred, Tab::Trash];

    pub fn matches(self, entry: &FileEntry) -> bool {
        match self {
            Tab::All => !entry.is_trash,
            Tab::Starred => entry.is_starred && !entry.is_trash,
            Tab::Trash => entry.is_trash,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Tab::All => "All Files",
            Tab::Starred => "Starred",
            Tab::Trash => "Trash",
        }
    }

    /// Heading over the list; the All tab shows the current folder's name.
    pub fn heading(self, breadcrumb: &[FileEntry]) -> String {
        match (self, breadcrumb.last()) {
            (Tab::All, Some(folder)) => folder.name.clone(),
            (Tab::All, None) => "All Files".to_string(),
            (Tab::Starred, _) => "Starred Files".to_string(),
            (Tab::Trash, _) => "Trash".to_string(),
        }
    }
}

impl fmt::Display for Tab {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Badge numbers for the three tabs.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TabCounts {
    pub all: usize,
    pub starred: usize,
    pub trash: usize,
}

/// Per-entry buttons.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileAction {
    Download,
    Star,
    Unstar,
    Trash,
    Restore,
    DeletePermanently,
}

impl FileAction {
    /// Actions that cannot be taken back and go through a confirmation.
    pub fn is_destructive(self) -> bool {
        matches!(self, FileAction::DeletePermanently)
    }
}

/// Buttons offered for `entry`, in display order.
pub fn actions_for(entry: &FileEntry) -> Vec<FileAction> {
    let mut actions = Vec::with_capacity(3);
    if !entry.is_trash && !entry.is_folder {
        actions.push(FileAction::Download);
    }
    if !entry.is_trash {
        actions.push(if entry.is_starred {
            FileAction::Unstar
        } else {
            FileAction::Star
        });
    }
    actions.push(if entry.is_trash {
        FileAction::Restore
    } else {
        FileAction::Trash
    });
    if entry.is_trash {
        actions.push(FileAction::DeletePermanently);
    }
    actions
}

/// A listing plus the active tab.
#[derive(Debug, Clone, Default)]
pub struct FileView {
    entries: Vec<FileEntry>,
    active: Tab,
}

impl FileView {
    pub fn new(entries: Vec<FileEntry>) -> Self {
        Self {
            entries,
            active: Tab::All,
        }
    }

    /// Replace the listing after a refresh, keeping the active tab.
    pub fn set_entries(&mut self, entries: Vec<FileEntry>) {
        self.entries = entries;
    }

    pub fn select(&mut self, tab: Tab) {
        self.active = tab;
    }

    pub fn active(&self) -> Tab {
        self.active
    }

    pub fn visible(&self) -> Vec<&FileEntry> {
        self.entries
            .iter()
            .filter(|e| self.active.matches(e))
            .collect()
    }

    pub fn counts(&self) -> TabCounts {
        let count = |tab: Tab| self.entries.iter().filter(|e| tab.matches(e)).count();
        TabCounts {
            all: count(Tab::All),
            starred: count(Tab::Starred),
            trash: count(Tab::Trash),
        }
    }

    /// "Empty trash" is only offered on a non-empty Trash tab.
    pub fn can_empty_trash(&self) -> bool {
        self.active == Tab::Trash && self.counts().trash > 0
    }
}
