//! Confirmation gate for destructive actions.

/// Banner heading shown for dangerous actions that carry a warning.
pub const CANNOT_UNDO: &str = "This action cannot be undone";

/// A modal that runs its action only on an explicit confirm.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConfirmationModal {
    pub title: String,
    pub description: String,
    pub confirm_label: String,
    pub cancel_label: String,
    pub is_dangerous: bool,
    pub warning: Option<String>,
    open: bool,
}

impl ConfirmationModal {
    pub fn new(title: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            description: description.into(),
            confirm_label: "Confirm".to_string(),
            cancel_label: "Cancel".to_string(),
            is_dangerous: false,
            warning: None,
            open: false,
        }
    }

    pub fn confirm_label(mut self, label: impl Into<String>) -> Self {
        self.confirm_label = label.into();
        self
    }

    pub fn cancel_label(mut self, label: impl Into<String>) -> Self {
        self.cancel_label = label.into();
        self
    }

    pub fn dangerous(mut self, warning: Option<String>) -> Self {
        self.is_dangerous = true;
        self.warning = warning;
        self
    }

    pub fn open(&mut self) {
        self.open = true;
    }

    pub fn is_open(&self) -> bool {
        self.open
    }

    /// Heading and text of the warning banner, if one is shown.
    pub fn banner(&self) -> Option<(&'static str, &str)> {
        match (&self.warning, self.is_dangerous) {
            (Some(warning), true) => Some((CANNOT_UNDO, warning.as_str())),
            _ => None,
        }
    }

    /// Click outside the dialog. Closes without running anything.
    pub fn dismiss(&mut self) {
        self.open = false;
    }

    pub fn cancel(&mut self) {
        self.open = false;
    }

    /// Run `action` and close. Does nothing if the modal is not open.
    pub fn confirm<T>(&mut self, action: impl FnOnce() -> T) -> Option<T> {
        if !self.open {
            return None;
        }
        let result = action();
        self.open = false;
        Some(result)
    }

    /// Plain-text rendering for terminal prompts.
    pub fn render(&self) -> String {
        let mut text = self.title.clone();
        if let Some((heading, warning)) = self.banner() {
            text.push_str(&format!("\n! {}\n  {}", heading, warning));
        }
        text.push('\n');
        text.push_str(&self.description);
        text
    }
}

/// Dialog for permanently deleting one entry.
pub fn delete_confirmation(name: &str) -> ConfirmationModal {
    ConfirmationModal::new(
        "Confirm Permanent Deletion",
        format!("Are you sure you want to permanently delete \"{}\"?", name),
    )
    .confirm_label("Delete Permanently")
    .dangerous(Some(format!(
        "\"{}\" will be removed from storage and cannot be recovered.",
        name
    )))
}

/// Dialog for emptying the trash.
pub fn empty_trash_confirmation(count: usize) -> ConfirmationModal {
    ConfirmationModal::new(
        "Empty Trash",
        format!(
            "Are you sure you want to empty the trash? {} item(s) will be deleted.",
            count
        ),
    )
    .confirm_label("Empty Trash")
    .dangerous(Some(
        "All files in the trash will be permanently deleted.".to_string(),
    ))
}
