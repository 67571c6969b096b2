//! Per-connection navigation state.
//!
//! One `SessionContext` per connection carries the selected root, the
//! prefix currently being listed, and the selected history date —
//! explicit state threaded through the client instead of the ambient
//! globals the protocol's reference viewer kept.

/// Navigation state of one connection.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SessionContext {
    root: Option<String>,
    /// Path relative to the root currently being listed; empty string is
    /// the root's own top level. Non-empty prefixes end with `/`.
    prefix: String,
    /// Selected history date, echoed back to the daemon verbatim.
    date: Option<String>,
}

impl SessionContext {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn root(&self) -> Option<&str> {
        self.root.as_deref()
    }

    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    pub fn date(&self) -> Option<&str> {
        self.date.as_deref()
    }

    /// Select a root; navigation restarts at its top level. The history
    /// date survives root changes.
    pub fn select_root(&mut self, root: &str) {
        self.root = Some(root.to_string());
        self.prefix.clear();
    }

    /// Descend into a folder of the current listing.
    pub fn enter(&mut self, folder: &str) {
        self.prefix.push_str(folder);
        self.prefix.push('/');
    }

    /// Ascend one level; no-op at the top.
    pub fn up(&mut self) {
        let trimmed_len = self.prefix.trim_end_matches('/').len();
        match self.prefix[..trimmed_len].rfind('/') {
            Some(idx) => self.prefix.truncate(idx + 1),
            None => self.prefix.clear(),
        }
    }

    /// Adopt the prefix a listing response declared.
    pub fn set_prefix(&mut self, prefix: &str) {
        if self.prefix != prefix {
            prefix.clone_into(&mut self.prefix);
        }
    }

    /// Select the history date listings are scoped to (`None` = live).
    pub fn select_date(&mut self, date: Option<String>) {
        self.date = date;
    }
}
