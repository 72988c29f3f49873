use parking_lot::Mutex;

pub type DialogCallback = Box<dyn FnOnce() + Send>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DialogKind {
    Delete,
    Confirm,
    Alert,
}

/// A prompt waiting for the user. Callbacks run at most once.
pub struct DialogRequest {
    pub kind: DialogKind,
    pub title: String,
    pub message: String,
    pub data: Option<serde_json::Value>,
    on_confirm: Option<DialogCallback>,
    on_cancel: Option<DialogCallback>,
}

impl DialogRequest {
    pub fn new(kind: DialogKind, title: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            kind,
            title: title.into(),
            message: message.into(),
            data: None,
            on_confirm: None,
            on_cancel: None,
        }
    }

    pub fn alert(title: impl Into<String>, message: impl Into<String>) -> Self {
        Self::new(DialogKind::Alert, title, message)
    }

    pub fn with_data(mut self, data: serde_json::Value) -> Self {
        self.data = Some(data);
        self
    }

    pub fn on_confirm(mut self, f: impl FnOnce() + Send + 'static) -> Self {
        self.on_confirm = Some(Box::new(f));
        self
    }

    pub fn on_cancel(mut self, f: impl FnOnce() + Send + 'static) -> Self {
        self.on_cancel = Some(Box::new(f));
        self
    }

    fn view(&self) -> DialogView {
        DialogView {
            kind: self.kind,
            title: self.title.clone(),
            message: self.message.clone(),
            data: self.data.clone(),
        }
    }
}

impl std::fmt::Debug for DialogRequest {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DialogRequest")
            .field("kind", &self.kind)
            .field("title", &self.title)
            .field("message", &self.message)
            .field("data", &self.data)
            .field("on_confirm", &self.on_confirm.is_some())
            .field("on_cancel", &self.on_cancel.is_some())
            .finish()
    }
}

/// What a view needs to render the open dialog.
#[derive(Debug, Clone, PartialEq)]
pub struct DialogView {
    pub kind: DialogKind,
    pub title: String,
    pub message: String,
    pub data: Option<serde_json::Value>,
}

/// Single-slot dialog holder: opening replaces whatever is open, without
/// running the replaced request's callbacks.
#[derive(Debug, Default)]
pub struct DialogStore {
    slot: Mutex<Option<DialogRequest>>,
}

impl DialogStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn open(&self, request: DialogRequest) {
        let replaced = self.slot.lock().replace(request);
        if let Some(old) = replaced {
            tracing::debug!(title = %old.title, "dialog replaced");
        }
    }

    pub fn is_open(&self) -> bool {
        self.slot.lock().is_some()
    }

    pub fn current(&self) -> Option<DialogView> {
        self.slot.lock().as_ref().map(DialogRequest::view)
    }

    /// Dismiss without confirming; runs the cancel callback if any.
    pub fn close(&self) {
        let taken = self.slot.lock().take();
        if let Some(cb) = taken.and_then(|r| r.on_cancel) {
            cb();
        }
    }

    /// Closes the dialog, then runs the confirm callback. The callback may open
    /// a follow-up dialog.
    pub fn confirm(&self) {
        let taken = self.slot.lock().take();
        if let Some(cb) = taken.and_then(|r| r.on_confirm) {
            cb();
        }
    }
}
