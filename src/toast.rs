use std::time::{Duration, Instant};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ToastKind {
    Success,
    Error,
}

/// A transient notification
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Toast {
    pub kind: ToastKind,
    pub message: String,
    expires_at: Instant,
}

/// Notifications for save and delete outcomes; each one expires on its own.
#[derive(Debug)]
pub struct Toasts {
    lifetime: Duration,
    items: Vec<Toast>,
}

impl Toasts {
    pub fn new(lifetime: Duration) -> Self {
        Self {
            lifetime,
            items: Vec::new(),
        }
    }

    pub fn show(&mut self, kind: ToastKind, message: impl Into<String>) {
        self.show_at(kind, message.into(), Instant::now());
    }

    pub fn success(&mut self, message: impl Into<String>) {
        self.show(ToastKind::Success, message);
    }

    pub fn error(&mut self, message: impl Into<String>) {
        self.show(ToastKind::Error, message);
    }

    pub fn show_at(&mut self, kind: ToastKind, message: String, now: Instant) {
        self.items.push(Toast {
            kind,
            message,
            expires_at: now + self.lifetime,
        });
    }

    /// Drop expired toasts. Returns true if anything was removed.
    pub fn prune(&mut self, now: Instant) -> bool {
        let before = self.items.len();
        self.items.retain(|t| t.expires_at > now);
        self.items.len() != before
    }

    /// The most recent toast still showing.
    pub fn latest(&self) -> Option<&Toast> {
        self.items.last()
    }

    #[cfg(test)]
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}

impl Default for Toasts {
    fn default() -> Self {
        Self::new(Duration::from_secs(3))
    }
}
