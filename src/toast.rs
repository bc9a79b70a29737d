use std::time::{Duration, Instant};

/// How long a toast stays fully visible before it starts fading.
pub const TOAST_VISIBLE_MS: u64 = 3000;
/// Length of the fade-out phase before the toast is removed.
pub const TOAST_FADE_MS: u64 = 300;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ToastKind {
    Success,
    Error,
}

#[derive(Debug, Clone)]
pub struct Toast {
    pub message: String,
    pub kind: ToastKind,
    pub created_at: Instant,
}

impl Toast {
    pub fn new(message: impl Into<String>, kind: ToastKind) -> Self {
        Self {
            message: message.into(),
            kind,
            created_at: Instant::now(),
        }
    }

    /// True once the visible window has elapsed and the toast is fading out.
    pub fn is_fading(&self, now: Instant) -> bool {
        now.duration_since(self.created_at) >= Duration::from_millis(TOAST_VISIBLE_MS)
    }

    pub fn is_expired(&self, now: Instant) -> bool {
        now.duration_since(self.created_at)
            >= Duration::from_millis(TOAST_VISIBLE_MS + TOAST_FADE_MS)
    }
}

/// Drop every toast whose fade-out has finished. Toasts stack without a cap;
/// each one cleans itself up here once its lifetime is over.
pub fn prune(toasts: &mut Vec<Toast>, now: Instant) {
    toasts.retain(|t| !t.is_expired(now));
}
