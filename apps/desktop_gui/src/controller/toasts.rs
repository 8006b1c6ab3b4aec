//! Transient notices shown in the corner of the window.

use std::time::{Duration, Instant};

use profile_client::{Notice, NoticeIcon, NoticeLevel};

pub const TOAST_LIFETIME: Duration = Duration::from_secs(4);
const MAX_TOASTS: usize = 5;

#[derive(Debug, Clone)]
pub struct Toast {
    pub id: u64,
    pub notice: Notice,
    expires_at: Instant,
}

impl Toast {
    pub fn prefix(&self) -> &'static str {
        match (self.notice.icon, self.notice.level) {
            (Some(NoticeIcon::Delete), _) => "🗑",
            (None, NoticeLevel::Success) => "✔",
            (None, NoticeLevel::Error) => "⚠",
        }
    }
}

#[derive(Debug, Default)]
pub struct ToastQueue {
    toasts: Vec<Toast>,
    next_id: u64,
}

impl ToastQueue {
    pub fn push(&mut self, notice: Notice, now: Instant) {
        self.next_id += 1;
        self.toasts.push(Toast {
            id: self.next_id,
            notice,
            expires_at: now + TOAST_LIFETIME,
        });
        if self.toasts.len() > MAX_TOASTS {
            self.toasts.remove(0);
        }
    }

    pub fn dismiss(&mut self, id: u64) {
        self.toasts.retain(|toast| toast.id != id);
    }

    pub fn expire(&mut self, now: Instant) {
        self.toasts.retain(|toast| toast.expires_at > now);
    }

    pub fn visible(&self) -> &[Toast] {
        &self.toasts
    }

    pub fn is_empty(&self) -> bool {
        self.toasts.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn toasts_expire_after_lifetime() {
        let start = Instant::now();
        let mut queue = ToastQueue::default();
        queue.push(Notice::success("User Information Updated Successfully!"), start);

        queue.expire(start + Duration::from_secs(1));
        assert_eq!(queue.visible().len(), 1);

        queue.expire(start + TOAST_LIFETIME);
        assert!(queue.is_empty());
    }

    #[test]
    fn dismiss_removes_only_that_toast() {
        let now = Instant::now();
        let mut queue = ToastQueue::default();
        queue.push(Notice::success("first"), now);
        queue.push(Notice::error("second"), now);

        let first = queue.visible()[0].id;
        queue.dismiss(first);

        assert_eq!(queue.visible().len(), 1);
        assert_eq!(queue.visible()[0].notice.text, "second");
    }

    #[test]
    fn oldest_toast_is_dropped_when_full() {
        let now = Instant::now();
        let mut queue = ToastQueue::default();
        for i in 0..=MAX_TOASTS {
            queue.push(Notice::success(format!("n{i}")), now);
        }
        assert_eq!(queue.visible().len(), MAX_TOASTS);
        assert_eq!(queue.visible()[0].notice.text, "n1");
    }

    #[test]
    fn delete_notice_carries_trash_prefix() {
        let mut queue = ToastQueue::default();
        queue.push(
            Notice::success("User has been Deleted Successfully!").with_icon(NoticeIcon::Delete),
            Instant::now(),
        );
        assert_eq!(queue.visible()[0].prefix(), "🗑");
    }
}
