use crate::common::Notice;
use std::collections::VecDeque;
use std::time::{Duration, Instant};
use tokio::sync::mpsc::Receiver;
use tokio::sync::mpsc::error::TryRecvError;

const MAX_TOASTS: usize = 4;

#[derive(Debug, Clone)]
pub struct Toast {
    pub notice: Notice,
    pub expires_at: Instant,
}

/// Short-lived messages shown over the viewfinder, newest last.
pub struct Toasts {
    rx: Receiver<Notice>,
    visible: VecDeque<Toast>,
    duration: Duration,
    disconnected: bool,
}

impl Toasts {
    pub fn new(rx: Receiver<Notice>, duration: Duration) -> Self {
        Self {
            rx,
            visible: VecDeque::new(),
            duration,
            disconnected: false,
        }
    }

    /// Pulls pending notices and drops expired toasts.
    pub fn refresh(&mut self, now: Instant) {
        while !self.disconnected {
            match self.rx.try_recv() {
                Ok(notice) => self.push(notice, now),
                Err(TryRecvError::Empty) => break,
                Err(TryRecvError::Disconnected) => self.disconnected = true,
            }
        }
        self.visible.retain(|toast| toast.expires_at > now);
    }

    pub fn push(&mut self, notice: Notice, now: Instant) {
        if self.visible.len() == MAX_TOASTS {
            self.visible.pop_front();
        }
        self.visible.push_back(Toast {
            notice,
            expires_at: now + self.duration,
        });
    }

    pub fn visible(&self) -> impl Iterator<Item = &Toast> {
        self.visible.iter()
    }

    pub fn is_empty(&self) -> bool {
        self.visible.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::common::notice_channel;
    use std::path::PathBuf;

    #[test]
    fn toasts_expire_after_duration() {
        let (tx, rx) = notice_channel();
        let mut toasts = Toasts::new(rx, Duration::from_secs(2));
        let start = Instant::now();

        tx.post(Notice::PhotoSaved(PathBuf::from("/tmp/a.jpg")));
        toasts.refresh(start);
        assert_eq!(toasts.visible().count(), 1);

        toasts.refresh(start + Duration::from_secs(3));
        assert!(toasts.is_empty());
    }

    #[test]
    fn keeps_only_the_newest_few() {
        let (_tx, rx) = notice_channel();
        let mut toasts = Toasts::new(rx, Duration::from_secs(2));
        let now = Instant::now();
        for i in 0..6 {
            toasts.push(Notice::PhotoFailed(i.to_string()), now);
        }
        let shown: Vec<_> = toasts.visible().map(|t| t.notice.clone()).collect();
        assert_eq!(shown.len(), MAX_TOASTS);
        assert_eq!(shown[0], Notice::PhotoFailed("2".to_string()));
    }

    #[test]
    fn survives_a_closed_channel() {
        let (tx, rx) = notice_channel();
        let mut toasts = Toasts::new(rx, Duration::from_secs(2));
        drop(tx);
        toasts.refresh(Instant::now());
        toasts.refresh(Instant::now());
        assert!(toasts.is_empty());
    }
}
