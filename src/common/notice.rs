use std::path::PathBuf;
use tokio::sync::mpsc::{self, Receiver, Sender};
use tokio::sync::mpsc::error::TrySendError;
use tracing::warn;

const NOTICE_BUFFER: usize = 32;

/// Something the user should be told about.
#[derive(Debug, Clone, PartialEq)]
pub enum Notice {
    PhotoSaved(PathBuf),
    PhotoFailed(String),
    CameraUnavailable(String),
}

impl Notice {
    pub fn message(&self) -> String {
        match self {
            Notice::PhotoSaved(path) => format!("Photo capture succeeded: {}", path.display()),
            Notice::PhotoFailed(reason) => format!("Photo capture failed: {}", reason),
            Notice::CameraUnavailable(reason) => format!("Camera unavailable: {}", reason),
        }
    }

    pub fn is_error(&self) -> bool {
        !matches!(self, Notice::PhotoSaved(_))
    }
}

pub fn notice_channel() -> (NoticeSender, Receiver<Notice>) {
    let (tx, rx) = mpsc::channel(NOTICE_BUFFER);
    (NoticeSender { tx }, rx)
}

#[derive(Clone)]
pub struct NoticeSender {
    tx: Sender<Notice>,
}

impl NoticeSender {
    /// Never blocks; a notice nobody can receive is logged and dropped.
    pub fn post(&self, notice: Notice) {
        match self.tx.try_send(notice) {
            Ok(()) => {}
            Err(TrySendError::Full(notice)) => {
                warn!("Notice queue full, dropping: {}", notice.message())
            }
            Err(TrySendError::Closed(notice)) => {
                warn!("No one is listening for notices: {}", notice.message())
            }
        }
    }
}
