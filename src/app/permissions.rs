use crate::config::{PermissionPolicy, PermissionSettings};
use crate::error::AppError;
use tracing::{info, warn};

/// Shown before the window closes when the camera may not be used.
pub const DENIED_MESSAGE: &str = "Permissions not granted by the user.";

/// Decides whether the app may use the camera.
pub trait PermissionGate: Send {
    fn check(&self) -> bool;

    /// Asks for access if it is not already granted.
    fn request(&mut self) -> bool;

    fn require(&mut self) -> Result<(), AppError> {
        if self.check() || self.request() {
            Ok(())
        } else {
            Err(AppError::PermissionDenied)
        }
    }
}

/// Answers from configuration; desktop platforms have no runtime grant dialog.
#[derive(Debug, Clone)]
pub struct PolicyPermissions {
    policy: PermissionPolicy,
}

impl PolicyPermissions {
    pub fn new(policy: PermissionPolicy) -> Self {
        Self { policy }
    }

    pub fn from_settings(settings: &PermissionSettings) -> Self {
        Self::new(settings.camera)
    }
}

impl PermissionGate for PolicyPermissions {
    fn check(&self) -> bool {
        self.policy == PermissionPolicy::Granted
    }

    fn request(&mut self) -> bool {
        let granted = self.check();
        if granted {
            info!("Camera access granted");
        } else {
            warn!("Camera access denied by policy");
        }
        granted
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn granted_policy_passes() {
        let mut gate = PolicyPermissions::new(PermissionPolicy::Granted);
        assert!(gate.check());
        assert!(gate.require().is_ok());
    }

    #[test]
    fn denied_policy_is_terminal() {
        let mut gate = PolicyPermissions::from_settings(&PermissionSettings {
            camera: PermissionPolicy::Denied,
        });
        assert!(!gate.request());
        assert!(matches!(gate.require(), Err(AppError::PermissionDenied)));
    }
}
