pub mod notices;
pub mod permissions;
pub mod shell;
pub mod views;

pub use notices::Toasts;
pub use permissions::{PermissionGate, PolicyPermissions};
pub use shell::CameraApp;
