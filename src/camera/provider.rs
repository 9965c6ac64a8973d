use super::use_cases::UseCaseGroup;
use crate::error::AppError;
use async_trait::async_trait;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LensFacing {
    #[default]
    Back,
    Front,
}

impl LensFacing {
    /// Front-facing sensors are shown mirrored.
    pub fn is_mirrored(self) -> bool {
        matches!(self, LensFacing::Front)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct CameraSelector {
    pub facing: LensFacing,
}

impl CameraSelector {
    pub const BACK: Self = Self {
        facing: LensFacing::Back,
    };
    pub const FRONT: Self = Self {
        facing: LensFacing::Front,
    };
}

/// Process-wide access to a camera device.
///
/// Binding attaches a set of use-cases to one camera; frames flow to them
/// until `unbind_all` is called. Only one set may be bound at a time.
#[async_trait]
pub trait CameraProvider: Send + Sync {
    /// Resolves once the provider can accept bindings.
    async fn initialize(&self) -> Result<(), AppError>;

    fn unbind_all(&self);

    fn bind(&self, selector: CameraSelector, use_cases: UseCaseGroup) -> Result<(), AppError>;

    fn is_bound(&self) -> bool;
}
