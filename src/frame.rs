//! Whether the code runs in a top-level browsing context or an embedded frame.
//!
//! Silent renewal completes inside a hidden iframe, so the entry logic has to
//! know which side of that boundary it is on.

/// Kind of browsing context the application was loaded into.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FrameKind {
    TopLevel,
    Embedded,
}

/// Reports the current browsing context.
pub trait FrameContext: Send + Sync {
    fn kind(&self) -> FrameKind;

    fn is_embedded(&self) -> bool {
        self.kind() == FrameKind::Embedded
    }
}

/// Fixed answer, decided by the host when the manager is built.
#[derive(Debug, Clone, Copy)]
pub struct StaticFrame(FrameKind);

impl StaticFrame {
    pub fn top_level() -> Self {
        Self(FrameKind::TopLevel)
    }

    pub fn embedded() -> Self {
        Self(FrameKind::Embedded)
    }

    /// Embedded when the context's own window differs from the top window.
    pub fn from_window_identity(is_self_top: bool) -> Self {
        if is_self_top {
            Self::top_level()
        } else {
            Self::embedded()
        }
    }
}

impl FrameContext for StaticFrame {
    fn kind(&self) -> FrameKind {
        self.0
    }
}
