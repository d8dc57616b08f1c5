//! Page lifecycle tracking.

use std::fmt;

/// Lifecycle phases of a preloaded page.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LifecyclePhase {
    /// Initial props are being produced.
    InitialProps,
    /// Server waited for in-flight queries to settle.
    Flushed,
    /// A render pass completed.
    Rendered,
    /// A redirect short-circuited the navigation.
    Redirected,
    /// Query handles were released.
    Disposed,
}

impl LifecyclePhase {
    /// Name used in log fields.
    pub fn name(&self) -> &'static str {
        match self {
            Self::InitialProps => "initial_props",
            Self::Flushed => "flushed",
            Self::Rendered => "rendered",
            Self::Redirected => "redirected",
            Self::Disposed => "disposed",
        }
    }
}

impl fmt::Display for LifecyclePhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}
