use std::fmt;

/// Phases of a single ranged GET
///
/// ```text
/// Resolving → Connecting → RequestSent → StatusLineRead → HeadersRead → BodyStreaming → Complete
///     ↓           ↓             ↓              ↓               ↓              ↓
///  Failed      Failed        Failed         Failed          Failed         Failed
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Phase {
    Resolving,
    Connecting,
    RequestSent,
    StatusLineRead,
    HeadersRead,
    BodyStreaming,
    Complete,
    Failed,
}

impl Phase {
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Complete | Self::Failed)
    }

    /// Next phase once the work of `self` finished, terminal phases never move
    pub fn transition(self, succeeded: bool) -> Phase {
        if self.is_terminal() {
            return self;
        }
        if !succeeded {
            return Self::Failed;
        }
        match self {
            Self::Resolving => Self::Connecting,
            Self::Connecting => Self::RequestSent,
            Self::RequestSent => Self::StatusLineRead,
            Self::StatusLineRead => Self::HeadersRead,
            Self::HeadersRead => Self::BodyStreaming,
            Self::BodyStreaming => Self::Complete,
            Self::Complete | Self::Failed => self,
        }
    }
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}
