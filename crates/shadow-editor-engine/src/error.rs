use crate::host::{HostId, MarkupError};

/// Failures that abort the current editor operation.
///
/// Everything else the editor runs into (clamped positions, repeated
/// highlights, unhandled notifications) is logged and the operation carries on.
#[derive(Debug, thiserror::Error)]
pub enum EditorError {
    #[error("no shadow node for host node {0:?}, even after a rebuild")]
    MissingShadowNode(HostId),

    #[error("host node {0:?} has a type the shadow tree cannot classify")]
    UnclassifiableNode(HostId),

    #[error("unsupported selection: {0}")]
    UnsupportedSelection(String),

    #[error("unsupported update specification: {0}")]
    UnsupportedSpecification(String),

    #[error("the editor root {0:?} cannot be replaced or removed")]
    RootNode(HostId),

    #[error("host node {0:?} is not attached to the document")]
    DetachedNode(HostId),

    #[error("markup error: {0}")]
    Markup(#[from] MarkupError),
}
