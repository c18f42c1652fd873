mod error;

pub mod editing;
pub mod host;
pub mod semantic;
pub mod shadow;

// Re-export key types for easier usage
pub use editing::{
    ChangeContext, DocumentSelection, Editor, EditorEvent, EditorListener, EditorOptions,
    EventQueue, ManualClock, NullListener, TextChange,
};
pub use error::EditorError;
pub use host::{HostId, HostKind, HostTree, MemoryHost};
pub use semantic::{AttrKey, Selection, Strategy, UpdateSpec};
pub use shadow::{Node, NodeId, NodeKind, ShadowTree};
