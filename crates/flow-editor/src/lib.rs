pub mod canvas;
pub mod commands;
pub mod connect;
pub mod drag;
pub mod hover;
pub mod input;
pub mod selection;
pub mod shortcuts;
pub mod store;
pub mod timer;
pub mod viewport;

pub use canvas::{CanvasResponse, FlowCanvas};
pub use commands::CommandStack;
pub use connect::{ConnectionDrag, ConnectionPreview, DragSource, DropTarget};
pub use drag::{DragRelease, NodeDrag, NodeDragState};
pub use input::{InputEvent, Modifiers, PointerButton, PointerTarget};
pub use shortcuts::{ShortcutAction, ShortcutMap};
pub use store::{CanvasStore, GraphState};
pub use viewport::TransformController;
