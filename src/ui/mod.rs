pub mod input;
pub mod layout;
pub mod pair;
pub mod panel;
pub mod render;
pub mod sync;
pub mod text;

pub use input::{Action, InputRouter, ScrollAction, ScrollTarget};
pub use pair::{DualPanels, FocusState, PanelSide};
pub use panel::{LinePanel, LineTone, PanelLine};
pub use sync::{ScrollSynchronizer, SyncGuard};
