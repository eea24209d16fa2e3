//! Page-side highlight engine: document tree, text re-identification,
//! marking, selection capture, and the controller tying them to the
//! background service.

pub mod controller;
pub mod dom;
pub mod fragment;
pub mod locate;
pub mod mark;
pub mod node_cache;
pub mod selection;

pub use controller::PageController;
pub use dom::{PageDom, PageNode, parse_document};
pub use locate::{LocateHints, Location, locate};
pub use mark::{MarkerHandle, mark, unmark, unmark_all};
pub use node_cache::NodeCache;
pub use selection::{SelectionSnapshot, capture};
