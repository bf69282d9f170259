//! Resolution-independent answer fields for scanned worksheet pages.
//!
//! An author places rectangular fields over page images in an editor; the
//! fields are stored in document space (points, bottom-left origin) so a
//! student view at any zoom or viewport size can put inputs back in the
//! same spot.
//!
//! ```
//! use fieldmark::{EditorContext, Page};
//! use glam::dvec2;
//!
//! let mut editor = EditorContext::default();
//! editor.ingest(vec![Page::new(0, 612.0, 792.0)?]);
//! editor.page_loaded(0, 612.0, 792.0)?;
//!
//! let id = editor.add_field()?;
//! editor.pointer_move(dvec2(10.0, -20.0))?;
//! editor.pointer_up()?;
//!
//! let rect = editor.template().field(id)?.rect();
//! assert_eq!((rect.x.0, rect.y.0), (60.0, 732.0));
//! # Ok::<(), miette::Report>(())
//! ```

pub mod answers;
pub mod config;
pub mod coords;
pub mod editor;
pub mod errors;
pub mod log;
pub mod placement;
pub mod registry;
pub mod store;
pub mod student;
pub mod template;
pub mod types;

pub use config::EditorConfig;
pub use coords::CoordinateSpace;
pub use editor::{EditorContext, FieldView, SessionState};
pub use errors::{
    ConfigurationError, EditorError, RegistryError, SubmissionError, TemplateError,
    ValidationError, ValidationIssue,
};
pub use placement::{Bounds, CommitOutcome, Edges, GestureMode, PlacementSession};
pub use registry::{Field, FieldId, FieldRegistry};
pub use store::{DirStore, MemoryStore, TemplateStore, TemplateSummary};
pub use template::{Page, TemplateDocument, TemplateRecord};
pub use types::{DocRect, Pt, Px, RenderRect};
