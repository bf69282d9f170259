//! Drag/resize gestures on a single field.
//!
//! A session lives from pointer-down to pointer-up. While it is active its
//! `current` rect is the only source of truth for where the field is drawn;
//! the registry is written once, at commit, in document space. Pointer
//! deltas are accumulated and always applied to the captured start rect, so
//! many small moves never compound rounding error.

use crate::coords::CoordinateSpace;
use crate::errors::EditorError;
use crate::log;
use crate::registry::FieldId;
use crate::template::TemplateDocument;
use crate::types::{DocRect, Offset, Px, RenderRect};

/// Which edges of the field follow the pointer during a resize
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Edges {
    pub left: bool,
    pub right: bool,
    pub top: bool,
    pub bottom: bool,
}

impl Edges {
    pub const NONE: Edges = Edges { left: false, right: false, top: false, bottom: false };
    pub const LEFT: Edges = Edges { left: true, ..Edges::NONE };
    pub const RIGHT: Edges = Edges { right: true, ..Edges::NONE };
    pub const TOP: Edges = Edges { top: true, ..Edges::NONE };
    pub const BOTTOM: Edges = Edges { bottom: true, ..Edges::NONE };
    /// Bottom-right corner handle
    pub const BOTTOM_RIGHT: Edges = Edges { right: true, bottom: true, ..Edges::NONE };

    pub fn is_empty(self) -> bool {
        self == Edges::NONE
    }

    pub fn union(self, other: Edges) -> Edges {
        Edges {
            left: self.left || other.left,
            right: self.right || other.right,
            top: self.top || other.top,
            bottom: self.bottom || other.bottom,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum GestureMode {
    Drag,
    Resize,
}

/// Where the committed rect ended up relative to the page
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Bounds {
    Inside,
    /// Was off the page and has been pulled back onto it
    Clamped,
    /// Is off the page; stored as-is because clamping is disabled
    OutOfBounds,
}

/// Result of a committed gesture
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum CommitOutcome {
    /// Pointer returned to its start; the stored rect was left untouched
    Unchanged { field: FieldId },
    Updated { field: FieldId, rect: DocRect, bounds: Bounds },
}

impl CommitOutcome {
    pub fn field(&self) -> FieldId {
        match self {
            CommitOutcome::Unchanged { field } | CommitOutcome::Updated { field, .. } => *field,
        }
    }
}

/// An in-progress gesture. Holds the field by id only.
#[derive(Clone, Debug, PartialEq)]
pub struct PlacementSession {
    field: FieldId,
    page: u32,
    start: RenderRect,
    current: RenderRect,
    edges: Edges,
    /// Pointer travel since the gesture began
    travel: Offset<Px>,
    min_size: Px,
}

impl PlacementSession {
    /// Start a gesture on `field`, which must sit on `page`.
    ///
    /// An empty edge set is a drag; anything else is a resize.
    pub fn begin(
        doc: &TemplateDocument,
        page: u32,
        field: FieldId,
        edges: Edges,
        min_size: Px,
    ) -> Result<Self, EditorError> {
        let record = doc.field(field)?;
        if record.page() != page {
            return Err(EditorError::WrongPage { field, page });
        }
        let space = doc.page(page)?.coordinate_space()?;
        let start = space.to_render(record.rect());
        log::debug!(%field, page, ?edges, "gesture started");
        Ok(PlacementSession {
            field,
            page,
            start,
            current: start,
            edges,
            travel: Offset::default(),
            min_size: min_size.max(Px(f64::MIN_POSITIVE)),
        })
    }

    pub fn field(&self) -> FieldId {
        self.field
    }

    pub fn page(&self) -> u32 {
        self.page
    }

    pub fn mode(&self) -> GestureMode {
        if self.edges.is_empty() {
            GestureMode::Drag
        } else {
            GestureMode::Resize
        }
    }

    pub fn edges(&self) -> Edges {
        self.edges
    }

    pub fn start_rect(&self) -> RenderRect {
        self.start
    }

    /// Live render-space rect for the visual layer
    pub fn current_rect(&self) -> RenderRect {
        self.current
    }

    /// Feed one pointer-move step and return the updated live rect.
    pub fn pointer_move(&mut self, step: Offset<Px>) -> RenderRect {
        self.travel = Offset::new(self.travel.dx + step.dx, self.travel.dy + step.dy);
        self.current = match self.mode() {
            GestureMode::Drag => self.start.translate(self.travel),
            GestureMode::Resize => self.resized(),
        };
        self.current
    }

    /// Apply `travel` to the active edges of `start`; inactive edges stay put.
    fn resized(&self) -> RenderRect {
        let s = self.start;
        let (x, w) = resize_axis(s.x, s.right(), self.edges.left, self.edges.right, self.travel.dx, self.min_size);
        let (y, h) = resize_axis(s.y, s.bottom(), self.edges.top, self.edges.bottom, self.travel.dy, self.min_size);
        RenderRect { x, y, w, h }
    }

    /// Finish the gesture and write the result into the registry.
    ///
    /// `space` must be the coordinate space of the page the gesture started on.
    pub fn commit(
        self,
        doc: &mut TemplateDocument,
        space: &CoordinateSpace,
        clamp: bool,
    ) -> Result<CommitOutcome, EditorError> {
        if self.current == self.start {
            log::debug!(field = %self.field, "gesture committed without movement");
            return Ok(CommitOutcome::Unchanged { field: self.field });
        }

        let mut rect = space.to_document(self.current);
        let bounds = if space.contains(&rect) {
            Bounds::Inside
        } else if clamp {
            rect = space.clamp_to_page(rect);
            Bounds::Clamped
        } else {
            Bounds::OutOfBounds
        };

        doc.update_geometry(self.field, rect)?;
        log::debug!(field = %self.field, ?bounds, x = rect.x.0, y = rect.y.0, w = rect.w.0, h = rect.h.0, "gesture committed");
        Ok(CommitOutcome::Updated { field: self.field, rect, bounds })
    }

    /// Abandon the gesture. The stored geometry is untouched.
    pub fn cancel(self) {
        log::debug!(field = %self.field, "gesture cancelled");
    }
}

/// Move the active edges of one axis by `delta`, keeping at least `min`
/// between them. Returns the new (origin, length).
fn resize_axis(lo: Px, hi: Px, move_lo: bool, move_hi: bool, delta: Px, min: Px) -> (Px, Px) {
    let mut new_lo = if move_lo { lo + delta } else { lo };
    let mut new_hi = if move_hi { hi + delta } else { hi };
    // With both or neither edge moving the length is unchanged.
    if move_lo != move_hi && new_hi - new_lo < min {
        if move_lo {
            new_lo = new_hi - min;
        } else {
            new_hi = new_lo + min;
        }
    }
    (new_lo, new_hi - new_lo)
}
