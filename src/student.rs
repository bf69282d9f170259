//! Student view: where to place input controls for a page at any viewport size.

use crate::coords::CoordinateSpace;
use crate::errors::TemplateError;
use crate::registry::FieldId;
use crate::template::TemplateDocument;
use crate::types::{Px, RenderRect, Size};

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct InputPlacement {
    pub field_id: FieldId,
    pub rect: RenderRect,
}

/// Input placements for every field on `page`, in registry order.
///
/// `render` is the displayed size of the page image in the student's
/// viewport. Inputs narrower than `min_width` are widened to the right.
pub fn layout_page(
    doc: &TemplateDocument,
    page: u32,
    render: Size<Px>,
    min_width: Px,
) -> Result<Vec<InputPlacement>, TemplateError> {
    let space = CoordinateSpace::new(doc.page(page)?.document_size(), render)?;
    Ok(doc
        .fields()
        .fields_on_page(page)
        .map(|f| {
            let mut rect = space.to_render(f.rect());
            rect.w = rect.w.max(min_width);
            InputPlacement { field_id: f.id(), rect }
        })
        .collect())
}
