//! Field identity, page partitioning and the field CRUD lifecycle.

use std::fmt;
use std::str::FromStr;

use crate::errors::{RegistryError, ValidationIssue};
use crate::log;
use crate::types::DocRect;

/// Structured field identifier.
///
/// `sequence` comes from a registry-wide allocator and is never reused, so
/// it alone is unique; `page` is carried for readability of the external
/// `field_<page>_<sequence>` form.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct FieldId {
    pub page: u32,
    pub sequence: u32,
}

impl FieldId {
    pub const fn new(page: u32, sequence: u32) -> Self {
        FieldId { page, sequence }
    }
}

impl fmt::Display for FieldId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "field_{}_{}", self.page, self.sequence)
    }
}

/// Rejected external field id
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("malformed field id `{0}`")]
pub struct FieldIdParseError(pub String);

impl FromStr for FieldId {
    type Err = FieldIdParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let err = || FieldIdParseError(s.to_string());
        let rest = s.strip_prefix("field_").ok_or_else(err)?;
        let (page, sequence) = rest.split_once('_').ok_or_else(err)?;
        Ok(FieldId {
            page: page.parse().map_err(|_| err())?,
            sequence: sequence.parse().map_err(|_| err())?,
        })
    }
}

/// A rectangular answer region on one page (geometry in document space)
#[derive(Clone, Debug, PartialEq)]
pub struct Field {
    id: FieldId,
    page: u32,
    rect: DocRect,
    accepted_variants: Vec<String>,
    checkable: bool,
}

impl Field {
    /// Rebuild a field from persisted data. Geometry is not validated here;
    /// the template loader does that.
    pub(crate) fn restore(
        id: FieldId,
        page: u32,
        rect: DocRect,
        accepted_variants: Vec<String>,
        checkable: bool,
    ) -> Self {
        Field { id, page, rect, accepted_variants, checkable }
    }

    pub fn id(&self) -> FieldId {
        self.id
    }

    pub fn page(&self) -> u32 {
        self.page
    }

    pub fn rect(&self) -> DocRect {
        self.rect
    }

    pub fn accepted_variants(&self) -> &[String] {
        &self.accepted_variants
    }

    pub fn checkable(&self) -> bool {
        self.checkable
    }
}

/// Owns every field of one template, in insertion order
#[derive(Clone, Debug)]
pub struct FieldRegistry {
    fields: Vec<Field>,
    /// Next sequence number to hand out (never decreases)
    next_sequence: u32,
}

impl Default for FieldRegistry {
    fn default() -> Self {
        FieldRegistry { fields: Vec::new(), next_sequence: 1 }
    }
}

fn check_geometry(id: FieldId, rect: &DocRect) -> Result<(), RegistryError> {
    if rect.is_finite() && rect.has_positive_size() {
        Ok(())
    } else {
        Err(RegistryError::InvalidGeometry { id, w: rect.w.0, h: rect.h.0 })
    }
}

impl FieldRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a registry from loaded fields, deriving the allocator from
    /// the ids actually present.
    pub(crate) fn restore(fields: Vec<Field>) -> Self {
        let mut registry = FieldRegistry { fields, next_sequence: 1 };
        registry.recover_counter();
        registry
    }

    /// Advance the allocator past every live sequence number.
    pub fn recover_counter(&mut self) {
        if let Some(max) = self.fields.iter().map(|f| f.id.sequence).max() {
            let floor = max.saturating_add(1);
            if floor > self.next_sequence {
                log::debug!(from = self.next_sequence, to = floor, "field counter recovered");
                self.next_sequence = floor;
            }
        }
    }

    /// Sequence number the next `create_field` will use
    pub fn next_sequence(&self) -> u32 {
        self.next_sequence
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Field> {
        self.fields.iter()
    }

    pub fn get(&self, id: FieldId) -> Option<&Field> {
        self.fields.iter().find(|f| f.id == id)
    }

    pub fn contains(&self, id: FieldId) -> bool {
        self.get(id).is_some()
    }

    fn get_mut(&mut self, id: FieldId) -> Result<&mut Field, RegistryError> {
        self.fields
            .iter_mut()
            .find(|f| f.id == id)
            .ok_or(RegistryError::NotFound { id })
    }

    /// Create a checkable field with no accepted variants.
    ///
    /// Page existence is the caller's concern; see `TemplateDocument::create_field`.
    pub fn create_field(&mut self, page: u32, rect: DocRect) -> Result<&Field, RegistryError> {
        self.recover_counter();
        // u32::MAX is never handed out, so the counter always stays ahead of it.
        let next = self
            .next_sequence
            .checked_add(1)
            .ok_or(RegistryError::IdsExhausted)?;
        let id = FieldId::new(page, self.next_sequence);
        check_geometry(id, &rect)?;
        self.next_sequence = next;

        log::debug!(%id, x = rect.x.0, y = rect.y.0, w = rect.w.0, h = rect.h.0, "field created");
        self.fields.push(Field {
            id,
            page,
            rect,
            accepted_variants: Vec::new(),
            checkable: true,
        });
        Ok(&self.fields[self.fields.len() - 1])
    }

    /// Replace accepted variants; entries are trimmed and blanks dropped.
    pub fn set_variants<I, S>(&mut self, id: FieldId, variants: I) -> Result<(), RegistryError>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let field = self.get_mut(id)?;
        field.accepted_variants = variants
            .into_iter()
            .map(|v| v.as_ref().trim().to_string())
            .filter(|v| !v.is_empty())
            .collect();
        Ok(())
    }

    pub fn set_checkable(&mut self, id: FieldId, checkable: bool) -> Result<(), RegistryError> {
        self.get_mut(id)?.checkable = checkable;
        Ok(())
    }

    /// Overwrite a field's document-space rect. Invalid geometry leaves the
    /// previous rect in place.
    pub fn update_geometry(&mut self, id: FieldId, rect: DocRect) -> Result<(), RegistryError> {
        let field = self.get_mut(id)?;
        check_geometry(id, &rect)?;
        field.rect = rect;
        Ok(())
    }

    /// Remove a field. Its id stays retired.
    pub fn delete_field(&mut self, id: FieldId) -> Result<Field, RegistryError> {
        let pos = self
            .fields
            .iter()
            .position(|f| f.id == id)
            .ok_or(RegistryError::NotFound { id })?;
        log::debug!(%id, "field deleted");
        Ok(self.fields.remove(pos))
    }

    /// Fields of one page, in insertion order
    pub fn fields_on_page(&self, page: u32) -> impl Iterator<Item = &Field> {
        self.fields.iter().filter(move |f| f.page == page)
    }

    /// Every checkable field without an accepted answer
    pub fn validate_for_publish(&self) -> Vec<ValidationIssue> {
        self.fields
            .iter()
            .filter(|f| f.checkable && f.accepted_variants.is_empty())
            .map(|f| ValidationIssue::NoAcceptedVariants { field: f.id })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    fn rect() -> DocRect {
        DocRect::pt(50.0, 712.0, 150.0, 30.0)
    }

    #[test]
    fn field_id_formats_and_parses() {
        let id = FieldId::new(2, 15);
        assert_eq!(id.to_string(), "field_2_15");
        assert_eq!("field_2_15".parse::<FieldId>(), Ok(id));
        assert!("field_2".parse::<FieldId>().is_err());
        assert!("box_2_15".parse::<FieldId>().is_err());
        assert!("field_x_1".parse::<FieldId>().is_err());
    }

    #[test]
    fn create_field_defaults() {
        let mut reg = FieldRegistry::new();
        let field = reg.create_field(0, rect()).unwrap();
        assert_eq!(field.id(), FieldId::new(0, 1));
        assert!(field.checkable());
        assert!(field.accepted_variants().is_empty());
        assert_eq!(field.rect(), rect());
    }

    #[test]
    fn ids_never_repeat_across_deletes() {
        let mut reg = FieldRegistry::new();
        let mut seen = HashSet::new();
        for round in 0..20u32 {
            let id = reg.create_field(round % 3, rect()).unwrap().id();
            assert!(seen.insert(id), "{id} handed out twice");
            if round % 2 == 0 {
                reg.delete_field(id).unwrap();
            }
        }
        let sequences: HashSet<u32> = seen.iter().map(|id| id.sequence).collect();
        assert_eq!(sequences.len(), seen.len());
    }

    #[test]
    fn counter_recovers_from_restored_ids() {
        let fields = [3, 7, 2]
            .into_iter()
            .map(|seq| Field::restore(FieldId::new(0, seq), 0, rect(), vec![], true))
            .collect();
        let mut reg = FieldRegistry::restore(fields);
        assert_eq!(reg.next_sequence(), 8);
        let id = reg.create_field(1, rect()).unwrap().id();
        assert_eq!(id, FieldId::new(1, 8));
    }

    #[test]
    fn allocator_refuses_to_wrap() {
        let fields = vec![Field::restore(FieldId::new(0, u32::MAX - 1), 0, rect(), vec![], true)];
        let mut reg = FieldRegistry::restore(fields);
        assert_eq!(reg.next_sequence(), u32::MAX);
        assert_eq!(reg.create_field(0, rect()).map(Field::id), Err(RegistryError::IdsExhausted));
        assert_eq!(reg.len(), 1);
        assert_eq!(reg.next_sequence(), u32::MAX);
    }

    #[test]
    fn set_variants_trims_and_drops_blanks() {
        let mut reg = FieldRegistry::new();
        let id = reg.create_field(0, rect()).unwrap().id();
        reg.set_variants(id, ["  Paris ", "", "   ", "paris"]).unwrap();
        assert_eq!(reg.get(id).unwrap().accepted_variants(), ["Paris", "paris"]);
    }

    #[test]
    fn unknown_field_is_not_found() {
        let mut reg = FieldRegistry::new();
        let ghost = FieldId::new(0, 99);
        assert_eq!(
            reg.set_variants(ghost, ["a"]),
            Err(RegistryError::NotFound { id: ghost })
        );
        assert_eq!(
            reg.update_geometry(ghost, rect()),
            Err(RegistryError::NotFound { id: ghost })
        );
        assert!(reg.delete_field(ghost).is_err());
    }

    #[test]
    fn invalid_geometry_keeps_previous_rect() {
        let mut reg = FieldRegistry::new();
        let id = reg.create_field(0, rect()).unwrap().id();
        let err = reg.update_geometry(id, DocRect::pt(0.0, 0.0, 0.0, 10.0));
        assert!(matches!(err, Err(RegistryError::InvalidGeometry { .. })));
        assert_eq!(reg.get(id).unwrap().rect(), rect());
    }

    #[test]
    fn create_rejects_degenerate_rect_without_burning_id() {
        let mut reg = FieldRegistry::new();
        assert!(reg.create_field(0, DocRect::pt(0.0, 0.0, -1.0, 5.0)).is_err());
        assert_eq!(reg.next_sequence(), 1);
        assert!(reg.is_empty());
    }

    #[test]
    fn fields_on_page_keeps_insertion_order() {
        let mut reg = FieldRegistry::new();
        let a = reg.create_field(1, rect()).unwrap().id();
        reg.create_field(0, rect()).unwrap();
        let b = reg.create_field(1, rect()).unwrap().id();
        let on_page: Vec<_> = reg.fields_on_page(1).map(Field::id).collect();
        assert_eq!(on_page, vec![a, b]);
    }

    #[test]
    fn publish_validation_flags_unanswered_checkable_fields() {
        let mut reg = FieldRegistry::new();
        let answered = reg.create_field(0, rect()).unwrap().id();
        let missing = reg.create_field(0, rect()).unwrap().id();
        let info = reg.create_field(0, rect()).unwrap().id();
        reg.set_variants(answered, ["42"]).unwrap();
        reg.set_checkable(info, false).unwrap();

        assert_eq!(
            reg.validate_for_publish(),
            vec![ValidationIssue::NoAcceptedVariants { field: missing }]
        );
    }
}
