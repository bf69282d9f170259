//! Error types with diagnostics using miette
//!
//! Each layer fails fast with its own enum; the outer layers wrap the inner
//! ones transparently so the diagnostic code of the root cause survives.

use miette::Diagnostic;
use thiserror::Error;

use crate::registry::FieldId;

// ============================================================================
// Configuration Errors
// ============================================================================

/// Coordinate conversion attempted without usable page dimensions.
///
/// This is an ordering bug in the caller (e.g. projecting fields before the
/// page image reported its size); it aborts the current render cycle only.
#[derive(Error, Diagnostic, Debug, Clone, PartialEq)]
pub enum ConfigurationError {
    #[error("invalid document page size: {width} x {height}")]
    #[diagnostic(
        code(fieldmark::coords::invalid_page_size),
        help("document width and height must be finite and greater than zero")
    )]
    InvalidPageSize { width: f64, height: f64 },

    #[error("render size of page {page} is not known yet")]
    #[diagnostic(
        code(fieldmark::coords::render_size_unknown),
        help("wait for the page image to report its displayed size")
    )]
    RenderSizeUnknown { page: u32 },

    #[error("invalid render size: {width} x {height}")]
    #[diagnostic(code(fieldmark::coords::invalid_render_size))]
    InvalidRenderSize { width: f64, height: f64 },

    #[error("invalid zoom factor: {value}")]
    #[diagnostic(code(fieldmark::coords::invalid_zoom))]
    InvalidZoom { value: f64 },
}

// ============================================================================
// Registry Errors
// ============================================================================

/// Errors raised by field registry operations
#[derive(Error, Diagnostic, Debug, Clone, PartialEq)]
pub enum RegistryError {
    #[error("no field with id {id}")]
    #[diagnostic(code(fieldmark::registry::not_found))]
    NotFound { id: FieldId },

    #[error("no page with index {page}")]
    #[diagnostic(code(fieldmark::registry::page_not_found))]
    PageNotFound { page: u32 },

    #[error("invalid geometry for {id}: {w} x {h}")]
    #[diagnostic(
        code(fieldmark::registry::invalid_geometry),
        help("fields need a finite position and a width and height greater than zero")
    )]
    InvalidGeometry { id: FieldId, w: f64, h: f64 },

    #[error("field sequence numbers are exhausted")]
    #[diagnostic(
        code(fieldmark::registry::ids_exhausted),
        help("start a new template; retired ids are never reused")
    )]
    IdsExhausted,
}

// ============================================================================
// Editor Errors
// ============================================================================

/// Errors raised by editor operations and placement gestures
#[derive(Error, Diagnostic, Debug, Clone, PartialEq)]
pub enum EditorError {
    #[error("a gesture on {field} is already in progress")]
    #[diagnostic(
        code(fieldmark::session::already_active),
        help("finish or cancel the current gesture first")
    )]
    AlreadyActive { field: FieldId },

    #[error("no gesture in progress")]
    #[diagnostic(code(fieldmark::session::not_active))]
    NotActive,

    #[error("{field} is not on the current page {page}")]
    #[diagnostic(code(fieldmark::session::wrong_page))]
    WrongPage { field: FieldId, page: u32 },

    #[error("no document loaded")]
    #[diagnostic(
        code(fieldmark::editor::no_document),
        help("ingest a source document or load a template first")
    )]
    NoDocument,

    #[error(transparent)]
    #[diagnostic(transparent)]
    Configuration(#[from] ConfigurationError),

    #[error(transparent)]
    #[diagnostic(transparent)]
    Registry(#[from] RegistryError),
}

// ============================================================================
// Validation Errors
// ============================================================================

/// A single reason a template cannot be published
#[derive(Error, Diagnostic, Debug, Clone, PartialEq)]
pub enum ValidationIssue {
    #[error("field {field} is checkable but has no accepted answers")]
    #[diagnostic(
        code(fieldmark::validate::no_accepted_variants),
        help("add at least one accepted answer or mark the field as not checkable")
    )]
    NoAcceptedVariants { field: FieldId },

    #[error("template name is empty")]
    #[diagnostic(code(fieldmark::validate::missing_name))]
    MissingName,
}

/// Save rejected; carries every issue at once so they can be fixed in one pass
#[derive(Error, Diagnostic, Debug, Clone, PartialEq)]
#[error("template is not ready to publish ({} issue(s))", .issues.len())]
#[diagnostic(code(fieldmark::validate::failed))]
pub struct ValidationError {
    #[related]
    pub issues: Vec<ValidationIssue>,
}

impl ValidationError {
    /// Fields named by the issues, in report order
    pub fn offending_fields(&self) -> Vec<FieldId> {
        self.issues
            .iter()
            .filter_map(|issue| match issue {
                ValidationIssue::NoAcceptedVariants { field } => Some(*field),
                ValidationIssue::MissingName => None,
            })
            .collect()
    }
}

// ============================================================================
// Submission Errors
// ============================================================================

/// A student submission that cannot be handed to the matcher
#[derive(Error, Diagnostic, Debug, Clone, PartialEq)]
pub enum SubmissionError {
    #[error("class {class:?} may not submit to this template")]
    #[diagnostic(
        code(fieldmark::submit::class_not_allowed),
        help("pick one of the classes the template was published for")
    )]
    ClassNotAllowed { class: String },

    #[error(transparent)]
    #[diagnostic(transparent)]
    Validation(#[from] ValidationError),
}

// ============================================================================
// Template Errors
// ============================================================================

/// Errors at the persistence boundary
#[derive(Error, Diagnostic, Debug)]
pub enum TemplateError {
    #[error("malformed template JSON")]
    #[diagnostic(code(fieldmark::template::parse))]
    Parse(#[from] serde_json::Error),

    #[error("template I/O failed")]
    #[diagnostic(code(fieldmark::template::io))]
    Io(#[from] std::io::Error),

    #[error("invalid template id: {template_id:?}")]
    #[diagnostic(
        code(fieldmark::template::invalid_id),
        help("template ids may only contain letters, digits, `_` and `-`")
    )]
    InvalidTemplateId { template_id: String },

    #[error("template not found: {template_id}")]
    #[diagnostic(code(fieldmark::template::not_found))]
    NotFound { template_id: String },

    #[error("invalid field id: {raw}")]
    #[diagnostic(
        code(fieldmark::template::invalid_field_id),
        help("field ids look like `field_<page>_<sequence>`")
    )]
    InvalidFieldId { raw: String },

    #[error("page listed at position {expected} claims index {found}")]
    #[diagnostic(code(fieldmark::template::page_order))]
    PageOrder { expected: u32, found: u32 },

    #[error("duplicate field id: {id}")]
    #[diagnostic(code(fieldmark::template::duplicate_field_id))]
    DuplicateFieldId { id: FieldId },

    #[error(transparent)]
    #[diagnostic(transparent)]
    Configuration(#[from] ConfigurationError),

    #[error(transparent)]
    #[diagnostic(transparent)]
    Registry(#[from] RegistryError),

    #[error(transparent)]
    #[diagnostic(transparent)]
    Validation(#[from] ValidationError),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn validation_error_lists_offending_fields() {
        let err = ValidationError {
            issues: vec![
                ValidationIssue::MissingName,
                ValidationIssue::NoAcceptedVariants { field: FieldId::new(0, 3) },
                ValidationIssue::NoAcceptedVariants { field: FieldId::new(1, 4) },
            ],
        };
        assert_eq!(err.offending_fields(), vec![FieldId::new(0, 3), FieldId::new(1, 4)]);
        assert_eq!(err.to_string(), "template is not ready to publish (3 issue(s))");
    }

    #[test]
    fn issue_messages_name_the_field() {
        let issue = ValidationIssue::NoAcceptedVariants { field: FieldId::new(2, 7) };
        assert_eq!(
            issue.to_string(),
            "field field_2_7 is checkable but has no accepted answers"
        );
    }

    #[test]
    fn editor_error_keeps_inner_code() {
        let err: EditorError = RegistryError::NotFound { id: FieldId::new(0, 1) }.into();
        let code = err.code().map(|c| c.to_string());
        assert_eq!(code.as_deref(), Some("fieldmark::registry::not_found"));
    }
}
