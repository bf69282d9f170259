//! The template aggregate: pages, fields and metadata, plus its persisted form.

use std::collections::BTreeSet;
use std::time::{SystemTime, UNIX_EPOCH};

use serde::{Deserialize, Serialize};

use crate::coords::CoordinateSpace;
use crate::errors::{
    ConfigurationError, RegistryError, TemplateError, ValidationError, ValidationIssue,
};
use crate::log;
use crate::registry::{Field, FieldId, FieldRegistry};
use crate::types::{DocRect, Pt, Px, Scalar, Size};

// ============================================================================
// Pages
// ============================================================================

/// One page of the source document.
///
/// The document size is fixed at ingest; the render size is whatever the
/// displayed image currently measures and stays unknown until the page-source
/// collaborator reports it.
#[derive(Clone, Debug, PartialEq)]
pub struct Page {
    index: u32,
    document_size: Size<Pt>,
    render_size: Option<Size<Px>>,
    zoom: Scalar,
    source: Option<String>,
}

impl Page {
    pub fn new(index: u32, document_width: f64, document_height: f64) -> Result<Self, ConfigurationError> {
        let invalid = || ConfigurationError::InvalidPageSize {
            width: document_width,
            height: document_height,
        };
        let w = Pt::try_positive(document_width).map_err(|_| invalid())?;
        let h = Pt::try_positive(document_height).map_err(|_| invalid())?;
        Ok(Page {
            index,
            document_size: Size::new(w, h),
            render_size: None,
            zoom: Scalar::ONE,
            source: None,
        })
    }

    /// Rasterization zoom the page image was produced at. Informational only:
    /// the measured render size already includes it.
    pub fn with_zoom(mut self, zoom: f64) -> Result<Self, ConfigurationError> {
        if !(zoom.is_finite() && zoom > 0.0) {
            return Err(ConfigurationError::InvalidZoom { value: zoom });
        }
        self.zoom = Scalar(zoom);
        Ok(self)
    }

    /// Name of the page image, as handed out by the page-source collaborator
    pub fn with_source(mut self, source: impl Into<String>) -> Self {
        self.source = Some(source.into());
        self
    }

    pub fn index(&self) -> u32 {
        self.index
    }

    pub fn document_size(&self) -> Size<Pt> {
        self.document_size
    }

    pub fn render_size(&self) -> Option<Size<Px>> {
        self.render_size
    }

    pub fn zoom(&self) -> Scalar {
        self.zoom
    }

    pub fn source(&self) -> Option<&str> {
        self.source.as_deref()
    }

    /// Record the displayed (post-layout) size of the page image.
    pub fn set_render_size(&mut self, width: f64, height: f64) -> Result<(), ConfigurationError> {
        let invalid = || ConfigurationError::InvalidRenderSize { width, height };
        let w = Px::try_positive(width).map_err(|_| invalid())?;
        let h = Px::try_positive(height).map_err(|_| invalid())?;
        self.render_size = Some(Size::new(w, h));
        Ok(())
    }

    /// Forget the render size, e.g. when the page image is unloaded
    pub fn clear_render_size(&mut self) {
        self.render_size = None;
    }

    pub fn coordinate_space(&self) -> Result<CoordinateSpace, ConfigurationError> {
        let render = self
            .render_size
            .ok_or(ConfigurationError::RenderSizeUnknown { page: self.index })?;
        CoordinateSpace::new(self.document_size, render)
    }
}

// ============================================================================
// Template document
// ============================================================================

/// Everything the editor works on, loaded and saved as one unit
#[derive(Clone, Debug, Default)]
pub struct TemplateDocument {
    template_id: String,
    name: String,
    pages: Vec<Page>,
    fields: FieldRegistry,
    external_sheet_ref: String,
    allowed_classes: BTreeSet<String>,
}

impl TemplateDocument {
    /// Fresh template for a newly ingested source document
    pub fn new(pages: Vec<Page>) -> Self {
        TemplateDocument { pages, ..Self::default() }
    }

    pub fn template_id(&self) -> &str {
        &self.template_id
    }

    pub fn set_template_id(&mut self, id: impl Into<String>) {
        self.template_id = id.into();
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn set_name(&mut self, name: impl Into<String>) {
        self.name = name.into().trim().to_string();
    }

    pub fn external_sheet_ref(&self) -> &str {
        &self.external_sheet_ref
    }

    pub fn set_external_sheet_ref(&mut self, sheet: impl Into<String>) {
        self.external_sheet_ref = sheet.into().trim().to_string();
    }

    pub fn allowed_classes(&self) -> &BTreeSet<String> {
        &self.allowed_classes
    }

    pub fn set_allowed_classes<I, S>(&mut self, classes: I)
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        self.allowed_classes = classes
            .into_iter()
            .map(|c| c.as_ref().trim().to_string())
            .filter(|c| !c.is_empty())
            .collect();
    }

    /// Set classes from a comma-separated list such as `"7A, 7B,8A"`
    pub fn set_allowed_classes_csv(&mut self, csv: &str) {
        self.set_allowed_classes(csv.split(','));
    }

    pub fn pages(&self) -> &[Page] {
        &self.pages
    }

    pub fn page_count(&self) -> u32 {
        self.pages.len() as u32
    }

    pub fn page(&self, index: u32) -> Result<&Page, RegistryError> {
        self.pages
            .get(index as usize)
            .ok_or(RegistryError::PageNotFound { page: index })
    }

    pub fn page_mut(&mut self, index: u32) -> Result<&mut Page, RegistryError> {
        self.pages
            .get_mut(index as usize)
            .ok_or(RegistryError::PageNotFound { page: index })
    }

    pub fn fields(&self) -> &FieldRegistry {
        &self.fields
    }

    pub fn field(&self, id: FieldId) -> Result<&Field, RegistryError> {
        self.fields.get(id).ok_or(RegistryError::NotFound { id })
    }

    /// Create a field on an existing page
    pub fn create_field(&mut self, page: u32, rect: DocRect) -> Result<FieldId, RegistryError> {
        self.page(page)?;
        Ok(self.fields.create_field(page, rect)?.id())
    }

    pub fn set_variants<I, S>(&mut self, id: FieldId, variants: I) -> Result<(), RegistryError>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        self.fields.set_variants(id, variants)
    }

    pub fn set_checkable(&mut self, id: FieldId, checkable: bool) -> Result<(), RegistryError> {
        self.fields.set_checkable(id, checkable)
    }

    pub fn update_geometry(&mut self, id: FieldId, rect: DocRect) -> Result<(), RegistryError> {
        self.fields.update_geometry(id, rect)
    }

    pub fn delete_field(&mut self, id: FieldId) -> Result<Field, RegistryError> {
        self.fields.delete_field(id)
    }

    /// All reasons this template cannot be saved, name first
    pub fn publish_issues(&self) -> Vec<ValidationIssue> {
        let mut issues = Vec::new();
        if self.name.trim().is_empty() {
            issues.push(ValidationIssue::MissingName);
        }
        issues.extend(self.fields.validate_for_publish());
        issues
    }

    /// Validate and produce the persisted form.
    ///
    /// On failure nothing changes. On success a template without an id
    /// is assigned `tpl_<unix millis>`.
    pub fn save(&mut self) -> Result<TemplateRecord, ValidationError> {
        let issues = self.publish_issues();
        if !issues.is_empty() {
            log::warn!(template = %self.template_id, issues = issues.len(), "save rejected");
            return Err(ValidationError { issues });
        }
        if self.template_id.is_empty() {
            self.template_id = generated_template_id();
        }
        log::info!(template = %self.template_id, fields = self.fields.len(), "template saved");
        Ok(self.to_record())
    }

    /// `save` followed by JSON encoding
    pub fn save_json(&mut self) -> Result<String, TemplateError> {
        let record = self.save()?;
        Ok(serde_json::to_string_pretty(&record)?)
    }

    /// Parse a persisted template. The result replaces any previous one
    /// wholesale; nothing is merged.
    pub fn load(raw: &str) -> Result<Self, TemplateError> {
        let record: TemplateRecord = serde_json::from_str(raw)?;
        Self::from_record(record)
    }

    /// Snapshot in persisted form, without validation
    pub fn to_record(&self) -> TemplateRecord {
        TemplateRecord {
            template_id: self.template_id.clone(),
            name: self.name.clone(),
            sheet_url: self.external_sheet_ref.clone(),
            classes: self.allowed_classes.iter().cloned().collect(),
            pages: self
                .pages
                .iter()
                .map(|p| PageRecord {
                    index: p.index,
                    document_width: p.document_size.w.raw(),
                    document_height: p.document_size.h.raw(),
                    zoom: p.zoom.raw(),
                    source: p.source.clone(),
                })
                .collect(),
            fields: self
                .fields
                .iter()
                .map(|f| {
                    let r = f.rect();
                    FieldRecord {
                        id: f.id().to_string(),
                        page: f.page(),
                        x: r.x.raw(),
                        y: r.y.raw(),
                        w: r.w.raw(),
                        h: r.h.raw(),
                        variants: f.accepted_variants().to_vec(),
                        checkable: f.checkable(),
                    }
                })
                .collect(),
            field_counter: self.fields.next_sequence().saturating_sub(1),
        }
    }

    /// Rebuild a template from its persisted form.
    ///
    /// `field_counter` in the record is ignored; the allocator is always
    /// derived from the field ids present.
    pub fn from_record(record: TemplateRecord) -> Result<Self, TemplateError> {
        let mut pages = Vec::with_capacity(record.pages.len());
        for (position, p) in record.pages.into_iter().enumerate() {
            if p.index as usize != position {
                return Err(TemplateError::PageOrder {
                    expected: position as u32,
                    found: p.index,
                });
            }
            let mut page = Page::new(p.index, p.document_width, p.document_height)?.with_zoom(p.zoom)?;
            page.source = p.source;
            pages.push(page);
        }

        let mut fields: Vec<Field> = Vec::with_capacity(record.fields.len());
        for f in record.fields {
            let id: FieldId = f
                .id
                .parse::<FieldId>()
                .ok()
                .filter(|id| id.sequence < u32::MAX)
                .ok_or_else(|| TemplateError::InvalidFieldId { raw: f.id.clone() })?;
            if fields.iter().any(|existing| existing.id() == id) {
                return Err(TemplateError::DuplicateFieldId { id });
            }
            if f.page as usize >= pages.len() {
                return Err(RegistryError::PageNotFound { page: f.page }.into());
            }
            let rect = DocRect::pt(f.x, f.y, f.w, f.h);
            if !(rect.is_finite() && rect.has_positive_size()) {
                return Err(RegistryError::InvalidGeometry { id, w: f.w, h: f.h }.into());
            }
            let variants = f
                .variants
                .iter()
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
                .collect();
            fields.push(Field::restore(id, f.page, rect, variants, f.checkable));
        }

        let mut doc = TemplateDocument {
            template_id: record.template_id,
            name: String::new(),
            pages,
            fields: FieldRegistry::restore(fields),
            external_sheet_ref: String::new(),
            allowed_classes: BTreeSet::new(),
        };
        doc.set_name(record.name);
        doc.set_external_sheet_ref(record.sheet_url);
        doc.set_allowed_classes(record.classes);

        log::info!(
            template = %doc.template_id,
            pages = doc.pages.len(),
            fields = doc.fields.len(),
            next_sequence = doc.fields.next_sequence(),
            "template loaded"
        );
        Ok(doc)
    }
}

fn generated_template_id() -> String {
    let millis = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis())
        .unwrap_or_default();
    format!("tpl_{millis}")
}

// ============================================================================
// Persisted form
// ============================================================================

/// JSON shape exchanged with the persistence collaborator
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct TemplateRecord {
    pub template_id: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub sheet_url: String,
    #[serde(default)]
    pub classes: Vec<String>,
    pub pages: Vec<PageRecord>,
    #[serde(default)]
    pub fields: Vec<FieldRecord>,
    /// Written for older readers; never trusted on load
    #[serde(default)]
    pub field_counter: u32,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct PageRecord {
    pub index: u32,
    pub document_width: f64,
    pub document_height: f64,
    #[serde(default = "default_zoom")]
    pub zoom: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source: Option<String>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct FieldRecord {
    pub id: String,
    pub page: u32,
    pub x: f64,
    pub y: f64,
    pub w: f64,
    pub h: f64,
    #[serde(default)]
    pub variants: Vec<String>,
    #[serde(default = "default_checkable")]
    pub checkable: bool,
}

fn default_zoom() -> f64 {
    1.0
}

fn default_checkable() -> bool {
    true
}

#[cfg(test)]
mod tests {
    use super::*;

    fn two_pages() -> Vec<Page> {
        vec![
            Page::new(0, 612.0, 792.0).unwrap().with_source("lesson7_p1.png"),
            Page::new(1, 612.0, 792.0).unwrap(),
        ]
    }

    #[test]
    fn page_requires_positive_document_size() {
        assert_eq!(
            Page::new(0, 612.0, 0.0),
            Err(ConfigurationError::InvalidPageSize { width: 612.0, height: 0.0 })
        );
        assert!(Page::new(0, f64::NAN, 10.0).is_err());
    }

    #[test]
    fn coordinate_space_needs_render_size() {
        let mut page = Page::new(3, 612.0, 792.0).unwrap();
        assert_eq!(
            page.coordinate_space(),
            Err(ConfigurationError::RenderSizeUnknown { page: 3 })
        );
        page.set_render_size(306.0, 396.0).unwrap();
        let space = page.coordinate_space().unwrap();
        assert_eq!(space.scale_x(), Scalar(0.5));
        page.clear_render_size();
        assert!(page.coordinate_space().is_err());
    }

    #[test]
    fn zoom_is_not_applied_twice() {
        // A page rasterized at zoom 2 reports the doubled size as its render size.
        let mut page = Page::new(0, 612.0, 792.0).unwrap().with_zoom(2.0).unwrap();
        page.set_render_size(1224.0, 1584.0).unwrap();
        let space = page.coordinate_space().unwrap();
        assert_eq!(space.scale_x(), Scalar(2.0));
        assert_eq!(space.scale_y(), Scalar(2.0));
    }

    #[test]
    fn rejects_bad_zoom() {
        let page = Page::new(0, 612.0, 792.0).unwrap();
        assert_eq!(
            page.with_zoom(0.0),
            Err(ConfigurationError::InvalidZoom { value: 0.0 })
        );
    }

    #[test]
    fn create_field_requires_existing_page() {
        let mut doc = TemplateDocument::new(two_pages());
        assert_eq!(
            doc.create_field(5, DocRect::pt(0.0, 0.0, 10.0, 10.0)),
            Err(RegistryError::PageNotFound { page: 5 })
        );
        assert!(doc.create_field(1, DocRect::pt(0.0, 0.0, 10.0, 10.0)).is_ok());
    }

    #[test]
    fn save_reports_all_issues_and_changes_nothing() {
        let mut doc = TemplateDocument::new(two_pages());
        let a = doc.create_field(0, DocRect::pt(0.0, 0.0, 10.0, 10.0)).unwrap();
        let b = doc.create_field(1, DocRect::pt(0.0, 0.0, 10.0, 10.0)).unwrap();

        let err = doc.save().unwrap_err();
        assert_eq!(err.issues[0], ValidationIssue::MissingName);
        assert_eq!(err.offending_fields(), vec![a, b]);
        assert!(doc.template_id().is_empty());

        doc.set_name("Lesson 7");
        doc.set_variants(a, ["x"]).unwrap();
        doc.set_checkable(b, false).unwrap();
        let record = doc.save().unwrap();
        assert!(record.template_id.starts_with("tpl_"));
        assert_eq!(doc.template_id(), record.template_id);
    }

    #[test]
    fn classes_from_csv_are_trimmed_and_deduplicated() {
        let mut doc = TemplateDocument::new(two_pages());
        doc.set_allowed_classes_csv(" 7B, 7A,, 7B ");
        let classes: Vec<&str> = doc.allowed_classes().iter().map(String::as_str).collect();
        assert_eq!(classes, ["7A", "7B"]);
    }

    #[test]
    fn persisted_shape() {
        let mut doc = TemplateDocument::new(two_pages());
        doc.set_template_id("lesson_7");
        doc.set_name("Lesson 7");
        doc.set_external_sheet_ref("https://sheets.example/abc");
        doc.set_allowed_classes_csv("7A, 7B");
        let id = doc.create_field(0, DocRect::pt(50.0, 712.0, 150.0, 30.0)).unwrap();
        doc.set_variants(id, ["Paris"]).unwrap();

        let json = doc.save_json().unwrap();
        insta::assert_snapshot!(json, @r#"
        {
          "template_id": "lesson_7",
          "name": "Lesson 7",
          "sheet_url": "https://sheets.example/abc",
          "classes": [
            "7A",
            "7B"
          ],
          "pages": [
            {
              "index": 0,
              "document_width": 612.0,
              "document_height": 792.0,
              "zoom": 1.0,
              "source": "lesson7_p1.png"
            },
            {
              "index": 1,
              "document_width": 612.0,
              "document_height": 792.0,
              "zoom": 1.0
            }
          ],
          "fields": [
            {
              "id": "field_0_1",
              "page": 0,
              "x": 50.0,
              "y": 712.0,
              "w": 150.0,
              "h": 30.0,
              "variants": [
                "Paris"
              ],
              "checkable": true
            }
          ],
          "field_counter": 1
        }
        "#);
    }

    #[test]
    fn load_ignores_persisted_counter() {
        let raw = r#"{
            "template_id": "t1",
            "name": "Quiz",
            "pages": [{ "index": 0, "document_width": 612, "document_height": 792 }],
            "fields": [
                { "id": "field_0_3", "page": 0, "x": 1, "y": 1, "w": 5, "h": 5, "variants": ["a"] },
                { "id": "field_0_7", "page": 0, "x": 1, "y": 1, "w": 5, "h": 5, "variants": ["b"] },
                { "id": "field_0_2", "page": 0, "x": 1, "y": 1, "w": 5, "h": 5, "variants": ["c"] }
            ],
            "field_counter": 1
        }"#;
        let mut doc = TemplateDocument::load(raw).unwrap();
        let id = doc.create_field(0, DocRect::pt(0.0, 0.0, 10.0, 10.0)).unwrap();
        assert_eq!(id.sequence, 8);
    }

    #[test]
    fn load_rejects_bad_records() {
        let base = |fields: &str| {
            format!(
                r#"{{"template_id":"t","pages":[{{"index":0,"document_width":612,"document_height":792}}],"fields":[{fields}]}}"#
            )
        };

        let bad_id = base(r#"{"id":"f7","page":0,"x":0,"y":0,"w":1,"h":1}"#);
        assert!(matches!(
            TemplateDocument::load(&bad_id),
            Err(TemplateError::InvalidFieldId { .. })
        ));

        let top = base(r#"{"id":"field_0_4294967295","page":0,"x":0,"y":0,"w":1,"h":1}"#);
        assert!(matches!(
            TemplateDocument::load(&top),
            Err(TemplateError::InvalidFieldId { raw }) if raw == "field_0_4294967295"
        ));

        let dup = base(
            r#"{"id":"field_0_1","page":0,"x":0,"y":0,"w":1,"h":1},{"id":"field_0_1","page":0,"x":0,"y":0,"w":1,"h":1}"#,
        );
        assert!(matches!(
            TemplateDocument::load(&dup),
            Err(TemplateError::DuplicateFieldId { .. })
        ));

        let orphan = base(r#"{"id":"field_4_1","page":4,"x":0,"y":0,"w":1,"h":1}"#);
        assert!(matches!(
            TemplateDocument::load(&orphan),
            Err(TemplateError::Registry(RegistryError::PageNotFound { page: 4 }))
        ));

        let flat = base(r#"{"id":"field_0_1","page":0,"x":0,"y":0,"w":1,"h":0}"#);
        assert!(matches!(
            TemplateDocument::load(&flat),
            Err(TemplateError::Registry(RegistryError::InvalidGeometry { .. }))
        ));

        assert!(matches!(
            TemplateDocument::load("{not json"),
            Err(TemplateError::Parse(_))
        ));
    }

    #[test]
    fn record_round_trip_preserves_fields() {
        let mut doc = TemplateDocument::new(two_pages());
        doc.set_name("Quiz");
        let id = doc.create_field(1, DocRect::pt(10.5, 20.25, 30.0, 40.0)).unwrap();
        doc.set_variants(id, ["one", "two"]).unwrap();

        let back = TemplateDocument::from_record(doc.to_record()).unwrap();
        let field = back.field(id).unwrap();
        assert_eq!(field.rect(), DocRect::pt(10.5, 20.25, 30.0, 40.0));
        assert_eq!(field.accepted_variants(), ["one", "two"]);
        assert_eq!(back.pages()[0].source(), Some("lesson7_p1.png"));
        assert_eq!(back.pages()[1].render_size(), None);
    }
}
