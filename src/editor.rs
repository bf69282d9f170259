//! Editor context - the explicit state every editing operation runs against.
//!
//! One template, one current page and at most one active gesture. All events
//! (page image measured, pointer moves, navigation, load/save completions)
//! are delivered here one at a time.

use glam::DVec2;

use crate::config::EditorConfig;
use crate::coords::CoordinateSpace;
use crate::errors::{EditorError, TemplateError, ValidationError};
use crate::log;
use crate::placement::{CommitOutcome, Edges, PlacementSession};
use crate::registry::FieldId;
use crate::store::TemplateStore;
use crate::template::{Page, TemplateDocument};
use crate::types::{Offset, RenderRect};

/// What the visual layer should draw for one field
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct FieldView {
    pub id: FieldId,
    pub rect: RenderRect,
    pub checkable: bool,
    /// True while this field is under an active gesture
    pub active: bool,
}

/// Observable gesture state
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SessionState {
    Idle,
    Active { field: FieldId },
}

pub struct EditorContext {
    template: TemplateDocument,
    current_page: u32,
    session: Option<PlacementSession>,
    config: EditorConfig,
}

impl Default for EditorContext {
    fn default() -> Self {
        Self::new(EditorConfig::default())
    }
}

impl EditorContext {
    pub fn new(config: EditorConfig) -> Self {
        EditorContext {
            template: TemplateDocument::default(),
            current_page: 0,
            session: None,
            config,
        }
    }

    pub fn config(&self) -> &EditorConfig {
        &self.config
    }

    pub fn template(&self) -> &TemplateDocument {
        &self.template
    }

    /// Metadata and variant edits. Geometry goes through gestures.
    pub fn template_mut(&mut self) -> &mut TemplateDocument {
        &mut self.template
    }

    pub fn current_page(&self) -> u32 {
        self.current_page
    }

    pub fn session(&self) -> Option<&PlacementSession> {
        self.session.as_ref()
    }

    pub fn session_state(&self) -> SessionState {
        match &self.session {
            None => SessionState::Idle,
            Some(s) => SessionState::Active { field: s.field() },
        }
    }

    // ------------------------------------------------------------------
    // Document lifecycle
    // ------------------------------------------------------------------

    /// Start a new template for a freshly ingested source document.
    pub fn ingest(&mut self, pages: Vec<Page>) {
        self.abort_gesture();
        log::info!(pages = pages.len(), "document ingested");
        self.template = TemplateDocument::new(pages);
        self.current_page = 0;
    }

    /// Replace the whole aggregate with a loaded template.
    pub fn load(&mut self, template: TemplateDocument) {
        self.abort_gesture();
        self.template = template;
        self.current_page = 0;
    }

    /// Fetch a template from the store and make it current
    pub fn open(&mut self, store: &impl TemplateStore, template_id: &str) -> Result<(), TemplateError> {
        let record = store.get(template_id)?;
        let template = TemplateDocument::from_record(record)?;
        self.load(template);
        Ok(())
    }

    /// Validate, commit any active gesture, then hand the template to the
    /// store.
    ///
    /// A failed save changes nothing: the template, its id and an active
    /// gesture are all left as they were.
    pub fn save(&mut self, store: &mut impl TemplateStore) -> Result<String, TemplateError> {
        let issues = self.template.publish_issues();
        if !issues.is_empty() {
            return Err(ValidationError { issues }.into());
        }

        let mut saved = self.template.clone();
        if let Some(session) = self.session.clone() {
            if let Err(_err) = commit_into(&mut saved, session, self.config.clamp_on_commit) {
                log::warn!(error = %_err, "gesture dropped before save");
            }
        }
        let record = saved.save()?;
        store.put(&record)?;

        self.template = saved;
        self.session = None;
        Ok(record.template_id)
    }

    // ------------------------------------------------------------------
    // Page events
    // ------------------------------------------------------------------

    /// The page image finished loading and was measured after layout.
    ///
    /// A rejected measurement leaves the page and any active gesture alone.
    pub fn page_loaded(&mut self, page: u32, render_width: f64, render_height: f64) -> Result<(), EditorError> {
        let mut measured = self.template.page(page)?.clone();
        measured.set_render_size(render_width, render_height)?;
        if self.session.as_ref().is_some_and(|s| s.page() == page) {
            // Render scale changes under the gesture; its start rect is stale.
            self.abort_gesture();
        }
        *self.template.page_mut(page)? = measured;
        log::debug!(page, render_width, render_height, "page measured");
        Ok(())
    }

    /// The viewport resized or zoom changed for the current page
    pub fn viewport_resized(&mut self, render_width: f64, render_height: f64) -> Result<(), EditorError> {
        self.page_loaded(self.current_page, render_width, render_height)
    }

    /// The current page's image went away (unload or error)
    pub fn page_unloaded(&mut self) {
        self.abort_gesture();
        if let Ok(page) = self.template.page_mut(self.current_page) {
            page.clear_render_size();
        }
    }

    fn current_space(&self) -> Result<CoordinateSpace, EditorError> {
        if self.template.page_count() == 0 {
            return Err(EditorError::NoDocument);
        }
        Ok(self.template.page(self.current_page)?.coordinate_space()?)
    }

    // ------------------------------------------------------------------
    // Navigation
    // ------------------------------------------------------------------

    pub fn next_page(&mut self) -> bool {
        self.goto_page(self.current_page.saturating_add(1))
    }

    pub fn prev_page(&mut self) -> bool {
        match self.current_page.checked_sub(1) {
            Some(p) => self.goto_page(p),
            None => false,
        }
    }

    /// Switch pages. An active gesture is cancelled first. Returns false
    /// (and changes nothing) if the page does not exist or is already current.
    pub fn goto_page(&mut self, page: u32) -> bool {
        if page >= self.template.page_count() || page == self.current_page {
            return false;
        }
        self.abort_gesture();
        log::debug!(from = self.current_page, to = page, "page changed");
        self.current_page = page;
        true
    }

    // ------------------------------------------------------------------
    // Fields
    // ------------------------------------------------------------------

    /// Add a field on the current page at the configured default position
    /// and start dragging it.
    ///
    /// The placement gesture ends like any other, through `pointer_up` or
    /// `cancel_gesture`; cancelling leaves the field at the default spot.
    pub fn add_field(&mut self) -> Result<FieldId, EditorError> {
        if let Some(active) = &self.session {
            return Err(EditorError::AlreadyActive { field: active.field() });
        }
        let space = self.current_space()?;
        let rect = space.to_document(self.config.default_field_rect);
        let id = self.template.create_field(self.current_page, rect)?;
        self.begin_gesture(id, Edges::NONE)?;
        Ok(id)
    }

    /// Delete a field, cancelling a gesture on it first. Unknown ids are
    /// ignored: the reference was already stale.
    pub fn delete_field(&mut self, id: FieldId) -> bool {
        if self.session.as_ref().is_some_and(|s| s.field() == id) {
            self.abort_gesture();
        }
        match self.template.delete_field(id) {
            Ok(_) => true,
            Err(_e) => {
                log::debug!(error = %_e, "delete of stale field reference ignored");
                false
            }
        }
    }

    /// Project the current page's fields for display.
    pub fn render_fields(&self) -> Result<Vec<FieldView>, EditorError> {
        let space = self.current_space()?;
        let views = self
            .template
            .fields()
            .fields_on_page(self.current_page)
            .map(|f| match &self.session {
                Some(s) if s.field() == f.id() => FieldView {
                    id: f.id(),
                    rect: s.current_rect(),
                    checkable: f.checkable(),
                    active: true,
                },
                _ => FieldView {
                    id: f.id(),
                    rect: space.to_render(f.rect()),
                    checkable: f.checkable(),
                    active: false,
                },
            })
            .collect();
        Ok(views)
    }

    // ------------------------------------------------------------------
    // Gestures
    // ------------------------------------------------------------------

    pub fn begin_drag(&mut self, id: FieldId) -> Result<RenderRect, EditorError> {
        self.begin_gesture(id, Edges::NONE)
    }

    pub fn begin_resize(&mut self, id: FieldId, edges: Edges) -> Result<RenderRect, EditorError> {
        self.begin_gesture(id, edges)
    }

    fn begin_gesture(&mut self, id: FieldId, edges: Edges) -> Result<RenderRect, EditorError> {
        if let Some(active) = &self.session {
            return Err(EditorError::AlreadyActive { field: active.field() });
        }
        let session = PlacementSession::begin(
            &self.template,
            self.current_page,
            id,
            edges,
            self.config.min_render_size,
        )?;
        let start = session.start_rect();
        self.session = Some(session);
        Ok(start)
    }

    /// One pointer-move step (pixels since the previous event).
    pub fn pointer_move(&mut self, step: DVec2) -> Result<RenderRect, EditorError> {
        let session = self.session.as_mut().ok_or(EditorError::NotActive)?;
        Ok(session.pointer_move(Offset::from_pointer(step)))
    }

    /// Pointer released: commit the gesture in document space.
    ///
    /// The session ends whether or not the commit succeeds; a stale field
    /// reference yields `NotFound` and leaves the editor idle.
    pub fn pointer_up(&mut self) -> Result<CommitOutcome, EditorError> {
        let session = self.session.take().ok_or(EditorError::NotActive)?;
        commit_into(&mut self.template, session, self.config.clamp_on_commit)
    }

    /// Abort signal from the UI (escape key, pointer lost)
    pub fn cancel_gesture(&mut self) -> bool {
        self.abort_gesture()
    }

    fn abort_gesture(&mut self) -> bool {
        match self.session.take() {
            Some(session) => {
                session.cancel();
                true
            }
            None => false,
        }
    }
}

/// Commit `session` against the page it started on.
fn commit_into(
    doc: &mut TemplateDocument,
    session: PlacementSession,
    clamp: bool,
) -> Result<CommitOutcome, EditorError> {
    let space = doc.page(session.page())?.coordinate_space()?;
    session.commit(doc, &space, clamp)
}
