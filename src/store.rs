//! Persistence collaborator: list, fetch and create-or-update templates.
//!
//! Stores only ever see records that already passed publish validation
//! (see [`TemplateDocument::save`](crate::template::TemplateDocument::save)).

use std::collections::BTreeMap;
use std::fs;
use std::io;

use camino::{Utf8Path, Utf8PathBuf};

use crate::errors::TemplateError;
use crate::log;
use crate::template::TemplateRecord;

/// Entry in a template listing
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TemplateSummary {
    pub template_id: String,
    pub name: String,
}

impl TemplateSummary {
    fn of(record: &TemplateRecord) -> Self {
        TemplateSummary {
            template_id: record.template_id.clone(),
            name: record.name.clone(),
        }
    }
}

pub trait TemplateStore {
    /// All stored templates, ordered by id
    fn list(&self) -> Result<Vec<TemplateSummary>, TemplateError>;

    fn get(&self, template_id: &str) -> Result<TemplateRecord, TemplateError>;

    /// Create or replace the record stored under its `template_id`
    fn put(&mut self, record: &TemplateRecord) -> Result<(), TemplateError>;
}

/// Template ids double as file names, so keep them to a safe alphabet.
fn check_template_id(template_id: &str) -> Result<(), TemplateError> {
    let ok = !template_id.is_empty()
        && template_id
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-');
    if ok {
        Ok(())
    } else {
        Err(TemplateError::InvalidTemplateId {
            template_id: template_id.to_string(),
        })
    }
}

// ============================================================================
// In-memory store
// ============================================================================

#[derive(Clone, Debug, Default)]
pub struct MemoryStore {
    records: BTreeMap<String, TemplateRecord>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

impl TemplateStore for MemoryStore {
    fn list(&self) -> Result<Vec<TemplateSummary>, TemplateError> {
        Ok(self.records.values().map(TemplateSummary::of).collect())
    }

    fn get(&self, template_id: &str) -> Result<TemplateRecord, TemplateError> {
        self.records
            .get(template_id)
            .cloned()
            .ok_or_else(|| TemplateError::NotFound {
                template_id: template_id.to_string(),
            })
    }

    fn put(&mut self, record: &TemplateRecord) -> Result<(), TemplateError> {
        check_template_id(&record.template_id)?;
        self.records.insert(record.template_id.clone(), record.clone());
        Ok(())
    }
}

// ============================================================================
// Directory store
// ============================================================================

/// One pretty-printed `<template_id>.json` per template in a directory
#[derive(Clone, Debug)]
pub struct DirStore {
    root: Utf8PathBuf,
}

impl DirStore {
    /// Open (and create if needed) a template directory
    pub fn open(root: impl Into<Utf8PathBuf>) -> Result<Self, TemplateError> {
        let root = root.into();
        fs::create_dir_all(&root)?;
        Ok(DirStore { root })
    }

    pub fn root(&self) -> &Utf8Path {
        &self.root
    }

    fn path_for(&self, template_id: &str) -> Utf8PathBuf {
        self.root.join(format!("{template_id}.json"))
    }
}

impl TemplateStore for DirStore {
    fn list(&self) -> Result<Vec<TemplateSummary>, TemplateError> {
        let mut out = Vec::new();
        for entry in self.root.read_dir_utf8()? {
            let entry = entry?;
            let path = entry.path();
            if path.extension() != Some("json") || !entry.file_type()?.is_file() {
                continue;
            }
            let raw = fs::read_to_string(path)?;
            match serde_json::from_str::<TemplateRecord>(&raw) {
                Ok(record) => out.push(TemplateSummary::of(&record)),
                Err(_err) => {
                    log::warn!(%path, error = %_err, "skipping unreadable template");
                }
            }
        }
        out.sort_by(|a, b| a.template_id.cmp(&b.template_id));
        Ok(out)
    }

    fn get(&self, template_id: &str) -> Result<TemplateRecord, TemplateError> {
        check_template_id(template_id)?;
        let raw = match fs::read_to_string(self.path_for(template_id)) {
            Ok(raw) => raw,
            Err(err) if err.kind() == io::ErrorKind::NotFound => {
                return Err(TemplateError::NotFound {
                    template_id: template_id.to_string(),
                });
            }
            Err(err) => return Err(err.into()),
        };
        Ok(serde_json::from_str(&raw)?)
    }

    fn put(&mut self, record: &TemplateRecord) -> Result<(), TemplateError> {
        check_template_id(&record.template_id)?;
        let path = self.path_for(&record.template_id);
        let json = serde_json::to_string_pretty(record)?;
        // Write then rename so readers never see a half-written file.
        let tmp = path.with_extension("json.tmp");
        fs::write(&tmp, json)?;
        fs::rename(&tmp, &path)?;
        log::debug!(%path, "template written");
        Ok(())
    }
}
