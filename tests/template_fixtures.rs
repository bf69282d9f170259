//! Data-driven checks over stored template files.
//!
//! Every fixture must load and keep its counter ahead of all ids. Fixtures
//! named `invalid_*` must fail publish validation; all others must pass and
//! survive a save/load cycle unchanged.

use datatest_stable::Utf8Path;
use fieldmark::{DocRect, TemplateDocument};

fn check_template_file(path: &Utf8Path) -> datatest_stable::Result<()> {
    let raw = std::fs::read_to_string(path)?;
    let mut doc = TemplateDocument::load(&raw)?;

    let max_sequence = doc.fields().iter().map(|f| f.id().sequence).max().unwrap_or(0);
    if doc.fields().next_sequence() != max_sequence + 1 {
        return Err(format!(
            "{path}: counter {} after load, expected {}",
            doc.fields().next_sequence(),
            max_sequence + 1
        )
        .into());
    }

    let expect_invalid = path
        .file_name()
        .is_some_and(|name| name.starts_with("invalid_"));
    let issues = doc.publish_issues();

    if expect_invalid {
        if issues.is_empty() {
            return Err(format!("{path}: expected publish issues, got none").into());
        }
        if doc.save().is_ok() {
            return Err(format!("{path}: save succeeded despite issues").into());
        }
        return Ok(());
    }

    if !issues.is_empty() {
        return Err(format!("{path}: unexpected issues {issues:?}").into());
    }

    let saved = doc.save_json()?;
    let mut reloaded = TemplateDocument::load(&saved)?;
    if reloaded.to_record() != doc.to_record() {
        return Err(format!("{path}: record changed across save/load").into());
    }

    // A field created after reload never collides with a stored id.
    let fresh = reloaded.create_field(0, DocRect::pt(1.0, 1.0, 10.0, 10.0))?;
    if doc.fields().contains(fresh) {
        return Err(format!("{path}: new id {fresh} collides").into());
    }
    Ok(())
}

datatest_stable::harness! {
    { test = check_template_file, root = concat!(env!("CARGO_MANIFEST_DIR"), "/tests/fixtures"), pattern = r"\.json$" },
}
