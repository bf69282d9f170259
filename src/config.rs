//! Editor configuration

use serde::Deserialize;

use crate::errors::TemplateError;
use crate::types::{Px, RenderRect};

/// Tunables for the editor and the student-view projection.
///
/// Every key is optional in the JSON form; missing keys take the defaults.
#[derive(Clone, Debug, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct EditorConfig {
    /// Where a new field appears on the displayed page, in pixels
    pub default_field_rect: RenderRect,
    /// Smallest width/height a resize can shrink a field to, in pixels
    pub min_render_size: Px,
    /// Pull committed rects back onto the page instead of flagging them
    pub clamp_on_commit: bool,
    /// Narrowest input the student view will place, in pixels
    pub student_min_width: Px,
}

impl Default for EditorConfig {
    fn default() -> Self {
        EditorConfig {
            default_field_rect: RenderRect::px(50.0, 50.0, 150.0, 30.0),
            min_render_size: Px(1.0),
            clamp_on_commit: true,
            student_min_width: Px(80.0),
        }
    }
}

impl EditorConfig {
    pub fn from_json(raw: &str) -> Result<Self, TemplateError> {
        Ok(serde_json::from_str(raw)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_object_gives_defaults() {
        assert_eq!(EditorConfig::from_json("{}").unwrap(), EditorConfig::default());
    }

    #[test]
    fn partial_override() {
        let cfg = EditorConfig::from_json(
            r#"{ "clamp_on_commit": false, "default_field_rect": { "x": 0, "y": 0, "w": 40, "h": 12 } }"#,
        )
        .unwrap();
        assert!(!cfg.clamp_on_commit);
        assert_eq!(cfg.default_field_rect, RenderRect::px(0.0, 0.0, 40.0, 12.0));
        assert_eq!(cfg.min_render_size, Px(1.0));
    }

    #[test]
    fn unknown_keys_are_rejected() {
        assert!(matches!(
            EditorConfig::from_json(r#"{ "zoom": 2 }"#),
            Err(TemplateError::Parse(_))
        ));
    }
}
