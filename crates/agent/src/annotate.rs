//! The `annotate` reflex tool.
//!
//! The model narrates its reasoning by calling `annotate(title, description)`.
//! The loop answers these calls itself and turns each into an `Annotation`
//! event; they never reach the tool provider.

use flightdeck_core::error::RunError;
use flightdeck_core::tool::ToolSpec;
use serde_json::{Value, json};

pub const ANNOTATE_TOOL: &str = "annotate";

/// Older prompts call the tool `annotate_step`.
pub const LEGACY_ANNOTATE_TOOL: &str = "annotate_step";

/// Tool-turn content acknowledging an annotation.
pub const ANNOTATE_ACK: &str = r#"{"ok":true}"#;

const DEFAULT_TITLE: &str = "Step";

pub fn is_annotate(tool_name: &str) -> bool {
    tool_name == ANNOTATE_TOOL || tool_name == LEGACY_ANNOTATE_TOOL
}

/// Catalog entry offered to the model ahead of the provider's tools.
pub fn annotate_spec() -> ToolSpec {
    ToolSpec {
        name: ANNOTATE_TOOL.into(),
        description: "Narrate your current action to keep the user informed. \
                      Call this before and after every tool call."
            .into(),
        input_schema: json!({
            "type": "object",
            "properties": {
                "title": {
                    "type": "string",
                    "description": "Short title for this step"
                },
                "description": {
                    "type": "string",
                    "description": "Detailed description of what you are doing"
                }
            },
            "required": ["title", "description"]
        }),
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Annotation {
    pub title: String,
    pub description: String,
}

impl Default for Annotation {
    fn default() -> Self {
        Self {
            title: DEFAULT_TITLE.into(),
            description: String::new(),
        }
    }
}

/// Read `{title, description}` from raw arguments.
///
/// Missing or non-string fields fall back to the defaults individually.
/// Arguments that aren't a JSON object are an `ArgumentParse` error; the
/// caller is expected to fall back to [`Annotation::default`].
pub fn parse_annotation(raw: &str) -> Result<Annotation, RunError> {
    let value: Value = serde_json::from_str(raw).map_err(|e| RunError::ArgumentParse {
        tool: ANNOTATE_TOOL.into(),
        reason: e.to_string(),
    })?;

    let Value::Object(fields) = value else {
        return Err(RunError::ArgumentParse {
            tool: ANNOTATE_TOOL.into(),
            reason: "expected a JSON object".into(),
        });
    };

    let field = |key: &str| fields.get(key).and_then(Value::as_str);
    Ok(Annotation {
        title: field("title")
            .filter(|t| !t.trim().is_empty())
            .unwrap_or(DEFAULT_TITLE)
            .to_string(),
        description: field("description").unwrap_or_default().to_string(),
    })
}
