//! Structural contract of the training script document.

use crate::error::SchemaError;
use crate::extract::extract;
use crate::script::TrainingScript;
use serde_json::Value;
use std::collections::HashSet;
use tracing::{info, warn};

/// Scene count below which the script is flagged as thin.
pub const RECOMMENDED_MIN_SCENES: usize = 8;

const ROOT_FIELDS: &[(&str, &[&str])] = &[
    ("title", &["titre_formation"]),
    ("description", &[]),
    ("scenes", &[]),
];

const SCENE_FIELDS: &[(&str, &[&str])] = &[
    ("index", &["numero"]),
    ("title", &["titre"]),
    ("narration", &["voix_off"]),
    ("visual_descriptor", &["elements_visuels"]),
];

/// Non-fatal findings. Logged, never rejected.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Advisory {
    FewScenes { count: usize },
    DescriptorNotUrl { scene: usize },
    DuplicateIndex { index: u64 },
    NoNarration,
}

impl std::fmt::Display for Advisory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Advisory::FewScenes { count } => write!(
                f,
                "only {count} scenes generated; {RECOMMENDED_MIN_SCENES} or more recommended"
            ),
            Advisory::DescriptorNotUrl { scene } => {
                write!(f, "scene {scene}: visual is not a URL yet and will be resolved")
            }
            Advisory::DuplicateIndex { index } => write!(f, "scene index {index} is used twice"),
            Advisory::NoNarration => write!(f, "no scene carries narration"),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ValidationReport {
    pub advisories: Vec<Advisory>,
}

impl ValidationReport {
    pub fn is_clean(&self) -> bool {
        self.advisories.is_empty()
    }
}

fn field<'a>(
    object: &'a serde_json::Map<String, Value>,
    name: &str,
    aliases: &[&str],
) -> Option<&'a Value> {
    object
        .get(name)
        .or_else(|| aliases.iter().find_map(|alias| object.get(*alias)))
}

/// Fails on the first structural violation: root fields in order, then
/// `scenes` being a list, then each scene's required fields.
pub fn validate(doc: &Value) -> Result<ValidationReport, SchemaError> {
    let root = doc.as_object().ok_or(SchemaError::NotAnObject)?;

    for &(name, aliases) in ROOT_FIELDS {
        if field(root, name, aliases).is_none() {
            return Err(SchemaError::MissingField(name));
        }
    }

    let scenes = field(root, "scenes", &[])
        .and_then(Value::as_array)
        .ok_or(SchemaError::ScenesNotSequence)?;

    let mut report = ValidationReport::default();
    if scenes.len() < RECOMMENDED_MIN_SCENES {
        report.advisories.push(Advisory::FewScenes {
            count: scenes.len(),
        });
    }

    let mut seen = HashSet::new();
    let mut narrated = false;
    for (i, scene) in scenes.iter().enumerate() {
        let position = i + 1;
        let scene = scene.as_object().ok_or(SchemaError::MissingSceneField {
            scene: position,
            field: "index",
        })?;

        for &(name, aliases) in SCENE_FIELDS {
            if field(scene, name, aliases).is_none() {
                return Err(SchemaError::MissingSceneField {
                    scene: position,
                    field: name,
                });
            }
        }

        if let Some(index) = field(scene, "index", &["numero"]).and_then(Value::as_u64) {
            if !seen.insert(index) {
                report.advisories.push(Advisory::DuplicateIndex { index });
            }
        }

        let descriptor = field(scene, "visual_descriptor", &["elements_visuels"])
            .and_then(Value::as_str)
            .unwrap_or_default();
        if !descriptor.starts_with("http://") && !descriptor.starts_with("https://") {
            report
                .advisories
                .push(Advisory::DescriptorNotUrl { scene: position });
        }

        let narration = field(scene, "narration", &["voix_off"])
            .and_then(Value::as_str)
            .unwrap_or_default();
        narrated |= !narration.trim().is_empty();
    }

    if !narrated {
        report.advisories.push(Advisory::NoNarration);
    }

    Ok(report)
}

/// Extract, validate and decode a raw proposer response.
pub fn parse_script(raw: &str) -> Result<TrainingScript, SchemaError> {
    let candidate = extract(raw);
    let doc: Value =
        serde_json::from_str(&candidate).map_err(|e| SchemaError::Malformed(e.to_string()))?;

    let report = validate(&doc)?;
    for advisory in &report.advisories {
        warn!("script: {advisory}");
    }

    let script: TrainingScript =
        serde_json::from_value(doc).map_err(|e| SchemaError::Malformed(e.to_string()))?;
    info!("script parsed: {} ({})", script.title, script.stats());
    Ok(script)
}
