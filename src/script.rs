//! The training script document and its file formats.

use crate::error::SchemaError;
use crate::validate;
use chrono::{DateTime, Local};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tokio::fs;

/// Root document produced by the script proposer.
///
/// The legacy French field names emitted by older prompts are accepted as
/// aliases; serialization always uses the English names.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrainingScript {
    #[serde(alias = "titre_formation")]
    pub title: String,
    pub description: String,
    #[serde(default, alias = "objectifs")]
    pub objectives: Vec<String>,
    #[serde(default, alias = "duree_estimee", skip_serializing_if = "Option::is_none")]
    pub estimated_duration: Option<String>,
    #[serde(default, alias = "niveau", skip_serializing_if = "Option::is_none")]
    pub level: Option<String>,
    pub scenes: Vec<Scene>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Scene {
    /// Proposer-assigned number, kept for traceability. Never renumbered.
    #[serde(alias = "numero")]
    pub index: u32,
    #[serde(alias = "titre")]
    pub title: String,
    /// Empty narration keeps the scene out of rendering and subtitles.
    #[serde(alias = "voix_off")]
    pub narration: String,
    /// Keyword phrase until the visual resolver swaps in a checked URL.
    #[serde(alias = "elements_visuels")]
    pub visual_descriptor: String,
    #[serde(default, alias = "points_cles")]
    pub key_points: Vec<String>,
}

impl Scene {
    pub fn is_narrated(&self) -> bool {
        !self.narration.trim().is_empty()
    }

    pub fn word_count(&self) -> usize {
        self.narration.split_whitespace().count()
    }

    /// Spoken length estimate at two words per second.
    pub fn estimated_seconds(&self) -> usize {
        self.word_count() / 2
    }

    /// Production hints picked from keywords in the narration.
    pub fn creation_tips(&self) -> Vec<&'static str> {
        let lower = self.narration.to_lowercase();
        let tips: Vec<&'static str> = CREATION_TIPS
            .iter()
            .filter(|(keywords, _)| keywords.iter().any(|k| lower.contains(k)))
            .map(|(_, tip)| *tip)
            .collect();
        if tips.is_empty() {
            vec![PLAIN_VISUALS_TIP]
        } else {
            tips
        }
    }
}

const CREATION_TIPS: &[(&[&str], &str)] = &[
    (
        &["données", "graphique", "statistique", "résultat", "data", "chart", "statistic"],
        "Use animated charts or infographics",
    ),
    (
        &["étapes", "processus", "méthode", "procédure", "steps", "process", "method"],
        "Animate the steps one at a time",
    ),
    (
        &["exemple", "cas", "illustration", "example"],
        "Show concrete visual examples",
    ),
    (
        &["attention", "important", "crucial", "essentiel", "essential"],
        "Highlight visually with colour or motion",
    ),
];

const PLAIN_VISUALS_TIP: &str = "Keep the visuals simple and uncluttered";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScriptStats {
    pub scenes: usize,
    pub narrated_scenes: usize,
    pub total_words: usize,
    pub estimated_seconds: usize,
}

impl std::fmt::Display for ScriptStats {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{} scenes ({} narrated), {} words, ~{}s (~{} min)",
            self.scenes,
            self.narrated_scenes,
            self.total_words,
            self.estimated_seconds,
            self.total_words / 120
        )
    }
}

impl TrainingScript {
    /// Decodes a proposer response: extract the JSON object, check the
    /// structural contract, then decode into typed form.
    pub fn from_response(raw: &str) -> Result<Self, SchemaError> {
        validate::parse_script(raw)
    }

    pub async fn from_json_file<P: AsRef<Path>>(path: P) -> Result<Self, SchemaError> {
        let text = fs::read_to_string(&path)
            .await
            .map_err(|source| SchemaError::Read {
                path: path.as_ref().display().to_string(),
                source,
            })?;
        Self::from_response(&text)
    }

    pub fn narrated_scenes(&self) -> impl Iterator<Item = &Scene> {
        self.scenes.iter().filter(|s| s.is_narrated())
    }

    pub fn has_narration(&self) -> bool {
        self.scenes.iter().any(Scene::is_narrated)
    }

    pub fn stats(&self) -> ScriptStats {
        let total_words: usize = self.scenes.iter().map(Scene::word_count).sum();
        ScriptStats {
            scenes: self.scenes.len(),
            narrated_scenes: self.narrated_scenes().count(),
            total_words,
            estimated_seconds: total_words / 2,
        }
    }

    pub async fn save_json(&self, dir: &Path, file_name: Option<&str>) -> std::io::Result<PathBuf> {
        fs::create_dir_all(dir).await?;
        let name = match file_name {
            Some(name) => name.to_string(),
            None => default_file_name(Local::now(), "json"),
        };
        let path = dir.join(name);
        let body = serde_json::to_string_pretty(self).map_err(std::io::Error::other)?;
        fs::write(&path, body).await?;
        Ok(path)
    }

    /// Plain text for reading aloud: title, then each narrated scene
    /// followed by a pause marker.
    pub fn teleprompter_text(&self) -> String {
        let mut out = format!("FORMATION: {}\n{}\n\n", self.title, "=".repeat(50));
        for scene in self.narrated_scenes() {
            out.push_str(&format!("SCENE {}: {}\n", scene.index, scene.title));
            out.push_str(&"-".repeat(30));
            out.push('\n');
            out.push_str(scene.narration.trim());
            out.push_str("\n\nPAUSE\n\n");
        }
        out
    }

    pub async fn save_teleprompter(&self, path: &Path) -> std::io::Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).await?;
        }
        fs::write(path, self.teleprompter_text()).await
    }

    /// Markdown storyboard for whoever edits the video by hand: every
    /// scene with its timing, narration, visual, creation tips and key
    /// points.
    pub fn storyboard_markdown(&self) -> String {
        let mut out = format!("# Storyboard: {}\n\n", self.title);
        out.push_str(&format!("**Description:** {}\n\n", self.description));
        if let Some(duration) = &self.estimated_duration {
            out.push_str(&format!("**Estimated duration:** {duration}\n\n"));
        }
        if let Some(level) = &self.level {
            out.push_str(&format!("**Level:** {level}\n\n"));
        }

        for scene in &self.scenes {
            out.push_str(&format!("## Scene {}: {}\n\n", scene.index, scene.title));
            out.push_str(&format!(
                "**Duration:** {} words (~{} seconds)\n\n",
                scene.word_count(),
                scene.estimated_seconds()
            ));
            out.push_str(&format!("### Voice-over\n{}\n\n", scene.narration.trim()));
            out.push_str(&format!("### Visual\n{}\n\n", scene.visual_descriptor.trim()));
            out.push_str("### Creation tips\n");
            for tip in scene.creation_tips() {
                out.push_str(&format!("- {tip}\n"));
            }
            out.push_str("\n### Key points\n");
            for point in &scene.key_points {
                out.push_str(&format!("- {point}\n"));
            }
            out.push_str("\n---\n\n");
        }
        out
    }

    pub async fn save_storyboard(&self, path: &Path) -> std::io::Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).await?;
        }
        fs::write(path, self.storyboard_markdown()).await
    }
}

pub fn default_file_name(now: DateTime<Local>, ext: &str) -> String {
    format!("script_formation_{}.{}", now.format("%Y%m%d_%H%M%S"), ext)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn scene(index: u32, narration: &str) -> Scene {
        Scene {
            index,
            title: format!("S{index}"),
            narration: narration.to_string(),
            visual_descriptor: "ai".to_string(),
            key_points: Vec::new(),
        }
    }

    #[test]
    fn legacy_french_fields_decode() {
        let raw = r#"{
            "titre_formation": "IA",
            "description": "D",
            "objectifs": ["o1"],
            "niveau": "débutant",
            "scenes": [{"numero": 1, "titre": "Intro", "voix_off": "Bonjour", "elements_visuels": "ai", "points_cles": ["p"]}]
        }"#;
        let script: TrainingScript = serde_json::from_str(raw).unwrap();
        assert_eq!(script.title, "IA");
        assert_eq!(script.level.as_deref(), Some("débutant"));
        assert_eq!(script.scenes[0].narration, "Bonjour");
        assert_eq!(script.scenes[0].key_points, vec!["p".to_string()]);

        let out = serde_json::to_value(&script).unwrap();
        assert!(out.get("title").is_some());
        assert!(out.get("titre_formation").is_none());
    }

    #[test]
    fn stats_count_words_and_narrated_scenes() {
        let script = TrainingScript {
            title: "T".into(),
            description: "D".into(),
            objectives: vec![],
            estimated_duration: None,
            level: None,
            scenes: vec![scene(1, "one two three four"), scene(2, "  "), scene(3, "five six")],
        };
        let stats = script.stats();
        assert_eq!(stats.scenes, 3);
        assert_eq!(stats.narrated_scenes, 2);
        assert_eq!(stats.total_words, 6);
        assert_eq!(stats.estimated_seconds, 3);
    }

    #[test]
    fn teleprompter_skips_silent_scenes() {
        let script = TrainingScript {
            title: "T".into(),
            description: "D".into(),
            objectives: vec![],
            estimated_duration: None,
            level: None,
            scenes: vec![scene(1, "hello"), scene(2, "")],
        };
        let text = script.teleprompter_text();
        assert!(text.contains("SCENE 1: S1"));
        assert!(!text.contains("SCENE 2"));
        assert_eq!(text.matches("PAUSE").count(), 1);
    }

    #[test]
    fn creation_tips_follow_narration_keywords() {
        let tips = scene(1, "Voici les étapes du processus, avec un exemple important.")
            .creation_tips();
        assert_eq!(
            tips,
            vec![
                "Animate the steps one at a time",
                "Show concrete visual examples",
                "Highlight visually with colour or motion",
            ]
        );
        assert_eq!(scene(2, "Bonjour").creation_tips(), vec![PLAIN_VISUALS_TIP]);
    }

    #[tokio::test]
    async fn storyboard_lists_every_scene_with_tips() {
        let dir = tempfile::tempdir().unwrap();
        let mut charts = scene(1, "The data shows four results");
        charts.key_points = vec!["read the chart".into()];
        let script = TrainingScript {
            title: "Sales".into(),
            description: "Quarterly review".into(),
            objectives: vec![],
            estimated_duration: Some("5 minutes".into()),
            level: None,
            scenes: vec![charts, scene(2, "")],
        };

        let path = dir.path().join("board/storyboard.md");
        script.save_storyboard(&path).await.unwrap();
        let md = tokio::fs::read_to_string(&path).await.unwrap();

        assert!(md.starts_with("# Storyboard: Sales\n\n**Description:** Quarterly review\n\n"));
        assert!(md.contains("**Estimated duration:** 5 minutes"));
        assert!(!md.contains("**Level:**"));
        assert!(md.contains(
            "## Scene 1: S1\n\n**Duration:** 5 words (~2 seconds)\n\n### Voice-over\nThe data shows four results\n\n"
        ));
        assert!(md.contains("### Creation tips\n- Use animated charts or infographics\n"));
        assert!(md.contains("### Key points\n- read the chart\n"));
        assert!(md.contains("## Scene 2: S2"));
        assert_eq!(md.matches("\n---\n").count(), 2);
    }

    #[test]
    fn default_name_uses_timestamp() {
        let now = Local.with_ymd_and_hms(2025, 7, 31, 14, 8, 23).unwrap();
        assert_eq!(default_file_name(now, "json"), "script_formation_20250731_140823.json");
    }

    #[tokio::test]
    async fn save_and_reload_json() {
        let dir = tempfile::tempdir().unwrap();
        let script = TrainingScript {
            title: "T".into(),
            description: "D".into(),
            objectives: vec!["o".into()],
            estimated_duration: None,
            level: None,
            scenes: vec![scene(1, "hello world")],
        };
        let path = script.save_json(dir.path(), Some("s.json")).await.unwrap();
        let back = TrainingScript::from_json_file(&path).await.unwrap();
        assert_eq!(back, script);
    }
}
