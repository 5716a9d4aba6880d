//! Keyword-vote language detection between the two supported languages.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Language {
    French,
    English,
}

const FRENCH_WORDS: &[&str] = &[
    "le", "la", "les", "des", "du", "de", "un", "une", "et", "pour", "avec", "sur", "dans",
    "est", "sont", "vous", "nous", "formation", "apprendre", "comprendre", "introduction",
    "données", "réseau", "réseaux", "apprentissage", "je", "veux", "bases", "aux", "au",
];

const ENGLISH_WORDS: &[&str] = &[
    "the", "a", "an", "and", "for", "with", "on", "in", "is", "are", "you", "we", "of", "to",
    "training", "learn", "understand", "course", "data", "network", "networks", "learning",
    "i", "want", "basics", "how", "what", "your",
];

impl Language {
    /// Counts known function words per language; ties go to French.
    pub fn detect(text: &str) -> Self {
        let mut french = 0usize;
        let mut english = 0usize;

        let lower = text.to_lowercase();
        for word in lower.split(|c: char| !c.is_alphanumeric()) {
            if word.is_empty() {
                continue;
            }
            if FRENCH_WORDS.contains(&word) {
                french += 1;
            }
            if ENGLISH_WORDS.contains(&word) {
                english += 1;
            }
        }

        if english > french {
            Language::English
        } else {
            Language::French
        }
    }

    /// Spoken introduction built from the title and objectives.
    pub fn intro_narration(self, title: &str, objectives: &[String]) -> String {
        let objectives: Vec<&str> = objectives
            .iter()
            .map(|o| o.trim())
            .filter(|o| !o.is_empty())
            .collect();

        match self {
            Language::French => {
                let mut text = format!("Bienvenue dans cette formation : {}.", title.trim());
                if !objectives.is_empty() {
                    text.push_str(" À la fin de cette formation, vous saurez : ");
                    text.push_str(&objectives.join(" ; "));
                    text.push('.');
                }
                text
            }
            Language::English => {
                let mut text = format!("Welcome to this training: {}.", title.trim());
                if !objectives.is_empty() {
                    text.push_str(" By the end of this training, you will be able to: ");
                    text.push_str(&objectives.join("; "));
                    text.push('.');
                }
                text
            }
        }
    }
}
