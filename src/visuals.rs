//! Per-scene image resolution: existing URL, search providers, a static
//! fallback table, then a hard default.

use crate::api::pexels::PexelsClient;
use crate::api::probe::HttpProbe;
use crate::api::unsplash::UnsplashClient;
use crate::api::{ImageSearch, LinkProbe};
use crate::config::Config;
use crate::script::{Scene, TrainingScript};
use reqwest::Client;
use std::time::Duration;
use tracing::{info, warn};

/// Last resort; assumed always reachable and never probed.
pub const DEFAULT_IMAGE_URL: &str =
    "https://images.pexels.com/photos/3861969/pexels-photo-3861969.jpeg";

/// Category keyword to stock image, checked in order.
pub const FALLBACK_IMAGES: &[(&str, &str)] = &[
    ("technology", "https://images.pexels.com/photos/3861969/pexels-photo-3861969.jpeg"),
    ("neural_network", "https://images.pexels.com/photos/8386445/pexels-photo-8386445.jpeg"),
    ("ai", "https://images.pexels.com/photos/3184639/pexels-photo-3184639.jpeg"),
    ("computer", "https://images.pexels.com/photos/1181288/pexels-photo-1181288.jpeg"),
    ("data", "https://images.pexels.com/photos/669610/pexels-photo-669610.jpeg"),
    ("machine_learning", "https://images.pexels.com/photos/6804090/pexels-photo-6804090.jpeg"),
    ("deep_learning", "https://images.pexels.com/photos/11035380/pexels-photo-11035380.jpeg"),
    ("programming", "https://images.pexels.com/photos/1181671/pexels-photo-1181671.jpeg"),
    ("cnn", "https://images.pexels.com/photos/8386445/pexels-photo-8386445.jpeg"),
    ("rnn", "https://images.pexels.com/photos/373543/pexels-photo-373543.jpeg"),
    ("gan", "https://images.pexels.com/photos/8369631/pexels-photo-8369631.jpeg"),
    ("tensorflow", "https://images.pexels.com/photos/3861972/pexels-photo-3861972.jpeg"),
    ("keras", "https://images.pexels.com/photos/1181316/pexels-photo-1181316.jpeg"),
    ("formation", "https://images.pexels.com/photos/4144923/pexels-photo-4144923.jpeg"),
    ("education", "https://images.pexels.com/photos/5212328/pexels-photo-5212328.jpeg"),
    ("introduction", "https://images.pexels.com/photos/5428832/pexels-photo-5428832.jpeg"),
    ("conclusion", "https://images.pexels.com/photos/669615/pexels-photo-669615.jpeg"),
    ("learning", "https://images.pexels.com/photos/4144294/pexels-photo-4144294.jpeg"),
    ("brain", "https://images.pexels.com/photos/5863390/pexels-photo-5863390.jpeg"),
    ("network", "https://images.pexels.com/photos/373543/pexels-photo-373543.jpeg"),
    ("algorithm", "https://images.pexels.com/photos/546819/pexels-photo-546819.jpeg"),
];

const SEARCH_TERM_MAP: &[(&str, &str)] = &[
    ("cnn", "neural network computer vision"),
    ("convolution", "computer vision technology"),
    ("rnn", "artificial intelligence data"),
    ("récurrent", "machine learning ai"),
    ("gan", "artificial intelligence technology"),
    ("adversaire", "computer programming"),
    ("autoencodeur", "data science technology"),
    ("tensorflow", "programming computer code"),
    ("keras", "programming development"),
    ("optimisation", "mathematics data science"),
    ("activation", "neural network ai"),
    ("neurone", "artificial intelligence brain"),
    ("deep learning", "artificial intelligence technology"),
    ("apprentissage", "education technology"),
    ("formation", "education learning"),
    ("introduction", "technology computer"),
    ("conclusion", "success achievement"),
    ("machine learning", "artificial intelligence data"),
    ("intelligence artificielle", "ai technology computer"),
    ("algorithme", "programming mathematics"),
    ("données", "data analytics technology"),
    ("modèle", "machine learning ai"),
    ("entraînement", "training education"),
    ("prédiction", "forecasting analytics"),
    ("classification", "categorization data science"),
    ("régression", "statistics mathematics"),
];

pub const GENERIC_QUERY: &str = "technology artificial intelligence computer";

/// Maps a scene title or descriptor to a broader stock-photo query.
pub fn search_term_for(text: &str) -> &'static str {
    let lower = text.to_lowercase();
    SEARCH_TERM_MAP
        .iter()
        .find(|(keyword, _)| lower.contains(keyword))
        .map(|(_, term)| *term)
        .unwrap_or(GENERIC_QUERY)
}

fn looks_like_url(text: &str) -> bool {
    text.starts_with("http://") || text.starts_with("https://")
}

/// Where a scene's final image came from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum VisualSource {
    Existing,
    Search(&'static str),
    Fallback(String),
    Default,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Resolution {
    pub url: String,
    pub source: VisualSource,
}

pub struct VisualResolver {
    providers: Vec<Box<dyn ImageSearch>>,
    probe: Box<dyn LinkProbe>,
    fallbacks: Vec<(String, String)>,
    courtesy_delay: Duration,
    remap_queries: bool,
}

impl VisualResolver {
    pub fn new(probe: Box<dyn LinkProbe>) -> Self {
        Self {
            providers: Vec::new(),
            probe,
            fallbacks: FALLBACK_IMAGES
                .iter()
                .map(|(c, u)| (c.to_string(), u.to_string()))
                .collect(),
            courtesy_delay: Duration::ZERO,
            remap_queries: false,
        }
    }

    /// Pexels then Unsplash, each only when its key is configured.
    pub fn from_config(cfg: &Config, client: &Client) -> Self {
        let probe = HttpProbe::new(client.clone(), cfg.probe_timeout());
        let mut resolver = Self::new(Box::new(probe))
            .with_courtesy_delay(cfg.courtesy_delay())
            .with_query_remap(cfg.visuals.remap_queries);

        if let Some(key) = cfg.pexels_key.as_deref().filter(|k| !k.trim().is_empty()) {
            resolver = resolver.with_provider(Box::new(PexelsClient::new(client.clone(), key)));
        }
        if let Some(key) = cfg.unsplash_key.as_deref().filter(|k| !k.trim().is_empty()) {
            resolver = resolver.with_provider(Box::new(UnsplashClient::new(client.clone(), key)));
        }
        if resolver.providers.is_empty() {
            warn!("no image search key configured; scenes will use fallback images");
        }
        resolver
    }

    pub fn with_provider(mut self, provider: Box<dyn ImageSearch>) -> Self {
        self.providers.push(provider);
        self
    }

    pub fn with_courtesy_delay(mut self, delay: Duration) -> Self {
        self.courtesy_delay = delay;
        self
    }

    pub fn with_query_remap(mut self, enabled: bool) -> Self {
        self.remap_queries = enabled;
        self
    }

    /// What the scene shows: its descriptor, or its title when the
    /// descriptor is empty or a (dead) link.
    fn subject(scene: &Scene) -> &str {
        let descriptor = scene.visual_descriptor.trim();
        if looks_like_url(descriptor) || descriptor.is_empty() {
            scene.title.trim()
        } else {
            descriptor
        }
    }

    fn query_for(&self, scene: &Scene) -> String {
        if self.remap_queries {
            let descriptor = scene.visual_descriptor.trim();
            return search_term_for(&format!("{} {}", scene.title, descriptor)).to_string();
        }
        Self::subject(scene).to_string()
    }

    pub async fn resolve_scene(&self, scene: &Scene) -> Resolution {
        let descriptor = scene.visual_descriptor.trim();
        if looks_like_url(descriptor) {
            if self.probe.is_live(descriptor).await {
                return Resolution {
                    url: descriptor.to_string(),
                    source: VisualSource::Existing,
                };
            }
            warn!("scene {}: existing visual is unreachable, searching", scene.index);
        }

        let query = self.query_for(scene);
        for provider in &self.providers {
            match provider.search(&query).await {
                Ok(Some(url)) => {
                    if self.probe.is_live(&url).await {
                        return Resolution {
                            url,
                            source: VisualSource::Search(provider.name()),
                        };
                    }
                    warn!(
                        "scene {}: {} result is unreachable: {}",
                        scene.index,
                        provider.name(),
                        url
                    );
                }
                Ok(None) => {
                    info!(
                        "scene {}: {} has no result for '{}'",
                        scene.index,
                        provider.name(),
                        query
                    );
                }
                Err(err) => {
                    warn!("scene {}: {} search failed: {}", scene.index, provider.name(), err);
                }
            }
        }

        // The table is keyed on what the scene shows, not on the search query.
        let lower = Self::subject(scene).to_lowercase();
        for (category, url) in &self.fallbacks {
            let keyword = category.replace('_', " ");
            if lower.contains(&keyword) && self.probe.is_live(url).await {
                return Resolution {
                    url: url.clone(),
                    source: VisualSource::Fallback(category.clone()),
                };
            }
        }

        Resolution {
            url: DEFAULT_IMAGE_URL.to_string(),
            source: VisualSource::Default,
        }
    }

    /// Replaces every scene's descriptor with a working image URL, in
    /// scene order. Every scene ends with some URL.
    pub async fn resolve_all(&self, script: &mut TrainingScript) -> Vec<VisualSource> {
        let mut sources = Vec::with_capacity(script.scenes.len());
        for scene in script.scenes.iter_mut() {
            let resolution = self.resolve_scene(scene).await;
            info!(
                "scene {} '{}': visual {:?} -> {}",
                scene.index, scene.title, resolution.source, resolution.url
            );
            let searched = resolution.source != VisualSource::Existing;
            scene.visual_descriptor = resolution.url;
            sources.push(resolution.source);

            if searched && !self.courtesy_delay.is_zero() {
                tokio::time::sleep(self.courtesy_delay).await;
            }
        }
        sources
    }

    /// Probes every fallback entry and reports which still respond.
    pub async fn audit_fallbacks(&self) -> Vec<(String, bool)> {
        let mut out = Vec::with_capacity(self.fallbacks.len());
        for (category, url) in &self.fallbacks {
            let live = self.probe.is_live(url).await;
            if !live {
                warn!("fallback '{category}' is unreachable: {url}");
            }
            out.push((category.clone(), live));
        }
        out
    }

    /// Adds or replaces a fallback entry, only if the URL is live.
    pub async fn add_fallback(&mut self, category: &str, url: &str) -> bool {
        if !self.probe.is_live(url).await {
            return false;
        }
        match self.fallbacks.iter_mut().find(|(c, _)| c == category) {
            Some(entry) => entry.1 = url.to_string(),
            None => self.fallbacks.push((category.to_string(), url.to_string())),
        }
        true
    }

    pub fn fallback_for(&self, category: &str) -> &str {
        self.fallbacks
            .iter()
            .find(|(c, _)| c == category)
            .map(|(_, u)| u.as_str())
            .unwrap_or(DEFAULT_IMAGE_URL)
    }
}
