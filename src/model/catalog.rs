use crate::error::{Error, Result};
use serde::Deserialize;
use std::collections::HashSet;
use std::fs;
use std::path::Path;

const BUILTIN_CATALOG: &str = include_str!("catalog.toml");

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Tier {
    Fast,
    Medium,
    Heavy,
    Specialized,
}

impl Tier {
    pub const ALL: [Tier; 4] = [Tier::Fast, Tier::Medium, Tier::Heavy, Tier::Specialized];

    /// Heading used when the catalog is printed grouped by tier.
    pub fn label(self) -> &'static str {
        match self {
            Tier::Fast => "🚀 Fast Tier (< 500ms)",
            Tier::Medium => "⚡ Medium Tier (< 2s)",
            Tier::Heavy => "🔥 Heavy Tier (< 5s)",
            Tier::Specialized => "🎯 Specialized Models",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct ModelEntry {
    pub key: String,
    pub repo_id: String,
    pub filename: String,
    pub description: String,
    pub tier: Tier,
    /// Advisory only, never checked against the downloaded file.
    pub size_gb: f64,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct PresetEntry {
    pub name: String,
    pub models: Vec<String>,
}

/// Read-only model and preset tables, built once at startup.
#[derive(Debug, Default, Deserialize)]
pub struct Catalog {
    #[serde(rename = "model", default)]
    models: Vec<ModelEntry>,
    #[serde(rename = "preset", default)]
    presets: Vec<PresetEntry>,
}

impl Catalog {
    pub fn builtin() -> Result<Self> {
        Self::parse(BUILTIN_CATALOG)
    }

    pub fn parse(content: &str) -> Result<Self> {
        let catalog: Catalog = toml::from_str(content)?;
        catalog.check_unique()?;
        Ok(catalog)
    }

    /// Built-in catalog extended by the user file at `path`.
    pub fn load(overlay: Option<&Path>) -> Result<Self> {
        let mut catalog = Self::builtin()?;

        if let Some(path) = overlay {
            tracing::debug!("Loading catalog overlay from {:?}", path);
            let content = fs::read_to_string(path).map_err(|e| {
                Error::InvalidCatalog(format!("Could not read {}: {}", path.display(), e))
            })?;
            catalog.merge(Self::parse(&content)?);
        }

        for (preset, key) in catalog.dangling_references() {
            tracing::warn!("Preset '{}' references unknown model '{}'", preset, key);
        }

        Ok(catalog)
    }

    /// Entries from `other` replace same-keyed entries in place; new ones are appended.
    pub fn merge(&mut self, other: Catalog) {
        for model in other.models {
            match self.models.iter_mut().find(|m| m.key == model.key) {
                Some(existing) => *existing = model,
                None => self.models.push(model),
            }
        }
        for preset in other.presets {
            match self.presets.iter_mut().find(|p| p.name == preset.name) {
                Some(existing) => *existing = preset,
                None => self.presets.push(preset),
            }
        }
    }

    fn check_unique(&self) -> Result<()> {
        let mut keys = HashSet::new();
        for model in &self.models {
            if !keys.insert(model.key.as_str()) {
                return Err(Error::InvalidCatalog(format!(
                    "Duplicate model key: {}",
                    model.key
                )));
            }
        }

        let mut names = HashSet::new();
        for preset in &self.presets {
            if !names.insert(preset.name.as_str()) {
                return Err(Error::InvalidCatalog(format!(
                    "Duplicate preset: {}",
                    preset.name
                )));
            }
        }

        Ok(())
    }

    pub fn resolve(&self, key: &str) -> Result<&ModelEntry> {
        self.models
            .iter()
            .find(|m| m.key == key)
            .ok_or_else(|| Error::UnknownModel(key.to_string()))
    }

    pub fn preset(&self, name: &str) -> Result<&PresetEntry> {
        self.presets
            .iter()
            .find(|p| p.name == name)
            .ok_or_else(|| Error::UnknownPreset(name.to_string()))
    }

    pub fn resolve_preset(&self, name: &str) -> Result<Vec<&ModelEntry>> {
        self.preset(name)?
            .models
            .iter()
            .map(|key| self.resolve(key))
            .collect()
    }

    pub fn models(&self) -> &[ModelEntry] {
        &self.models
    }

    pub fn presets(&self) -> &[PresetEntry] {
        &self.presets
    }

    pub fn models_in_tier(&self, tier: Tier) -> impl Iterator<Item = &ModelEntry> {
        self.models.iter().filter(move |m| m.tier == tier)
    }

    /// Sum of advisory sizes; members missing from the catalog count as zero.
    pub fn preset_size_gb(&self, preset: &PresetEntry) -> f64 {
        preset
            .models
            .iter()
            .filter_map(|key| self.resolve(key).ok())
            .map(|m| m.size_gb)
            .sum()
    }

    pub fn preset_names(&self) -> Vec<&str> {
        self.presets.iter().map(|p| p.name.as_str()).collect()
    }

    /// `(preset, key)` pairs whose key has no catalog entry.
    pub fn dangling_references(&self) -> Vec<(&str, &str)> {
        self.presets
            .iter()
            .flat_map(move |p| {
                p.models
                    .iter()
                    .filter(move |key| self.resolve(key).is_err())
                    .map(move |key| (p.name.as_str(), key.as_str()))
            })
            .collect()
    }
}
