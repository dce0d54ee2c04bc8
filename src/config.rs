//! Scenario files: one armor piece, its pool and what to look for

use crate::armor::{ArmorPiece, SkillCatalog};
use crate::augment::Augment;
use crate::batch::{AugmentRequest, BatchSettings};
use crate::criteria::Criteria;
use crate::mode::AugmentMode;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

/// Full augment scenario loaded from YAML/JSON
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScenarioConfig {
    pub armor: ArmorPiece,
    /// Point budget for the piece (depends on its rarity in game)
    pub budget: u32,
    #[serde(default)]
    pub mode: AugmentMode,
    pub skills: SkillCatalog,
    pub pool: Vec<Augment>,
    /// Accept-anything criteria for the piece when absent
    #[serde(default)]
    pub criteria: Option<Criteria>,
    #[serde(default)]
    pub batch: BatchSettings,
}

impl ScenarioConfig {
    /// Load a scenario from a YAML or JSON file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, Box<dyn std::error::Error>> {
        let content = fs::read_to_string(&path)?;
        let path_str = path.as_ref().to_string_lossy().to_lowercase();

        // Check if it's JSON or YAML
        if path_str.ends_with(".json") {
            Self::from_json(&content)
        } else {
            let config: ScenarioConfig = serde_yaml::from_str(&content)?;
            Ok(config)
        }
    }

    pub fn from_json(json: &str) -> Result<Self, Box<dyn std::error::Error>> {
        let config: ScenarioConfig = serde_json::from_str(json)?;
        Ok(config)
    }

    pub fn request(&self) -> AugmentRequest<'_> {
        AugmentRequest {
            armor: &self.armor,
            pool: &self.pool,
            skills: &self.skills,
            budget: self.budget,
            mode: self.mode,
        }
    }

    /// Configured criteria, or the permissive default for this piece
    pub fn criteria(&self) -> Criteria {
        self.criteria
            .clone()
            .unwrap_or_else(|| Criteria::permissive_for(&self.armor, &self.skills))
    }
}
