// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Achievement catalog loading and seeding.

use std::collections::HashSet;
use std::path::Path;

use crate::db::LedgerStore;
use crate::error::{AppError, Result};
use crate::models::AchievementDefinition;

/// A validated set of achievement definitions, in file order.
#[derive(Debug, Clone, Default)]
pub struct AchievementCatalog {
    definitions: Vec<AchievementDefinition>,
}

impl AchievementCatalog {
    /// Load a JSON array of definitions from a file.
    pub fn load_from_file(path: impl AsRef<Path>) -> anyhow::Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)
            .map_err(|e| anyhow::anyhow!("Failed to read {}: {}", path.display(), e))?;
        Ok(Self::from_json(&content)?)
    }

    /// Parse and validate a JSON array of definitions.
    pub fn from_json(json: &str) -> Result<Self> {
        let definitions: Vec<AchievementDefinition> = serde_json::from_str(json)
            .map_err(|e| AppError::Validation(format!("Invalid achievement catalog: {}", e)))?;

        let mut seen = HashSet::new();
        for def in &definitions {
            if def.id.trim().is_empty() {
                return Err(AppError::Validation(
                    "Achievement with empty id".to_string(),
                ));
            }
            if def.name.trim().is_empty() {
                return Err(AppError::Validation(format!(
                    "Achievement {} has an empty name",
                    def.id
                )));
            }
            if !seen.insert(def.id.as_str()) {
                return Err(AppError::Validation(format!(
                    "Duplicate achievement id: {}",
                    def.id
                )));
            }
        }

        Ok(Self { definitions })
    }

    pub fn definitions(&self) -> &[AchievementDefinition] {
        &self.definitions
    }

    /// Upsert every definition into the store. Safe to run repeatedly.
    pub async fn seed(&self, store: &dyn LedgerStore) -> Result<usize> {
        for def in &self.definitions {
            store.upsert_achievement(def).await?;
        }
        tracing::info!(count = self.definitions.len(), "Achievement catalog seeded");
        Ok(self.definitions.len())
    }
}
