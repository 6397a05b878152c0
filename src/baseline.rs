//! Baselines: named, timestamped annotated tags over the whole project.

use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use crate::engine::{Author, Engine};

/// A resolved baseline. For lightweight tags (no tag object of their own)
/// the message and timestamp come from the pointed-at commit.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BaselineInfo {
    pub name: String,
    pub message: String,
    pub timestamp_ms: i64,
    pub commit_hash: String,
}

pub struct BaselineService {
    engine: Arc<dyn Engine>,
}

impl BaselineService {
    pub fn new(engine: Arc<dyn Engine>) -> Self {
        Self { engine }
    }

    /// Create an annotated tag at HEAD with the fixed baseline tagger
    /// identity. Name uniqueness is the caller's responsibility; a
    /// duplicate name fails and the error propagates.
    pub fn create_tag(&self, name: &str, message: &str) -> Result<()> {
        self.engine
            .create_annotated_tag(name, message, &Author::baseline_tagger())?;
        log::info!("Created baseline '{name}'");
        Ok(())
    }

    pub fn list_tags(&self) -> Result<Vec<String>> {
        self.engine.list_tags()
    }

    /// Resolve every tag to commit, message and timestamp, newest first.
    /// A single unreadable tag is logged and skipped; it never aborts the
    /// batch.
    pub fn get_tags_with_details(&self) -> Result<Vec<BaselineInfo>> {
        let mut baselines = Vec::new();

        for name in self.engine.list_tags()? {
            match self.resolve_tag(&name) {
                Ok(info) => baselines.push(info),
                Err(e) => log::warn!("Skipping unreadable tag '{name}': {e}"),
            }
        }

        baselines.sort_by(|a, b| b.timestamp_ms.cmp(&a.timestamp_ms));
        Ok(baselines)
    }

    fn resolve_tag(&self, name: &str) -> Result<BaselineInfo> {
        let tag = self.engine.read_tag(name)?;

        if let Some(annotation) = tag.annotation {
            return Ok(BaselineInfo {
                name: tag.name,
                message: annotation.message,
                timestamp_ms: annotation.timestamp_ms,
                commit_hash: tag.commit_hash,
            });
        }

        // Lightweight tag: fall back to the commit's own message and time
        let commit = self.engine.commit_details(&tag.commit_hash)?;
        Ok(BaselineInfo {
            name: tag.name,
            message: commit.message.trim_end().to_string(),
            timestamp_ms: commit.timestamp_ms,
            commit_hash: tag.commit_hash,
        })
    }
}
