//! Flattening of grouped dependency declarations.
//!
//! A manifest lists dependencies either directly or inside
//! `<group targetFramework="...">` elements. The normalizer receives the
//! declarations in document order and stamps each with the framework of the
//! group it was found in.

use tracing::debug;

use crate::config::DependencyPolicy;
use crate::error::{ExtractionError, ExtractionResult};

use super::metadata::DependencyEntry;

#[derive(Debug)]
pub struct DependencyNormalizer {
    policy: DependencyPolicy,
    group_framework: Option<String>,
    entries: Vec<DependencyEntry>,
}

impl DependencyNormalizer {
    pub fn new(policy: DependencyPolicy) -> Self {
        Self {
            policy,
            group_framework: None,
            entries: Vec::new(),
        }
    }

    /// A `<group>` opened; `framework` is its `targetFramework`, if any.
    pub fn enter_group(&mut self, framework: Option<String>) {
        self.group_framework = framework;
    }

    pub fn leave_group(&mut self) {
        self.group_framework = None;
    }

    /// Record one `<dependency>` in the current context.
    pub fn declare(&mut self, id: Option<String>, version: Option<String>) -> ExtractionResult<()> {
        let Some(name) = id else {
            return match self.policy {
                DependencyPolicy::Skip => {
                    debug!(?version, "skipping dependency without an id");
                    Ok(())
                }
                DependencyPolicy::Reject => {
                    Err(ExtractionError::malformed("dependency is missing its id"))
                }
            };
        };

        self.entries.push(DependencyEntry {
            name,
            version,
            target_framework: self.group_framework.clone(),
        });
        Ok(())
    }

    pub fn finish(self) -> Vec<DependencyEntry> {
        self.entries
    }
}
