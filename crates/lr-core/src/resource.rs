//! Preferred resources and their portal IDs.

use std::collections::BTreeMap;

use crate::types::{ResourceName, ValidationError};

/// Ordered resource preferences, each resolved to its numeric portal ID.
///
/// Construction fails if any preferred resource is missing from the ID table,
/// so lookups during a run cannot fail.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResourceCatalog {
    preferred: Vec<(ResourceName, u64)>,
    ids: BTreeMap<String, u64>,
}

impl ResourceCatalog {
    /// Builds a catalog from a preference list and a name → ID table.
    pub fn new(
        preferred: &[ResourceName],
        ids: &BTreeMap<String, u64>,
    ) -> Result<Self, ValidationError> {
        if preferred.is_empty() {
            return Err(ValidationError::NoResources);
        }
        let preferred = preferred
            .iter()
            .map(|name| {
                ids.get(name.as_str())
                    .map(|id| (name.clone(), *id))
                    .ok_or_else(|| ValidationError::UnknownResource {
                        name: name.to_string(),
                    })
            })
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self {
            preferred,
            ids: ids.clone(),
        })
    }

    /// Preferred resources in the order they should be tried.
    pub fn candidates(&self) -> impl Iterator<Item = (&ResourceName, u64)> {
        self.preferred.iter().map(|(name, id)| (name, *id))
    }

    /// Resolves any known resource, preferred or not.
    pub fn resolve(&self, name: &ResourceName) -> Result<u64, ValidationError> {
        self.ids
            .get(name.as_str())
            .copied()
            .ok_or_else(|| ValidationError::UnknownResource {
                name: name.to_string(),
            })
    }
}
