// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Maps criterion kinds to their strategies.

use std::collections::BTreeMap;
use std::fmt;

use docvet_core::error::{DocvetError, Result};
use docvet_core::{CriteriaConfig, CriterionKind};
use tracing::debug;

use crate::builtin;
use crate::criterion::Criterion;

/// Lookup table from [`CriterionKind`] to the strategy that measures it.
pub struct CriteriaRegistry {
    strategies: BTreeMap<CriterionKind, Box<dyn Criterion>>,
}

impl CriteriaRegistry {
    /// A registry with nothing registered.
    pub fn empty() -> Self {
        Self {
            strategies: BTreeMap::new(),
        }
    }

    /// All built-in criteria.
    pub fn standard() -> Self {
        let mut registry = Self::empty();
        registry.register(Box::new(builtin::FileIntegrity));
        registry.register(Box::new(builtin::Resolution));
        registry.register(Box::new(builtin::Brightness));
        registry.register(Box::new(builtin::Blur));
        registry.register(Box::new(builtin::Skew));
        registry.register(Box::new(builtin::Watermark));
        registry.register(Box::new(builtin::TextDensity));
        registry.register(Box::new(builtin::Noise));
        registry.register(Box::new(builtin::Compression));
        registry.register(Box::new(builtin::MissingPages));
        registry
    }

    /// Install `criterion` for its kind, returning any strategy it replaces.
    pub fn register(&mut self, criterion: Box<dyn Criterion>) -> Option<Box<dyn Criterion>> {
        let kind = criterion.kind();
        debug!(%kind, "Registering criterion");
        self.strategies.insert(kind, criterion)
    }

    pub fn get(&self, kind: CriterionKind) -> Option<&dyn Criterion> {
        self.strategies.get(&kind).map(|c| c.as_ref())
    }

    pub fn kinds(&self) -> impl Iterator<Item = CriterionKind> + '_ {
        self.strategies.keys().copied()
    }

    /// Check every configured criterion has a strategy and the threshold
    /// fields that strategy needs.
    pub fn validate(&self, criteria: &[CriteriaConfig]) -> Result<()> {
        for (index, config) in criteria.iter().enumerate() {
            let strategy = self.get(config.name).ok_or_else(|| {
                DocvetError::Configuration(format!(
                    "criterion #{} ({}): no strategy registered",
                    index, config.name
                ))
            })?;
            strategy.validate(&config.threshold).map_err(|detail| {
                DocvetError::Configuration(format!("criterion #{}: {}", index, detail))
            })?;
        }
        Ok(())
    }
}

impl Default for CriteriaRegistry {
    fn default() -> Self {
        Self::standard()
    }
}

impl fmt::Debug for CriteriaRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_set().entries(self.strategies.keys()).finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use docvet_core::{CriteriaType, Threshold};

    #[test]
    fn standard_covers_every_kind() {
        let registry = CriteriaRegistry::standard();
        let kinds: Vec<_> = registry.kinds().collect();
        let mut all = CriterionKind::ALL.to_vec();
        all.sort();
        assert_eq!(kinds, all);
    }

    #[test]
    fn register_replaces_existing_strategy() {
        let mut registry = CriteriaRegistry::standard();
        let previous = registry.register(Box::new(builtin::Blur));
        assert!(previous.is_some());
        assert_eq!(registry.kinds().count(), 10);
    }

    #[test]
    fn validation_names_the_offending_criterion() {
        let registry = CriteriaRegistry::standard();
        let criteria = vec![
            CriteriaConfig::new(
                CriterionKind::FileIntegrity,
                CriteriaType::Required,
                Threshold::default(),
            ),
            CriteriaConfig::new(CriterionKind::Skew, CriteriaType::Required, Threshold::default()),
        ];
        let err = registry.validate(&criteria).unwrap_err();
        assert!(err.to_string().contains("criterion #1: skew requires threshold field max_deg"));
    }

    #[test]
    fn shipped_criteria_file_validates() {
        let raw = include_str!("../../../config/criteria_config.json");
        let set = docvet_core::CriteriaSet::from_json_str(raw).unwrap();
        assert_eq!(set.len(), 10);
        CriteriaRegistry::standard().validate(set.as_slice()).unwrap();
    }

    #[test]
    fn unregistered_kind_is_a_configuration_error() {
        let registry = CriteriaRegistry::empty();
        let criteria = vec![CriteriaConfig::new(
            CriterionKind::Noise,
            CriteriaType::Warning,
            Threshold::default(),
        )];
        assert!(matches!(
            registry.validate(&criteria),
            Err(DocvetError::Configuration(_))
        ));
    }
}
