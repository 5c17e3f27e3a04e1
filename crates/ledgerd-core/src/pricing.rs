//! Operation cost catalog.
//!
//! Paid operations resolve their credit cost from this catalog by model id.
//! Inactive models stay listed so their historical costs remain visible.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Cost and availability of one generation model.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct ModelPricing {
    /// Credit cost per invocation.
    pub cost: i64,

    /// Whether the model can currently be selected.
    pub active: bool,
}

/// Pricing for all billable generation models.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PricingConfig {
    /// Pricing by model id.
    pub models: HashMap<String, ModelPricing>,

    /// Model used when the caller does not name one (or names an unknown
    /// one).
    pub default_model: String,
}

impl Default for PricingConfig {
    fn default() -> Self {
        let mut models = HashMap::new();
        models.insert(
            "gemini-2.5-flash-image".to_string(),
            ModelPricing {
                cost: 4,
                active: true,
            },
        );
        models.insert(
            "flux-context".to_string(),
            ModelPricing {
                cost: 24,
                active: false,
            },
        );
        models.insert(
            "seedream".to_string(),
            ModelPricing {
                cost: 12,
                active: false,
            },
        );

        Self {
            models,
            default_model: "gemini-2.5-flash-image".to_string(),
        }
    }
}

impl PricingConfig {
    /// Resolve a requested model id to a known one, falling back to the
    /// default model for unknown or missing ids.
    #[must_use]
    pub fn resolve_model<'a>(&'a self, requested: Option<&'a str>) -> &'a str {
        match requested {
            Some(id) if self.models.contains_key(id) => id,
            _ => &self.default_model,
        }
    }

    /// Pricing for a resolved model id.
    #[must_use]
    pub fn pricing(&self, model_id: &str) -> Option<ModelPricing> {
        self.models.get(model_id).copied()
    }
}
