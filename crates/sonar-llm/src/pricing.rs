//! Per-model pricing used to estimate run cost.
//!
//! Prices are USD per million tokens. Unknown models fall back to the
//! mid-tier rate so cost columns are never silently zero.

/// Pricing for one model family.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ModelPricing {
    /// USD per million input tokens.
    pub input_per_mtok: f64,

    /// USD per million output tokens.
    pub output_per_mtok: f64,
}

impl ModelPricing {
    /// Look up pricing by model identifier prefix.
    pub fn for_model(model: &str) -> Self {
        if model.contains("opus") {
            Self {
                input_per_mtok: 15.0,
                output_per_mtok: 75.0,
            }
        } else if model.contains("haiku") {
            Self {
                input_per_mtok: 0.80,
                output_per_mtok: 4.0,
            }
        } else {
            // Sonnet-class default.
            Self {
                input_per_mtok: 3.0,
                output_per_mtok: 15.0,
            }
        }
    }

    /// Estimate the USD cost of a completed exchange.
    pub fn estimate_cost(&self, prompt_tokens: u32, completion_tokens: u32) -> f64 {
        (prompt_tokens as f64 * self.input_per_mtok
            + completion_tokens as f64 * self.output_per_mtok)
            / 1_000_000.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lookup_by_family() {
        assert_eq!(
            ModelPricing::for_model("claude-opus-4-20250514").input_per_mtok,
            15.0
        );
        assert_eq!(
            ModelPricing::for_model("claude-haiku-3-5").output_per_mtok,
            4.0
        );
        assert_eq!(
            ModelPricing::for_model("claude-sonnet-4-20250514").input_per_mtok,
            3.0
        );
    }

    #[test]
    fn test_unknown_model_uses_default() {
        let pricing = ModelPricing::for_model("some-new-model");
        assert_eq!(pricing.input_per_mtok, 3.0);
        assert_eq!(pricing.output_per_mtok, 15.0);
    }

    #[test]
    fn test_estimate_cost() {
        let pricing = ModelPricing::for_model("claude-sonnet-4-20250514");
        let cost = pricing.estimate_cost(1_000_000, 1_000_000);
        assert!((cost - 18.0).abs() < 1e-9);

        let cost = pricing.estimate_cost(1000, 500);
        assert!((cost - (0.003 + 0.0075)).abs() < 1e-9);
    }

    #[test]
    fn test_zero_tokens_zero_cost() {
        let pricing = ModelPricing::for_model("claude-sonnet-4-20250514");
        assert_eq!(pricing.estimate_cost(0, 0), 0.0);
    }
}
