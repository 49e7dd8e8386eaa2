use crate::models::{CostMode, TokenCounts};

/// Per-million-token rates for one model family.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ModelRates {
    pub input: f64,
    pub output: f64,
    pub cache_creation: f64,
    pub cache_read: f64,
}

const OPUS_RATES: ModelRates = ModelRates {
    input: 15.0,
    output: 75.0,
    cache_creation: 18.75,
    cache_read: 1.5,
};

const SONNET_RATES: ModelRates = ModelRates {
    input: 3.0,
    output: 15.0,
    cache_creation: 3.75,
    cache_read: 0.3,
};

const HAIKU_RATES: ModelRates = ModelRates {
    input: 0.25,
    output: 1.25,
    cache_creation: 0.3,
    cache_read: 0.03,
};

/// Unknown models are billed at Sonnet rates.
const FALLBACK_RATES: ModelRates = SONNET_RATES;

/// Derives or trusts the monetary cost of a usage entry.
#[derive(Debug, Clone, Default)]
pub struct PricingCalculator;

impl PricingCalculator {
    pub fn new() -> Self {
        Self
    }

    /// Look up rates by model family; unknown names fall back to a default.
    pub fn rates_for_model(&self, model: &str) -> ModelRates {
        let m = model.to_lowercase();
        if m.contains("opus") {
            OPUS_RATES
        } else if m.contains("haiku") {
            HAIKU_RATES
        } else if m.contains("sonnet") {
            SONNET_RATES
        } else {
            FALLBACK_RATES
        }
    }

    pub fn calculate_cost_from_tokens(&self, tokens: &TokenCounts, model: &str) -> f64 {
        let rates = self.rates_for_model(model);
        let cost = (tokens.input_tokens as f64 * rates.input
            + tokens.output_tokens as f64 * rates.output
            + tokens.cache_creation_tokens as f64 * rates.cache_creation
            + tokens.cache_read_tokens as f64 * rates.cache_read)
            / 1_000_000.0;
        round_cost(cost)
    }

    /// Resolve the cost of an entry under the given mode. Never fails; always >= 0.
    pub fn cost_for_entry(
        &self,
        tokens: &TokenCounts,
        model: &str,
        supplied_cost: Option<f64>,
        mode: CostMode,
    ) -> f64 {
        let cost = match mode {
            CostMode::UseProvided => supplied_cost.unwrap_or(0.0),
            CostMode::Calculate => self.calculate_cost_from_tokens(tokens, model),
            CostMode::Auto => match supplied_cost {
                Some(cost) => cost,
                None => self.calculate_cost_from_tokens(tokens, model),
            },
        };

        if cost.is_finite() && cost > 0.0 {
            cost
        } else {
            0.0
        }
    }
}

fn round_cost(cost: f64) -> f64 {
    (cost * 1_000_000.0).round() / 1_000_000.0
}
