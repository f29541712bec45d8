//! Static per-model pricing.

use rust_decimal::Decimal;
use rust_decimal_macros::dec;

use super::provider::{CompletionResponse, LlmProvider};

/// (input, output) USD per token for a model name. Unknown models cost zero.
pub fn model_cost(model: &str) -> (Decimal, Decimal) {
    // Prices are per million tokens.
    let (input, output) = match model {
        m if m.starts_with("gpt-4o-mini") => (dec!(0.15), dec!(0.60)),
        m if m.starts_with("gpt-4o") => (dec!(2.50), dec!(10.00)),
        m if m.starts_with("gpt-4-turbo") => (dec!(10.00), dec!(30.00)),
        m if m.starts_with("gpt-4.1-mini") => (dec!(0.40), dec!(1.60)),
        m if m.starts_with("gpt-3.5-turbo") => (dec!(0.50), dec!(1.50)),
        _ => (Decimal::ZERO, Decimal::ZERO),
    };
    let per_million = dec!(1_000_000);
    (input / per_million, output / per_million)
}

/// Estimated USD cost of a completion.
pub fn estimate_cost(provider: &dyn LlmProvider, response: &CompletionResponse) -> Decimal {
    let (input, output) = provider.cost_per_token();
    input * Decimal::from(response.input_tokens) + output * Decimal::from(response.output_tokens)
}
