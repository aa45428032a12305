//! LLM-backed price estimation.
//!
//! Defines the `PriceEstimator` trait and provides two implementations
//! with independent strategies: the retrieval-augmented frontier estimator
//! and the direct-inference specialist estimator. Both share the
//! OpenAI-compatible `ChatClient` and the price parsing helpers here.

pub mod client;
pub mod frontier;
pub mod specialist;

use async_trait::async_trait;

use crate::error::PipelineError;

/// Prefill that makes pricing models answer with a bare number.
pub(crate) const PRICE_PREFILL: &str = "Price is $";

/// Abstraction over price estimators.
///
/// Implementors map a product description to a single non-negative price
/// estimate. Failures (timeouts, malformed replies, backend errors) are
/// reported as `PipelineError::EstimationFailure`.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait PriceEstimator: Send + Sync {
    /// Estimate the price of the described product.
    async fn price(&self, description: &str) -> Result<f64, PipelineError>;

    /// Estimator name for logging and error reports.
    fn name(&self) -> &str;
}

/// Pull the first number out of a model reply.
///
/// Dollar signs and thousands separators are stripped first, so
/// `"$1,299.99 or so"` yields `1299.99`. Returns `None` when the reply
/// contains no number at all.
pub fn parse_price(reply: &str) -> Option<f64> {
    let cleaned: String = reply.chars().filter(|c| *c != '$' && *c != ',').collect();
    let bytes = cleaned.as_bytes();

    let mut i = 0;
    while i < bytes.len() {
        let c = bytes[i];
        let starts_number = c.is_ascii_digit()
            || (c == b'.' && bytes.get(i + 1).is_some_and(u8::is_ascii_digit));
        if starts_number {
            let negative = i > 0 && bytes[i - 1] == b'-';
            let start = i;
            let mut seen_dot = false;
            while i < bytes.len() {
                match bytes[i] {
                    b'0'..=b'9' => i += 1,
                    b'.' if !seen_dot && bytes.get(i + 1).is_some_and(u8::is_ascii_digit) => {
                        seen_dot = true;
                        i += 1;
                    }
                    _ => break,
                }
            }
            let value: f64 = cleaned[start..i].parse().ok()?;
            return Some(if negative { -value } else { value });
        }
        i += 1;
    }
    None
}

/// Turn a raw model reply into a usable price, or an estimation failure.
pub(crate) fn price_from_reply(estimator: &str, reply: &str) -> Result<f64, PipelineError> {
    let price = parse_price(reply).ok_or_else(|| {
        PipelineError::estimation(estimator, format!("no price in model reply {reply:?}"))
    })?;
    if !price.is_finite() || price < 0.0 {
        return Err(PipelineError::estimation(estimator, format!("invalid price {price}")));
    }
    Ok(price)
}
