//! Alert delivery.
//!
//! The planner hands its best qualifying opportunity to a `Notifier`.
//! Delivery is best-effort: a failure is reported back as
//! `PipelineError::DeliveryFailure`, logged by the caller, and never
//! changes what the run returns.

pub mod pushover;

use async_trait::async_trait;
use tracing::info;

use crate::error::PipelineError;
use crate::types::{truncate, Opportunity};

/// Characters of the product description included in the fixed alert.
const ALERT_DESCRIPTION_CHARS: usize = 10;

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait Notifier: Send + Sync {
    async fn alert(&self, opportunity: &Opportunity) -> Result<(), PipelineError>;
}

/// Fixed one-line alert text for an opportunity.
pub fn alert_text(opportunity: &Opportunity) -> String {
    format!(
        "Deal Alert! Price=${:.2}, Estimate=${:.2}, Discount=${:.2} :{}... {}",
        opportunity.deal().price,
        opportunity.estimate(),
        opportunity.discount(),
        truncate(&opportunity.deal().product_description, ALERT_DESCRIPTION_CHARS),
        opportunity.url()
    )
}

/// Dry-run notifier: writes the alert to the log instead of sending it.
#[derive(Debug, Default)]
pub struct LogNotifier;

#[async_trait]
impl Notifier for LogNotifier {
    async fn alert(&self, opportunity: &Opportunity) -> Result<(), PipelineError> {
        info!(
            url = %opportunity.url(),
            discount = format!("${:.2}", opportunity.discount()),
            alert = %alert_text(opportunity),
            "[DRY RUN] Would send alert"
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Deal;

    #[test]
    fn test_alert_text_format() {
        let deal = Deal {
            product_description: "Sony WH-1000XM4 noise cancelling headphones".into(),
            price: 228.0,
            url: "https://deals.example.com/sony".into(),
        };
        let opp = Opportunity::new(deal, 349.5);
        assert_eq!(
            alert_text(&opp),
            "Deal Alert! Price=$228.00, Estimate=$349.50, Discount=$121.50 :Sony WH-10... https://deals.example.com/sony"
        );
    }

    #[test]
    fn test_alert_text_short_description() {
        let deal = Deal {
            product_description: "Mug".into(),
            price: 1.0,
            url: "u".into(),
        };
        let text = alert_text(&Opportunity::new(deal, 60.0));
        assert!(text.ends_with(":Mug... u"));
    }

    #[tokio::test]
    async fn test_log_notifier_always_succeeds() {
        let opp = Opportunity::new(Deal::sample("https://a", 10.0), 100.0);
        assert!(LogNotifier.alert(&opp).await.is_ok());
    }
}
