//! Billing subscriptions and the derived "has an active subscription" flag.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Status reported by the billing provider.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SubscriptionStatus {
  Trialing,
  Active,
  Canceled,
  /// Any other provider status (`past_due`, `incomplete`, ...).
  #[serde(other)]
  Unknown,
}

/// One record in a user's subscription collection.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Subscription {
  pub id:                   String,
  pub status:               SubscriptionStatus,
  #[serde(default)]
  pub cancel_at_period_end: bool,
  #[serde(default)]
  pub current_period_end:   Option<DateTime<Utc>>,
}

impl Subscription {
  /// Trialing and active records count; so does a cancellation that only
  /// takes effect at the end of the paid period.
  pub fn grants_access(&self) -> bool {
    match self.status {
      SubscriptionStatus::Trialing | SubscriptionStatus::Active => true,
      SubscriptionStatus::Canceled => self.cancel_at_period_end,
      SubscriptionStatus::Unknown => false,
    }
  }
}

pub fn has_active_subscription(subscriptions: &[Subscription]) -> bool {
  subscriptions.iter().any(Subscription::grants_access)
}

#[cfg(test)]
mod tests {
  use serde_json::json;

  use super::*;

  fn subs(raw: serde_json::Value) -> Vec<Subscription> { serde_json::from_value(raw).unwrap() }

  #[test]
  fn active_status_counts() {
    assert!(has_active_subscription(&subs(json!([{ "id": "s1", "status": "active" }]))));
    assert!(has_active_subscription(&subs(json!([{ "id": "s1", "status": "trialing" }]))));
  }

  #[test]
  fn canceled_counts_only_until_period_end() {
    assert!(!has_active_subscription(&subs(json!([
      { "id": "s1", "status": "canceled", "cancel_at_period_end": false }
    ]))));
    assert!(has_active_subscription(&subs(json!([
      { "id": "s1", "status": "canceled", "cancel_at_period_end": true }
    ]))));
  }

  #[test]
  fn no_records_means_inactive() {
    assert!(!has_active_subscription(&[]));
  }

  #[test]
  fn unknown_statuses_never_count() {
    let records = subs(json!([{ "id": "s1", "status": "past_due" }]));
    assert_eq!(records[0].status, SubscriptionStatus::Unknown);
    assert!(!has_active_subscription(&records));
  }

  #[test]
  fn any_matching_record_is_enough() {
    assert!(has_active_subscription(&subs(json!([
      { "id": "old", "status": "canceled" },
      { "id": "new", "status": "active" },
    ]))));
  }
}
