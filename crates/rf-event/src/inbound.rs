//! Inbound submissions from the external event source
//!
//! Accepts `{ "type": "buy" | "sell", "contributorId", "amount", ... }` plus
//! the legacy ingest field names (`wallet`, `amountUsd`,
//! `name`, `txSig`). Anything that does not validate is rejected before it
//! reaches the state writer.

use rf_core::{GameConfig, Money, RfError, RfResult};
use rf_state::{ContributionEvent, Mutation, WithdrawalEvent};
use serde::Deserialize;
use serde_json::Value;

use crate::event::GameEvent;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawSubmission {
    #[serde(rename = "type")]
    kind: Option<String>,
    #[serde(default, alias = "wallet", alias = "buyer", alias = "seller")]
    contributor_id: Option<String>,
    #[serde(default, alias = "amountUsd")]
    amount: Option<Value>,
    #[serde(default, alias = "name", alias = "buyerName")]
    display_name: Option<String>,
    #[serde(default, alias = "txSig")]
    source_ref: Option<String>,
}

/// A validated buy or sell
#[derive(Debug, Clone, PartialEq)]
pub enum Submission {
    Buy(ContributionEvent),
    Sell(WithdrawalEvent),
}

impl Submission {
    pub fn from_json(raw: &str) -> RfResult<Self> {
        let value: Value = serde_json::from_str(raw)
            .map_err(|e| RfError::Validation(format!("body is not JSON: {e}")))?;
        Self::from_value(value)
    }

    pub fn from_value(value: Value) -> RfResult<Self> {
        let raw: RawSubmission = serde_json::from_value(value)
            .map_err(|e| RfError::Validation(format!("malformed submission: {e}")))?;

        let kind = raw.kind.as_deref().unwrap_or_default();
        if kind != "buy" && kind != "sell" {
            return Err(RfError::Validation(format!(
                "expected type 'buy' or 'sell', got '{kind}'"
            )));
        }

        let contributor_id = raw
            .contributor_id
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .ok_or_else(|| RfError::Validation("contributorId is required".into()))?;

        let amount = match raw.amount.as_ref() {
            Some(v) => parse_amount(v)?,
            None => return Err(RfError::Validation("amount is required".into())),
        };

        let source_ref = raw.source_ref.filter(|s| !s.is_empty());

        Ok(if kind == "buy" {
            Self::Buy(ContributionEvent {
                contributor_id,
                display_name: raw.display_name.filter(|s| !s.is_empty()),
                amount,
                source_ref,
            })
        } else {
            Self::Sell(WithdrawalEvent {
                contributor_id,
                amount,
                source_ref,
            })
        })
    }

    pub fn kind(&self) -> &'static str {
        match self {
            Self::Buy(_) => "buy",
            Self::Sell(_) => "sell",
        }
    }

    pub fn amount(&self) -> Money {
        match self {
            Self::Buy(ev) => ev.amount,
            Self::Sell(ev) => ev.amount,
        }
    }

    pub fn to_mutation(&self) -> Mutation {
        match self {
            Self::Buy(ev) => Mutation::Contribution(ev.clone()),
            Self::Sell(ev) => Mutation::Withdrawal(ev.clone()),
        }
    }

    pub fn to_event(&self) -> GameEvent {
        match self {
            Self::Buy(ev) => GameEvent::Buy(ev.clone()),
            Self::Sell(ev) => GameEvent::Sell(ev.clone()),
        }
    }
}

/// Optional bounds on buy amounts. Sells are never bounded.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct BuyLimits {
    pub min: Option<Money>,
    pub max: Option<Money>,
}

impl BuyLimits {
    pub fn check(&self, submission: &Submission) -> RfResult<()> {
        let Submission::Buy(ev) = submission else {
            return Ok(());
        };
        if let Some(min) = self.min.filter(|min| ev.amount < *min) {
            return Err(RfError::Validation(format!(
                "buy amount {} is below the minimum of {min}",
                ev.amount
            )));
        }
        if let Some(max) = self.max.filter(|max| ev.amount > *max) {
            return Err(RfError::Validation(format!(
                "buy amount {} is above the maximum of {max}",
                ev.amount
            )));
        }
        Ok(())
    }
}

impl From<&GameConfig> for BuyLimits {
    fn from(config: &GameConfig) -> Self {
        Self {
            min: config.min_buy_amount,
            max: config.max_buy_amount,
        }
    }
}

/// Parse an amount given as a JSON number or numeric string.
///
/// Must be finite and strictly positive.
pub fn parse_amount(value: &Value) -> RfResult<Money> {
    let amount = match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse::<f64>().ok(),
        _ => None,
    }
    .ok_or_else(|| RfError::Validation(format!("amount is not a number: {value}")))?;

    if !amount.is_finite() {
        return Err(RfError::Validation("amount must be finite".into()));
    }
    if amount <= 0.0 {
        return Err(RfError::Validation(format!(
            "amount must be greater than zero, got {amount}"
        )));
    }
    Ok(amount)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use serde_json::json;

    #[test]
    fn test_parse_buy() {
        let sub = Submission::from_json(
            r#"{ "type": "buy", "contributorId": "7xKq", "amount": 12.5, "displayName": "degen" }"#,
        )
        .unwrap();
        match sub {
            Submission::Buy(ev) => {
                assert_eq!(ev.contributor_id, "7xKq");
                assert_eq!(ev.display_name.as_deref(), Some("degen"));
                assert_relative_eq!(ev.amount, 12.5);
            }
            other => panic!("expected buy, got {other:?}"),
        }
    }

    #[test]
    fn test_parse_sell_with_legacy_names() {
        let sub = Submission::from_value(json!({
            "type": "sell",
            "wallet": "PaperHands",
            "amountUsd": "40.25",
            "txSig": "5sig"
        }))
        .unwrap();
        assert_eq!(sub.kind(), "sell");
        assert_relative_eq!(sub.amount(), 40.25);
        match sub {
            Submission::Sell(ev) => {
                assert_eq!(ev.contributor_id, "PaperHands");
                assert_eq!(ev.source_ref.as_deref(), Some("5sig"));
            }
            other => panic!("expected sell, got {other:?}"),
        }
    }

    #[test]
    fn test_rejects_bad_amounts() {
        for amount in [json!(-1), json!(0), json!("abc"), json!(null), json!("NaN"), json!("inf"), json!([1])] {
            let err = Submission::from_value(json!({
                "type": "buy",
                "contributorId": "x",
                "amount": amount
            }))
            .unwrap_err();
            assert!(matches!(err, RfError::Validation(_)), "amount {amount} accepted");
        }
    }

    #[test]
    fn test_rejects_missing_fields() {
        assert!(Submission::from_value(json!({ "type": "buy", "amount": 1 })).is_err());
        assert!(Submission::from_value(json!({ "type": "buy", "contributorId": " ", "amount": 1 })).is_err());
        assert!(Submission::from_value(json!({ "contributorId": "x", "amount": 1 })).is_err());
        assert!(Submission::from_value(json!({ "type": "win", "contributorId": "x", "amount": 1 })).is_err());
        assert!(Submission::from_value(json!({ "type": "buy", "contributorId": "x" })).is_err());
        assert!(Submission::from_json("not json").is_err());
    }

    #[test]
    fn test_buy_limits() {
        let limits = BuyLimits {
            min: Some(1.0),
            max: Some(500.0),
        };
        let buy = |amount: f64| {
            Submission::from_value(json!({ "type": "buy", "contributorId": "x", "amount": amount }))
                .unwrap()
        };

        limits.check(&buy(1.0)).unwrap();
        limits.check(&buy(500.0)).unwrap();
        assert!(matches!(limits.check(&buy(0.5)), Err(RfError::Validation(_))));
        assert!(matches!(limits.check(&buy(500.01)), Err(RfError::Validation(_))));

        let big_sell = Submission::from_value(json!({
            "type": "sell", "contributorId": "x", "amount": 9_999
        }))
        .unwrap();
        limits.check(&big_sell).unwrap();
        BuyLimits::default().check(&buy(1e9)).unwrap();
    }

    #[test]
    fn test_to_mutation_and_event() {
        let sub = Submission::from_value(json!({
            "type": "buy", "contributorId": "x", "amount": 3
        }))
        .unwrap();
        assert!(matches!(sub.to_mutation(), Mutation::Contribution(_)));
        assert_eq!(sub.to_event().kind(), "buy");
    }
}
