use serde::{Deserialize, Serialize};

use crate::error::{BoardError, ConfigError};

/// Which per-item price rule a board runs with.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PriceModel {
    /// Cost is always `per_item_vnd * quantity`.
    #[default]
    Fixed,
    /// The poster proposes a cost that must fall inside a per-item band.
    Range,
}

/// Cost of a job in both currencies, computed once at submission.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Cost {
    pub vnd: i64,
    pub usd: f64,
}

/// Per-item price rule plus the VND/USD exchange rate.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PricingPolicy {
    #[serde(default)]
    pub model: PriceModel,

    /// VND per 1 USD.
    #[serde(default = "default_exchange_rate")]
    pub exchange_rate: f64,

    #[serde(default = "default_per_item_vnd")]
    pub per_item_vnd: i64,

    #[serde(default = "default_min_per_item_vnd")]
    pub min_per_item_vnd: i64,

    #[serde(default = "default_max_per_item_vnd")]
    pub max_per_item_vnd: i64,
}

fn default_exchange_rate() -> f64 {
    25_000.0
}

fn default_per_item_vnd() -> i64 {
    5_000
}

fn default_min_per_item_vnd() -> i64 {
    5_000
}

fn default_max_per_item_vnd() -> i64 {
    10_000
}

impl Default for PricingPolicy {
    fn default() -> Self {
        Self {
            model: PriceModel::default(),
            exchange_rate: default_exchange_rate(),
            per_item_vnd: default_per_item_vnd(),
            min_per_item_vnd: default_min_per_item_vnd(),
            max_per_item_vnd: default_max_per_item_vnd(),
        }
    }
}

impl PricingPolicy {
    pub fn fixed(per_item_vnd: i64, exchange_rate: f64) -> Self {
        Self {
            model: PriceModel::Fixed,
            exchange_rate,
            per_item_vnd,
            ..Self::default()
        }
    }

    pub fn range(min_per_item_vnd: i64, max_per_item_vnd: i64, exchange_rate: f64) -> Self {
        Self {
            model: PriceModel::Range,
            exchange_rate,
            min_per_item_vnd,
            max_per_item_vnd,
            ..Self::default()
        }
    }

    /// Checks the configured values are usable.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(self.exchange_rate.is_finite() && self.exchange_rate > 0.0) {
            return Err(ConfigError::Invalid(format!(
                "pricing.exchange_rate must be positive, got {}",
                self.exchange_rate
            )));
        }
        match self.model {
            PriceModel::Fixed if self.per_item_vnd <= 0 => Err(ConfigError::Invalid(format!(
                "pricing.per_item_vnd must be positive, got {}",
                self.per_item_vnd
            ))),
            PriceModel::Range if self.min_per_item_vnd <= 0 => {
                Err(ConfigError::Invalid(format!(
                    "pricing.min_per_item_vnd must be positive, got {}",
                    self.min_per_item_vnd
                )))
            }
            PriceModel::Range if self.min_per_item_vnd > self.max_per_item_vnd => {
                Err(ConfigError::Invalid(format!(
                    "pricing.min_per_item_vnd ({}) exceeds pricing.max_per_item_vnd ({})",
                    self.min_per_item_vnd, self.max_per_item_vnd
                )))
            }
            _ => Ok(()),
        }
    }

    /// Prices a submission under the configured model.
    ///
    /// Under `Fixed` any proposed cost is ignored; under `Range` a proposed
    /// cost is required and must fall inside the band.
    pub fn quote(&self, quantity: i64, proposed_vnd: Option<i64>) -> Result<Cost, BoardError> {
        match self.model {
            PriceModel::Fixed => self.compute_cost(quantity),
            PriceModel::Range => {
                let proposed = proposed_vnd.ok_or_else(|| {
                    BoardError::Validation("costVND is required".to_string())
                })?;
                let usd = self.validate_cost(quantity, proposed)?;
                Ok(Cost { vnd: proposed, usd })
            }
        }
    }

    /// Fixed-price cost: `per_item_vnd * quantity`.
    pub fn compute_cost(&self, quantity: i64) -> Result<Cost, BoardError> {
        check_quantity(quantity)?;
        let vnd = self
            .per_item_vnd
            .checked_mul(quantity)
            .ok_or_else(|| BoardError::Validation(format!("quantity {quantity} is too large")))?;
        Ok(Cost {
            vnd,
            usd: self.to_usd(vnd),
        })
    }

    /// Range-model check of a proposed cost; returns its USD equivalent.
    pub fn validate_cost(&self, quantity: i64, proposed_vnd: i64) -> Result<f64, BoardError> {
        check_quantity(quantity)?;
        let too_large = || BoardError::Validation(format!("quantity {quantity} is too large"));
        let min_total = self.min_per_item_vnd.checked_mul(quantity).ok_or_else(too_large)?;
        let max_total = self.max_per_item_vnd.checked_mul(quantity).ok_or_else(too_large)?;

        if !(min_total..=max_total).contains(&proposed_vnd) {
            return Err(BoardError::Validation(format!(
                "invalid cost: {proposed_vnd} VND is outside {min_total}..={max_total} VND for quantity {quantity}"
            )));
        }
        Ok(self.to_usd(proposed_vnd))
    }

    /// `round(vnd / exchange_rate, 2)`.
    pub fn to_usd(&self, vnd: i64) -> f64 {
        round_cents(vnd as f64 / self.exchange_rate)
    }
}

/// Parses a quantity typed by a user. Non-integers and values below 1 are
/// rejected.
pub fn parse_quantity(raw: &str) -> Result<i64, BoardError> {
    let quantity = raw
        .trim()
        .parse::<i64>()
        .map_err(|_| BoardError::Validation(format!("invalid quantity: {raw:?}")))?;
    check_quantity(quantity)?;
    Ok(quantity)
}

fn check_quantity(quantity: i64) -> Result<(), BoardError> {
    if quantity < 1 {
        return Err(BoardError::Validation(format!(
            "quantity must be >= 1, got {quantity}"
        )));
    }
    Ok(())
}

fn round_cents(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

/// Renders a USD amount with exactly two decimals.
pub fn format_usd(usd: f64) -> String {
    format!("{usd:.2}")
}
