// 💰 Pricing Engine - unit costs, margins, and price elasticity of demand
// Pure numeric functions: no I/O, no state, safe to call from anywhere

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Production days assumed per month when converting daily figures
pub const DAYS_PER_MONTH: f64 = 30.0;

/// Average weeks per month, used to project weekly sales totals
pub const WEEKS_PER_MONTH: f64 = 4.3;

/// Half-width of the fuzzy bands around "unit elastic" and "perfectly inelastic"
const UNIT_BAND_TOLERANCE: f64 = 0.1;

// ============================================================================
// ERRORS
// ============================================================================

/// Rejected inputs. Distinct from a "not computable" elasticity, which is a
/// valid business outcome and comes back as `Ok(None)`.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum PricingError {
    #[error("invalid input: {0}")]
    InvalidInput(String),
}

fn require_finite(field: &str, value: f64) -> Result<(), PricingError> {
    if value.is_finite() {
        Ok(())
    } else {
        Err(PricingError::InvalidInput(format!(
            "{} must be a finite number, got {}",
            field, value
        )))
    }
}

fn require_non_negative(field: &str, value: f64) -> Result<(), PricingError> {
    require_finite(field, value)?;
    if value < 0.0 {
        return Err(PricingError::InvalidInput(format!(
            "{} cannot be negative, got {}",
            field, value
        )));
    }
    Ok(())
}

// ============================================================================
// COST & PRICE
// ============================================================================

/// Cost of producing one unit: per-unit ingredient cost plus the monthly
/// labor cost spread over a month of production.
pub fn unit_cost(
    ingredient_cost_per_unit: f64,
    monthly_labor_cost: f64,
    daily_production_units: f64,
) -> Result<f64, PricingError> {
    require_non_negative("ingredient cost", ingredient_cost_per_unit)?;
    require_non_negative("monthly labor cost", monthly_labor_cost)?;
    require_finite("daily production", daily_production_units)?;

    if daily_production_units <= 0.0 {
        return Err(PricingError::InvalidInput(format!(
            "daily production must be positive, got {}",
            daily_production_units
        )));
    }

    let monthly_production = daily_production_units * DAYS_PER_MONTH;
    let operational_cost_per_unit = monthly_labor_cost / monthly_production;

    Ok(operational_cost_per_unit + ingredient_cost_per_unit)
}

/// Suggested selling price: unit cost marked up by a margin percentage.
/// The margin itself is not bounded here; whether a negative margin makes
/// business sense is the caller's call.
pub fn final_price(cost_per_unit: f64, margin_percent: f64) -> Result<f64, PricingError> {
    require_finite("margin percent", margin_percent)?;
    require_finite("unit cost", cost_per_unit)?;
    if cost_per_unit <= 0.0 {
        return Err(PricingError::InvalidInput(format!(
            "unit cost must be positive, got {}",
            cost_per_unit
        )));
    }

    Ok(cost_per_unit * (1.0 + margin_percent / 100.0))
}

/// Profit for a batch at the given price and unit cost.
pub fn projected_profit(
    cost_per_unit: f64,
    price: f64,
    quantity_sold: f64,
) -> Result<f64, PricingError> {
    require_finite("unit cost", cost_per_unit)?;
    require_finite("price", price)?;
    require_finite("quantity sold", quantity_sold)?;

    Ok((price - cost_per_unit) * quantity_sold)
}

/// Month-equivalent volume for a daily sales figure.
pub fn monthly_volume(daily_units: f64) -> f64 {
    daily_units * DAYS_PER_MONTH
}

// ============================================================================
// ELASTICITY
// ============================================================================

/// Price elasticity of demand between two (quantity, price) observations.
///
/// Uses the midpoint (arc) formula: both deltas are taken against the
/// average of start and end rather than the start alone, so reversing the
/// direction of a price move yields the same value. That keeps repeated
/// price experiments comparable over time.
///
/// Returns `Ok(None)` when the inputs are degenerate - zero baseline
/// quantity, zero baseline price, or no price change at all. That is
/// "insufficient data", not an error.
pub fn elasticity(
    quantity_start: f64,
    quantity_end: f64,
    price_start: f64,
    price_end: f64,
) -> Result<Option<f64>, PricingError> {
    require_non_negative("start quantity", quantity_start)?;
    require_non_negative("end quantity", quantity_end)?;
    require_non_negative("start price", price_start)?;
    require_non_negative("end price", price_end)?;

    if quantity_start == 0.0 || price_start == 0.0 || price_start == price_end {
        return Ok(None);
    }

    let q_avg = (quantity_start + quantity_end) / 2.0;
    let p_avg = (price_start + price_end) / 2.0;

    let epd = ((quantity_end - quantity_start) / q_avg) / ((price_end - price_start) / p_avg);

    Ok(Some(epd))
}

// ============================================================================
// CLASSIFICATION
// ============================================================================

/// Business-facing severity of an elasticity reading
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Category {
    Warning,
    Info,
    Success,
}

impl Category {
    pub fn as_str(&self) -> &'static str {
        match self {
            Category::Warning => "warning",
            Category::Info => "info",
            Category::Success => "success",
        }
    }
}

/// Elasticity reading translated into advice for the shop owner
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Classification {
    pub category: Category,
    pub message: &'static str,
}

/// Map an elasticity value to a category and an advice line.
///
/// The ladder is evaluated top to bottom and the first match wins. The two
/// fuzzy bands (near -1, near 0) sit below the strict inequalities they can
/// overlap at the edges, so e.g. -1.05 reads as warning, not unit elastic.
/// Reorder at your peril: the ordering is part of the contract.
pub fn classify(epd: Option<f64>) -> Classification {
    let epd = match epd {
        Some(value) => value,
        None => {
            return Classification {
                category: Category::Info,
                message: "Not enough data to measure elasticity yet. Record a price change and its sales first.",
            }
        }
    };

    if epd < -1.0 {
        Classification {
            category: Category::Warning,
            message: "Customers are very price-sensitive. A price increase could cut sales hard; keep prices steady or move in small steps.",
        }
    } else if (epd + 1.0).abs() < UNIT_BAND_TOLERANCE {
        Classification {
            category: Category::Info,
            message: "Sales respond proportionally to price changes. Plan any adjustment carefully.",
        }
    } else if -1.0 < epd && epd < 0.0 {
        Classification {
            category: Category::Success,
            message: "Customers are loyal. There is room to adjust prices while keeping sales stable.",
        }
    } else if epd.abs() < UNIT_BAND_TOLERANCE {
        Classification {
            category: Category::Info,
            message: "Demand barely moves with price. Prices can be adjusted with confidence.",
        }
    } else if epd > 0.0 {
        Classification {
            category: Category::Success,
            message: "Higher prices came with higher sales. Customers may be reading the product as premium.",
        }
    } else {
        Classification {
            category: Category::Info,
            message: "Inconclusive reading. Keep collecting observations.",
        }
    }
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn approx(a: f64, b: f64) -> bool {
        (a - b).abs() < 1e-9
    }

    #[test]
    fn test_unit_cost() {
        // 3000 / (100 * 30) = 1.0 operational, + 2.5 ingredients
        let cost = unit_cost(2.5, 3000.0, 100.0).unwrap();
        assert!(approx(cost, 3.5));
    }

    #[test]
    fn test_unit_cost_rejects_zero_production() {
        assert!(matches!(
            unit_cost(2.5, 3000.0, 0.0),
            Err(PricingError::InvalidInput(_))
        ));
        assert!(matches!(
            unit_cost(2.5, 3000.0, -10.0),
            Err(PricingError::InvalidInput(_))
        ));
    }

    #[test]
    fn test_unit_cost_rejects_non_finite() {
        assert!(unit_cost(f64::NAN, 3000.0, 100.0).is_err());
        assert!(unit_cost(2.5, f64::INFINITY, 100.0).is_err());
        assert!(unit_cost(2.5, 3000.0, f64::NEG_INFINITY).is_err());
    }

    #[test]
    fn test_final_price() {
        let price = final_price(3.5, 30.0).unwrap();
        assert!(approx(price, 4.55));
    }

    #[test]
    fn test_final_price_allows_negative_margin() {
        // Selling at a loss is the caller's decision, not an input error
        let price = final_price(4.0, -25.0).unwrap();
        assert!(approx(price, 3.0));
    }

    #[test]
    fn test_final_price_rejects_non_positive_cost() {
        assert!(final_price(0.0, 30.0).is_err());
        assert!(final_price(-3.5, 30.0).is_err());
    }

    #[test]
    fn test_elasticity_arc_formula() {
        // q: 100 -> 80, p: 4 -> 5 gives exactly -1 on averaged bases
        let epd = elasticity(100.0, 80.0, 4.0, 5.0).unwrap().unwrap();
        assert!(approx(epd, -1.0));
    }

    #[test]
    fn test_elasticity_symmetric_in_direction() {
        let forward = elasticity(100.0, 80.0, 4.0, 5.0).unwrap().unwrap();
        let reverse = elasticity(80.0, 100.0, 5.0, 4.0).unwrap().unwrap();
        assert!(approx(forward, reverse));
    }

    #[test]
    fn test_elasticity_no_quantity_change_is_zero() {
        let epd = elasticity(100.0, 100.0, 5.0, 6.0).unwrap().unwrap();
        assert!(approx(epd, 0.0));
    }

    #[test]
    fn test_elasticity_degenerate_inputs() {
        // Price unchanged
        assert_eq!(elasticity(100.0, 110.0, 5.0, 5.0).unwrap(), None);
        // Zero baseline quantity
        assert_eq!(elasticity(0.0, 50.0, 5.0, 6.0).unwrap(), None);
        // Zero baseline price
        assert_eq!(elasticity(100.0, 110.0, 0.0, 6.0).unwrap(), None);
    }

    #[test]
    fn test_elasticity_rejects_bad_inputs() {
        assert!(elasticity(f64::NAN, 110.0, 5.0, 6.0).is_err());
        assert!(elasticity(100.0, 110.0, 5.0, f64::INFINITY).is_err());
        assert!(elasticity(-100.0, 110.0, 5.0, 6.0).is_err());
        assert!(elasticity(100.0, 110.0, -5.0, 6.0).is_err());
    }

    #[test]
    fn test_classify_bands() {
        assert_eq!(classify(Some(-1.5)).category, Category::Warning);
        assert_eq!(classify(Some(-1.0)).category, Category::Info); // unit elastic
        assert_eq!(classify(Some(-0.5)).category, Category::Success);
        assert_eq!(classify(Some(0.05)).category, Category::Info); // ~perfectly inelastic
        assert_eq!(classify(Some(2.0)).category, Category::Success);
        assert_eq!(classify(None).category, Category::Info);
    }

    #[test]
    fn test_classify_ordering_at_boundaries() {
        // -1.05 satisfies both `< -1` and `|epd + 1| < 0.1`; the strict
        // band is checked first, so it must come out as warning
        assert_eq!(classify(Some(-1.05)).category, Category::Warning);
        // -0.95 is inside the fuzzy unit band and NOT < -1
        assert_eq!(classify(Some(-0.95)).category, Category::Info);
        // -0.05 hits the inelastic success band before the fuzzy zero band
        assert_eq!(classify(Some(-0.05)).category, Category::Success);
    }

    #[test]
    fn test_classify_is_pure() {
        let first = classify(Some(-0.42));
        let second = classify(Some(-0.42));
        assert_eq!(first, second);
    }

    #[test]
    fn test_projected_profit() {
        let profit = projected_profit(3.5, 5.0, 1000.0).unwrap();
        assert!(approx(profit, 1500.0));
    }

    #[test]
    fn test_monthly_volume() {
        assert!(approx(monthly_volume(40.0), 1200.0));
    }
}
