//! Cart pricing: line totals, cart aggregates, platform-fee tiers and the
//! checkout breakdown.
//!
//! Every function here is pure. Callers validate quantities and product
//! references before reaching this module.

use std::fmt;
use std::str::FromStr;

use bigdecimal::{BigDecimal, RoundingMode};
use serde::Serialize;
use thiserror::Error;
use utoipa::ToSchema;

use super::cart::CartItem;

/// Unit price below which the cheaper protection plan applies.
const PROTECTION_PRICE_THRESHOLD: i64 = 15_000;
const PROTECTION_PRICE_LOW: i64 = 499;
const PROTECTION_PRICE_HIGH: i64 = 999;

fn zero() -> BigDecimal {
    BigDecimal::from(0)
}

/// Round half-up to a whole currency unit.
pub fn round_currency(amount: &BigDecimal) -> BigDecimal {
    amount.with_scale_round(0, RoundingMode::HalfUp)
}

/// Protection-plan price used when a buyer selects the add-on without an
/// explicit price.
pub fn default_protection_price(unit_price: &BigDecimal) -> BigDecimal {
    if *unit_price < BigDecimal::from(PROTECTION_PRICE_THRESHOLD) {
        BigDecimal::from(PROTECTION_PRICE_LOW)
    } else {
        BigDecimal::from(PROTECTION_PRICE_HIGH)
    }
}

// ── Fee policies ─────────────────────────────────────────────────────────────

/// One row of a fee table. Both bounds are inclusive; `None` is unbounded.
#[derive(Debug, Clone, PartialEq)]
pub struct FeeTier {
    pub min: Option<BigDecimal>,
    pub max: Option<BigDecimal>,
    pub percentage: u32,
}

impl FeeTier {
    fn up_to(max: i64, percentage: u32) -> Self {
        Self {
            min: None,
            max: Some(BigDecimal::from(max)),
            percentage,
        }
    }

    fn contains(&self, amount: &BigDecimal) -> bool {
        let above_min = self.min.as_ref().map_or(true, |min| amount >= min);
        let below_max = self.max.as_ref().map_or(true, |max| amount <= max);
        above_min && below_max
    }
}

/// An ordered fee table. The first matching tier wins; amounts matched by no
/// tier pay `fallback_percentage`.
#[derive(Debug, Clone, PartialEq)]
pub struct FeePolicy {
    pub tiers: Vec<FeeTier>,
    pub fallback_percentage: u32,
}

#[derive(Debug, Error, PartialEq)]
#[error("invalid fee policy '{input}': {reason}")]
pub struct FeePolicyParseError {
    pub input: String,
    pub reason: String,
}

impl FeePolicy {
    /// Fee table applied to a cart subtotal at checkout. Each row starts
    /// where the previous one ends so fractional subtotals never skip a tier.
    pub fn cart_checkout() -> Self {
        Self {
            tiers: vec![
                FeeTier::up_to(2_000, 30),
                FeeTier::up_to(5_000, 28),
                FeeTier::up_to(10_000, 25),
                FeeTier::up_to(15_000, 20),
            ],
            fallback_percentage: 15,
        }
    }

    /// Fee table applied to a listing price when a seller creates a listing.
    pub fn listing() -> Self {
        Self {
            tiers: vec![
                FeeTier::up_to(2_000, 30),
                FeeTier::up_to(5_000, 28),
                FeeTier::up_to(10_000, 25),
                FeeTier::up_to(15_000, 20),
            ],
            fallback_percentage: 15,
        }
    }

    /// Flat fee for listings created from the admin console.
    pub fn admin_listing() -> Self {
        Self::flat(10)
    }

    pub fn flat(percentage: u32) -> Self {
        Self {
            tiers: Vec::new(),
            fallback_percentage: percentage,
        }
    }

    pub fn percentage_for(&self, amount: &BigDecimal) -> u32 {
        self.tiers
            .iter()
            .find(|tier| tier.contains(amount))
            .map_or(self.fallback_percentage, |tier| tier.percentage)
    }

    /// `round(amount * percentage / 100)`
    pub fn fee_for(&self, amount: &BigDecimal) -> (u32, BigDecimal) {
        let percentage = self.percentage_for(amount);
        let scaled = amount * &BigDecimal::from(percentage);
        let fee = round_currency(&(scaled / BigDecimal::from(100)));
        (percentage, fee)
    }
}

/// Parses `..=2000:30,2001..=5000:28,15001..:15,*:15`. A `*` entry sets the
/// fallback percentage; without one the last tier's percentage is used.
impl FromStr for FeePolicy {
    type Err = FeePolicyParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let fail = |reason: &str| FeePolicyParseError {
            input: s.to_string(),
            reason: reason.to_string(),
        };

        let mut tiers = Vec::new();
        let mut fallback = None;

        for entry in s.split(',').map(str::trim).filter(|e| !e.is_empty()) {
            let (range, pct) = entry
                .rsplit_once(':')
                .ok_or_else(|| fail("expected <range>:<percentage>"))?;
            let percentage: u32 = pct
                .trim()
                .parse()
                .map_err(|_| fail("percentage must be a whole number"))?;
            if percentage > 100 {
                return Err(fail("percentage must not exceed 100"));
            }

            let range = range.trim();
            if range == "*" {
                fallback = Some(percentage);
                continue;
            }

            let (lo, hi) = range
                .split_once("..")
                .ok_or_else(|| fail("range must contain '..'"))?;
            let hi = hi.trim_start_matches('=');
            let parse_bound = |b: &str| -> Result<Option<BigDecimal>, FeePolicyParseError> {
                let b = b.trim();
                if b.is_empty() {
                    Ok(None)
                } else {
                    BigDecimal::from_str(b)
                        .map(Some)
                        .map_err(|_| fail("range bound must be a number"))
                }
            };
            tiers.push(FeeTier {
                min: parse_bound(lo)?,
                max: parse_bound(hi)?,
                percentage,
            });
        }

        let fallback_percentage = fallback
            .or_else(|| tiers.last().map(|t| t.percentage))
            .ok_or_else(|| fail("policy has no tiers"))?;

        Ok(Self {
            tiers,
            fallback_percentage,
        })
    }
}

impl fmt::Display for FeePolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for tier in &self.tiers {
            let lo = tier.min.as_ref().map(ToString::to_string).unwrap_or_default();
            let hi = tier.max.as_ref().map(ToString::to_string).unwrap_or_default();
            write!(f, "{lo}..={hi}:{},", tier.percentage)?;
        }
        write!(f, "*:{}", self.fallback_percentage)
    }
}

// ── Configuration ────────────────────────────────────────────────────────────

#[derive(Debug, Clone)]
pub struct PricingConfig {
    pub checkout_fee: FeePolicy,
    pub listing_fee: FeePolicy,
    pub gst_rate: BigDecimal,
    pub shipping_charge: BigDecimal,
}

impl Default for PricingConfig {
    fn default() -> Self {
        Self {
            checkout_fee: FeePolicy::cart_checkout(),
            listing_fee: FeePolicy::listing(),
            gst_rate: BigDecimal::new(18.into(), 2),
            shipping_charge: BigDecimal::from(1),
        }
    }
}

// ── Cart aggregates ──────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq)]
pub struct CartTotals {
    pub subtotal: BigDecimal,
    pub protection_plan_total: BigDecimal,
    pub total_item_count: i64,
    pub grand_total: BigDecimal,
}

impl Default for CartTotals {
    fn default() -> Self {
        Self {
            subtotal: zero(),
            protection_plan_total: zero(),
            total_item_count: 0,
            grand_total: zero(),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct PricedItems {
    pub items: Vec<CartItem>,
    pub totals: CartTotals,
}

/// `(unit_price * quantity, protection price * quantity if selected)`
fn line_amounts(item: &CartItem) -> (BigDecimal, BigDecimal) {
    let quantity = BigDecimal::from(item.quantity);
    let line_subtotal = &item.unit_price * &quantity;
    let line_protection = if item.protection_plan.selected {
        &item.protection_plan.price * &quantity
    } else {
        zero()
    };
    (line_subtotal, line_protection)
}

pub fn line_total(item: &CartItem) -> BigDecimal {
    let (line_subtotal, line_protection) = line_amounts(item);
    line_subtotal + line_protection
}

/// Recompute every line total and the cart aggregates from `items`.
pub fn recompute(items: &[CartItem]) -> PricedItems {
    let mut totals = CartTotals::default();
    let mut priced = Vec::with_capacity(items.len());

    for item in items {
        let (line_subtotal, line_protection) = line_amounts(item);

        totals.subtotal += &line_subtotal;
        totals.protection_plan_total += &line_protection;
        totals.total_item_count += i64::from(item.quantity);

        priced.push(item.clone().with_line_total(line_subtotal + line_protection));
    }

    totals.grand_total = &totals.subtotal + &totals.protection_plan_total;

    PricedItems {
        items: priced,
        totals,
    }
}

// ── Checkout breakdown ───────────────────────────────────────────────────────

/// Full checkout breakdown, including the internal platform fee.
#[derive(Debug, Clone, PartialEq)]
pub struct CheckoutBreakdown {
    pub subtotal: BigDecimal,
    pub protection_plan_total: BigDecimal,
    pub platform_fee: BigDecimal,
    pub platform_fee_percentage: u32,
    pub gst: BigDecimal,
    pub shipping: BigDecimal,
    pub grand_total: BigDecimal,
}

/// The part of the breakdown a buyer may see. The platform fee is folded into
/// the total through its GST only.
#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
pub struct BuyerBreakdown {
    #[schema(value_type = String)]
    pub subtotal: BigDecimal,
    #[schema(value_type = String)]
    pub protection_plan_total: BigDecimal,
    #[schema(value_type = String)]
    pub gst: BigDecimal,
    #[schema(value_type = String)]
    pub shipping: BigDecimal,
    #[schema(value_type = String)]
    pub grand_total: BigDecimal,
}

impl CheckoutBreakdown {
    pub fn buyer_view(&self) -> BuyerBreakdown {
        BuyerBreakdown {
            subtotal: self.subtotal.clone(),
            protection_plan_total: self.protection_plan_total.clone(),
            gst: self.gst.clone(),
            shipping: self.shipping.clone(),
            grand_total: self.grand_total.clone(),
        }
    }
}

pub fn checkout_breakdown(totals: &CartTotals, config: &PricingConfig) -> CheckoutBreakdown {
    let (platform_fee_percentage, platform_fee) = config.checkout_fee.fee_for(&totals.subtotal);
    let gst = round_currency(&(&platform_fee * &config.gst_rate));
    let grand_total =
        &totals.subtotal + &totals.protection_plan_total + &gst + &config.shipping_charge;

    CheckoutBreakdown {
        subtotal: totals.subtotal.clone(),
        protection_plan_total: totals.protection_plan_total.clone(),
        platform_fee,
        platform_fee_percentage,
        gst,
        shipping: config.shipping_charge.clone(),
        grand_total,
    }
}

// ── Listing fee ──────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
pub struct ListingFee {
    #[schema(value_type = String)]
    pub price: BigDecimal,
    pub platform_fee_percentage: u32,
    #[schema(value_type = String)]
    pub platform_fee: BigDecimal,
    #[schema(value_type = String)]
    pub seller_earning: BigDecimal,
}

pub fn listing_fee(price: &BigDecimal, policy: &FeePolicy) -> ListingFee {
    let (platform_fee_percentage, platform_fee) = policy.fee_for(price);
    ListingFee {
        price: price.clone(),
        platform_fee_percentage,
        seller_earning: price - &platform_fee,
        platform_fee,
    }
}
