//! Manufacturing split
//!
//! Spreads the cost of a manufacturing run over its component SKUs in
//! proportion to the quantity of each, then renders one bill line per SKU.
//!
//! SKUs are normalized before anything else (see [`SplitKey::sku`]) and two
//! components that normalize to the same SKU are rejected rather than merged.

use crate::allocator::{Allocation, AllocationRequest};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;
use tally_types::{Cents, SplitKey, TallyError, TallyResult, Weight};
use tracing::{debug, warn};

/// Fewest components a split may have unless configured otherwise
pub const DEFAULT_MIN_COMPONENTS: usize = 2;
/// Most components a split may have unless configured otherwise
pub const DEFAULT_MAX_COMPONENTS: usize = 500;

/// A component line as submitted by the caller
///
/// `quantity` stays untyped so that fractional or negative quantities are
/// reported as invalid input instead of a deserialization failure.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ComponentInput {
    /// SKU as entered, normalized during parsing
    pub sku: String,
    /// Expected to be a positive integer
    pub quantity: Value,
}

/// A manufacturing split as submitted by the caller
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ManufacturingSplitInput {
    /// Expected to be a positive integer number of cents
    pub total_cents: Value,
    /// Free text included in every description
    #[serde(default)]
    pub memo: Option<String>,
    /// Components in billing order
    pub components: Vec<ComponentInput>,
}

/// Bounds on the number of components in one split
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SplitLimits {
    /// Inclusive lower bound
    pub min_components: usize,
    /// Inclusive upper bound
    pub max_components: usize,
}

impl Default for SplitLimits {
    fn default() -> Self {
        Self { min_components: DEFAULT_MIN_COMPONENTS, max_components: DEFAULT_MAX_COMPONENTS }
    }
}

/// How bill line descriptions are rendered
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DescriptionFormat {
    /// Leading label, e.g. `Manufacturing split`
    pub prefix: String,
    /// Placed directly before the amount
    pub currency_symbol: String,
}

impl Default for DescriptionFormat {
    fn default() -> Self {
        Self { prefix: "Manufacturing split".to_string(), currency_symbol: "$".to_string() }
    }
}

impl DescriptionFormat {
    /// `"{prefix}: {memo} - {sku} x{quantity} ({currency}{amount})"`, the memo
    /// segment omitted when there is none
    #[must_use]
    pub fn describe(&self, memo: Option<&str>, sku: &SplitKey, quantity: Weight, cents: Cents) -> String {
        let amount = format!("{}{cents}", self.currency_symbol);
        match memo {
            Some(memo) => format!("{}: {memo} - {sku} x{quantity} ({amount})", self.prefix),
            None => format!("{}: {sku} x{quantity} ({amount})", self.prefix),
        }
    }
}

/// One line of the resulting bill
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BillLine {
    /// Normalized SKU
    pub sku: SplitKey,
    /// Quantity used as the allocation weight
    pub quantity: Weight,
    /// Share of the total
    pub cents: Cents,
    /// Rendered with [`DescriptionFormat::describe`]
    pub description: String,
}

/// A validated manufacturing split
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ManufacturingSplit {
    request: AllocationRequest,
    memo: Option<String>,
}

impl ManufacturingSplit {
    /// Normalize and validate a submitted split.
    ///
    /// # Errors
    /// Returns [`TallyError::InvalidInput`] when the component count is outside
    /// `limits`, the total is not a positive integer, a SKU is blank, a
    /// quantity is not a positive integer, or two SKUs normalize to the same key.
    pub fn parse(input: &ManufacturingSplitInput, limits: &SplitLimits) -> TallyResult<Self> {
        Self::parse_validated(input, limits).inspect_err(|err| {
            warn!(category = err.category(), error = %err, "Rejected manufacturing split");
        })
    }

    fn parse_validated(input: &ManufacturingSplitInput, limits: &SplitLimits) -> TallyResult<Self> {
        let count = input.components.len();
        if count < limits.min_components {
            return Err(TallyError::invalid_field(
                "components",
                format!("at least {} components are required, got {count}", limits.min_components),
            ));
        }
        if count > limits.max_components {
            return Err(TallyError::invalid_field(
                "components",
                format!("at most {} components are allowed, got {count}", limits.max_components),
            ));
        }

        let total = cents_from_json(&input.total_cents)?;

        let mut seen: HashMap<SplitKey, &str> = HashMap::with_capacity(count);
        let mut entries = Vec::with_capacity(count);
        for component in &input.components {
            let sku = SplitKey::sku(&component.sku)?;
            if let Some(first) = seen.get(&sku) {
                return Err(TallyError::invalid_key(
                    sku.as_str(),
                    format!(
                        "duplicate sku '{sku}': '{}' and '{first}' normalize to the same key",
                        component.sku
                    ),
                ));
            }
            seen.insert(sku.clone(), &component.sku);

            let quantity = Weight::from_json(&component.quantity).map_err(|_| {
                TallyError::invalid_key(
                    sku.as_str(),
                    format!(
                        "quantity for '{sku}' must be a positive integer, got {}",
                        component.quantity
                    ),
                )
            })?;
            entries.push((sku, quantity));
        }

        let memo = input.memo.as_deref().map(str::trim).filter(|m| !m.is_empty()).map(String::from);

        Ok(Self { request: AllocationRequest::from_weights(total, entries)?, memo })
    }

    /// Total cost to split
    #[must_use]
    pub const fn total(&self) -> Cents {
        self.request.total()
    }

    /// Trimmed memo, `None` when absent or blank
    #[must_use]
    pub fn memo(&self) -> Option<&str> {
        self.memo.as_deref()
    }

    /// Normalized SKUs and their quantities, in input order
    #[must_use]
    pub fn components(&self) -> &[(SplitKey, Weight)] {
        self.request.entries()
    }

    /// The underlying allocation, including rounding detail
    #[must_use]
    pub fn allocation(&self) -> Allocation {
        self.request.allocate()
    }

    /// Split the total over the components and render bill lines
    #[must_use]
    pub fn allocate(&self, format: &DescriptionFormat) -> Vec<BillLine> {
        let allocation = self.allocation();
        debug!(
            total = self.total().get(),
            components = allocation.len(),
            "Allocated manufacturing split"
        );

        allocation
            .lines()
            .iter()
            .map(|line| BillLine {
                sku: line.key.clone(),
                quantity: line.weight,
                cents: line.cents,
                description: format.describe(self.memo(), &line.key, line.weight, line.cents),
            })
            .collect()
    }
}

fn cents_from_json(value: &Value) -> TallyResult<i64> {
    let invalid = || {
        TallyError::invalid_field(
            "total_cents",
            format!("total_cents must be a positive integer, got {value}"),
        )
    };
    let cents = match value {
        Value::Number(number) => number.as_i64().ok_or_else(invalid)?,
        _ => return Err(invalid()),
    };
    if cents <= 0 {
        return Err(invalid());
    }
    Ok(cents)
}
