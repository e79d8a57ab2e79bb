//! Demand forecast.

use crate::ids::{NodeId, ProductId};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// One forecast row: quantity demanded at a breadroom on a date.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DemandEntry {
    pub node: NodeId,
    pub product: ProductId,
    pub date: NaiveDate,
    pub quantity: f64,
}

impl DemandEntry {
    pub fn new(
        node: impl Into<NodeId>,
        product: impl Into<ProductId>,
        date: NaiveDate,
        quantity: f64,
    ) -> Self {
        DemandEntry {
            node: node.into(),
            product: product.into(),
            date,
            quantity,
        }
    }
}

/// The full demand forecast.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Forecast {
    pub entries: Vec<DemandEntry>,
}

impl Forecast {
    pub fn new(entries: Vec<DemandEntry>) -> Self {
        Forecast { entries }
    }

    pub fn total_quantity(&self) -> f64 {
        self.entries.iter().map(|e| e.quantity).sum()
    }
}
