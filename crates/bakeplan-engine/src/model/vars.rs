//! Variable registry and row bookkeeping for the planning MIP.
//!
//! Columns live in an insertion-ordered map keyed by a typed [`VarKey`],
//! so the column order of the built model is reproducible run to run.
//! Alongside every HiGHS column and row the registry records lightweight
//! metadata (bounds, integrality, objective factor, row terms); the LP
//! dump, the driver's incumbent screen, and objective recomputation all
//! read that shadow instead of poking the solver.

use bakeplan_core::StorageState;
use highs::Col;
use indexmap::IndexMap;

/// Typed key of a decision variable.
///
/// Indices are dense positions from [`crate::indices::PlanningIndices`]:
/// `node`/`product` index the node and product registries, `route` and
/// `truck` index the enumerated route and truck lists, `day` is the
/// 0-based horizon day.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum VarKey {
    /// Units produced at a manufacturing node
    Production { node: usize, product: usize, day: usize },
    /// Integer number of mixes behind the production quantity
    MixCount { node: usize, product: usize, day: usize },
    /// Is this SKU made on this day (binary)
    ProductProduced { node: usize, product: usize, day: usize },
    /// Is anything made at the node on this day (binary)
    AnyProduction { node: usize, day: usize },
    /// First day of a production run (binary, drives changeover cost)
    ProductStart { node: usize, product: usize, day: usize },
    /// End-of-day stock per storage state
    Inventory { node: usize, product: usize, state: StorageState, day: usize },
    /// Integer pallet ceiling over the stock
    PalletCount { node: usize, product: usize, state: StorageState, day: usize },
    /// Pallet-count growth, charged the entry fee
    PalletEntry { node: usize, product: usize, state: StorageState, day: usize },
    /// Units dispatched on a route on a departure day
    InTransit { route: usize, product: usize, day: usize },
    /// Integer pallets of one product loaded on a truck toward one route
    TruckLoad { truck: usize, route: usize, product: usize, day: usize },
    /// Is the truck departure used at all (binary, carries fixed cost)
    TruckUsed { truck: usize, day: usize },
    /// Units moved ambient -> frozen at the node
    Freeze { node: usize, product: usize, day: usize },
    /// Units moved frozen -> thawed at the node (shelf life restarts)
    Thaw { node: usize, product: usize, day: usize },
    /// Demand served from ambient stock
    ConsumedAmbient { node: usize, product: usize, day: usize },
    /// Demand served from thawed stock
    ConsumedThawed { node: usize, product: usize, day: usize },
    /// Unmet demand
    Shortage { node: usize, product: usize, day: usize },
    /// Units explicitly removed as expired
    Disposal { node: usize, product: usize, state: StorageState, day: usize },
    /// Production hours actually worked
    LaborUsed { node: usize, day: usize },
    /// Hours paid for (>= used, >= daily minimum when producing)
    LaborPaid { node: usize, day: usize },
    /// Paid hours billed at the regular rate
    LaborRegular { node: usize, day: usize },
    /// Paid hours billed at the overtime rate
    LaborOvertime { node: usize, day: usize },
}

/// Static metadata of one column.
#[derive(Debug, Clone)]
pub struct VarMeta {
    pub name: String,
    pub lower: f64,
    pub upper: Option<f64>,
    pub integer: bool,
    pub objective: f64,
}

/// Sense of a constraint row.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RowSense {
    Eq,
    Le,
    Ge,
}

/// Shadow record of one constraint row.
#[derive(Debug, Clone)]
pub struct RowMeta {
    pub name: String,
    /// (column position, coefficient) pairs
    pub terms: Vec<(usize, f64)>,
    pub sense: RowSense,
    pub rhs: f64,
}

/// Insertion-ordered variable registry.
#[derive(Default)]
pub struct VariableMap {
    index: IndexMap<VarKey, usize>,
    cols: Vec<Col>,
    metas: Vec<VarMeta>,
}

impl VariableMap {
    pub fn new() -> Self {
        VariableMap::default()
    }

    /// Register a freshly created column. Panics on duplicate keys: the
    /// declaration pass owns key uniqueness.
    pub fn insert(&mut self, key: VarKey, col: Col, meta: VarMeta) -> usize {
        let pos = self.cols.len();
        let existing = self.index.insert(key, pos);
        assert!(existing.is_none(), "duplicate variable registration");
        self.cols.push(col);
        self.metas.push(meta);
        pos
    }

    pub fn len(&self) -> usize {
        self.cols.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cols.is_empty()
    }

    pub fn position(&self, key: &VarKey) -> Option<usize> {
        self.index.get(key).copied()
    }

    pub fn col_at(&self, pos: usize) -> Col {
        self.cols[pos]
    }

    pub fn meta_at(&self, pos: usize) -> &VarMeta {
        &self.metas[pos]
    }

    pub fn iter(&self) -> impl Iterator<Item = (&VarKey, usize)> {
        self.index.iter().map(|(k, pos)| (k, *pos))
    }

    pub fn metas(&self) -> &[VarMeta] {
        &self.metas
    }

    /// Stale-safe read of a variable value: an absent variable, an index
    /// past the value vector, or a NaN all read as 0.0.
    pub fn value(&self, values: &[f64], key: &VarKey) -> f64 {
        match self.position(key) {
            Some(pos) => {
                let v = values.get(pos).copied().unwrap_or(0.0);
                if v.is_finite() {
                    v
                } else {
                    0.0
                }
            }
            None => 0.0,
        }
    }

    /// Stale-safe read of an integer variable, rounded to the nearest int.
    pub fn int_value(&self, values: &[f64], key: &VarKey) -> i64 {
        self.value(values, key).round() as i64
    }
}

/// A linear expression under construction: terms plus a constant that is
/// folded into the row's right-hand side.
#[derive(Debug, Default, Clone)]
pub struct LinExpr {
    pub terms: Vec<(usize, f64)>,
    pub constant: f64,
}

impl LinExpr {
    pub fn new() -> Self {
        LinExpr::default()
    }

    pub fn add(&mut self, pos: usize, coef: f64) -> &mut Self {
        if coef != 0.0 {
            self.terms.push((pos, coef));
        }
        self
    }

    pub fn add_opt(&mut self, pos: Option<usize>, coef: f64) -> &mut Self {
        if let Some(p) = pos {
            self.add(p, coef);
        }
        self
    }

    pub fn add_const(&mut self, value: f64) -> &mut Self {
        self.constant += value;
        self
    }

    pub fn is_empty(&self) -> bool {
        self.terms.is_empty()
    }

    /// Merge duplicate columns; keeps row storage small on window rows
    /// where the same shipment variable can enter via several days.
    pub fn compact(mut self) -> Self {
        self.terms.sort_by_key(|(pos, _)| *pos);
        let mut merged: Vec<(usize, f64)> = Vec::with_capacity(self.terms.len());
        for (pos, coef) in self.terms {
            match merged.last_mut() {
                Some((last, acc)) if *last == pos => *acc += coef,
                _ => merged.push((pos, coef)),
            }
        }
        merged.retain(|(_, c)| *c != 0.0);
        self.terms = merged;
        self
    }
}

/// Sanitize an id for use inside a variable or row name.
pub fn lp_name(part: &str) -> String {
    part.chars()
        .map(|c| if c.is_ascii_alphanumeric() { c } else { '_' })
        .collect()
}
