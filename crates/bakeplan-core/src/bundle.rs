//! The validated planning bundle.
//!
//! A [`PlanningBundle`] is the single boundary between data ingestion and
//! the engine. `validated()` is the one place where input errors surface:
//! it resolves product aliases to canonical SKU ids, enforces the model
//! invariants, and collects non-fatal findings into [`Diagnostics`]. The
//! engine treats a validated bundle as immutable.

use crate::calendar::LaborCalendar;
use crate::costs::CostStructure;
use crate::demand::Forecast;
use crate::diagnostics::Diagnostics;
use crate::error::{PlanError, PlanResult};
use crate::ids::{NodeId, ProductId};
use crate::inventory::InitialInventory;
use crate::network::Network;
use crate::product::Product;
use crate::trucks::TruckSchedule;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashSet};

/// Immutable planning inputs plus the horizon.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlanningBundle {
    pub network: Network,
    pub products: Vec<Product>,
    pub truck_schedules: Vec<TruckSchedule>,
    pub labor_calendar: LaborCalendar,
    pub cost_structure: CostStructure,
    pub forecast: Forecast,
    pub initial_inventory: InitialInventory,
    pub planning_start: NaiveDate,
    pub planning_end: NaiveDate,
    /// Findings collected during validation (warnings survive here)
    #[serde(skip)]
    pub diagnostics: Diagnostics,
}

impl PlanningBundle {
    /// Number of days in the horizon, inclusive of both ends.
    pub fn horizon_days(&self) -> usize {
        (self.planning_end - self.planning_start).num_days() as usize + 1
    }

    pub fn product(&self, id: &ProductId) -> Option<&Product> {
        self.products.iter().find(|p| &p.id == id)
    }

    /// Map every alias (and every canonical id) to its canonical id.
    fn alias_map(&self) -> PlanResult<BTreeMap<ProductId, ProductId>> {
        let mut map = BTreeMap::new();
        for p in &self.products {
            map.insert(p.id.clone(), p.id.clone());
        }
        for p in &self.products {
            for alias in &p.aliases {
                if let Some(existing) = map.get(alias) {
                    if existing != &p.id {
                        return Err(PlanError::InvalidInput(format!(
                            "alias {alias} maps to both {existing} and {}",
                            p.id
                        )));
                    }
                } else {
                    map.insert(alias.clone(), p.id.clone());
                }
            }
        }
        Ok(map)
    }

    /// Validate the bundle, resolving aliases in place.
    ///
    /// Fatal findings produce `PlanError::InvalidInput` (or the more
    /// specific `AliasUnresolved`); warnings stay on `diagnostics`.
    pub fn validated(mut self) -> PlanResult<Self> {
        let mut diag = Diagnostics::new();

        if self.planning_start > self.planning_end {
            return Err(PlanError::InvalidInput(format!(
                "planning_start {} is after planning_end {}",
                self.planning_start, self.planning_end
            )));
        }
        if self.initial_inventory.snapshot_date > self.planning_start {
            return Err(PlanError::InvalidInput(format!(
                "snapshot_date {} is after planning_start {}",
                self.initial_inventory.snapshot_date, self.planning_start
            )));
        }
        if self.products.is_empty() {
            return Err(PlanError::InvalidInput("no products".into()));
        }
        if self.network.nodes.is_empty() {
            return Err(PlanError::InvalidInput("no nodes".into()));
        }

        self.check_unique_ids(&mut diag);
        self.resolve_aliases()?;
        self.check_products(&mut diag);
        self.check_nodes(&mut diag);
        self.check_routes(&mut diag);
        self.check_trucks(&mut diag);
        self.check_inventory(&mut diag);
        self.check_forecast(&mut diag);
        self.check_calendar(&mut diag);
        self.check_reachability(&mut diag);

        if diag.has_errors() {
            return Err(PlanError::InvalidInput(diag.summary()));
        }
        self.diagnostics = diag;
        Ok(self)
    }

    fn check_unique_ids(&self, diag: &mut Diagnostics) {
        let mut seen: HashSet<&NodeId> = HashSet::new();
        for n in &self.network.nodes {
            if !seen.insert(&n.id) {
                diag.add_error_with_entity("topology", "duplicate node id", n.id.to_string());
            }
        }
        let mut seen: HashSet<&ProductId> = HashSet::new();
        for p in &self.products {
            if !seen.insert(&p.id) {
                diag.add_error_with_entity("catalog", "duplicate product id", p.id.to_string());
            }
        }
    }

    /// Rewrite forecast and inventory product ids to canonical SKU ids.
    fn resolve_aliases(&mut self) -> PlanResult<()> {
        let map = self.alias_map()?;
        for entry in &mut self.forecast.entries {
            match map.get(&entry.product) {
                Some(canonical) => entry.product = canonical.clone(),
                None => {
                    return Err(PlanError::AliasUnresolved {
                        product: entry.product.to_string(),
                        context: format!("forecast row at {} on {}", entry.node, entry.date),
                    })
                }
            }
        }
        for entry in &mut self.initial_inventory.entries {
            match map.get(&entry.product) {
                Some(canonical) => entry.product = canonical.clone(),
                None => {
                    return Err(PlanError::AliasUnresolved {
                        product: entry.product.to_string(),
                        context: format!("inventory row at {}", entry.node),
                    })
                }
            }
        }
        Ok(())
    }

    fn check_products(&self, diag: &mut Diagnostics) {
        for p in &self.products {
            if p.units_per_mix == 0 {
                diag.add_error_with_entity("catalog", "units_per_mix is zero", p.id.to_string());
            }
            if p.units_per_pallet == 0 {
                diag.add_error_with_entity("catalog", "units_per_pallet is zero", p.id.to_string());
            }
            for state in crate::product::StorageState::ALL {
                if p.shelf_life_days(state) == 0 {
                    diag.add_error_with_entity(
                        "catalog",
                        format!("zero {state} shelf life"),
                        p.id.to_string(),
                    );
                }
            }
        }
    }

    fn check_nodes(&self, diag: &mut Diagnostics) {
        let mut any_producer = false;
        for n in &self.network.nodes {
            any_producer |= n.produces;
            if n.produces && !n.stores_ambient {
                diag.add_error_with_entity(
                    "topology",
                    "producing node cannot store ambient output",
                    n.id.to_string(),
                );
            }
            if n.can_freeze && !(n.stores_ambient && n.stores_frozen) {
                diag.add_error_with_entity(
                    "topology",
                    "can_freeze requires ambient and frozen storage",
                    n.id.to_string(),
                );
            }
            if n.can_thaw && !(n.stores_frozen && n.stores_thawed) {
                diag.add_error_with_entity(
                    "topology",
                    "can_thaw requires frozen and thawed storage",
                    n.id.to_string(),
                );
            }
            if n.has_demand && !(n.stores_ambient || n.stores_thawed) {
                diag.add_error_with_entity(
                    "topology",
                    "demand node has no consumable storage state",
                    n.id.to_string(),
                );
            }
        }
        if !any_producer {
            diag.add_error("topology", "no producing node in the network");
        }
    }

    fn check_routes(&self, diag: &mut Diagnostics) {
        for (i, r) in self.network.routes.iter().enumerate() {
            let origin = self.network.node(&r.origin);
            let dest = self.network.node(&r.destination);
            if origin.is_none() {
                diag.add_error_with_entity("topology", "route origin unknown", r.origin.to_string());
                continue;
            }
            if dest.is_none() {
                diag.add_error_with_entity(
                    "topology",
                    "route destination unknown",
                    r.destination.to_string(),
                );
                continue;
            }
            let origin = origin.unwrap();
            let ship_state = r.mode.ship_state();
            if !origin.stores(ship_state) {
                diag.add_error_with_entity(
                    "topology",
                    format!("route {i} ships {} but origin cannot store it", r.mode),
                    origin.id.to_string(),
                );
            }
            if self.network.arrival_state(r).is_none() {
                diag.add_error_with_entity(
                    "topology",
                    format!("route {i} delivers a state the destination cannot hold"),
                    r.destination.to_string(),
                );
            }
        }
    }

    fn check_trucks(&self, diag: &mut Diagnostics) {
        for t in &self.truck_schedules {
            if self.network.node(&t.origin).is_none() {
                diag.add_error_with_entity("trucks", "truck origin unknown", t.id.to_string());
            }
            if t.capacity_pallets == 0 {
                diag.add_error_with_entity("trucks", "truck capacity is zero", t.id.to_string());
            }
            if t.departure_weekdays.is_empty() {
                diag.add_warning_with_entity("trucks", "truck never departs", t.id.to_string());
            }
            for dest in &t.destinations {
                if self.network.node(dest).is_none() {
                    diag.add_error_with_entity("trucks", "truck destination unknown", dest.to_string());
                } else if !self
                    .network
                    .routes
                    .iter()
                    .any(|r| &r.origin == &t.origin && &r.destination == dest)
                {
                    diag.add_error_with_entity(
                        "trucks",
                        format!("no route from {} for truck destination", t.origin),
                        dest.to_string(),
                    );
                }
            }
        }
    }

    fn check_inventory(&self, diag: &mut Diagnostics) {
        for e in &self.initial_inventory.entries {
            match self.network.node(&e.node) {
                None => diag.add_error_with_entity("inventory", "unknown node", e.node.to_string()),
                Some(n) if !n.stores(e.state) => diag.add_error_with_entity(
                    "inventory",
                    format!("node cannot store {} stock", e.state),
                    e.node.to_string(),
                ),
                _ => {}
            }
            if self.product(&e.product).is_none() {
                diag.add_error_with_entity("inventory", "unknown product", e.product.to_string());
            }
            if e.quantity < 0.0 {
                diag.add_error_with_entity("inventory", "negative quantity", e.node.to_string());
            }
        }
    }

    fn check_forecast(&self, diag: &mut Diagnostics) {
        for e in &self.forecast.entries {
            match self.network.node(&e.node) {
                None => diag.add_error_with_entity("forecast", "unknown node", e.node.to_string()),
                Some(n) if !n.has_demand => diag.add_error_with_entity(
                    "forecast",
                    "demand at a node without has_demand",
                    e.node.to_string(),
                ),
                _ => {}
            }
            if self.product(&e.product).is_none() {
                diag.add_error_with_entity("forecast", "unknown product", e.product.to_string());
            }
            if e.quantity < 0.0 {
                diag.add_error_with_entity("forecast", "negative quantity", e.node.to_string());
            }
            if e.date < self.planning_start || e.date > self.planning_end {
                diag.add_warning_with_entity(
                    "forecast",
                    format!("row on {} is outside the horizon and is ignored", e.date),
                    format!("{} / {}", e.node, e.product),
                );
            }
        }
    }

    fn check_calendar(&self, diag: &mut Diagnostics) {
        if !self.network.nodes.iter().any(|n| n.produces) {
            return;
        }
        let missing = self
            .labor_calendar
            .missing_dates(self.planning_start, self.planning_end);
        if !missing.is_empty() {
            diag.add_error(
                "calendar",
                format!(
                    "labor calendar is missing {} horizon date(s), first {}",
                    missing.len(),
                    missing[0]
                ),
            );
        }
    }

    fn check_reachability(&self, diag: &mut Diagnostics) {
        let producers: Vec<&NodeId> = self
            .network
            .nodes
            .iter()
            .filter(|n| n.produces)
            .map(|n| &n.id)
            .collect();
        let demand_nodes: HashSet<&NodeId> = self.forecast.entries.iter().map(|e| &e.node).collect();
        for node in demand_nodes {
            if self.network.node(node).is_none() {
                continue; // already reported
            }
            let reachable = producers.iter().any(|p| self.network.is_reachable(p, node));
            let has_stock = self
                .initial_inventory
                .entries
                .iter()
                .any(|e| &e.node == node && e.quantity > 0.0);
            if !reachable && !has_stock {
                diag.add_error_with_entity(
                    "topology",
                    "demand node unreachable from any producing node and holds no stock",
                    node.to_string(),
                );
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::calendar::LaborDay;
    use crate::demand::DemandEntry;
    use crate::inventory::InventoryEntry;
    use crate::network::{Node, Route, TransportMode};
    use crate::product::StorageState;

    fn d(s: &str) -> NaiveDate {
        NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap()
    }

    fn calendar(start: &str, end: &str) -> LaborCalendar {
        let mut cal = LaborCalendar::new();
        for date in d(start).iter_days().take_while(|x| *x <= d(end)) {
            cal.add(LaborDay::fixed(date, 12.0, 50.0, 75.0));
        }
        cal
    }

    fn bundle() -> PlanningBundle {
        let mut network = Network::new();
        network.add_node(Node::manufacturing("mfg", "Plant"));
        network.add_node(Node::breadroom("br1", "Room 1"));
        network.add_route(Route::new("mfg", "br1", TransportMode::Ambient, 1, 0.05));

        PlanningBundle {
            network,
            products: vec![Product::new("p1", "White").with_aliases([ProductId::new("p1-legacy")])],
            truck_schedules: vec![],
            labor_calendar: calendar("2025-06-02", "2025-06-08"),
            cost_structure: CostStructure::default(),
            forecast: Forecast::new(vec![DemandEntry::new("br1", "p1", d("2025-06-04"), 100.0)]),
            initial_inventory: InitialInventory::empty(d("2025-06-01")),
            planning_start: d("2025-06-02"),
            planning_end: d("2025-06-08"),
            diagnostics: Diagnostics::new(),
        }
    }

    #[test]
    fn test_valid_bundle_passes() {
        let b = bundle().validated().expect("bundle should validate");
        assert_eq!(b.horizon_days(), 7);
        assert!(!b.diagnostics.has_errors());
    }

    #[test]
    fn test_alias_resolution_rewrites_forecast() {
        let mut b = bundle();
        b.forecast.entries[0].product = ProductId::new("p1-legacy");
        let b = b.validated().unwrap();
        assert_eq!(b.forecast.entries[0].product, ProductId::new("p1"));
    }

    #[test]
    fn test_unresolved_alias_is_typed_error() {
        let mut b = bundle();
        b.forecast.entries[0].product = ProductId::new("nope");
        match b.validated() {
            Err(PlanError::AliasUnresolved { product, .. }) => assert_eq!(product, "nope"),
            other => panic!("expected AliasUnresolved, got {other:?}"),
        }
    }

    #[test]
    fn test_snapshot_after_start_rejected() {
        let mut b = bundle();
        b.initial_inventory.snapshot_date = d("2025-06-03");
        assert!(matches!(b.validated(), Err(PlanError::InvalidInput(_))));
    }

    #[test]
    fn test_inventory_state_must_be_storable() {
        let mut b = bundle();
        b.initial_inventory.entries.push(InventoryEntry::new(
            "br1",
            "p1",
            StorageState::Frozen,
            10.0,
        ));
        let err = b.validated().unwrap_err();
        assert!(err.to_string().contains("cannot store frozen"));
    }

    #[test]
    fn test_unreachable_demand_node_rejected() {
        let mut b = bundle();
        b.network.routes.clear();
        let err = b.validated().unwrap_err();
        assert!(err.to_string().contains("unreachable"));
    }

    #[test]
    fn test_unreachable_but_stocked_node_passes() {
        let mut b = bundle();
        b.network.routes.clear();
        b.initial_inventory.entries.push(InventoryEntry::new(
            "br1",
            "p1",
            StorageState::Ambient,
            500.0,
        ));
        assert!(b.validated().is_ok());
    }

    #[test]
    fn test_calendar_gap_rejected() {
        let mut b = bundle();
        b.labor_calendar.days.remove(&d("2025-06-05"));
        let err = b.validated().unwrap_err();
        assert!(err.to_string().contains("calendar"));
    }

    #[test]
    fn test_out_of_horizon_forecast_is_warning() {
        let mut b = bundle();
        b.forecast
            .entries
            .push(DemandEntry::new("br1", "p1", d("2025-07-01"), 10.0));
        let b = b.validated().unwrap();
        assert_eq!(b.diagnostics.warning_count(), 1);
    }
}
