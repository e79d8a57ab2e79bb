//! Sparse index sets for the planning model.
//!
//! Everything the formulator ranges over is enumerated here once:
//! horizon days, dense node/product indices, feasible (node, state)
//! storage pairs, route departure days, truck departures, aggregated
//! demand keys, and the opening-stock lookup. Variables and constraints
//! are then created only where these sets say they exist.
//!
//! Two creation rules live here rather than in the formulator because
//! they define the index sets themselves:
//!
//! - A route departure day exists only if the delivery lands within the
//!   horizon (`day + transit <= last day`). Departures that would deliver
//!   after the horizon are never enumerated, so the model cannot ship
//!   into the void.
//! - Disposal is enumerable for a (node, product, state, day) only while
//!   opening stock could still be expiring or once in-horizon stock is
//!   old enough to expire.

use bakeplan_core::{
    Node, NodeId, PlanError, PlanResult, PlanningBundle, Product, ProductId, Route, StorageState,
    TruckSchedule,
};
use chrono::NaiveDate;
use std::collections::BTreeMap;

/// A route with dense endpoints and its enumerated departure days.
#[derive(Debug, Clone)]
pub struct RouteData {
    pub route: Route,
    pub origin: usize,
    pub dest: usize,
    pub ship_state: StorageState,
    pub arrival_state: StorageState,
    pub transit_days: usize,
    /// Trucks scheduled on this origin-destination pair
    pub trucks: Vec<usize>,
    /// Day indices on which a shipment may depart
    pub departure_days: Vec<usize>,
}

impl RouteData {
    pub fn departs_on(&self, day: usize) -> bool {
        self.departure_days.binary_search(&day).is_ok()
    }
}

/// A truck schedule with dense endpoints.
#[derive(Debug, Clone)]
pub struct TruckData {
    pub schedule: TruckSchedule,
    pub origin: usize,
    /// (destination node index, route index) pairs this truck can serve
    pub destinations: Vec<(usize, usize)>,
}

/// All index sets for one solve.
#[derive(Debug)]
pub struct PlanningIndices {
    pub dates: Vec<NaiveDate>,
    pub nodes: Vec<Node>,
    pub products: Vec<Product>,
    pub node_index: BTreeMap<NodeId, usize>,
    pub product_index: BTreeMap<ProductId, usize>,
    /// Feasible (node, state) storage pairs, in deterministic order
    pub storage: Vec<(usize, StorageState)>,
    pub producers: Vec<usize>,
    pub routes: Vec<RouteData>,
    pub trucks: Vec<TruckData>,
    /// (truck, day) departures with at least one in-horizon delivery
    pub truck_departures: Vec<(usize, usize)>,
    /// Aggregated demand per (node, product, day), positive entries only
    pub demand: BTreeMap<(usize, usize, usize), f64>,
    /// Aggregated opening stock per (node, product, state)
    pub init_inventory: BTreeMap<(usize, usize, StorageState), f64>,
}

impl PlanningIndices {
    /// Enumerate all index sets from a validated bundle.
    pub fn build(bundle: &PlanningBundle) -> PlanResult<Self> {
        let horizon = bundle.horizon_days();
        if horizon == 0 {
            return Err(PlanError::IndexBuild("empty planning horizon".into()));
        }
        let dates: Vec<NaiveDate> = bundle
            .planning_start
            .iter_days()
            .take(horizon)
            .collect();

        let nodes = bundle.network.nodes.clone();
        let products = bundle.products.clone();
        let node_index: BTreeMap<NodeId, usize> = nodes
            .iter()
            .enumerate()
            .map(|(i, n)| (n.id.clone(), i))
            .collect();
        let product_index: BTreeMap<ProductId, usize> = products
            .iter()
            .enumerate()
            .map(|(i, p)| (p.id.clone(), i))
            .collect();

        let mut storage = Vec::new();
        for (ni, node) in nodes.iter().enumerate() {
            for state in node.storable_states() {
                storage.push((ni, state));
            }
        }
        let producers: Vec<usize> = nodes
            .iter()
            .enumerate()
            .filter(|(_, n)| n.produces)
            .map(|(i, _)| i)
            .collect();

        // Trucks first: route departure days depend on which trucks serve a pair.
        let mut trucks = Vec::new();
        for schedule in &bundle.truck_schedules {
            let origin = *node_index.get(&schedule.origin).ok_or_else(|| {
                PlanError::IndexBuild(format!("truck {} origin {} unknown", schedule.id, schedule.origin))
            })?;
            trucks.push(TruckData {
                schedule: schedule.clone(),
                origin,
                destinations: Vec::new(), // filled after routes exist
            });
        }

        let last_day = horizon - 1;
        let mut routes = Vec::new();
        for route in &bundle.network.routes {
            let origin = *node_index.get(&route.origin).ok_or_else(|| {
                PlanError::IndexBuild(format!("route origin {} unknown", route.origin))
            })?;
            let dest = *node_index.get(&route.destination).ok_or_else(|| {
                PlanError::IndexBuild(format!("route destination {} unknown", route.destination))
            })?;
            let arrival_state = bundle.network.arrival_state(route).ok_or_else(|| {
                PlanError::IndexBuild(format!(
                    "route {} -> {} delivers an unstorable state",
                    route.origin, route.destination
                ))
            })?;
            let transit_days = route.transit_days as usize;

            let serving: Vec<usize> = trucks
                .iter()
                .enumerate()
                .filter(|(_, t)| {
                    t.schedule.origin == route.origin && t.schedule.serves(&route.destination)
                })
                .map(|(i, _)| i)
                .collect();

            // Departures whose delivery would land after the horizon are
            // never enumerated. With scheduled trucks the departure must
            // also fall on a departure weekday of a serving truck.
            let departure_days: Vec<usize> = (0..horizon)
                .filter(|day| day + transit_days <= last_day)
                .filter(|day| {
                    serving.is_empty()
                        || serving
                            .iter()
                            .any(|&ti| trucks[ti].schedule.departs_on(dates[*day]))
                })
                .collect();

            let route_idx = routes.len();
            for &ti in &serving {
                trucks[ti].destinations.push((dest, route_idx));
            }
            routes.push(RouteData {
                route: route.clone(),
                origin,
                dest,
                ship_state: route.mode.ship_state(),
                arrival_state,
                transit_days,
                trucks: serving,
                departure_days,
            });
        }

        let mut truck_departures = Vec::new();
        for (ti, truck) in trucks.iter().enumerate() {
            for day in 0..horizon {
                if !truck.schedule.departs_on(dates[day]) {
                    continue;
                }
                let deliverable = truck
                    .destinations
                    .iter()
                    .any(|&(_, ri)| routes[ri].departs_on(day));
                if deliverable {
                    truck_departures.push((ti, day));
                }
            }
        }

        let mut demand: BTreeMap<(usize, usize, usize), f64> = BTreeMap::new();
        for entry in &bundle.forecast.entries {
            if entry.date < bundle.planning_start || entry.date > bundle.planning_end {
                continue; // warned at validation
            }
            if entry.quantity <= 0.0 {
                continue;
            }
            let ni = *node_index
                .get(&entry.node)
                .ok_or_else(|| PlanError::IndexBuild(format!("demand node {} unknown", entry.node)))?;
            let pi = *product_index.get(&entry.product).ok_or_else(|| {
                PlanError::IndexBuild(format!("demand product {} unknown", entry.product))
            })?;
            let day = (entry.date - bundle.planning_start).num_days() as usize;
            *demand.entry((ni, pi, day)).or_insert(0.0) += entry.quantity;
        }

        let mut init_inventory: BTreeMap<(usize, usize, StorageState), f64> = BTreeMap::new();
        for entry in &bundle.initial_inventory.entries {
            if entry.quantity <= 0.0 {
                continue;
            }
            let ni = *node_index.get(&entry.node).ok_or_else(|| {
                PlanError::IndexBuild(format!("inventory node {} unknown", entry.node))
            })?;
            let pi = *product_index.get(&entry.product).ok_or_else(|| {
                PlanError::IndexBuild(format!("inventory product {} unknown", entry.product))
            })?;
            *init_inventory.entry((ni, pi, entry.state)).or_insert(0.0) += entry.quantity;
        }

        Ok(PlanningIndices {
            dates,
            nodes,
            products,
            node_index,
            product_index,
            storage,
            producers,
            routes,
            trucks,
            truck_departures,
            demand,
            init_inventory,
        })
    }

    pub fn horizon(&self) -> usize {
        self.dates.len()
    }

    pub fn date(&self, day: usize) -> NaiveDate {
        self.dates[day]
    }

    pub fn stores(&self, node: usize, state: StorageState) -> bool {
        self.nodes[node].stores(state)
    }

    pub fn opening_stock(&self, node: usize, product: usize, state: StorageState) -> f64 {
        self.init_inventory
            .get(&(node, product, state))
            .copied()
            .unwrap_or(0.0)
    }

    /// Routes arriving at `node` in `state` whose shipment would have
    /// departed on `day - transit`; yields (route index, departure day).
    pub fn arrivals_into(
        &self,
        node: usize,
        state: StorageState,
        day: usize,
    ) -> Vec<(usize, usize)> {
        self.routes
            .iter()
            .enumerate()
            .filter(|(_, r)| r.dest == node && r.arrival_state == state)
            .filter_map(|(ri, r)| {
                day.checked_sub(r.transit_days)
                    .filter(|dep| r.departs_on(*dep))
                    .map(|dep| (ri, dep))
            })
            .collect()
    }

    /// Routes departing `node` in ship state `state` on `day`.
    pub fn departures_from(&self, node: usize, state: StorageState, day: usize) -> Vec<usize> {
        self.routes
            .iter()
            .enumerate()
            .filter(|(_, r)| r.origin == node && r.ship_state == state && r.departs_on(day))
            .map(|(ri, _)| ri)
            .collect()
    }

    /// May (node, product, state) hold expiring mass on `day`?
    ///
    /// Opening stock is of unknown age and can expire on any day its
    /// shelf-life window still covers the start; stock that entered the
    /// state in-horizon can be expired once `day` reaches the shelf life.
    pub fn disposal_eligible(&self, node: usize, product: usize, state: StorageState, day: usize) -> bool {
        let life = self.products[product].shelf_life_days(state) as usize;
        if day >= life {
            return true;
        }
        self.opening_stock(node, product, state) > 0.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::{simple_bundle, two_node_bundle};

    #[test]
    fn test_horizon_enumeration() {
        let bundle = simple_bundle(7);
        let idx = PlanningIndices::build(&bundle).unwrap();
        assert_eq!(idx.horizon(), 7);
        assert_eq!(idx.date(0), bundle.planning_start);
        assert_eq!(idx.date(6), bundle.planning_end);
    }

    #[test]
    fn test_post_horizon_departures_not_enumerated() {
        let bundle = two_node_bundle(7, 2);
        let idx = PlanningIndices::build(&bundle).unwrap();
        let route = &idx.routes[0];
        assert_eq!(route.transit_days, 2);
        // last day with in-horizon delivery is 4 (4 + 2 = 6)
        assert_eq!(route.departure_days.last(), Some(&4));
        assert!(!route.departs_on(5));
        assert!(!route.departs_on(6));
    }

    #[test]
    fn test_arrivals_mirror_departures() {
        let bundle = two_node_bundle(7, 2);
        let idx = PlanningIndices::build(&bundle).unwrap();
        let arrivals = idx.arrivals_into(1, StorageState::Ambient, 3);
        assert_eq!(arrivals, vec![(0, 1)]);
        // nothing can arrive before the first transit completes
        assert!(idx.arrivals_into(1, StorageState::Ambient, 1).is_empty());
    }

    #[test]
    fn test_disposal_eligibility() {
        let mut bundle = simple_bundle(25);
        bundle.products[0].shelf_life.ambient_days = 17;
        let idx = PlanningIndices::build(&bundle).unwrap();
        // no opening stock: only once in-horizon stock can have expired
        assert!(!idx.disposal_eligible(0, 0, StorageState::Ambient, 16));
        assert!(idx.disposal_eligible(0, 0, StorageState::Ambient, 17));
    }

    #[test]
    fn test_demand_aggregation_skips_out_of_horizon() {
        let bundle = simple_bundle(7);
        let idx = PlanningIndices::build(&bundle).unwrap();
        assert!(idx.demand.values().all(|q| *q > 0.0));
        assert!(idx.demand.keys().all(|(_, _, day)| *day < 7));
    }
}
