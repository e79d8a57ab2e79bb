//! Pallet accounting and truck loading.
//!
//! Storage is palletized: an integer pallet count covers the stock
//! (`units_per_pallet * pallets >= inventory`), holding cost rides the
//! pallet count, and growth in the count pays the pallet-entry fee.
//! Shipments on trucked lanes must be covered by integer pallet loads on
//! scheduled trucks; each departure used pays its fixed cost and is
//! capped at the truck's pallet capacity.
//!
//! With pallet tracking disabled the integer layer disappears: holding
//! is charged on fractional pallet equivalents (on the inventory
//! columns) and truck capacity becomes a per-departure unit cap.

use super::vars::{LinExpr, RowSense, VarKey};
use super::ModelBuilder;

impl ModelBuilder<'_> {
    pub(crate) fn add_pallet_and_truck_rows(&mut self) {
        if self.cfg.pallet_tracking {
            self.add_pallet_rows();
            self.add_truck_rows();
        } else {
            self.add_unit_capacity_rows();
        }
    }

    fn add_pallet_rows(&mut self) {
        let idx = self.idx;
        for &(n, state) in &idx.storage {
            let ntag = self.node_tag(n);
            let stag = Self::state_tag(state);
            for p in 0..idx.products.len() {
                let ptag = self.product_tag(p);
                let units_per_pallet = idx.products[p].units_per_pallet as f64;
                let opening_pallets = (idx.opening_stock(n, p, state) / units_per_pallet).ceil();
                for day in 0..idx.horizon() {
                    let count = self.pos(&VarKey::PalletCount { node: n, product: p, state, day });
                    let entry = self.pos(&VarKey::PalletEntry { node: n, product: p, state, day });
                    let inv = self.pos(&VarKey::Inventory { node: n, product: p, state, day });

                    let mut expr = LinExpr::new();
                    expr.add(count, units_per_pallet).add(inv, -1.0);
                    self.add_row(
                        format!("pallet_cover_{ntag}_{ptag}_{stag}_d{day}"),
                        expr,
                        RowSense::Ge,
                        0.0,
                    );

                    let mut expr = LinExpr::new();
                    expr.add(entry, 1.0).add(count, -1.0);
                    let rhs = if day > 0 {
                        expr.add(
                            self.pos(&VarKey::PalletCount { node: n, product: p, state, day: day - 1 }),
                            1.0,
                        );
                        0.0
                    } else {
                        -opening_pallets
                    };
                    self.add_row(
                        format!("pallet_grow_{ntag}_{ptag}_{stag}_d{day}"),
                        expr,
                        RowSense::Ge,
                        rhs,
                    );
                }
            }
        }
    }

    fn add_truck_rows(&mut self) {
        let idx = self.idx;

        // Shipments on trucked lanes ride integer pallets.
        for (ri, route) in idx.routes.iter().enumerate() {
            if route.trucks.is_empty() {
                continue;
            }
            let otag = self.node_tag(route.origin);
            let dtag = self.node_tag(route.dest);
            for p in 0..idx.products.len() {
                let ptag = self.product_tag(p);
                let units_per_pallet = idx.products[p].units_per_pallet as f64;
                for &day in &route.departure_days {
                    let mut expr = LinExpr::new();
                    expr.add(self.pos(&VarKey::InTransit { route: ri, product: p, day }), 1.0);
                    for &truck in &route.trucks {
                        expr.add_opt(
                            self.try_pos(&VarKey::TruckLoad { truck, route: ri, product: p, day }),
                            -units_per_pallet,
                        );
                    }
                    self.add_row(
                        format!("lane_{otag}_{dtag}_{ptag}_d{day}"),
                        expr,
                        RowSense::Le,
                        0.0,
                    );
                }
            }
        }

        // Per-departure capacity, gated on the departure being used.
        for &(truck, day) in &idx.truck_departures {
            let data = &idx.trucks[truck];
            let ttag = super::vars::lp_name(data.schedule.id.as_str());
            let capacity = data.schedule.capacity_pallets as f64;
            let mut expr = LinExpr::new();
            for &(_, ri) in &data.destinations {
                if !idx.routes[ri].departs_on(day) {
                    continue;
                }
                for p in 0..idx.products.len() {
                    expr.add_opt(
                        self.try_pos(&VarKey::TruckLoad { truck, route: ri, product: p, day }),
                        1.0,
                    );
                }
            }
            expr.add(self.pos(&VarKey::TruckUsed { truck, day }), -capacity);
            self.add_row(format!("truck_cap_{ttag}_d{day}"), expr, RowSense::Le, 0.0);
        }
    }

    /// Pallet tracking off: cap trucked lanes in fractional pallet
    /// equivalents per departure day.
    fn add_unit_capacity_rows(&mut self) {
        let idx = self.idx;
        for (ri, route) in idx.routes.iter().enumerate() {
            if route.trucks.is_empty() {
                continue;
            }
            let otag = self.node_tag(route.origin);
            let dtag = self.node_tag(route.dest);
            for &day in &route.departure_days {
                let date = idx.date(day);
                let pallet_capacity: f64 = route
                    .trucks
                    .iter()
                    .filter(|&&t| idx.trucks[t].schedule.departs_on(date))
                    .map(|&t| idx.trucks[t].schedule.capacity_pallets as f64)
                    .sum();
                let mut expr = LinExpr::new();
                for p in 0..idx.products.len() {
                    let units_per_pallet = idx.products[p].units_per_pallet as f64;
                    expr.add(
                        self.pos(&VarKey::InTransit { route: ri, product: p, day }),
                        1.0 / units_per_pallet,
                    );
                }
                self.add_row(
                    format!("lane_cap_{otag}_{dtag}_d{day}"),
                    expr,
                    RowSense::Le,
                    pallet_capacity,
                );
            }
        }
    }
}
