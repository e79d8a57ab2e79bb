//! Demand split and consumption bounds.
//!
//! Consumption is partitioned by source state, with separate variables
//! for demand served from ambient and from thawed stock, so a breadroom
//! receiving both can never double-count a unit:
//!
//! ```text
//! consumed_ambient + consumed_thawed + shortage = demand
//! ```
//!
//! Each source is additionally capped by what that state can physically
//! offer on the day: prior stock plus same-day inflows minus same-day
//! departures and freezes. The caps are written against *inflows and
//! prior inventory only*, never against `inv[t]` itself. Bounding
//! against `inv[t]` couples with the balance row into
//! `consumed <= (prev + in) / 2`, silently halving achievable service
//! and pushing the remainder into disposal.

use super::vars::{LinExpr, RowSense, VarKey};
use super::ModelBuilder;
use bakeplan_core::StorageState;

impl ModelBuilder<'_> {
    pub(crate) fn add_demand_rows(&mut self) {
        let idx = self.idx;
        for (&(n, p, day), &qty) in &idx.demand {
            let ntag = self.node_tag(n);
            let ptag = self.product_tag(p);

            let consumed_ambient = self.try_pos(&VarKey::ConsumedAmbient { node: n, product: p, day });
            let consumed_thawed = self.try_pos(&VarKey::ConsumedThawed { node: n, product: p, day });
            let shortage = self.try_pos(&VarKey::Shortage { node: n, product: p, day });

            let mut expr = LinExpr::new();
            expr.add_opt(consumed_ambient, 1.0);
            expr.add_opt(consumed_thawed, 1.0);
            expr.add_opt(shortage, 1.0);
            self.add_row(format!("dem_{ntag}_{ptag}_d{day}"), expr, RowSense::Eq, qty);

            if let Some(consumed) = consumed_ambient {
                let mut expr = LinExpr::new();
                expr.add(consumed, 1.0);
                let rhs = self.available_today(&mut expr, n, p, day, StorageState::Ambient);
                self.add_row(
                    format!("avail_amb_{ntag}_{ptag}_d{day}"),
                    expr,
                    RowSense::Le,
                    rhs,
                );
            }
            if let Some(consumed) = consumed_thawed {
                let mut expr = LinExpr::new();
                expr.add(consumed, 1.0);
                let rhs = self.available_today(&mut expr, n, p, day, StorageState::Thawed);
                self.add_row(
                    format!("avail_thw_{ntag}_{ptag}_d{day}"),
                    expr,
                    RowSense::Le,
                    rhs,
                );
            }
        }
    }

    /// Append `-(prior stock + inflows) + (departures + state exits)` for
    /// one source state; returns the constant right-hand side (opening
    /// stock on the first day, 0 afterwards).
    fn available_today(
        &self,
        expr: &mut LinExpr,
        n: usize,
        p: usize,
        day: usize,
        state: StorageState,
    ) -> f64 {
        let idx = self.idx;
        let rhs = if day > 0 {
            expr.add(
                self.pos(&VarKey::Inventory { node: n, product: p, state, day: day - 1 }),
                -1.0,
            );
            0.0
        } else {
            idx.opening_stock(n, p, state)
        };

        if state == StorageState::Ambient && idx.nodes[n].produces {
            expr.add(self.pos(&VarKey::Production { node: n, product: p, day }), -1.0);
        }
        for (ri, dep) in idx.arrivals_into(n, state, day) {
            expr.add(
                self.pos(&VarKey::InTransit { route: ri, product: p, day: dep }),
                -1.0,
            );
        }
        match state {
            StorageState::Ambient => {
                expr.add_opt(self.try_pos(&VarKey::Freeze { node: n, product: p, day }), 1.0);
            }
            StorageState::Thawed => {
                expr.add_opt(self.try_pos(&VarKey::Thaw { node: n, product: p, day }), -1.0);
            }
            StorageState::Frozen => {}
        }
        for ri in idx.departures_from(n, state, day) {
            expr.add(self.pos(&VarKey::InTransit { route: ri, product: p, day }), 1.0);
        }
        rhs
    }
}
