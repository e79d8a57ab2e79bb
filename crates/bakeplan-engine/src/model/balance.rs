//! Stock balance rows.
//!
//! One equation per (node, product, state, day) the node supports:
//!
//! ```text
//! inv[t] = inv[t-1] + inflows(t) - outflows(t)
//! ```
//!
//! written with inflows at -1 and outflows at +1 so the row reads
//! `inv[t] - inv[t-1] - in + out = 0`, with the opening stock folded
//! into the right-hand side on the first day. Freeze leaves ambient and
//! enters frozen at the same node; thaw leaves frozen and enters thawed;
//! arrivals enter in the route's arrival state (a frozen route into a
//! node without frozen storage arrives thawed).

use super::vars::{LinExpr, RowSense, VarKey};
use super::ModelBuilder;
use bakeplan_core::StorageState;

impl ModelBuilder<'_> {
    pub(crate) fn add_balance_rows(&mut self) {
        let idx = self.idx;
        for &(n, state) in &idx.storage {
            let ntag = self.node_tag(n);
            let stag = Self::state_tag(state);
            for p in 0..idx.products.len() {
                let ptag = self.product_tag(p);
                for day in 0..idx.horizon() {
                    let mut expr = LinExpr::new();
                    expr.add(
                        self.pos(&VarKey::Inventory { node: n, product: p, state, day }),
                        1.0,
                    );
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
                        expr.add(
                            self.pos(&VarKey::Production { node: n, product: p, day }),
                            -1.0,
                        );
                    }

                    for (ri, dep) in idx.arrivals_into(n, state, day) {
                        expr.add(
                            self.pos(&VarKey::InTransit { route: ri, product: p, day: dep }),
                            -1.0,
                        );
                    }

                    match state {
                        StorageState::Ambient => {
                            expr.add_opt(
                                self.try_pos(&VarKey::Freeze { node: n, product: p, day }),
                                1.0,
                            );
                            expr.add_opt(
                                self.try_pos(&VarKey::ConsumedAmbient { node: n, product: p, day }),
                                1.0,
                            );
                        }
                        StorageState::Frozen => {
                            expr.add_opt(
                                self.try_pos(&VarKey::Freeze { node: n, product: p, day }),
                                -1.0,
                            );
                            expr.add_opt(
                                self.try_pos(&VarKey::Thaw { node: n, product: p, day }),
                                1.0,
                            );
                        }
                        StorageState::Thawed => {
                            expr.add_opt(
                                self.try_pos(&VarKey::Thaw { node: n, product: p, day }),
                                -1.0,
                            );
                            expr.add_opt(
                                self.try_pos(&VarKey::ConsumedThawed { node: n, product: p, day }),
                                1.0,
                            );
                        }
                    }

                    for ri in idx.departures_from(n, state, day) {
                        expr.add(
                            self.pos(&VarKey::InTransit { route: ri, product: p, day }),
                            1.0,
                        );
                    }

                    expr.add_opt(
                        self.try_pos(&VarKey::Disposal { node: n, product: p, state, day }),
                        1.0,
                    );

                    self.add_row(
                        format!("bal_{ntag}_{ptag}_{stag}_d{day}"),
                        expr,
                        RowSense::Eq,
                        rhs,
                    );
                }
            }
        }

        self.add_capacity_rows();
    }

    /// Per-state storage caps, where the node declares one.
    fn add_capacity_rows(&mut self) {
        let idx = self.idx;
        for &(n, state) in &idx.storage {
            let Some(cap) = idx.nodes[n].capacity(state) else {
                continue;
            };
            let ntag = self.node_tag(n);
            let stag = Self::state_tag(state);
            for day in 0..idx.horizon() {
                let mut expr = LinExpr::new();
                for p in 0..idx.products.len() {
                    expr.add(
                        self.pos(&VarKey::Inventory { node: n, product: p, state, day }),
                        1.0,
                    );
                }
                self.add_row(format!("cap_{ntag}_{stag}_d{day}"), expr, RowSense::Le, cap);
            }
        }
    }
}
