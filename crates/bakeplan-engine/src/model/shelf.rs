//! Sliding-window shelf-life rows.
//!
//! For a state with shelf life `L`, mass leaving the state on day `t`
//! must have entered it within `[t-L+1, t]`. Summed over that window:
//!
//! ```text
//! sum(outflows over window) <= sum(state entries over window)
//! ```
//!
//! This caps cumulative consumption of state-`s` mass by the mass that
//! entered `s` within the last `L` days. That is the age check, with no
//! per-batch variables.
//!
//! Rows are only emitted once the window has slid past the first horizon
//! day (`t >= L`). While the window still covers the start, the
//! inequality is the telescoped stock balance plus `inv >= 0`, already
//! in the model; and because opening stock enters those balances exactly
//! once, skipping the covered windows is also what keeps the opening
//! stock from being re-counted into every window that overlaps it.

use super::vars::{LinExpr, RowSense, VarKey};
use super::ModelBuilder;
use bakeplan_core::StorageState;

impl ModelBuilder<'_> {
    pub(crate) fn add_shelf_life_rows(&mut self) {
        let idx = self.idx;
        for &(n, state) in &idx.storage {
            let ntag = self.node_tag(n);
            let stag = Self::state_tag(state);
            for p in 0..idx.products.len() {
                let life = idx.products[p].shelf_life_days(state) as usize;
                if life == 0 {
                    continue; // rejected at validation; defensive skip
                }
                let ptag = self.product_tag(p);
                for day in life..idx.horizon() {
                    let window = (day + 1 - life)..=day;
                    let mut expr = LinExpr::new();
                    for tau in window {
                        self.window_day_terms(&mut expr, n, p, state, tau);
                    }
                    if expr.is_empty() {
                        continue;
                    }
                    self.add_row(
                        format!("life_{ntag}_{ptag}_{stag}_d{day}"),
                        expr,
                        RowSense::Le,
                        0.0,
                    );
                }
            }
        }
    }

    /// Outflows at +1 and state entries at -1 for one window day.
    fn window_day_terms(
        &self,
        expr: &mut LinExpr,
        n: usize,
        p: usize,
        state: StorageState,
        tau: usize,
    ) {
        let idx = self.idx;

        for ri in idx.departures_from(n, state, tau) {
            expr.add(self.pos(&VarKey::InTransit { route: ri, product: p, day: tau }), 1.0);
        }
        expr.add_opt(
            self.try_pos(&VarKey::Disposal { node: n, product: p, state, day: tau }),
            1.0,
        );

        match state {
            StorageState::Ambient => {
                expr.add_opt(self.try_pos(&VarKey::Freeze { node: n, product: p, day: tau }), 1.0);
                expr.add_opt(
                    self.try_pos(&VarKey::ConsumedAmbient { node: n, product: p, day: tau }),
                    1.0,
                );
                if idx.nodes[n].produces {
                    expr.add(self.pos(&VarKey::Production { node: n, product: p, day: tau }), -1.0);
                }
            }
            StorageState::Frozen => {
                expr.add_opt(self.try_pos(&VarKey::Thaw { node: n, product: p, day: tau }), 1.0);
                expr.add_opt(self.try_pos(&VarKey::Freeze { node: n, product: p, day: tau }), -1.0);
            }
            StorageState::Thawed => {
                expr.add_opt(
                    self.try_pos(&VarKey::ConsumedThawed { node: n, product: p, day: tau }),
                    1.0,
                );
                expr.add_opt(self.try_pos(&VarKey::Thaw { node: n, product: p, day: tau }), -1.0);
            }
        }

        for (ri, dep) in idx.arrivals_into(n, state, tau) {
            expr.add(self.pos(&VarKey::InTransit { route: ri, product: p, day: dep }), -1.0);
        }
    }
}
