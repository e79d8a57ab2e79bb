//! Production-labor linkage.
//!
//! Production quantities are integer mixes; run starts drive changeover
//! cost and changeover hours. The production indicators are linked in
//! both directions:
//!
//! - forward: `production <= M * product_produced` keeps the indicator
//!   honest when production is positive;
//! - aggregate: `sum_p production >= eps * any_production` plus the tiny
//!   objective weight on `product_produced` keeps `any_production` at
//!   zero when nothing is made. The forward bound alone admits
//!   `any_production = 1` with zero output, which would bill phantom
//!   startup and minimum-payment hours. Per-product epsilon forcing is
//!   deliberately absent: it tightens the LP relaxation enough to slow
//!   the branch-and-bound measurably.
//!
//! Paid hours satisfy `paid >= used`, the non-fixed-day minimum block
//! when anything is produced, and `paid <= ceiling * any_production` so
//! idle days cost nothing.

use super::vars::{LinExpr, RowSense, VarKey};
use super::ModelBuilder;
use bakeplan_core::{PlanError, PlanResult};

impl ModelBuilder<'_> {
    pub(crate) fn add_labor_rows(&mut self) -> PlanResult<()> {
        let idx = self.idx;
        let costs = &self.bundle.cost_structure;
        let max_daily = costs.max_daily_production();
        let max_hours = costs.max_hours_per_day;
        let rate = costs.production_rate_units_per_hour;
        if rate <= 0.0 {
            return Err(PlanError::ModelBuild(
                "production rate must be positive".into(),
            ));
        }
        let epsilon = idx
            .products
            .iter()
            .map(|p| p.units_per_mix as f64)
            .fold(f64::INFINITY, f64::min)
            .max(1.0);

        for &n in &idx.producers {
            let ntag = self.node_tag(n);
            for day in 0..idx.horizon() {
                let date = idx.date(day);
                let labor = self.bundle.labor_calendar.day(date).ok_or_else(|| {
                    PlanError::ModelBuild(format!("labor calendar has no entry for {date}"))
                })?;
                let any = self.pos(&VarKey::AnyProduction { node: n, day });
                let used = self.pos(&VarKey::LaborUsed { node: n, day });
                let paid = self.pos(&VarKey::LaborPaid { node: n, day });
                let regular = self.pos(&VarKey::LaborRegular { node: n, day });
                let overtime = self.pos(&VarKey::LaborOvertime { node: n, day });

                let mut hours = LinExpr::new();
                hours.add(used, 1.0);

                let mut floor = LinExpr::new();
                floor.add(any, -epsilon);

                for p in 0..idx.products.len() {
                    let ptag = self.product_tag(p);
                    let production = self.pos(&VarKey::Production { node: n, product: p, day });
                    let mixes = self.pos(&VarKey::MixCount { node: n, product: p, day });
                    let produced = self.pos(&VarKey::ProductProduced { node: n, product: p, day });
                    let start = self.pos(&VarKey::ProductStart { node: n, product: p, day });
                    let units_per_mix = idx.products[p].units_per_mix as f64;

                    let mut expr = LinExpr::new();
                    expr.add(production, 1.0).add(mixes, -units_per_mix);
                    self.add_row(format!("mix_{ntag}_{ptag}_d{day}"), expr, RowSense::Eq, 0.0);

                    let mut expr = LinExpr::new();
                    expr.add(production, 1.0).add(produced, -max_daily);
                    self.add_row(format!("ind_{ntag}_{ptag}_d{day}"), expr, RowSense::Le, 0.0);

                    let mut expr = LinExpr::new();
                    expr.add(produced, 1.0).add(any, -1.0);
                    self.add_row(format!("sku_any_{ntag}_{ptag}_d{day}"), expr, RowSense::Le, 0.0);

                    let mut expr = LinExpr::new();
                    expr.add(start, 1.0).add(produced, -1.0);
                    if day > 0 {
                        expr.add(
                            self.pos(&VarKey::ProductProduced { node: n, product: p, day: day - 1 }),
                            1.0,
                        );
                    }
                    self.add_row(format!("run_{ntag}_{ptag}_d{day}"), expr, RowSense::Ge, 0.0);

                    hours.add(production, -1.0 / rate);
                    hours.add(start, -costs.changeover_hours);
                    floor.add(production, 1.0);
                }

                hours.add(any, -costs.daily_startup_hours);
                self.add_row(format!("hours_{ntag}_d{day}"), hours, RowSense::Eq, 0.0);

                self.add_row(format!("min_make_{ntag}_d{day}"), floor, RowSense::Ge, 0.0);

                let mut expr = LinExpr::new();
                expr.add(paid, 1.0).add(regular, -1.0).add(overtime, -1.0);
                self.add_row(format!("pay_split_{ntag}_d{day}"), expr, RowSense::Eq, 0.0);

                let mut expr = LinExpr::new();
                expr.add(paid, 1.0).add(used, -1.0);
                self.add_row(format!("pay_floor_{ntag}_d{day}"), expr, RowSense::Ge, 0.0);

                if !labor.is_fixed && labor.minimum_paid_hours > 0.0 {
                    let mut expr = LinExpr::new();
                    expr.add(paid, 1.0).add(any, -labor.minimum_paid_hours);
                    self.add_row(format!("pay_min_{ntag}_d{day}"), expr, RowSense::Ge, 0.0);
                }

                let mut expr = LinExpr::new();
                expr.add(paid, 1.0).add(any, -max_hours);
                self.add_row(format!("pay_gate_{ntag}_d{day}"), expr, RowSense::Le, 0.0);
            }
        }
        Ok(())
    }
}
