//! Qini curve and AUUC computation over a scored, labelled batch.

use std::cmp::Ordering;

use tracing::{debug, info, warn};

use crate::common::error::{UpliftError, UpliftResult};

use crate::bidding::service::BidEngine;
use crate::inference::domain::UpliftScore;

use super::domain::{
    trapezoid, ArmScoredRow, EvaluationRow, EvaluationSet, QiniCurve, QiniReport,
    StrategyComparison,
};

/// Rows ranked by score, highest first. Ties keep their input order.
fn ranked(set: &EvaluationSet) -> UpliftResult<Vec<EvaluationRow>> {
    if let Some(pos) = set.rows().iter().position(|r| r.uplift_score.is_nan()) {
        return Err(UpliftError::invalid_input(format!(
            "uplift score at row {pos} is NaN"
        )));
    }
    let mut rows = set.rows().to_vec();
    // slice::sort_by is stable; -0.0 and 0.0 must compare equal
    rows.sort_by(|a, b| {
        b.uplift_score
            .partial_cmp(&a.uplift_score)
            .unwrap_or(Ordering::Equal)
    });
    Ok(rows)
}

/// Qini value at every rank: `y_t - y_c * n_t / n_c`, or 0 while `n_c == 0`.
pub fn qini_curve(set: &EvaluationSet) -> UpliftResult<QiniCurve> {
    let rows = ranked(set)?;
    let (mut n_t, mut n_c, mut y_t, mut y_c) = (0u64, 0u64, 0u64, 0u64);
    let values = rows
        .iter()
        .map(|row| {
            if row.treated {
                n_t += 1;
                y_t += u64::from(row.converted);
            } else {
                n_c += 1;
                y_c += u64::from(row.converted);
            }
            if n_c == 0 {
                0.0
            } else {
                y_t as f64 - y_c as f64 * n_t as f64 / n_c as f64
            }
        })
        .collect();
    Ok(QiniCurve::new(values))
}

/// Qini curve plus AUUC, the trapezoidal area normalised by `n * final_qini`.
///
/// Fails with `DegenerateEvaluation` when the final Qini value is zero (which
/// includes the empty set), since the normalisation is then undefined.
pub fn evaluate(set: &EvaluationSet) -> UpliftResult<(QiniCurve, f64)> {
    let curve = qini_curve(set)?;
    let last = curve.final_value().unwrap_or(0.0);
    if last == 0.0 {
        warn!(rows = set.len(), "final qini value is zero; auuc undefined");
        return Err(UpliftError::DegenerateEvaluation { rows: set.len() });
    }
    let auuc = curve.area() / (set.len() as f64 * last);
    debug!(rows = set.len(), final_qini = last, auuc, "uplift evaluation");
    Ok((curve, auuc))
}

/// Full report for the reporting collaborator, including the random baseline.
pub fn report(set: &EvaluationSet) -> UpliftResult<QiniReport> {
    let (curve, auuc) = evaluate(set)?;
    let final_qini = curve.final_value().unwrap_or(0.0);
    let baseline = curve.random_baseline();
    let random_auuc = trapezoid(baseline.values()) / (set.len() as f64 * final_qini);
    Ok(QiniReport {
        rows: set.len(),
        treated: set.treated(),
        controls: set.controls(),
        final_qini,
        auuc,
        random_auuc,
        curve,
    })
}

fn by_bid<F>(rows: &[ArmScoredRow], bid: F) -> EvaluationSet
where
    F: Fn(&ArmScoredRow) -> f64,
{
    rows.iter()
        .map(|row| EvaluationRow::new(bid(row), row.treated, row.converted))
        .collect()
}

/// Rank one held-out batch by each bid strategy and trace a Qini curve for both.
///
/// Propensity ranks by `p_t * value`, uplift by `max(0, (p_t - p_c) * value)`,
/// both at a unit multiplier. Equal bids keep input order.
pub fn compare_strategies(
    rows: &[ArmScoredRow],
    engine: &BidEngine,
) -> UpliftResult<StrategyComparison> {
    if let Some(pos) = rows.iter().position(|row| row.validate().is_err()) {
        return Err(UpliftError::invalid_input(format!(
            "row {pos} carries a value outside [0, 1]"
        )));
    }
    let propensity = qini_curve(&by_bid(rows, |row| {
        engine.bid_propensity(row.p_treatment, 1.0).amount()
    }))?;
    let uplift = qini_curve(&by_bid(rows, |row| {
        let score = UpliftScore::from_probabilities(row.p_treatment, row.p_control);
        engine.bid(score, 1.0).amount()
    }))?;

    let comparison = StrategyComparison { propensity, uplift };
    info!(
        rows = rows.len(),
        propensity_area = comparison.propensity.area(),
        uplift_area = comparison.uplift.area(),
        "strategy comparison"
    );
    Ok(comparison)
}
