//! Results extraction and the canonical result shape
//!
//! Pulls numeric results from the engine's output surface and normalizes
//! the heterogeneous shapes (step series, predefined curves, single
//! values) into [`AnalysisResults`]. All curve components are stored as
//! absolute values regardless of the engine's sign convention.

use serde::Serialize;

use crate::error::EngineError;
use crate::session::EngineSession;

/// One (penetration, load) sample of the load-penetration relationship
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct CurvePoint {
    /// Penetration below mudline, metres, non-negative
    pub penetration: f64,
    /// Vertical load, kN, non-negative
    pub load: f64,
}

/// Canonical analysis result
#[derive(Debug, Clone, Default, Serialize)]
pub struct AnalysisResults {
    pub final_penetration_depth: Option<f64>,
    pub peak_vertical_resistance: Option<f64>,
    pub load_penetration_curve: Vec<CurvePoint>,
}

/// Zip two parallel arrays into curve points, sign-stripped.
///
/// Engine step order is physical order, so the zip is positional and
/// order-preserving. Arrays of different length keep only the overlapping
/// prefix; rows with non-finite values are dropped with a warning.
pub fn zip_curve(displacements: &[f64], loads: &[f64]) -> Vec<CurvePoint> {
    if displacements.len() != loads.len() {
        tracing::warn!(
            displacements = displacements.len(),
            loads = loads.len(),
            "series lengths differ; keeping overlapping prefix"
        );
    }
    displacements
        .iter()
        .zip(loads.iter())
        .filter_map(|(&d, &l)| {
            if d.is_finite() && l.is_finite() {
                Some(CurvePoint {
                    penetration: d.abs(),
                    load: l.abs(),
                })
            } else {
                tracing::warn!(displacement = d, load = l, "dropping non-finite curve row");
                None
            }
        })
        .collect()
}

/// Retrieve the load-penetration curve as two step-indexed series zipped
/// positionally.
pub fn curve(
    session: &mut dyn EngineSession,
    target: &str,
    displacement_metric: &str,
    load_metric: &str,
) -> Result<Vec<CurvePoint>, EngineError> {
    let displacements = session.query_series(target, displacement_metric)?;
    let loads = session.query_series(target, load_metric)?;
    Ok(zip_curve(&displacements, &loads))
}

/// Retrieve a predefined (x, y) curve the engine recorded during the
/// calculation. Same normalization as the step-series strategy.
pub fn predefined_curve(
    session: &mut dyn EngineSession,
    curve_name: &str,
) -> Result<Vec<CurvePoint>, EngineError> {
    let xs = session.query_series(curve_name, "x")?;
    let ys = session.query_series(curve_name, "y")?;
    Ok(zip_curve(&xs, &ys))
}

/// Final element of the step series for `metric`, or `None` when the
/// series is empty. Used where the engine offers no direct single-value
/// query.
pub fn single_value(
    session: &mut dyn EngineSession,
    target: &str,
    metric: &str,
) -> Result<Option<f64>, EngineError> {
    let series = session.query_series(target, metric)?;
    Ok(series.last().map(|v| v.abs()))
}

/// Compile the canonical result from a curve and an optional explicit
/// final penetration.
///
/// Peak resistance is the maximum load over the whole curve, unloading
/// branches included; an empty curve reports 0. Final penetration falls
/// back to the last curve point.
pub fn compile(curve: Vec<CurvePoint>, explicit_final_penetration: Option<f64>) -> AnalysisResults {
    let peak = curve.iter().map(|p| p.load).fold(0.0_f64, f64::max);
    let final_penetration =
        explicit_final_penetration.or_else(|| curve.last().map(|p| p.penetration));
    AnalysisResults {
        final_penetration_depth: final_penetration,
        peak_vertical_resistance: Some(peak),
        load_penetration_curve: curve,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::session::MockSession;

    #[test]
    fn test_compile_reference_curve() {
        let curve = vec![
            CurvePoint { penetration: 0.0, load: 0.0 },
            CurvePoint { penetration: 0.1, load: 150.5 },
            CurvePoint { penetration: 0.2, load: 350.0 },
            CurvePoint { penetration: 0.3, load: 500.25 },
        ];
        let results = compile(curve, None);
        assert_eq!(results.peak_vertical_resistance, Some(500.25));
        assert_eq!(results.final_penetration_depth, Some(0.3));
        assert_eq!(results.load_penetration_curve.len(), 4);
    }

    #[test]
    fn test_compile_empty_curve() {
        let results = compile(vec![], None);
        assert_eq!(results.peak_vertical_resistance, Some(0.0));
        assert_eq!(results.final_penetration_depth, None);
    }

    #[test]
    fn test_compile_explicit_final_penetration_wins() {
        let curve = vec![CurvePoint { penetration: 0.5, load: 10.0 }];
        let results = compile(curve, Some(0.8));
        assert_eq!(results.final_penetration_depth, Some(0.8));
    }

    #[test]
    fn test_compile_peak_covers_unloading_branch() {
        // load rises then unloads; peak stays at the maximum
        let curve = vec![
            CurvePoint { penetration: 0.1, load: 100.0 },
            CurvePoint { penetration: 0.2, load: 400.0 },
            CurvePoint { penetration: 0.3, load: 250.0 },
        ];
        assert_eq!(compile(curve, None).peak_vertical_resistance, Some(400.0));
    }

    #[test]
    fn test_step_series_signs_stripped_order_preserved() {
        let mut session = MockSession::new();
        session.set_series("ref", "Uz", vec![-0.0, -0.1, -0.2, -0.3, -0.4]);
        session.set_series("ref", "SumFz", vec![0.0, -150.0, -300.0, -450.0, -600.0]);
        let points = curve(&mut session, "ref", "Uz", "SumFz").unwrap();
        assert_eq!(points.len(), 5);
        for (i, point) in points.iter().enumerate() {
            assert!(point.penetration >= 0.0);
            assert!(point.load >= 0.0);
            assert_eq!(point.penetration, 0.1 * i as f64);
        }
    }

    #[test]
    fn test_zip_keeps_overlapping_prefix_on_length_mismatch() {
        let points = zip_curve(&[0.1, 0.2, 0.3], &[10.0, 20.0]);
        assert_eq!(points.len(), 2);
        assert_eq!(points[1].load, 20.0);
    }

    #[test]
    fn test_zip_drops_non_finite_rows() {
        let points = zip_curve(&[0.1, f64::NAN, 0.3], &[10.0, 20.0, 30.0]);
        assert_eq!(points.len(), 2);
        assert_eq!(points[1].penetration, 0.3);
    }

    #[test]
    fn test_predefined_curve_uses_xy_pair() {
        let mut session = MockSession::new();
        session.set_series("lp_curve", "x", vec![-0.1, -0.2]);
        session.set_series("lp_curve", "y", vec![-120.0, -240.0]);
        let points = predefined_curve(&mut session, "lp_curve").unwrap();
        assert_eq!(points.len(), 2);
        assert_eq!(points[1].penetration, 0.2);
        assert_eq!(points[1].load, 240.0);
    }

    #[test]
    fn test_single_value_is_last_of_series() {
        let mut session = MockSession::new();
        session.set_series("ref", "Uz", vec![-0.1, -0.2, -0.35]);
        assert_eq!(single_value(&mut session, "ref", "Uz").unwrap(), Some(0.35));
    }

    #[test]
    fn test_single_value_empty_series_is_none() {
        let mut session = MockSession::new();
        assert_eq!(single_value(&mut session, "ref", "Uz").unwrap(), None);
    }
}
