//! ---
//! ems_section: "08-energy-models-optimization"
//! ems_subsection: "module"
//! ems_type: "source"
//! ems_scope: "code"
//! ems_description: "Breaker rating selection."
//! ems_version: "v0.0.0-prealpha"
//! ems_owner: "tbd"
//! ---
use crate::{tables::BreakerSeries, EPSILON};

/// Smallest rating with `Ib <= In <= Iz`.
///
/// Falls back to the smallest rating covering `Ib` regardless of `Iz`, then
/// to the largest rating of the series. A fallback result exceeds `Iz` and
/// must be surfaced by the caller. An empty series yields `0.0`.
pub fn select_breaker(design_current_a: f64, ampacity_a: f64, series: &BreakerSeries) -> f64 {
    let ratings = series.sorted();
    let covers = |rating: f64| rating + EPSILON >= design_current_a;

    ratings
        .iter()
        .copied()
        .find(|&rating| covers(rating) && rating <= ampacity_a + EPSILON)
        .or_else(|| ratings.iter().copied().find(|&rating| covers(rating)))
        .or_else(|| ratings.last().copied())
        .unwrap_or(0.0)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn series() -> BreakerSeries {
        BreakerSeries::new(vec![6.0, 10.0, 16.0, 20.0, 25.0, 32.0])
    }

    #[test]
    fn picks_smallest_rating_between_design_current_and_ampacity() {
        assert_eq!(select_breaker(12.0, 16.0, &series()), 16.0);
        assert_eq!(select_breaker(10.0, 23.0, &series()), 10.0);
        assert_eq!(select_breaker(2.0, 23.0, &series()), 6.0);
    }

    #[test]
    fn ignores_ampacity_when_no_rating_fits() {
        // Nothing in [17, 18]; the smallest rating covering Ib is 20 A.
        assert_eq!(select_breaker(17.0, 18.0, &series()), 20.0);
    }

    #[test]
    fn returns_largest_rating_when_design_current_exceeds_series() {
        assert_eq!(select_breaker(40.0, 100.0, &series()), 32.0);
    }

    #[test]
    fn unsorted_series_is_scanned_ascending() {
        let series = BreakerSeries::new(vec![32.0, 10.0, 25.0, 16.0]);
        assert_eq!(select_breaker(11.0, 30.0, &series), 16.0);
    }

    #[test]
    fn tolerates_rounding_at_boundaries() {
        assert_eq!(select_breaker(16.0 + 1e-12, 16.0 - 1e-12, &series()), 16.0);
    }

    #[test]
    fn empty_series_yields_zero() {
        assert_eq!(select_breaker(5.0, 10.0, &BreakerSeries::default()), 0.0);
    }
}
