//! Sound level helpers with amplitude (20*log10) semantics.
//!
//! Levels are in dB SPL. Source levels are referenced to a measurement
//! distance (20 cm for cricket calls); propagation is spherical spreading.

/// Convert a level in dB to its linear pressure equivalent.
#[inline]
pub fn db_to_pressure(db: f64) -> f64 {
    10.0_f64.powf(db / 20.0)
}

/// Convert a linear pressure equivalent back to dB.
#[inline]
pub fn pressure_to_db(p: f64) -> f64 {
    20.0 * p.log10()
}

/// One-way transmission loss at `distance` for a source measured at `reference`.
#[inline]
pub fn transmission_loss(distance: f64, reference: f64) -> f64 {
    20.0 * (distance / reference).log10()
}

/// Level received at `distance` from a source of `source_db`.
///
/// Distance 0 returns the source level unchanged.
#[inline]
pub fn received_level(source_db: f64, distance: f64, reference: f64) -> f64 {
    if distance > 0.0 {
        source_db - transmission_loss(distance, reference)
    } else {
        source_db
    }
}

/// Sum several sources in the pressure domain. Returns 0 for no sources.
pub fn combine_levels<I: IntoIterator<Item = f64>>(levels: I) -> f64 {
    let mut total = 0.0;
    let mut any = false;
    for db in levels {
        total += db_to_pressure(db);
        any = true;
    }
    if any {
        pressure_to_db(total)
    } else {
        0.0
    }
}

/// Distance at which a source decays to `threshold_db`.
pub fn active_space_radius(source_db: f64, threshold_db: f64, reference: f64) -> f64 {
    reference * db_to_pressure(source_db - threshold_db)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pressure_roundtrip() {
        assert!((pressure_to_db(db_to_pressure(60.8)) - 60.8).abs() < 1e-9);
    }

    #[test]
    fn loss_is_zero_at_reference() {
        assert!(transmission_loss(20.0, 20.0).abs() < 1e-12);
        assert!((received_level(60.0, 40.0, 20.0) - (60.0 - 6.0206)).abs() < 1e-3);
    }

    #[test]
    fn two_equal_sources_add_six_db() {
        let combined = combine_levels([60.0, 60.0]);
        assert!((combined - 66.0206).abs() < 1e-3);
        assert_eq!(combine_levels(std::iter::empty()), 0.0);
    }

    #[test]
    fn active_space_hits_threshold() {
        let r = active_space_radius(70.0, 45.0, 20.0);
        assert!((received_level(70.0, r, 20.0) - 45.0).abs() < 1e-9);
    }
}
