/// Round half away from zero to `places` decimals.
pub fn round_to(value: f64, places: i32) -> f64 {
    let scale = 10f64.powi(places);
    (value * scale).round() / scale
}

pub fn round2(value: f64) -> f64 {
    round_to(value, 2)
}

/// Waste factor (1.07) to whole percent (7).
pub fn waste_percent_from_factor(factor: f64) -> f64 {
    ((factor - 1.0) * 100.0).round()
}

pub fn factor_from_percent(percent: f64) -> f64 {
    round_to(1.0 + percent / 100.0, 4)
}

/// Keys for grouping floating factors in maps.
pub fn factor_key(value: f64) -> String {
    format!("{:.2}", value)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_round_to() {
        assert_eq!(round2(33.2549), 33.25);
        assert_eq!(round_to(2.857142, 4), 2.8571);
        assert_eq!(round2(-1.005_1), -1.01);
    }

    #[test]
    fn test_waste_percent_roundtrip_is_stable() {
        for factor in [1.03, 1.05, 1.07, 1.10, 1.15] {
            let pct = waste_percent_from_factor(factor);
            assert!((factor_from_percent(pct) - factor).abs() < 1e-9);
        }
        assert_eq!(waste_percent_from_factor(1.15), 15.0);
    }
}
