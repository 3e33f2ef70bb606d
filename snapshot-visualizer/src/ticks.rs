/// Round tick positions covering `[lo, hi]` with roughly `target` intervals.
/// Steps are 1, 2 or 5 times a power of ten.
pub fn nice_ticks(lo: f64, hi: f64, target: usize) -> (Vec<f64>, f64) {
    if !lo.is_finite() || !hi.is_finite() || hi <= lo || target == 0 {
        return (vec![lo], 0.0);
    }
    let raw = (hi - lo) / target as f64;
    let magnitude = 10f64.powi(raw.log10().floor() as i32);
    let norm = raw / magnitude;
    let step = magnitude
        * if norm < 1.5 {
            1.0
        } else if norm < 3.0 {
            2.0
        } else if norm < 7.0 {
            5.0
        } else {
            10.0
        };

    let eps = step * 1e-9;
    let mut ticks = Vec::new();
    let mut k = (lo / step - 1e-9).ceil();
    loop {
        let mut v = k * step;
        if v > hi + eps {
            break;
        }
        if v.abs() < eps {
            v = 0.0;
        }
        ticks.push(v);
        k += 1.0;
    }
    (ticks, step)
}

/// Label for tick value `v` given the tick spacing.
pub fn format_tick(v: f64, step: f64) -> String {
    let scale = v.abs().max(step.abs());
    if scale >= 1e5 || (scale > 0.0 && scale < 1e-3) {
        return format!("{:.1e}", v);
    }
    let decimals = if step >= 1.0 || step <= 0.0 {
        0
    } else {
        ((-step.log10()).ceil() as usize).min(6)
    };
    format!("{:.*}", decimals, v)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unit_range() {
        let (ticks, step) = nice_ticks(0.0, 1.0, 5);
        assert_eq!(step, 0.2);
        assert_eq!(ticks.len(), 6);
        assert_eq!(ticks[0], 0.0);
        assert!((ticks[5] - 1.0).abs() < 1e-12);
    }

    #[test]
    fn test_symmetric_range_has_exact_zero() {
        let (ticks, step) = nice_ticks(-3.0, 3.0, 6);
        assert_eq!(step, 1.0);
        assert!(ticks.contains(&0.0));
        assert_eq!(ticks.first(), Some(&-3.0));
        assert_eq!(ticks.last(), Some(&3.0));
    }

    #[test]
    fn test_ticks_stay_inside_range() {
        let (ticks, _) = nice_ticks(0.37, 2.91, 5);
        assert!(!ticks.is_empty());
        assert!(ticks.iter().all(|&t| (0.37..=2.91).contains(&t)));
    }

    #[test]
    fn test_degenerate_range() {
        let (ticks, step) = nice_ticks(2.0, 2.0, 5);
        assert_eq!(ticks, vec![2.0]);
        assert_eq!(step, 0.0);
        let (ticks, _) = nice_ticks(f64::NAN, 1.0, 5);
        assert_eq!(ticks.len(), 1);
    }

    #[test]
    fn test_format_tick() {
        assert_eq!(format_tick(2.0, 1.0), "2");
        assert_eq!(format_tick(0.4, 0.2), "0.4");
        assert_eq!(format_tick(0.25, 0.05), "0.25");
        assert_eq!(format_tick(-1.5, 0.5), "-1.5");
        assert_eq!(format_tick(250000.0, 50000.0), "2.5e5");
        assert_eq!(format_tick(0.0002, 0.0001), "2.0e-4");
    }
}
