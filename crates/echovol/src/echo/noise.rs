/// Drop timestamps that are not corroborated by an adjacent sample.
///
/// A timestamp survives when its immediate predecessor or successor lies
/// strictly closer than `tolerance_us`. Input is assumed to be in capture
/// order (monotonic); only adjacent pairs are compared. Output is an
/// order-preserving subsequence of the input.
pub fn reject_isolated(timestamps_us: &[f64], tolerance_us: f64) -> Vec<f64> {
    let n = timestamps_us.len();
    if n < 2 {
        return Vec::new();
    }

    let close = |i: usize, j: usize| (timestamps_us[i] - timestamps_us[j]).abs() < tolerance_us;

    (0..n)
        .filter(|&i| (i > 0 && close(i, i - 1)) || (i + 1 < n && close(i, i + 1)))
        .map(|i| timestamps_us[i])
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::prelude::*;

    const TOL: f64 = 0.7;

    #[test]
    fn isolated_outlier_is_rejected() {
        let out = reject_isolated(&[20.0, 20.3, 45.0], TOL);
        assert_eq!(out, vec![20.0, 20.3]);
    }

    #[test]
    fn clock_period_pair_is_retained() {
        let out = reject_isolated(&[30.0, 30.5], TOL);
        assert_eq!(out, vec![30.0, 30.5]);
    }

    #[test]
    fn single_and_empty_inputs_yield_nothing() {
        assert!(reject_isolated(&[], TOL).is_empty());
        assert!(reject_isolated(&[25.0], TOL).is_empty());
    }

    #[test]
    fn tolerance_is_strict() {
        assert!(reject_isolated(&[10.0, 10.75], TOL).is_empty());
        assert!(reject_isolated(&[10.0, 12.0, 14.0], 2.0).is_empty());
    }

    #[test]
    fn only_adjacent_neighbors_count() {
        // 20.0 and 20.2 are close but separated by 60.0 in capture order.
        let out = reject_isolated(&[20.0, 60.0, 20.2], TOL);
        assert!(out.is_empty());
    }

    #[test]
    fn chain_of_close_samples_survives_whole() {
        let ts = [100.0, 100.5, 101.0, 101.5, 110.0, 110.4];
        assert_eq!(reject_isolated(&ts, TOL), ts.to_vec());
    }

    #[test]
    fn output_is_ordered_subsequence_of_input() {
        let mut rng = StdRng::seed_from_u64(7);
        for _ in 0..200 {
            let n = rng.gen_range(0..30);
            let mut t = 0.0f64;
            let ts: Vec<f64> = (0..n)
                .map(|_| {
                    t += rng.gen_range(0.0..2.0);
                    t
                })
                .collect();
            let out = reject_isolated(&ts, TOL);

            let mut it = ts.iter();
            for v in &out {
                assert!(it.any(|x| x == v), "{v} not found in order in {ts:?}");
            }
            for (k, v) in out.iter().enumerate() {
                let i = ts.iter().position(|x| x == v).unwrap();
                let has_neighbor = (i > 0 && (ts[i] - ts[i - 1]).abs() < TOL)
                    || (i + 1 < ts.len() && (ts[i + 1] - ts[i]).abs() < TOL);
                assert!(has_neighbor, "retained value #{k} ({v}) is isolated");
            }
        }
    }
}
