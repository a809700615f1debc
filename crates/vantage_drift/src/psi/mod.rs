pub mod monitor;

pub use monitor::*;

/// Smoothed probability: zero (or tiny) bins are lifted to `epsilon`.
///
/// This is a deliberate approximation. It keeps the ratio and log finite but
/// biases both divergences upwards when bins are sparse.
#[inline]
fn smooth(p: f64, epsilon: f64) -> f64 {
    p.max(epsilon)
}

/// Population Stability Index over (reference, current) bin proportions.
///
/// PSI = Σ (p - q) · ln(p / q), with both sides smoothed.
pub fn compute_psi(proportion_pairs: &[(f64, f64)], epsilon: f64) -> f64 {
    proportion_pairs
        .iter()
        .map(|(p, q)| {
            let p_adj = smooth(*p, epsilon);
            let q_adj = smooth(*q, epsilon);
            (p_adj - q_adj) * (p_adj / q_adj).ln()
        })
        .sum::<f64>()
        .max(0.0)
}

/// KL(reference || current) = Σ p · ln(p / q), with both sides smoothed.
///
/// Not symmetric: the reference is the base distribution.
pub fn compute_kl(proportion_pairs: &[(f64, f64)], epsilon: f64) -> f64 {
    proportion_pairs
        .iter()
        .map(|(p, q)| {
            let p_adj = smooth(*p, epsilon);
            let q_adj = smooth(*q, epsilon);
            p_adj * (p_adj / q_adj).ln()
        })
        .sum()
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use rand::Rng;

    #[test]
    fn test_identical_distributions() {
        let pairs = [(0.2, 0.2), (0.5, 0.5), (0.3, 0.3), (0.0, 0.0)];

        assert_eq!(compute_psi(&pairs, 1e-4), 0.0);
        assert_relative_eq!(compute_kl(&pairs, 1e-4), 0.0, epsilon = 1e-12);
    }

    #[test]
    fn test_disjoint_distributions_are_bounded_by_epsilon() {
        let eps: f64 = 1e-4;
        let pairs = [(1.0, 0.0), (0.0, 1.0)];
        let expected = 2.0 * (1.0 - eps) * (1.0 / eps).ln();

        assert_relative_eq!(compute_psi(&pairs, eps), expected, epsilon = 1e-9);
    }

    #[test]
    fn test_kl_is_asymmetric() {
        let forward = [(0.9, 0.5), (0.1, 0.5)];
        let backward = [(0.5, 0.9), (0.5, 0.1)];

        let kl_forward = compute_kl(&forward, 1e-4);
        let kl_backward = compute_kl(&backward, 1e-4);
        assert!((kl_forward - kl_backward).abs() > 1e-3);

        // PSI is the symmetrised sum
        assert_relative_eq!(
            compute_psi(&forward, 1e-4),
            kl_forward + kl_backward,
            epsilon = 1e-12
        );
    }

    #[test]
    fn test_psi_never_negative() {
        let mut rng = rand::rng();

        for _ in 0..200 {
            let k = rng.random_range(2..12);
            let raw_p: Vec<f64> = (0..k).map(|_| rng.random_range(0.0..1.0)).collect();
            let raw_q: Vec<f64> = (0..k).map(|_| rng.random_range(0.0..1.0)).collect();
            let sp: f64 = raw_p.iter().sum();
            let sq: f64 = raw_q.iter().sum();

            let pairs: Vec<(f64, f64)> = raw_p
                .iter()
                .zip(&raw_q)
                .map(|(p, q)| (p / sp, q / sq))
                .collect();

            assert!(compute_psi(&pairs, 1e-4) >= 0.0);
        }
    }
}
