use vantage_types::Statistic;

/// Running central moments of a stream of values.
///
/// Values are folded one at a time (Welford / Terriberry update) and partial
/// accumulators can be combined with [`MomentAccumulator::merge`], so a column
/// can be consumed batch by batch without holding the whole stream.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MomentAccumulator {
    n: u64,
    mean: f64,
    m2: f64,
    m3: f64,
    m4: f64,
    min: f64,
    max: f64,
}

impl Default for MomentAccumulator {
    fn default() -> Self {
        Self {
            n: 0,
            mean: 0.0,
            m2: 0.0,
            m3: 0.0,
            m4: 0.0,
            min: f64::INFINITY,
            max: f64::NEG_INFINITY,
        }
    }
}

impl MomentAccumulator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn update(&mut self, x: f64) {
        let n1 = self.n as f64;
        self.n += 1;
        let n = self.n as f64;

        let delta = x - self.mean;
        let delta_n = delta / n;
        let delta_n2 = delta_n * delta_n;
        let term1 = delta * delta_n * n1;

        self.mean += delta_n;
        self.m4 += term1 * delta_n2 * (n * n - 3.0 * n + 3.0) + 6.0 * delta_n2 * self.m2
            - 4.0 * delta_n * self.m3;
        self.m3 += term1 * delta_n * (n - 2.0) - 3.0 * delta_n * self.m2;
        self.m2 += term1;

        self.min = self.min.min(x);
        self.max = self.max.max(x);
    }

    /// Combine two partial accumulators (Pébay's pairwise formulas).
    pub fn merge(&mut self, other: &MomentAccumulator) {
        if other.n == 0 {
            return;
        }
        if self.n == 0 {
            *self = *other;
            return;
        }

        let na = self.n as f64;
        let nb = other.n as f64;
        let n = na + nb;
        let delta = other.mean - self.mean;
        let delta2 = delta * delta;
        let delta3 = delta2 * delta;
        let delta4 = delta2 * delta2;

        let m2 = self.m2 + other.m2 + delta2 * na * nb / n;
        let m3 = self.m3
            + other.m3
            + delta3 * na * nb * (na - nb) / (n * n)
            + 3.0 * delta * (na * other.m2 - nb * self.m2) / n;
        let m4 = self.m4
            + other.m4
            + delta4 * na * nb * (na * na - na * nb + nb * nb) / (n * n * n)
            + 6.0 * delta2 * (na * na * other.m2 + nb * nb * self.m2) / (n * n)
            + 4.0 * delta * (na * other.m3 - nb * self.m3) / n;

        self.mean += delta * nb / n;
        self.m2 = m2;
        self.m3 = m3;
        self.m4 = m4;
        self.n += other.n;
        self.min = self.min.min(other.min);
        self.max = self.max.max(other.max);
    }

    pub fn count(&self) -> u64 {
        self.n
    }

    pub fn mean(&self) -> Statistic {
        if self.n == 0 {
            return Statistic::Undefined;
        }
        Statistic::from_f64(self.mean)
    }

    pub fn min(&self) -> Statistic {
        if self.n == 0 {
            return Statistic::Undefined;
        }
        Statistic::from_f64(self.min)
    }

    pub fn max(&self) -> Statistic {
        if self.n == 0 {
            return Statistic::Undefined;
        }
        Statistic::from_f64(self.max)
    }

    /// Both the update and the merge keep `m2` at exactly zero for such input.
    fn is_constant(&self) -> bool {
        self.min == self.max
    }

    /// Sample standard deviation (n - 1 denominator).
    pub fn stddev(&self) -> Statistic {
        if self.n < 2 {
            return Statistic::Undefined;
        }
        if self.is_constant() {
            return Statistic::Value(0.0);
        }
        Statistic::from_f64((self.m2 / (self.n as f64 - 1.0)).max(0.0).sqrt())
    }

    /// Population skewness g1.
    pub fn skewness(&self) -> Statistic {
        if self.n < 2 || self.is_constant() {
            return Statistic::Undefined;
        }
        let n = self.n as f64;
        Statistic::from_f64(n.sqrt() * self.m3 / self.m2.powf(1.5))
    }

    /// Excess kurtosis g2 (normal distribution = 0).
    pub fn kurtosis(&self) -> Statistic {
        if self.n < 2 || self.is_constant() {
            return Statistic::Undefined;
        }
        let n = self.n as f64;
        Statistic::from_f64(n * self.m4 / (self.m2 * self.m2) - 3.0)
    }
}

impl Extend<f64> for MomentAccumulator {
    fn extend<I: IntoIterator<Item = f64>>(&mut self, iter: I) {
        iter.into_iter().for_each(|x| self.update(x));
    }
}
