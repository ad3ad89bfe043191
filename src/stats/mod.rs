//! Per-variant ancestry-stratified statistics.
//!
//! For a variant whose position is covered by a tract interval, each
//! haplotype's allele value is attributed to the ancestry component its tract
//! call assigns. Per component k and sample s:
//!
//! - `dosage[k][s] = gA[s]·A[k][s] + gB[s]·B[k][s]`
//! - `hapcount[k][s] = A[k][s] + B[k][s]`
//! - `freq[k] = Σ dosage[k] / Σ hapcount[k]` (undefined when no haplotype carries k)
//! - `fraction[k] = Σ hapcount[k] / 2N`
//!
//! plus the overall frequency and, for dosage input, R² against the
//! Hardy–Weinberg variance `f(1 − f)`.

pub mod format;

use crate::tracts::IndicatorMatrix;

/// What to compute beyond frequencies and fractions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct StatsOptions {
    /// Compute per-component and overall R².
    pub r2: bool,
    /// Allow flipping the dosage to the minor allele.
    pub allow_flip: bool,
}

/// Statistics for one variant. Recomputed per site, never carried over.
#[derive(Debug, Clone, PartialEq)]
pub struct SiteStatistics {
    components: usize,
    samples: usize,
    dosage: Vec<f64>,
    hapcount: Vec<u8>,
    hapcount_totals: Vec<u32>,
    frequency: Vec<Option<f64>>,
    fraction: Vec<f64>,
    r2: Option<Vec<Option<f64>>>,
    overall_frequency: f64,
    overall_r2: Option<f64>,
    flipped: bool,
}

impl SiteStatistics {
    /// Compute statistics from aligned haplotype values and the covering
    /// interval's indicator matrices.
    ///
    /// `haplotypes[s]` is `(haplotype .0, haplotype .1)` of aligned sample
    /// `s`; `a` and `b` must have one column per aligned sample and at
    /// least one sample.
    pub fn compute(
        haplotypes: &[[f64; 2]],
        a: &IndicatorMatrix,
        b: &IndicatorMatrix,
        options: StatsOptions,
    ) -> Self {
        let components = a.components();
        let samples = haplotypes.len();
        debug_assert_eq!(a.samples(), samples);
        debug_assert_eq!(b.samples(), samples);

        let mut dosage = vec![0.0; components * samples];
        let mut hapcount = vec![0u8; components * samples];
        for (s, &[ga, gb]) in haplotypes.iter().enumerate() {
            let (ka, kb) = (a.component_of(s), b.component_of(s));
            dosage[ka * samples + s] += ga;
            dosage[kb * samples + s] += gb;
            hapcount[ka * samples + s] += 1;
            hapcount[kb * samples + s] += 1;
        }

        let haplotype_total = 2.0 * samples as f64;
        let mut hapcount_totals = Vec::with_capacity(components);
        let mut frequency = Vec::with_capacity(components);
        let mut fraction = Vec::with_capacity(components);
        for k in 0..components {
            let row = k * samples..(k + 1) * samples;
            let carried: u32 = hapcount[row.clone()].iter().map(|&c| c as u32).sum();
            let dosage_sum: f64 = dosage[row].iter().sum();
            hapcount_totals.push(carried);
            frequency.push((carried > 0).then(|| dosage_sum / carried as f64));
            fraction.push(carried as f64 / haplotype_total);
        }

        let overall_frequency =
            haplotypes.iter().map(|&[ga, gb]| ga + gb).sum::<f64>() / haplotype_total;

        let (r2, overall_r2) = if options.r2 {
            let per_component = (0..components)
                .map(|k| {
                    frequency[k].map(|f| {
                        let sigma: f64 = haplotypes
                            .iter()
                            .enumerate()
                            .map(|(s, &[ga, gb])| {
                                let mut acc = 0.0;
                                if a.get(k, s) {
                                    acc += (ga - f).powi(2);
                                }
                                if b.get(k, s) {
                                    acc += (gb - f).powi(2);
                                }
                                acc
                            })
                            .sum();
                        r_squared(sigma, hapcount_totals[k] as f64, f)
                    })
                })
                .collect();
            let sigma: f64 = haplotypes
                .iter()
                .map(|&[ga, gb]| (ga - overall_frequency).powi(2) + (gb - overall_frequency).powi(2))
                .sum();
            (
                Some(per_component),
                Some(r_squared(sigma, haplotype_total, overall_frequency)),
            )
        } else {
            (None, None)
        };

        let mut stats = Self {
            components,
            samples,
            dosage,
            hapcount,
            hapcount_totals,
            frequency,
            fraction,
            r2,
            overall_frequency,
            overall_r2,
            flipped: false,
        };

        if options.allow_flip && stats.should_flip() {
            stats.flip(haplotypes, a, b);
        }
        stats
    }

    /// Flip when the smallest reference-allele frequency is below the
    /// smallest alternate-allele frequency, over components observed at the
    /// site.
    fn should_flip(&self) -> bool {
        let observed = self.frequency.iter().flatten().copied();
        let min_alt = observed.clone().fold(f64::INFINITY, f64::min);
        let min_ref = observed.map(|f| 1.0 - f).fold(f64::INFINITY, f64::min);
        min_alt.is_finite() && min_ref < min_alt
    }

    fn flip(&mut self, haplotypes: &[[f64; 2]], a: &IndicatorMatrix, b: &IndicatorMatrix) {
        let samples = self.samples;
        self.dosage.iter_mut().for_each(|d| *d = 0.0);
        for (s, &[ga, gb]) in haplotypes.iter().enumerate() {
            self.dosage[a.component_of(s) * samples + s] += 1.0 - ga;
            self.dosage[b.component_of(s) * samples + s] += 1.0 - gb;
        }
        self.flipped = true;
    }

    /// Number of components K.
    pub fn components(&self) -> usize {
        self.components
    }

    /// Number of aligned samples N.
    pub fn samples(&self) -> usize {
        self.samples
    }

    /// Per-sample dosage of component `k` (flipped when [`Self::flipped`]).
    pub fn dosage(&self, k: usize) -> &[f64] {
        &self.dosage[k * self.samples..(k + 1) * self.samples]
    }

    /// Per-sample haplotype count (0–2) of component `k`.
    pub fn hapcount(&self, k: usize) -> &[u8] {
        &self.hapcount[k * self.samples..(k + 1) * self.samples]
    }

    /// Haplotypes carrying component `k` across all samples.
    pub fn hapcount_total(&self, k: usize) -> u32 {
        self.hapcount_totals[k]
    }

    /// Alternate-allele frequency per component; `None` when absent.
    pub fn frequency(&self) -> &[Option<f64>] {
        &self.frequency
    }

    /// Share of the 2N haplotypes assigned to each component.
    pub fn fraction(&self) -> &[f64] {
        &self.fraction
    }

    /// Per-component R², when requested.
    pub fn r2(&self) -> Option<&[Option<f64>]> {
        self.r2.as_deref()
    }

    /// Alternate-allele frequency over all haplotypes.
    pub fn overall_frequency(&self) -> f64 {
        self.overall_frequency
    }

    /// Overall R², when requested.
    pub fn overall_r2(&self) -> Option<f64> {
        self.overall_r2
    }

    /// Whether matrix dosages count the reference allele.
    pub fn flipped(&self) -> bool {
        self.flipped
    }
}

/// `(σ / n) / (f(1 − f))`, defined as 0 when the expected variance is 0.
fn r_squared(sigma: f64, haplotypes: f64, frequency: f64) -> f64 {
    let expected = frequency * (1.0 - frequency);
    if expected == 0.0 {
        0.0
    } else {
        (sigma / haplotypes) / expected
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn indicators(calls: &[u16], components: usize) -> IndicatorMatrix {
        IndicatorMatrix::from_assignment(calls.to_vec(), components)
    }

    #[test]
    fn whole_sample_tracts() {
        // Samples s1 (0|1) and s2 (1|0); haplotype calls s1.0=0 s1.1=0 s2.0=1 s2.1=1.
        let haplotypes = [[0.0, 1.0], [1.0, 0.0]];
        let a = indicators(&[0, 1], 2);
        let b = indicators(&[0, 1], 2);

        let stats = SiteStatistics::compute(&haplotypes, &a, &b, StatsOptions::default());
        assert_eq!(stats.dosage(0), &[1.0, 0.0]);
        assert_eq!(stats.dosage(1), &[0.0, 1.0]);
        assert_eq!(stats.hapcount(0), &[2, 0]);
        assert_eq!(stats.hapcount(1), &[0, 2]);
        assert_eq!(stats.frequency(), &[Some(0.5), Some(0.5)]);
        assert_eq!(stats.fraction(), &[0.5, 0.5]);
        assert_eq!(stats.overall_frequency(), 0.5);
        assert!(stats.r2().is_none());
        assert!(!stats.flipped());
    }

    #[test]
    fn mixed_calls_split_each_sample() {
        // Each sample carries one haplotype of each component.
        let haplotypes = [[0.0, 1.0], [1.0, 0.0]];
        let a = indicators(&[0, 1], 2);
        let b = indicators(&[1, 0], 2);

        let stats = SiteStatistics::compute(&haplotypes, &a, &b, StatsOptions::default());
        assert_eq!(stats.dosage(0), &[0.0, 0.0]);
        assert_eq!(stats.hapcount(0), &[1, 1]);
        assert_eq!(stats.dosage(1), &[1.0, 1.0]);
        assert_eq!(stats.hapcount(1), &[1, 1]);
        assert_eq!(stats.frequency(), &[Some(0.0), Some(1.0)]);
    }

    #[test]
    fn absent_component_has_no_frequency() {
        let haplotypes = [[1.0, 1.0], [0.0, 1.0]];
        let a = indicators(&[0, 0], 3);
        let b = indicators(&[2, 2], 3);
        let options = StatsOptions {
            r2: true,
            allow_flip: true,
        };

        let stats = SiteStatistics::compute(&haplotypes, &a, &b, options);
        assert_eq!(stats.frequency()[1], None);
        assert_eq!(stats.hapcount_total(1), 0);
        assert_eq!(stats.fraction()[1], 0.0);
        assert_eq!(stats.r2().unwrap()[1], None);
        // Observed frequencies 0.5 and 1.0: min(1 - f) = 0 < min(f) = 0.5.
        assert!(stats.flipped());
    }

    #[test]
    fn flip_counts_reference_allele() {
        let haplotypes = [[1.0, 1.0], [1.0, 0.0]];
        let a = indicators(&[0, 1], 2);
        let b = indicators(&[1, 1], 2);
        let plain = SiteStatistics::compute(&haplotypes, &a, &b, StatsOptions::default());
        let flipped = SiteStatistics::compute(
            &haplotypes,
            &a,
            &b,
            StatsOptions {
                r2: false,
                allow_flip: true,
            },
        );

        assert!(flipped.flipped());
        assert_eq!(flipped.frequency(), plain.frequency());
        for k in 0..2 {
            for s in 0..2 {
                let expected = plain.hapcount(k)[s] as f64 - plain.dosage(k)[s];
                assert_eq!(flipped.dosage(k)[s], expected);
            }
        }
    }

    #[test]
    fn no_flip_when_alternate_is_minor() {
        let haplotypes = [[0.0, 0.0], [0.0, 1.0]];
        let a = indicators(&[0, 0], 2);
        let b = indicators(&[1, 1], 2);
        let stats = SiteStatistics::compute(
            &haplotypes,
            &a,
            &b,
            StatsOptions {
                r2: false,
                allow_flip: true,
            },
        );
        assert!(!stats.flipped());
        assert_eq!(stats.dosage(1), &[0.0, 1.0]);
    }

    #[test]
    fn r2_of_hard_calls_is_one() {
        // Hard calls have the full binomial variance.
        let haplotypes = [[0.0, 1.0], [1.0, 1.0], [0.0, 0.0], [1.0, 0.0]];
        let a = indicators(&[0, 0, 0, 0], 1);
        let b = indicators(&[0, 0, 0, 0], 1);
        let stats = SiteStatistics::compute(
            &haplotypes,
            &a,
            &b,
            StatsOptions {
                r2: true,
                allow_flip: false,
            },
        );
        let r2 = stats.r2().unwrap()[0].unwrap();
        assert!((r2 - 1.0).abs() < 1e-12);
        assert!((stats.overall_r2().unwrap() - 1.0).abs() < 1e-12);
    }

    #[test]
    fn r2_of_uninformative_dosage_is_zero() {
        let haplotypes = [[0.25, 0.25], [0.25, 0.25]];
        let a = indicators(&[0, 1], 2);
        let b = indicators(&[0, 1], 2);
        let stats = SiteStatistics::compute(
            &haplotypes,
            &a,
            &b,
            StatsOptions {
                r2: true,
                allow_flip: false,
            },
        );
        assert_eq!(stats.r2().unwrap(), &[Some(0.0), Some(0.0)]);
        assert_eq!(stats.overall_r2(), Some(0.0));
    }

    #[test]
    fn r2_is_zero_for_monomorphic_sites() {
        let haplotypes = [[0.0, 0.0], [0.0, 0.0]];
        let a = indicators(&[0, 0], 1);
        let b = indicators(&[0, 0], 1);
        let stats = SiteStatistics::compute(
            &haplotypes,
            &a,
            &b,
            StatsOptions {
                r2: true,
                allow_flip: true,
            },
        );
        assert_eq!(stats.r2().unwrap(), &[Some(0.0)]);
        assert_eq!(stats.overall_r2(), Some(0.0));
        assert!(!stats.flipped());
    }
}
