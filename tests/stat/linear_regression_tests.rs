//! Monte-Carlo check that weighted least-squares uncertainties are honest:
//! the squared error of each coefficient, normalized by its formal variance,
//! averages to one.

use jonesfit::stat::LinearRegression;
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use rand_distr::{Distribution, Normal};

const NTEST: usize = 100_000;
const TOLERANCE: f64 = 0.02;

struct Totals {
    normalized_difference: [f64; 2],
    covariance: f64,
}

fn run_multiple_tests(subtract_weighted_mean_abscissa: bool, seed: u64) -> Totals {
    let mut rng = ChaCha8Rng::seed_from_u64(seed);
    let sigma = 0.1;
    let gasdev = Normal::new(0.0, sigma).unwrap();

    let x_min = -5.0;
    let x_max = 10.0;
    let ndat = 60;
    let x_step = (x_max - x_min) / (ndat + 1) as f64;
    let x: Vec<f64> = (0..ndat).map(|i| x_min + x_step * i as f64).collect();
    let weight = vec![1.0 / (sigma * sigma); ndat];

    let fit = LinearRegression::new().with_subtract_weighted_mean_abscissa(subtract_weighted_mean_abscissa);
    let mut totals = Totals {
        normalized_difference: [0.0; 2],
        covariance: 0.0,
    };

    for _ in 0..NTEST {
        let in_scale: f64 = rng.gen_range(-3.0..3.0);
        let mut in_offset: f64 = rng.gen_range(-3.0..3.0);
        let y: Vec<f64> = x
            .iter()
            .map(|x| in_offset + in_scale * x + gasdev.sample(&mut rng))
            .collect();

        let result = fit.weighted_least_squares(&y, &x, &weight).unwrap();

        let diff = in_scale - result.scale.val;
        totals.normalized_difference[0] += diff * diff / result.scale.var;

        if subtract_weighted_mean_abscissa {
            in_offset += result.scale.val * result.weighted_mean_abscissa;
        }
        let diff = in_offset - result.offset.val;
        totals.normalized_difference[1] += diff * diff / result.offset.var;

        totals.covariance += result.covariance;
    }
    totals
}

fn check(totals: &Totals) {
    for (i, total) in totals.normalized_difference.iter().enumerate() {
        let avg = total / NTEST as f64;
        assert!(
            (avg - 1.0).abs() < TOLERANCE,
            "coefficient {} normalized error={} is not close enough to 1",
            i,
            avg
        );
    }
}

#[test]
fn test_weighted_least_squares() {
    let totals = run_multiple_tests(false, 2024);
    check(&totals);
    // the abscissa is not centred, so scale and offset are correlated
    assert!(totals.covariance.abs() > 1.0e-3);
}

#[test]
fn test_weighted_least_squares_subtract_mean_abscissa() {
    let totals = run_multiple_tests(true, 4048);
    check(&totals);
    assert!(totals.covariance.abs() < 1e-9, "covariance = {}", totals.covariance);
}
