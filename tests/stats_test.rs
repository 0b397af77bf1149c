//! After K adds, `average()` equals the arithmetic mean of the last
//! `min(K, capacity)` samples.

use shieldns::stats::StatsWindow;

#[test]
fn average_of_a_partially_filled_window_is_the_plain_mean() {
    let window = StatsWindow::new("test", 500);
    for v in [1.0, 2.0, 3.0, 4.0] {
        window.add(v);
    }
    assert_eq!(window.count(), 4);
    assert!((window.average() - 2.5).abs() < 1e-9);
}

#[test]
fn average_of_an_empty_window_is_zero() {
    let window = StatsWindow::new("test", 500);
    assert_eq!(window.average(), 0.0);
}

#[test]
fn window_keeps_only_the_most_recent_capacity_samples() {
    let window = StatsWindow::new("test", 10);
    for v in 0..25 {
        window.add(v as f64);
    }
    assert_eq!(window.count(), 10);
    // Last 10 of 0..25 are 15..=24, mean = 19.5.
    assert!((window.average() - 19.5).abs() < 1e-9);
}

#[test]
fn average_matches_arithmetic_mean_for_randomized_sequences() {
    let capacity = 500usize;
    let window = StatsWindow::new("test", capacity);
    let mut seed: u64 = 0x2545F4914F6CDD1D;
    let mut samples: Vec<f64> = Vec::new();

    for _ in 0..3_000 {
        // xorshift64*, deterministic and dependency-free
        seed ^= seed << 13;
        seed ^= seed >> 7;
        seed ^= seed << 17;
        let value = (seed % 10_000) as f64 / 100.0;

        window.add(value);
        samples.push(value);
        if samples.len() > capacity {
            samples.remove(0);
        }

        let expected: f64 = samples.iter().sum::<f64>() / samples.len() as f64;
        assert!((window.average() - expected).abs() < 1e-6);
    }
}
