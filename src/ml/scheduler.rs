// ============================================================
// Layer 5 — Learning-rate Schedule
// ============================================================
// Cosine annealing, stepped once per epoch:
//
//   lr(t) = lr0 * (1 + cos(pi * t / T)) / 2
//
// t starts at 0 and stops growing at T, so the rate never climbs
// back up if more epochs run than the horizon.
//
// Not burn's CosineAnnealingLrScheduler: its step() advances before
// returning a rate, so epoch 0 would not train at lr0.

use std::f64::consts::PI;

use burn::LearningRate;

#[derive(Debug, Clone)]
pub struct CosineAnnealing {
    initial_lr: LearningRate,
    horizon:    usize,
    epoch:      usize,
}

impl CosineAnnealing {
    pub fn new(initial_lr: LearningRate, horizon: usize) -> Self {
        Self { initial_lr, horizon, epoch: 0 }
    }

    /// Rate for the current epoch.
    pub fn lr(&self) -> LearningRate {
        if self.horizon == 0 {
            return self.initial_lr;
        }
        let progress = self.epoch.min(self.horizon) as f64 / self.horizon as f64;
        self.initial_lr * (1.0 + (PI * progress).cos()) / 2.0
    }

    pub fn step(&mut self) {
        self.epoch += 1;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn close(a: f64, b: f64) -> bool {
        (a - b).abs() < 1e-12
    }

    #[test]
    fn test_starts_at_initial_rate() {
        let sched = CosineAnnealing::new(0.1, 200);
        assert!(close(sched.lr(), 0.1));
    }

    #[test]
    fn test_half_way_is_midpoint() {
        let mut sched = CosineAnnealing::new(0.1, 10);
        for _ in 0..5 {
            sched.step();
        }
        assert!(close(sched.lr(), 0.05));
    }

    #[test]
    fn test_reaches_zero_at_horizon_and_stays() {
        let mut sched = CosineAnnealing::new(0.1, 4);
        for _ in 0..4 {
            sched.step();
        }
        assert!(close(sched.lr(), 0.0));
        sched.step();
        assert!(close(sched.lr(), 0.0));
    }

    #[test]
    fn test_monotonically_decreasing() {
        let mut sched = CosineAnnealing::new(0.1, 20);
        let mut previous = sched.lr();
        for _ in 0..20 {
            sched.step();
            let lr = sched.lr();
            assert!(lr <= previous);
            previous = lr;
        }
    }
}
