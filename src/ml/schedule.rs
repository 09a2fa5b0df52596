// ============================================================
// Layer 5 - Learning Rate Schedule
// ============================================================
// Linear warmup over the first `warmup_epochs` epochs
// (1/(w+1), 2/(w+1), ...), then the base rate, multiplied by
// `decay_r` once for every decay epoch already reached.
// Epochs are 0-based.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LrSchedule {
    pub lr_base:       f64,
    pub warmup_epochs: usize,
    pub decay_r:       f64,
    pub decay_list:    Vec<usize>,
}

impl LrSchedule {
    pub fn lr_at(&self, epoch: usize) -> f64 {
        let warmup = if epoch < self.warmup_epochs {
            (epoch + 1) as f64 / (self.warmup_epochs + 1) as f64
        } else {
            1.0
        };
        let decays = self.decay_list.iter().filter(|&&d| d <= epoch).count();
        self.lr_base * warmup * self.decay_r.powi(decays as i32)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn schedule() -> LrSchedule {
        LrSchedule {
            lr_base:       2e-3,
            warmup_epochs: 3,
            decay_r:       0.25,
            decay_list:    vec![10, 12],
        }
    }

    fn close(a: f64, b: f64) -> bool {
        (a - b).abs() < 1e-12
    }

    #[test]
    fn test_warmup_quarters() {
        let s = schedule();
        assert!(close(s.lr_at(0), 0.5e-3));
        assert!(close(s.lr_at(1), 1.0e-3));
        assert!(close(s.lr_at(2), 1.5e-3));
        assert!(close(s.lr_at(3), 2.0e-3));
        assert!(close(s.lr_at(9), 2.0e-3));
    }

    #[test]
    fn test_step_decay_compounds() {
        let s = schedule();
        assert!(close(s.lr_at(10), 2e-3 * 0.25));
        assert!(close(s.lr_at(11), 2e-3 * 0.25));
        assert!(close(s.lr_at(12), 2e-3 * 0.25 * 0.25));
    }

    #[test]
    fn test_no_warmup() {
        let s = LrSchedule { warmup_epochs: 0, ..schedule() };
        assert!(close(s.lr_at(0), 2e-3));
    }
}
