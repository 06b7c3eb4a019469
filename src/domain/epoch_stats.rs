// ============================================================
// Layer 3 — Epoch Statistics
// ============================================================
// One EpochStats row is produced per epoch, in epoch order.
//
// RunningScore is the accumulator both passes of the trainer
// feed batch by batch. The reported loss is the cumulative mean
// of per-batch losses (loss_sum / batches_seen), so a short last
// batch counts as much as a full one. Accuracy is the true
// sample-weighted ratio, reported as a percentage.

use serde::{Deserialize, Serialize};

/// The four scalars logged for one epoch.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct EpochStats {
    /// Zero-based epoch index
    pub epoch: usize,

    /// Mean per-batch cross-entropy over the training pass
    pub train_loss: f64,

    /// Percentage of training samples classified correctly
    pub train_acc: f64,

    /// Mean per-batch cross-entropy over the evaluation pass
    pub val_loss: f64,

    /// Percentage of evaluation samples classified correctly
    pub val_acc: f64,
}

impl EpochStats {
    pub fn new(epoch: usize, train: &RunningScore, val: &RunningScore) -> Self {
        Self {
            epoch,
            train_loss: train.mean_loss(),
            train_acc:  train.accuracy(),
            val_loss:   val.mean_loss(),
            val_acc:    val.accuracy(),
        }
    }

    /// Scalars in the order the metrics sink and stats.csv expect.
    pub fn scalars(&self) -> [(&'static str, f64); 4] {
        [
            ("train_loss", self.train_loss),
            ("train_acc",  self.train_acc),
            ("val_loss",   self.val_loss),
            ("val_acc",    self.val_acc),
        ]
    }
}

/// Running loss / accuracy over the batches of one pass.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RunningScore {
    loss_sum: f64,
    batches:  usize,
    correct:  usize,
    total:    usize,
}

impl RunningScore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fold in one batch: its mean loss, how many predictions were
    /// right and how many samples it held.
    pub fn update(&mut self, batch_loss: f64, correct: usize, batch_size: usize) {
        self.loss_sum += batch_loss;
        self.batches  += 1;
        self.correct  += correct;
        self.total    += batch_size;
    }

    /// loss_sum / batches_seen; NaN before the first batch.
    pub fn mean_loss(&self) -> f64 {
        if self.batches == 0 {
            return f64::NAN;
        }
        self.loss_sum / self.batches as f64
    }

    /// 100 * correct / total; 0 before the first batch.
    pub fn accuracy(&self) -> f64 {
        if self.total == 0 {
            return 0.0;
        }
        100.0 * self.correct as f64 / self.total as f64
    }

    pub fn batches(&self) -> usize {
        self.batches
    }

}
