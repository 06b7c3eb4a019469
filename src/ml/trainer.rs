// ============================================================
// Layer 5 — Training Loop
// ============================================================
// One run = `epochs` × (training pass, evaluation pass).
//
//   Training pass   → autodiff model, cross-entropy, backward,
//                     optimizer step at the scheduled lr
//   Evaluation pass → overshoot optimizer moves to base first,
//                     then model.valid() on the inner backend
//                     (no autodiff graph), then back again
//   End of epoch    → cosine schedule steps, four scalars go to
//                     the MetricsSink at step = epoch index
//
// Key Burn insight:
//   - Training batches live on B (Autodiff<...>)
//   - model.valid() returns the same network on B::InnerBackend
//   - argmax(1) returns [batch, 1]; flatten to [batch] before
//     comparing against the targets
//
// Reference: Burn Book §5, Loshchilov & Hutter (2017) SGDR

use std::sync::Arc;

use anyhow::Result;
use burn::{
    data::dataloader::{DataLoader, DataLoaderBuilder},
    module::AutodiffModule,
    nn::loss::CrossEntropyLossConfig,
    optim::{GradientsParams, Optimizer},
    prelude::*,
    tensor::backend::AutodiffBackend,
    LearningRate,
};

use crate::data::{
    batcher::{ImageBatch, ImageBatcher},
    dataset::ImageDataset,
};
use crate::domain::{
    epoch_stats::{EpochStats, RunningScore},
    traits::MetricsSink,
};
use crate::infra::checkpoint::CheckpointManager;
use crate::ml::{
    models::{ImageClassifier, ModelRunner},
    optimizer::{SgdSettings, TrainingOptimizer},
    scheduler::CosineAnnealing,
};

/// Everything one run needs besides the data and the network.
#[derive(Debug, Clone)]
pub struct TrainSettings {
    pub epochs:           usize,
    pub lr:               LearningRate,
    pub sgd:              SgdSettings,
    pub train_batch_size: usize,
    pub test_batch_size:  usize,
    /// 0 loads batches on the training thread
    pub num_workers:      usize,
    /// Shuffle seed for the training loader
    pub seed:             u64,
}

/// Runs the epoch loop for whichever network `with_model` builds.
pub struct Trainer<'a, B: AutodiffBackend> {
    pub settings:   &'a TrainSettings,
    pub train:      ImageDataset,
    pub test:       ImageDataset,
    pub device:     B::Device,
    pub sink:       &'a mut dyn MetricsSink,
    pub checkpoint: Option<CheckpointManager>,
}

impl<B: AutodiffBackend> ModelRunner<B> for Trainer<'_, B> {
    type Output = Result<Vec<EpochStats>>;

    fn run<M>(self, model: M) -> Self::Output
    where
        M: AutodiffModule<B> + ImageClassifier<B>,
        M::InnerModule: ImageClassifier<B::InnerBackend>,
    {
        train_loop(self, model)
    }
}

fn train_loop<B, M>(trainer: Trainer<'_, B>, mut model: M) -> Result<Vec<EpochStats>>
where
    B: AutodiffBackend,
    M: AutodiffModule<B> + ImageClassifier<B>,
    M::InnerModule: ImageClassifier<B::InnerBackend>,
{
    let Trainer { settings, train, test, device, sink, checkpoint } = trainer;

    tracing::info!(
        "Training on {} samples, evaluating on {} samples",
        train.sample_count(),
        test.sample_count()
    );

    // ── Optimizer + schedule ──────────────────────────────────────────────────
    let mut optim     = settings.sgd.init::<B, M>();
    let mut scheduler = CosineAnnealing::new(settings.lr, settings.epochs);

    // ── Loaders ───────────────────────────────────────────────────────────────
    let train_loader = build_loader::<B>(
        &device, settings.train_batch_size, Some(settings.seed), settings.num_workers, train,
    );
    let test_loader = build_loader::<B::InnerBackend>(
        &device, settings.test_batch_size, None, settings.num_workers, test,
    );

    let mut history = Vec::with_capacity(settings.epochs);

    // ── Epoch loop ────────────────────────────────────────────────────────────
    for epoch in 0..settings.epochs {
        let lr = scheduler.lr();

        let (trained, train_score) =
            train_epoch::<B, M, _>(model, &mut optim, train_loader.as_ref(), lr, epoch);
        let (evaluated, val_score) =
            evaluate_epoch::<B, M, _>(trained, &mut optim, test_loader.as_ref());
        model = evaluated;

        // ── Bookkeeping ───────────────────────────────────────────────────────
        scheduler.step();

        let stats = EpochStats::new(epoch, &train_score, &val_score);
        for (tag, value) in stats.scalars() {
            sink.add_scalar(tag, value, epoch)?;
        }
        if !stats.train_loss.is_finite() && train_score.batches() > 0 {
            tracing::warn!("Epoch {}: training loss is not finite", epoch);
        }

        println!(
            "Epoch {:>3}/{} | lr={:.5} | train_loss={:.4} | train_acc={:.2}% | val_loss={:.4} | val_acc={:.2}%",
            epoch + 1, settings.epochs, lr,
            stats.train_loss, stats.train_acc, stats.val_loss, stats.val_acc,
        );
        tracing::info!(
            "Epoch {} done: train_loss={:.4}, val_acc={:.2}%",
            epoch, stats.train_loss, stats.val_acc
        );

        history.push(stats);
    }

    // ── Final weights ─────────────────────────────────────────────────────────
    if let Some(overshoot) = optim.overshoot_mut() {
        model = overshoot.move_to_base::<B, M>(model);
    }
    if let Some(ckpt) = &checkpoint {
        let path = ckpt.save_model::<B, M>(&model)?;
        tracing::info!("Checkpoint saved to '{}'", path.display());
    }

    tracing::info!("Training complete!");
    Ok(history)
}

/// Training pass: forward, cross-entropy, backward, step, per batch.
pub fn train_epoch<B, M, O>(
    mut model: M,
    optim:     &mut TrainingOptimizer<O>,
    loader:    &dyn DataLoader<ImageBatch<B>>,
    lr:        LearningRate,
    epoch:     usize,
) -> (M, RunningScore)
where
    B: AutodiffBackend,
    M: AutodiffModule<B> + ImageClassifier<B>,
    O: Optimizer<M, B>,
{
    let mut score = RunningScore::new();

    for (iteration, batch) in loader.iter().enumerate() {
        let batch_size = batch.targets.dims()[0];
        let logits     = model.forward(batch.images);

        let loss = CrossEntropyLossConfig::new()
            .init(&logits.device())
            .forward(logits.clone(), batch.targets.clone());
        let batch_loss: f64 = loss.clone().into_scalar().elem::<f64>();
        let correct = count_correct(logits, batch.targets);

        // Backward pass + optimizer update
        let grads = GradientsParams::from_grads(loss.backward(), &model);
        model = optim.step::<B, M>(lr, model, grads);

        score.update(batch_loss, correct, batch_size);
        tracing::debug!(
            "[{epoch}:{iteration}] loss={:.4} acc={:.2}%",
            score.mean_loss(),
            score.accuracy(),
        );
    }

    (model, score)
}

/// Evaluation pass at the base point; the overshoot values are live
/// again when the model is handed back.
pub fn evaluate_epoch<B, M, O>(
    mut model: M,
    optim:     &mut TrainingOptimizer<O>,
    loader:    &dyn DataLoader<ImageBatch<B::InnerBackend>>,
) -> (M, RunningScore)
where
    B: AutodiffBackend,
    M: AutodiffModule<B> + ImageClassifier<B>,
    M::InnerModule: ImageClassifier<B::InnerBackend>,
{
    if let Some(overshoot) = optim.overshoot_mut() {
        model = overshoot.move_to_base::<B, M>(model);
        tracing::trace!("Evaluating at {:?}", overshoot.live_point());
    }
    let score = evaluate(&model.valid(), loader);
    if let Some(overshoot) = optim.overshoot_mut() {
        model = overshoot.move_to_overshoot::<B, M>(model);
    }

    (model, score)
}

/// One pass over `loader` without gradients.
pub fn evaluate<B, M>(model: &M, loader: &dyn DataLoader<ImageBatch<B>>) -> RunningScore
where
    B: Backend,
    M: ImageClassifier<B>,
{
    let mut score = RunningScore::new();

    for batch in loader.iter() {
        let batch_size = batch.targets.dims()[0];
        let logits     = model.forward(batch.images);

        let batch_loss: f64 = CrossEntropyLossConfig::new()
            .init(&logits.device())
            .forward(logits.clone(), batch.targets.clone())
            .into_scalar()
            .elem::<f64>();

        score.update(batch_loss, count_correct(logits, batch.targets), batch_size);
    }

    score
}

/// Number of rows whose highest logit is the target class.
pub fn count_correct<B: Backend>(logits: Tensor<B, 2>, targets: Tensor<B, 1, Int>) -> usize {
    let predicted = logits.argmax(1).flatten::<1>(0, 1);
    let correct: i64 = predicted
        .equal(targets)
        .int()
        .sum()
        .into_scalar()
        .elem::<i64>();
    correct as usize
}

fn build_loader<B: Backend>(
    device:      &B::Device,
    batch_size:  usize,
    shuffle:     Option<u64>,
    num_workers: usize,
    dataset:     ImageDataset,
) -> Arc<dyn DataLoader<ImageBatch<B>>> {
    let mut builder = DataLoaderBuilder::new(ImageBatcher::<B>::new(device.clone()))
        .batch_size(batch_size);
    if let Some(seed) = shuffle {
        builder = builder.shuffle(seed);
    }
    if num_workers > 0 {
        builder = builder.num_workers(num_workers);
    }
    builder.build(dataset)
}

// ─── Unit Tests ───────────────────────────────────────────────────────────────
#[cfg(test)]
mod tests {
    use super::*;
    use burn::backend::{Autodiff, NdArray};

    use crate::ml::models::lenet::{LeNet, LeNetConfig};

    type TestBackend = Autodiff<NdArray>;

    #[derive(Default)]
    struct RecordingSink {
        records: Vec<(String, f64, usize)>,
    }

    impl MetricsSink for RecordingSink {
        fn add_scalar(&mut self, tag: &str, value: f64, step: usize) -> Result<()> {
            self.records.push((tag.to_string(), value, step));
            Ok(())
        }
    }

    fn settings(epochs: usize, overshoot: f64) -> TrainSettings {
        TrainSettings {
            epochs,
            lr:               0.05,
            sgd:              SgdSettings::new().with_overshoot(overshoot),
            train_batch_size: 2,
            test_batch_size:  2,
            num_workers:      0,
            seed:             11,
        }
    }

    fn lenet() -> LeNet<TestBackend> {
        LeNetConfig::new(2).init::<TestBackend>(&Default::default())
    }

    fn fit(
        settings: &TrainSettings,
        sink:     &mut RecordingSink,
        model:    LeNet<TestBackend>,
        test:     ImageDataset,
    ) -> Vec<EpochStats> {
        let trainer = Trainer::<TestBackend> {
            settings,
            train:      ImageDataset::synthetic(8, 2, 3),
            test,
            device:     Default::default(),
            sink,
            checkpoint: None,
        };
        trainer.run(model).unwrap()
    }

    #[test]
    fn test_fixed_seed_reproduces_training_metrics() {
        let model    = lenet();
        let settings = settings(1, 0.0);

        let first  = fit(&settings, &mut RecordingSink::default(), model.clone(), ImageDataset::synthetic(4, 2, 5));
        let second = fit(&settings, &mut RecordingSink::default(), model, ImageDataset::synthetic(4, 2, 5));

        assert_eq!(first.len(), 1);
        assert!(first[0].train_loss.is_finite());
        assert_eq!(first[0].train_loss, second[0].train_loss);
        assert_eq!(first[0].train_acc, second[0].train_acc);
    }

    #[test]
    fn test_sink_receives_four_scalars_per_epoch() {
        let mut sink = RecordingSink::default();
        let history  = fit(&settings(2, 0.9), &mut sink, lenet(), ImageDataset::synthetic(4, 2, 5));

        assert_eq!(history.len(), 2);
        assert_eq!(sink.records.len(), 8);

        let tags: Vec<&str> = sink.records[..4].iter().map(|(t, _, _)| t.as_str()).collect();
        assert_eq!(tags, ["train_loss", "train_acc", "val_loss", "val_acc"]);
        let steps: Vec<usize> = sink.records.iter().map(|(_, _, s)| *s).collect();
        assert_eq!(steps, [0, 0, 0, 0, 1, 1, 1, 1]);

        for stats in &history {
            assert!((0.0..=100.0).contains(&stats.train_acc));
            assert!((0.0..=100.0).contains(&stats.val_acc));
        }
    }

    #[test]
    fn test_empty_eval_set_reports_nan_loss_and_zero_accuracy() {
        let mut sink = RecordingSink::default();
        let history  = fit(&settings(1, 0.0), &mut sink, lenet(), ImageDataset::new(Vec::new(), 2));

        assert!(history[0].val_loss.is_nan());
        assert_eq!(history[0].val_acc, 0.0);
    }

    #[test]
    fn test_overshoot_run_checkpoints_base_weights() {
        let tmp      = tempfile::tempdir().unwrap();
        let settings = settings(1, 0.9);
        let mut sink = RecordingSink::default();

        let trainer = Trainer::<TestBackend> {
            settings:   &settings,
            train:      ImageDataset::synthetic(4, 2, 1),
            test:       ImageDataset::synthetic(2, 2, 2),
            device:     Default::default(),
            sink:       &mut sink,
            checkpoint: Some(CheckpointManager::new(tmp.path()).unwrap()),
        };
        trainer.run(lenet()).unwrap();

        assert!(tmp.path().join("model.mpk.gz").exists());
    }

    #[test]
    fn test_count_correct() {
        let device  = Default::default();
        let logits  = Tensor::<NdArray, 2>::from_floats([[0.9, 0.1], [0.2, 0.8], [0.7, 0.3]], &device);
        let targets = Tensor::<NdArray, 1, Int>::from_ints([0, 0, 0], &device);
        assert_eq!(count_correct(logits, targets), 2);
    }

    fn snapshot(model: &LeNet<TestBackend>) -> Vec<f32> {
        let mut values = model.conv1.weight.val().into_data().to_vec::<f32>().unwrap();
        values.extend(model.fc3.weight.val().into_data().to_vec::<f32>().unwrap());
        values.extend(model.fc3.bias.as_ref().unwrap().val().into_data().to_vec::<f32>().unwrap());
        values
    }

    #[test]
    fn test_evaluation_scores_base_point_and_resumes_from_overshoot() {
        let device    = Default::default();
        let mut optim = SgdSettings::new()
            .with_overshoot(0.9)
            .init::<TestBackend, LeNet<TestBackend>>();

        let train_loader = build_loader::<TestBackend>(&device, 2, Some(11), 0, ImageDataset::synthetic(8, 2, 3));
        let test_loader  = build_loader::<NdArray>(&device, 2, None, 0, ImageDataset::synthetic(4, 2, 5));

        let (model, _) = train_epoch::<TestBackend, _, _>(lenet(), &mut optim, train_loader.as_ref(), 0.05, 0);
        let overshoot_weights = snapshot(&model);

        let (model, val_score) = evaluate_epoch::<TestBackend, _, _>(model, &mut optim, test_loader.as_ref());
        assert_eq!(snapshot(&model), overshoot_weights);

        // Score the base point directly and compare
        let switch = optim.overshoot_mut().unwrap();
        let base   = switch.move_to_base::<TestBackend, _>(model);
        assert_ne!(snapshot(&base), overshoot_weights);

        let expected = evaluate(&base.valid(), test_loader.as_ref());
        assert!(expected.mean_loss().is_finite());
        assert_eq!(val_score.mean_loss(), expected.mean_loss());
        assert_eq!(val_score.accuracy(), expected.accuracy());
    }

    #[test]
    fn test_plain_optimizer_evaluates_live_weights() {
        let device    = Default::default();
        let mut optim = SgdSettings::new().init::<TestBackend, LeNet<TestBackend>>();
        let test_loader = build_loader::<NdArray>(&device, 2, None, 0, ImageDataset::synthetic(4, 2, 5));

        let model    = lenet();
        let before   = snapshot(&model);
        let expected = evaluate(&model.valid(), test_loader.as_ref());
        let (model, val_score) = evaluate_epoch::<TestBackend, _, _>(model, &mut optim, test_loader.as_ref());

        assert_eq!(val_score.mean_loss(), expected.mean_loss());
        assert_eq!(snapshot(&model), before);
    }
}
