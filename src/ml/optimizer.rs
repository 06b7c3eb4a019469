// ============================================================
// Layer 5 — Optimizers
// ============================================================
// Two optimizer variants share one entry point:
//
//   TrainingOptimizer::Plain      → Burn's own Sgd (momentum +
//                                   weight decay), nothing else
//   TrainingOptimizer::Overshoot  → OvershootSgd, which keeps a
//                                   base trajectory next to the
//                                   live (overshoot) parameters
//
// Only the overshoot variant exposes move_to_base /
// move_to_overshoot; the trainer reaches them through
// `overshoot_mut()`, which is None for plain SGD.
//
// Update rule per parameter (dampening 0, no Nesterov):
//   g      = grad + weight_decay * base
//   v      = g                       (first step)
//   v      = momentum * v + g        (later steps)
//   delta  = lr * v
//   base   = base - delta
//   live   = base - overshoot * delta
//
// With overshoot = 0 the live point IS the base point and the
// rule matches Burn's Sgd bit for bit.
//
// Reference: Burn Book §5 (Custom optimizers)
//            Kopal et al. (2024) Overshoot

use std::{any::Any, collections::HashMap, marker::PhantomData};

use burn::{
    module::{AutodiffModule, ModuleMapper, ParamId},
    optim::{
        decay::WeightDecayConfig, momentum::MomentumConfig, GradientsParams, Optimizer, SgdConfig,
    },
    prelude::*,
    tensor::backend::AutodiffBackend,
    LearningRate,
};

/// Hyper-parameters shared by both variants.
#[derive(Config, Debug)]
pub struct SgdSettings {
    #[config(default = 0.9)]
    pub momentum: f64,

    /// L2 penalty added to the gradient
    #[config(default = 5e-4)]
    pub weight_decay: f32,

    /// Extrapolation factor; 0 selects plain SGD
    #[config(default = 0.0)]
    pub overshoot: f64,
}

impl SgdSettings {
    /// Burn's Sgd configured with the same momentum and weight decay.
    pub fn plain_config(&self) -> SgdConfig {
        let momentum = (self.momentum > 0.0).then(|| {
            MomentumConfig::new()
                .with_momentum(self.momentum)
                .with_dampening(0.0)
                .with_nesterov(false)
        });
        let weight_decay = (self.weight_decay > 0.0).then(|| WeightDecayConfig::new(self.weight_decay));

        SgdConfig::new()
            .with_momentum(momentum)
            .with_weight_decay(weight_decay)
    }

    /// Pick the variant: overshoot > 0 gets OvershootSgd, otherwise plain Sgd.
    pub fn init<B, M>(&self) -> TrainingOptimizer<impl Optimizer<M, B>>
    where
        B: AutodiffBackend,
        M: AutodiffModule<B>,
    {
        if self.overshoot > 0.0 {
            tracing::info!("Optimizer: overshoot SGD (overshoot={})", self.overshoot);
            TrainingOptimizer::Overshoot(OvershootSgd::new(self))
        } else {
            tracing::info!("Optimizer: momentum SGD");
            TrainingOptimizer::Plain(self.plain_config().init::<B, M>())
        }
    }
}

/// The optimizer the trainer drives, with or without the overshoot capability.
pub enum TrainingOptimizer<O> {
    Plain(O),
    Overshoot(OvershootSgd),
}

impl<O> TrainingOptimizer<O> {
    pub fn step<B, M>(&mut self, lr: LearningRate, module: M, grads: GradientsParams) -> M
    where
        B: AutodiffBackend,
        M: AutodiffModule<B>,
        O: Optimizer<M, B>,
    {
        match self {
            TrainingOptimizer::Plain(optim)     => optim.step(lr, module, grads),
            TrainingOptimizer::Overshoot(optim) => optim.step::<B, M>(lr, module, grads),
        }
    }

    /// The state-switching half of the interface, if this variant has one.
    pub fn overshoot_mut(&mut self) -> Option<&mut OvershootSgd> {
        match self {
            TrainingOptimizer::Plain(_)         => None,
            TrainingOptimizer::Overshoot(optim) => Some(optim),
        }
    }
}

/// Which snapshot the module's parameters currently hold.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LivePoint {
    Base,
    Overshoot,
}

#[derive(Debug, Clone, Copy)]
struct OvershootRule {
    momentum:     Option<f64>,
    weight_decay: Option<f32>,
    overshoot:    f64,
}

struct Advanced<B: Backend, const D: usize> {
    base:     Tensor<B, D>,
    velocity: Option<Tensor<B, D>>,
    live:     Tensor<B, D>,
}

impl OvershootRule {
    fn advance<B: Backend, const D: usize>(
        &self,
        lr:       LearningRate,
        base:     Tensor<B, D>,
        grad:     Tensor<B, D>,
        velocity: Option<Tensor<B, D>>,
    ) -> Advanced<B, D> {
        let grad = match self.weight_decay {
            Some(penalty) => base.clone().mul_scalar(penalty).add(grad),
            None => grad,
        };

        let (direction, velocity) = match self.momentum {
            Some(momentum) => {
                let velocity = match velocity {
                    Some(previous) => grad.add(previous.mul_scalar(momentum)),
                    None => grad,
                };
                (velocity.clone(), Some(velocity))
            }
            None => (grad, None),
        };

        let delta = direction.mul_scalar(lr);
        let base  = base.sub(delta.clone());
        let live  = if self.overshoot == 0.0 {
            base.clone()
        } else {
            base.clone().sub(delta.mul_scalar(self.overshoot))
        };

        Advanced { base, velocity, live }
    }
}

/// A device tensor of any rank; the mapper knows `D` when it reads it back.
type ErasedTensor = Box<dyn Any + Send>;

fn erase<B: Backend, const D: usize>(tensor: Tensor<B, D>) -> ErasedTensor {
    Box::new(tensor)
}

fn restore<B: Backend, const D: usize>(erased: ErasedTensor) -> Option<Tensor<B, D>> {
    erased.downcast::<Tensor<B, D>>().ok().map(|tensor| *tensor)
}

/// Per-parameter state. Everything stays on the parameter's device
/// as `Tensor<B::InnerBackend, D>`.
struct Trajectory {
    base:     ErasedTensor,
    velocity: Option<ErasedTensor>,
    /// Overshoot values parked while the base point is live
    stashed:  Option<ErasedTensor>,
}

/// Momentum SGD that trains at an extrapolated point ahead of the
/// base trajectory and can swap the base point in for evaluation.
pub struct OvershootSgd {
    rule:         OvershootRule,
    trajectories: HashMap<ParamId, Trajectory>,
    live:         LivePoint,
}

impl OvershootSgd {
    pub fn new(settings: &SgdSettings) -> Self {
        Self {
            rule: OvershootRule {
                momentum:     (settings.momentum > 0.0).then_some(settings.momentum),
                weight_decay: (settings.weight_decay > 0.0).then_some(settings.weight_decay),
                overshoot:    settings.overshoot,
            },
            trajectories: HashMap::new(),
            live:         LivePoint::Overshoot,
        }
    }

    pub fn live_point(&self) -> LivePoint {
        self.live
    }

    /// Number of parameters that have received at least one update.
    pub fn tracked_params(&self) -> usize {
        self.trajectories.len()
    }

    /// Update base and momentum from `grads`, then make the new
    /// overshoot point live.
    pub fn step<B, M>(&mut self, lr: LearningRate, module: M, grads: GradientsParams) -> M
    where
        B: AutodiffBackend,
        M: AutodiffModule<B>,
    {
        // Every parameter must be back on its overshoot value before
        // the step so untouched ones stay consistent with the new state.
        let module = self.move_to_overshoot::<B, M>(module);

        let mut mapper = StepMapper::<B> {
            rule:         self.rule,
            lr,
            grads,
            trajectories: &mut self.trajectories,
            _backend:     PhantomData,
        };
        module.map(&mut mapper)
    }

    /// Load the base snapshot into the module. No-op if already there.
    pub fn move_to_base<B, M>(&mut self, module: M) -> M
    where
        B: AutodiffBackend,
        M: AutodiffModule<B>,
    {
        self.switch::<B, M>(module, LivePoint::Base)
    }

    /// Put the parked overshoot values back. No-op if already there.
    pub fn move_to_overshoot<B, M>(&mut self, module: M) -> M
    where
        B: AutodiffBackend,
        M: AutodiffModule<B>,
    {
        self.switch::<B, M>(module, LivePoint::Overshoot)
    }

    fn switch<B, M>(&mut self, module: M, target: LivePoint) -> M
    where
        B: AutodiffBackend,
        M: AutodiffModule<B>,
    {
        if self.live == target {
            return module;
        }
        tracing::trace!("Switching {} parameters to {:?}", self.tracked_params(), target);

        let mut mapper = SwitchMapper::<B> {
            target,
            trajectories: &mut self.trajectories,
            _backend:     PhantomData,
        };
        let module = module.map(&mut mapper);
        self.live = target;
        module
    }
}

struct StepMapper<'a, B: AutodiffBackend> {
    rule:         OvershootRule,
    lr:           LearningRate,
    grads:        GradientsParams,
    trajectories: &'a mut HashMap<ParamId, Trajectory>,
    _backend:     PhantomData<B>,
}

impl<B: AutodiffBackend> ModuleMapper<B> for StepMapper<'_, B> {
    fn map_float<const D: usize>(&mut self, id: ParamId, tensor: Tensor<B, D>) -> Tensor<B, D> {
        let Some(grad) = self.grads.remove::<B::InnerBackend, D>(id) else {
            return tensor;
        };
        let is_require_grad = tensor.is_require_grad();

        let (base, velocity) = match self.trajectories.remove(&id) {
            Some(state) => (
                restore::<B::InnerBackend, D>(state.base),
                state.velocity.and_then(restore::<B::InnerBackend, D>),
            ),
            None => (None, None),
        };
        // First update: base starts where the parameter is
        let base = base.unwrap_or_else(|| tensor.inner());

        let advanced = self.rule.advance(self.lr, base, grad, velocity);
        self.trajectories.insert(
            id,
            Trajectory {
                base:     erase(advanced.base),
                velocity: advanced.velocity.map(erase),
                stashed:  None,
            },
        );

        let mut live = Tensor::from_inner(advanced.live);
        if is_require_grad {
            live = live.require_grad();
        }
        live
    }
}

struct SwitchMapper<'a, B: AutodiffBackend> {
    target:       LivePoint,
    trajectories: &'a mut HashMap<ParamId, Trajectory>,
    _backend:     PhantomData<B>,
}

impl<B: AutodiffBackend> ModuleMapper<B> for SwitchMapper<'_, B> {
    fn map_float<const D: usize>(&mut self, id: ParamId, tensor: Tensor<B, D>) -> Tensor<B, D> {
        // Parameters that never saw a gradient (and running stats) stay put
        let Some(trajectory) = self.trajectories.get_mut(&id) else {
            return tensor;
        };
        let is_require_grad = tensor.is_require_grad();

        let next = match self.target {
            LivePoint::Base => {
                let Some(base) = trajectory
                    .base
                    .downcast_ref::<Tensor<B::InnerBackend, D>>()
                    .cloned()
                else {
                    return tensor;
                };
                trajectory.stashed = Some(erase(tensor.inner()));
                base
            }
            LivePoint::Overshoot => match trajectory.stashed.take().and_then(restore::<B::InnerBackend, D>) {
                Some(stashed) => stashed,
                None => return tensor,
            },
        };

        let mut tensor = Tensor::<B, D>::from_inner(next);
        if is_require_grad {
            tensor = tensor.require_grad();
        }
        tensor
    }
}
