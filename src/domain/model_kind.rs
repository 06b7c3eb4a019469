// ============================================================
// Layer 3 — Model Selector
// ============================================================
// Maps the `--model` string onto a closed set of architectures.
// The actual constructors live in Layer 5 (ml::models); this
// file only decides whether a name is known.
//
// Unknown names are fatal: the use case parses the name before
// touching the filesystem or loading any data.

use std::{fmt, str::FromStr};

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Raised when `--model` names an architecture this crate does not ship.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ModelSelectError {
    #[error("Unsupported model name {0}")]
    Unsupported(String),
}

/// Every architecture the selector can build.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ModelKind {
    /// VGG-19 with batch normalisation
    Vgg,
    /// ResNet-18 (CIFAR stem: 3x3 conv, no max-pool)
    Resnet,
    /// Pre-activation ResNet-18
    PreActResnet,
    /// MobileNet v1 with depthwise-separable blocks
    Mobilenet,
    /// MobileNet v2 with inverted residual blocks
    MobilenetV2,
    /// LeNet-5
    Lenet,
}

impl ModelKind {
    pub const ALL: [ModelKind; 6] = [
        ModelKind::Vgg,
        ModelKind::Resnet,
        ModelKind::PreActResnet,
        ModelKind::Mobilenet,
        ModelKind::MobilenetV2,
        ModelKind::Lenet,
    ];

    /// The identifier accepted on the command line.
    pub fn name(self) -> &'static str {
        match self {
            ModelKind::Vgg          => "vgg",
            ModelKind::Resnet       => "resnet",
            ModelKind::PreActResnet => "pre_act_resnet",
            ModelKind::Mobilenet    => "mobilenet",
            ModelKind::MobilenetV2  => "mobilenet_v2",
            ModelKind::Lenet        => "lenet",
        }
    }
}

impl FromStr for ModelKind {
    type Err = ModelSelectError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        ModelKind::ALL
            .into_iter()
            .find(|kind| kind.name() == s)
            .ok_or_else(|| ModelSelectError::Unsupported(s.to_string()))
    }
}

impl fmt::Display for ModelKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

// ─── Unit Tests ───────────────────────────────────────────────────────────────
#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_every_name_round_trips() {
        for kind in ModelKind::ALL {
            assert_eq!(kind.name().parse::<ModelKind>(), Ok(kind));
        }
    }

    #[test]
    fn test_unknown_name_is_rejected() {
        let err = "not_a_model".parse::<ModelKind>().unwrap_err();
        assert_eq!(err, ModelSelectError::Unsupported("not_a_model".into()));
        assert_eq!(err.to_string(), "Unsupported model name not_a_model");
    }

    #[test]
    fn test_names_are_case_sensitive() {
        // The original zoo spelled every identifier in lower case
        assert!("ResNet".parse::<ModelKind>().is_err());
        assert!("".parse::<ModelKind>().is_err());
    }
}
