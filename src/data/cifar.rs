// ============================================================
// Layer 4 — CIFAR-10 Reader
// ============================================================
// Reads the binary version of CIFAR-10:
//   https://www.cs.toronto.edu/~kriz/cifar.html
//
// Each file is a flat run of 3073-byte records:
//   [label: u8][red: 1024 bytes][green: 1024 bytes][blue: 1024 bytes]
// i.e. the pixels are already in CHW order, which is exactly the
// layout ImageItem stores.
//
// Directory layout expected under --data_dir:
//   data_batch_1.bin .. data_batch_5.bin   (training, 50 000 images)
//   test_batch.bin                         (evaluation, 10 000 images)

use anyhow::{bail, Context, Result};
use std::{fs, path::Path};

use crate::data::dataset::{ImageDataset, ImageItem, PIXELS_PER_IMAGE};

pub const CIFAR10_CLASSES: usize = 10;

const BYTES_PER_RECORD: usize = PIXELS_PER_IMAGE + 1;

const TRAIN_FILES: [&str; 5] = [
    "data_batch_1.bin",
    "data_batch_2.bin",
    "data_batch_3.bin",
    "data_batch_4.bin",
    "data_batch_5.bin",
];

const TEST_FILE: &str = "test_batch.bin";

/// Training and evaluation halves of CIFAR-10.
pub struct CifarSplits {
    pub train: ImageDataset,
    pub test:  ImageDataset,
}

/// Load the five training files and the test file from `dir`.
pub fn load_dir(dir: impl AsRef<Path>) -> Result<CifarSplits> {
    let dir = dir.as_ref();

    let mut train = Vec::new();
    for name in TRAIN_FILES {
        train.extend(read_file(&dir.join(name))?);
    }
    let test = read_file(&dir.join(TEST_FILE))?;

    tracing::info!(
        "Loaded CIFAR-10 from '{}': {} train, {} test images",
        dir.display(),
        train.len(),
        test.len(),
    );

    Ok(CifarSplits {
        train: ImageDataset::new(train, CIFAR10_CLASSES),
        test:  ImageDataset::new(test, CIFAR10_CLASSES),
    })
}

fn read_file(path: &Path) -> Result<Vec<ImageItem>> {
    let bytes = fs::read(path)
        .with_context(|| format!("Cannot read CIFAR-10 file '{}'", path.display()))?;
    parse_records(&bytes).with_context(|| format!("Malformed CIFAR-10 file '{}'", path.display()))
}

/// Split a raw buffer into records. The buffer must hold a whole,
/// non-zero number of records and every label must be in range.
pub fn parse_records(bytes: &[u8]) -> Result<Vec<ImageItem>> {
    if bytes.is_empty() || bytes.len() % BYTES_PER_RECORD != 0 {
        bail!(
            "expected a multiple of {} bytes, found {}",
            BYTES_PER_RECORD,
            bytes.len()
        );
    }

    bytes
        .chunks_exact(BYTES_PER_RECORD)
        .enumerate()
        .map(|(index, record)| {
            let label = record[0] as usize;
            if label >= CIFAR10_CLASSES {
                bail!("record {index} has label {label}, expected < {CIFAR10_CLASSES}");
            }
            Ok(ImageItem { pixels: record[1..].to_vec(), label })
        })
        .collect()
}
