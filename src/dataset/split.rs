use rand::SeedableRng;
use rand::rngs::StdRng;
use rand::seq::SliceRandom;

use super::{Dataset, DatasetError};

/// Seed used for the held-out split so repeated runs see the same partitions.
pub const SPLIT_SEED: u64 = 223;
/// Fraction of samples held out for evaluation.
pub const TEST_FRACTION: f64 = 0.2;

/// Training and evaluation partitions drawn from one dataset.
#[derive(Debug, Clone)]
pub struct TrainTestSplit {
    pub train: Dataset,
    pub test: Dataset,
}

/// Shuffle sample indices with `seed` and hold out `ceil(test_fraction * n)`
/// samples for evaluation. No stratification is applied.
pub fn train_test_split(
    dataset: &Dataset,
    test_fraction: f64,
    seed: u64,
) -> Result<TrainTestSplit, DatasetError> {
    if !(test_fraction > 0.0 && test_fraction < 1.0) {
        return Err(DatasetError::InvalidSplit(format!(
            "test fraction must be in (0, 1), got {test_fraction}"
        )));
    }
    let n = dataset.len();
    let n_test = (test_fraction * n as f64).ceil() as usize;
    if n_test == 0 || n_test >= n {
        return Err(DatasetError::InvalidSplit(format!(
            "{n} samples cannot be split with test fraction {test_fraction}"
        )));
    }

    let mut indices: Vec<usize> = (0..n).collect();
    let mut rng = StdRng::seed_from_u64(seed);
    indices.shuffle(&mut rng);
    let (test_idx, train_idx) = indices.split_at(n_test);

    Ok(TrainTestSplit {
        train: dataset.select(train_idx),
        test: dataset.select(test_idx),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dataset::load_bundled;

    #[test]
    fn holds_out_twenty_percent_of_iris() {
        let dataset = load_bundled().unwrap();
        let split = train_test_split(&dataset, TEST_FRACTION, SPLIT_SEED).unwrap();
        assert_eq!(split.test.len(), 30);
        assert_eq!(split.train.len(), 120);
        let total: Vec<usize> = split
            .train
            .class_counts()
            .iter()
            .zip(split.test.class_counts())
            .map(|(a, b)| a + b)
            .collect();
        assert_eq!(total, vec![50, 50, 50]);
    }

    #[test]
    fn same_seed_gives_same_partitions() {
        let dataset = load_bundled().unwrap();
        let a = train_test_split(&dataset, TEST_FRACTION, SPLIT_SEED).unwrap();
        let b = train_test_split(&dataset, TEST_FRACTION, SPLIT_SEED).unwrap();
        assert_eq!(a.test, b.test);
        assert_eq!(a.train, b.train);
    }

    #[test]
    fn rounds_test_size_up() {
        let dataset = load_bundled().unwrap().select(&(0..11).collect::<Vec<_>>());
        let split = train_test_split(&dataset, 0.2, 1).unwrap();
        assert_eq!(split.test.len(), 3);
        assert_eq!(split.train.len(), 8);
    }

    #[test]
    fn rejects_degenerate_fractions() {
        let dataset = load_bundled().unwrap();
        assert!(train_test_split(&dataset, 0.0, SPLIT_SEED).is_err());
        assert!(train_test_split(&dataset, 1.0, SPLIT_SEED).is_err());
    }
}
