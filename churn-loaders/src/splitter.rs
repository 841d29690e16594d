//! Stratified train/validation splitting
//!
//! Rows are grouped by the value of the target column. The validation set
//! takes `ceil(n * test_fraction)` rows, shared out between classes in
//! proportion to their size (largest remainder first), so every class keeps
//! roughly its share on both sides. Rows inside each class are shuffled with
//! a `StdRng` seeded from `seed`; the same seed always yields the same
//! partition.
//!
//! Every class needs at least two rows, and each side must be at least as
//! large as the number of classes.

use std::collections::BTreeMap;

use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;

use churn_core::Table;

use crate::error::{Error, Result};

/// Parameters for [`get_splits`]
#[derive(Debug, Clone, PartialEq)]
pub struct SplitOptions {
    /// Column to stratify on and to separate from the features
    pub target: String,

    /// Fraction of rows placed in the validation set, in `(0, 1)`
    pub test_fraction: f64,

    /// Shuffle seed
    pub seed: u64,
}

impl Default for SplitOptions {
    fn default() -> Self {
        Self {
            target: "churn".to_string(),
            test_fraction: 0.2,
            seed: 42,
        }
    }
}

/// Features and labels for both sides of a split
#[derive(Debug, Clone, PartialEq)]
pub struct Splits {
    /// Training features (target column removed)
    pub x_train: Table,

    /// Validation features (target column removed)
    pub x_val: Table,

    /// Training labels, aligned with `x_train`
    pub y_train: Vec<String>,

    /// Validation labels, aligned with `x_val`
    pub y_val: Vec<String>,
}

impl Splits {
    /// Total rows across both sides
    pub fn len(&self) -> usize {
        self.y_train.len() + self.y_val.len()
    }

    /// Whether both sides are empty
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Split `table` into stratified train and validation sets
pub fn get_splits(table: &Table, options: &SplitOptions) -> Result<Splits> {
    let (train_rows, val_rows) = stratified_indices(table, options)?;
    let features = table.drop_column(&options.target)?;
    let labels = table.column(&options.target)?;

    let pick = |rows: &[usize]| -> Vec<String> {
        rows.iter().map(|&i| labels[i].to_string()).collect()
    };

    Ok(Splits {
        x_train: features.take_rows(&train_rows)?,
        x_val: features.take_rows(&val_rows)?,
        y_train: pick(&train_rows),
        y_val: pick(&val_rows),
    })
}

/// Row indices for `(train, validation)` without materializing tables
pub fn stratified_indices(
    table: &Table,
    options: &SplitOptions,
) -> Result<(Vec<usize>, Vec<usize>)> {
    let fraction = options.test_fraction;
    if !fraction.is_finite() || fraction <= 0.0 || fraction >= 1.0 {
        return Err(Error::InvalidArgument(format!(
            "test_fraction must be in (0, 1), got {fraction}"
        )));
    }

    let target = table.column_index(&options.target).ok_or_else(|| {
        Error::InvalidArgument(format!(
            "Target column '{}' not found in table",
            options.target
        ))
    })?;

    let total = table.num_rows();
    let n_val = validation_size(total, fraction);
    if n_val == 0 || n_val >= total {
        return Err(Error::InvalidArgument(format!(
            "test_fraction {fraction} leaves an empty side when splitting {total} rows"
        )));
    }

    let mut classes: BTreeMap<&str, Vec<usize>> = BTreeMap::new();
    for (index, row) in table.rows().iter().enumerate() {
        classes.entry(row[target].as_str()).or_default().push(index);
    }

    if let Some((class, rows)) = classes.iter().find(|(_, rows)| rows.len() < 2) {
        return Err(Error::InvalidArgument(format!(
            "class '{class}' of '{}' has {} row(s); stratified splitting needs at least 2",
            options.target,
            rows.len()
        )));
    }
    for (side, size) in [("validation", n_val), ("training", total - n_val)] {
        if size < classes.len() {
            return Err(Error::InvalidArgument(format!(
                "{side} size {size} is smaller than the {} classes of '{}'",
                classes.len(),
                options.target
            )));
        }
    }

    let sizes: Vec<usize> = classes.values().map(Vec::len).collect();
    let quotas = allocate(&sizes, n_val, total);

    let mut rng = StdRng::seed_from_u64(options.seed);
    let mut train = Vec::with_capacity(total - n_val);
    let mut val = Vec::with_capacity(n_val);
    for (mut rows, quota) in classes.into_values().zip(quotas) {
        rows.shuffle(&mut rng);
        let rest = rows.split_off(quota);
        val.extend(rows);
        train.extend(rest);
    }

    train.shuffle(&mut rng);
    val.shuffle(&mut rng);
    Ok((train, val))
}

#[allow(clippy::cast_precision_loss, clippy::cast_possible_truncation, clippy::cast_sign_loss)]
fn validation_size(total: usize, fraction: f64) -> usize {
    (total as f64 * fraction).ceil() as usize
}

/// Share `n_val` slots among classes of the given sizes by largest remainder.
///
/// Ties go to the earlier class, so the result only depends on the inputs.
fn allocate(sizes: &[usize], n_val: usize, total: usize) -> Vec<usize> {
    let mut quotas: Vec<usize> = sizes.iter().map(|&size| size * n_val / total).collect();
    let mut remainders: Vec<(usize, usize)> = sizes
        .iter()
        .enumerate()
        .map(|(class, &size)| ((size * n_val) % total, class))
        .collect();
    remainders.sort_by(|a, b| b.0.cmp(&a.0).then(a.1.cmp(&b.1)));

    let mut missing = n_val - quotas.iter().sum::<usize>();
    for (_, class) in remainders {
        if missing == 0 {
            break;
        }
        if quotas[class] < sizes[class] {
            quotas[class] += 1;
            missing -= 1;
        }
    }
    quotas
}
