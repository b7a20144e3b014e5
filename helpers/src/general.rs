use std::error::Error;
use std::fmt;

/// InputValueError is used if some game option or parameter does not fulfill the posed
/// requirements, e.g., an oil spill window that does not fit onto the track.
#[derive(Debug, Clone)]
pub struct InputValueError {
    pub msg: String,
}

impl InputValueError {
    pub fn new(msg: impl Into<String>) -> InputValueError {
        InputValueError { msg: msg.into() }
    }
}

impl fmt::Display for InputValueError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "Invalid input value: {}", self.msg)
    }
}

impl Error for InputValueError {}

/// argmax returns the index of the maximum value in the array x. On ties the first index wins.
pub fn argmax<T: std::cmp::PartialOrd + std::marker::Copy>(x: &[T]) -> usize {
    let mut idx_max = 0;
    let mut val_max = x[0];

    for (i, &val) in x.iter().enumerate().skip(1) {
        if val > val_max {
            val_max = val;
            idx_max = i;
        }
    }

    idx_max
}

/// max returns the maximum value in the array x.
pub fn max<T: std::cmp::PartialOrd + std::marker::Copy>(x: &[T]) -> T {
    x[argmax(x)]
}

#[derive(Debug, Clone, Copy)]
pub enum SortOrder {
    Ascending,
    Descending,
}

/// argsort returns the indices that would sort an array. NaN values compare as equal.
pub fn argsort<T: std::cmp::PartialOrd>(x: &[T], order: SortOrder) -> Vec<usize> {
    let mut indices: Vec<usize> = (0..x.len()).collect();
    let cmp = |a: &T, b: &T| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal);
    match order {
        SortOrder::Ascending => indices.sort_by(|&a, &b| cmp(&x[a], &x[b])),
        SortOrder::Descending => indices.sort_by(|&a, &b| cmp(&x[b], &x[a])),
    }
    indices
}

/// clamp_abs limits x to the symmetric interval [-limit, limit].
pub fn clamp_abs(x: f64, limit: f64) -> f64 {
    x.max(-limit).min(limit)
}

/// lerp_towards moves cur by the fraction alpha of the remaining gap to target (first order
/// low-pass filter, alpha in [0, 1]).
pub fn lerp_towards(cur: f64, target: f64, alpha: f64) -> f64 {
    cur + (target - cur) * alpha
}
