use std::cmp::Ordering;

use ndarray::{ArrayView1, ArrayView2};

/// Added to the norm so a zero vector normalizes to zero instead of NaN.
pub const NORM_EPSILON: f32 = 1e-8;

/// Returns `v / (||v||_2 + NORM_EPSILON)`.
pub fn normalize(vector: &[f32]) -> Vec<f32> {
    let view = ArrayView1::from(vector);
    let norm = view.dot(&view).sqrt() + NORM_EPSILON;
    view.mapv(|x| x / norm).to_vec()
}

/// Cosine similarity as `dot(normalize(a), normalize(b))`.
///
/// Vectors of different length score 0.0.
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    if a.len() != b.len() || a.is_empty() {
        return 0.0;
    }
    let a = normalize(a);
    let b = normalize(b);
    ArrayView1::from(&a[..]).dot(&ArrayView1::from(&b[..]))
}

/// Scores every row of a row-major `rows x dim` matrix against `query` in one product.
pub fn matrix_scores(matrix: &[f32], dim: usize, query: &[f32]) -> Vec<f32> {
    if dim == 0 || matrix.is_empty() || query.len() != dim {
        return Vec::new();
    }
    let rows = matrix.len() / dim;
    match ArrayView2::from_shape((rows, dim), matrix) {
        Ok(view) => view.dot(&ArrayView1::from(query)).to_vec(),
        Err(_) => Vec::new(),
    }
}

/// Indices ordered by descending score. Equal scores keep their original order
/// and NaN ranks below every number.
pub fn rank_descending(scores: &[f32]) -> Vec<usize> {
    let mut order: Vec<usize> = (0..scores.len()).collect();
    order.sort_by(|&left, &right| descending(scores[left], scores[right]));
    order
}

fn descending(left: f32, right: f32) -> Ordering {
    match (left.is_nan(), right.is_nan()) {
        (true, true) => Ordering::Equal,
        (true, false) => Ordering::Greater,
        (false, true) => Ordering::Less,
        (false, false) => right.total_cmp(&left),
    }
}

pub fn is_finite(vector: &[f32]) -> bool {
    vector.iter().all(|x| x.is_finite())
}
