//! Cosine distance between embeddings and per-model acceptance thresholds.

/// Distance at or below which two faces count as the same person.
/// Calibrated per model; the values are not interchangeable across models.
const DISTANCE_THRESHOLDS: &[(&str, f64)] = &[
    ("ArcFace", 0.68),
    ("Facenet", 0.40),
    ("VGG-Face", 0.40),
    ("dlib-resnet-v1", 0.09),
];

pub const DEFAULT_DISTANCE_THRESHOLD: f64 = 0.40;

/// Cosine distance in [0, 2]: 0 = identical direction, 2 = opposite.
/// A zero-norm operand yields the neutral 1.0 instead of dividing by zero.
pub fn cosine_distance(lhs: &[f64], rhs: &[f64]) -> f64 {
    let mut dot = 0.0;
    let mut norm_lhs = 0.0;
    let mut norm_rhs = 0.0;

    for (l, r) in lhs.iter().zip(rhs.iter()) {
        dot += l * r;
        norm_lhs += l * l;
        norm_rhs += r * r;
    }

    let norm = norm_lhs.sqrt() * norm_rhs.sqrt();
    if norm == 0.0 {
        return 1.0;
    }
    1.0 - dot / norm
}

pub fn distance_threshold(model_name: &str) -> f64 {
    DISTANCE_THRESHOLDS
        .iter()
        .find(|(name, _)| *name == model_name)
        .map(|(_, threshold)| *threshold)
        .unwrap_or(DEFAULT_DISTANCE_THRESHOLD)
}

/// The boundary is inclusive: a distance exactly at the threshold matches.
pub fn accept(distance: f64, model_name: &str) -> bool {
    distance <= distance_threshold(model_name)
}
