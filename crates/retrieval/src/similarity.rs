use pl_domain::error::{Error, Result};
use std::cmp::Ordering;

pub fn cosine_similarity(query: &[f32], candidate: &[f32]) -> Result<f32> {
    if query.is_empty() || candidate.is_empty() {
        return Err(Error::InvalidArgument("vectors must not be empty".into()));
    }
    if query.len() != candidate.len() {
        return Err(Error::InvalidArgument(format!(
            "vector length mismatch: {} != {}",
            query.len(),
            candidate.len()
        )));
    }

    let dot: f32 = query.iter().zip(candidate).map(|(a, b)| a * b).sum();
    let denom = l2_norm(query) * l2_norm(candidate);
    if denom <= f32::EPSILON {
        return Ok(0.0);
    }
    Ok(dot / denom)
}

/// `(index, score)` for every candidate, best first. The sort is stable, so
/// equal scores keep candidate order.
pub fn rank_descending_by_cosine(
    query: &[f32],
    candidates: &[&[f32]],
) -> Result<Vec<(usize, f32)>> {
    let mut scores = Vec::with_capacity(candidates.len());
    for (idx, candidate) in candidates.iter().enumerate() {
        scores.push((idx, cosine_similarity(query, candidate)?));
    }
    scores.sort_by(|left, right| right.1.partial_cmp(&left.1).unwrap_or(Ordering::Equal));
    Ok(scores)
}

fn l2_norm(v: &[f32]) -> f32 {
    v.iter().map(|x| x * x).sum::<f32>().sqrt()
}
