//! Dense vector helpers used by theme clustering.

/// Cosine similarity of two equal-length vectors, in `[-1, 1]`.
///
/// Returns `0.0` when either vector has zero magnitude. Callers are expected
/// to have checked that the dimensions agree; extra trailing components of
/// the longer vector are ignored.
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    let mut dot = 0.0f64;
    let mut norm_a = 0.0f64;
    let mut norm_b = 0.0f64;

    for (x, y) in a.iter().zip(b.iter()) {
        let (x, y) = (f64::from(*x), f64::from(*y));
        dot += x * y;
        norm_a += x * x;
        norm_b += y * y;
    }

    if norm_a == 0.0 || norm_b == 0.0 {
        return 0.0;
    }

    (dot / (norm_a.sqrt() * norm_b.sqrt())) as f32
}

/// Element-wise arithmetic mean of a set of equal-length vectors.
///
/// The dimensionality is taken from the first vector; an empty input yields
/// an empty vector.
pub fn mean<'a, I>(vectors: I) -> Vec<f32>
where
    I: IntoIterator<Item = &'a [f32]>,
{
    let mut iter = vectors.into_iter();
    let Some(first) = iter.next() else {
        return Vec::new();
    };

    let mut sums: Vec<f64> = first.iter().map(|v| f64::from(*v)).collect();
    let mut count = 1usize;

    for vector in iter {
        for (sum, value) in sums.iter_mut().zip(vector.iter()) {
            *sum += f64::from(*value);
        }
        count += 1;
    }

    sums.into_iter()
        .map(|sum| (sum / count as f64) as f32)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn approx(a: f32, b: f32) -> bool {
        (a - b).abs() < 1e-6
    }

    #[test]
    fn identical_vectors_have_similarity_one() {
        let a = [0.3, -1.2, 4.0];
        assert!(approx(cosine_similarity(&a, &a), 1.0));
    }

    #[test]
    fn orthogonal_and_opposite_vectors() {
        assert!(approx(cosine_similarity(&[1.0, 0.0], &[0.0, 1.0]), 0.0));
        assert!(approx(cosine_similarity(&[1.0, 2.0], &[-1.0, -2.0]), -1.0));
    }

    #[test]
    fn zero_vector_similarity_is_zero() {
        assert_eq!(cosine_similarity(&[0.0, 0.0], &[1.0, 1.0]), 0.0);
    }

    #[test]
    fn similarity_ignores_magnitude() {
        let sim = cosine_similarity(&[1.0, 1.0], &[10.0, 10.0]);
        assert!(approx(sim, 1.0));
    }

    #[test]
    fn mean_of_vectors() {
        let a = vec![1.0, 2.0, 3.0];
        let b = vec![3.0, 4.0, 5.0];
        let c = vec![2.0, 0.0, -2.0];
        let m = mean([a.as_slice(), b.as_slice(), c.as_slice()]);
        assert_eq!(m, vec![2.0, 2.0, 2.0]);
    }

    #[test]
    fn mean_of_single_vector_is_itself() {
        let a = vec![0.25, -0.5];
        assert_eq!(mean([a.as_slice()]), a);
    }

    #[test]
    fn mean_of_nothing_is_empty() {
        let empty: [&[f32]; 0] = [];
        assert!(mean(empty).is_empty());
    }
}
