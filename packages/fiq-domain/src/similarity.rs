/// Pluggable similarity strategy for approximate name matching. Scores are
/// normalized to 0.0..=1.0 where 1.0 is an exact match.
pub trait SimilarityScorer
where
	Self: Send + Sync,
{
	fn score(&self, a: &str, b: &str) -> f64;
}

/// Edit-distance similarity: `1 - distance / max_len`.
#[derive(Clone, Copy, Debug, Default)]
pub struct NormalizedLevenshtein;
impl SimilarityScorer for NormalizedLevenshtein {
	fn score(&self, a: &str, b: &str) -> f64 {
		let a_chars: Vec<char> = a.chars().collect();
		let b_chars: Vec<char> = b.chars().collect();
		let max_len = a_chars.len().max(b_chars.len());

		if max_len == 0 {
			return 1.0;
		}

		let distance = levenshtein(&a_chars, &b_chars);

		1.0 - distance as f64 / max_len as f64
	}
}

fn levenshtein(a: &[char], b: &[char]) -> usize {
	if a.is_empty() {
		return b.len();
	}
	if b.is_empty() {
		return a.len();
	}

	let mut previous: Vec<usize> = (0..=b.len()).collect();
	let mut current = vec![0; b.len() + 1];

	for (row, a_char) in a.iter().enumerate() {
		current[0] = row + 1;

		for (col, b_char) in b.iter().enumerate() {
			let substitution_cost = usize::from(a_char != b_char);

			current[col + 1] = (previous[col] + substitution_cost)
				.min(previous[col + 1] + 1)
				.min(current[col] + 1);
		}

		std::mem::swap(&mut previous, &mut current);
	}

	previous[b.len()]
}
