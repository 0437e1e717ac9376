/// Canonicalize free text for matching: lowercase, trimmed, internal
/// whitespace collapsed, punctuation stripped except characters meaningful
/// to numeric parsing. Total and idempotent.
pub fn normalize(text: &str) -> String {
	let mut out = String::with_capacity(text.len());
	let mut pending_space = false;

	for ch in text.chars() {
		if ch.is_whitespace() {
			pending_space = !out.is_empty();

			continue;
		}
		// Filter after lowercasing: a lowercase expansion can emit combining
		// marks that must not survive (e.g. U+0130 lowers to `i` + U+0307).
		for lowered in ch.to_lowercase() {
			if !lowered.is_alphanumeric() && lowered != '.' && lowered != '-' {
				continue;
			}
			if pending_space {
				out.push(' ');

				pending_space = false;
			}
			out.push(lowered);
		}
	}

	out
}

/// Split an already-normalized string into tokens.
pub fn tokenize(normalized: &str) -> Vec<&str> {
	normalized.split_whitespace().collect()
}
