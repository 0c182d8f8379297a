//! Confidence check between the requested artist and the best search hit.

/// Minimum similarity for a search hit to be accepted.
pub const DEFAULT_SIMILARITY_THRESHOLD: f64 = 0.9;

/// Similarity in `[0, 1]` between a query and a candidate name.
///
/// Case-insensitive; the query is also tried with a leading "the ", and the
/// better score wins, so "Beatles" matches "The Beatles".
#[must_use]
pub fn name_similarity(query: &str, candidate: &str) -> f64 {
    let query: Vec<char> = query.trim().to_lowercase().chars().collect();
    let candidate: Vec<char> = candidate.trim().to_lowercase().chars().collect();
    let prefixed: Vec<char> = "the ".chars().chain(query.iter().copied()).collect();

    matching_ratio(&query, &candidate).max(matching_ratio(&prefixed, &candidate))
}

/// Returns true when `candidate` is a confident match for `query`.
#[must_use]
pub fn is_confident_match(query: &str, candidate: &str, threshold: f64) -> bool {
    name_similarity(query, candidate) >= threshold
}

/// Gestalt pattern-matching ratio: `2 * M / (len(a) + len(b))`, where `M`
/// counts characters in the longest common block plus, recursively, the
/// blocks to its left and right.
#[allow(clippy::cast_precision_loss)]
fn matching_ratio(a: &[char], b: &[char]) -> f64 {
    let total = a.len() + b.len();
    if total == 0 {
        return 1.0;
    }
    2.0 * matching_chars(a, b) as f64 / total as f64
}

fn matching_chars(a: &[char], b: &[char]) -> usize {
    let mut matched = 0;
    let mut pending = vec![(a, b)];
    while let Some((a, b)) = pending.pop() {
        let (start_a, start_b, len) = longest_common_block(a, b);
        if len == 0 {
            continue;
        }
        matched += len;
        pending.push((&a[..start_a], &b[..start_b]));
        pending.push((&a[start_a + len..], &b[start_b + len..]));
    }
    matched
}

/// Longest common run of characters; ties go to the earliest start in `a`,
/// then in `b`.
fn longest_common_block(a: &[char], b: &[char]) -> (usize, usize, usize) {
    let mut best = (0, 0, 0);
    let mut previous = vec![0usize; b.len() + 1];
    for (i, left) in a.iter().enumerate() {
        let mut current = vec![0usize; b.len() + 1];
        for (j, right) in b.iter().enumerate() {
            if left == right {
                let run = previous[j] + 1;
                current[j + 1] = run;
                if run > best.2 {
                    best = (i + 1 - run, j + 1 - run, run);
                }
            }
        }
        previous = current;
    }
    best
}
