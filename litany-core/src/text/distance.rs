//! Character-level edit distance.

/// Levenshtein distance between `a` and `b` (insert / delete / substitute,
/// each costing 1), counted over `char`s.
///
/// Runs in O(|a|·|b|) time with two rolling rows sized to the shorter input.
pub fn levenshtein(a: &str, b: &str) -> usize {
    let a: Vec<char> = a.chars().collect();
    let b: Vec<char> = b.chars().collect();
    let (long, short) = if a.len() >= b.len() { (a, b) } else { (b, a) };

    if short.is_empty() {
        return long.len();
    }

    let mut prev: Vec<usize> = (0..=short.len()).collect();
    let mut curr = vec![0usize; short.len() + 1];

    for (i, lc) in long.iter().enumerate() {
        curr[0] = i + 1;
        for (j, sc) in short.iter().enumerate() {
            let cost = usize::from(lc != sc);
            curr[j + 1] = (prev[j + 1] + 1).min(curr[j] + 1).min(prev[j] + cost);
        }
        std::mem::swap(&mut prev, &mut curr);
    }

    prev[short.len()]
}

/// `levenshtein(a, b)` divided by the length of `b` (at least 1).
///
/// `b` is the reference (the target phrase), so the ratio reads as "fraction
/// of the target that had to be edited".
pub fn ratio(a: &str, b: &str) -> f64 {
    let denom = b.chars().count().max(1);
    levenshtein(a, b) as f64 / denom as f64
}
