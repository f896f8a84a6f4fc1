use rapidfuzz::fuzz;

/// Best similarity of `needle` against any equal-length character window of
/// `haystack`, as a percentage.
///
/// The shorter input is taken as the needle, so an exact substring always
/// scores 100. Case folding is up to the caller.
///
/// # Returns
///
/// A score in `0..=100`, rounded.
pub fn partial_ratio(needle: &str, haystack: &str) -> u8 {
    let a: Vec<char> = needle.chars().collect();
    let b: Vec<char> = haystack.chars().collect();
    let (short, long) = if a.len() <= b.len() { (&a, &b) } else { (&b, &a) };
    if short.is_empty() {
        return 100;
    }

    let mut best = 0.0_f64;
    for window in long.windows(short.len()) {
        let score = fuzz::ratio(short.iter().copied(), window.iter().copied());
        best = best.max(score);
        if best >= 100.0 {
            break;
        }
    }
    best.round() as u8
}
