//! Clip-name resolution.
//!
//! A clip reference can name several files: `rain|wind|thunder` picks one
//! alternative, and a final path segment ending in `<N>to<M>` (also
//! `<N> to <M>` or `<N>..<M>`) picks a number in `[N, M]`. A leading zero on
//! `N` fixes the padding width, so `birds/01to12` yields `birds/07`.
//!
//! Resolution happens at spawn time, so every instance draws afresh.

use rand::seq::SliceRandom;
use rand::Rng;

pub fn resolve_clip<R: Rng + ?Sized>(clip: &str, rng: &mut R) -> String {
    let alternatives: Vec<&str> = clip
        .split('|')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .collect();
    let chosen = alternatives.choose(rng).copied().unwrap_or(clip);

    let (dir, segment) = match chosen.rfind('/') {
        Some(idx) => chosen.split_at(idx + 1),
        None => ("", chosen),
    };

    match split_numeric_range(segment) {
        Some((prefix, first, last)) => {
            let (Ok(a), Ok(b)) = (first.parse::<u64>(), last.parse::<u64>()) else {
                return chosen.to_string();
            };
            let n = rng.gen_range(a.min(b)..=a.max(b));
            let width = if first.len() > 1 && first.starts_with('0') {
                first.len()
            } else {
                0
            };
            format!("{dir}{prefix}{n:0width$}")
        }
        None => chosen.to_string(),
    }
}

/// Split `prefix<N>to<M>` into its three parts.
fn split_numeric_range(segment: &str) -> Option<(&str, &str, &str)> {
    let is_digit = |c: char| c.is_ascii_digit();

    let last_start = segment.trim_end_matches(is_digit).len();
    if last_start == segment.len() {
        return None;
    }
    let last = &segment[last_start..];

    let rest = segment[..last_start].trim_end();
    let rest = rest
        .strip_suffix("..")
        .or_else(|| rest.strip_suffix("to"))?
        .trim_end();

    let first_start = rest.trim_end_matches(is_digit).len();
    if first_start == rest.len() {
        return None;
    }
    Some((&rest[..first_start], &rest[first_start..], last))
}
