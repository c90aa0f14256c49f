//! Knuth-Morris-Pratt substring search.
//!
//! The single-text functions work over any slice of comparable items;
//! strings go through `as_bytes()`, and offsets are byte offsets.
//! [`find_all_from_list`] filters a list of strings in one pass.

use crate::error::{CoreError, CoreResult};

/// Failure table: entry `i` is the length of the longest proper prefix of
/// `pattern[..=i]` that is also a suffix of it.
#[must_use]
pub fn failure<T: PartialEq>(pattern: &[T]) -> Vec<usize> {
    let mut fail = vec![0; pattern.len()];
    let mut j = 1;
    let mut k = 0;
    while j < pattern.len() {
        if pattern[j] == pattern[k] {
            fail[j] = k + 1;
            j += 1;
            k += 1;
        } else if k > 0 {
            k = fail[k - 1];
        } else {
            j += 1;
        }
    }
    fail
}

/// Offset of the first occurrence of `pattern` in `text`.
///
/// An empty pattern matches at 0.
#[must_use]
pub fn find_first<T: PartialEq>(pattern: &[T], text: &[T]) -> Option<usize> {
    if pattern.is_empty() {
        return Some(0);
    }
    let fail = failure(pattern);
    let mut k = 0;
    for (j, item) in text.iter().enumerate() {
        while k > 0 && *item != pattern[k] {
            k = fail[k - 1];
        }
        if *item == pattern[k] {
            if k == pattern.len() - 1 {
                return Some(j + 1 - pattern.len());
            }
            k += 1;
        }
    }
    None
}

/// Offsets of every occurrence of `pattern` in `text`, overlaps included.
///
/// An empty pattern matches at every offset from 0 through `text.len()`.
#[must_use]
pub fn find_all<T: PartialEq>(pattern: &[T], text: &[T]) -> Vec<usize> {
    if pattern.is_empty() {
        return (0..=text.len()).collect();
    }
    let fail = failure(pattern);
    let last = pattern.len() - 1;
    let mut matches = Vec::new();
    let mut k = 0;
    for (j, item) in text.iter().enumerate() {
        while k > 0 && *item != pattern[k] {
            k = fail[k - 1];
        }
        if *item == pattern[k] {
            if k == last {
                matches.push(j - last);
                k = fail[last];
            } else {
                k += 1;
            }
        }
    }
    matches
}

/// Indices of the texts that contain `pattern`, ascending and distinct.
///
/// The texts are joined, each followed by `separator`, and scanned once.
/// After a hit the scan resumes at the start of the next text, so each
/// index is reported once. An empty pattern selects every text.
///
/// ```rust
/// use bidms_core::kmp::find_all_from_list;
///
/// let hits = find_all_from_list("abc", &["abc421", "a12abc", "39akbc"], '*').unwrap();
/// assert_eq!(hits, vec![0, 1]);
/// ```
///
/// # Errors
///
/// Returns [`CoreError::InvalidArgument`] if `separator` occurs in
/// `pattern` or in any text.
pub fn find_all_from_list<S: AsRef<str>>(
    pattern: &str,
    texts: &[S],
    separator: char,
) -> CoreResult<Vec<usize>> {
    if pattern.contains(separator) {
        return Err(CoreError::invalid_argument(format!(
            "separator {separator:?} occurs in the pattern"
        )));
    }
    if let Some(i) = texts.iter().position(|t| t.as_ref().contains(separator)) {
        return Err(CoreError::invalid_argument(format!(
            "separator {separator:?} occurs in text {i}"
        )));
    }
    if pattern.is_empty() {
        return Ok((0..texts.len()).collect());
    }

    let mut sep = [0u8; 4];
    let sep = separator.encode_utf8(&mut sep).as_bytes();

    // Byte offset where each text begins in the joined buffer.
    let mut starts = Vec::with_capacity(texts.len() + 1);
    let mut joined = Vec::new();
    for text in texts {
        starts.push(joined.len());
        joined.extend_from_slice(text.as_ref().as_bytes());
        joined.extend_from_slice(sep);
    }
    starts.push(joined.len());

    let pattern = pattern.as_bytes();
    let fail = failure(pattern);
    let last = pattern.len() - 1;
    let mut hits = Vec::new();
    let mut j = 0;
    let mut k = 0;

    while j < joined.len() {
        if joined[j] == pattern[k] {
            if k < last {
                j += 1;
                k += 1;
                continue;
            }
            let segment = starts.partition_point(|&s| s <= j) - 1;
            hits.push(segment);
            j = starts[segment + 1];
            k = 0;
        } else if k > 0 {
            k = fail[k - 1];
        } else {
            j += 1;
        }
    }

    Ok(hits)
}

/// [`find_all_from_list`] over texts already joined by `separator`.
///
/// A single trailing separator ends the last text rather than opening an
/// empty one. An empty `joined` holds no texts.
///
/// ```rust
/// use bidms_core::kmp::find_all_from_joined;
///
/// let hits = find_all_from_joined("abc", "abc421*a12abc*39akbc*", '*').unwrap();
/// assert_eq!(hits, vec![0, 1]);
/// ```
///
/// # Errors
///
/// Returns [`CoreError::InvalidArgument`] if `separator` occurs in `pattern`.
pub fn find_all_from_joined(pattern: &str, joined: &str, separator: char) -> CoreResult<Vec<usize>> {
    if joined.is_empty() {
        return find_all_from_list::<&str>(pattern, &[], separator);
    }
    let body = joined.strip_suffix(separator).unwrap_or(joined);
    let texts: Vec<&str> = body.split(separator).collect();
    find_all_from_list(pattern, &texts, separator)
}
