//! Pattern search command.

use bidms_core::kmp;

/// Prints the indices and contents of the texts containing `pattern`.
pub fn run(pattern: &str, separator: char, texts: &[String]) -> Result<Vec<usize>, Box<dyn std::error::Error>> {
    let hits = kmp::find_all_from_list(pattern, texts, separator)?;

    if hits.is_empty() {
        println!("No text contains {pattern:?}");
    }
    for &i in &hits {
        println!("[{i}] {}", texts[i]);
    }
    Ok(hits)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn texts(items: &[&str]) -> Vec<String> {
        items.iter().map(|s| (*s).to_string()).collect()
    }

    #[test]
    fn reports_matching_indices() {
        let texts = texts(&["xabcx", "abc", "ab", "cab"]);
        assert_eq!(run("abc", '*', &texts).unwrap(), vec![0, 1]);
        assert!(run("zz", '*', &texts).unwrap().is_empty());
    }

    #[test]
    fn separator_inside_text_is_rejected() {
        let texts = texts(&["a*b", "ab"]);
        assert!(run("ab", '*', &texts).is_err());
        assert_eq!(run("ab", '|', &texts).unwrap(), vec![1]);
    }
}
