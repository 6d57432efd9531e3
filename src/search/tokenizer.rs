//! Tokenizer and search-key helpers / 分词器与搜索键工具
//!
//! Supports / 支持：
//! - Term splitting on anything that is not a letter or digit / 按非字母数字字符分词
//! - Lowercase normalization / 小写标准化
//! - Suffix keys for backends without native infix search / 后缀搜索键

use std::collections::HashSet;

/// Tokenize text into lowercase terms / 对文本进行分词
pub fn tokenize(text: &str) -> Vec<String> {
    text.split(|c: char| !c.is_alphanumeric())
        .filter(|t| !t.is_empty())
        .map(|t| t.to_lowercase())
        .collect()
}

/// Tokenize search query (same rules as indexing) / 对搜索查询进行分词
pub fn tokenize_query(query: &str) -> Vec<String> {
    tokenize(query)
}

/// Build suffix search keys / 生成后缀搜索键
///
/// Each label is uppercased and trimmed, then every suffix starting at a
/// character index below `len - 1` is taken, so single-character suffixes are
/// never produced. Keys are unique and keep first-seen order.
/// 例如 "Zirkulation" -> ["ZIRKULATION", "IRKULATION", ..., "ON"]
pub fn make_suffixes<I, S>(labels: I) -> Vec<String>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let mut keys: Vec<String> = Vec::new();
    let mut seen: HashSet<String> = HashSet::new();

    for label in labels {
        let value = label.as_ref().to_uppercase();
        let chars: Vec<char> = value.trim().chars().collect();

        for start in 0..chars.len().saturating_sub(1) {
            let suffix: String = chars[start..].iter().collect();
            if seen.insert(suffix.clone()) {
                keys.push(suffix);
            }
        }
    }

    keys
}

/// Levenshtein edit distance over characters / 计算 Levenshtein 编辑距离
pub fn levenshtein_distance(s1: &str, s2: &str) -> usize {
    let s1_chars: Vec<char> = s1.chars().collect();
    let s2_chars: Vec<char> = s2.chars().collect();

    let len1 = s1_chars.len();
    let len2 = s2_chars.len();

    if len1 == 0 { return len2; }
    if len2 == 0 { return len1; }

    // Two rolling rows are enough / 仅需两行
    let mut prev: Vec<usize> = (0..=len2).collect();
    let mut curr = vec![0usize; len2 + 1];

    for i in 1..=len1 {
        curr[0] = i;
        for j in 1..=len2 {
            let cost = if s1_chars[i - 1] == s2_chars[j - 1] { 0 } else { 1 };
            curr[j] = (prev[j] + 1)
                .min(curr[j - 1] + 1)
                .min(prev[j - 1] + cost);
        }
        std::mem::swap(&mut prev, &mut curr);
    }

    prev[len2]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tokenize_german() {
        let tokens = tokenize("Zirkulation des Blutes; Kreislauf-System");
        assert_eq!(tokens, vec!["zirkulation", "des", "blutes", "kreislauf", "system"]);
    }

    #[test]
    fn test_tokenize_keeps_umlauts() {
        assert_eq!(tokenize("Größe Ärzte"), vec!["größe", "ärzte"]);
    }

    #[test]
    fn test_tokenize_notation() {
        assert_eq!(tokenize("612.1"), vec!["612", "1"]);
    }

    #[test]
    fn test_suffixes_of_zirkulation() {
        let keys = make_suffixes(["Zirkulation"]);
        assert_eq!(keys.first().map(String::as_str), Some("ZIRKULATION"));
        assert!(keys.contains(&"IRKULATION".to_string()));
        assert!(keys.contains(&"KULATION".to_string()));
        assert!(keys.contains(&"ON".to_string()));
        assert!(!keys.contains(&"N".to_string()));
        assert_eq!(keys.len(), "Zirkulation".len() - 1);
        assert_eq!(keys.last().map(String::as_str), Some("ON"));
    }

    #[test]
    fn test_suffixes_trim_and_dedupe() {
        let keys = make_suffixes(["  ab ", "xab", "b"]);
        // "AB" from the first label, "XAB" then the duplicate "AB" skipped, "B" too short
        assert_eq!(keys, vec!["AB", "XAB"]);
    }

    #[test]
    fn test_suffixes_empty() {
        let keys = make_suffixes(Vec::<String>::new());
        assert!(keys.is_empty());
        assert!(make_suffixes([""]).is_empty());
    }

    #[test]
    fn test_levenshtein() {
        assert_eq!(levenshtein_distance("", ""), 0);
        assert_eq!(levenshtein_distance("abc", "abc"), 0);
        assert_eq!(levenshtein_distance("abc", "abd"), 1);
        assert_eq!(levenshtein_distance("abc", "abcd"), 1);
        assert_eq!(levenshtein_distance("kreislauf", "kreislaf"), 1);
    }
}
