//! Redis-style glob matching for the in-memory backend's SCAN.
//!
//! Supports `*`, `?`, `[abc]`, `[^a]`, `[a-z]` and `\` escapes, like Redis'
//! `stringmatchlen`.

/// Returns true when `key` matches the Redis glob `pattern`.
pub fn glob_match(pattern: &str, key: &str) -> bool {
    let pattern: Vec<char> = pattern.chars().collect();
    let key: Vec<char> = key.chars().collect();
    match_from(&pattern, &key)
}

fn match_from(pattern: &[char], key: &[char]) -> bool {
    let (mut p, mut k) = (0, 0);
    // Backtrack point for the most recent `*`
    let mut star: Option<(usize, usize)> = None;

    while k < key.len() {
        if p < pattern.len() {
            match pattern[p] {
                '*' => {
                    star = Some((p, k));
                    p += 1;
                    continue;
                }
                '?' => {
                    p += 1;
                    k += 1;
                    continue;
                }
                '[' => {
                    if let Some((matched, next)) = match_class(pattern, p, key[k]) {
                        if matched {
                            p = next;
                            k += 1;
                            continue;
                        }
                    }
                }
                '\\' if p + 1 < pattern.len() => {
                    if pattern[p + 1] == key[k] {
                        p += 2;
                        k += 1;
                        continue;
                    }
                }
                c => {
                    if c == key[k] {
                        p += 1;
                        k += 1;
                        continue;
                    }
                }
            }
        }

        match star {
            Some((star_p, star_k)) => {
                p = star_p + 1;
                k = star_k + 1;
                star = Some((star_p, star_k + 1));
            }
            None => return false,
        }
    }

    pattern[p..].iter().all(|&c| c == '*')
}

/// Matches `c` against the class opening at `pattern[start]`.
///
/// Returns whether it matched and the index just past the closing `]`, or
/// `None` for an unterminated class.
fn match_class(pattern: &[char], start: usize, c: char) -> Option<(bool, usize)> {
    let mut i = start + 1;
    let negate = pattern.get(i) == Some(&'^');
    if negate {
        i += 1;
    }

    let mut matched = false;
    while i < pattern.len() && pattern[i] != ']' {
        if pattern[i] == '\\' && i + 1 < pattern.len() {
            matched |= pattern[i + 1] == c;
            i += 2;
        } else if i + 2 < pattern.len() && pattern[i + 1] == '-' && pattern[i + 2] != ']' {
            let (lo, hi) = if pattern[i] <= pattern[i + 2] {
                (pattern[i], pattern[i + 2])
            } else {
                (pattern[i + 2], pattern[i])
            };
            matched |= lo <= c && c <= hi;
            i += 3;
        } else {
            matched |= pattern[i] == c;
            i += 1;
        }
    }

    if i >= pattern.len() {
        return None;
    }
    Some((matched != negate, i + 1))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_literal() {
        assert!(glob_match("ns:v1:filter-options", "ns:v1:filter-options"));
        assert!(!glob_match("ns:v1:filter-options", "ns:v1:filter-option"));
    }

    #[test]
    fn test_star() {
        assert!(glob_match("ns:v1:paginated:*", "ns:v1:paginated:abcd1234"));
        assert!(!glob_match("ns:v1:paginated:*", "ns:v1:filter-options"));
        assert!(glob_match("*", ""));
        assert!(glob_match("ns:*:count:*", "ns:v2:count:ff"));
        assert!(glob_match("a*b*c", "axxbyyc"));
        assert!(!glob_match("a*b*c", "axxbyy"));
    }

    #[test]
    fn test_question_mark() {
        assert!(glob_match("v?", "v1"));
        assert!(!glob_match("v?", "v"));
    }

    #[test]
    fn test_classes() {
        assert!(glob_match("v[12]", "v2"));
        assert!(!glob_match("v[12]", "v3"));
        assert!(glob_match("v[^12]", "v3"));
        assert!(glob_match("v[0-9]", "v7"));
        assert!(!glob_match("v[0-9]", "vx"));
    }

    #[test]
    fn test_escape() {
        assert!(glob_match(r"a\*b", "a*b"));
        assert!(!glob_match(r"a\*b", "axb"));
    }
}
