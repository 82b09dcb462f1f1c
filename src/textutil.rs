//! String helpers shared by the converters and the update resolver.

/// Case-folded Levenshtein distance (single-character insert/delete/substitute).
///
/// Runs in O(len(a) * len(b)) time with a single rolling row over the shorter
/// string, so bulk similarity scans stay cheap on long dialogue lines.
pub fn edit_distance(a: &str, b: &str) -> usize {
    let a: Vec<char> = a.to_lowercase().chars().collect();
    let b: Vec<char> = b.to_lowercase().chars().collect();
    let (long, short) = if a.len() >= b.len() { (&a, &b) } else { (&b, &a) };
    let mut costs: Vec<usize> = (0..=short.len()).collect();
    for i in 1..=long.len() {
        let mut nw = costs[0];
        costs[0] = i;
        for j in 1..=short.len() {
            let subst = if long[i - 1] == short[j - 1] { nw } else { nw + 1 };
            let cj = (1 + costs[j].min(costs[j - 1])).min(subst);
            nw = costs[j];
            costs[j] = cj;
        }
    }
    costs[short.len()]
}

/// Normalized similarity in `[0, 1]`: `1 - distance / max(len)`.
///
/// Two empty strings are identical, hence similarity 1.0. Case folding can
/// change character counts for a handful of code points, so the result is
/// clamped rather than trusted to stay in range.
pub fn similarity(a: &str, b: &str) -> f32 {
    let max = a.chars().count().max(b.chars().count());
    if max == 0 {
        return 1.0;
    }
    let dist = edit_distance(a, b);
    (1.0 - dist as f32 / max as f32).clamp(0.0, 1.0)
}

/// Escape text for substitution into a Ren'Py string literal.
pub fn escape_renpy(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for ch in text.chars() {
        match ch {
            '\\' => out.push_str("\\\\"),
            '"' => out.push_str("\\\""),
            '\n' => out.push_str("\\n"),
            '\t' => out.push_str("\\t"),
            _ => out.push(ch),
        }
    }
    out
}

/// Inverse of [`escape_renpy`]: turn string-literal content back into plain
/// text. Unknown escapes pass through untouched.
pub fn unescape_renpy(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut chars = text.chars();
    while let Some(ch) = chars.next() {
        if ch == '\\' {
            match chars.next() {
                Some('\\') => out.push('\\'),
                Some('"') => out.push('"'),
                Some('n') => out.push('\n'),
                Some('t') => out.push('\t'),
                Some(other) => {
                    out.push('\\');
                    out.push(other);
                }
                None => out.push('\\'),
            }
        } else {
            out.push(ch);
        }
    }
    out
}
