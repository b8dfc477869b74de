//! Pure normalization for annotation labels (§9, §10.6). `normalize()` is
//! paired with equality at call sites; it is never embedded into a storage
//! key, so the original label's display form survives round-trips.

const CIRCLED_DIGITS: &[(char, &str)] = &[
    ('①', "1"),
    ('②', "2"),
    ('③', "3"),
    ('④', "4"),
    ('⑤', "5"),
    ('⑥', "6"),
    ('⑦', "7"),
    ('⑧', "8"),
    ('⑨', "9"),
    ('⑩', "10"),
    ('⑪', "11"),
    ('⑫', "12"),
    ('⑬', "13"),
    ('⑭', "14"),
    ('⑮', "15"),
    ('⑯', "16"),
    ('⑰', "17"),
    ('⑱', "18"),
    ('⑲', "19"),
    ('⑳', "20"),
];

const FULLWIDTH_DIGIT_BASE: u32 = '\u{FF10}' as u32; // '0' fullwidth
const ASCII_DIGIT_BASE: u32 = '0' as u32;

/// Fold digit-width and circled-digit variants to a canonical ASCII-digit
/// form so `"注1"`, `"注①"`, and a fullwidth `"注1"` all compare equal.
/// Everything else (the label prefix, spacing) passes through unchanged.
pub fn normalize(label: &str) -> String {
    let mut out = String::with_capacity(label.len());
    for ch in label.chars() {
        if let Some((_, digits)) = CIRCLED_DIGITS.iter().find(|(c, _)| *c == ch) {
            out.push_str(digits);
            continue;
        }
        let code = ch as u32;
        if (FULLWIDTH_DIGIT_BASE..=FULLWIDTH_DIGIT_BASE + 9).contains(&code) {
            let ascii = (code - FULLWIDTH_DIGIT_BASE + ASCII_DIGIT_BASE) as u8 as char;
            out.push(ascii);
            continue;
        }
        out.push(ch);
    }
    out
}

/// True when two labels are equal once normalized (the second rung of the
/// annotation lookup precedence order in C6).
pub fn normalized_eq(a: &str, b: &str) -> bool {
    normalize(a) == normalize(b)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn circled_digit_matches_ascii() {
        assert!(normalized_eq("注1", "注①"));
        assert!(normalized_eq("注20", "注⑳"));
    }

    #[test]
    fn fullwidth_digit_matches_ascii() {
        assert!(normalized_eq("注1", "注\u{FF11}"));
    }

    #[test]
    fn distinct_labels_do_not_match() {
        assert!(!normalized_eq("注1", "注2"));
        assert!(!normalized_eq("注1", "方案A"));
    }

    #[test]
    fn all_observed_range_round_trips() {
        for n in 1..=20u32 {
            let circled = CIRCLED_DIGITS[(n - 1) as usize].0;
            let ascii_label = format!("注{}", n);
            let circled_label = format!("注{}", circled);
            assert!(
                normalized_eq(&ascii_label, &circled_label),
                "n={n} failed to normalize-match"
            );
        }
    }
}
