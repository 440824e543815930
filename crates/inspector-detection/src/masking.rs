//! Sensitive-value masking (spec §4.6 step 3).

/// Mask a matched string: length ≤4 becomes all `*`; longer strings keep
/// the first two and last two characters, replacing the interior with
/// `*` (spec scenario 3: `"hunter2"` (len 7) → `"hu***r2"`).
pub fn mask(value: &str) -> String {
    let chars: Vec<char> = value.chars().collect();
    let len = chars.len();
    if len <= 4 {
        return "*".repeat(len);
    }
    let head: String = chars[..2].iter().collect();
    let tail: String = chars[len - 2..].iter().collect();
    format!("{head}{}{tail}", "*".repeat(len - 4))
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn short_strings_fully_masked() {
        assert_eq!(mask("abcd"), "****");
        assert_eq!(mask("ab"), "**");
        assert_eq!(mask(""), "");
    }

    #[test]
    fn long_strings_keep_head_and_tail() {
        assert_eq!(mask("hunter2"), "hu***r2");
        assert_eq!(mask("abcd1234567890"), "ab**********90");
    }

    proptest! {
        /// `mask` never changes the visible length of the value (spec §4.6:
        /// masking must not leak length information beyond what the
        /// original string already revealed).
        #[test]
        fn mask_preserves_char_count(s in "[a-zA-Z0-9]{0,40}") {
            let original_len = s.chars().count();
            prop_assert_eq!(mask(&s).chars().count(), original_len);
        }

        /// For inputs longer than 4 characters, the first two and last two
        /// characters survive masking unchanged.
        #[test]
        fn mask_keeps_head_and_tail_for_long_inputs(s in "[a-zA-Z0-9]{5,40}") {
            let chars: Vec<char> = s.chars().collect();
            let masked = mask(&s);
            let masked_chars: Vec<char> = masked.chars().collect();
            prop_assert_eq!(&masked_chars[..2], &chars[..2]);
            let len = chars.len();
            prop_assert_eq!(&masked_chars[len - 2..], &chars[len - 2..]);
        }

        /// Inputs of length 4 or less are masked to all asterisks: no
        /// fragment of a short secret is ever recoverable from the output.
        #[test]
        fn mask_fully_hides_short_inputs(s in "[a-zA-Z0-9]{0,4}") {
            let masked = mask(&s);
            prop_assert!(masked.chars().all(|c| c == '*'));
        }
    }
}
