//! Rule-based sentence segmentation

use splfacts_dictionary::normalize::strip_percentages;
use splfacts_domain::traits::Segmenter;

/// Splits after `.`, `!` or `?` when whitespace follows, and at blank lines
///
/// Decimal points ("2.5 mg") never split because no whitespace follows
/// them. Bracketed percentages are stripped from every sentence.
#[derive(Debug, Clone, Copy, Default)]
pub struct RuleSegmenter;

impl Segmenter for RuleSegmenter {
    fn sentences(&self, text: &str) -> Vec<String> {
        let mut out = Vec::new();
        let mut current = String::new();
        let mut chars = text.chars().peekable();

        while let Some(c) = chars.next() {
            current.push(c);
            let next = chars.peek().copied();

            let terminal = matches!(c, '.' | '!' | '?') && next.is_none_or(char::is_whitespace);
            let blank_line = c == '\n' && next == Some('\n');

            if terminal || blank_line {
                push_sentence(&mut out, &current);
                current.clear();
            }
        }
        push_sentence(&mut out, &current);
        out
    }
}

fn push_sentence(out: &mut Vec<String>, raw: &str) {
    let sentence = strip_percentages(raw.trim());
    if !sentence.is_empty() {
        out.push(sentence);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_splits_on_terminal_punctuation() {
        let sentences = RuleSegmenter.sentences("Rash occurred. Was it severe? Yes!  Nausea too");
        assert_eq!(sentences, vec!["Rash occurred.", "Was it severe?", "Yes!", "Nausea too"]);
    }

    #[test]
    fn test_decimals_and_percentages() {
        let sentences = RuleSegmenter.sentences("Headache (12.5%) at 2.5 mg.\n\nDizziness (3%)");
        assert_eq!(sentences, vec!["Headache at 2.5 mg.", "Dizziness"]);
    }

    #[test]
    fn test_blank_text_has_no_sentences() {
        assert!(RuleSegmenter.sentences("").is_empty());
        assert!(RuleSegmenter.sentences("  \n\n ").is_empty());
    }
}
