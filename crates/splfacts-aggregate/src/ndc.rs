//! National Drug Code normalization

/// Normalize a hyphenated NDC to its 9-digit labeler+product form.
///
/// A 4-digit labeler is left-padded with a zero; the package segment is
/// dropped. Only the 4-4 and 5-4 layouts normalize, anything else is `None`.
pub fn normalize_ndc(raw: &str) -> Option<String> {
    let mut parts = raw.trim().split('-');
    let labeler = parts.next()?;
    let product = parts.next()?;
    if !is_digits(labeler) || !is_digits(product) || product.len() != 4 {
        return None;
    }
    match labeler.len() {
        4 => Some(format!("0{labeler}{product}")),
        5 => Some(format!("{labeler}{product}")),
        _ => None,
    }
}

fn is_digits(s: &str) -> bool {
    !s.is_empty() && s.bytes().all(|b| b.is_ascii_digit())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_four_digit_labeler_is_padded() {
        assert_eq!(normalize_ndc("0002-3227-30").as_deref(), Some("000023227"));
    }

    #[test]
    fn test_five_digit_labeler() {
        assert_eq!(normalize_ndc("50090-1234-0").as_deref(), Some("500901234"));
        assert_eq!(normalize_ndc(" 50090-1234 ").as_deref(), Some("500901234"));
    }

    #[test]
    fn test_other_layouts_do_not_normalize() {
        assert_eq!(normalize_ndc("50090-123-01"), None);
        assert_eq!(normalize_ndc("500901234"), None);
        assert_eq!(normalize_ndc("abcd-1234-00"), None);
        assert_eq!(normalize_ndc(""), None);
    }
}
