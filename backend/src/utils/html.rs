// src/utils/html.rs

use ammonia;

/// Cleans a user supplied profile description.
///
/// Safe inline markup (<b>, <p>, links) survives; script tags, event handler
/// attributes and the like are stripped. Whitespace-only input collapses to
/// `None` so an empty description is stored as NULL.
pub fn clean_description(input: &str) -> Option<String> {
    let cleaned = ammonia::clean(input.trim());
    if cleaned.trim().is_empty() {
        None
    } else {
        Some(cleaned)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn strips_scripts() {
        let cleaned = clean_description("<b>hi</b><script>alert(1)</script>").unwrap();
        assert_eq!(cleaned, "<b>hi</b>");
    }

    #[test]
    fn blank_becomes_none() {
        assert_eq!(clean_description("   "), None);
        assert_eq!(clean_description("<script>x</script>"), None);
    }
}
