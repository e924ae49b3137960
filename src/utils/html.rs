/// Sanitizes author-supplied quiz text (titles, prompts, option labels).
///
/// Whitelist based: harmless formatting such as `<b>` or `<p>` survives, while
/// `<script>`/`<iframe>` (including their content) and event-handler attributes
/// are stripped. Quiz text is rendered as HTML by the frontend, so this runs
/// once on write instead of on every read.
pub fn clean_html(input: &str) -> String {
    ammonia::clean(input)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_clean_html_keeps_formatting() {
        assert_eq!(clean_html("<p>What is <b>2 + 2</b>?</p>"), "<p>What is <b>2 + 2</b>?</p>");
    }

    #[test]
    fn test_clean_html_drops_event_handlers() {
        assert_eq!(clean_html(r#"<b onclick="steal()">x</b>"#), "<b>x</b>");
    }
}
