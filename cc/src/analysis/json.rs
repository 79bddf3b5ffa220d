//! Locating the JSON payload inside a model reply

use std::sync::LazyLock;

use regex::Regex;

static JSON_FENCE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?s)```json(.*?)```").expect("valid json fence pattern"));

/// Return the JSON text a model reply carries
///
/// Models often wrap their answer in a ```` ```json ```` fence, sometimes
/// with prose around it. The body of the first such fence is returned;
/// without a (closed) fence the whole reply is returned, trimmed.
pub fn extract_json_from_text(text: &str) -> &str {
    match JSON_FENCE.captures(text).and_then(|caps| caps.get(1)) {
        Some(body) => body.as_str().trim(),
        None => text.trim(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_plain_json_is_trimmed() {
        assert_eq!(extract_json_from_text("  {\"a\": 1}\n"), "{\"a\": 1}");
    }

    #[test]
    fn test_fenced_json_is_unwrapped() {
        let reply = "Here you go:\n```json\n{\"a\": 1}\n```\nAnything else?";
        assert_eq!(extract_json_from_text(reply), "{\"a\": 1}");
    }

    #[test]
    fn test_first_fence_wins() {
        let reply = "```json\n[1]\n```\n```json\n[2]\n```";
        assert_eq!(extract_json_from_text(reply), "[1]");
    }

    #[test]
    fn test_unclosed_fence_returns_everything() {
        let reply = "```json\n{\"a\": 1}";
        assert_eq!(extract_json_from_text(reply), reply);
    }

    #[test]
    fn test_plain_fence_is_not_unwrapped() {
        let reply = "```\n{\"a\": 1}\n```";
        assert_eq!(extract_json_from_text(reply), reply);
    }
}
