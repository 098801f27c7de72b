//! Lenient parsing of the model's structured reply.

use std::sync::OnceLock;
use regex::Regex;
use rhesus_common::AiResponse;

fn json_object_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    // Greedy: first '{' through last '}', so fenced or chatty replies still parse.
    RE.get_or_init(|| Regex::new(r"\{[\s\S]*\}").expect("valid regex"))
}

/// Parse a raw model reply into an [`AiResponse`].
///
/// Anything that does not contain a parseable JSON object is treated as
/// plain prose with no tool calls.
pub fn parse_ai_response(raw: &str) -> AiResponse {
    let parsed = json_object_re()
        .find(raw)
        .ok_or_else(|| "no JSON object found in response".to_string())
        .and_then(|m| serde_json::from_str::<AiResponse>(m.as_str()).map_err(|e| e.to_string()));

    match parsed {
        Ok(resp) => resp,
        Err(reason) => {
            tracing::warn!(%reason, "Could not parse AI response as JSON, treating as plain prose");
            AiResponse::prose(raw)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rhesus_common::ContentType;

    #[test]
    fn test_parses_bare_json() {
        let r = parse_ai_response(r#"{"prose":"Here is 6M0J.","tool_calls":[{"type":"pdb_viewer","data":{"pdbId":"6M0J"}}]}"#);
        assert_eq!(r.prose, "Here is 6M0J.");
        assert_eq!(r.tool_calls[0].content_type, ContentType::PdbViewer);
        assert_eq!(r.tool_calls[0].data["pdbId"], "6M0J");
    }

    #[test]
    fn test_parses_fenced_json() {
        let raw = "Sure!\n```json\n{\"prose\": \"ok\", \"actions\": [{\"label\": \"More\", \"prompt\": \"Tell me more\"}]}\n```";
        let r = parse_ai_response(raw);
        assert_eq!(r.prose, "ok");
        assert_eq!(r.actions[0].label, "More");
    }

    #[test]
    fn test_plain_text_becomes_prose() {
        let r = parse_ai_response("Insulin is a peptide hormone.");
        assert_eq!(r.prose, "Insulin is a peptide hormone.");
        assert!(r.tool_calls.is_empty());
        assert!(r.actions.is_empty());
    }

    #[test]
    fn test_broken_json_becomes_prose() {
        let raw = "{\"prose\": \"unterminated";
        assert_eq!(parse_ai_response(raw).prose, raw);
    }
}
