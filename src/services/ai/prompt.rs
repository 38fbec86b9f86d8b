use std::sync::OnceLock;

use regex::Regex;
use serde_json::Value;

use crate::error::{SyncError, SyncResult};
use crate::model::tree::{FlatMap, LocaleTree};

pub fn translation_prompt(content: &FlatMap, target_lang: &str) -> String {
    format!(
        "Translate the values of the following JSON object into {target_lang}. \
         Keep every key exactly as written, including the dots inside keys, and keep \
         the JSON structure unchanged. Translate only the values, using natural, \
         culturally appropriate wording for {target_lang}. Reply with the JSON object only.\n\n{}",
        pretty(&Value::Object(content.clone()))
    )
}

pub fn validation_prompt(original: &LocaleTree, translated: &LocaleTree, target_lang: &str) -> String {
    format!(
        "Review this translation into {target_lang}. Check that the meaning is kept and \
         that the wording is natural for {target_lang}. Answer 'true' if the translation \
         is correct, or 'false' if there are problems.\n\nOriginal:\n{}\n\nTranslation:\n{}",
        pretty(&Value::Object(original.clone())),
        pretty(&Value::Object(translated.clone()))
    )
}

fn pretty(value: &Value) -> String {
    serde_json::to_string_pretty(value).unwrap_or_default()
}

fn object_span_re() -> Result<&'static Regex, regex::Error> {
    static RE: OnceLock<Regex> = OnceLock::new();
    if let Some(re) = RE.get() {
        return Ok(re);
    }
    let re = Regex::new(r"\{[\s\S]*\}")?;
    Ok(RE.get_or_init(|| re))
}

/// Pulls the outermost `{ ... }` span out of a model reply and parses it.
pub fn parse_translation(provider: &str, reply: &str) -> SyncResult<FlatMap> {
    let re = object_span_re().map_err(|e| SyncError::service_fatal(provider, e.to_string()))?;

    let span = re
        .find(reply)
        .ok_or_else(|| SyncError::service_fatal(provider, "no JSON object found in the response"))?;

    match serde_json::from_str::<Value>(span.as_str()) {
        Ok(Value::Object(map)) => Ok(map),
        Ok(_) | Err(_) => Err(SyncError::service_fatal(
            provider,
            "failed to parse the response as a JSON object",
        )),
    }
}

pub fn parse_validation(reply: &str) -> bool {
    reply.to_lowercase().contains("true")
}

/// Whitespace word count, used when a backend reports no usage.
pub fn estimate_tokens(text: &str) -> u64 {
    text.split_whitespace().count() as u64
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn extracts_json_from_chatter() {
        let reply = "Sure! Here it is:\n```json\n{\n  \"menu.open\": \"Ouvrir\"\n}\n```\nEnjoy.";
        let map = parse_translation("OpenAI", reply).unwrap();
        assert_eq!(map.get("menu.open"), Some(&json!("Ouvrir")));
    }

    #[test]
    fn reply_without_object_is_an_error() {
        let err = parse_translation("Claude", "I cannot do that.").unwrap_err();
        assert!(err.to_string().contains("no JSON object"));
        assert!(parse_translation("Claude", "{ broken").is_err());
    }

    #[test]
    fn object_pattern_is_compiled_once() {
        let first = object_span_re().unwrap();
        parse_translation("OpenAI", "{\"a\": \"b\"}").unwrap();
        assert!(std::ptr::eq(first, object_span_re().unwrap()));
    }

    #[test]
    fn validation_reply() {
        assert!(parse_validation("TRUE"));
        assert!(parse_validation("The translation is true to the source."));
        assert!(!parse_validation("false"));
    }

    #[test]
    fn prompt_carries_content_and_language() {
        let mut content = FlatMap::new();
        content.insert("a.b".into(), json!("Hello"));
        let prompt = translation_prompt(&content, "fr");
        assert!(prompt.contains("into fr"));
        assert!(prompt.contains("\"a.b\": \"Hello\""));
    }

    #[test]
    fn token_estimate_counts_words() {
        assert_eq!(estimate_tokens("one two  three\nfour"), 4);
    }
}
