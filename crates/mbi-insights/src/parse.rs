//! Turns free-form model text into summary, findings and recommendations.
//!
//! Three strategies are tried in order: a JSON object (optionally wrapped in
//! markdown fences, tolerating trailing commas), then SUMMARY / KEY INSIGHTS /
//! RECOMMENDATIONS section headings, then the whole text as the summary.

use serde_json::Value;

/// The structured content extracted from one model response.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ParsedInsights {
    pub summary: String,
    pub key_findings: Vec<String>,
    pub recommendations: Vec<String>,
}

/// Which strategy produced a [`ParsedInsights`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParseStrategy {
    Json,
    Headings,
    PlainText,
}

/// Parse `text`, never failing: the last resort keeps the whole text.
#[must_use]
pub fn parse_response(text: &str) -> (ParsedInsights, ParseStrategy) {
    let cleaned = strip_fences(text);

    if let Some(parsed) = parse_json(&cleaned) {
        return (parsed, ParseStrategy::Json);
    }
    if let Some(parsed) = parse_headings(&cleaned) {
        return (parsed, ParseStrategy::Headings);
    }
    (
        ParsedInsights {
            summary: cleaned.trim().to_string(),
            ..ParsedInsights::default()
        },
        ParseStrategy::PlainText,
    )
}

fn strip_fences(text: &str) -> String {
    text.replace("```json", "").replace("```", "")
}

// ---------------------------------------------------------------------------
// JSON
// ---------------------------------------------------------------------------

/// The first balanced `{...}` in `text`, ignoring braces inside strings.
fn outermost_object(text: &str) -> Option<&str> {
    let start = text.find('{')?;
    let mut depth = 0usize;
    let mut in_string = false;
    let mut escaped = false;

    for (offset, c) in text[start..].char_indices() {
        if in_string {
            match c {
                _ if escaped => escaped = false,
                '\\' => escaped = true,
                '"' => in_string = false,
                _ => {}
            }
            continue;
        }
        match c {
            '"' => in_string = true,
            '{' => depth += 1,
            '}' => {
                depth -= 1;
                if depth == 0 {
                    return Some(&text[start..=start + offset]);
                }
            }
            _ => {}
        }
    }
    None
}

/// Drop commas that directly precede a closing `}` or `]`.
fn remove_trailing_commas(json: &str) -> String {
    let chars: Vec<char> = json.chars().collect();
    let mut out = String::with_capacity(json.len());
    let mut in_string = false;
    let mut escaped = false;

    for (i, &c) in chars.iter().enumerate() {
        if in_string {
            match c {
                _ if escaped => escaped = false,
                '\\' => escaped = true,
                '"' => in_string = false,
                _ => {}
            }
        } else if c == '"' {
            in_string = true;
        } else if c == ',' {
            let next = chars[i + 1..].iter().find(|n| !n.is_whitespace());
            if matches!(next, Some('}' | ']')) {
                continue;
            }
        }
        out.push(c);
    }
    out
}

fn parse_json(text: &str) -> Option<ParsedInsights> {
    let object = outermost_object(text)?;
    let value: Value = serde_json::from_str(object)
        .or_else(|_| serde_json::from_str(&remove_trailing_commas(object)))
        .ok()?;

    let parsed = ParsedInsights {
        summary: summary_field(&value).unwrap_or_default(),
        key_findings: list_field(&value, &["key_findings", "key_insights", "findings"]),
        recommendations: list_field(&value, &["recommendations"]),
    };
    if parsed.summary.is_empty()
        && parsed.key_findings.is_empty()
        && parsed.recommendations.is_empty()
    {
        tracing::debug!("JSON response had none of the expected fields");
        return None;
    }
    Some(parsed)
}

fn summary_field(value: &Value) -> Option<String> {
    let summary = value.get("executive_summary").or_else(|| value.get("summary"))?;
    let text = match summary {
        Value::String(s) => s.clone(),
        Value::Object(_) => summary.get("summary")?.as_str()?.to_string(),
        _ => return None,
    };
    Some(text.trim().to_string())
}

/// Text fields tried, in order, when a list item is an object.
const ITEM_TEXT_KEYS: [&str; 5] = ["recommendation", "finding", "insight", "summary", "text"];

fn item_text(item: &Value) -> Option<String> {
    let text = match item {
        Value::String(s) => s.clone(),
        Value::Object(map) => ITEM_TEXT_KEYS
            .iter()
            .find_map(|k| map.get(*k).and_then(Value::as_str))
            .map_or_else(|| item.to_string(), str::to_string),
        Value::Null => return None,
        other => other.to_string(),
    };
    let text = text.trim();
    (!text.is_empty()).then(|| text.to_string())
}

fn list_field(value: &Value, keys: &[&str]) -> Vec<String> {
    keys.iter()
        .find_map(|k| value.get(*k).and_then(Value::as_array))
        .map(|items| items.iter().filter_map(item_text).collect())
        .unwrap_or_default()
}

// ---------------------------------------------------------------------------
// Section headings
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Section {
    Summary,
    Findings,
    Recommendations,
}

/// Recognise a heading line such as `## KEY INSIGHTS:` or `**Summary**`.
fn heading(line: &str) -> Option<Section> {
    let bare = line
        .trim()
        .trim_start_matches('#')
        .trim_matches(|c: char| c == '*' || c == '_' || c == ':' || c.is_whitespace())
        .to_ascii_uppercase();
    match bare.as_str() {
        "SUMMARY" | "EXECUTIVE SUMMARY" => Some(Section::Summary),
        "KEY INSIGHTS" | "KEY FINDINGS" => Some(Section::Findings),
        "RECOMMENDATIONS" => Some(Section::Recommendations),
        _ => None,
    }
}

/// Strip a leading `-`, `*`, `•` or `1.` marker. A numbered marker must be
/// followed by whitespace, so `3.5x ROAS` keeps its number.
fn strip_bullet(line: &str) -> &str {
    let line = line.trim();
    if let Some(rest) = line
        .strip_prefix("- ")
        .or_else(|| line.strip_prefix("* "))
        .or_else(|| line.strip_prefix("• "))
    {
        return rest.trim();
    }
    let digits = line.chars().take_while(char::is_ascii_digit).count();
    if digits > 0 {
        let after = &line[digits..];
        if let Some(rest) = after
            .strip_prefix('.')
            .or_else(|| after.strip_prefix(')'))
        {
            if rest.is_empty() || rest.starts_with(char::is_whitespace) {
                return rest.trim();
            }
        }
    }
    line
}

fn parse_headings(text: &str) -> Option<ParsedInsights> {
    let mut parsed = ParsedInsights::default();
    let mut summary_lines: Vec<&str> = Vec::new();
    let mut current: Option<Section> = None;
    let mut seen_heading = false;

    for line in text.lines() {
        if let Some(section) = heading(line) {
            current = Some(section);
            seen_heading = true;
            continue;
        }
        let content = strip_bullet(line);
        if content.is_empty() {
            continue;
        }
        match current {
            Some(Section::Summary) => summary_lines.push(content),
            Some(Section::Findings) => parsed.key_findings.push(content.to_string()),
            Some(Section::Recommendations) => parsed.recommendations.push(content.to_string()),
            None => {}
        }
    }

    if !seen_heading {
        return None;
    }
    parsed.summary = summary_lines.join(" ");
    Some(parsed)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_plain_json() {
        let text = r#"{"executive_summary": "Strong month.", "key_findings": ["ESPN leads"], "recommendations": ["Shift budget to PRIME"]}"#;
        let (parsed, strategy) = parse_response(text);
        assert_eq!(strategy, ParseStrategy::Json);
        assert_eq!(parsed.summary, "Strong month.");
        assert_eq!(parsed.key_findings, vec!["ESPN leads"]);
        assert_eq!(parsed.recommendations, vec!["Shift budget to PRIME"]);
    }

    #[test]
    fn strips_fences_and_surrounding_prose() {
        let text = "Here you go:\n```json\n{\"executive_summary\": \"ok\", \"key_findings\": []}\n```\nThanks!";
        let (parsed, strategy) = parse_response(text);
        assert_eq!(strategy, ParseStrategy::Json);
        assert_eq!(parsed.summary, "ok");
    }

    #[test]
    fn repairs_trailing_commas() {
        let text = r#"{"executive_summary": "ok", "recommendations": ["a", "b",],}"#;
        let (parsed, strategy) = parse_response(text);
        assert_eq!(strategy, ParseStrategy::Json);
        assert_eq!(parsed.recommendations, vec!["a", "b"]);
    }

    #[test]
    fn braces_and_commas_inside_strings_are_preserved() {
        let text = r#"{"executive_summary": "use {PRIME}, not LATE,]", "key_findings": []}"#;
        let (parsed, _) = parse_response(text);
        assert_eq!(parsed.summary, "use {PRIME}, not LATE,]");
    }

    #[test]
    fn accepts_nested_summary_and_object_items() {
        let text = r#"{
            "executive_summary": {"summary": "Nested", "confidence": "High"},
            "recommendations": [{"priority": 1, "recommendation": "Scale ESPN"}]
        }"#;
        let (parsed, _) = parse_response(text);
        assert_eq!(parsed.summary, "Nested");
        assert_eq!(parsed.recommendations, vec!["Scale ESPN"]);
    }

    #[test]
    fn falls_back_to_section_headings() {
        let text = "## SUMMARY\nSolid results\noverall.\n\n**KEY INSIGHTS:**\n- ESPN drives visits\n- LATE is weak\n\nRECOMMENDATIONS\n1. Move 10 spots to PRIME\n2) Test CNN";
        let (parsed, strategy) = parse_response(text);
        assert_eq!(strategy, ParseStrategy::Headings);
        assert_eq!(parsed.summary, "Solid results overall.");
        assert_eq!(parsed.key_findings, vec!["ESPN drives visits", "LATE is weak"]);
        assert_eq!(parsed.recommendations, vec!["Move 10 spots to PRIME", "Test CNN"]);
    }

    #[test]
    fn unstructured_text_becomes_summary() {
        let (parsed, strategy) = parse_response("  The campaign did fine.  ");
        assert_eq!(strategy, ParseStrategy::PlainText);
        assert_eq!(parsed.summary, "The campaign did fine.");
        assert!(parsed.key_findings.is_empty());
    }

    #[test]
    fn json_without_known_fields_is_not_accepted() {
        let (parsed, strategy) = parse_response(r#"{"foo": 1}"#);
        assert_eq!(strategy, ParseStrategy::PlainText);
        assert_eq!(parsed.summary, r#"{"foo": 1}"#);
    }

    #[test]
    fn leading_decimal_is_not_a_list_marker() {
        let text = "KEY FINDINGS\n3.5x ROAS on PRIME is strong\n12) LATE trails\n2.\n\nRECOMMENDATIONS\n1.2x is the floor for CNN";
        let (parsed, strategy) = parse_response(text);
        assert_eq!(strategy, ParseStrategy::Headings);
        assert_eq!(
            parsed.key_findings,
            vec!["3.5x ROAS on PRIME is strong", "LATE trails"]
        );
        assert_eq!(parsed.recommendations, vec!["1.2x is the floor for CNN"]);
    }
}
