use serde::Serialize;

use crate::parse::ParsedInsights;

/// Where an [`InsightReport`]'s content came from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum InsightOrigin {
    Generated { model: String },
    Unavailable { reason: String },
}

/// Narrative insights for one analysis. Downstream stages treat the text as
/// opaque.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct InsightReport {
    pub summary: String,
    pub key_findings: Vec<String>,
    pub recommendations: Vec<String>,
    pub raw_text: Option<String>,
    pub origin: InsightOrigin,
}

impl InsightReport {
    #[must_use]
    pub fn generated(model: &str, parsed: ParsedInsights, raw_text: String) -> Self {
        Self {
            summary: parsed.summary,
            key_findings: parsed.key_findings,
            recommendations: parsed.recommendations,
            raw_text: Some(raw_text),
            origin: InsightOrigin::Generated {
                model: model.to_string(),
            },
        }
    }

    /// Placeholder used when the AI service could not be reached or answered
    /// with nothing usable.
    #[must_use]
    pub fn unavailable(reason: impl Into<String>) -> Self {
        let reason = reason.into();
        Self {
            summary: format!("AI insights unavailable: {reason}"),
            key_findings: Vec::new(),
            recommendations: Vec::new(),
            raw_text: None,
            origin: InsightOrigin::Unavailable { reason },
        }
    }

    #[must_use]
    pub fn is_available(&self) -> bool {
        matches!(self.origin, InsightOrigin::Generated { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unavailable_report_carries_reason() {
        let report = InsightReport::unavailable("timeout");
        assert!(!report.is_available());
        assert_eq!(report.summary, "AI insights unavailable: timeout");
        let json = serde_json::to_value(&report).unwrap();
        assert_eq!(json["origin"]["status"], "unavailable");
        assert_eq!(json["origin"]["reason"], "timeout");
        assert!(json["raw_text"].is_null());
    }

    #[test]
    fn generated_report_keeps_model_and_raw_text() {
        let parsed = ParsedInsights {
            summary: "ok".to_string(),
            key_findings: vec!["a".to_string()],
            recommendations: Vec::new(),
        };
        let report = InsightReport::generated("gemini-2.0-flash", parsed, "{raw}".to_string());
        assert!(report.is_available());
        assert_eq!(
            report.origin,
            InsightOrigin::Generated {
                model: "gemini-2.0-flash".to_string()
            }
        );
        assert_eq!(report.raw_text.as_deref(), Some("{raw}"));
    }
}
