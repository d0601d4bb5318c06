//! Fixed-slot prompt template.
//!
//! Templates are parsed once when configuration loads. Only three named slots
//! are recognised; anything else inside braces is rejected up front, so
//! rendering is infallible. Literal braces are written as `{{` and `}}`.

use crate::ConfigError;

/// A named placeholder in a prompt template.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PromptSlot {
    ClientLabel,
    DataSummary,
    KpiValues,
}

impl PromptSlot {
    pub const ALL: [PromptSlot; 3] = [
        PromptSlot::ClientLabel,
        PromptSlot::DataSummary,
        PromptSlot::KpiValues,
    ];

    #[must_use]
    pub fn name(self) -> &'static str {
        match self {
            PromptSlot::ClientLabel => "client_label",
            PromptSlot::DataSummary => "data_summary",
            PromptSlot::KpiValues => "kpi_values",
        }
    }

    fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|slot| slot.name() == name)
    }
}

/// Values substituted into a [`PromptTemplate`].
#[derive(Debug, Clone, Copy)]
pub struct PromptValues<'a> {
    pub client_label: &'a str,
    pub data_summary: &'a str,
    pub kpi_values: &'a str,
}

impl PromptValues<'_> {
    fn get(&self, slot: PromptSlot) -> &str {
        match slot {
            PromptSlot::ClientLabel => self.client_label,
            PromptSlot::DataSummary => self.data_summary,
            PromptSlot::KpiValues => self.kpi_values,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Segment {
    Literal(String),
    Slot(PromptSlot),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PromptTemplate {
    segments: Vec<Segment>,
}

const DEFAULT_INTRO: &str = "CAMPAIGN OVERVIEW - ";

const DEFAULT_KPI_HEADER: &str = "\n\nKPI VALUES:\n";

const DEFAULT_INSTRUCTIONS: &str = r#"

ANALYSIS TASK:
You are an expert TV media buying analyst. Analyze the campaign data above and provide actionable insights for media buyers.

Respond with ONLY valid JSON in this exact format. No markdown or additional text.

{
  "executive_summary": "2-3 sentence campaign assessment focusing on key opportunities and issues",
  "key_findings": ["Specific, quantified observation"],
  "recommendations": ["Specific actionable recommendation with projected impact"]
}

Rules:
1. Use exact station/daypart names from the tables above
2. Provide specific, quantified recommendations
3. Focus on actionable budget allocation decisions"#;

impl Default for PromptTemplate {
    fn default() -> Self {
        Self {
            segments: vec![
                Segment::Literal(DEFAULT_INTRO.to_string()),
                Segment::Slot(PromptSlot::ClientLabel),
                Segment::Literal("\n".to_string()),
                Segment::Slot(PromptSlot::DataSummary),
                Segment::Literal(DEFAULT_KPI_HEADER.to_string()),
                Segment::Slot(PromptSlot::KpiValues),
                Segment::Literal(DEFAULT_INSTRUCTIONS.to_string()),
            ],
        }
    }
}

impl PromptTemplate {
    /// Parse and validate template text.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Validation`] when the template names an unknown
    /// slot, leaves a brace unmatched, or omits the `{kpi_values}` slot.
    pub fn parse(text: &str) -> Result<Self, ConfigError> {
        let mut segments = Vec::new();
        let mut literal = String::new();
        let mut chars = text.char_indices().peekable();

        while let Some((pos, c)) = chars.next() {
            match c {
                '{' if chars.peek().is_some_and(|&(_, n)| n == '{') => {
                    chars.next();
                    literal.push('{');
                }
                '}' if chars.peek().is_some_and(|&(_, n)| n == '}') => {
                    chars.next();
                    literal.push('}');
                }
                '{' => {
                    let mut name = String::new();
                    let mut closed = false;
                    for (_, n) in chars.by_ref() {
                        if n == '}' {
                            closed = true;
                            break;
                        }
                        name.push(n);
                    }
                    if !closed {
                        return Err(ConfigError::Validation(format!(
                            "prompt template has an unclosed '{{' at byte {pos}"
                        )));
                    }
                    let slot = PromptSlot::from_name(name.trim()).ok_or_else(|| {
                        ConfigError::Validation(format!(
                            "prompt template uses unknown slot '{{{name}}}'; \
                             recognised slots are {{client_label}}, {{data_summary}}, {{kpi_values}}"
                        ))
                    })?;
                    if !literal.is_empty() {
                        segments.push(Segment::Literal(std::mem::take(&mut literal)));
                    }
                    segments.push(Segment::Slot(slot));
                }
                '}' => {
                    return Err(ConfigError::Validation(format!(
                        "prompt template has an unmatched '}}' at byte {pos}"
                    )));
                }
                other => literal.push(other),
            }
        }
        if !literal.is_empty() {
            segments.push(Segment::Literal(literal));
        }

        let template = Self { segments };
        if !template.uses(PromptSlot::KpiValues) {
            return Err(ConfigError::Validation(
                "prompt template must include the {kpi_values} slot".to_string(),
            ));
        }
        Ok(template)
    }

    /// Whether `slot` appears at least once in the template.
    #[must_use]
    pub fn uses(&self, slot: PromptSlot) -> bool {
        self.segments
            .iter()
            .any(|segment| matches!(segment, Segment::Slot(s) if *s == slot))
    }

    /// Substitute `values` into the template.
    #[must_use]
    pub fn render(&self, values: &PromptValues<'_>) -> String {
        let mut out = String::new();
        for segment in &self.segments {
            match segment {
                Segment::Literal(text) => out.push_str(text),
                Segment::Slot(slot) => out.push_str(values.get(*slot)),
            }
        }
        out
    }
}
