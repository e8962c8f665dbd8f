use serde::{Deserialize, Serialize};

/// Question type as supplied by templates and API callers.
///
/// Unknown type strings are kept verbatim in `Other` rather than rejected;
/// they are rendered as open text questions downstream.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum QuestionKind {
    ShortText,
    SingleChoice,
    MultiChoice,
    Date,
    Other(String),
}

impl QuestionKind {
    pub fn as_str(&self) -> &str {
        match self {
            Self::ShortText => "short_text",
            Self::SingleChoice => "single_choice",
            Self::MultiChoice => "multi_choice",
            Self::Date => "date",
            Self::Other(raw) => raw.as_str(),
        }
    }

    /// Accepts the canonical names and the legacy form-builder aliases
    /// (`text`, `multipleChoice`, `checkbox`).
    pub fn parse(value: &str) -> Self {
        match value.trim() {
            "short_text" | "text" => Self::ShortText,
            "single_choice" | "multipleChoice" => Self::SingleChoice,
            "multi_choice" | "checkbox" => Self::MultiChoice,
            "date" => Self::Date,
            other => Self::Other(other.to_string()),
        }
    }

    pub fn is_choice(&self) -> bool {
        matches!(self, Self::SingleChoice | Self::MultiChoice)
    }
}

impl From<String> for QuestionKind {
    fn from(value: String) -> Self {
        Self::parse(&value)
    }
}

impl From<QuestionKind> for String {
    fn from(value: QuestionKind) -> Self {
        value.as_str().to_string()
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Question {
    pub text: String,
    #[serde(rename = "type")]
    pub kind: QuestionKind,
    #[serde(default)]
    pub options: Vec<String>,
    #[serde(default)]
    pub required: bool,
}

impl Question {
    pub fn new(text: impl Into<String>, kind: QuestionKind) -> Self {
        Self {
            text: text.into(),
            kind,
            options: Vec::new(),
            required: false,
        }
    }

    pub fn with_options<I, S>(mut self, options: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.options = options.into_iter().map(Into::into).collect();
        self
    }

    pub fn required(mut self, required: bool) -> Self {
        self.required = required;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn legacy_aliases_map_to_canonical_kinds() {
        assert_eq!(QuestionKind::parse("text"), QuestionKind::ShortText);
        assert_eq!(
            QuestionKind::parse("multipleChoice"),
            QuestionKind::SingleChoice
        );
        assert_eq!(QuestionKind::parse("checkbox"), QuestionKind::MultiChoice);
    }

    #[test]
    fn unknown_kind_is_preserved() {
        let kind = QuestionKind::parse("scale");
        assert_eq!(kind, QuestionKind::Other("scale".to_string()));
        assert_eq!(kind.as_str(), "scale");
        assert!(!kind.is_choice());
    }

    #[test]
    fn question_deserializes_with_defaults() {
        let question: Question =
            serde_json::from_value(json!({ "text": "Name", "type": "text" })).expect("question");
        assert_eq!(question.kind, QuestionKind::ShortText);
        assert!(question.options.is_empty());
        assert!(!question.required);
    }
}
