use std::sync::OnceLock;

use serde::{Deserialize, Serialize};

use crate::DomainResult;
use crate::error::DomainError;
use crate::forms::FormSpec;
use crate::questions::{Question, QuestionKind};
use crate::util::non_blank;

pub const DEFAULT_TEMPLATE_ID: &str = "product-feedback";
pub const CUSTOMER_FALLBACK_NOUN: &str = "客戶";

const ORDER_ID_TOKEN: &str = "{orderId}";
const CUSTOMER_NAME_TOKEN: &str = "{customerName}";
const SALUTATION_PREFIX: &str = "親愛的";

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct FormTemplate {
    pub id: String,
    pub name: String,
    pub title: String,
    pub description: String,
    pub questions: Vec<Question>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TemplateSummary {
    pub id: String,
    pub name: String,
    pub title: String,
    pub description: String,
    pub question_count: usize,
    pub is_default: bool,
}

impl From<&FormTemplate> for TemplateSummary {
    fn from(template: &FormTemplate) -> Self {
        Self {
            id: template.id.clone(),
            name: template.name.clone(),
            title: template.title.clone(),
            description: template.description.clone(),
            question_count: template.questions.len(),
            is_default: template.id == DEFAULT_TEMPLATE_ID,
        }
    }
}

static CATALOG: OnceLock<Vec<FormTemplate>> = OnceLock::new();

pub fn catalog() -> &'static [FormTemplate] {
    CATALOG.get_or_init(build_catalog)
}

pub fn find_template(template_id: &str) -> Option<&'static FormTemplate> {
    catalog().iter().find(|template| template.id == template_id)
}

pub fn default_template() -> &'static FormTemplate {
    let templates = catalog();
    templates
        .iter()
        .find(|template| template.id == DEFAULT_TEMPLATE_ID)
        .unwrap_or(&templates[0])
}

/// Looks up the template (or the default) and fills in order-specific text.
pub fn resolve(
    template_id: Option<&str>,
    order_id: &str,
    customer_name: Option<&str>,
) -> DomainResult<FormSpec> {
    let template = match non_blank(template_id) {
        Some(id) => find_template(id).ok_or_else(|| DomainError::TemplateNotFound(id.to_string()))?,
        None => default_template(),
    };

    let customer_name = non_blank(customer_name);
    let (title, mut description) = substitute_placeholders(template, order_id, customer_name);
    if customer_name.is_none() {
        description = strip_salutation(&description, CUSTOMER_FALLBACK_NOUN);
    }

    Ok(FormSpec {
        title,
        description,
        questions: template.questions.clone(),
    })
}

/// Replaces the `{orderId}` and `{customerName}` tokens. A missing name is
/// replaced by the fallback noun; an empty title gets a generated one.
pub fn substitute_placeholders(
    template: &FormTemplate,
    order_id: &str,
    customer_name: Option<&str>,
) -> (String, String) {
    let name = customer_name.unwrap_or(CUSTOMER_FALLBACK_NOUN);

    let title = fill_tokens(&template.title, order_id, name);
    let title = if title.trim().is_empty() {
        format!("訂單 {order_id} 產品調查意見表")
    } else {
        title
    };

    let description = fill_tokens(&template.description, order_id, name);

    (title, description)
}

// Single pass over the template text; substituted values are never rescanned.
fn fill_tokens(text: &str, order_id: &str, name: &str) -> String {
    let mut output = String::with_capacity(text.len());
    let mut rest = text;
    while let Some(start) = rest.find('{') {
        output.push_str(&rest[..start]);
        let tail = &rest[start..];
        if let Some(after) = tail.strip_prefix(ORDER_ID_TOKEN) {
            output.push_str(order_id);
            rest = after;
        } else if let Some(after) = tail.strip_prefix(CUSTOMER_NAME_TOKEN) {
            output.push_str(name);
            rest = after;
        } else {
            output.push('{');
            rest = &tail[1..];
        }
    }
    output.push_str(rest);
    output
}

/// Removes every `親愛的 <noun>，` salutation, including the whitespace
/// around the noun and after the separator.
pub fn strip_salutation(description: &str, noun: &str) -> String {
    let mut output = String::with_capacity(description.len());
    let mut rest = description;
    while let Some(start) = rest.find(SALUTATION_PREFIX) {
        output.push_str(&rest[..start]);
        let after_prefix = &rest[start + SALUTATION_PREFIX.len()..];
        match salutation_tail_len(after_prefix, noun) {
            Some(len) => rest = &after_prefix[len..],
            None => {
                output.push_str(SALUTATION_PREFIX);
                rest = after_prefix;
            }
        }
    }
    output.push_str(rest);
    output
}

fn salutation_tail_len(text: &str, noun: &str) -> Option<usize> {
    let after_space = text.trim_start();
    let after_noun = after_space.strip_prefix(noun)?;
    let before_separator = after_noun.trim_start();
    let separator = before_separator
        .chars()
        .next()
        .filter(|ch| matches!(ch, '，' | ','))?;
    let after_separator = before_separator[separator.len_utf8()..].trim_start();
    Some(text.len() - after_separator.len())
}

fn build_catalog() -> Vec<FormTemplate> {
    vec![
        FormTemplate {
            id: "empty-form".to_string(),
            name: "空白表單".to_string(),
            title: String::new(),
            description: String::new(),
            questions: vec![Question::new("", QuestionKind::ShortText)],
        },
        FormTemplate {
            id: "customer-satisfaction".to_string(),
            name: "客戶滿意度調查表".to_string(),
            title: "訂單 {orderId} 客戶滿意度調查表".to_string(),
            description: "親愛的{customerName}，感謝您使用我們的服務，請協助填寫此問卷以協助我們改進服務品質。"
                .to_string(),
            questions: vec![
                Question::new("請輸入您的姓名", QuestionKind::ShortText).required(true),
                Question::new("您對我們的服務滿意度為何？", QuestionKind::SingleChoice)
                    .with_options(["非常滿意", "滿意", "普通", "不滿意", "非常不滿意"])
                    .required(true),
                Question::new(
                    "您認為我們的服務有哪些需要改進的地方？",
                    QuestionKind::MultiChoice,
                )
                .with_options(["回應速度", "服務態度", "專業知識", "其他"])
                .required(true),
                Question::new("您接受服務的日期", QuestionKind::Date),
                Question::new("其他意見或建議", QuestionKind::ShortText),
            ],
        },
        FormTemplate {
            id: DEFAULT_TEMPLATE_ID.to_string(),
            name: "產品意見表".to_string(),
            title: "訂單 {orderId} 產品意見表".to_string(),
            description: "親愛的{customerName}，感謝您使用我們的產品，請協助填寫此問卷以協助我們改進產品品質。"
                .to_string(),
            questions: vec![
                Question::new("請輸入您的姓名", QuestionKind::ShortText).required(true),
                Question::new("您對我們的產品滿意度為何？", QuestionKind::SingleChoice)
                    .with_options(["非常滿意", "滿意", "普通", "不滿意", "非常不滿意"])
                    .required(true),
                Question::new(
                    "您認為我們的產品有哪些需要改進的地方？",
                    QuestionKind::MultiChoice,
                )
                .with_options(["外觀設計", "功能性", "使用體驗", "其他"])
                .required(true),
                Question::new("其他意見或建議", QuestionKind::ShortText),
            ],
        },
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    fn template(title: &str, description: &str) -> FormTemplate {
        FormTemplate {
            id: "t".to_string(),
            name: "t".to_string(),
            title: title.to_string(),
            description: description.to_string(),
            questions: vec![],
        }
    }

    #[test]
    fn default_template_is_stable() {
        let first = resolve(None, "O1", None).expect("first");
        let second = resolve(Some("  "), "O2", None).expect("second");
        assert_eq!(default_template().id, DEFAULT_TEMPLATE_ID);
        assert_eq!(first.questions, second.questions);
        assert_eq!(first.title, "訂單 O1 產品意見表");
    }

    #[test]
    fn unknown_template_is_rejected() {
        let err = resolve(Some("missing"), "O1", None).expect_err("error");
        assert!(matches!(err, DomainError::TemplateNotFound(id) if id == "missing"));
    }

    #[test]
    fn order_id_token_is_fully_replaced() {
        let (title, _) = substitute_placeholders(&template("訂單 {orderId} 調查", ""), "A100", None);
        assert_eq!(title, "訂單 A100 調查");
        assert!(!title.contains("{orderId}"));
        assert!(!title.contains('{'));
    }

    #[test]
    fn substituted_values_are_not_rescanned() {
        let (title, description) = substitute_placeholders(
            &template("{orderId} / {customerName}", "親愛的{customerName}，訂單 {orderId}"),
            "{customerName}",
            Some("{orderId}"),
        );
        assert_eq!(title, "{customerName} / {orderId}");
        assert_eq!(description, "親愛的{orderId}，訂單 {customerName}");
    }

    #[test]
    fn unknown_braces_are_kept() {
        let (_, description) = substitute_placeholders(&template("", "{x} {orderId}"), "O1", None);
        assert_eq!(description, "{x} O1");
    }

    #[test]
    fn customer_name_is_injected_into_description() {
        let spec = resolve(Some("customer-satisfaction"), "O9", Some("王小明")).expect("spec");
        assert!(spec.description.starts_with("親愛的王小明，感謝您"));
        assert_eq!(spec.title, "訂單 O9 客戶滿意度調查表");
    }

    #[test]
    fn missing_name_removes_salutation_entirely() {
        let spec = resolve(None, "O1", None).expect("spec");
        assert!(!spec.description.contains("親愛的"));
        assert!(!spec.description.contains(CUSTOMER_FALLBACK_NOUN));
        assert!(spec.description.starts_with("感謝您使用我們的產品"));
    }

    #[test]
    fn blank_name_is_treated_as_missing() {
        let spec = resolve(None, "O1", Some("   ")).expect("spec");
        assert!(spec.description.starts_with("感謝您"));
    }

    #[test]
    fn strip_salutation_handles_spacing_and_ascii_comma() {
        assert_eq!(
            strip_salutation("親愛的 客戶 ,  歡迎", CUSTOMER_FALLBACK_NOUN),
            "歡迎"
        );
        assert_eq!(
            strip_salutation("前言。親愛的客戶，請填寫。", CUSTOMER_FALLBACK_NOUN),
            "前言。請填寫。"
        );
    }

    #[test]
    fn strip_salutation_keeps_unrelated_prefix_usage() {
        let text = "親愛的朋友，你好";
        assert_eq!(strip_salutation(text, CUSTOMER_FALLBACK_NOUN), text);
    }

    #[test]
    fn empty_title_gets_generated_fallback() {
        let spec = resolve(Some("empty-form"), "Z1", None).expect("spec");
        assert_eq!(spec.title, "訂單 Z1 產品調查意見表");
        assert!(spec.description.is_empty());
    }
}
