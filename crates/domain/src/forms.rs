use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::DomainResult;
use crate::error::DomainError;
use crate::ports::forms::{FormsApi, FormsApiError};
use crate::questions::{Question, QuestionKind};

pub const PLACEHOLDER_OPTIONS: [&str; 2] = ["選項 1", "選項 2"];

/// A resolved form ready to be built remotely.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct FormSpec {
    pub title: String,
    pub description: String,
    pub questions: Vec<Question>,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ChoiceType {
    Radio,
    Checkbox,
}

impl ChoiceType {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Radio => "RADIO",
            Self::Checkbox => "CHECKBOX",
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum RemoteQuestion {
    Text,
    Choice {
        choice_type: ChoiceType,
        options: Vec<String>,
    },
    Date {
        include_time: bool,
        include_year: bool,
    },
}

/// One item-creation request inside the batched update.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct FormItemRequest {
    pub title: String,
    pub position: usize,
    pub required: bool,
    pub question: RemoteQuestion,
}

pub fn map_questions(questions: &[Question]) -> Vec<FormItemRequest> {
    questions
        .iter()
        .enumerate()
        .map(|(position, question)| map_question(question, position))
        .collect()
}

pub fn map_question(question: &Question, position: usize) -> FormItemRequest {
    let remote = match &question.kind {
        QuestionKind::ShortText => RemoteQuestion::Text,
        QuestionKind::SingleChoice => RemoteQuestion::Choice {
            choice_type: ChoiceType::Radio,
            options: choice_options(&question.options),
        },
        QuestionKind::MultiChoice => RemoteQuestion::Choice {
            choice_type: ChoiceType::Checkbox,
            options: choice_options(&question.options),
        },
        QuestionKind::Date => RemoteQuestion::Date {
            include_time: false,
            include_year: true,
        },
        QuestionKind::Other(raw) => {
            tracing::debug!(kind = %raw, "unrecognized question type, using open text");
            RemoteQuestion::Text
        }
    };

    FormItemRequest {
        title: question.text.clone(),
        position,
        required: question.required,
        question: remote,
    }
}

fn choice_options(options: &[String]) -> Vec<String> {
    let trimmed = options
        .iter()
        .map(|option| option.trim())
        .filter(|option| !option.is_empty())
        .map(str::to_string)
        .collect::<Vec<_>>();
    if trimmed.is_empty() {
        tracing::warn!("choice question has no usable options, using placeholders");
        return PLACEHOLDER_OPTIONS.iter().map(|value| value.to_string()).collect();
    }
    trimmed
}

pub fn view_url(view_base_url: &str, form_id: &str) -> String {
    format!("{}/d/{form_id}/viewform", view_base_url.trim_end_matches('/'))
}

#[derive(Clone)]
pub struct FormBuilder {
    api: Arc<dyn FormsApi>,
    view_base_url: String,
}

impl FormBuilder {
    pub fn new(api: Arc<dyn FormsApi>, view_base_url: impl Into<String>) -> Self {
        Self {
            api,
            view_base_url: view_base_url.into(),
        }
    }

    /// Creates the shell, then the description, then all items in one batch.
    /// Any failing call aborts the build; a shell created before the failure
    /// is left behind remotely and never reported.
    pub async fn create_form(&self, spec: &FormSpec) -> DomainResult<String> {
        let form_id = self
            .api
            .create_shell(&spec.title)
            .await
            .map_err(form_creation_failed)?;

        if !spec.description.trim().is_empty() {
            self.api
                .update_description(&form_id, &spec.description)
                .await
                .map_err(form_creation_failed)?;
        }

        if !spec.questions.is_empty() {
            let items = map_questions(&spec.questions);
            self.api
                .batch_create_items(&form_id, &items)
                .await
                .map_err(form_creation_failed)?;
        }

        tracing::debug!(form_id, question_count = spec.questions.len(), "form built");
        Ok(view_url(&self.view_base_url, &form_id))
    }
}

fn form_creation_failed(err: FormsApiError) -> DomainError {
    DomainError::FormCreationFailed(err.to_string())
}
