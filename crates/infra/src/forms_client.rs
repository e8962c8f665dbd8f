use std::time::Duration;

use formcast_domain::forms::{FormItemRequest, RemoteQuestion};
use formcast_domain::ports::BoxFuture;
use formcast_domain::ports::forms::{FormsApi, FormsApiError};
use reqwest::StatusCode;
use serde_json::{Value, json};

use crate::config::AppConfig;

/// REST client for the hosted forms service (Google Forms v1 shape).
#[derive(Debug, Clone)]
pub struct GoogleFormsClient {
    http: reqwest::Client,
    base_url: String,
    access_token: Option<String>,
}

impl GoogleFormsClient {
    pub fn from_config(config: &AppConfig) -> Self {
        let timeout = Duration::from_millis(config.forms_timeout_ms.max(1));
        let http = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .unwrap_or_else(|_| reqwest::Client::new());
        Self::new(http, &config.forms_api_base_url, &config.forms_access_token)
    }

    pub fn new(http: reqwest::Client, base_url: &str, access_token: &str) -> Self {
        let token = access_token.trim();
        Self {
            http,
            base_url: base_url.trim_end_matches('/').to_string(),
            access_token: (!token.is_empty()).then(|| token.to_string()),
        }
    }

    async fn post_json(&self, path: &str, body: &Value) -> Result<Value, FormsApiError> {
        let Some(token) = self.access_token.as_deref() else {
            return Err(FormsApiError::Unauthorized(
                "forms access token is not configured".to_string(),
            ));
        };
        let url = format!("{}{}", self.base_url, path);
        let response = self
            .http
            .post(&url)
            .bearer_auth(token)
            .header("accept", "application/json")
            .json(body)
            .send()
            .await
            .map_err(|err| FormsApiError::Transport(err.to_string()))?;

        let status = response.status();
        if status.is_success() {
            return response
                .json::<Value>()
                .await
                .map_err(|err| FormsApiError::InvalidResponse(err.to_string()));
        }

        let message = response.text().await.unwrap_or_default();
        match status {
            StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => {
                Err(FormsApiError::Unauthorized(message))
            }
            _ => Err(FormsApiError::Upstream(format!(
                "status {}: {}",
                status.as_u16(),
                message
            ))),
        }
    }
}

impl FormsApi for GoogleFormsClient {
    fn create_shell(&self, title: &str) -> BoxFuture<'_, Result<String, FormsApiError>> {
        let body = create_form_body(title);
        Box::pin(async move {
            let response = self.post_json("/forms", &body).await?;
            response
                .get("formId")
                .and_then(Value::as_str)
                .filter(|id| !id.is_empty())
                .map(str::to_string)
                .ok_or_else(|| {
                    FormsApiError::InvalidResponse("create response has no formId".to_string())
                })
        })
    }

    fn update_description(
        &self,
        form_id: &str,
        description: &str,
    ) -> BoxFuture<'_, Result<(), FormsApiError>> {
        let path = batch_update_path(form_id);
        let body = update_description_body(description);
        Box::pin(async move {
            self.post_json(&path, &body).await?;
            Ok(())
        })
    }

    fn batch_create_items(
        &self,
        form_id: &str,
        items: &[FormItemRequest],
    ) -> BoxFuture<'_, Result<(), FormsApiError>> {
        let path = batch_update_path(form_id);
        let body = create_items_body(items);
        let count = items.len();
        Box::pin(async move {
            self.post_json(&path, &body).await?;
            tracing::debug!(items = count, "form items created");
            Ok(())
        })
    }
}

fn batch_update_path(form_id: &str) -> String {
    format!("/forms/{form_id}:batchUpdate")
}

pub(crate) fn create_form_body(title: &str) -> Value {
    json!({ "info": { "title": title } })
}

pub(crate) fn update_description_body(description: &str) -> Value {
    json!({
        "requests": [{
            "updateFormInfo": {
                "info": { "description": description },
                "updateMask": "description",
            }
        }]
    })
}

pub(crate) fn create_items_body(items: &[FormItemRequest]) -> Value {
    let requests = items
        .iter()
        .map(|item| {
            json!({
                "createItem": {
                    "item": {
                        "title": item.title,
                        "questionItem": {
                            "question": question_body(item),
                        },
                    },
                    "location": { "index": item.position },
                }
            })
        })
        .collect::<Vec<_>>();
    json!({ "requests": requests })
}

fn question_body(item: &FormItemRequest) -> Value {
    match &item.question {
        RemoteQuestion::Text => json!({
            "required": item.required,
            "textQuestion": {},
        }),
        RemoteQuestion::Choice {
            choice_type,
            options,
        } => json!({
            "required": item.required,
            "choiceQuestion": {
                "type": choice_type.as_str(),
                "options": options
                    .iter()
                    .map(|value| json!({ "value": value }))
                    .collect::<Vec<_>>(),
            },
        }),
        RemoteQuestion::Date {
            include_time,
            include_year,
        } => json!({
            "required": item.required,
            "dateQuestion": {
                "includeTime": include_time,
                "includeYear": include_year,
            },
        }),
    }
}
