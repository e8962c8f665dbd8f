use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::DomainResult;
use crate::error::DomainError;
use crate::ports::mail::MailRelay;
use crate::templates::CUSTOMER_FALLBACK_NOUN;
use crate::util::non_blank;

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct OutboundEmail {
    pub to: String,
    pub subject: String,
    pub html: String,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MessageReceipt {
    pub message_id: String,
}

pub fn order_email_subject(order_id: &str) -> String {
    format!("訂單 {order_id} 產品意見調查表單")
}

pub fn render_order_email(order_id: &str, customer_name: Option<&str>, form_url: &str) -> String {
    let name = escape_html(non_blank(customer_name).unwrap_or(CUSTOMER_FALLBACK_NOUN));
    let order_id = escape_html(order_id);
    let form_url = escape_html(form_url);
    format!(
        r#"<!DOCTYPE html>
<html>
<head>
  <meta charset="UTF-8">
  <style>
    body {{ font-family: Arial, sans-serif; line-height: 1.6; color: #333; }}
    .container {{ max-width: 600px; margin: 0 auto; padding: 20px; }}
    .header {{ background-color: #4CAF50; color: white; padding: 20px; text-align: center; border-radius: 5px 5px 0 0; }}
    .content {{ padding: 20px; background-color: #f9f9f9; border-radius: 0 0 5px 5px; }}
    .button {{ display: inline-block; padding: 12px 24px; background-color: #4CAF50; color: white; text-decoration: none; border-radius: 5px; margin: 20px 0; }}
    .link {{ word-break: break-all; color: #4CAF50; background: #f0f0f0; padding: 10px; border-radius: 3px; }}
    .footer {{ text-align: center; padding: 20px; color: #666; font-size: 12px; }}
  </style>
</head>
<body>
  <div class="container">
    <div class="header">
      <h1>感謝您的訂購！</h1>
    </div>
    <div class="content">
      <p>親愛的 {name}，</p>
      <p>感謝您完成訂單 <strong>{order_id}</strong>！</p>
      <p>為了持續改進我們的產品品質，誠摯邀請您填寫產品意見調查表單。您的寶貴意見對我們非常重要！</p>
      <div style="text-align: center;">
        <a href="{form_url}" class="button">填寫產品意見調查</a>
      </div>
      <p>或複製以下連結到瀏覽器開啟：</p>
      <p class="link">{form_url}</p>
      <p style="margin-top: 20px;">期待您的回饋！</p>
    </div>
    <div class="footer">
      <p>此郵件由系統自動發送，請勿回覆。</p>
    </div>
  </div>
</body>
</html>
"#
    )
}

fn escape_html(value: &str) -> String {
    let mut escaped = String::with_capacity(value.len());
    for ch in value.chars() {
        match ch {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&#39;"),
            _ => escaped.push(ch),
        }
    }
    escaped
}

/// Dispatches rendered mail through the relay. No retries here.
#[derive(Clone)]
pub struct NotificationSender {
    relay: Arc<dyn MailRelay>,
}

impl NotificationSender {
    pub fn new(relay: Arc<dyn MailRelay>) -> Self {
        Self { relay }
    }

    pub async fn send(
        &self,
        to: &str,
        subject: &str,
        html_body: &str,
    ) -> DomainResult<MessageReceipt> {
        let email = OutboundEmail {
            to: to.to_string(),
            subject: subject.to_string(),
            html: html_body.to_string(),
        };
        self.relay
            .send(&email)
            .await
            .map_err(|err| DomainError::EmailDeliveryFailed(err.to_string()))
    }

    pub async fn send_form_link(
        &self,
        to: &str,
        order_id: &str,
        customer_name: Option<&str>,
        form_url: &str,
    ) -> DomainResult<MessageReceipt> {
        let subject = order_email_subject(order_id);
        let html = render_order_email(order_id, customer_name, form_url);
        self.send(to, &subject, &html).await
    }
}
