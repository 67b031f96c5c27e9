use std::time::Duration;

use async_trait::async_trait;
use tracing::debug;

use super::Notifier;
use crate::config::TwilioConfig;
use crate::error::NotifyError;

const MAX_MESSAGE_CHARS: usize = 1600;

/// SMS alerts through the Twilio messages API
pub struct TwilioNotifier {
    client: reqwest::Client,
    account_sid: String,
    auth_token: String,
    from_phone: String,
    api_base: String,
}

impl TwilioNotifier {
    pub fn new(config: &TwilioConfig) -> Result<Self, NotifyError> {
        let client = reqwest::Client::builder().timeout(Duration::from_secs(10)).build()?;

        Ok(Self {
            client,
            account_sid: config.account_sid.clone(),
            auth_token: config.auth_token.clone(),
            from_phone: config.from_phone.clone(),
            api_base: config.api_base.trim_end_matches('/').to_owned(),
        })
    }

    fn messages_url(&self) -> String {
        format!("{}/2010-04-01/Accounts/{}/Messages.json", self.api_base, self.account_sid)
    }
}

fn validate(phone: &str, message: &str) -> Result<(), NotifyError> {
    let phone = phone.trim();
    if phone.len() != 10 || !phone.bytes().all(|b| b.is_ascii_digit()) {
        return Err(NotifyError::InvalidPhone(phone.to_owned()));
    }

    let length = message.trim().chars().count();
    if length == 0 {
        return Err(NotifyError::EmptyMessage);
    }
    if length > MAX_MESSAGE_CHARS {
        return Err(NotifyError::MessageTooLong(length));
    }

    Ok(())
}

#[async_trait]
impl Notifier for TwilioNotifier {
    async fn send(&self, phone: &str, message: &str) -> Result<(), NotifyError> {
        validate(phone, message)?;

        let to = format!("+1{}", phone.trim());
        let form = [("From", self.from_phone.as_str()), ("To", to.as_str()), ("Body", message.trim())];

        let response = self
            .client
            .post(self.messages_url())
            .basic_auth(&self.account_sid, Some(&self.auth_token))
            .form(&form)
            .send()
            .await?;

        let status = response.status();
        debug!(%status, "Twilio responded");

        if status.is_success() { Ok(()) } else { Err(NotifyError::Rejected(status.as_u16())) }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpListener;
    use tokio::sync::oneshot;

    fn config(api_base: String) -> TwilioConfig {
        TwilioConfig {
            account_sid: "AC123".into(),
            auth_token: "secret".into(),
            from_phone: "+15005550006".into(),
            api_base,
        }
    }

    async fn fake_twilio(status_line: &'static str) -> (String, oneshot::Receiver<String>) {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let (tx, rx) = oneshot::channel();

        tokio::spawn(async move {
            let (mut socket, _) = listener.accept().await.unwrap();
            let mut received = Vec::new();
            let mut buf = [0u8; 4096];
            while !request_complete(&received) {
                let n = socket.read(&mut buf).await.unwrap();
                if n == 0 {
                    break;
                }
                received.extend_from_slice(&buf[..n]);
            }
            let _ = tx.send(String::from_utf8_lossy(&received).into_owned());
            let response = format!("HTTP/1.1 {status_line}\r\nContent-Length: 0\r\nConnection: close\r\n\r\n");
            socket.write_all(response.as_bytes()).await.unwrap();
        });

        (format!("http://{addr}"), rx)
    }

    /// Headers received and the body matches Content-Length
    fn request_complete(received: &[u8]) -> bool {
        let text = String::from_utf8_lossy(received);
        let Some((head, body)) = text.split_once("\r\n\r\n") else { return false };
        let length = head
            .lines()
            .filter_map(|line| line.split_once(':'))
            .find(|(name, _)| name.eq_ignore_ascii_case("content-length"))
            .and_then(|(_, value)| value.trim().parse::<usize>().ok())
            .unwrap_or(0);
        body.len() >= length
    }

    #[test]
    fn test_validation() {
        assert!(validate("5551234567", "hi").is_ok());
        assert!(matches!(validate("555123456", "hi"), Err(NotifyError::InvalidPhone(_))));
        assert!(matches!(validate("555123456a", "hi"), Err(NotifyError::InvalidPhone(_))));
        assert!(matches!(validate("5551234567", ""), Err(NotifyError::EmptyMessage)));
        assert!(matches!(validate("5551234567", "  \n"), Err(NotifyError::EmptyMessage)));
        let long = "x".repeat(1601);
        assert!(matches!(validate("5551234567", &long), Err(NotifyError::MessageTooLong(1601))));
    }

    #[tokio::test]
    async fn test_posts_form_to_messages_endpoint() {
        let (base, request) = fake_twilio("201 Created").await;
        let notifier = TwilioNotifier::new(&config(base)).unwrap();

        notifier.send("5551234567", "Alert: down").await.unwrap();

        let request = request.await.unwrap();
        assert!(request.starts_with("POST /2010-04-01/Accounts/AC123/Messages.json"), "{request}");
        assert!(request.contains("To=%2B15551234567"), "{request}");
        assert!(request.contains("Body=Alert%3A+down"), "{request}");
        assert!(request.to_lowercase().contains("authorization: basic"), "{request}");
    }

    #[tokio::test]
    async fn test_non_success_status_is_rejected() {
        let (base, _request) = fake_twilio("400 Bad Request").await;
        let notifier = TwilioNotifier::new(&config(base)).unwrap();

        let result = notifier.send("5551234567", "Alert: down").await;
        assert!(matches!(result, Err(NotifyError::Rejected(400))));
    }
}
