use std::sync::Arc;

use async_trait::async_trait;
use reqwest::Client;
use tracing::{debug, warn};

use shared_config::AppConfig;
use shared_models::notify::{NotificationPayload, Notifier};

/// Posts each event as JSON to a configured webhook endpoint. The receiving
/// side owns templating and delivery channels.
pub struct WebhookNotifier {
    client: Client,
    endpoint: String,
}

impl WebhookNotifier {
    pub fn new(endpoint: &str) -> Self {
        Self {
            client: Client::new(),
            endpoint: endpoint.to_string(),
        }
    }
}

#[async_trait]
impl Notifier for WebhookNotifier {
    async fn notify(&self, payload: NotificationPayload) -> Result<(), String> {
        let response = self
            .client
            .post(&self.endpoint)
            .json(&payload)
            .send()
            .await
            .map_err(|e| format!("Webhook dispatch failed: {}", e))?;

        if !response.status().is_success() {
            return Err(format!(
                "Webhook responded with status {}",
                response.status()
            ));
        }

        debug!(
            event = %payload.event,
            appointment = %payload.appointment_number,
            "Notification delivered"
        );
        Ok(())
    }
}

/// Used when no webhook is configured and in tests.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopNotifier;

#[async_trait]
impl Notifier for NoopNotifier {
    async fn notify(&self, payload: NotificationPayload) -> Result<(), String> {
        debug!(event = %payload.event, "Notification dispatch disabled, dropping event");
        Ok(())
    }
}

pub fn notifier_from_config(config: &AppConfig) -> Arc<dyn Notifier> {
    if config.is_notifications_configured() {
        Arc::new(WebhookNotifier::new(&config.notify_webhook_url))
    } else {
        warn!("NOTIFY_WEBHOOK_URL not set, notification dispatch disabled");
        Arc::new(NoopNotifier)
    }
}

/// Fire-and-forget dispatch. The task is detached: a slow or failing
/// notifier can never delay or roll back the transition that triggered it.
pub fn dispatch(notifier: Arc<dyn Notifier>, payload: NotificationPayload) {
    tokio::spawn(async move {
        if let Err(err) = notifier.notify(payload).await {
            warn!("Notification dispatch failed: {}", err);
        }
    });
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, Utc};
    use shared_models::notify::AppointmentEvent;
    use uuid::Uuid;
    use wiremock::matchers::{body_partial_json, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn sample_payload(event: AppointmentEvent) -> NotificationPayload {
        let start = Utc::now() + Duration::days(1);
        NotificationPayload {
            event,
            appointment_id: Uuid::new_v4(),
            appointment_number: "APT-20250601-4821".to_string(),
            user_id: Uuid::new_v4(),
            provider_id: Uuid::new_v4(),
            start_time: start,
            end_time: start + Duration::minutes(30),
        }
    }

    #[tokio::test]
    async fn webhook_notifier_posts_event_json() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/hooks/appointments"))
            .and(body_partial_json(serde_json::json!({
                "event": "confirmed",
                "appointment_number": "APT-20250601-4821"
            })))
            .respond_with(ResponseTemplate::new(200))
            .expect(1)
            .mount(&server)
            .await;

        let notifier =
            WebhookNotifier::new(&format!("{}/hooks/appointments", server.uri()));
        let result = notifier
            .notify(sample_payload(AppointmentEvent::Confirmed))
            .await;

        assert!(result.is_ok());
    }

    #[tokio::test]
    async fn webhook_notifier_surfaces_http_failures() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(500))
            .mount(&server)
            .await;

        let notifier = WebhookNotifier::new(&server.uri());
        let result = notifier
            .notify(sample_payload(AppointmentEvent::Requested))
            .await;

        assert!(result.is_err());
    }

    #[tokio::test]
    async fn noop_notifier_always_succeeds() {
        let result = NoopNotifier
            .notify(sample_payload(AppointmentEvent::Cancelled))
            .await;
        assert!(result.is_ok());
    }
}
