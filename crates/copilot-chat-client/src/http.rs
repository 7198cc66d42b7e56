use crate::config::ConnectionSettings;
use crate::error::ClientError;
use crate::sse;
use crate::stream::ActivityStream;
use crate::transport::Transport;
use async_trait::async_trait;
use copilot_chat_core::activity::{Activity, ConversationAccount};
use copilot_chat_core::types::ConversationId;
use futures::StreamExt;
use log::debug;
use reqwest::header::{ACCEPT, HeaderMap, HeaderValue};
use reqwest::{Client as HttpClient, Response, Url};
use serde_json::json;

/// Header carrying the conversation id on requests and handshake responses.
pub const CONVERSATION_ID_HEADER: &str = "x-ms-conversationid";

/// [`Transport`] for the direct-to-engine agent API.
///
/// Both calls are plain `POST`s answered with a server-sent event stream of
/// activities.
#[derive(Debug, Clone)]
pub struct HttpTransport {
    http_client: HttpClient,
    settings: ConnectionSettings,
    access_token: String,
}

/// Builder for [`HttpTransport`].
#[derive(Debug, Default)]
pub struct HttpTransportBuilder {
    http_client: Option<HttpClient>,
    settings: Option<ConnectionSettings>,
    access_token: Option<String>,
}

impl HttpTransportBuilder {
    pub fn with_settings(mut self, settings: ConnectionSettings) -> Self {
        self.settings = Some(settings);
        self
    }

    pub fn with_access_token(mut self, token: impl Into<String>) -> Self {
        self.access_token = Some(token.into());
        self
    }

    pub fn with_client(mut self, client: HttpClient) -> Self {
        self.http_client = Some(client);
        self
    }

    pub fn build(self) -> Result<HttpTransport, ClientError> {
        let settings = self
            .settings
            .ok_or_else(|| ClientError::config("connection settings are required"))?;
        settings.validate()?;
        let access_token = self
            .access_token
            .filter(|token| !token.trim().is_empty())
            .ok_or_else(|| ClientError::config("access token is required"))?;

        Ok(HttpTransport {
            http_client: self.http_client.unwrap_or_default(),
            settings,
            access_token,
        })
    }
}

impl HttpTransport {
    pub fn builder() -> HttpTransportBuilder {
        HttpTransportBuilder::default()
    }

    pub fn settings(&self) -> &ConnectionSettings {
        &self.settings
    }

    async fn post(
        &self,
        url: Url,
        body: serde_json::Value,
        headers: HeaderMap,
    ) -> Result<Response, ClientError> {
        debug!("POST {url}");
        let response = self
            .http_client
            .post(url)
            .bearer_auth(&self.access_token)
            .header(ACCEPT, "text/event-stream")
            .headers(headers)
            .json(&body)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(ClientError::Status { status, body });
        }
        Ok(response)
    }
}

fn header_conversation_id(response: &Response) -> Option<ConversationId> {
    response
        .headers()
        .get(CONVERSATION_ID_HEADER)
        .and_then(|value| value.to_str().ok())
        .filter(|value| !value.is_empty())
        .map(ConversationId::from)
}

fn stamp_conversation(mut activity: Activity, conversation_id: &ConversationId) -> Activity {
    if activity.conversation_id().is_none() {
        activity.conversation = Some(ConversationAccount::new(conversation_id.clone()));
    }
    activity
}

#[async_trait]
impl Transport for HttpTransport {
    async fn start_conversation(&self) -> Result<ActivityStream<'static>, ClientError> {
        let body = json!({ "emitStartConversationEvent": true });
        let response = self
            .post(self.settings.start_url()?, body, HeaderMap::new())
            .await?;

        let conversation_id = header_conversation_id(&response);
        let activities = sse::activity_stream(response.bytes_stream());
        Ok(match conversation_id {
            Some(id) => activities
                .map(move |item| item.map(|activity| stamp_conversation(activity, &id)))
                .boxed(),
            None => activities,
        })
    }

    async fn ask_question(
        &self,
        text: &str,
        conversation_id: &ConversationId,
    ) -> Result<ActivityStream<'static>, ClientError> {
        let body = json!({ "activity": Activity::message(text, conversation_id) });
        let mut headers = HeaderMap::new();
        let value = HeaderValue::from_str(conversation_id.as_str()).map_err(|e| {
            ClientError::connection(format!("invalid conversation id '{conversation_id}': {e}"))
        })?;
        headers.insert(CONVERSATION_ID_HEADER, value);

        let response = self
            .post(self.settings.turn_url(conversation_id)?, body, headers)
            .await?;
        Ok(sse::activity_stream(response.bytes_stream()))
    }
}
