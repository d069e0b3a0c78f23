use async_trait::async_trait;
use macrocoach_model::{
    message::Message,
    metrics::{Metric, NewMetric},
    presenter::ResultsView,
    profile::ProfileForm,
};
use serde::{de::DeserializeOwned, Deserialize};
use uuid::Uuid;

const USER_HEADER: &str = "X-User-Id";

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("server unreachable")]
    CommunicationError,
    #[error("internal server error")]
    InternalServerError,
    #[error("invalid request")]
    RequestError,
    #[error("incorrect server response")]
    ResponseError,
}

type Result<T> = std::result::Result<T, Error>;

#[mockall::automock]
#[async_trait]
pub trait Client: Send + Sync {
    async fn calculate(&self, form: &ProfileForm, user_id: Option<Uuid>) -> Result<ResultsView>;
    async fn post_metric(&self, user_id: Uuid, entry: &NewMetric) -> Result<Metric>;
    async fn send_message(&self, from: Uuid, to: Uuid, content: &str) -> Result<Message>;
    async fn unread_count(&self, user_id: Uuid) -> Result<u32>;
}

pub struct ClientImpl {
    url: String,
    client: reqwest::Client,
}

impl ClientImpl {
    fn new(url: String) -> Self {
        Self {
            url: url.trim_end_matches('/').to_owned(),
            client: reqwest::Client::new(),
        }
    }

    fn endpoint(&self, path: &str) -> String {
        format!("{}{}", self.url, path)
    }
}

pub fn create(url: String) -> impl Client {
    ClientImpl::new(url)
}

async fn read_response<T: DeserializeOwned>(
    response: reqwest::Result<reqwest::Response>,
) -> Result<T> {
    response
        .map_err(|_| Error::CommunicationError)
        .and_then(|resp| {
            if resp.status().is_client_error() {
                Err(Error::RequestError)
            } else if resp.status().is_server_error() {
                Err(Error::InternalServerError)
            } else {
                Ok(resp)
            }
        })?
        .json()
        .await
        .map_err(|_| Error::ResponseError)
}

#[derive(Deserialize)]
struct UnreadCount {
    unread: u32,
}

#[async_trait]
impl Client for ClientImpl {
    async fn calculate(&self, form: &ProfileForm, user_id: Option<Uuid>) -> Result<ResultsView> {
        let mut request = self.client.post(self.endpoint("/calculate")).json(form);
        if let Some(user_id) = user_id {
            request = request.header(USER_HEADER, user_id.to_string());
        }
        read_response(request.send().await).await
    }

    async fn post_metric(&self, user_id: Uuid, entry: &NewMetric) -> Result<Metric> {
        let response = self
            .client
            .post(self.endpoint(&format!("/users/{}/metrics", user_id)))
            .header(USER_HEADER, user_id.to_string())
            .json(entry)
            .send()
            .await;
        read_response(response).await
    }

    async fn send_message(&self, from: Uuid, to: Uuid, content: &str) -> Result<Message> {
        let response = self
            .client
            .post(self.endpoint(&format!("/messages/{}", to)))
            .header(USER_HEADER, from.to_string())
            .json(&serde_json::json!({ "content": content }))
            .send()
            .await;
        read_response(response).await
    }

    async fn unread_count(&self, user_id: Uuid) -> Result<u32> {
        let response = self
            .client
            .get(self.endpoint("/messages/unread"))
            .header(USER_HEADER, user_id.to_string())
            .send()
            .await;
        read_response::<UnreadCount>(response)
            .await
            .map(|count| count.unread)
    }
}

#[cfg(test)]
mod tests {
    use macrocoach_model::{
        calculator::MacroResult, message::NewMessage, metrics::MetricKind, presenter,
    };
    use mockito::Matcher;
    use serde_json::json;

    use super::*;

    fn form() -> ProfileForm {
        ProfileForm {
            age: Some(30),
            sex: Some("male".to_owned()),
            weight: Some(80.0),
            height: Some(180.0),
            activity_level: Some("sedentary".to_owned()),
            goal: Some("maintain".to_owned()),
        }
    }

    #[tokio::test]
    async fn calculate_sends_session_header() {
        let mut server = mockito::Server::new_async().await;
        let user_id = Uuid::new_v4();
        let result = MacroResult {
            calories: 2136,
            protein: 160,
            carbs: 240,
            fat: 59,
        };
        let view = presenter::present(Some(&result), None);
        let mock = server
            .mock("POST", "/calculate")
            .match_header("x-user-id", user_id.to_string().as_str())
            .match_body(Matcher::PartialJson(json!({"activityLevel": "sedentary"})))
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(serde_json::to_string(&view).unwrap())
            .create_async()
            .await;

        let client = create(server.url());
        assert_eq!(client.calculate(&form(), Some(user_id)).await.unwrap(), view);
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn metrics_and_messages_round_trip() {
        let mut server = mockito::Server::new_async().await;
        let (user_id, coach_id) = (Uuid::new_v4(), Uuid::new_v4());
        let entry = NewMetric {
            weight: Some(80.5),
            ..Default::default()
        };
        let metric = Metric::new(user_id, entry.validate().unwrap());
        let message = NewMessage::new(user_id, coach_id, "hello coach")
            .unwrap()
            .into_message();
        let _metrics = server
            .mock("POST", format!("/users/{}/metrics", user_id).as_str())
            .with_status(201)
            .with_body(serde_json::to_string(&metric).unwrap())
            .create_async()
            .await;
        let _messages = server
            .mock("POST", format!("/messages/{}", coach_id).as_str())
            .match_header("x-user-id", user_id.to_string().as_str())
            .match_body(Matcher::Json(json!({"content": "hello coach"})))
            .with_status(201)
            .with_body(serde_json::to_string(&message).unwrap())
            .create_async()
            .await;

        let client = create(server.url());
        let stored = client.post_metric(user_id, &entry).await.unwrap();
        assert_eq!(stored.get(MetricKind::Weight), Some(80.5));
        let sent = client
            .send_message(user_id, coach_id, "hello coach")
            .await
            .unwrap();
        assert_eq!(sent.id, message.id);
    }

    #[tokio::test]
    async fn statuses_map_to_errors() {
        let test_data = [(422, "{}"), (500, "{}"), (200, "not json"), (200, r#"{"unread": 3}"#)];

        for (i, (status, body)) in test_data.into_iter().enumerate() {
            let mut server = mockito::Server::new_async().await;
            let _mock = server
                .mock("GET", "/messages/unread")
                .with_status(status)
                .with_body(body)
                .create_async()
                .await;

            let result = create(server.url()).unread_count(Uuid::new_v4()).await;
            match (i, result) {
                (0, Err(Error::RequestError))
                | (1, Err(Error::InternalServerError))
                | (2, Err(Error::ResponseError)) => {}
                (3, Ok(count)) => assert_eq!(count, 3),
                (_, other) => panic!("Test case #{}: unexpected {:?}", i, other),
            }
        }
    }

    #[tokio::test]
    async fn unreachable_server() {
        let client = create("http://127.0.0.1:1".to_owned());
        assert!(matches!(
            client.unread_count(Uuid::new_v4()).await,
            Err(Error::CommunicationError)
        ));
    }
}
