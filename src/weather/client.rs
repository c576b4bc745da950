use anyhow::Result;
use async_trait::async_trait;
use log::debug;

use super::types::RawResponse;
use crate::http::HttpClient;

/// Source of raw weather responses.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait WeatherApi: Send + Sync {
    async fn fetch(&self, url: &str, params: &[(String, String)]) -> Result<RawResponse>;
}

/// Open-Meteo over HTTP.
pub struct OpenMeteoClient {
    http: HttpClient,
}

impl OpenMeteoClient {
    pub fn new(http: HttpClient) -> Self {
        Self { http }
    }
}

#[async_trait]
impl WeatherApi for OpenMeteoClient {
    #[tracing::instrument(skip(self, params))]
    async fn fetch(&self, url: &str, params: &[(String, String)]) -> Result<RawResponse> {
        debug!("Fetching weather from {}...", url);
        self.http.get_json_with_query(url, params).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::http::RetryPolicy;
    use mockito::Matcher;

    #[tokio::test]
    async fn test_fetch_parses_response() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("GET", "/v1/forecast")
            .match_query(Matcher::AllOf(vec![
                Matcher::UrlEncoded("latitude".into(), "51.75".into()),
                Matcher::UrlEncoded("hourly".into(), "temperature_2m".into()),
            ]))
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(r#"{"latitude":51.75,"longitude":-1.25,"hourly":{"time":[0],"temperature_2m":[3.5]}}"#)
            .create_async()
            .await;

        let client = OpenMeteoClient::new(
            HttpClient::new(reqwest::Client::new()).with_policy(RetryPolicy::immediate(1)),
        );
        let params = vec![
            ("latitude".to_string(), "51.75".to_string()),
            ("hourly".to_string(), "temperature_2m".to_string()),
        ];
        let raw = client
            .fetch(&format!("{}/v1/forecast", server.url()), &params)
            .await
            .unwrap();

        mock.assert_async().await;
        assert_eq!(
            raw.hourly.unwrap().variables["temperature_2m"],
            vec![Some(3.5)]
        );
    }
}
