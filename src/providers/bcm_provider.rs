use crate::core::config::SourceSettings;
use crate::core::{ConfigError, DateWindow, RateError, RateSource};
use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::header::{ACCEPT, HeaderMap, HeaderValue, REFERER, USER_AGENT};
use tracing::{debug, error, instrument};

/// Reference rates published by the Banque Centrale de Mauritanie.
///
/// One client is built per run and shared by every query.
pub struct BcmProvider {
    api_base: reqwest::Url,
    client: reqwest::Client,
}

impl BcmProvider {
    pub fn new(settings: &SourceSettings) -> Result<Self> {
        let mut headers = HeaderMap::new();
        headers.insert(USER_AGENT, header_value("User-Agent", &settings.user_agent)?);
        headers.insert(ACCEPT, HeaderValue::from_static("application/json,*/*"));
        headers.insert(REFERER, header_value("Referer", &settings.referer)?);

        let client = reqwest::Client::builder()
            .default_headers(headers)
            .timeout(settings.timeout)
            .build()
            .context("Failed to build HTTP client")?;

        let api_base =
            reqwest::Url::parse(&settings.api_base).map_err(|e| ConfigError::InvalidApiBase {
                url: settings.api_base.clone(),
                reason: e.to_string(),
            })?;

        Ok(Self { api_base, client })
    }
}

fn header_value(header: &'static str, value: &str) -> Result<HeaderValue, ConfigError> {
    HeaderValue::from_str(value).map_err(|_| ConfigError::InvalidHeader {
        header,
        value: value.to_string(),
    })
}

#[async_trait]
impl RateSource for BcmProvider {
    #[instrument(
        name = "BcmRateFetch",
        skip(self),
        fields(currency = %currency, window = %window)
    )]
    async fn fetch_range(
        &self,
        currency: &str,
        window: &DateWindow,
    ) -> Result<serde_json::Value, RateError> {
        let code = currency.to_uppercase();
        let mut url = self.api_base.clone();
        url.query_pairs_mut()
            .append_pair("from", &window.from.to_string())
            .append_pair("to", &window.to.to_string())
            .append_pair("currency", &code);
        debug!("Requesting rates from {}", url);

        let response = self
            .client
            .get(url.clone())
            .send()
            .await
            .map_err(|source| RateError::Transport {
                url: url.to_string(),
                source,
            })?;

        let status = response.status();
        if !status.is_success() {
            return Err(RateError::Status {
                url: url.to_string(),
                status: status.as_u16(),
            });
        }

        let body = response
            .text()
            .await
            .map_err(|source| RateError::Transport {
                url: url.to_string(),
                source,
            })?;

        serde_json::from_str(&body).map_err(|source| {
            error!(
                error = ?source,
                response = %body,
                "Failed to parse rate response"
            );
            RateError::MalformedJson {
                currency: code,
                source,
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use std::time::Duration;
    use wiremock::matchers::{header, method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn settings(server: &MockServer) -> SourceSettings {
        SourceSettings {
            api_base: format!("{}/api/cours_change_reference", server.uri()),
            user_agent: "mrufx-test/1.0".to_string(),
            referer: "https://example.test/rates".to_string(),
            timeout: Duration::from_secs(5),
        }
    }

    fn window() -> DateWindow {
        DateWindow::ending_at(NaiveDate::from_ymd_opt(2024, 3, 10).unwrap(), 30)
    }

    async fn create_mock_server(status_code: u16, body: &str) -> MockServer {
        let mock_server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/api/cours_change_reference"))
            .respond_with(ResponseTemplate::new(status_code).set_body_string(body))
            .mount(&mock_server)
            .await;

        mock_server
    }

    #[tokio::test]
    async fn test_fetch_range_sends_query_and_headers() {
        let mock_server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/cours_change_reference"))
            .and(query_param("from", "2024-02-09"))
            .and(query_param("to", "2024-03-10"))
            .and(query_param("currency", "USD"))
            .and(header("referer", "https://example.test/rates"))
            .and(header("user-agent", "mrufx-test/1.0"))
            .respond_with(ResponseTemplate::new(200).set_body_string(
                r#"[{"currency":"USD","date":"2024-03-08","value":"36.5","weight":1}]"#,
            ))
            .expect(1)
            .mount(&mock_server)
            .await;

        let provider = BcmProvider::new(&settings(&mock_server)).unwrap();
        let payload = provider.fetch_range("usd", &window()).await.unwrap();

        assert_eq!(payload[0]["value"], "36.5");
    }

    #[tokio::test]
    async fn test_non_success_status_is_error() {
        let mock_server = create_mock_server(500, "oops").await;
        let provider = BcmProvider::new(&settings(&mock_server)).unwrap();

        let err = provider.fetch_range("USD", &window()).await.unwrap_err();
        assert!(matches!(err, RateError::Status { status: 500, .. }));
    }

    #[tokio::test]
    async fn test_malformed_json_is_error() {
        let mock_server = create_mock_server(200, "<html>maintenance</html>").await;
        let provider = BcmProvider::new(&settings(&mock_server)).unwrap();

        let err = provider.fetch_range("USD", &window()).await.unwrap_err();
        assert!(matches!(err, RateError::MalformedJson { ref currency, .. } if currency == "USD"));
    }

    #[tokio::test]
    async fn test_timeout_is_transport_error() {
        let mock_server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_string("[]")
                    .set_delay(Duration::from_millis(500)),
            )
            .mount(&mock_server)
            .await;

        let mut settings = settings(&mock_server);
        settings.timeout = Duration::from_millis(50);
        let provider = BcmProvider::new(&settings).unwrap();

        let err = provider.fetch_range("USD", &window()).await.unwrap_err();
        assert!(matches!(err, RateError::Transport { .. }));
    }

    #[test]
    fn test_invalid_api_base_rejected() {
        let settings = SourceSettings {
            api_base: "not a url".to_string(),
            user_agent: "mrufx-test/1.0".to_string(),
            referer: "http://localhost/".to_string(),
            timeout: Duration::from_secs(1),
        };
        let err = BcmProvider::new(&settings).err().unwrap();
        assert!(matches!(
            err.downcast_ref::<ConfigError>(),
            Some(ConfigError::InvalidApiBase { .. })
        ));
    }

    #[test]
    fn test_invalid_header_rejected() {
        let settings = SourceSettings {
            api_base: "http://localhost/api".to_string(),
            user_agent: "bad\nagent".to_string(),
            referer: "http://localhost/".to_string(),
            timeout: Duration::from_secs(1),
        };
        let err = BcmProvider::new(&settings).err().unwrap();
        assert!(err.downcast_ref::<ConfigError>().is_some());
    }
}
