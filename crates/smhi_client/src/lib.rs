//! SMHI point-forecast API client.
//!
//! Fetches the pmp2g point forecast for a coordinate from
//! `opendata-download-metfcst.smhi.se` and decodes it into a [`Forecast`].

pub mod forecast;
pub mod parameters;

use std::time::Duration;

use async_trait::async_trait;
use common::config::HttpConfig;
use common::{Coordinate, Error};
use reqwest::header::ACCEPT;
use tracing::debug;

pub use forecast::{decode, Forecast, ParameterSnapshot};
pub use parameters::{ParameterDescriptor, ValueKind, PARAMETERS};

const POINT_PATH: &str = "/api/category/pmp2g/version/2/geotype/point";
const ERROR_BODY_PREVIEW: usize = 500;

/// Anything that can produce a forecast for a coordinate.
#[async_trait]
pub trait ForecastSource: Send + Sync {
    async fn fetch(&self, coordinate: &Coordinate) -> Result<Forecast, Error>;
}

/// SMHI API client with connection pooling and a total request deadline.
#[derive(Debug, Clone)]
pub struct SmhiClient {
    client: reqwest::Client,
    base_url: String,
    timeout_ms: u64,
}

impl SmhiClient {
    pub fn new(config: &HttpConfig) -> Result<Self, Error> {
        let client = reqwest::Client::builder()
            .user_agent(config.user_agent.as_str())
            .pool_max_idle_per_host(4)
            .timeout(Duration::from_millis(config.timeout_ms))
            .build()
            .map_err(|e| Error::Http(format!("failed to build SMHI HTTP client: {}", e)))?;

        Ok(Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            timeout_ms: config.timeout_ms,
        })
    }

    /// Request URL for a coordinate.
    pub fn point_url(&self, coordinate: &Coordinate) -> String {
        let (lon, lat) = coordinate.api_form();
        format!(
            "{}{}/lon/{}/lat/{}/data.json",
            self.base_url, POINT_PATH, lon, lat
        )
    }

    /// Fetch and decode the point forecast for a coordinate. No retries.
    pub async fn fetch_forecast(&self, coordinate: &Coordinate) -> Result<Forecast, Error> {
        let url = self.point_url(coordinate);

        debug!("Querying SMHI API: {}", url);

        let resp = self
            .client
            .get(&url)
            .header(ACCEPT, "application/json")
            .send()
            .await
            .map_err(|e| self.transport_error(&url, e))?;

        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(Error::Http(format!(
                "SMHI returned {} for {}: {}",
                status.as_u16(),
                coordinate,
                body.chars().take(ERROR_BODY_PREVIEW).collect::<String>()
            )));
        }

        let body = resp
            .bytes()
            .await
            .map_err(|e| self.transport_error(&url, e))?;
        if body.is_empty() {
            return Err(Error::Http(format!("SMHI returned an empty body for {}", url)));
        }

        let forecast = decode(&body).map_err(|e| match e {
            Error::Decode(msg) => Error::Decode(format!("{} (url={})", msg, url)),
            other => other,
        })?;

        debug!(
            "Got {} forecast entries for {} (approved {:?})",
            forecast.len(),
            coordinate,
            forecast.approved_time
        );

        Ok(forecast)
    }

    fn transport_error(&self, url: &str, e: reqwest::Error) -> Error {
        if e.is_timeout() {
            Error::Timeout(format!("{} after {}ms", url, self.timeout_ms))
        } else {
            Error::Http(format!("HTTP error for {}: {}", url, e))
        }
    }
}

#[async_trait]
impl ForecastSource for SmhiClient {
    async fn fetch(&self, coordinate: &Coordinate) -> Result<Forecast, Error> {
        self.fetch_forecast(coordinate).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::net::TcpListener;

    const SAMPLE_BODY: &str = r#"{
        "approvedTime": "2016-01-18T16:25:14Z",
        "referenceTime": "2016-01-18T14:00:00Z",
        "geometry": {"type": "Point", "coordinates": [[16.017767, 57.999628]]},
        "timeSeries": [
            {"validTime": "2016-01-18T15:00:00Z",
             "parameters": [{"name": "t", "levelType": "hl", "level": 2, "unit": "Cel", "values": [-4.2]}]}
        ]
    }"#;

    fn client_for(base_url: &str, timeout_ms: u64) -> SmhiClient {
        SmhiClient::new(&HttpConfig {
            timeout_ms,
            base_url: base_url.to_string(),
            ..HttpConfig::default()
        })
        .expect("client should build")
    }

    #[test]
    fn test_point_url_uses_api_precision() {
        let client = client_for(common::config::DEFAULT_BASE_URL, 5_000);

        assert_eq!(
            client.point_url(&Coordinate::new(16.017767, 57.999628)),
            "http://opendata-download-metfcst.smhi.se/api/category/pmp2g/version/2/geotype/point/lon/16.017767/lat/57.999628/data.json"
        );
        assert_eq!(
            client.point_url(&Coordinate::new(12.5, 55.5)),
            "http://opendata-download-metfcst.smhi.se/api/category/pmp2g/version/2/geotype/point/lon/12.5/lat/55.5/data.json"
        );
        assert_eq!(
            client.point_url(&Coordinate::new(16.0177671, 57.9996284)),
            client.point_url(&Coordinate::new(16.017767, 57.999628))
        );
    }

    #[tokio::test]
    async fn test_fetch_decodes_successful_response() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock(
                "GET",
                "/api/category/pmp2g/version/2/geotype/point/lon/16.017767/lat/57.999628/data.json",
            )
            .match_header("accept", "application/json")
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(SAMPLE_BODY)
            .create_async()
            .await;

        let client = client_for(&server.url(), 5_000);
        let forecast = client
            .fetch_forecast(&Coordinate::new(16.017767, 57.999628))
            .await
            .expect("fetch should succeed");

        mock.assert_async().await;
        assert_eq!(forecast.len(), 1);
        assert_eq!(forecast.snapshots()[0].value("t"), Some(-4.2));
    }

    #[tokio::test]
    async fn test_fetch_non_success_status_is_transport_error() {
        let mut server = mockito::Server::new_async().await;
        let _mock = server
            .mock("GET", mockito::Matcher::Any)
            .with_status(503)
            .with_body("maintenance")
            .create_async()
            .await;

        let client = client_for(&server.url(), 5_000);
        let err = client
            .fetch_forecast(&Coordinate::new(10.0, 60.0))
            .await
            .unwrap_err();
        match err {
            Error::Http(msg) => assert!(msg.contains("503")),
            other => panic!("expected Http error, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_fetch_empty_body_is_transport_error() {
        let mut server = mockito::Server::new_async().await;
        let _mock = server
            .mock("GET", mockito::Matcher::Any)
            .with_status(200)
            .with_body("")
            .create_async()
            .await;

        let client = client_for(&server.url(), 5_000);
        let err = client
            .fetch_forecast(&Coordinate::new(10.0, 60.0))
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Http(_)));
    }

    #[tokio::test]
    async fn test_fetch_malformed_body_is_decode_error() {
        let mut server = mockito::Server::new_async().await;
        let _mock = server
            .mock("GET", mockito::Matcher::Any)
            .with_status(200)
            .with_body(r#"{"timeSeries": "soon"}"#)
            .create_async()
            .await;

        let client = client_for(&server.url(), 5_000);
        let err = client
            .fetch_forecast(&Coordinate::new(10.0, 60.0))
            .await
            .unwrap_err();
        match err {
            Error::Decode(msg) => assert!(msg.contains("/lon/10/lat/60/")),
            other => panic!("expected Decode error, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_fetch_deadline_expiry_is_timeout() {
        // Accepts connections and never answers.
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            let mut held = Vec::new();
            while let Ok((socket, _)) = listener.accept().await {
                held.push(socket);
            }
        });

        let client = client_for(&format!("http://{}", addr), 200);
        let err = client
            .fetch_forecast(&Coordinate::new(10.0, 60.0))
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Timeout(_)), "got {err:?}");
    }

    #[tokio::test]
    async fn test_fetch_connection_refused_is_transport_error() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);

        let client = client_for(&format!("http://{}", addr), 2_000);
        let err = client
            .fetch_forecast(&Coordinate::new(10.0, 60.0))
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Http(_)), "got {err:?}");
    }
}
