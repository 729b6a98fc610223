use geojson::{Feature, Geometry};
use std::sync::mpsc;
use tokio::task::AbortHandle;

/// Failure taxonomy for the site fetch. `Http`, `Decode` and `Schema`
/// cover the response itself; `Transport` covers failures below the HTTP
/// layer (connect, read).
#[derive(Debug, thiserror::Error)]
pub enum FetchError {
    #[error("endpoint returned HTTP status {status}")]
    Http { status: u16 },
    #[error("response body is not valid JSON: {0}")]
    Decode(#[from] serde_json::Error),
    #[error("response has no usable `sites` field")]
    Schema,
    #[error("request failed: {0}")]
    Transport(#[from] reqwest::Error),
}

pub type FetchResult = Result<Vec<Feature>, FetchError>;

/// Fetch one project's site collection and normalize it into features.
///
/// Issues a single GET with no retry, caching or timeout of its own.
/// Callers that care about overlapping requests must serialize their own
/// invocations.
pub async fn fetch_site_features(client: &reqwest::Client, url: &str) -> FetchResult {
    tracing::debug!(url, "fetching site data");
    let response = client.get(url).send().await?;

    let status = response.status();
    if !status.is_success() {
        return Err(FetchError::Http {
            status: status.as_u16(),
        });
    }

    let body = response.bytes().await?;
    parse_site_features(&body)
}

/// Decode a response body into site features. The body must be JSON with
/// a `sites` array of records each carrying a `geometry` object and a
/// `properties` object; both are copied verbatim into the feature.
pub fn parse_site_features(body: &[u8]) -> FetchResult {
    let document: serde_json::Value = serde_json::from_slice(body)?;
    let sites = document
        .get("sites")
        .and_then(|v| v.as_array())
        .ok_or(FetchError::Schema)?;

    sites.iter().map(site_to_feature).collect()
}

fn site_to_feature(site: &serde_json::Value) -> Result<Feature, FetchError> {
    let geometry = site
        .get("geometry")
        .cloned()
        .and_then(|g| Geometry::from_json_value(g).ok())
        .ok_or(FetchError::Schema)?;
    let properties = site
        .get("properties")
        .and_then(|p| p.as_object())
        .cloned()
        .ok_or(FetchError::Schema)?;

    Ok(Feature {
        bbox: None,
        geometry: Some(geometry),
        id: None,
        properties: Some(properties),
        foreign_members: None,
    })
}

/// An in-flight fetch bound to the host's lifetime. The outcome arrives
/// over a channel polled by the UI loop; aborting (or dropping the
/// handle) detaches the continuation so it can never touch dead state.
pub struct FetchHandle {
    rx: mpsc::Receiver<FetchResult>,
    abort: AbortHandle,
}

impl FetchHandle {
    /// Non-blocking poll for the fetch outcome. Returns None while the
    /// request is still in flight or after the task was aborted.
    pub fn poll(&mut self) -> Option<FetchResult> {
        self.rx.try_recv().ok()
    }
}

impl Drop for FetchHandle {
    fn drop(&mut self) {
        self.abort.abort();
    }
}

/// Spawn the fetch on a tokio runtime and hand back its lifetime handle
pub fn spawn_fetch(runtime: &tokio::runtime::Handle, url: String) -> FetchHandle {
    let (tx, rx) = mpsc::channel();
    let task = runtime.spawn(async move {
        let client = reqwest::Client::new();
        let result = fetch_site_features(&client, &url).await;
        if let Err(ref e) = result {
            tracing::error!(error = %e, "site fetch failed");
        }
        // Receiver may be gone if the view was torn down; that is fine
        let _ = tx.send(result);
    });
    FetchHandle {
        rx,
        abort: task.abort_handle(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};

    const SCENARIO_BODY: &str = r#"{
        "sites": [
            {
                "geometry": {
                    "type": "Polygon",
                    "coordinates": [[[10,10],[10,20],[20,20],[20,10],[10,10]]]
                },
                "properties": { "description": "Plot A" }
            }
        ]
    }"#;

    #[test]
    fn parses_every_site_record() {
        let body = r#"{
            "id": "proj",
            "sites": [
                { "geometry": { "type": "Polygon", "coordinates": [[[0,0],[0,1],[1,1],[0,0]]] },
                  "properties": { "description": "north plot" } },
                { "geometry": { "type": "MultiPolygon",
                                "coordinates": [[[[5,5],[5,6],[6,6],[5,5]]]] },
                  "properties": {} }
            ]
        }"#;
        let features = parse_site_features(body.as_bytes()).unwrap();
        assert_eq!(features.len(), 2);
        assert_eq!(
            features[0]
                .properties
                .as_ref()
                .unwrap()
                .get("description")
                .unwrap(),
            "north plot"
        );
        assert!(matches!(
            features[1].geometry.as_ref().unwrap().value,
            geojson::Value::MultiPolygon(_)
        ));
    }

    #[test]
    fn geometry_and_properties_survive_verbatim() {
        let features = parse_site_features(SCENARIO_BODY.as_bytes()).unwrap();
        assert_eq!(features.len(), 1);
        let geometry = features[0].geometry.as_ref().unwrap();
        match &geometry.value {
            geojson::Value::Polygon(rings) => {
                assert_eq!(rings[0][0], vec![10.0, 10.0]);
                assert_eq!(rings[0][2], vec![20.0, 20.0]);
            }
            other => panic!("unexpected geometry {other:?}"),
        }
    }

    #[test]
    fn missing_sites_key_is_a_schema_error() {
        let err = parse_site_features(b"{}").unwrap_err();
        assert!(matches!(err, FetchError::Schema));
    }

    #[test]
    fn non_array_sites_is_a_schema_error() {
        let err = parse_site_features(br#"{ "sites": 7 }"#).unwrap_err();
        assert!(matches!(err, FetchError::Schema));
    }

    #[test]
    fn record_without_properties_is_a_schema_error() {
        let body = r#"{ "sites": [
            { "geometry": { "type": "Polygon", "coordinates": [[[0,0],[0,1],[1,1],[0,0]]] } }
        ] }"#;
        let err = parse_site_features(body.as_bytes()).unwrap_err();
        assert!(matches!(err, FetchError::Schema));
    }

    #[test]
    fn invalid_json_is_a_decode_error() {
        let err = parse_site_features(b"not json").unwrap_err();
        assert!(matches!(err, FetchError::Decode(_)));
    }

    /// One-shot HTTP server answering every connection with a fixed response
    async fn serve_once(response: &'static str) -> String {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            let (mut socket, _) = listener.accept().await.unwrap();
            let mut buf = [0u8; 2048];
            let _ = socket.read(&mut buf).await;
            let _ = socket.write_all(response.as_bytes()).await;
        });
        format!("http://{addr}/project/sites")
    }

    #[tokio::test]
    async fn http_failure_reports_status() {
        let url = serve_once(
            "HTTP/1.1 404 Not Found\r\ncontent-length: 0\r\nconnection: close\r\n\r\n",
        )
        .await;
        let client = reqwest::Client::new();
        let err = fetch_site_features(&client, &url).await.unwrap_err();
        match err {
            FetchError::Http { status } => assert_eq!(status, 404),
            other => panic!("unexpected error {other:?}"),
        }
    }

    #[tokio::test]
    async fn successful_fetch_yields_features() {
        let body = SCENARIO_BODY;
        let response: &'static str = Box::leak(
            format!(
                "HTTP/1.1 200 OK\r\ncontent-type: application/json\r\ncontent-length: {}\r\nconnection: close\r\n\r\n{}",
                body.len(),
                body
            )
            .into_boxed_str(),
        );
        let url = serve_once(response).await;
        let client = reqwest::Client::new();
        let features = fetch_site_features(&client, &url).await.unwrap();
        assert_eq!(features.len(), 1);
    }

    #[tokio::test]
    async fn connection_failure_is_a_transport_error() {
        // Bind then drop to get a port nothing listens on
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);

        let client = reqwest::Client::new();
        let err = fetch_site_features(&client, &format!("http://{addr}/"))
            .await
            .unwrap_err();
        assert!(matches!(err, FetchError::Transport(_)));
    }
}
