//! Web front end: upload a CSV, pick the review column, analyse, browse and
//! download the labeled results.
//!
//! There is a single in-memory session shared by every client. A new upload
//! clears previous results; a finished analysis replaces them in one write.

mod handlers;
mod pages;
mod state;

use axum::extract::DefaultBodyLimit;
use axum::routing::{get, post};
use axum::Router;
use tokio::net::TcpListener;

pub use handlers::{AppError, DOWNLOAD_FILENAME};
pub use pages::PAGE_TITLE;
pub use state::{AppState, ProgressReport, RunGuard, RunTracker, Session};

use crate::core::Result;

/// Routes for the app, with uploads capped at `max_upload_bytes`.
pub fn router(state: AppState) -> Router {
    let upload_limit = state.config().max_upload_bytes;

    Router::new()
        .route("/", get(handlers::index))
        .route("/upload", post(handlers::upload))
        .route("/analyze", post(handlers::analyze))
        .route("/progress", get(handlers::progress))
        .route("/download", get(handlers::download))
        .layer(DefaultBodyLimit::max(upload_limit))
        .with_state(state)
}

/// Bind the configured address and serve until the process is stopped.
pub async fn serve(state: AppState) -> Result<()> {
    let address = state.config().socket_address();
    let listener = TcpListener::bind(address.as_str()).await?;
    tracing::info!(address = %listener.local_addr()?, "serving review sentiment analyzer");

    axum::serve(listener, router(state)).await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use axum::body::Body;
    use axum::http::{header, Request, StatusCode};
    use tower::ServiceExt;

    use super::*;
    use crate::core::AppConfig;
    use crate::pipelines::sentiment::{LabelScore, SentimentScorer};

    const BOUNDARY: &str = "review-sentiment-boundary";

    /// Positive when the text mentions "great", negative for "terrible".
    struct KeywordScorer;

    impl SentimentScorer for KeywordScorer {
        fn scores(&self, text: &str) -> crate::core::Result<Vec<LabelScore>> {
            let text = text.to_lowercase();
            let (neg, neu, pos) = if text.contains("great") {
                (0.05, 0.15, 0.8)
            } else if text.contains("terrible") {
                (0.9, 0.05, 0.05)
            } else {
                (0.2, 0.6, 0.2)
            };
            Ok(vec![
                LabelScore::new("negative", neg),
                LabelScore::new("neutral", neu),
                LabelScore::new("positive", pos),
            ])
        }
    }

    fn state_with(config: AppConfig) -> AppState {
        AppState::new(Arc::new(KeywordScorer), config).unwrap()
    }

    fn state() -> AppState {
        state_with(AppConfig::default())
    }

    fn upload_request(csv: &str) -> Request<Body> {
        let body = format!(
            "--{BOUNDARY}\r\n\
             Content-Disposition: form-data; name=\"file\"; filename=\"reviews.csv\"\r\n\
             Content-Type: text/csv\r\n\r\n\
             {csv}\r\n\
             --{BOUNDARY}--\r\n"
        );
        Request::builder()
            .method("POST")
            .uri("/upload")
            .header(
                header::CONTENT_TYPE,
                format!("multipart/form-data; boundary={BOUNDARY}"),
            )
            .body(Body::from(body))
            .unwrap()
    }

    fn analyze_request(column: &str) -> Request<Body> {
        Request::builder()
            .method("POST")
            .uri("/analyze")
            .header(header::CONTENT_TYPE, "application/x-www-form-urlencoded")
            .body(Body::from(format!("column={column}")))
            .unwrap()
    }

    fn get(uri: &str) -> Request<Body> {
        Request::builder().uri(uri).body(Body::empty()).unwrap()
    }

    async fn body_text(response: axum::response::Response) -> String {
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        String::from_utf8(bytes.to_vec()).unwrap()
    }

    const REVIEWS: &str = "id,review\n1,Great product!\n2,\"Terrible, broke immediately\"\n3,\n";

    #[tokio::test]
    async fn index_shows_upload_form() {
        let response = router(state()).oneshot(get("/")).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let html = body_text(response).await;
        assert!(html.contains(PAGE_TITLE));
        assert!(html.contains("name=\"file\""));
    }

    #[tokio::test]
    async fn upload_then_analyze_then_download() {
        let state = state();

        let response = router(state.clone())
            .oneshot(upload_request(REVIEWS))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::SEE_OTHER);

        let html = body_text(router(state.clone()).oneshot(get("/")).await.unwrap()).await;
        assert!(html.contains("Loaded 3 reviews"));
        assert!(html.contains("Data Preview"));

        let response = router(state.clone())
            .oneshot(analyze_request("review"))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::SEE_OTHER);

        let html = body_text(router(state.clone()).oneshot(get("/")).await.unwrap()).await;
        assert!(html.contains("Analysis complete!"));
        assert!(html.contains("Total Reviews"));
        assert!(html.contains("33.3%"));

        let response = router(state.clone()).oneshot(get("/download")).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let disposition = response.headers()[header::CONTENT_DISPOSITION]
            .to_str()
            .unwrap()
            .to_string();
        assert!(disposition.contains(DOWNLOAD_FILENAME));
        let csv = body_text(response).await;
        let lines: Vec<&str> = csv.lines().collect();
        assert_eq!(lines[0], "id,review,sentiment,confidence");
        assert_eq!(lines[1], "1,Great product!,positive,0.8");
        assert_eq!(lines[2], "2,\"Terrible, broke immediately\",negative,0.9");
        assert_eq!(lines[3], "3,,neutral,0.5");

        let progress = body_text(router(state).oneshot(get("/progress")).await.unwrap()).await;
        let progress: serde_json::Value = serde_json::from_str(&progress).unwrap();
        assert_eq!(progress["running"], false);
        assert_eq!(progress["completed"], 3);
        assert_eq!(progress["total"], 3);
        assert_eq!(progress["fraction"], 1.0);
    }

    #[tokio::test]
    async fn results_can_be_filtered() {
        let state = state();
        router(state.clone()).oneshot(upload_request(REVIEWS)).await.unwrap();
        router(state.clone())
            .oneshot(analyze_request("review"))
            .await
            .unwrap();

        let html = body_text(
            router(state)
                .oneshot(get("/?sentiment=negative"))
                .await
                .unwrap(),
        )
        .await;
        assert!(html.contains("<option value=\"negative\" selected>"));
        // Once in the preview, once more in the filtered results.
        assert_eq!(html.matches("<td>Terrible, broke immediately</td>").count(), 2);
        assert_eq!(html.matches("<td>Great product!</td>").count(), 1);
    }

    #[tokio::test]
    async fn malformed_upload_is_rejected() {
        let state = state();
        let response = router(state.clone())
            .oneshot(upload_request("a,b\n1,2,3\n"))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert!(state.session.read().await.table.is_none());
    }

    #[tokio::test]
    async fn oversized_upload_is_rejected() {
        let config = AppConfig {
            max_upload_bytes: 64,
            ..AppConfig::default()
        };
        let csv = format!("review\n{}\n", "x".repeat(256));
        let response = router(state_with(config))
            .oneshot(upload_request(&csv))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::PAYLOAD_TOO_LARGE);
    }

    #[tokio::test]
    async fn analyze_needs_a_table_and_a_known_column() {
        let state = state();
        let response = router(state.clone())
            .oneshot(analyze_request("review"))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);

        router(state.clone()).oneshot(upload_request(REVIEWS)).await.unwrap();
        let response = router(state.clone())
            .oneshot(analyze_request("body"))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert!(state.session.read().await.results.is_none());
    }

    #[tokio::test]
    async fn second_run_is_refused_while_one_is_active() {
        let state = state();
        router(state.clone()).oneshot(upload_request(REVIEWS)).await.unwrap();

        let _active = state.run.try_start(10).unwrap();
        let response = router(state.clone())
            .oneshot(analyze_request("review"))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::CONFLICT);

        let progress = body_text(router(state).oneshot(get("/progress")).await.unwrap()).await;
        assert!(progress.contains("\"running\":true"));
    }

    #[tokio::test]
    async fn download_without_results_is_not_found() {
        let response = router(state()).oneshot(get("/download")).await.unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn new_upload_clears_results() {
        let state = state();
        router(state.clone()).oneshot(upload_request(REVIEWS)).await.unwrap();
        router(state.clone())
            .oneshot(analyze_request("review"))
            .await
            .unwrap();
        assert!(state.session.read().await.results.is_some());

        router(state.clone())
            .oneshot(upload_request("review\nfine\n"))
            .await
            .unwrap();
        let session = state.session.read().await;
        assert!(session.results.is_none());
        assert_eq!(session.table.as_ref().map(|t| t.len()), Some(1));
    }
}
