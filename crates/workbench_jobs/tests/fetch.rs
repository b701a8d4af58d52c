use std::time::Duration;

use url::Url;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};
use workbench_jobs::{FailureKind, FetchSettings, Fetcher, JobMonitor, ReqwestFetcher};

fn url(server: &MockServer, route: &str) -> Url {
    Url::parse(&format!("{}{route}", server.uri())).unwrap()
}

#[tokio::test]
async fn fetcher_returns_body_and_reports_progress() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/shape.shp"))
        .respond_with(
            ResponseTemplate::new(200).set_body_raw("sphere(0, 0, 0, 1, 255, 0, 0, 1)", "text/plain"),
        )
        .mount(&server)
        .await;

    let fetcher = ReqwestFetcher::new(FetchSettings::default());
    let monitor = JobMonitor::new();
    let target = url(&server, "/shape.shp");

    let output = fetcher.fetch(&target, &monitor).await.expect("fetch ok");
    assert_eq!(output.final_url, target.to_string());
    assert_eq!(output.redirect_count, 0);
    assert!(output.content_type.unwrap().starts_with("text/plain"));
    assert_eq!(output.bytes, b"sphere(0, 0, 0, 1, 255, 0, 0, 1)");

    let progress = monitor.progress();
    assert!(progress.task.starts_with("Downloading"));
    assert_eq!(progress.done, output.bytes.len() as u64);
}

#[tokio::test]
async fn fetcher_fails_on_http_status() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/missing.shp"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&server)
        .await;

    let fetcher = ReqwestFetcher::new(FetchSettings::default());
    let err = fetcher
        .fetch(&url(&server, "/missing.shp"), &JobMonitor::new())
        .await
        .unwrap_err();
    assert_eq!(err.kind, FailureKind::HttpStatus(404));
}

#[tokio::test]
async fn fetcher_times_out_on_slow_response() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/slow"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_delay(Duration::from_millis(250))
                .set_body_string("slow"),
        )
        .mount(&server)
        .await;

    let settings = FetchSettings {
        request_timeout: Duration::from_millis(50),
        ..FetchSettings::default()
    };
    let fetcher = ReqwestFetcher::new(settings);
    let err = fetcher
        .fetch(&url(&server, "/slow"), &JobMonitor::new())
        .await
        .unwrap_err();
    assert_eq!(err.kind, FailureKind::Timeout);
}

#[tokio::test]
async fn fetcher_rejects_too_large_response() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/large"))
        .respond_with(ResponseTemplate::new(200).set_body_string("01234567890"))
        .mount(&server)
        .await;

    let settings = FetchSettings {
        max_bytes: 10,
        ..FetchSettings::default()
    };
    let fetcher = ReqwestFetcher::new(settings);
    let err = fetcher
        .fetch(&url(&server, "/large"), &JobMonitor::new())
        .await
        .unwrap_err();
    assert_eq!(
        err.kind,
        FailureKind::TooLarge {
            max_bytes: 10,
            actual: Some(11)
        }
    );
}

#[tokio::test]
async fn fetcher_enforces_content_type_allow_list() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/page"))
        .respond_with(ResponseTemplate::new(200).set_body_raw("<html/>", "text/html"))
        .mount(&server)
        .await;

    let settings = FetchSettings {
        allowed_content_types: vec!["text/plain".to_string()],
        ..FetchSettings::default()
    };
    let fetcher = ReqwestFetcher::new(settings);
    let err = fetcher
        .fetch(&url(&server, "/page"), &JobMonitor::new())
        .await
        .unwrap_err();
    assert_eq!(
        err.kind,
        FailureKind::UnsupportedContentType {
            content_type: "text/html".to_string()
        }
    );
}

#[tokio::test]
async fn cancelled_monitor_stops_fetch() {
    let server = MockServer::start().await;
    let fetcher = ReqwestFetcher::new(FetchSettings::default());
    let monitor = JobMonitor::new();
    monitor.cancel();

    let err = fetcher
        .fetch(&url(&server, "/anything"), &monitor)
        .await
        .unwrap_err();
    assert_eq!(err.kind, FailureKind::Cancelled);
}
