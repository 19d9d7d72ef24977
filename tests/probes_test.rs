//! Integration tests for the vulnerability probe suite

mod common;

use common::{probe_context, probe_context_with, synthetic_context, test_client, test_config};
use std::sync::Arc;
use std::time::Duration;
use vigil::config::AuditConfig;
use vigil::models::Severity;
use vigil::scanner::vulns::admin_paths::AdminPathProbe;
use vigil::scanner::vulns::brute_force::BruteForceProbe;
use vigil::scanner::vulns::csrf::CsrfProbe;
use vigil::scanner::vulns::reflected::ReflectedProbe;
use vigil::scanner::vulns::{Probe, ProbeSuite};
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

// -- reflected input --

#[tokio::test]
async fn unescaped_echo_is_reported() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/"))
        .and(query_param("q", "<vigilrx9k2>"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_string("<html>You searched for <vigilrx9k2></html>"),
        )
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200).set_body_string("<html>home</html>"))
        .mount(&server)
        .await;

    let (client, ctx) = probe_context(&server.uri()).await;
    let findings = ReflectedProbe.run(&client, &ctx).await.expect("probe");

    assert_eq!(findings.len(), 1);
    assert_eq!(findings[0].id, "reflected-input-q");
    assert_eq!(findings[0].severity, Severity::High);
}

#[tokio::test]
async fn escaped_echo_is_not_reported() {
    let server = MockServer::start().await;

    // Server HTML-encodes the marker before echoing
    Mock::given(method("GET"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_string("<html>You searched for &lt;vigilrx9k2&gt;</html>"),
        )
        .mount(&server)
        .await;

    let (client, ctx) = probe_context(&server.uri()).await;
    let findings = ReflectedProbe.run(&client, &ctx).await.expect("probe");
    assert!(findings.is_empty());
}

// -- csrf posture --

#[tokio::test]
async fn tokenless_form_without_defenses_is_vulnerable() {
    let ctx = synthetic_context(
        "http://127.0.0.1:1",
        r#"<form method="post" action="/submit"><input name="email"></form>"#,
        &[],
    );
    let config = test_config();
    let client = test_client(&config);

    let findings = CsrfProbe.run(&client, &ctx).await.expect("probe");
    assert_eq!(findings.len(), 1);
    assert_eq!(findings[0].id, "csrf-posture-missing-token");
    assert_eq!(findings[0].severity, Severity::Medium);
}

#[tokio::test]
async fn csp_form_action_downgrades_to_informational() {
    let ctx = synthetic_context(
        "http://127.0.0.1:1",
        r#"<form method="post" action="/submit"><input name="email"></form>"#,
        &[("content-security-policy", "form-action 'self'")],
    );
    let config = test_config();
    let client = test_client(&config);

    let findings = CsrfProbe.run(&client, &ctx).await.expect("probe");
    assert_eq!(findings.len(), 1);
    assert_eq!(findings[0].severity, Severity::Info);
}

#[tokio::test]
async fn formless_page_yields_nothing() {
    let ctx = synthetic_context("http://127.0.0.1:1", "<html><p>static</p></html>", &[]);
    let config = test_config();
    let client = test_client(&config);

    let findings = CsrfProbe.run(&client, &ctx).await.expect("probe");
    assert!(findings.is_empty());
}

// -- login rate limiting --

#[tokio::test]
async fn block_on_final_attempt_reports_rate_limit_ok_only() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/login"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_string(r#"<form><input type="password" name="pw"></form>"#),
        )
        .mount(&server)
        .await;
    // First three attempts rejected, fourth explicitly blocked
    Mock::given(method("POST"))
        .and(path("/login"))
        .respond_with(ResponseTemplate::new(401))
        .up_to_n_times(3)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/login"))
        .respond_with(ResponseTemplate::new(429))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&server)
        .await;

    let (client, ctx) = probe_context(&server.uri()).await;
    let findings = BruteForceProbe.run(&client, &ctx).await.expect("probe");

    assert_eq!(findings.len(), 1);
    assert_eq!(findings[0].id, "login-rate-limit-ok");
    assert_eq!(findings[0].severity, Severity::Info);
}

#[tokio::test]
async fn unthrottled_login_is_a_high_finding() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/login"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_string(r#"<form><input type="password" name="pw"></form>"#),
        )
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/login"))
        .respond_with(ResponseTemplate::new(401))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&server)
        .await;

    let (client, ctx) = probe_context(&server.uri()).await;
    let findings = BruteForceProbe.run(&client, &ctx).await.expect("probe");

    assert_eq!(findings.len(), 1);
    assert_eq!(findings[0].id, "login-rate-limit-missing");
    assert_eq!(findings[0].severity, Severity::High);
}

#[tokio::test]
async fn unresponsive_login_endpoint_is_not_flagged() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/login"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_string(r#"<form><input type="password" name="pw"></form>"#),
        )
        .mount(&server)
        .await;
    // Every attempt stalls past the client timeout; no status is observed
    Mock::given(method("POST"))
        .and(path("/login"))
        .respond_with(ResponseTemplate::new(401).set_delay(Duration::from_secs(3)))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&server)
        .await;

    let config = AuditConfig {
        http_timeout_secs: 1,
        connect_timeout_secs: 1,
        ..AuditConfig::default()
    };
    let (client, ctx) = probe_context_with(config, &server.uri()).await;
    let findings = BruteForceProbe.run(&client, &ctx).await.expect("probe");
    assert!(findings.is_empty());
}

// -- admin path discovery --

#[tokio::test]
async fn styled_error_pages_are_suppressed_by_the_baseline() {
    let server = MockServer::start().await;

    // Catch-all 200 with a custom error page, including for sensitive paths
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200).set_body_string(
            "<!DOCTYPE html><html><body><h1>Oops, page not found</h1></body></html>",
        ))
        .mount(&server)
        .await;

    let (client, ctx) = probe_context(&server.uri()).await;
    let findings = AdminPathProbe.run(&client, &ctx).await.expect("probe");
    assert!(findings.is_empty());
}

#[tokio::test]
async fn path_discovery_runs_inside_the_spawned_suite() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/phpinfo.php"))
        .respond_with(ResponseTemplate::new(200).set_body_string(
            "<html><h1>PHP Version 8.1.2</h1><table>phpinfo()</table></html>",
        ))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(404).set_body_string("not here"))
        .mount(&server)
        .await;

    let (client, ctx) = probe_context(&server.uri()).await;
    let mut suite = ProbeSuite::new();
    suite.register(Arc::new(AdminPathProbe));

    let findings = suite.run_all(&client, ctx).await;
    assert_eq!(findings.len(), 1);
    assert_eq!(findings[0].id, "exposed-path-phpinfo-php");
}

#[tokio::test]
async fn real_phpinfo_page_is_reported() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/phpinfo.php"))
        .respond_with(ResponseTemplate::new(200).set_body_string(
            "<html><h1>PHP Version 8.1.2</h1><table>phpinfo()</table></html>",
        ))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(404).set_body_string("not here"))
        .mount(&server)
        .await;

    let (client, ctx) = probe_context(&server.uri()).await;
    let findings = AdminPathProbe.run(&client, &ctx).await.expect("probe");

    assert_eq!(findings.len(), 1);
    assert_eq!(findings[0].id, "exposed-path-phpinfo-php");
    assert_eq!(findings[0].severity, Severity::High);
}
