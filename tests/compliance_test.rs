//! Integration tests for the compliance check battery

mod common;

use common::{test_client, test_config};
use vigil::http::{fetch_page, FetchedPage};
use vigil::scanner::compliance::run_checks;
use vigil::target::Target;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

async fn fetch(server: &MockServer) -> (Target, FetchedPage) {
    let config = test_config();
    let client = test_client(&config);
    let target = Target::parse(&server.uri()).expect("target");
    let page = fetch_page(&client, &target, &config).await.expect("fetch");
    (target, page)
}

fn check<'a>(checks: &'a [vigil::models::ComplianceCheck], name: &str) -> &'a vigil::models::ComplianceCheck {
    checks
        .iter()
        .find(|c| c.name == name)
        .unwrap_or_else(|| panic!("no check named {name}"))
}

#[tokio::test]
async fn consent_banner_keyword_passes_with_fired_signal_in_detail() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/"))
        .respond_with(ResponseTemplate::new(200).set_body_string(
            "<html><body><div>We use cookies to improve your experience. \
             <button>Accept cookies</button></div></body></html>",
        ))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&server)
        .await;

    let config = test_config();
    let client = test_client(&config);
    let (target, page) = fetch(&server).await;

    let checks = run_checks(&client, &target, &page, &[]).await;
    let consent = check(&checks, "cookie-consent");
    assert!(consent.passed);
    assert!(consent.detail.contains("body keyword"));
}

#[tokio::test]
async fn silent_site_fails_consent_after_endpoint_probe() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/"))
        .respond_with(
            ResponseTemplate::new(200).set_body_string("<html><body>plain page</body></html>"),
        )
        .mount(&server)
        .await;
    // Endpoint probes all miss
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&server)
        .await;

    let config = test_config();
    let client = test_client(&config);
    let (target, page) = fetch(&server).await;

    let checks = run_checks(&client, &target, &page, &[]).await;
    let consent = check(&checks, "cookie-consent");
    assert!(!consent.passed);
}

#[tokio::test]
async fn consent_endpoint_rescues_a_passively_silent_page() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/"))
        .respond_with(
            ResponseTemplate::new(200).set_body_string("<html><body>plain page</body></html>"),
        )
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/cookie-policy"))
        .respond_with(ResponseTemplate::new(200).set_body_string("our cookie policy"))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&server)
        .await;

    let config = test_config();
    let client = test_client(&config);
    let (target, page) = fetch(&server).await;

    let checks = run_checks(&client, &target, &page, &[]).await;
    let consent = check(&checks, "cookie-consent");
    assert!(consent.passed);
    assert!(consent.detail.contains("consent endpoint"));
}

#[tokio::test]
async fn security_txt_requires_a_contact_field() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/"))
        .respond_with(ResponseTemplate::new(200).set_body_string("<html>home</html>"))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/.well-known/security.txt"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_string("Contact: mailto:security@example.com\nExpires: 2027-01-01T00:00:00Z"),
        )
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&server)
        .await;

    let config = test_config();
    let client = test_client(&config);
    let (target, page) = fetch(&server).await;

    let checks = run_checks(&client, &target, &page, &[]).await;
    assert!(check(&checks, "security-txt").passed);
}

#[tokio::test]
async fn legal_links_on_the_page_pass_the_notice_check() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/"))
        .respond_with(ResponseTemplate::new(200).set_body_string(
            r#"<html><body>This site uses cookies. <a href="/privacy-policy">Privacy</a> <a href="/terms">Terms</a></body></html>"#,
        ))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&server)
        .await;

    let config = test_config();
    let client = test_client(&config);
    let (target, page) = fetch(&server).await;

    let checks = run_checks(&client, &target, &page, &[]).await;
    let legal = check(&checks, "legal-notices");
    assert!(legal.passed);
    assert!(legal.detail.contains("privacy"));
}
