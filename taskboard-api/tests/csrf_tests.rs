/// Integration tests for CSRF enforcement
///
/// With `AUTH_CSRF_AUTHENTICATION=true`, authenticated unsafe requests need a
/// matching CSRF cookie/header pair whichever way the access token arrives.

mod common;

use axum::body::Body;
use axum::http::{header, Request, StatusCode};
use common::{json_request, TestContext};
use serde_json::json;

const CSRF_ON: [(&str, &str); 1] = [("AUTH_CSRF_AUTHENTICATION", "true")];

fn task_post(token: &str, csrf_cookie: Option<&str>, csrf_header: Option<&str>) -> Request<Body> {
    let mut builder = Request::builder()
        .method("POST")
        .uri("/api/tasks/")
        .header(header::AUTHORIZATION, format!("Bearer {}", token))
        .header(header::CONTENT_TYPE, "application/json");
    if let Some(cookie) = csrf_cookie {
        builder = builder.header(header::COOKIE, format!("csrftoken={}", cookie));
    }
    if let Some(value) = csrf_header {
        builder = builder.header("X-CSRFToken", value);
    }
    builder
        .body(Body::from(json!({ "title": "Buy milk" }).to_string()))
        .unwrap()
}

#[tokio::test]
async fn test_valid_token_without_csrf_is_forbidden() {
    let ctx = TestContext::with_env(&CSRF_ON);
    let (_, token) = ctx.user_with_token("a@x.com").await;

    let response = ctx.send(task_post(&token, None, None)).await;
    assert_eq!(response.status, StatusCode::FORBIDDEN);
    assert!(response.body["message"]
        .as_str()
        .unwrap()
        .starts_with("CSRF Failed"));

    let listed = ctx.send(json_request("GET", "/api/tasks/", Some(&token), None)).await;
    assert_eq!(listed.body.as_array().unwrap().len(), 0);
}

#[tokio::test]
async fn test_mismatched_csrf_pair_is_forbidden() {
    let ctx = TestContext::with_env(&CSRF_ON);
    let (_, token) = ctx.user_with_token("a@x.com").await;

    let response = ctx.send(task_post(&token, Some("abc"), Some("abd"))).await;
    assert_eq!(response.status, StatusCode::FORBIDDEN);

    let response = ctx.send(task_post(&token, Some("abc"), None)).await;
    assert_eq!(response.status, StatusCode::FORBIDDEN);

    let response = ctx.send(task_post(&token, None, Some("abc"))).await;
    assert_eq!(response.status, StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn test_matching_csrf_pair_passes() {
    let ctx = TestContext::with_env(&CSRF_ON);
    let (_, token) = ctx.user_with_token("a@x.com").await;

    let response = ctx.send(task_post(&token, Some("abc123"), Some("abc123"))).await;
    assert_eq!(response.status, StatusCode::CREATED);
}

#[tokio::test]
async fn test_safe_methods_are_not_checked() {
    let ctx = TestContext::with_env(&CSRF_ON);
    let (_, token) = ctx.user_with_token("a@x.com").await;

    let response = ctx.send(json_request("GET", "/api/tasks/", Some(&token), None)).await;
    assert_eq!(response.status, StatusCode::OK);

    let response = ctx.send(json_request("GET", "/api/auth/me/", Some(&token), None)).await;
    assert_eq!(response.status, StatusCode::OK);
}

#[tokio::test]
async fn test_cookie_session_with_csrf_from_login() {
    let ctx = TestContext::with_env(&CSRF_ON);
    ctx.register("a@x.com", "p12345").await;
    let login = ctx.login("a@x.com", "p12345").await;
    assert_eq!(login.status, StatusCode::OK);

    let access = login.cookie("access_token").unwrap();
    let csrf = login.cookie("csrftoken").unwrap();

    let request = |with_header: bool| {
        let mut builder = Request::builder()
            .method("POST")
            .uri("/api/tasks/")
            .header(header::CONTENT_TYPE, "application/json")
            .header(
                header::COOKIE,
                format!("access_token={}; csrftoken={}", access, csrf),
            );
        if with_header {
            builder = builder.header("X-CSRFToken", csrf.as_str());
        }
        builder
            .body(Body::from(json!({ "title": "From browser" }).to_string()))
            .unwrap()
    };

    assert_eq!(ctx.send(request(false)).await.status, StatusCode::FORBIDDEN);
    assert_eq!(ctx.send(request(true)).await.status, StatusCode::CREATED);
}

#[tokio::test]
async fn test_invalid_token_is_unauthorized_before_csrf() {
    let ctx = TestContext::with_env(&CSRF_ON);

    let response = ctx.send(task_post("garbage", None, None)).await;
    assert_eq!(response.status, StatusCode::UNAUTHORIZED);

    let response = ctx
        .send(json_request("POST", "/api/tasks/", None, Some(json!({ "title": "x" }))))
        .await;
    assert_eq!(response.status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_policy_off_skips_csrf() {
    let ctx = TestContext::new();
    let (_, token) = ctx.user_with_token("a@x.com").await;

    let response = ctx.send(task_post(&token, None, None)).await;
    assert_eq!(response.status, StatusCode::CREATED);
}

#[tokio::test]
async fn test_untrusted_origin_is_forbidden() {
    let ctx = TestContext::with_env(&[
        ("AUTH_CSRF_AUTHENTICATION", "true"),
        ("CSRF_TRUSTED_ORIGINS", "https://board.example.com"),
    ]);
    let (_, token) = ctx.user_with_token("a@x.com").await;

    let mut request = task_post(&token, Some("abc"), Some("abc"));
    request
        .headers_mut()
        .insert(header::ORIGIN, "https://evil.example.com".parse().unwrap());
    assert_eq!(ctx.send(request).await.status, StatusCode::FORBIDDEN);

    let mut request = task_post(&token, Some("abc"), Some("abc"));
    request
        .headers_mut()
        .insert(header::ORIGIN, "https://board.example.com".parse().unwrap());
    assert_eq!(ctx.send(request).await.status, StatusCode::CREATED);
}

#[tokio::test]
async fn test_public_auth_endpoints_skip_csrf() {
    let ctx = TestContext::with_env(&CSRF_ON);

    assert_eq!(ctx.register("a@x.com", "p12345").await.status, StatusCode::CREATED);
    assert_eq!(ctx.login("a@x.com", "p12345").await.status, StatusCode::OK);
}

#[tokio::test]
async fn test_csrf_form_field_in_cookie_session() {
    let ctx = TestContext::with_env(&CSRF_ON);
    ctx.register("a@x.com", "p12345").await;
    let login = ctx.login("a@x.com", "p12345").await;
    let access = login.cookie("access_token").unwrap();
    let csrf = login.cookie("csrftoken").unwrap();

    let bearer = login.body["access"].as_str().unwrap();
    let created = ctx
        .send(task_post(bearer, Some(csrf.as_str()), Some(csrf.as_str())))
        .await;
    assert_eq!(created.status, StatusCode::CREATED);
    let uri = format!("/api/tasks/{}/", created.body["id"].as_str().unwrap());

    let delete = |field: &str| {
        Request::builder()
            .method("DELETE")
            .uri(uri.as_str())
            .header(header::CONTENT_TYPE, "application/x-www-form-urlencoded")
            .header(
                header::COOKIE,
                format!("access_token={}; csrftoken={}", access, csrf),
            )
            .body(Body::from(format!("csrfmiddlewaretoken={}", field)))
            .unwrap()
    };

    assert_eq!(ctx.send(delete("wrong")).await.status, StatusCode::FORBIDDEN);
    assert_eq!(ctx.send(delete(&csrf)).await.status, StatusCode::NO_CONTENT);
}
