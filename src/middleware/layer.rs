use std::sync::Arc;

use axum::extract::{Request, State};
use axum::middleware::Next;
use axum::response::{IntoResponse, Redirect, Response};
use axum_extra::extract::CookieJar;

use super::config::PageGuard;
use super::cookies::JarCookieStore;
use super::error::AuthError;
use super::extractor::CurrentUser;
use crate::cookies::TOKEN_COOKIE_NAME;
use crate::guard::authorized;
use crate::types::User;

/// Gate server-rendered pages behind a session and a [`Requirement`](crate::Requirement).
///
/// Mount with [`axum::middleware::from_fn_with_state`]. Admitted requests get
/// a [`CurrentUser`] and a page-scoped [`ApiClient`](crate::ApiClient) in
/// their extensions; token cookies rotated by a refresh during the request
/// are written back on the response.
///
/// ```rust,ignore
/// let metrics = PageGuard::new(config.clone()).with_requirement(
///     Requirement::new()
///         .with_permissions(["metrics.list"])
///         .with_roles(["administrator"]),
/// );
///
/// let app = Router::new()
///     .route("/metrics", get(metrics_page))
///     .layer(axum::middleware::from_fn_with_state(metrics, require_access));
/// ```
pub async fn require_access(
    State(guard): State<PageGuard>,
    jar: CookieJar,
    mut request: Request,
    next: Next,
) -> Response {
    if jar.get(TOKEN_COOKIE_NAME).is_none_or(|c| c.value().is_empty()) {
        return Redirect::to(guard.sign_in_page()).into_response();
    }

    let store = Arc::new(JarCookieStore::new(jar));
    let client = guard.client(store.clone());

    let user = match client.get::<User>(&guard.config.me_path).await {
        Ok(user) => Arc::new(user),
        Err(e) if e.is_auth_failure() => {
            tracing::info!(error = %e, "Page session rejected");
            client.credentials().clear();
            return (store.jar(), Redirect::to(guard.sign_in_page())).into_response();
        }
        Err(e) => return (store.jar(), AuthError::from(e)).into_response(),
    };

    if !authorized(Some(&user), guard.requirement()) {
        tracing::debug!(email = %user.email, "Page requirement not met");
        return (store.jar(), Redirect::to(guard.forbidden_page())).into_response();
    }

    request.extensions_mut().insert(CurrentUser(user));
    request.extensions_mut().insert(client);

    let response = next.run(request).await;
    (store.jar(), response).into_response()
}

#[cfg(test)]
mod tests {
    use axum::Router;
    use axum::body::Body;
    use axum::http::header::{COOKIE, LOCATION, SET_COOKIE};
    use axum::http::{Request, StatusCode};
    use axum::routing::get;
    use serde_json::json;
    use tower::ServiceExt;
    use wiremock::matchers::{header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    use super::*;
    use crate::config::ClientConfig;
    use crate::guard::Requirement;

    async fn metrics_page(CurrentUser(user): CurrentUser) -> String {
        format!("Metrics for {}", user.email)
    }

    fn app(server: &MockServer) -> Router {
        let guard = PageGuard::new(ClientConfig::new(server.uri().parse().unwrap()))
            .with_requirement(
                Requirement::new()
                    .with_permissions(["metrics.list"])
                    .with_roles(["administrator"]),
            )
            .with_forbidden_redirect("/dashboard");

        Router::new()
            .route("/metrics", get(metrics_page))
            .layer(axum::middleware::from_fn_with_state(guard, require_access))
    }

    fn page_request(cookies: Option<&'static str>) -> Request<Body> {
        let mut builder = Request::builder().uri("/metrics");
        if let Some(cookies) = cookies {
            builder = builder.header(COOKIE, cookies);
        }
        builder.body(Body::empty()).unwrap()
    }

    fn set_cookies(response: &Response) -> Vec<String> {
        response
            .headers()
            .get_all(SET_COOKIE)
            .iter()
            .map(|v| v.to_str().unwrap().to_string())
            .collect()
    }

    async fn body_text(response: Response) -> String {
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        String::from_utf8(bytes.to_vec()).unwrap()
    }

    async fn mount_me(server: &MockServer, token: &str, roles: serde_json::Value) {
        Mock::given(method("GET"))
            .and(path("/me"))
            .and(header("authorization", format!("Bearer {token}").as_str()))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "email": "diego@example.com",
                "permissions": ["metrics.list"],
                "roles": roles
            })))
            .mount(server)
            .await;
    }

    #[tokio::test]
    async fn missing_cookie_redirects_to_sign_in() {
        let server = MockServer::start().await;
        let response = app(&server).oneshot(page_request(None)).await.unwrap();

        assert_eq!(response.status(), StatusCode::SEE_OTHER);
        assert_eq!(response.headers()[LOCATION], "/");
    }

    #[tokio::test]
    async fn authorized_user_sees_page() {
        let server = MockServer::start().await;
        mount_me(&server, "access-1", json!(["administrator"])).await;

        let response = app(&server)
            .oneshot(page_request(Some("auth.token=access-1; auth.refreshToken=refresh-1")))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        assert!(set_cookies(&response).is_empty());
        assert_eq!(body_text(response).await, "Metrics for diego@example.com");
    }

    #[tokio::test]
    async fn missing_role_redirects_to_forbidden_page() {
        let server = MockServer::start().await;
        mount_me(&server, "access-1", json!(["editor"])).await;

        let response = app(&server)
            .oneshot(page_request(Some("auth.token=access-1; auth.refreshToken=refresh-1")))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::SEE_OTHER);
        assert_eq!(response.headers()[LOCATION], "/dashboard");
    }

    #[tokio::test]
    async fn invalid_token_clears_cookies_and_redirects() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/me"))
            .respond_with(ResponseTemplate::new(401).set_body_json(json!({ "code": "token.invalid" })))
            .mount(&server)
            .await;

        let response = app(&server)
            .oneshot(page_request(Some("auth.token=access-1; auth.refreshToken=refresh-1")))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::SEE_OTHER);
        assert_eq!(response.headers()[LOCATION], "/");
        let cookies = set_cookies(&response);
        assert_eq!(cookies.len(), 2);
        assert!(cookies.iter().all(|c| c.contains("Max-Age=0")));
    }

    #[tokio::test]
    async fn expired_token_is_refreshed_during_render() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/me"))
            .and(header("authorization", "Bearer access-1"))
            .respond_with(ResponseTemplate::new(401).set_body_json(json!({ "code": "token.expired" })))
            .mount(&server)
            .await;
        mount_me(&server, "access-2", json!(["administrator"])).await;
        Mock::given(method("POST"))
            .and(path("/refresh"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "token": "access-2",
                "refreshToken": "refresh-2"
            })))
            .expect(1)
            .mount(&server)
            .await;

        let response = app(&server)
            .oneshot(page_request(Some("auth.token=access-1; auth.refreshToken=refresh-1")))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let cookies = set_cookies(&response);
        assert!(cookies.iter().any(|c| c.starts_with("auth.token=access-2")));
        assert!(cookies.iter().any(|c| c.starts_with("auth.refreshToken=refresh-2")));
    }

    #[tokio::test]
    async fn upstream_failure_is_internal_error() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/me"))
            .respond_with(ResponseTemplate::new(503))
            .mount(&server)
            .await;

        let response = app(&server)
            .oneshot(page_request(Some("auth.token=access-1; auth.refreshToken=refresh-1")))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }
}
