use axum::{extract::Request, http::header, middleware::Next, response::IntoResponse};

/// Paths that answer with HTML for a browser rather than JSON.
const HTML_PREFIXES: &[&str] = &["/admin", "/api/auth/callback"];

pub async fn security_headers_middleware(req: Request, next: Next) -> impl IntoResponse {
    let path = req.uri().path();
    let serves_html = HTML_PREFIXES.iter().any(|prefix| path.starts_with(prefix));

    let mut response = next.run(req).await;
    let headers = response.headers_mut();

    headers.insert(
        header::X_CONTENT_TYPE_OPTIONS,
        header::HeaderValue::from_static("nosniff"),
    );
    headers.insert(
        header::STRICT_TRANSPORT_SECURITY,
        header::HeaderValue::from_static("max-age=31536000; includeSubDomains"),
    );
    headers.insert(
        header::REFERRER_POLICY,
        header::HeaderValue::from_static("no-referrer"),
    );
    headers.insert(
        header::X_FRAME_OPTIONS,
        header::HeaderValue::from_static("DENY"),
    );

    if serves_html {
        // Pages are static markup with inline styles only; no scripts.
        headers.insert(
            header::CONTENT_SECURITY_POLICY,
            header::HeaderValue::from_static(
                "default-src 'self'; \
                 script-src 'none'; \
                 style-src 'self' 'unsafe-inline'; \
                 img-src 'self' data:; \
                 frame-ancestors 'none'",
            ),
        );
        // Session-bearing pages must not be cached by intermediaries.
        headers.insert(
            header::CACHE_CONTROL,
            header::HeaderValue::from_static("no-store"),
        );
    } else {
        headers.insert(
            header::CONTENT_SECURITY_POLICY,
            header::HeaderValue::from_static("default-src 'none'; frame-ancestors 'none'"),
        );
    }

    response
}
