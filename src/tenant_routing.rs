//! Subdomain storefront routing.
//!
//! With subdomain routing enabled, `acme.example.com/products/42` is served
//! as `/tenants/acme/products/42`. The rewrite runs before the router so the
//! storefront routes only need to exist once under `/tenants/{slug}`.

use axum::{
    extract::{Request, State},
    http::{Uri, header::HOST, uri::PathAndQuery},
    middleware::Next,
    response::Response,
};
use regex::Regex;
use std::sync::{Arc, LazyLock};
use tracing::debug;

use crate::config::AppConfig;

/// Paths served as-is on every host
static PASSTHROUGH_PATH_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^/(api/|_next/|_static/|_vercel|media/|(docs|healthz)(/|$)|[\w-]+\.\w+)")
        .expect("Invalid regex")
});

/// Extract the tenant slug from a request host, if it is a tenant subdomain.
pub fn tenant_slug_from_host<'a>(host: &'a str, root_domain: &str) -> Option<&'a str> {
    let root_domain = root_domain.trim().trim_start_matches('.');
    if root_domain.is_empty() {
        return None;
    }

    let host = host.trim();
    let slug = strip_root_domain(host, root_domain).or_else(|| {
        // Allow a port on the host when the configured root domain has none
        if root_domain.contains(':') {
            return None;
        }
        let (bare_host, _port) = host.rsplit_once(':')?;
        strip_root_domain(bare_host, root_domain)
    })?;

    (!slug.is_empty() && !slug.contains('.')).then_some(slug)
}

fn strip_root_domain<'a>(host: &'a str, root_domain: &str) -> Option<&'a str> {
    let suffix_start = host.len().checked_sub(root_domain.len() + 1)?;
    if !host.is_char_boundary(suffix_start) {
        return None;
    }
    let (slug, suffix) = host.split_at(suffix_start);
    let suffix = suffix.strip_prefix('.')?;
    suffix.eq_ignore_ascii_case(root_domain).then_some(slug)
}

/// Rewrite a path (and query) onto the tenant storefront, unless it is a
/// passthrough path.
pub fn rewrite_path(slug: &str, path_and_query: &PathAndQuery) -> Option<String> {
    let path = path_and_query.path();
    if PASSTHROUGH_PATH_RE.is_match(path) {
        return None;
    }

    let mut rewritten = if path == "/" {
        format!("/tenants/{slug}")
    } else {
        format!("/tenants/{slug}{path}")
    };
    if let Some(query) = path_and_query.query() {
        rewritten.push('?');
        rewritten.push_str(query);
    }
    Some(rewritten)
}

/// Compute the rewritten URI for a request, if any.
pub fn rewrite_uri(config: &AppConfig, host: Option<&str>, uri: &Uri) -> Option<Uri> {
    if !config.subdomain_routing_enabled {
        return None;
    }

    let slug = tenant_slug_from_host(host?, &config.root_domain)?;
    let path_and_query = uri
        .path_and_query()
        .cloned()
        .unwrap_or_else(|| PathAndQuery::from_static("/"));
    let rewritten = rewrite_path(slug, &path_and_query)?;

    rewritten.parse().ok()
}

/// Middleware applying [`rewrite_uri`] ahead of routing.
pub async fn tenant_rewrite_middleware(
    State(config): State<Arc<AppConfig>>,
    mut request: Request,
    next: Next,
) -> Response {
    let host = request
        .headers()
        .get(HOST)
        .and_then(|value| value.to_str().ok())
        .map(str::to_string)
        .or_else(|| request.uri().host().map(str::to_string));

    if let Some(uri) = rewrite_uri(&config, host.as_deref(), request.uri()) {
        debug!(from = %request.uri(), to = %uri, "Rewriting tenant subdomain request");
        *request.uri_mut() = uri;
    }

    next.run(request).await
}
