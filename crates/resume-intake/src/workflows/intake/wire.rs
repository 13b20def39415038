use std::time::Duration;

const DETAIL_LIMIT: usize = 512;
const MAX_CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

/// Shared HTTP client for the storage and forms adapters. Every request is bounded by `timeout`.
pub fn http_client(timeout: Duration) -> Result<reqwest::Client, reqwest::Error> {
    reqwest::Client::builder()
        .timeout(timeout)
        .connect_timeout(timeout.min(MAX_CONNECT_TIMEOUT))
        .user_agent(concat!("resume-intake/", env!("CARGO_PKG_VERSION")))
        .build()
}

pub(crate) fn describe_transport(err: &reqwest::Error) -> String {
    if err.is_timeout() {
        format!("request timed out: {err}")
    } else if err.is_connect() {
        format!("connection failed: {err}")
    } else {
        err.to_string()
    }
}

/// Trims a response body down to something safe to log.
pub(crate) fn excerpt(body: &str) -> String {
    let trimmed = body.trim();
    if trimmed.chars().count() <= DETAIL_LIMIT {
        return trimmed.to_string();
    }
    let mut clipped: String = trimmed.chars().take(DETAIL_LIMIT).collect();
    clipped.push('…');
    clipped
}

pub(crate) fn join_url(base: &str, path: &str) -> String {
    format!(
        "{}/{}",
        base.trim_end_matches('/'),
        path.trim_start_matches('/')
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn excerpt_clips_long_bodies() {
        let body = "x".repeat(DETAIL_LIMIT + 20);
        let clipped = excerpt(&body);
        assert_eq!(clipped.chars().count(), DETAIL_LIMIT + 1);
        assert!(clipped.ends_with('…'));
    }

    #[test]
    fn join_url_normalizes_slashes() {
        assert_eq!(
            join_url("https://store.example/", "/bucket/a.pdf"),
            "https://store.example/bucket/a.pdf"
        );
    }
}
