//! Go proxy API implementation of [`VersionLookup`]

use serde::Deserialize;
use tracing::warn;

use crate::goutil::error::ToolchainError;
use crate::goutil::toolchain::VersionLookup;

/// Used when $GOPROXY names no HTTP proxy
const DEFAULT_BASE_URL: &str = "https://proxy.golang.org";

/// Body of `<proxy>/<module>/@latest`
#[derive(Debug, Deserialize)]
struct LatestInfo {
    #[serde(rename = "Version")]
    version: String,
}

/// Looks up latest versions through the module proxy instead of `go list`
pub struct GoProxyLookup {
    client: reqwest::Client,
    base_url: String,
}

impl GoProxyLookup {
    pub fn new(base_url: &str) -> Result<Self, ToolchainError> {
        let client = reqwest::Client::builder().user_agent("gup").build()?;
        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    /// Uses the first HTTP(S) entry of $GOPROXY, or proxy.golang.org.
    pub fn from_env() -> Result<Self, ToolchainError> {
        Self::new(&proxy_base_url(std::env::var("GOPROXY").ok().as_deref()))
    }

    fn latest_url(&self, module_path: &str) -> String {
        format!("{}/{}/@latest", self.base_url, escape_module_path(module_path))
    }
}

#[async_trait::async_trait]
impl VersionLookup for GoProxyLookup {
    async fn latest_version(&self, module_path: &str) -> Result<String, ToolchainError> {
        let url = self.latest_url(module_path);
        let response = self.client.get(&url).send().await?;

        match response.status() {
            // the proxy answers 410 for modules it refuses to serve
            reqwest::StatusCode::NOT_FOUND | reqwest::StatusCode::GONE => {
                Err(ToolchainError::NotFound(module_path.to_string()))
            }
            status if status.is_success() => response
                .json::<LatestInfo>()
                .await
                .map(|info| info.version)
                .map_err(|e| {
                    warn!("Unreadable proxy answer from {}: {}", url, e);
                    ToolchainError::InvalidResponse(e.to_string())
                }),
            status => {
                warn!("{} answered {}", url, status);
                Err(ToolchainError::InvalidResponse(format!(
                    "{url} answered {status}"
                )))
            }
        }
    }
}

/// Picks the proxy URL from a $GOPROXY value such as
/// "https://goproxy.io,direct". Non-HTTP entries ("direct", "off") are skipped.
fn proxy_base_url(goproxy: Option<&str>) -> String {
    goproxy
        .into_iter()
        .flat_map(|v| v.split([',', '|']))
        .map(str::trim)
        .find(|entry| entry.starts_with("http://") || entry.starts_with("https://"))
        .unwrap_or(DEFAULT_BASE_URL)
        .to_string()
}

/// Module path as the proxy protocol spells it: each upper-case letter
/// becomes `!` plus its lower-case form.
fn escape_module_path(path: &str) -> String {
    path.chars().fold(String::with_capacity(path.len()), |mut out, c| {
        if c.is_ascii_uppercase() {
            out.push('!');
        }
        out.push(c.to_ascii_lowercase());
        out
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use mockito::Server;
    use rstest::rstest;

    #[tokio::test]
    async fn latest_version_returns_version_from_proxy() {
        let mut server = Server::new_async().await;

        let mock = server
            .mock("GET", "/golang.org/x/tools/gopls/@latest")
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(r#"{"Version":"v0.16.0","Time":"2024-06-10T15:00:00Z"}"#)
            .create_async()
            .await;

        let lookup = GoProxyLookup::new(&server.url()).unwrap();
        let result = lookup
            .latest_version("golang.org/x/tools/gopls")
            .await
            .unwrap();

        mock.assert_async().await;
        assert_eq!(result, "v0.16.0");
    }

    #[tokio::test]
    async fn latest_version_returns_not_found_for_gone_status() {
        let mut server = Server::new_async().await;

        let mock = server
            .mock("GET", "/deprecated/module/@latest")
            .with_status(410)
            .with_body("gone")
            .create_async()
            .await;

        let lookup = GoProxyLookup::new(&server.url()).unwrap();
        let result = lookup.latest_version("deprecated/module").await;

        mock.assert_async().await;
        assert!(matches!(result, Err(ToolchainError::NotFound(_))));
    }

    #[tokio::test]
    async fn latest_version_returns_invalid_response_for_server_error() {
        let mut server = Server::new_async().await;

        let mock = server
            .mock("GET", "/example.com/tool/@latest")
            .with_status(500)
            .create_async()
            .await;

        let lookup = GoProxyLookup::new(&server.url()).unwrap();
        let result = lookup.latest_version("example.com/tool").await;

        mock.assert_async().await;
        assert!(matches!(result, Err(ToolchainError::InvalidResponse(_))));
    }

    #[tokio::test]
    async fn latest_version_handles_uppercase_module_path() {
        let mut server = Server::new_async().await;

        let mock = server
            .mock("GET", "/github.com/!burnt!sushi/toml/@latest")
            .with_status(200)
            .with_body(r#"{"Version":"v1.4.0"}"#)
            .create_async()
            .await;

        let lookup = GoProxyLookup::new(&server.url()).unwrap();
        let result = lookup
            .latest_version("github.com/BurntSushi/toml")
            .await
            .unwrap();

        mock.assert_async().await;
        assert_eq!(result, "v1.4.0");
    }

    #[rstest]
    #[case(None, DEFAULT_BASE_URL)]
    #[case(Some("direct"), DEFAULT_BASE_URL)]
    #[case(Some("off"), DEFAULT_BASE_URL)]
    #[case(Some("https://goproxy.io,direct"), "https://goproxy.io")]
    #[case(Some("direct|http://localhost:3000"), "http://localhost:3000")]
    fn proxy_base_url_returns_expected(#[case] goproxy: Option<&str>, #[case] expected: &str) {
        assert_eq!(proxy_base_url(goproxy), expected);
    }

    #[rstest]
    #[case("golang.org/x/text", "golang.org/x/text")]
    #[case("github.com/Azure", "github.com/!azure")]
    #[case("github.com/Azure/AzureSDK", "github.com/!azure/!azure!s!d!k")]
    fn escape_module_path_returns_expected(#[case] path: &str, #[case] expected: &str) {
        assert_eq!(escape_module_path(path), expected);
    }
}
