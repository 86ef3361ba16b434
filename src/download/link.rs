//! Download link host rewrite.
//!
//! Direct links look like `https://<server>.<domain>/<kind>/<token>/<file>`.
//! The same file is also served from a fixed edge host when the server id is
//! appended to the token: `https://<edge>.<domain>/<kind>/<token><server>/<file>`.

use reqwest::Url;

/// Rewrite `link` to be served by `edge_host`.
///
/// Links that do not have the expected shape are returned unchanged.
///
/// ```
/// use debridflow::download::rewrite_download_link;
///
/// assert_eq!(
///     rewrite_download_link("https://srv12.download.example/d/TOKEN/Movie.mkv", "sao1"),
///     "https://sao1.download.example/d/TOKENsrv12/Movie.mkv"
/// );
/// assert_eq!(rewrite_download_link("not a url", "sao1"), "not a url");
/// ```
pub fn rewrite_download_link(link: &str, edge_host: &str) -> String {
    try_rewrite(link, edge_host).unwrap_or_else(|| link.to_string())
}

fn try_rewrite(link: &str, edge_host: &str) -> Option<String> {
    let url = Url::parse(link).ok()?;
    if url.scheme() != "https" {
        return None;
    }

    let host = url.host_str()?;
    let (server, domain) = host.split_once('.')?;
    if server.is_empty() || domain.is_empty() || server == edge_host {
        return None;
    }

    let segments: Vec<&str> = url.path_segments()?.collect();
    let [kind, token, file] = segments.as_slice() else {
        return None;
    };
    if kind.is_empty() || token.is_empty() || file.is_empty() {
        return None;
    }

    Some(format!(
        "https://{}.{}/{}/{}{}/{}",
        edge_host, domain, kind, token, server, file
    ))
}
