use bytes::Bytes;
use light_indexer_types::FetchError;
use reqwest::StatusCode;
use url::Url;

/// Download a checkpoint document and map the HTTP outcome onto [`FetchError`].
pub(crate) async fn get_document(client: &reqwest::Client, url: Url) -> Result<Bytes, FetchError> {
    let res = client
        .get(url.clone())
        .header("Accept", "application/json")
        .send()
        .await
        .map_err(|e| FetchError::Unreachable(format!("{url}: {e}")))?;

    match res.status() {
        status if status.is_success() => {},
        StatusCode::NOT_FOUND => return Err(FetchError::NotFound(url.to_string())),
        status => {
            return Err(FetchError::Status {
                url: url.to_string(),
                status: status.as_u16(),
            });
        },
    }

    let body = res
        .bytes()
        .await
        .map_err(|e| FetchError::Malformed(format!("failed to read body from {url}: {e}")))?;
    if body.is_empty() {
        return Err(FetchError::Malformed(format!("empty body from {url}")));
    }
    Ok(body)
}
