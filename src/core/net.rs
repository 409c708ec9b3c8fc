/// Read the response body as text.
///
/// `_endpoint` labels the body in trace output; it is never logged for the token endpoint.
pub(crate) async fn get_text(
    resp: reqwest::Response,
    _endpoint: &str,
) -> Result<String, reqwest::Error> {
    let text = resp.text().await?;

    #[cfg(feature = "tracing")]
    tracing::trace!(endpoint = _endpoint, bytes = text.len(), "read response body");

    Ok(text)
}
