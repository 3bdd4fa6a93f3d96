use crate::error::ContextError;

/// Retrieves the raw bytes behind the given URL with a single GET request. A non-2xx status or
/// any transport failure surfaces as one error to the caller; no retries are attempted and the
/// URL is not validated beforehand.
pub async fn fetch_image(image_url: &str) -> Result<Vec<u8>, ContextError> {
    log::info!("Fetching the header image from {}", image_url);

    let response = reqwest::get(image_url)
        .await
        .map_err(|error| {
            ContextError::with_error(format!("Failed to fetch the image {:?}", image_url), &error)
        })?
        .error_for_status()
        .map_err(|error| {
            ContextError::with_error(
                format!("The image request to {:?} was answered with an error", image_url),
                &error,
            )
        })?;

    let image_bytes = response.bytes().await.map_err(|error| {
        ContextError::with_error(
            format!("Failed to read the image body from {:?}", image_url),
            &error,
        )
    })?;

    Ok(image_bytes.to_vec())
}
