//! Custom Axum extractors.
//!
//! HTTP clients identify their shopping session with the `X-Holder-Id`
//! header. A browser tab that also holds a WebSocket should send the holder
//! id the socket announced, so both surfaces act on the same holds.
//!
//! ```ignore
//! async fn handler(HolderIdentity(holder): HolderIdentity) -> String {
//!     format!("holder {holder}")
//! }
//! ```

use crate::error::AppError;
use axum::{async_trait, extract::FromRequestParts, http::request::Parts};
use seat_inventory_core::HolderId;

/// Header carrying the holder id.
pub const HOLDER_ID_HEADER: &str = "X-Holder-Id";

/// Longest accepted holder id.
const MAX_HOLDER_ID_LEN: usize = 128;

/// Holder id taken from the [`HOLDER_ID_HEADER`] header.
///
/// Rejects with `400 Bad Request` when the header is missing, blank, not
/// visible ASCII or too long. Use `Option<HolderIdentity>` where the holder
/// is optional.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HolderIdentity(pub HolderId);

#[async_trait]
impl<S> FromRequestParts<S> for HolderIdentity
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let value = parts
            .headers
            .get(HOLDER_ID_HEADER)
            .ok_or_else(|| AppError::bad_request(format!("{HOLDER_ID_HEADER} header is required")))?;

        let raw = value
            .to_str()
            .map_err(|_| AppError::bad_request(format!("{HOLDER_ID_HEADER} must be ASCII")))?
            .trim();

        if raw.is_empty() || raw.len() > MAX_HOLDER_ID_LEN {
            return Err(AppError::bad_request(format!(
                "{HOLDER_ID_HEADER} must be 1 to {MAX_HOLDER_ID_LEN} characters"
            )));
        }

        Ok(Self(HolderId::new(raw)))
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)] // Test code can use unwrap/expect
mod tests {
    use super::*;
    use axum::http::{Request, StatusCode};

    async fn extract(header: Option<&str>) -> Result<HolderIdentity, AppError> {
        let mut builder = Request::builder().uri("/api/holds");
        if let Some(value) = header {
            builder = builder.header(HOLDER_ID_HEADER, value);
        }
        let (mut parts, ()) = builder.body(()).unwrap().into_parts();
        HolderIdentity::from_request_parts(&mut parts, &()).await
    }

    #[tokio::test]
    async fn test_reads_trimmed_holder_id() {
        let HolderIdentity(holder) = extract(Some("  tab-42 ")).await.unwrap();
        assert_eq!(holder, HolderId::new("tab-42"));
    }

    #[tokio::test]
    async fn test_missing_or_blank_header_is_rejected() {
        for header in [None, Some("   ")] {
            let err = extract(header).await.unwrap_err();
            assert_eq!(err.status(), StatusCode::BAD_REQUEST);
        }

        let long = "x".repeat(MAX_HOLDER_ID_LEN + 1);
        assert!(extract(Some(&long)).await.is_err());
    }
}
