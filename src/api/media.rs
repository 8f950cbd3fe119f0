//! Playback payloads.
//!
//! Players seek with single `Range` requests; anything fancier gets the whole
//! payload.

use axum::{
    extract::{Path, State},
    http::{header, HeaderMap, StatusCode},
    response::{IntoResponse, Response},
};
use std::ops::Range;
use uuid::Uuid;

use crate::errors::AppError;
use crate::models::PlaybackRef;
use crate::AppState;

/// How a request's `Range` header applies to a payload.
#[derive(Debug, Clone, PartialEq, Eq)]
enum ByteRange {
    Full,
    Partial(Range<u64>),
    Unsatisfiable,
}

impl ByteRange {
    /// Interpret a `Range` value against a payload of `size` bytes. Malformed
    /// or multi-range values are ignored, as HTTP allows.
    fn parse(value: Option<&str>, size: u64) -> Self {
        let Some(spec) = value.and_then(|v| v.trim().strip_prefix("bytes=")) else {
            return ByteRange::Full;
        };
        if spec.contains(',') {
            return ByteRange::Full;
        }
        let Some((first, last)) = spec.split_once('-') else {
            return ByteRange::Full;
        };
        let (first, last) = (first.trim(), last.trim());

        let range = if first.is_empty() {
            // Suffix form: the final `last` bytes
            let Ok(count) = last.parse::<u64>() else {
                return ByteRange::Full;
            };
            if count == 0 {
                return ByteRange::Unsatisfiable;
            }
            size.saturating_sub(count)..size
        } else {
            let Ok(start) = first.parse::<u64>() else {
                return ByteRange::Full;
            };
            let end = if last.is_empty() {
                size
            } else {
                match last.parse::<u64>() {
                    Ok(last) if last >= start => last.saturating_add(1).min(size),
                    _ => return ByteRange::Full,
                }
            };
            start..end
        };

        if range.start >= size {
            ByteRange::Unsatisfiable
        } else {
            ByteRange::Partial(range)
        }
    }
}

fn media_not_found(token: Uuid) -> AppError {
    AppError::NotFound(format!("Media {} not found", token))
}

/// GET /media/{token} - Payload behind a playback reference.
pub async fn get_media(
    State(state): State<AppState>,
    Path(token): Path<Uuid>,
    headers: HeaderMap,
) -> Result<Response, AppError> {
    let playback = PlaybackRef(token);
    let info = state
        .gallery
        .media_info(playback)
        .await?
        .ok_or_else(|| media_not_found(token))?;

    let range = ByteRange::parse(
        headers.get(header::RANGE).and_then(|v| v.to_str().ok()),
        info.size,
    );

    match range {
        ByteRange::Unsatisfiable => Ok((
            StatusCode::RANGE_NOT_SATISFIABLE,
            [(header::CONTENT_RANGE, format!("bytes */{}", info.size))],
        )
            .into_response()),
        ByteRange::Partial(range) => {
            let content_range = format!("bytes {}-{}/{}", range.start, range.end - 1, info.size);
            let body = state
                .gallery
                .media_bytes(playback, Some(range))
                .await?
                .ok_or_else(|| media_not_found(token))?;

            Ok((
                StatusCode::PARTIAL_CONTENT,
                [
                    (header::CONTENT_TYPE, info.mime_type),
                    (header::ACCEPT_RANGES, "bytes".to_string()),
                    (header::CONTENT_RANGE, content_range),
                ],
                body,
            )
                .into_response())
        }
        ByteRange::Full => {
            let body = state
                .gallery
                .media_bytes(playback, None)
                .await?
                .ok_or_else(|| media_not_found(token))?;

            Ok((
                [
                    (header::CONTENT_TYPE, info.mime_type),
                    (header::ACCEPT_RANGES, "bytes".to_string()),
                ],
                body,
            )
                .into_response())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_range_forms() {
        assert_eq!(ByteRange::parse(None, 10), ByteRange::Full);
        assert_eq!(ByteRange::parse(Some("bytes=2-4"), 10), ByteRange::Partial(2..5));
        assert_eq!(ByteRange::parse(Some("bytes=7-"), 10), ByteRange::Partial(7..10));
        assert_eq!(ByteRange::parse(Some("bytes=-3"), 10), ByteRange::Partial(7..10));
        assert_eq!(ByteRange::parse(Some("bytes=-30"), 10), ByteRange::Partial(0..10));
        assert_eq!(ByteRange::parse(Some("bytes=5-99"), 10), ByteRange::Partial(5..10));
    }

    #[test]
    fn test_unsatisfiable_and_ignored_ranges() {
        assert_eq!(ByteRange::parse(Some("bytes=10-"), 10), ByteRange::Unsatisfiable);
        assert_eq!(ByteRange::parse(Some("bytes=-0"), 10), ByteRange::Unsatisfiable);
        assert_eq!(ByteRange::parse(Some("bytes=0-"), 0), ByteRange::Unsatisfiable);

        assert_eq!(ByteRange::parse(Some("bytes=4-2"), 10), ByteRange::Full);
        assert_eq!(ByteRange::parse(Some("bytes=0-1,4-5"), 10), ByteRange::Full);
        assert_eq!(ByteRange::parse(Some("items=0-1"), 10), ByteRange::Full);
        assert_eq!(ByteRange::parse(Some("bytes=x-1"), 10), ByteRange::Full);
    }
}
