//! Event slug extraction from a page location

use crate::error::{ExportError, ExportResult};
use url::Url;

/// Resolve the event slug from a page URL or a bare slug
///
/// The slug is the final non-empty path segment; query and fragment are
/// ignored.
pub fn slug_from_location(location: &str) -> ExportResult<String> {
    let location = location.trim();

    let slug = match Url::parse(location) {
        Ok(url) => url
            .path_segments()
            .and_then(|segments| segments.filter(|s| !s.is_empty()).last())
            .map(str::to_string),
        Err(_) => location
            .split(['?', '#'])
            .next()
            .and_then(|path| path.split('/').filter(|s| !s.is_empty()).last())
            .map(str::to_string),
    };

    slug.filter(|s| !s.is_empty())
        .ok_or_else(|| ExportError::empty_result(format!("No event slug in {:?}", location)))
}
