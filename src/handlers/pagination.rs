use crate::error::AppError;
use axum::http::{header, HeaderMap, Uri};
use serde::{Deserialize, Serialize};

const PAGE_PARAM: &str = "page";
const LAST_PAGE: &str = "last";

/// Page-number pagination envelope.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Paginated<T> {
    pub count: i64,
    pub next: Option<String>,
    pub previous: Option<String>,
    pub results: Vec<T>,
}

/// One resolved page of a result set.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageWindow {
    pub number: i64,
    pub page_size: i64,
    pub num_pages: i64,
}

impl PageWindow {
    /// Resolve the `page` query parameter against a result count.
    ///
    /// An empty result set still has a first page. Anything that is not a
    /// positive integer within range (or `last`) is rejected.
    pub fn resolve(requested: Option<&str>, count: i64, page_size: i64) -> Result<Self, AppError> {
        let page_size = page_size.max(1);
        let num_pages = ((count.max(0) + page_size - 1) / page_size).max(1);

        let number = match requested.map(str::trim) {
            None | Some("") => 1,
            Some(LAST_PAGE) => num_pages,
            Some(raw) => raw.parse::<i64>().map_err(|_| AppError::InvalidPage)?,
        };

        if number < 1 || number > num_pages {
            return Err(AppError::InvalidPage);
        }

        Ok(Self {
            number,
            page_size,
            num_pages,
        })
    }

    pub fn offset(&self) -> i64 {
        (self.number - 1) * self.page_size
    }

    pub fn next_page(&self) -> Option<i64> {
        (self.number < self.num_pages).then_some(self.number + 1)
    }

    pub fn previous_page(&self) -> Option<i64> {
        (self.number > 1).then_some(self.number - 1)
    }
}

/// Absolute URL of the current request without its query string.
pub fn request_base_url(headers: &HeaderMap, uri: &Uri) -> String {
    let host = headers
        .get(header::HOST)
        .and_then(|value| value.to_str().ok())
        .map(str::to_string)
        .or_else(|| uri.authority().map(|authority| authority.to_string()))
        .unwrap_or_else(|| "localhost".to_string());
    let scheme = uri.scheme_str().unwrap_or("http");

    format!("{}://{}{}", scheme, host, uri.path())
}

/// Link to `page`, keeping every other query parameter.
///
/// Parameters are emitted in sorted order. The first page is addressed
/// without a `page` parameter at all.
pub fn page_url(base: &str, query: Option<&str>, page: i64) -> String {
    let mut pairs: Vec<(String, String)> = query
        .and_then(|q| serde_urlencoded::from_str(q).ok())
        .unwrap_or_default();
    pairs.retain(|(key, _)| key != PAGE_PARAM);
    if page > 1 {
        pairs.push((PAGE_PARAM.to_string(), page.to_string()));
    }
    pairs.sort();

    match serde_urlencoded::to_string(&pairs) {
        Ok(encoded) if !encoded.is_empty() => format!("{}?{}", base, encoded),
        _ => base.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn first_page_of_empty_set() {
        let window = PageWindow::resolve(None, 0, 10).unwrap();
        assert_eq!(window.number, 1);
        assert_eq!(window.num_pages, 1);
        assert_eq!(window.offset(), 0);
        assert_eq!(window.next_page(), None);
        assert_eq!(window.previous_page(), None);
    }

    #[test]
    fn resolves_numbered_and_last_pages() {
        let window = PageWindow::resolve(Some("2"), 25, 10).unwrap();
        assert_eq!(window.offset(), 10);
        assert_eq!(window.next_page(), Some(3));
        assert_eq!(window.previous_page(), Some(1));

        let last = PageWindow::resolve(Some("last"), 25, 10).unwrap();
        assert_eq!(last.number, 3);
        assert_eq!(last.next_page(), None);
    }

    #[test]
    fn rejects_invalid_pages() {
        for raw in ["0", "-1", "4", "abc", "1.5"] {
            assert!(
                matches!(PageWindow::resolve(Some(raw), 25, 10), Err(AppError::InvalidPage)),
                "page {raw:?} should be rejected"
            );
        }
    }

    #[test]
    fn builds_base_url_from_host_header() {
        let mut headers = HeaderMap::new();
        headers.insert(header::HOST, "api.test:8000".parse().unwrap());
        let uri: Uri = "/api/users/?page=2".parse().unwrap();
        assert_eq!(
            request_base_url(&headers, &uri),
            "http://api.test:8000/api/users/"
        );
    }

    #[test]
    fn page_links_keep_other_params() {
        let base = "http://testserver/api/users/";
        assert_eq!(
            page_url(base, Some("search=ann&page=2"), 3),
            "http://testserver/api/users/?page=3&search=ann"
        );
        assert_eq!(
            page_url(base, Some("search=ann&page=2"), 1),
            "http://testserver/api/users/?search=ann"
        );
        assert_eq!(page_url(base, None, 1), base);
    }
}
