use serde::Serialize;

use super::service::MarketplaceError;

/// Page-number pagination: `page` starts at 1, `page_size` is capped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageRequest {
    pub page: usize,
    pub page_size: usize,
}

impl PageRequest {
    /// A missing or unusable `page_size` falls back to the default; an
    /// unusable `page` is a 404, as is any page past the end.
    pub fn resolve(
        page: Option<&str>,
        page_size: Option<&str>,
        default_page_size: usize,
        max_page_size: usize,
    ) -> Result<Self, MarketplaceError> {
        let page_size = page_size
            .and_then(|raw| raw.trim().parse::<usize>().ok())
            .filter(|size| *size > 0)
            .map(|size| size.min(max_page_size))
            .unwrap_or(default_page_size);

        let page = match page.map(str::trim).filter(|raw| !raw.is_empty()) {
            None => 1,
            Some("last") => usize::MAX,
            Some(raw) => raw
                .parse::<usize>()
                .ok()
                .filter(|page| *page > 0)
                .ok_or_else(invalid_page)?,
        };

        Ok(Self { page, page_size })
    }
}

fn invalid_page() -> MarketplaceError {
    MarketplaceError::NotFound("invalid page".to_string())
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Page<T> {
    pub count: usize,
    pub next: Option<String>,
    pub previous: Option<String>,
    pub results: Vec<T>,
}

impl<T> Page<T> {
    /// Slices `items`; `link` renders the URL for a given page number.
    pub fn paginate(
        items: Vec<T>,
        request: PageRequest,
        link: impl Fn(usize) -> String,
    ) -> Result<Self, MarketplaceError> {
        let count = items.len();
        let last_page = count.div_ceil(request.page_size).max(1);
        let page = if request.page == usize::MAX {
            last_page
        } else {
            request.page
        };
        if page > last_page {
            return Err(invalid_page());
        }

        let start = (page - 1) * request.page_size;
        let results = items
            .into_iter()
            .skip(start)
            .take(request.page_size)
            .collect();

        Ok(Self {
            count,
            next: (page < last_page).then(|| link(page + 1)),
            previous: (page > 1).then(|| link(page - 1)),
            results,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn link(page: usize) -> String {
        format!("/api/offers/?page={page}")
    }

    #[test]
    fn resolve_defaults_and_caps_page_size() {
        let request = PageRequest::resolve(None, None, 6, 100).expect("defaults");
        assert_eq!(request, PageRequest { page: 1, page_size: 6 });

        let request = PageRequest::resolve(Some("2"), Some("500"), 6, 100).expect("capped");
        assert_eq!(request.page_size, 100);

        let request = PageRequest::resolve(None, Some("zero"), 6, 100).expect("fallback");
        assert_eq!(request.page_size, 6);
    }

    #[test]
    fn unusable_page_is_not_found() {
        assert!(matches!(
            PageRequest::resolve(Some("0"), None, 6, 100),
            Err(MarketplaceError::NotFound(_))
        ));
        assert!(matches!(
            PageRequest::resolve(Some("two"), None, 6, 100),
            Err(MarketplaceError::NotFound(_))
        ));
    }

    #[test]
    fn paginate_links_neighbouring_pages() {
        let items: Vec<u32> = (1..=7).collect();
        let request = PageRequest { page: 2, page_size: 3 };

        let page = Page::paginate(items, request, link).expect("page exists");

        assert_eq!(page.count, 7);
        assert_eq!(page.results, vec![4, 5, 6]);
        assert_eq!(page.next.as_deref(), Some("/api/offers/?page=3"));
        assert_eq!(page.previous.as_deref(), Some("/api/offers/?page=1"));
    }

    #[test]
    fn empty_collections_still_have_a_first_page() {
        let page = Page::<u32>::paginate(Vec::new(), PageRequest { page: 1, page_size: 6 }, link)
            .expect("first page exists");
        assert_eq!(page.count, 0);
        assert!(page.next.is_none());
        assert!(page.previous.is_none());
        assert!(Page::<u32>::paginate(Vec::new(), PageRequest { page: 2, page_size: 6 }, link)
            .is_err());
    }

    #[test]
    fn last_page_keyword_resolves_to_the_final_page() {
        let request = PageRequest::resolve(Some("last"), Some("3"), 6, 100).expect("resolves");
        let page = Page::paginate((1..=7).collect::<Vec<u32>>(), request, link)
            .expect("last page exists");
        assert_eq!(page.results, vec![7]);
        assert!(page.next.is_none());
    }
}
