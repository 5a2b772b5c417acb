//! This modules defines the common functionality for paging data.

use maud::{Markup, html};

/// The config for pagination
#[derive(Debug, Clone)]
pub struct PaginationConfig {
    /// The page number to default to when not specified in a request.
    pub default_page: u64,
    /// The maximum rows to display per page.
    pub default_page_size: u64,
    /// The maximum number of pages to show in the pagination indicator.
    pub max_pages: u64,
}

impl Default for PaginationConfig {
    fn default() -> Self {
        Self {
            default_page: 1,
            default_page_size: 5,
            max_pages: 5,
        }
    }
}

#[derive(Debug, PartialEq, Eq)]
pub enum PaginationIndicator {
    Page(u64),
    CurrPage(u64),
    Ellipsis,
    NextButton(u64),
    BackButton(u64),
}

pub fn create_pagination_indicators(
    curr_page: u64,
    page_count: u64,
    max_pages: u64,
) -> Vec<PaginationIndicator> {
    let map_page = |page| {
        if page == curr_page {
            PaginationIndicator::CurrPage(page)
        } else {
            PaginationIndicator::Page(page)
        }
    };

    let mut indicators: Vec<PaginationIndicator> = if page_count <= max_pages {
        (1..=page_count).map(map_page).collect()
    } else if curr_page <= (max_pages / 2) {
        (1..=max_pages).map(map_page).collect()
    } else if curr_page > (page_count - max_pages / 2) {
        ((page_count - max_pages + 1)..=page_count)
            .map(map_page)
            .collect()
    } else {
        ((curr_page - max_pages / 2)..=(curr_page + max_pages / 2))
            .map(map_page)
            .collect()
    };

    if page_count > max_pages {
        if curr_page > (max_pages / 2) + 1 {
            indicators.insert(0, PaginationIndicator::Page(1));
            indicators.insert(1, PaginationIndicator::Ellipsis);
        }

        if curr_page < (page_count - max_pages / 2) {
            indicators.push(PaginationIndicator::Ellipsis);
            indicators.push(PaginationIndicator::Page(page_count));
        }
    }

    if curr_page > 1 {
        indicators.insert(0, PaginationIndicator::BackButton(curr_page - 1));
    }

    if curr_page < page_count {
        indicators.push(PaginationIndicator::NextButton(curr_page + 1));
    }

    indicators
}

/// One page of rows plus what is needed to render the pagination indicators.
#[derive(Debug, PartialEq)]
pub struct Page<T> {
    /// The rows on the current page.
    pub items: Vec<T>,
    /// The current page number, starting from one.
    pub page: u64,
    /// The total number of pages, at least one.
    pub page_count: u64,
}

/// Select the rows of `items` that belong on `page`.
///
/// Pages are numbered from one. A `page` outside of the valid range is clamped to the first or
/// last page, and an empty list still has one (empty) page.
pub fn paginate<T>(items: Vec<T>, page: u64, per_page: u64) -> Page<T> {
    let per_page = per_page.max(1);
    let page_count = (items.len() as u64).div_ceil(per_page).max(1);
    let page = page.clamp(1, page_count);
    let offset = ((page - 1) * per_page) as usize;

    let items = items
        .into_iter()
        .skip(offset)
        .take(per_page as usize)
        .collect();

    Page {
        items,
        page,
        page_count,
    }
}

/// Render the pagination indicators as a list of links.
///
/// `page_url` builds the URL for a page number. Nothing is rendered when there is only one page.
pub fn pagination_view(indicators: &[PaginationIndicator], page_url: impl Fn(u64) -> String) -> Markup {
    let link_style = "block px-3 py-2 rounded-sm text-blue-600 hover:underline";

    html! {
        @if indicators.len() > 1 {
            nav class="pagination flex justify-center"
            {
                ul class="pagination flex items-center gap-x-2 p-0 m-0"
                {
                    @for indicator in indicators {
                        li {
                            @match indicator {
                                PaginationIndicator::Page(page) => {
                                    a href=(page_url(*page)) class=(link_style) { (page) }
                                }
                                PaginationIndicator::CurrPage(page) => {
                                    span
                                        aria-current="page"
                                        class="block px-3 py-2 rounded-sm font-bold text-black dark:text-white"
                                    { (page) }
                                }
                                PaginationIndicator::Ellipsis => {
                                    span class="block px-3 py-2" { "..." }
                                }
                                PaginationIndicator::BackButton(page) => {
                                    a href=(page_url(*page)) role="button" class=(link_style) { "Back" }
                                }
                                PaginationIndicator::NextButton(page) => {
                                    a href=(page_url(*page)) role="button" class=(link_style) { "Next" }
                                }
                            }
                        }
                    }
                }
            }
        }
    }
}
