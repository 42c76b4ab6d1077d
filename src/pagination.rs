use std::future::Future;

/// Collects every page of a listing call.
///
/// Pages are requested from 1 upward and stop after the first page holding
/// fewer than `page_size` items. A final page of exactly `page_size` items
/// costs one more request, which comes back empty. A `page_size` of zero
/// fetches the first page only.
pub async fn paginate<T, E, F, Fut>(page_size: usize, mut fetch_page: F) -> Result<Vec<T>, E>
where
    F: FnMut(u32) -> Fut,
    Fut: Future<Output = Result<Vec<T>, E>>,
{
    let mut results = Vec::new();
    let mut page_num = 1u32;

    loop {
        let page = fetch_page(page_num).await?;
        let count = page.len();
        results.extend(page);

        tracing::debug!("Page {} returned {} items", page_num, count);
        if page_size == 0 || count < page_size {
            return Ok(results);
        }
        page_num += 1;
    }
}
