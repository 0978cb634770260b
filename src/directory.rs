//! In-memory biller directory: paging, accumulation and the derived view.
//!
//! Page requests are tagged with a sequence ticket. Only the response for the
//! most recently issued ticket is applied, so a slow page that arrives after a
//! newer one is dropped instead of overwriting it.

use serde::{Deserialize, Serialize};
use std::collections::HashSet;

use crate::errors::AppError;
use crate::models::{Biller, BillerMeta, BillerPage};
use crate::services::BillerApi;

/// How a freshly loaded page combines with what is already listed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoadMode {
    /// Infinite scroll: append billers not seen yet.
    Accumulate,
    /// Paged view: the new page replaces the list.
    Replace,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortDirection {
    #[default]
    Asc,
    Desc,
}

impl SortDirection {
    pub fn toggled(self) -> Self {
        match self {
            SortDirection::Asc => SortDirection::Desc,
            SortDirection::Desc => SortDirection::Asc,
        }
    }
}

/// Search, sort and availability filter applied on top of the loaded list.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct DirectoryView {
    pub search: String,
    pub sort: SortDirection,
    pub only_available: bool,
}

/// Derives the visible billers. Pure: the input is never reordered.
pub fn apply_view<'a>(billers: &'a [Biller], view: &DirectoryView) -> Vec<&'a Biller> {
    let needle = view.search.trim().to_lowercase();

    let mut visible: Vec<&Biller> = billers
        .iter()
        .filter(|b| !view.only_available || b.is_available)
        .filter(|b| {
            needle.is_empty()
                || b.biller_name.to_lowercase().contains(&needle)
                || b.biller_id.to_lowercase().contains(&needle)
        })
        .collect();

    visible.sort_by(|a, b| {
        let ordering = a
            .biller_name
            .to_lowercase()
            .cmp(&b.biller_name.to_lowercase())
            .then_with(|| a.biller_id.cmp(&b.biller_id));
        match view.sort {
            SortDirection::Asc => ordering,
            SortDirection::Desc => ordering.reverse(),
        }
    });

    visible
}

/// Proof that a page request was issued; hand it back with the response.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageTicket {
    seq: u64,
    pub page: u32,
}

/// What happened to a response handed to [`BillerDirectory::apply`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ApplyOutcome {
    Applied,
    Failed,
    /// A newer request was issued, or the directory was torn down.
    Discarded,
}

#[derive(Debug)]
pub struct BillerDirectory {
    mode: LoadMode,
    page_size: u32,
    category_key: String,
    billers: Vec<Biller>,
    meta: Option<BillerMeta>,
    error: Option<String>,
    issued: u64,
    in_flight: Option<u64>,
    torn_down: bool,
}

impl BillerDirectory {
    pub fn new(mode: LoadMode, page_size: u32, category_key: impl Into<String>) -> Self {
        Self {
            mode,
            page_size,
            category_key: category_key.into(),
            billers: Vec::new(),
            meta: None,
            error: None,
            issued: 0,
            in_flight: None,
            torn_down: false,
        }
    }

    pub fn billers(&self) -> &[Biller] {
        &self.billers
    }

    pub fn meta(&self) -> Option<&BillerMeta> {
        self.meta.as_ref()
    }

    /// List-level error banner from the last failed page.
    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    pub fn is_loading(&self) -> bool {
        self.in_flight.is_some()
    }

    pub fn find(&self, biller_id: &str) -> Option<&Biller> {
        self.billers.iter().find(|b| b.biller_id == biller_id)
    }

    pub fn visible(&self, view: &DirectoryView) -> Vec<&Biller> {
        apply_view(&self.billers, view)
    }

    /// Whether infinite scroll should ask for another page.
    pub fn has_more(&self) -> bool {
        self.meta.as_ref().map(BillerMeta::has_more).unwrap_or(true)
    }

    /// Page after the last one loaded (1 when nothing is loaded yet).
    pub fn next_page(&self) -> u32 {
        self.meta
            .as_ref()
            .map(|m| m.current_page.saturating_add(1))
            .unwrap_or(1)
    }

    /// Registers a request for `page`; earlier tickets become stale.
    pub fn begin(&mut self, page: u32) -> PageTicket {
        self.issued += 1;
        self.in_flight = Some(self.issued);
        PageTicket {
            seq: self.issued,
            page,
        }
    }

    /// Applies a page response if `ticket` is still the latest request.
    pub fn apply(
        &mut self,
        ticket: PageTicket,
        result: Result<BillerPage, AppError>,
    ) -> ApplyOutcome {
        if self.torn_down || self.in_flight != Some(ticket.seq) {
            tracing::debug!(
                "Discarding stale response for page {} (ticket {})",
                ticket.page,
                ticket.seq
            );
            return ApplyOutcome::Discarded;
        }
        self.in_flight = None;

        match result {
            Ok(page) => {
                self.error = None;
                match self.mode {
                    LoadMode::Replace => self.billers = page.billers,
                    LoadMode::Accumulate => {
                        let mut known: HashSet<String> =
                            self.billers.iter().map(|b| b.biller_id.clone()).collect();
                        self.billers.extend(
                            page.billers
                                .into_iter()
                                .filter(|b| known.insert(b.biller_id.clone())),
                        );
                    }
                }
                self.meta = Some(page.meta);
                ApplyOutcome::Applied
            }
            Err(e) => {
                tracing::warn!("Failed to load billers page {}: {}", ticket.page, e);
                self.error = Some(e.user_message());
                ApplyOutcome::Failed
            }
        }
    }

    /// Fetches `page` through `api` and applies it.
    pub async fn load_page<A: BillerApi>(&mut self, api: &A, page: u32) -> ApplyOutcome {
        let ticket = self.begin(page);
        let result = api
            .list_billers(page, self.page_size, &self.category_key)
            .await;
        self.apply(ticket, result)
    }

    /// Loads the next page for infinite scroll; `None` when nothing is left.
    pub async fn load_more<A: BillerApi>(&mut self, api: &A) -> Option<ApplyOutcome> {
        if !self.has_more() {
            return None;
        }
        let page = self.next_page();
        Some(self.load_page(api, page).await)
    }

    /// Clears the list and pagination, keeping mode and configuration.
    pub fn reset(&mut self) {
        self.billers.clear();
        self.meta = None;
        self.error = None;
        self.in_flight = None;
    }

    pub fn dismiss_error(&mut self) {
        self.error = None;
    }

    /// Stops applying responses; anything still in flight is dropped on arrival.
    pub fn teardown(&mut self) {
        self.torn_down = true;
        self.in_flight = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn biller(id: &str, name: &str, available: bool) -> Biller {
        Biller {
            biller_id: id.to_string(),
            biller_name: name.to_string(),
            is_available: available,
            coverage: "PAN India".to_string(),
            icon_url: None,
        }
    }

    fn page(billers: Vec<Biller>, current: u32, total: u32) -> BillerPage {
        BillerPage {
            meta: BillerMeta {
                total_pages: total,
                current_page: current,
                total_records: billers.len() as u32,
                records_on_current_page: billers.len() as u32,
                ..Default::default()
            },
            billers,
        }
    }

    #[test]
    fn test_view_filters_and_sorts() {
        let billers = vec![
            biller("B3", "Paytm FASTag", true),
            biller("B1", "axis bank FASTag", false),
            biller("B2", "ICICI FASTag", true),
        ];

        let names = |view: &DirectoryView| -> Vec<String> {
            apply_view(&billers, view)
                .iter()
                .map(|b| b.biller_name.clone())
                .collect()
        };

        let all = DirectoryView::default();
        assert_eq!(names(&all), vec!["axis bank FASTag", "ICICI FASTag", "Paytm FASTag"]);

        let desc = DirectoryView {
            sort: SortDirection::Asc.toggled(),
            ..Default::default()
        };
        assert_eq!(names(&desc), vec!["Paytm FASTag", "ICICI FASTag", "axis bank FASTag"]);

        let search = DirectoryView {
            search: "  FASTAG ".to_string(),
            only_available: true,
            ..Default::default()
        };
        assert_eq!(names(&search), vec!["ICICI FASTag", "Paytm FASTag"]);

        let by_id = DirectoryView {
            search: "b1".to_string(),
            ..Default::default()
        };
        assert_eq!(names(&by_id), vec!["axis bank FASTag"]);

        // source list untouched
        assert_eq!(billers[0].biller_id, "B3");
    }

    #[test]
    fn test_accumulate_appends_unique() {
        let mut dir = BillerDirectory::new(LoadMode::Accumulate, 2, "C10");

        let t1 = dir.begin(1);
        let first = page(vec![biller("B1", "A", true), biller("B2", "B", true)], 1, 2);
        assert_eq!(dir.apply(t1, Ok(first)), ApplyOutcome::Applied);
        assert!(dir.has_more());
        assert_eq!(dir.next_page(), 2);

        let t2 = dir.begin(2);
        let second = page(vec![biller("B2", "B", true), biller("B3", "C", true)], 2, 2);
        assert_eq!(dir.apply(t2, Ok(second)), ApplyOutcome::Applied);

        let ids: Vec<&str> = dir.billers().iter().map(|b| b.biller_id.as_str()).collect();
        assert_eq!(ids, vec!["B1", "B2", "B3"]);
        assert!(!dir.has_more());
    }

    #[test]
    fn test_replace_mode_swaps_page() {
        let mut dir = BillerDirectory::new(LoadMode::Replace, 1, "C10");
        let t1 = dir.begin(1);
        dir.apply(t1, Ok(page(vec![biller("B1", "A", true)], 1, 2)));
        let t2 = dir.begin(2);
        dir.apply(t2, Ok(page(vec![biller("B2", "B", true)], 2, 2)));

        assert_eq!(dir.billers().len(), 1);
        assert_eq!(dir.billers()[0].biller_id, "B2");
    }

    #[test]
    fn test_out_of_order_response_discarded() {
        let mut dir = BillerDirectory::new(LoadMode::Replace, 1, "C10");
        let slow = dir.begin(1);
        let fast = dir.begin(2);

        assert_eq!(
            dir.apply(fast, Ok(page(vec![biller("B2", "B", true)], 2, 3))),
            ApplyOutcome::Applied
        );
        assert_eq!(
            dir.apply(slow, Ok(page(vec![biller("B1", "A", true)], 1, 3))),
            ApplyOutcome::Discarded
        );
        assert_eq!(dir.billers()[0].biller_id, "B2");
        assert_eq!(dir.meta().unwrap().current_page, 2);
    }

    #[test]
    fn test_failed_page_keeps_existing_list() {
        let mut dir = BillerDirectory::new(LoadMode::Accumulate, 1, "C10");
        let t1 = dir.begin(1);
        dir.apply(t1, Ok(page(vec![biller("B1", "A", true)], 1, 3)));

        let t2 = dir.begin(2);
        let outcome = dir.apply(t2, Err(AppError::ExternalApiError("timeout".to_string())));
        assert_eq!(outcome, ApplyOutcome::Failed);
        assert_eq!(dir.billers().len(), 1);
        assert!(dir.error().is_some());
        assert_eq!(dir.next_page(), 2);

        dir.dismiss_error();
        assert!(dir.error().is_none());
    }

    #[test]
    fn test_teardown_discards_in_flight() {
        let mut dir = BillerDirectory::new(LoadMode::Replace, 1, "C10");
        let ticket = dir.begin(1);
        dir.teardown();
        assert_eq!(
            dir.apply(ticket, Ok(page(vec![biller("B1", "A", true)], 1, 1))),
            ApplyOutcome::Discarded
        );
        assert!(dir.billers().is_empty());
        assert!(!dir.is_loading());
    }
}
