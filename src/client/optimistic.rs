use async_trait::async_trait;
use uuid::Uuid;

use crate::history::dto::ScanHistoryItem;

/// The slice of the backend the history view talks to.
#[async_trait]
pub trait HistoryApi: Send + Sync {
    async fn remove(&self, id: Uuid) -> anyhow::Result<()>;
}

/// Orders the client can apply locally; the server always answers
/// newest-first and leaves the rest to us.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortOrder {
    Newest,
    Oldest,
    Disease,
    Accuracy,
}

/// Client-side view of the scan history with optimistic deletes: the item
/// disappears before the server answers, and comes back in its original
/// position if the call fails.
pub struct HistoryView<A: HistoryApi> {
    api: A,
    items: Vec<ScanHistoryItem>,
    pending_delete: Option<Uuid>,
    error: Option<String>,
    pub search_term: String,
    pub sort_order: SortOrder,
}

impl<A: HistoryApi> HistoryView<A> {
    pub fn new(api: A, items: Vec<ScanHistoryItem>) -> Self {
        Self {
            api,
            items,
            pending_delete: None,
            error: None,
            search_term: String::new(),
            sort_order: SortOrder::Newest,
        }
    }

    pub fn items(&self) -> &[ScanHistoryItem] {
        &self.items
    }

    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    /// Marks an item pending deletion; the UI shows the confirmation
    /// dialog while this is set.
    pub fn confirm_delete(&mut self, id: Uuid) {
        self.pending_delete = Some(id);
    }

    pub fn cancel_delete(&mut self) {
        self.pending_delete = None;
    }

    /// Run the confirmed delete. The displayed list is updated and the
    /// dialog closed before the request is issued; on failure the snapshot
    /// is restored verbatim and the error surfaced.
    pub async fn delete_confirmed(&mut self) {
        let Some(id) = self.pending_delete.take() else {
            return;
        };
        self.error = None;

        let snapshot = self.items.clone();
        self.items.retain(|item| item.id != id);

        if let Err(e) = self.api.remove(id).await {
            self.items = snapshot;
            self.error = Some(format!("Failed to delete history: {e}"));
        }
    }

    /// The list as displayed: filtered by the search term, then sorted.
    pub fn visible(&self) -> Vec<&ScanHistoryItem> {
        let term = self.search_term.to_lowercase();
        let mut current: Vec<&ScanHistoryItem> = self
            .items
            .iter()
            .filter(|item| {
                term.is_empty() || item.detection_result.to_lowercase().contains(&term)
            })
            .collect();

        match self.sort_order {
            SortOrder::Newest => current.sort_by(|a, b| b.scanned_at.cmp(&a.scanned_at)),
            SortOrder::Oldest => current.sort_by(|a, b| a.scanned_at.cmp(&b.scanned_at)),
            SortOrder::Disease => {
                current.sort_by(|a, b| a.detection_result.cmp(&b.detection_result))
            }
            SortOrder::Accuracy => {
                current.sort_by(|a, b| b.accuracy.total_cmp(&a.accuracy))
            }
        }
        current
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use time::{Duration, OffsetDateTime};

    struct FakeApi {
        fail: bool,
        calls: AtomicUsize,
    }

    #[async_trait]
    impl HistoryApi for FakeApi {
        async fn remove(&self, _id: Uuid) -> anyhow::Result<()> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if self.fail {
                anyhow::bail!("network unreachable")
            }
            Ok(())
        }
    }

    fn item(label: &str, accuracy: f64, age_minutes: i64) -> ScanHistoryItem {
        ScanHistoryItem {
            id: Uuid::new_v4(),
            image_data: "data:image/png;base64,AAAA".into(),
            detection_result: label.into(),
            accuracy,
            recommendation: None,
            scanned_at: OffsetDateTime::now_utc() - Duration::minutes(age_minutes),
        }
    }

    fn sample_items() -> Vec<ScanHistoryItem> {
        vec![
            item("Common Rust", 0.91, 1),
            item("Healthy", 0.99, 2),
            item("Gray Leaf Spot", 0.84, 3),
        ]
    }

    #[tokio::test]
    async fn successful_delete_removes_the_item() {
        let items = sample_items();
        let target = items[1].id;
        let mut view = HistoryView::new(
            FakeApi {
                fail: false,
                calls: AtomicUsize::new(0),
            },
            items,
        );

        view.confirm_delete(target);
        view.delete_confirmed().await;

        assert_eq!(view.items().len(), 2);
        assert!(view.items().iter().all(|i| i.id != target));
        assert!(view.error().is_none());
    }

    #[tokio::test]
    async fn failed_delete_rolls_back_to_the_exact_snapshot() {
        let items = sample_items();
        let original_ids: Vec<Uuid> = items.iter().map(|i| i.id).collect();
        let target = items[1].id;
        let mut view = HistoryView::new(
            FakeApi {
                fail: true,
                calls: AtomicUsize::new(0),
            },
            items,
        );

        view.confirm_delete(target);
        view.delete_confirmed().await;

        let after_ids: Vec<Uuid> = view.items().iter().map(|i| i.id).collect();
        assert_eq!(after_ids, original_ids, "item must reappear in place");
        let err = view.error().expect("error must be surfaced");
        assert!(err.contains("network unreachable"));
    }

    #[tokio::test]
    async fn delete_without_confirmation_is_a_no_op() {
        let api = FakeApi {
            fail: false,
            calls: AtomicUsize::new(0),
        };
        let mut view = HistoryView::new(api, sample_items());
        view.delete_confirmed().await;
        assert_eq!(view.items().len(), 3);
        assert_eq!(view.api.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn cancel_clears_the_pending_delete() {
        let mut view = HistoryView::new(
            FakeApi {
                fail: false,
                calls: AtomicUsize::new(0),
            },
            sample_items(),
        );
        let target = view.items()[0].id;
        view.confirm_delete(target);
        view.cancel_delete();
        view.delete_confirmed().await;
        assert_eq!(view.items().len(), 3);
    }

    #[test]
    fn visible_filters_and_sorts() {
        let api = FakeApi {
            fail: false,
            calls: AtomicUsize::new(0),
        };
        let mut view = HistoryView::new(api, sample_items());

        view.search_term = "rust".into();
        let filtered = view.visible();
        assert_eq!(filtered.len(), 1);
        assert_eq!(filtered[0].detection_result, "Common Rust");

        view.search_term.clear();
        view.sort_order = SortOrder::Accuracy;
        let by_accuracy = view.visible();
        assert_eq!(by_accuracy[0].detection_result, "Healthy");

        view.sort_order = SortOrder::Oldest;
        let oldest_first = view.visible();
        assert_eq!(oldest_first[0].detection_result, "Gray Leaf Spot");
    }
}
