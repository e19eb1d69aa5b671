use std::future::Future;
use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;

/// Output of the on-device model for one image.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Prediction {
    pub class_name: String,
    pub probability: f64,
}

/// The classification model as the rest of the app sees it: an opaque
/// image -> prediction function.
#[async_trait]
pub trait LeafClassifier: Send + Sync {
    async fn classify(&self, image: &[u8]) -> anyhow::Result<Prediction>;
}

/// Process-wide lazy cache for an expensively loaded resource (the model).
///
/// At most one load runs at a time; callers arriving during a load await it
/// and share its result. A successful load is cached for the life of the
/// process. A failed load is not cached, so the next caller retries.
pub struct ModelCache<T> {
    slot: Mutex<Option<Arc<T>>>,
}

impl<T> Default for ModelCache<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> ModelCache<T> {
    pub fn new() -> Self {
        Self {
            slot: Mutex::new(None),
        }
    }

    /// The cached value, or the result of running `load`. Holding the lock
    /// across the await is what serializes concurrent loaders.
    pub async fn get_or_load<F, Fut>(&self, load: F) -> anyhow::Result<Arc<T>>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = anyhow::Result<T>>,
    {
        let mut slot = self.slot.lock().await;
        if let Some(cached) = slot.as_ref() {
            return Ok(Arc::clone(cached));
        }
        let loaded = Arc::new(load().await?);
        *slot = Some(Arc::clone(&loaded));
        Ok(loaded)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[derive(Debug)]
    struct FakeModel {
        serial: usize,
    }

    struct StubClassifier;

    #[async_trait]
    impl LeafClassifier for StubClassifier {
        async fn classify(&self, _image: &[u8]) -> anyhow::Result<Prediction> {
            Ok(Prediction {
                class_name: "Healthy".into(),
                probability: 0.98,
            })
        }
    }

    #[tokio::test]
    async fn cached_classifier_serves_predictions() {
        let cache = ModelCache::<StubClassifier>::new();
        let model = cache
            .get_or_load(|| async { Ok(StubClassifier) })
            .await
            .unwrap();
        let prediction = model.classify(b"png-bytes").await.unwrap();
        assert_eq!(prediction.class_name, "Healthy");
        assert!((0.0..=1.0).contains(&prediction.probability));
    }

    #[tokio::test]
    async fn concurrent_callers_share_one_load() {
        let cache = Arc::new(ModelCache::<FakeModel>::new());
        let loads = Arc::new(AtomicUsize::new(0));

        let mut handles = Vec::new();
        for _ in 0..8 {
            let cache = Arc::clone(&cache);
            let loads = Arc::clone(&loads);
            handles.push(tokio::spawn(async move {
                cache
                    .get_or_load(|| async move {
                        let serial = loads.fetch_add(1, Ordering::SeqCst);
                        tokio::time::sleep(std::time::Duration::from_millis(10)).await;
                        Ok(FakeModel { serial })
                    })
                    .await
                    .expect("load")
            }));
        }

        let mut serials = Vec::new();
        for handle in handles {
            serials.push(handle.await.unwrap().serial);
        }

        assert_eq!(loads.load(Ordering::SeqCst), 1, "exactly one load ran");
        assert!(serials.iter().all(|s| *s == serials[0]));
    }

    #[tokio::test]
    async fn failed_load_is_retried_not_cached() {
        let cache = ModelCache::<FakeModel>::new();

        let err = cache
            .get_or_load(|| async { anyhow::bail!("model download failed") })
            .await
            .unwrap_err();
        assert!(err.to_string().contains("download failed"));

        let model = cache
            .get_or_load(|| async { Ok(FakeModel { serial: 7 }) })
            .await
            .expect("second attempt succeeds");
        assert_eq!(model.serial, 7);
    }

    #[tokio::test]
    async fn successful_load_is_cached_for_later_callers() {
        let cache = ModelCache::<FakeModel>::new();
        let first = cache
            .get_or_load(|| async { Ok(FakeModel { serial: 1 }) })
            .await
            .unwrap();
        let second = cache
            .get_or_load(|| async { anyhow::bail!("loader must not run again") })
            .await
            .expect("cached value served without reloading");
        assert!(Arc::ptr_eq(&first, &second));
    }
}
