use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use futures::future::join_all;
use parking_lot::RwLock;
use tokio::sync::Notify;
use tracing::{debug, warn};

use dockmon_types::{ContainerSummary, ImageSummary, MemoryStats};

use crate::error::RuntimeError;
use crate::runtime::Runtime;

/// Receives change notifications after a snapshot swap.
///
/// Callbacks run on the poller task and must not block; listeners that
/// need to do real work should flip a flag and request a redraw.
pub trait SyncListener: Send + Sync {
    fn containers_changed(&self, containers: Arc<Vec<ContainerSummary>>);
    fn images_changed(&self, images: Arc<Vec<ImageSummary>>);
}

/// A snapshot together with the sequence number of the fetch that
/// produced it. Sequences are taken before the fetch starts, so a slow
/// cycle can never clobber the result of a newer one.
struct Stamped<T> {
    seq: u64,
    data: Arc<T>,
}

impl<T: Default> Default for Stamped<T> {
    fn default() -> Self {
        Self {
            seq: 0,
            data: Arc::new(T::default()),
        }
    }
}

struct Shared {
    active: AtomicBool,
    only_running: AtomicBool,
    containers: RwLock<Stamped<Vec<ContainerSummary>>>,
    images: RwLock<Stamped<Vec<ImageSummary>>>,
    disk_usage: RwLock<Stamped<HashMap<String, i64>>>,
    listeners: RwLock<Vec<Arc<dyn SyncListener>>>,
    container_seq: AtomicU64,
    image_seq: AtomicU64,
    disk_seq: AtomicU64,
    refresh_containers: Notify,
    refresh_images: Notify,
}

/// Keeps container, image and disk-usage snapshots fresh.
///
/// Three pollers run on independent timers; each cycle fetches into a
/// local buffer and swaps the shared snapshot atomically, so readers
/// always observe a complete, internally consistent state. Failed
/// cycles leave the previous snapshot in place and notify nobody.
pub struct SyncService<R: Runtime> {
    runtime: Arc<R>,
    shared: Arc<Shared>,
    poll_interval: Duration,
}

impl<R: Runtime> Clone for SyncService<R> {
    fn clone(&self) -> Self {
        Self {
            runtime: Arc::clone(&self.runtime),
            shared: Arc::clone(&self.shared),
            poll_interval: self.poll_interval,
        }
    }
}

impl<R: Runtime> SyncService<R> {
    pub fn new(runtime: R, poll_interval: Duration) -> Self {
        Self {
            runtime: Arc::new(runtime),
            shared: Arc::new(Shared {
                active: AtomicBool::new(false),
                only_running: AtomicBool::new(true),
                containers: RwLock::new(Stamped::default()),
                images: RwLock::new(Stamped::default()),
                disk_usage: RwLock::new(Stamped::default()),
                listeners: RwLock::new(Vec::new()),
                container_seq: AtomicU64::new(0),
                image_seq: AtomicU64::new(0),
                disk_seq: AtomicU64::new(0),
                refresh_containers: Notify::new(),
                refresh_images: Notify::new(),
            }),
            poll_interval,
        }
    }

    pub fn add_listener(&self, listener: Arc<dyn SyncListener>) {
        self.shared.listeners.write().push(listener);
    }

    pub fn containers(&self) -> Arc<Vec<ContainerSummary>> {
        Arc::clone(&self.shared.containers.read().data)
    }

    pub fn images(&self) -> Arc<Vec<ImageSummary>> {
        Arc::clone(&self.shared.images.read().data)
    }

    pub fn only_running(&self) -> bool {
        self.shared.only_running.load(Ordering::Relaxed)
    }

    /// Flips the stopped-container filter and kicks an immediate refresh.
    pub fn toggle_only_running(&self) {
        self.shared.only_running.fetch_xor(true, Ordering::Relaxed);
        self.refresh_containers_now();
    }

    /// Wakes the container poller without waiting out the interval.
    pub fn refresh_containers_now(&self) {
        self.shared.refresh_containers.notify_one();
    }

    pub fn refresh_images_now(&self) {
        self.shared.refresh_images.notify_one();
    }

    pub fn shutdown(&self) {
        self.shared.active.store(false, Ordering::Relaxed);
        self.shared.refresh_containers.notify_one();
        self.shared.refresh_images.notify_one();
    }

    /// Spawns the poller tasks. Call once.
    pub fn start(&self) {
        self.shared.active.store(true, Ordering::Relaxed);

        let svc = self.clone();
        tokio::spawn(async move {
            while svc.shared.active.load(Ordering::Relaxed) {
                svc.poll_containers_once().await;
                tokio::select! {
                    _ = tokio::time::sleep(svc.poll_interval) => {}
                    _ = svc.shared.refresh_containers.notified() => {}
                }
            }
            debug!("container poller stopped");
        });

        let svc = self.clone();
        tokio::spawn(async move {
            while svc.shared.active.load(Ordering::Relaxed) {
                svc.poll_images_once().await;
                tokio::select! {
                    _ = tokio::time::sleep(svc.poll_interval) => {}
                    _ = svc.shared.refresh_images.notified() => {}
                }
            }
            debug!("image poller stopped");
        });

        let svc = self.clone();
        tokio::spawn(async move {
            while svc.shared.active.load(Ordering::Relaxed) {
                svc.poll_disk_usage_once().await;
                tokio::time::sleep(svc.poll_interval).await;
            }
            debug!("disk usage poller stopped");
        });
    }

    /// One container sync cycle: list, fan out stats requests, merge in
    /// the latest disk-usage snapshot, publish.
    pub async fn poll_containers_once(&self) {
        let seq = self.shared.container_seq.fetch_add(1, Ordering::Relaxed) + 1;
        let include_stopped = !self.only_running();

        let mut containers = match self.runtime.list_containers(include_stopped).await {
            Ok(c) => c,
            Err(e) => {
                warn!("container list failed: {e}");
                return;
            }
        };

        let stats = join_all(containers.iter().map(|c| {
            let runtime = Arc::clone(&self.runtime);
            let id = c.id.clone();
            let running = c.is_running();
            async move {
                if !running {
                    return MemoryStats::default();
                }
                match runtime.memory_stats(&id).await {
                    Ok(m) => m,
                    Err(e) => {
                        warn!("stats for {id} failed: {e}");
                        MemoryStats::default()
                    }
                }
            }
        }))
        .await;

        let disk = Arc::clone(&self.shared.disk_usage.read().data);
        for (container, memory) in containers.iter_mut().zip(stats) {
            container.memory = memory;
            container.disk_usage = disk.get(&container.id).copied().unwrap_or(0);
        }

        if self.publish_containers(seq, containers) {
            self.notify_containers();
        }
    }

    pub async fn poll_images_once(&self) {
        let seq = self.shared.image_seq.fetch_add(1, Ordering::Relaxed) + 1;

        let images = match self.runtime.list_images().await {
            Ok(i) => i,
            Err(e) => {
                warn!("image list failed: {e}");
                return;
            }
        };

        if self.publish_images(seq, images) {
            self.notify_images();
        }
    }

    pub async fn poll_disk_usage_once(&self) {
        let seq = self.shared.disk_seq.fetch_add(1, Ordering::Relaxed) + 1;

        let usage = match self.runtime.disk_usage().await {
            Ok(u) => u,
            Err(e) => {
                warn!("disk usage fetch failed: {e}");
                return;
            }
        };

        let mut guard = self.shared.disk_usage.write();
        if seq > guard.seq {
            *guard = Stamped {
                seq,
                data: Arc::new(usage),
            };
        }
    }

    fn publish_containers(&self, seq: u64, containers: Vec<ContainerSummary>) -> bool {
        let mut guard = self.shared.containers.write();
        if seq <= guard.seq {
            debug!("discarding stale container snapshot (seq {seq} <= {})", guard.seq);
            return false;
        }
        *guard = Stamped {
            seq,
            data: Arc::new(containers),
        };
        true
    }

    fn publish_images(&self, seq: u64, images: Vec<ImageSummary>) -> bool {
        let mut guard = self.shared.images.write();
        if seq <= guard.seq {
            debug!("discarding stale image snapshot (seq {seq} <= {})", guard.seq);
            return false;
        }
        *guard = Stamped {
            seq,
            data: Arc::new(images),
        };
        true
    }

    fn notify_containers(&self) {
        let snapshot = self.containers();
        for listener in self.shared.listeners.read().iter() {
            listener.containers_changed(Arc::clone(&snapshot));
        }
    }

    fn notify_images(&self) {
        let snapshot = self.images();
        for listener in self.shared.listeners.read().iter() {
            listener.images_changed(Arc::clone(&snapshot));
        }
    }

    // Mutating operations pass straight through to the runtime; callers
    // follow up with a manual refresh so the list reflects the change.

    pub async fn kill_container(&self, id: &str) -> Result<(), RuntimeError> {
        self.runtime.kill_container(id).await
    }

    pub async fn remove_container(&self, id: &str) -> Result<(), RuntimeError> {
        self.runtime.remove_container(id).await
    }

    pub async fn remove_image(&self, id: &str) -> Result<(), RuntimeError> {
        self.runtime.remove_image(id).await
    }

    pub async fn logs(&self, id: &str) -> Result<String, RuntimeError> {
        self.runtime.logs(id).await
    }

    pub async fn inspect_container(&self, id: &str) -> Result<String, RuntimeError> {
        self.runtime.inspect_container(id).await
    }

    pub async fn inspect_image(&self, id: &str) -> Result<String, RuntimeError> {
        self.runtime.inspect_image(id).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use std::collections::HashSet;
    use std::sync::atomic::AtomicUsize;
    use std::sync::Mutex;

    use async_trait::async_trait;

    fn container(id: &str, state: &str) -> ContainerSummary {
        ContainerSummary {
            id: id.to_string(),
            image: "busybox".to_string(),
            command: "sh".to_string(),
            status: "Up 2 minutes".to_string(),
            state: state.to_string(),
            memory: MemoryStats::default(),
            disk_usage: 0,
        }
    }

    #[derive(Default)]
    struct FakeRuntime {
        containers: Mutex<Vec<Result<Vec<ContainerSummary>, ()>>>,
        images: Mutex<Vec<Result<Vec<ImageSummary>, ()>>>,
        disk: Mutex<HashMap<String, i64>>,
        failing_stats: Mutex<HashSet<String>>,
        seen_include_stopped: Mutex<Vec<bool>>,
    }

    impl FakeRuntime {
        fn push_containers(&self, result: Result<Vec<ContainerSummary>, ()>) {
            self.containers.lock().unwrap().push(result);
        }

        fn push_images(&self, result: Result<Vec<ImageSummary>, ()>) {
            self.images.lock().unwrap().push(result);
        }
    }

    #[async_trait]
    impl Runtime for FakeRuntime {
        async fn list_containers(
            &self,
            include_stopped: bool,
        ) -> Result<Vec<ContainerSummary>, RuntimeError> {
            self.seen_include_stopped.lock().unwrap().push(include_stopped);
            let mut scripted = self.containers.lock().unwrap();
            match scripted.remove(0) {
                Ok(c) => Ok(c),
                Err(()) => Err(RuntimeError::Unavailable("scripted failure".into())),
            }
        }

        async fn memory_stats(&self, id: &str) -> Result<MemoryStats, RuntimeError> {
            if self.failing_stats.lock().unwrap().contains(id) {
                return Err(RuntimeError::EmptyResponse);
            }
            Ok(MemoryStats {
                usage: 1024,
                limit: 4096,
            })
        }

        async fn disk_usage(&self) -> Result<HashMap<String, i64>, RuntimeError> {
            Ok(self.disk.lock().unwrap().clone())
        }

        async fn list_images(&self) -> Result<Vec<ImageSummary>, RuntimeError> {
            let mut scripted = self.images.lock().unwrap();
            match scripted.remove(0) {
                Ok(i) => Ok(i),
                Err(()) => Err(RuntimeError::Unavailable("scripted failure".into())),
            }
        }

        async fn kill_container(&self, _id: &str) -> Result<(), RuntimeError> {
            Ok(())
        }

        async fn remove_container(&self, _id: &str) -> Result<(), RuntimeError> {
            Ok(())
        }

        async fn remove_image(&self, _id: &str) -> Result<(), RuntimeError> {
            Ok(())
        }

        async fn logs(&self, _id: &str) -> Result<String, RuntimeError> {
            Ok(String::new())
        }

        async fn inspect_container(&self, _id: &str) -> Result<String, RuntimeError> {
            Ok("{}".to_string())
        }

        async fn inspect_image(&self, _id: &str) -> Result<String, RuntimeError> {
            Ok("{}".to_string())
        }
    }

    #[derive(Default)]
    struct RecListener {
        container_events: AtomicUsize,
        image_events: AtomicUsize,
    }

    impl SyncListener for RecListener {
        fn containers_changed(&self, _containers: Arc<Vec<ContainerSummary>>) {
            self.container_events.fetch_add(1, Ordering::SeqCst);
        }

        fn images_changed(&self, _images: Arc<Vec<ImageSummary>>) {
            self.image_events.fetch_add(1, Ordering::SeqCst);
        }
    }

    #[tokio::test]
    async fn successful_cycle_publishes_and_notifies_once() {
        let runtime = FakeRuntime::default();
        runtime.push_containers(Ok(vec![container("aaa", "running")]));
        let svc = SyncService::new(runtime, Duration::from_secs(60));

        let listener = Arc::new(RecListener::default());
        svc.add_listener(listener.clone());

        svc.poll_containers_once().await;

        let snapshot = svc.containers();
        assert_eq!(snapshot.len(), 1);
        assert_eq!(snapshot[0].memory.usage, 1024);
        assert_eq!(listener.container_events.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn failed_cycle_keeps_snapshot_and_stays_silent() {
        let runtime = FakeRuntime::default();
        runtime.push_containers(Ok(vec![container("aaa", "running")]));
        runtime.push_containers(Err(()));
        let svc = SyncService::new(runtime, Duration::from_secs(60));

        let listener = Arc::new(RecListener::default());
        svc.add_listener(listener.clone());

        svc.poll_containers_once().await;
        svc.poll_containers_once().await;

        let snapshot = svc.containers();
        assert_eq!(snapshot.len(), 1);
        assert_eq!(snapshot[0].id, "aaa");
        assert_eq!(listener.container_events.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn failing_stats_degrade_to_zero_without_dropping_rows() {
        let runtime = FakeRuntime::default();
        runtime.push_containers(Ok(vec![
            container("aaa", "running"),
            container("bbb", "running"),
            container("ccc", "running"),
        ]));
        runtime.failing_stats.lock().unwrap().insert("bbb".to_string());
        let svc = SyncService::new(runtime, Duration::from_secs(60));

        svc.poll_containers_once().await;

        let snapshot = svc.containers();
        assert_eq!(snapshot.len(), 3);
        assert_eq!(snapshot[0].memory.usage, 1024);
        assert_eq!(snapshot[1].memory.usage, 0);
        assert_eq!(snapshot[2].memory.usage, 1024);
    }

    #[tokio::test]
    async fn stopped_containers_skip_stats_fetch() {
        let runtime = FakeRuntime::default();
        // stats for "bbb" would fail if requested
        runtime.failing_stats.lock().unwrap().insert("bbb".to_string());
        runtime.push_containers(Ok(vec![container("bbb", "exited")]));
        let svc = SyncService::new(runtime, Duration::from_secs(60));

        svc.poll_containers_once().await;

        let snapshot = svc.containers();
        assert_eq!(snapshot[0].memory.usage, 0);
    }

    #[tokio::test]
    async fn stale_sequence_is_discarded() {
        let runtime = FakeRuntime::default();
        let svc = SyncService::new(runtime, Duration::from_secs(60));

        assert!(svc.publish_containers(2, vec![container("new", "running")]));
        assert!(!svc.publish_containers(1, vec![container("old", "running")]));

        let snapshot = svc.containers();
        assert_eq!(snapshot[0].id, "new");
    }

    #[tokio::test]
    async fn only_running_toggle_controls_listing() {
        let runtime = FakeRuntime::default();
        runtime.push_containers(Ok(vec![]));
        runtime.push_containers(Ok(vec![]));
        let svc = SyncService::new(runtime, Duration::from_secs(60));

        svc.poll_containers_once().await;
        svc.toggle_only_running();
        svc.poll_containers_once().await;

        let seen = svc.runtime.seen_include_stopped.lock().unwrap().clone();
        assert_eq!(seen, vec![false, true]);
    }

    #[tokio::test]
    async fn disk_usage_merges_into_container_rows() {
        let runtime = FakeRuntime::default();
        runtime.disk.lock().unwrap().insert("aaa".to_string(), 2048);
        runtime.push_containers(Ok(vec![
            container("aaa", "running"),
            container("bbb", "running"),
        ]));
        let svc = SyncService::new(runtime, Duration::from_secs(60));

        svc.poll_disk_usage_once().await;
        svc.poll_containers_once().await;

        let snapshot = svc.containers();
        assert_eq!(snapshot[0].disk_usage, 2048);
        assert_eq!(snapshot[1].disk_usage, 0);
    }

    #[tokio::test]
    async fn image_cycle_publishes_and_notifies() {
        let runtime = FakeRuntime::default();
        runtime.push_images(Ok(vec![ImageSummary {
            id: "sha256:abc".to_string(),
            repo: "busybox".to_string(),
            tag: "latest".to_string(),
            created: 0,
        }]));
        runtime.push_images(Err(()));
        let svc = SyncService::new(runtime, Duration::from_secs(60));

        let listener = Arc::new(RecListener::default());
        svc.add_listener(listener.clone());

        svc.poll_images_once().await;
        svc.poll_images_once().await;

        assert_eq!(svc.images().len(), 1);
        assert_eq!(listener.image_events.load(Ordering::SeqCst), 1);
    }
}
