use std::any::Any;
use std::sync::Arc;

use parking_lot::RwLock;

use dockmon_docker::{Runtime, SyncListener, SyncService};
use dockmon_types::{format_bytes, short_id, truncate_left, ContainerSummary, ImageSummary};
use dockmon_ui::{ListItem, ListModel, ModelListener, ModelListeners};

/// Property key toggling the stopped-container filter on the container model
pub const ONLY_RUNNING_PROPERTY: &str = "only_running";

/// One rendered container line
pub struct ContainerRow(ContainerSummary);

impl ContainerRow {
    pub fn new(summary: ContainerSummary) -> Self {
        Self(summary)
    }

    pub fn summary(&self) -> &ContainerSummary {
        &self.0
    }
}

impl ListItem for ContainerRow {
    fn text(&self) -> String {
        let c = &self.0;
        // Untagged containers carry a raw digest as their image reference
        let image = if c.image.starts_with("sha256:") {
            short_id(&c.image).to_string()
        } else {
            truncate_left(&c.image, 40)
        };
        format!(
            "{:<12}  {:<40}  {:<30}  {:<30}  {:>9} / {:<9}  {:>9}",
            c.short_id(),
            image,
            truncate_left(&c.command, 30),
            truncate_left(&c.status, 30),
            format_bytes(c.memory.usage),
            format_bytes(c.memory.limit),
            format_bytes(c.disk_usage.max(0) as u64),
        )
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

/// One rendered image line
pub struct ImageRow(ImageSummary);

impl ImageRow {
    pub fn new(summary: ImageSummary) -> Self {
        Self(summary)
    }

    pub fn summary(&self) -> &ImageSummary {
        &self.0
    }
}

impl ListItem for ImageRow {
    fn text(&self) -> String {
        let i = &self.0;
        format!(
            "{:<12}  {:<60}  {:<20}  {}",
            i.short_id(),
            truncate_left(&i.repo, 60),
            truncate_left(&i.tag, 20),
            i.age(),
        )
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

/// List model over the container snapshot published by the sync service.
///
/// Registered on the service as a listener; each published snapshot swaps
/// the local `Arc` and notifies the list, which re-clamps its selection on
/// the next draw.
pub struct ContainerListModel<R: Runtime> {
    service: SyncService<R>,
    rows: RwLock<Arc<Vec<ContainerSummary>>>,
    listeners: ModelListeners,
}

impl<R: Runtime> ContainerListModel<R> {
    pub fn new(service: SyncService<R>) -> Arc<Self> {
        Arc::new(Self {
            rows: RwLock::new(service.containers()),
            service,
            listeners: ModelListeners::new(),
        })
    }
}

impl<R: Runtime> SyncListener for ContainerListModel<R> {
    fn containers_changed(&self, containers: Arc<Vec<ContainerSummary>>) {
        *self.rows.write() = containers;
        self.listeners.notify();
    }

    fn images_changed(&self, _images: Arc<Vec<ImageSummary>>) {}
}

impl<R: Runtime> ListModel for ContainerListModel<R> {
    fn len(&self) -> usize {
        self.rows.read().len()
    }

    fn item(&self, index: usize) -> Option<Arc<dyn ListItem>> {
        self.rows
            .read()
            .get(index)
            .map(|c| Arc::new(ContainerRow(c.clone())) as Arc<dyn ListItem>)
    }

    fn set_property(&self, key: &str, _value: Option<&str>) {
        if key == ONLY_RUNNING_PROPERTY {
            self.service.toggle_only_running();
        }
    }

    fn update(&self) {
        self.service.refresh_containers_now();
    }

    fn subscribe(&self, listener: ModelListener) {
        self.listeners.add(listener);
    }
}

/// List model over the image snapshot published by the sync service
pub struct ImageListModel<R: Runtime> {
    service: SyncService<R>,
    rows: RwLock<Arc<Vec<ImageSummary>>>,
    listeners: ModelListeners,
}

impl<R: Runtime> ImageListModel<R> {
    pub fn new(service: SyncService<R>) -> Arc<Self> {
        Arc::new(Self {
            rows: RwLock::new(service.images()),
            service,
            listeners: ModelListeners::new(),
        })
    }
}

impl<R: Runtime> SyncListener for ImageListModel<R> {
    fn containers_changed(&self, _containers: Arc<Vec<ContainerSummary>>) {}

    fn images_changed(&self, images: Arc<Vec<ImageSummary>>) {
        *self.rows.write() = images;
        self.listeners.notify();
    }
}

impl<R: Runtime> ListModel for ImageListModel<R> {
    fn len(&self) -> usize {
        self.rows.read().len()
    }

    fn item(&self, index: usize) -> Option<Arc<dyn ListItem>> {
        self.rows
            .read()
            .get(index)
            .map(|i| Arc::new(ImageRow(i.clone())) as Arc<dyn ListItem>)
    }

    fn update(&self) {
        self.service.refresh_images_now();
    }

    fn subscribe(&self, listener: ModelListener) {
        self.listeners.add(listener);
    }
}
