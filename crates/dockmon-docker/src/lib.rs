//! Docker client glue and background synchronization for dockmon
//!
//! The [`Runtime`] trait is the seam to the container runtime; everything
//! behind it is a thin call-through to the Docker API. [`SyncService`]
//! keeps container/image/disk-usage snapshots fresh on timers and fans
//! change notifications out to registered listeners.

mod error;
mod runtime;
mod service;

pub use error::RuntimeError;
pub use runtime::{DockerRuntime, Runtime};
pub use service::{SyncListener, SyncService};

// Re-export types used in our public API
pub use dockmon_types::{ContainerSummary, ImageSummary, MemoryStats};
