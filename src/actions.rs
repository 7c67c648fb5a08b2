/// Typed operations emitted by key handlers and performed in the main loop.
///
/// Handlers run inside the view tree and cannot call the runtime directly;
/// they push an action onto an unbounded channel that the main loop drains
/// after input dispatch.
#[derive(Clone, Debug)]
pub enum Action {
    InspectContainer(String),
    KillContainer(String),
    RemoveContainer(String),
    ContainerLogs(String),
    ContainerShell { id: String, shell: &'static str },
    ToggleOnlyRunning,
    InspectImage(String),
    RemoveImage(String),
    ImageShell { id: String, shell: &'static str },
    ShowHelp,
}
