use std::fs::OpenOptions;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::Parser;
use crossterm::event::KeyCode;
use tokio::sync::mpsc;
use tracing::warn;

use dockmon_docker::{DockerRuntime, Runtime, SyncService};
use dockmon_types::{ContainerSummary, ImageSummary};
use dockmon_ui::{
    Application, BorderStyle, Event, EventHandler, KeyBinding, KeyHandler, List, ListModel,
    ListSelection, Rect, TextView, TitledContainer, Tui, View,
};

mod actions;
mod models;

use actions::Action;
use models::{ContainerListModel, ContainerRow, ImageListModel, ImageRow, ONLY_RUNNING_PROPERTY};

/// Idle sleep between input polls when the queue is empty
const TICK: Duration = Duration::from_millis(50);
/// Capacity of the bounded input event queue
const EVENT_QUEUE: usize = 64;

const HELP_TEXT: &str = "\
Global
  Tab        switch between panels
  Esc        close popup / quit
  h          this help

Containers
  Up/Down    move selection
  v          inspect
  l          logs
  k          kill (SIGKILL)
  d, Del     remove
  s          shell (sh)
  b          shell (bash)
  a          toggle stopped containers

Images
  Up/Down    move selection
  v          inspect
  Del        remove
  s          run shell (sh)
  b          run shell (bash)";

/// Dockmon - a terminal dashboard for local Docker containers and images
#[derive(Parser, Debug)]
#[command(name = "dockmon")]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Refresh interval for containers and images, in milliseconds
    #[arg(long, default_value = "1000")]
    poll_interval_ms: u64,

    /// Diagnostic log file, appended to
    #[arg(long, default_value = "dockmon.log")]
    log_file: String,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    // Diagnostics go to a file so they never corrupt the raw-mode screen
    let log_file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(&args.log_file)
        .with_context(|| format!("cannot open log file {}", args.log_file))?;
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::INFO.into()),
        )
        .with_writer(Arc::new(log_file))
        .with_ansi(false)
        .init();

    let result = run_app(args).await;

    if let Err(e) = &result {
        eprintln!("Error: {:#}", e);
    }

    result
}

async fn run_app(args: Args) -> Result<()> {
    crossterm::terminal::size().context("cannot determine terminal size")?;

    let runtime = DockerRuntime::connect().context("cannot configure the Docker client")?;
    // Fail fast, before entering the alternate screen
    runtime
        .list_containers(false)
        .await
        .context("cannot reach the Docker daemon")?;

    let service = SyncService::new(runtime, Duration::from_millis(args.poll_interval_ms));
    let containers_model = ContainerListModel::new(service.clone());
    let images_model = ImageListModel::new(service.clone());
    service.add_listener(containers_model.clone());
    service.add_listener(images_model.clone());

    let (action_tx, mut action_rx) = mpsc::unbounded_channel::<Action>();

    let mut tui = Tui::new()?;
    let mut events = EventHandler::new(EVENT_QUEUE);

    let mut app = Application::new();
    app.add(build_containers_view(containers_model.clone(), &action_tx));
    app.add(build_images_view(images_model, &action_tx));

    let size = tui.terminal().size()?;
    let mut area = Rect::new(0, 0, size.width, size.height);
    layout(&mut app, area);

    service.start();

    while app.is_running() {
        // Drain at most one input event; sleep briefly when idle instead
        // of suspending on the queue
        match events.try_next() {
            Some(event) => apply_event(&mut app, &mut area, event)?,
            None => tokio::time::sleep(TICK).await,
        }

        while let Ok(action) = action_rx.try_recv() {
            handle_action(
                &mut app,
                &mut tui,
                &mut events,
                &service,
                containers_model.as_ref(),
                area,
                action,
            )
            .await?;
        }

        if app.needs_redraw() {
            tui.terminal().draw(|frame| {
                app.render(frame.buffer_mut());
            })?;
        }
    }

    service.shutdown();
    events.shutdown();
    tui.restore()?;

    Ok(())
}

/// Apply one captured terminal event to the shell. Input-stream errors
/// are fatal: once capture breaks the screen state can no longer be
/// trusted and there is no input path left to quit with.
fn apply_event(app: &mut Application, area: &mut Rect, event: Event) -> Result<()> {
    match event {
        Event::Key(key) => app.handle_key(key),
        Event::Resize(w, h) => {
            *area = Rect::new(0, 0, w, h);
            layout(app, *area);
        }
        Event::Error(e) => anyhow::bail!("input stream failed: {e}"),
    }
    Ok(())
}

async fn handle_action(
    app: &mut Application,
    tui: &mut Tui,
    events: &mut EventHandler,
    service: &SyncService<DockerRuntime>,
    containers_model: &ContainerListModel<DockerRuntime>,
    area: Rect,
    action: Action,
) -> Result<()> {
    match action {
        Action::InspectContainer(id) => {
            let text = service.inspect_container(&id).await.unwrap_or_else(|e| {
                warn!("inspect container {id} failed: {e}");
                String::new()
            });
            app.show_popup(text_popup("Inspect", &text, area));
        }
        Action::ContainerLogs(id) => {
            let text = service.logs(&id).await.unwrap_or_else(|e| {
                warn!("logs for {id} failed: {e}");
                String::new()
            });
            app.show_popup(text_popup("Logs", &text, area));
        }
        Action::KillContainer(id) => {
            if let Err(e) = service.kill_container(&id).await {
                warn!("kill {id} failed: {e}");
            }
            service.refresh_containers_now();
        }
        Action::RemoveContainer(id) => {
            if let Err(e) = service.remove_container(&id).await {
                warn!("remove container {id} failed: {e}");
            }
            service.refresh_containers_now();
        }
        Action::ContainerShell { id, shell } => {
            run_attached(app, tui, events, &["exec", "-it", &id, shell]).await?;
        }
        Action::ToggleOnlyRunning => {
            containers_model.set_property(ONLY_RUNNING_PROPERTY, None);
        }
        Action::InspectImage(id) => {
            let text = service.inspect_image(&id).await.unwrap_or_else(|e| {
                warn!("inspect image {id} failed: {e}");
                String::new()
            });
            app.show_popup(text_popup("Inspect", &text, area));
        }
        Action::RemoveImage(id) => {
            if let Err(e) = service.remove_image(&id).await {
                warn!("remove image {id} failed: {e}");
            }
            service.refresh_images_now();
        }
        Action::ImageShell { id, shell } => {
            run_attached(app, tui, events, &["run", "-it", "--entrypoint", shell, &id]).await?;
        }
        Action::ShowHelp => {
            app.show_popup(text_popup("Help", HELP_TEXT, area));
        }
    }
    Ok(())
}

/// Hand the terminal over to an interactive `docker` subprocess, then
/// reassert control and restart input capture.
async fn run_attached(
    app: &mut Application,
    tui: &mut Tui,
    events: &mut EventHandler,
    args: &[&str],
) -> Result<()> {
    events.shutdown();
    tui.suspend()?;

    let status = tokio::process::Command::new("docker")
        .args(args)
        .status()
        .await;
    match status {
        Ok(status) if !status.success() => warn!("docker {args:?} exited with {status}"),
        Err(e) => warn!("docker {args:?} failed to start: {e}"),
        _ => {}
    }

    tui.resume()?;
    *events = EventHandler::new(EVENT_QUEUE);

    // The alternate screen was cleared; relayout to repaint everything
    let size = tui.terminal().size()?;
    layout(app, Rect::new(0, 0, size.width, size.height));
    Ok(())
}

fn build_containers_view(
    model: Arc<ContainerListModel<DockerRuntime>>,
    tx: &mpsc::UnboundedSender<Action>,
) -> Box<dyn View> {
    let mut list = List::new();
    list.set_model(model);
    let sel = list.selection();

    list.add_key_handler(
        KeyBinding::char('v'),
        on_container(&sel, tx, |c| Action::InspectContainer(c.id.clone())),
    );
    list.add_key_handler(
        KeyBinding::char('l'),
        on_container(&sel, tx, |c| Action::ContainerLogs(c.id.clone())),
    );
    list.add_key_handler(
        KeyBinding::char('k'),
        on_container(&sel, tx, |c| Action::KillContainer(c.id.clone())),
    );
    list.add_key_handler(
        KeyBinding::char('d'),
        on_container(&sel, tx, |c| Action::RemoveContainer(c.id.clone())),
    );
    list.add_key_handler(
        KeyBinding::new(KeyCode::Delete),
        on_container(&sel, tx, |c| Action::RemoveContainer(c.id.clone())),
    );
    list.add_key_handler(
        KeyBinding::char('s'),
        on_container(&sel, tx, |c| Action::ContainerShell {
            id: c.id.clone(),
            shell: "sh",
        }),
    );
    list.add_key_handler(
        KeyBinding::char('b'),
        on_container(&sel, tx, |c| Action::ContainerShell {
            id: c.id.clone(),
            shell: "bash",
        }),
    );
    list.add_key_handler(KeyBinding::char('a'), send(tx, Action::ToggleOnlyRunning));
    list.add_key_handler(KeyBinding::char('h'), send(tx, Action::ShowHelp));

    Box::new(TitledContainer::new(
        "Containers",
        Box::new(list),
        BorderStyle::Header,
    ))
}

fn build_images_view(
    model: Arc<ImageListModel<DockerRuntime>>,
    tx: &mpsc::UnboundedSender<Action>,
) -> Box<dyn View> {
    let mut list = List::new();
    list.set_model(model);
    let sel = list.selection();

    list.add_key_handler(
        KeyBinding::char('v'),
        on_image(&sel, tx, |i| Action::InspectImage(i.id.clone())),
    );
    list.add_key_handler(
        KeyBinding::new(KeyCode::Delete),
        on_image(&sel, tx, |i| Action::RemoveImage(i.id.clone())),
    );
    list.add_key_handler(
        KeyBinding::char('s'),
        on_image(&sel, tx, |i| Action::ImageShell {
            id: i.id.clone(),
            shell: "sh",
        }),
    );
    list.add_key_handler(
        KeyBinding::char('b'),
        on_image(&sel, tx, |i| Action::ImageShell {
            id: i.id.clone(),
            shell: "bash",
        }),
    );
    list.add_key_handler(KeyBinding::char('h'), send(tx, Action::ShowHelp));

    Box::new(TitledContainer::new(
        "Images",
        Box::new(list),
        BorderStyle::Header,
    ))
}

/// Handler emitting an action built from the selected container, if any
fn on_container(
    selection: &ListSelection,
    tx: &mpsc::UnboundedSender<Action>,
    make: impl Fn(&ContainerSummary) -> Action + Send + 'static,
) -> KeyHandler {
    let selection = selection.clone();
    let tx = tx.clone();
    Box::new(move |_| {
        if let Some(item) = selection.item() {
            if let Some(row) = item.as_any().downcast_ref::<ContainerRow>() {
                let _ = tx.send(make(row.summary()));
            }
        }
    })
}

/// Handler emitting an action built from the selected image, if any
fn on_image(
    selection: &ListSelection,
    tx: &mpsc::UnboundedSender<Action>,
    make: impl Fn(&ImageSummary) -> Action + Send + 'static,
) -> KeyHandler {
    let selection = selection.clone();
    let tx = tx.clone();
    Box::new(move |_| {
        if let Some(item) = selection.item() {
            if let Some(row) = item.as_any().downcast_ref::<ImageRow>() {
                let _ = tx.send(make(row.summary()));
            }
        }
    })
}

/// Handler emitting a fixed action, regardless of selection
fn send(tx: &mpsc::UnboundedSender<Action>, action: Action) -> KeyHandler {
    let tx = tx.clone();
    Box::new(move |_| {
        let _ = tx.send(action.clone());
    })
}

/// Containers take the upper two thirds, images the rest
fn layout(app: &mut Application, area: Rect) {
    let split = area.height * 2 / 3;
    let rects = [
        Rect::new(0, 0, area.width, split),
        Rect::new(0, split, area.width, area.height - split),
    ];
    for (view, rect) in app.views_mut().zip(rects) {
        view.set_rect(rect);
    }
}

/// Centered popup covering three quarters of the width and four fifths of
/// the height
fn popup_rect(area: Rect) -> Rect {
    let w = area.width * 3 / 4;
    let h = area.height * 4 / 5;
    Rect::new(
        area.x + (area.width - w) / 2,
        area.y + (area.height - h) / 2,
        w,
        h,
    )
}

fn text_popup(title: &str, text: &str, area: Rect) -> Box<dyn View> {
    let mut popup = TitledContainer::new(title, Box::new(TextView::new(text)), BorderStyle::Line);
    popup.set_rect(popup_rect(area));
    Box::new(popup)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_popup_rect_is_centered() {
        let rect = popup_rect(Rect::new(0, 0, 80, 40));
        assert_eq!(rect, Rect::new(10, 4, 60, 32));
    }

    #[test]
    fn test_layout_splits_two_to_one() {
        let mut app = Application::new();
        app.add(Box::new(TextView::new("containers")));
        app.add(Box::new(TextView::new("images")));
        layout(&mut app, Rect::new(0, 0, 80, 30));

        let rects: Vec<Rect> = app.views_mut().map(|v| v.rect()).collect();
        assert_eq!(rects[0], Rect::new(0, 0, 80, 20));
        assert_eq!(rects[1], Rect::new(0, 20, 80, 10));
    }

    #[test]
    fn test_resize_event_recomputes_layout() {
        let mut app = Application::new();
        app.add(Box::new(TextView::new("containers")));
        app.add(Box::new(TextView::new("images")));
        let mut area = Rect::new(0, 0, 80, 30);

        apply_event(&mut app, &mut area, Event::Resize(100, 60)).unwrap();
        assert_eq!(area, Rect::new(0, 0, 100, 60));
        let rects: Vec<Rect> = app.views_mut().map(|v| v.rect()).collect();
        assert_eq!(rects[0], Rect::new(0, 0, 100, 40));
        assert_eq!(rects[1], Rect::new(0, 40, 100, 20));
    }

    #[test]
    fn test_input_stream_error_is_fatal() {
        let mut app = Application::new();
        app.add(Box::new(TextView::new("containers")));
        let mut area = Rect::new(0, 0, 80, 30);

        let result = apply_event(&mut app, &mut area, Event::Error("broken pipe".into()));
        assert!(result.is_err());
    }
}
