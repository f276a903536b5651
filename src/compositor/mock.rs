//! Mock compositor for deterministic testing
//!
//! Simulates workspaces, windows and application spawning in memory and
//! records every dispatched command in order, so tests can assert on the
//! exact command sequence an orchestrator produced.
//!
//! # Example
//! ```no_run
//! use hyprsession::compositor::{Compositor, CompositorCommand, MockApp, MockCompositor};
//!
//! #[tokio::test]
//! async fn test_spawn() {
//!     let compositor = MockCompositor::new()
//!         .with_workspace(1, "1", "DP-1")
//!         .with_app("firefox", MockApp::new("firefox").appearing_after(2));
//!
//!     compositor
//!         .dispatch(&CompositorCommand::Exec { command: "firefox".into() })
//!         .await
//!         .unwrap();
//! }
//! ```

use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::Mutex;

use super::{Compositor, CompositorCommand, CompositorError, LiveWindow, LiveWorkspace, Monitor};
use crate::snapshot::WorkspaceId;

/// How a launched command behaves in the simulation
#[derive(Debug, Clone)]
pub struct MockApp {
    /// Class of the window the command opens
    pub class: String,
    /// Number of `clients()` polls before the window maps; None never maps
    pub appear_after_polls: Option<u32>,
    /// Whether the spawn itself fails
    pub fail_spawn: bool,
}

impl MockApp {
    /// Window appears immediately on spawn
    pub fn new(class: impl Into<String>) -> Self {
        Self {
            class: class.into(),
            appear_after_polls: Some(0),
            fail_spawn: false,
        }
    }

    pub fn appearing_after(mut self, polls: u32) -> Self {
        self.appear_after_polls = Some(polls);
        self
    }

    pub fn never_appearing(mut self) -> Self {
        self.appear_after_polls = None;
        self
    }

    pub fn failing(mut self) -> Self {
        self.fail_spawn = true;
        self
    }
}

#[derive(Debug, Clone)]
struct MockWorkspace {
    name: String,
    monitor: String,
}

#[derive(Debug, Clone)]
struct PendingWindow {
    class: String,
    workspace_id: WorkspaceId,
    polls_remaining: u32,
}

#[derive(Debug, Default)]
struct MockState {
    workspaces: BTreeMap<WorkspaceId, MockWorkspace>,
    clients: Vec<LiveWindow>,
    monitors: Vec<Monitor>,
    active_workspace: Option<WorkspaceId>,
    apps: HashMap<String, MockApp>,
    pending: Vec<PendingWindow>,
    log: Vec<CompositorCommand>,
    reject_direct_launch: bool,
    fail_queries: bool,
    client_queries: u32,
    next_address: u64,
}

impl MockState {
    fn ensure_workspace(&mut self, id: WorkspaceId) {
        let monitor = self
            .monitors
            .first()
            .map(|m| m.name.clone())
            .unwrap_or_else(|| "MOCK-1".to_string());
        self.workspaces.entry(id).or_insert_with(|| MockWorkspace {
            name: id.to_string(),
            monitor,
        });
    }

    fn window_mut(&mut self, address: &str) -> Result<&mut LiveWindow, CompositorError> {
        self.clients
            .iter_mut()
            .find(|w| w.address == address)
            .ok_or_else(|| CompositorError::Rejected {
                command: format!("address:{}", address),
                reply: "No such window".to_string(),
            })
    }

    fn spawn(&mut self, command: &str, workspace_id: WorkspaceId) -> Result<(), CompositorError> {
        let app = self.apps.get(command).cloned().unwrap_or_else(|| {
            MockApp::new(command.split_whitespace().next().unwrap_or(command))
        });
        if app.fail_spawn {
            return Err(CompositorError::CommandFailed {
                command: format!("exec {}", command),
                message: "spawn failed".to_string(),
            });
        }
        match app.appear_after_polls {
            Some(0) => self.map_window(app.class, workspace_id),
            Some(polls) => self.pending.push(PendingWindow {
                class: app.class,
                workspace_id,
                polls_remaining: polls,
            }),
            None => {}
        }
        Ok(())
    }

    fn map_window(&mut self, class: String, workspace_id: WorkspaceId) {
        self.ensure_workspace(workspace_id);
        self.next_address += 1;
        let address = format!("0xmock{:04}", self.next_address);
        self.clients
            .push(LiveWindow::new(address, class, workspace_id));
    }

    fn tick_pending(&mut self) {
        let mut ready = Vec::new();
        for pending in &mut self.pending {
            pending.polls_remaining = pending.polls_remaining.saturating_sub(1);
            if pending.polls_remaining == 0 {
                ready.push((pending.class.clone(), pending.workspace_id));
            }
        }
        self.pending.retain(|p| p.polls_remaining > 0);
        for (class, workspace_id) in ready {
            self.map_window(class, workspace_id);
        }
    }

    fn query_guard(&self, query: &str) -> Result<(), CompositorError> {
        if self.fail_queries {
            Err(CompositorError::CommandFailed {
                command: format!("-j {}", query),
                message: "mock query failure".to_string(),
            })
        } else {
            Ok(())
        }
    }
}

/// In-memory compositor
#[derive(Clone, Default)]
pub struct MockCompositor {
    state: Arc<Mutex<MockState>>,
}

impl MockCompositor {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_monitor(self, id: i64, name: &str) -> Self {
        {
            let mut state = self.state.lock();
            let focused = state.monitors.is_empty();
            state.monitors.push(Monitor {
                id,
                name: name.to_string(),
                focused,
                active_workspace_id: None,
            });
        }
        self
    }

    pub fn with_workspace(self, id: WorkspaceId, name: &str, monitor: &str) -> Self {
        {
            let mut state = self.state.lock();
            state.workspaces.insert(
                id,
                MockWorkspace {
                    name: name.to_string(),
                    monitor: monitor.to_string(),
                },
            );
            if state.active_workspace.is_none() {
                state.active_workspace = Some(id);
            }
        }
        self
    }

    pub fn with_window(self, window: LiveWindow) -> Self {
        {
            let mut state = self.state.lock();
            state.ensure_workspace(window.workspace_id);
            state.clients.push(window);
        }
        self
    }

    pub fn with_active_workspace(self, id: WorkspaceId) -> Self {
        self.state.lock().active_workspace = Some(id);
        self
    }

    /// Register how a launch command behaves
    pub fn with_app(self, command: &str, app: MockApp) -> Self {
        self.state.lock().apps.insert(command.to_string(), app);
        self
    }

    /// Reject every workspace-targeted exec
    pub fn rejecting_direct_launch(self) -> Self {
        self.state.lock().reject_direct_launch = true;
        self
    }

    /// Fail every query
    pub fn failing_queries(self) -> Self {
        self.state.lock().fail_queries = true;
        self
    }

    /// Every command dispatched so far, in order
    pub fn commands(&self) -> Vec<CompositorCommand> {
        self.state.lock().log.clone()
    }

    /// Number of `clients()` queries served
    pub fn client_queries(&self) -> u32 {
        self.state.lock().client_queries
    }

    pub fn live_windows(&self) -> Vec<LiveWindow> {
        self.state.lock().clients.clone()
    }

    pub fn workspace_name(&self, id: WorkspaceId) -> Option<String> {
        self.state.lock().workspaces.get(&id).map(|w| w.name.clone())
    }

    pub fn current_workspace(&self) -> Option<WorkspaceId> {
        self.state.lock().active_workspace
    }
}

#[async_trait]
impl Compositor for MockCompositor {
    async fn clients(&self) -> Result<Vec<LiveWindow>, CompositorError> {
        let mut state = self.state.lock();
        state.query_guard("clients")?;
        state.client_queries += 1;
        state.tick_pending();
        Ok(state.clients.clone())
    }

    async fn workspaces(&self) -> Result<Vec<LiveWorkspace>, CompositorError> {
        let state = self.state.lock();
        state.query_guard("workspaces")?;
        let monitor_ids: HashMap<&str, i64> = state
            .monitors
            .iter()
            .map(|m| (m.name.as_str(), m.id))
            .collect();
        Ok(state
            .workspaces
            .iter()
            .map(|(id, ws)| LiveWorkspace {
                id: *id,
                name: ws.name.clone(),
                monitor: ws.monitor.clone(),
                monitor_id: monitor_ids.get(ws.monitor.as_str()).copied(),
                windows: state.clients.iter().filter(|c| c.workspace_id == *id).count(),
                has_fullscreen: state
                    .clients
                    .iter()
                    .any(|c| c.workspace_id == *id && c.fullscreen),
            })
            .collect())
    }

    async fn monitors(&self) -> Result<Vec<Monitor>, CompositorError> {
        let state = self.state.lock();
        state.query_guard("monitors")?;
        let active = state.active_workspace;
        Ok(state
            .monitors
            .iter()
            .map(|m| Monitor {
                active_workspace_id: if m.focused { active } else { m.active_workspace_id },
                ..m.clone()
            })
            .collect())
    }

    async fn active_workspace(&self) -> Result<Option<WorkspaceId>, CompositorError> {
        let state = self.state.lock();
        state.query_guard("activeworkspace")?;
        Ok(state.active_workspace)
    }

    async fn dispatch(&self, command: &CompositorCommand) -> Result<(), CompositorError> {
        let mut state = self.state.lock();
        state.log.push(command.clone());

        match command {
            CompositorCommand::SwitchWorkspace(id) => {
                state.ensure_workspace(*id);
                state.active_workspace = Some(*id);
            }
            CompositorCommand::RenameWorkspace { id, name } => {
                match state.workspaces.get_mut(id) {
                    Some(ws) => ws.name = name.clone(),
                    None => {
                        return Err(CompositorError::Rejected {
                            command: command.describe(),
                            reply: "No such workspace".to_string(),
                        })
                    }
                }
            }
            CompositorCommand::MoveToWorkspace {
                address,
                workspace_id,
            } => {
                state.ensure_workspace(*workspace_id);
                state.window_mut(address)?.workspace_id = *workspace_id;
            }
            CompositorCommand::ToggleFloating { address } => {
                let window = state.window_mut(address)?;
                window.floating = !window.floating;
            }
            CompositorCommand::SetFullscreen { address, enabled } => {
                state.window_mut(address)?.fullscreen = *enabled;
            }
            CompositorCommand::Pin { address } => {
                let window = state.window_mut(address)?;
                window.pinned = !window.pinned;
            }
            CompositorCommand::FocusWindow { address } => {
                let workspace_id = state.window_mut(address)?.workspace_id;
                for client in state.clients.iter_mut() {
                    if client.focus_history_id >= 0 {
                        client.focus_history_id += 1;
                    }
                }
                state.window_mut(address)?.focus_history_id = 0;
                state.active_workspace = Some(workspace_id);
            }
            CompositorCommand::SetGeometry {
                address,
                position,
                size,
            } => {
                let window = state.window_mut(address)?;
                window.position = *position;
                window.size = *size;
            }
            CompositorCommand::Exec { command } => {
                let target = state.active_workspace.unwrap_or(1);
                state.spawn(command, target)?;
            }
            CompositorCommand::ExecOnWorkspace {
                command,
                workspace_id,
            } => {
                if state.reject_direct_launch {
                    return Err(CompositorError::Rejected {
                        command: CompositorCommand::ExecOnWorkspace {
                            command: command.clone(),
                            workspace_id: *workspace_id,
                        }
                        .describe(),
                        reply: "workspace rules unsupported".to_string(),
                    });
                }
                state.spawn(command, *workspace_id)?;
            }
        }

        Ok(())
    }
}
