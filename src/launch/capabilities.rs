//! Per-application launch capabilities
//!
//! Maps an application class to the command that starts it and whether the
//! compositor can bind its first window to a workspace at spawn time.
//! Single-instance applications hand new windows to an already running
//! process, which escapes the spawn-time workspace rule, so they default to
//! switch-then-spawn.

use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

use crate::config::ApplicationOverride;
use crate::snapshot::WorkspaceId;

/// File in the hooks directory through which hooks register launch behaviour
pub const CAPABILITIES_FILE: &str = "capabilities.toml";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Capability {
    pub direct_workspace_launch: bool,
    /// Command template; `{class}` and `{workspace}` are substituted
    pub command: String,
}

/// (class, command template, direct workspace launch)
const BUILTIN: &[(&str, &str, bool)] = &[
    ("kitty", "kitty", true),
    ("alacritty", "alacritty", true),
    ("foot", "foot", true),
    ("org.wezfurlong.wezterm", "wezterm", true),
    ("firefox", "firefox --new-window", false),
    ("chromium", "chromium --new-window", false),
    ("google-chrome", "google-chrome-stable --new-window", false),
    ("brave-browser", "brave --new-window", false),
    ("code", "code --new-window", false),
    ("code-oss", "code-oss --new-window", false),
    ("thunar", "thunar", true),
    ("org.gnome.nautilus", "nautilus --new-window", false),
    ("obsidian", "obsidian", false),
    ("slack", "slack", false),
    ("discord", "discord", false),
];

/// Lookup table keyed by lowercased application class
#[derive(Debug, Clone, Default)]
pub struct CapabilityTable {
    entries: BTreeMap<String, Capability>,
}

impl CapabilityTable {
    /// Empty table; every class falls back to `Capability` defaults
    pub fn new() -> Self {
        Self::default()
    }

    /// Table seeded with common terminals, browsers and editors
    pub fn builtin() -> Self {
        let entries = BUILTIN
            .iter()
            .map(|(class, command, direct)| {
                (
                    class.to_string(),
                    Capability {
                        direct_workspace_launch: *direct,
                        command: command.to_string(),
                    },
                )
            })
            .collect();
        Self { entries }
    }

    /// Built-ins, then config overrides, then `capabilities.toml` from the hooks directory
    pub fn load(overrides: &BTreeMap<String, ApplicationOverride>, hooks_dir: &Path) -> Self {
        let mut table = Self::builtin();
        table.apply_overrides(overrides);

        let path = hooks_dir.join(CAPABILITIES_FILE);
        if path.is_file() {
            match fs::read_to_string(&path)
                .map_err(|e| e.to_string())
                .and_then(|contents| {
                    toml::from_str::<BTreeMap<String, ApplicationOverride>>(&contents)
                        .map_err(|e| e.to_string())
                }) {
                Ok(registered) => {
                    tracing::debug!(
                        path = %path.display(),
                        entries = registered.len(),
                        "Loaded hook capabilities"
                    );
                    table.apply_overrides(&registered);
                }
                Err(e) => {
                    tracing::warn!(path = %path.display(), error = %e, "Ignoring unreadable capabilities file");
                }
            }
        }

        table
    }

    /// Merge overrides field by field onto the current entries
    pub fn apply_overrides(&mut self, overrides: &BTreeMap<String, ApplicationOverride>) {
        for (class, entry) in overrides {
            let key = class.to_lowercase();
            let mut capability = self.lookup(&key);
            if let Some(command) = &entry.command {
                capability.command = command.clone();
            }
            if let Some(direct) = entry.direct_workspace_launch {
                capability.direct_workspace_launch = direct;
            }
            self.entries.insert(key, capability);
        }
    }

    /// Capability for a class. Unknown classes launch as their lowercased
    /// name and are assumed to honour direct workspace launch.
    pub fn lookup(&self, class: &str) -> Capability {
        let key = class.to_lowercase();
        self.entries.get(&key).cloned().unwrap_or(Capability {
            direct_workspace_launch: true,
            command: key,
        })
    }

    pub fn supports_direct_launch(&self, class: &str) -> bool {
        self.lookup(class).direct_workspace_launch
    }

    /// Rendered launch command for a class on a workspace
    pub fn launch_command(&self, class: &str, workspace_id: WorkspaceId) -> String {
        self.lookup(class)
            .command
            .replace("{class}", class)
            .replace("{workspace}", &workspace_id.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_unknown_class_defaults() {
        let table = CapabilityTable::builtin();
        assert_eq!(table.launch_command("Gimp", 3), "gimp");
        assert!(table.supports_direct_launch("Gimp"));
    }

    #[test]
    fn test_lookup_is_case_insensitive() {
        let table = CapabilityTable::builtin();
        assert_eq!(table.launch_command("Code", 1), "code --new-window");
        assert!(!table.supports_direct_launch("Code"));
        assert!(table.supports_direct_launch("KITTY"));
    }

    #[test]
    fn test_template_substitution() {
        let mut overrides = BTreeMap::new();
        overrides.insert(
            "kitty".to_string(),
            ApplicationOverride {
                command: Some("kitty --class {class} --title ws{workspace}".to_string()),
                direct_workspace_launch: None,
            },
        );
        let mut table = CapabilityTable::builtin();
        table.apply_overrides(&overrides);

        assert_eq!(
            table.launch_command("kitty", 4),
            "kitty --class kitty --title ws4"
        );
        // Unset fields keep the built-in value
        assert!(table.supports_direct_launch("kitty"));
    }

    #[test]
    fn test_hook_file_overrides_config() {
        let dir = tempdir().unwrap();
        fs::write(
            dir.path().join(CAPABILITIES_FILE),
            "[firefox]\ndirect_workspace_launch = true\n",
        )
        .unwrap();

        let mut config = BTreeMap::new();
        config.insert(
            "firefox".to_string(),
            ApplicationOverride {
                command: Some("firefox -P work".to_string()),
                direct_workspace_launch: Some(false),
            },
        );

        let table = CapabilityTable::load(&config, dir.path());
        assert_eq!(table.launch_command("firefox", 2), "firefox -P work");
        assert!(table.supports_direct_launch("firefox"));
    }

    #[test]
    fn test_malformed_hook_file_is_ignored() {
        let dir = tempdir().unwrap();
        fs::write(dir.path().join(CAPABILITIES_FILE), "[firefox\n").unwrap();

        let table = CapabilityTable::load(&BTreeMap::new(), dir.path());
        assert_eq!(table.launch_command("firefox", 1), "firefox --new-window");
    }
}
