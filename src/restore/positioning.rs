//! Matching snapshot windows to live windows
//!
//! Addresses do not survive a compositor restart, so a recorded window is
//! paired with a live one by class, then by title. Each live window is
//! claimed at most once.

use std::collections::HashSet;

use crate::compositor::{CompositorCommand, LiveWindow};
use crate::snapshot::WindowState;

/// Pairs recorded windows with live ones, claiming each live window once
pub struct WindowMatcher<'a> {
    live: &'a [LiveWindow],
    claimed: HashSet<usize>,
}

impl<'a> WindowMatcher<'a> {
    pub fn new(live: &'a [LiveWindow]) -> Self {
        Self {
            live,
            claimed: HashSet::new(),
        }
    }

    /// Best unclaimed live window for `wanted`: same class with an exact
    /// title, else the most similar title, else the first of the class.
    pub fn claim(&mut self, wanted: &WindowState) -> Option<&'a LiveWindow> {
        let candidates: Vec<usize> = self
            .live
            .iter()
            .enumerate()
            .filter(|(idx, w)| {
                !self.claimed.contains(idx)
                    && w.class.eq_ignore_ascii_case(&wanted.application_class)
            })
            .map(|(idx, _)| idx)
            .collect();

        let chosen = candidates
            .iter()
            .copied()
            .find(|idx| self.live[*idx].title == wanted.title)
            .or_else(|| {
                let mut best: Option<(usize, usize)> = None;
                for idx in &candidates {
                    let score = title_similarity(&self.live[*idx].title, &wanted.title);
                    if score > 0 && best.map_or(true, |(_, s)| score > s) {
                        best = Some((*idx, score));
                    }
                }
                best.map(|(idx, _)| idx)
            })
            .or_else(|| candidates.first().copied())?;

        self.claimed.insert(chosen);
        Some(&self.live[chosen])
    }
}

/// Number of distinct words two titles share, ignoring case and punctuation-only tokens
pub fn title_similarity(a: &str, b: &str) -> usize {
    let words: HashSet<String> = title_words(a).collect();
    title_words(b)
        .filter(|w| words.contains(w))
        .collect::<HashSet<_>>()
        .len()
}

fn title_words(title: &str) -> impl Iterator<Item = String> + '_ {
    title
        .split_whitespace()
        .filter(|w| w.chars().any(char::is_alphanumeric))
        .map(str::to_lowercase)
}

/// Commands that put `live` where `wanted` was: move, then floating,
/// fullscreen and pinned in that order (only those that differ), then
/// geometry for floating windows.
pub fn placement_commands(wanted: &WindowState, live: &LiveWindow) -> Vec<CompositorCommand> {
    let address = live.address.clone();
    let mut commands = vec![CompositorCommand::MoveToWorkspace {
        address: address.clone(),
        workspace_id: wanted.workspace_id,
    }];

    if live.floating != wanted.floating {
        commands.push(CompositorCommand::ToggleFloating {
            address: address.clone(),
        });
    }
    if live.fullscreen != wanted.fullscreen {
        commands.push(CompositorCommand::SetFullscreen {
            address: address.clone(),
            enabled: wanted.fullscreen,
        });
    }
    if live.pinned != wanted.pinned {
        commands.push(CompositorCommand::Pin {
            address: address.clone(),
        });
    }
    if wanted.floating && !wanted.fullscreen {
        commands.push(CompositorCommand::SetGeometry {
            address,
            position: wanted.position,
            size: wanted.size,
        });
    }

    commands
}
