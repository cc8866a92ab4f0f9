use crossterm::event::KeyEvent;
use ratatui::prelude::*;

use crate::nav::Route;

/// A keyboard shortcut hint for display in the footer
#[derive(Debug, Clone)]
pub struct Shortcut {
  pub key: &'static str,
  pub label: &'static str,
  pub priority: u8, // Lower = shown first
}

impl Shortcut {
  pub const fn new(key: &'static str, label: &'static str) -> Self {
    Self {
      key,
      label,
      priority: 100,
    }
  }

  pub const fn with_priority(mut self, priority: u8) -> Self {
    self.priority = priority;
    self
  }
}

/// Actions that a view can request in response to user input
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ViewAction {
  /// No action needed
  None,
  /// Replace the current view
  Navigate(Route),
  /// Leave the application
  Quit,
}

/// Trait for view behavior
///
/// Views handle their own input (forms, search, list selection) and return
/// actions for the App to execute. Delayed navigation goes through the
/// `Navigator` instead, owned by the view as a `ScheduledNavigation` so that
/// dropping the view cancels it.
///
/// Views that load data asynchronously should use Query<T> / Mutation<T>
/// internally and poll them in the tick() method.
pub trait View {
  /// Handle a key event, returning an action for App to execute
  fn handle_key(&mut self, key: KeyEvent) -> ViewAction;

  /// Render the view to the frame
  fn render(&mut self, frame: &mut Frame, area: Rect);

  /// Called on each tick to allow views to poll async queries
  fn tick(&mut self) {}

  /// Get keyboard shortcuts to display in the footer
  fn shortcuts(&self) -> Vec<Shortcut> {
    Vec::new()
  }
}
