//! Navigation: routes, the auth guard, and scheduled redirects.
//!
//! Anything may ask to navigate (a view, the HTTP adapter on session expiry, a
//! timer) by sending a `Route` through a `Navigator`. The app's event loop owns
//! the receiving end and swaps views.

use std::time::Duration;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::debug;

use crate::session::Session;

/// Every screen the client can show.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Route {
  Login,
  Signup,
  Dashboard,
  AddEmployee,
  UpdateEmployee(String),
  DeleteEmployee(String),
  EmployeeDetails(String),
}

impl Route {
  /// Whether the route is only reachable with a signed-in session.
  pub fn requires_auth(&self) -> bool {
    !matches!(self, Route::Login | Route::Signup)
  }

  /// Short label for the footer.
  pub fn label(&self) -> String {
    match self {
      Route::Login => "Login".to_string(),
      Route::Signup => "Signup".to_string(),
      Route::Dashboard => "Directory".to_string(),
      Route::AddEmployee => "Add employee".to_string(),
      Route::UpdateEmployee(id) => format!("Edit {}", id),
      Route::DeleteEmployee(id) => format!("Delete {}", id),
      Route::EmployeeDetails(id) => format!("Employee {}", id),
    }
  }
}

/// Resolve the route actually shown for a request.
pub fn guard(route: Route, session: &Session) -> Route {
  if route.requires_auth() && !session.is_authenticated() {
    debug!(requested = ?route, "unauthenticated, redirecting to login");
    Route::Login
  } else {
    route
  }
}

/// Cloneable handle for requesting navigation.
#[derive(Debug, Clone)]
pub struct Navigator {
  tx: mpsc::UnboundedSender<Route>,
}

impl Navigator {
  pub fn new() -> (Self, mpsc::UnboundedReceiver<Route>) {
    let (tx, rx) = mpsc::unbounded_channel();
    (Self { tx }, rx)
  }

  pub fn navigate(&self, route: Route) {
    debug!(?route, "navigation requested");
    // Receiver is gone only during shutdown
    let _ = self.tx.send(route);
  }

  /// Navigate after `delay` unless the returned handle is dropped first.
  pub fn schedule(&self, route: Route, delay: Duration) -> ScheduledNavigation {
    let navigator = self.clone();
    let handle = tokio::spawn(async move {
      tokio::time::sleep(delay).await;
      navigator.navigate(route);
    });
    ScheduledNavigation { handle }
  }
}

/// A pending delayed navigation. Dropping it cancels the redirect, so the view
/// that scheduled it should own it.
#[derive(Debug)]
pub struct ScheduledNavigation {
  handle: JoinHandle<()>,
}

impl ScheduledNavigation {
  pub fn cancel(self) {
    // Drop does the work
  }

  pub fn is_finished(&self) -> bool {
    self.handle.is_finished()
  }
}

impl Drop for ScheduledNavigation {
  fn drop(&mut self) {
    self.handle.abort();
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn test_public_routes() {
    assert!(!Route::Login.requires_auth());
    assert!(!Route::Signup.requires_auth());
    assert!(Route::Dashboard.requires_auth());
    assert!(Route::EmployeeDetails("7".into()).requires_auth());
  }

  #[test]
  fn test_guard_redirects_signed_out_users() {
    let session = Session::in_memory();
    assert_eq!(guard(Route::AddEmployee, &session), Route::Login);
    assert_eq!(guard(Route::Signup, &session), Route::Signup);

    session.sign_in("t".to_string());
    assert_eq!(
      guard(Route::UpdateEmployee("3".into()), &session),
      Route::UpdateEmployee("3".into())
    );
  }

  #[tokio::test(start_paused = true)]
  async fn test_scheduled_navigation_fires_after_delay() {
    let (navigator, mut rx) = Navigator::new();
    let _pending = navigator.schedule(Route::Dashboard, Duration::from_secs(5));

    tokio::time::sleep(Duration::from_secs(4)).await;
    assert!(rx.try_recv().is_err());

    tokio::time::sleep(Duration::from_secs(2)).await;
    assert_eq!(rx.try_recv().ok(), Some(Route::Dashboard));
  }

  #[tokio::test(start_paused = true)]
  async fn test_dropping_schedule_cancels_it() {
    let (navigator, mut rx) = Navigator::new();
    let pending = navigator.schedule(Route::Login, Duration::from_secs(5));

    tokio::time::sleep(Duration::from_secs(1)).await;
    pending.cancel();

    tokio::time::sleep(Duration::from_secs(10)).await;
    assert!(rx.try_recv().is_err());
  }
}
