use crate::api::EmployeeDirectory;
use crate::config::Config;
use crate::event::{Event, EventHandler};
use crate::nav::{self, Navigator, Route};
use crate::session::Session;
use crate::ui;
use crate::ui::view::{View, ViewAction};
use crate::ui::views::{self, ViewContext};
use color_eyre::eyre::eyre;
use color_eyre::Result;
use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};
use crossterm::terminal::{
  disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen,
};
use crossterm::ExecutableCommand;
use ratatui::prelude::*;
use std::io::stdout;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tracing::{debug, info};

/// Main application state
pub struct App {
  config: Config,
  directory: EmployeeDirectory,
  session: Arc<Session>,
  navigator: Navigator,

  /// Navigation requests from views, timers and the HTTP adapter
  routes: mpsc::UnboundedReceiver<Route>,

  /// Route currently shown, after the guard
  route: Route,
  view: Box<dyn View>,

  /// Whether to quit
  should_quit: bool,
}

impl App {
  pub fn new(config: Config, session: Arc<Session>) -> Result<Self> {
    let (navigator, routes) = Navigator::new();
    let directory = EmployeeDirectory::new(&config, session.clone(), navigator.clone())
      .map_err(|e| eyre!("Failed to create API client: {}", e))?;

    let ctx = ViewContext {
      directory: directory.clone(),
      navigator: navigator.clone(),
      redirect_delay: config.ui.redirect_delay(),
    };
    let route = nav::guard(Route::Dashboard, &session);
    let view = views::build(&route, &ctx);
    info!(?route, "starting");

    Ok(Self {
      config,
      directory,
      session,
      navigator,
      routes,
      route,
      view,
      should_quit: false,
    })
  }

  pub async fn run(&mut self) -> Result<()> {
    // Setup terminal
    enable_raw_mode()?;
    stdout().execute(EnterAlternateScreen)?;

    let result = self.event_loop().await;

    // Cleanup terminal, even when the loop failed
    disable_raw_mode()?;
    stdout().execute(LeaveAlternateScreen)?;

    result
  }

  async fn event_loop(&mut self) -> Result<()> {
    let mut terminal = Terminal::new(CrosstermBackend::new(stdout()))?;
    let mut events = EventHandler::new(Duration::from_millis(100));

    while !self.should_quit {
      terminal.draw(|frame| ui::draw(frame, self))?;

      tokio::select! {
        event = events.next() => match event {
          Some(event) => self.handle_event(event),
          None => break,
        },
        Some(route) = self.routes.recv() => self.navigate(route),
      }
    }

    Ok(())
  }

  fn handle_event(&mut self, event: Event) {
    match event {
      Event::Key(key) => self.handle_key(key),
      Event::Tick => self.view.tick(),
      Event::Resize => {}
    }
  }

  fn handle_key(&mut self, key: KeyEvent) {
    if key.modifiers.contains(KeyModifiers::CONTROL) {
      let authenticated = self.session.is_authenticated();
      match key.code {
        KeyCode::Char('c') => {
          self.should_quit = true;
          return;
        }
        KeyCode::Char('d') if authenticated => {
          self.navigate(Route::Dashboard);
          return;
        }
        KeyCode::Char('o') if authenticated => {
          self.logout();
          return;
        }
        KeyCode::Char('l') if !authenticated => {
          self.navigate(Route::Login);
          return;
        }
        KeyCode::Char('n') if !authenticated => {
          self.navigate(Route::Signup);
          return;
        }
        _ => {}
      }
    }

    match self.view.handle_key(key) {
      ViewAction::None => {}
      ViewAction::Navigate(route) => self.navigate(route),
      ViewAction::Quit => self.should_quit = true,
    }
  }

  /// Show `route`, or the login screen when it needs a session we don't have.
  ///
  /// A request for the route already shown is ignored; this keeps a login
  /// error on screen when the 401 that caused it also asks for the login view.
  pub fn navigate(&mut self, route: Route) {
    let route = nav::guard(route, &self.session);
    if route == self.route {
      debug!(?route, "already showing route");
      return;
    }

    info!(from = ?self.route, to = ?route, "navigating");
    // The old view goes away here, cancelling any redirect it scheduled
    self.view = views::build(&route, &self.context());
    self.route = route;
  }

  /// Drain navigation requests without a terminal
  pub fn process_navigation(&mut self) {
    while let Ok(route) = self.routes.try_recv() {
      self.navigate(route);
    }
  }

  pub fn logout(&mut self) {
    info!("logging out");
    self.directory.logout();
    self.navigate(Route::Login);
  }

  fn context(&self) -> ViewContext {
    ViewContext {
      directory: self.directory.clone(),
      navigator: self.navigator.clone(),
      redirect_delay: self.config.ui.redirect_delay(),
    }
  }

  pub fn route(&self) -> &Route {
    &self.route
  }

  pub fn view(&self) -> &dyn View {
    self.view.as_ref()
  }

  pub fn view_mut(&mut self) -> &mut dyn View {
    self.view.as_mut()
  }

  pub fn title(&self) -> Option<&str> {
    self.config.ui.title.as_deref()
  }

  pub fn base_url(&self) -> &str {
    &self.config.api.base_url
  }

  pub fn is_authenticated(&self) -> bool {
    self.session.is_authenticated()
  }

  pub fn should_quit(&self) -> bool {
    self.should_quit
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::config::ApiConfig;

  fn config() -> Config {
    Config {
      // Nothing listens here, views fail fast if they fetch
      api: ApiConfig {
        base_url: "http://127.0.0.1:9/api/v1".to_string(),
        ..ApiConfig::default()
      },
      ..Config::default()
    }
  }

  fn key(code: KeyCode, modifiers: KeyModifiers) -> KeyEvent {
    KeyEvent::new(code, modifiers)
  }

  #[tokio::test]
  async fn test_starts_on_login_without_session() {
    let app = App::new(config(), Arc::new(Session::in_memory())).unwrap();
    assert_eq!(app.route(), &Route::Login);
  }

  #[tokio::test]
  async fn test_starts_on_dashboard_with_session() {
    let session = Arc::new(Session::in_memory());
    session.sign_in("t0k".to_string());
    let app = App::new(config(), session).unwrap();
    assert_eq!(app.route(), &Route::Dashboard);
  }

  #[tokio::test]
  async fn test_guard_redirects_protected_routes() {
    let mut app = App::new(config(), Arc::new(Session::in_memory())).unwrap();
    app.navigate(Route::Signup);
    app.navigate(Route::EmployeeDetails("7".to_string()));
    assert_eq!(app.route(), &Route::Login);
  }

  #[tokio::test]
  async fn test_logout_shortcut_returns_to_login() {
    let session = Arc::new(Session::in_memory());
    session.sign_in("t0k".to_string());
    let mut app = App::new(config(), session.clone()).unwrap();

    app.handle_key(key(KeyCode::Char('o'), KeyModifiers::CONTROL));
    assert_eq!(app.route(), &Route::Login);
    assert!(!session.is_authenticated());
    assert_eq!(session.token(), None);
  }

  #[tokio::test]
  async fn test_queued_navigation_is_applied() {
    let session = Arc::new(Session::in_memory());
    session.sign_in("t0k".to_string());
    let mut app = App::new(config(), session).unwrap();

    app.navigator.navigate(Route::AddEmployee);
    app.process_navigation();
    assert_eq!(app.route(), &Route::AddEmployee);
  }

  #[tokio::test]
  async fn test_ctrl_c_quits() {
    let mut app = App::new(config(), Arc::new(Session::in_memory())).unwrap();
    app.handle_key(key(KeyCode::Char('c'), KeyModifiers::CONTROL));
    assert!(app.should_quit());
  }

  #[tokio::test]
  async fn test_public_shortcuts_hidden_when_signed_in() {
    let session = Arc::new(Session::in_memory());
    session.sign_in("t0k".to_string());
    let mut app = App::new(config(), session).unwrap();

    // Signup is only offered to signed-out users
    app.handle_key(key(KeyCode::Char('n'), KeyModifiers::CONTROL));
    assert_eq!(app.route(), &Route::Dashboard);
  }
}
