use crate::api::types::Employee;
use crate::nav::Route;
use crate::query::{Query, QueryState};
use crate::ui::components::{KeyResult, SearchEvent, SearchInput};
use crate::ui::ensure_valid_selection;
use crate::ui::renderfns::{panel, truncate};
use crate::ui::view::{Shortcut, View, ViewAction};
use crate::ui::views::ViewContext;
use crossterm::event::{KeyCode, KeyEvent};
use ratatui::prelude::*;
use ratatui::widgets::{List, ListItem, ListState, Paragraph};

/// Employee directory: the full list, or a department's employees while a
/// department search is applied.
pub struct DashboardView {
  ctx: ViewContext,
  employees: Query<Vec<Employee>>,
  /// Disabled until a department is searched
  department: Query<Vec<Employee>>,
  /// Department currently applied, empty for none
  term: String,
  search: SearchInput,
  list_state: ListState,
}

impl DashboardView {
  pub fn new(ctx: ViewContext) -> Self {
    let directory = ctx.directory.clone();
    let list_options = directory.list_options();
    let mut employees = Query::new(move || {
      let directory = directory.clone();
      async move {
        directory
          .list_employees("")
          .await
          .map_err(|e| e.display_message())
      }
    })
    .with_options(&list_options);

    // Start fetching immediately
    employees.fetch();

    let department = Query::new(|| async { Ok::<Vec<Employee>, String>(Vec::new()) })
      .with_options(&ctx.directory.department_options())
      .with_enabled(false);

    Self {
      ctx,
      employees,
      department,
      term: String::new(),
      search: SearchInput::new("Search by department"),
      list_state: ListState::default(),
    }
  }

  /// Apply a department search; an empty term goes back to the full list.
  fn search_department(&mut self, term: String) {
    self.term = term;
    self.list_state.select(Some(0));

    if self.term.is_empty() {
      self.department.set_enabled(false);
      return;
    }

    let directory = self.ctx.directory.clone();
    let name = self.term.clone();
    self.department.set_enabled(true);
    self.department.set_fetcher(move || {
      let directory = directory.clone();
      let name = name.clone();
      async move {
        directory
          .search_by_department(&name)
          .await
          .map(Option::unwrap_or_default)
          .map_err(|e| e.display_message())
      }
    });
  }

  fn active(&self) -> &Query<Vec<Employee>> {
    if self.term.is_empty() {
      &self.employees
    } else {
      &self.department
    }
  }

  fn rows(&self) -> &[Employee] {
    self.active().data().map(|v| v.as_slice()).unwrap_or(&[])
  }

  fn selected(&self) -> Option<&Employee> {
    self.list_state.selected().and_then(|i| self.rows().get(i))
  }

  fn title(&self) -> String {
    let scope = if self.term.is_empty() {
      "Employee Directory".to_string()
    } else {
      format!("Employee Directory [{}]", self.term)
    };

    match self.active().state() {
      QueryState::Loading => format!("{} (loading...)", scope),
      QueryState::Error(e) => format!("{} (error: {})", scope, e),
      _ => format!("{} ({})", scope, self.rows().len()),
    }
  }

  fn render_list(&mut self, frame: &mut Frame, area: Rect) {
    let len = self.rows().len();
    ensure_valid_selection(&mut self.list_state, len);

    let block = panel(&self.title(), Color::Blue);

    if self.rows().is_empty() {
      let content = if self.active().is_loading() {
        "Loading employees..."
      } else if self.active().is_error() {
        "Failed to load employees. Press 'r' to retry."
      } else {
        "No employee records found."
      };
      let paragraph = Paragraph::new(content)
        .block(block)
        .style(Style::default().fg(Color::DarkGray));
      frame.render_widget(paragraph, area);
      return;
    }

    let header = ListItem::new(Line::styled(
      format!("  {:<28} {:<18} {}", "Full Name", "Department", "Email"),
      Style::default().fg(Color::DarkGray).bold(),
    ));

    let dim = self.active().is_placeholder();
    let items: Vec<ListItem> = std::iter::once(header)
      .chain(self.rows().iter().map(|employee| {
        let style = if dim {
          Style::default().fg(Color::DarkGray)
        } else {
          Style::default()
        };
        ListItem::new(Line::from(vec![
          Span::styled(
            format!("{:<28}", truncate(&employee.full_name(), 28)),
            style.fg(if dim { Color::DarkGray } else { Color::Cyan }),
          ),
          Span::raw(" "),
          Span::styled(format!("{:<18}", truncate(&employee.department, 18)), style),
          Span::raw(" "),
          Span::styled(truncate(&employee.email, 40), style),
        ]))
      }))
      .collect();

    // Row 0 is the column header
    let mut state = ListState::default().with_selected(self.list_state.selected().map(|i| i + 1));

    let list = List::new(items)
      .block(block)
      .highlight_style(
        Style::default()
          .bg(Color::DarkGray)
          .add_modifier(Modifier::BOLD),
      )
      .highlight_symbol("> ");

    frame.render_stateful_widget(list, area, &mut state);
  }

  fn open(&self, route: fn(String) -> Route) -> ViewAction {
    match self.selected() {
      Some(employee) => ViewAction::Navigate(route(employee.id.clone())),
      None => ViewAction::None,
    }
  }
}

impl View for DashboardView {
  fn handle_key(&mut self, key: KeyEvent) -> ViewAction {
    // Let search component try to handle first
    match self.search.handle_key(key, &self.term) {
      KeyResult::Event(SearchEvent::Submitted(term)) => {
        self.search_department(term);
        return ViewAction::None;
      }
      KeyResult::Event(SearchEvent::Cancelled) | KeyResult::Handled => return ViewAction::None,
      KeyResult::NotHandled => {}
    }

    match key.code {
      KeyCode::Char('j') | KeyCode::Down => {
        self.list_state.select_next();
      }
      KeyCode::Char('k') | KeyCode::Up => {
        self.list_state.select_previous();
      }
      KeyCode::Char('c') | KeyCode::Esc if !self.term.is_empty() => {
        self.search_department(String::new());
      }
      KeyCode::Char('r') => {
        if self.term.is_empty() {
          self.employees.refetch();
        } else {
          self.department.refetch();
        }
      }
      KeyCode::Char('a') => return ViewAction::Navigate(Route::AddEmployee),
      KeyCode::Enter => return self.open(Route::EmployeeDetails),
      KeyCode::Char('e') => return self.open(Route::UpdateEmployee),
      KeyCode::Char('d') => return self.open(Route::DeleteEmployee),
      KeyCode::Char('q') => return ViewAction::Quit,
      _ => {}
    }
    ViewAction::None
  }

  fn render(&mut self, frame: &mut Frame, area: Rect) {
    self.render_list(frame, area);
    // Let search component render its overlay
    self.search.render_overlay(frame, area);
  }

  fn tick(&mut self) {
    self.employees.poll();
    self.department.poll();
  }

  fn shortcuts(&self) -> Vec<Shortcut> {
    let mut shortcuts = vec![
      Shortcut::new("/", "department").with_priority(10),
      Shortcut::new("a", "add").with_priority(20),
      Shortcut::new("enter", "details").with_priority(30),
      Shortcut::new("e", "edit").with_priority(40),
      Shortcut::new("d", "delete").with_priority(50),
      Shortcut::new("r", "refresh").with_priority(60),
      Shortcut::new("q", "quit").with_priority(90),
    ];
    if !self.term.is_empty() {
      shortcuts.push(Shortcut::new("c", "clear search").with_priority(15));
    }
    shortcuts
  }
}
