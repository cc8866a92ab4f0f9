use crate::api::types::{format_salary, Employee};
use crate::nav::Route;
use crate::query::{Query, QueryState};
use crate::ui::renderfns::{centered_rect, panel};
use crate::ui::view::{Shortcut, View, ViewAction};
use crate::ui::views::ViewContext;
use crossterm::event::{KeyCode, KeyEvent};
use ratatui::prelude::*;
use ratatui::widgets::{Paragraph, Wrap};

/// Read-only employee record
pub struct EmployeeDetailView {
  id: String,
  query: Query<Option<Employee>>,
}

impl EmployeeDetailView {
  pub fn new(ctx: ViewContext, id: String) -> Self {
    let directory = ctx.directory.clone();
    let employee_id = id.clone();
    let mut query = Query::new(move || {
      let directory = directory.clone();
      let id = employee_id.clone();
      async move {
        directory
          .get_employee_by_id(Some(&id))
          .await
          .map_err(|e| e.display_message())
      }
    })
    .with_options(&ctx.directory.detail_options())
    .with_enabled(!id.is_empty());

    // Start fetching immediately
    query.fetch();

    Self { id, query }
  }

  fn render_detail(&self, frame: &mut Frame, area: Rect) {
    let area = centered_rect(72, 18, area);
    let title = match self.query.state() {
      QueryState::Loading => "Employee (loading...)".to_string(),
      QueryState::Success(Some(employee)) => employee.full_name(),
      _ => "Employee".to_string(),
    };
    let block = panel(&title, Color::Blue);
    let inner = block.inner(area);
    frame.render_widget(block, area);

    if self.id.is_empty() {
      let paragraph =
        Paragraph::new("No employee ID was given.").style(Style::default().fg(Color::Yellow));
      frame.render_widget(paragraph, inner);
      return;
    }

    if let Some(error) = self.query.error() {
      let paragraph = Paragraph::new(format!("Error: {}\n\nPress 'r' to retry.", error))
        .style(Style::default().fg(Color::Red))
        .wrap(Wrap { trim: true });
      frame.render_widget(paragraph, inner);
      return;
    }

    let employee = match self.query.data() {
      Some(Some(employee)) => employee,
      Some(None) => {
        let paragraph = Paragraph::new(format!("Employee {} does not exist.", self.id))
          .style(Style::default().fg(Color::Yellow));
        frame.render_widget(paragraph, inner);
        return;
      }
      None => {
        let paragraph =
          Paragraph::new("Loading employee details...").style(Style::default().fg(Color::DarkGray));
        frame.render_widget(paragraph, inner);
        return;
      }
    };

    frame.render_widget(Paragraph::new(detail_lines(employee)), inner);
  }
}

fn field<'a>(label: &'a str, value: String) -> Line<'a> {
  Line::from(vec![
    Span::styled(format!("{:>16}: ", label), Style::default().fg(Color::DarkGray)),
    Span::styled(value, Style::default().bold()),
  ])
}

fn section(title: &str) -> Line<'_> {
  Line::styled(title, Style::default().fg(Color::Yellow).bold())
}

fn detail_lines(employee: &Employee) -> Vec<Line<'_>> {
  let photo = match &employee.photo {
    Some(photo) => format!("{} ({} KB)", photo.media_type, photo.size().div_ceil(1024)),
    None => "none".to_string(),
  };

  vec![
    field("Employee ID", employee.id.clone()),
    Line::raw(""),
    section("Contact & Personal"),
    field("Email", employee.email.clone()),
    field("Photo", photo),
    Line::raw(""),
    section("Employment Details"),
    field("Position", employee.position.clone()),
    field("Department", employee.department.clone()),
    field(
      "Salary",
      employee.salary.map(format_salary).unwrap_or_default(),
    ),
    field(
      "Date of Joining",
      employee
        .date_of_joining
        .map(|d| d.format("%Y-%m-%d").to_string())
        .unwrap_or_default(),
    ),
  ]
}

impl View for EmployeeDetailView {
  fn handle_key(&mut self, key: KeyEvent) -> ViewAction {
    match key.code {
      KeyCode::Char('r') => {
        self.query.refetch();
        ViewAction::None
      }
      KeyCode::Char('e') if !self.id.is_empty() => {
        ViewAction::Navigate(Route::UpdateEmployee(self.id.clone()))
      }
      KeyCode::Char('d') if !self.id.is_empty() => {
        ViewAction::Navigate(Route::DeleteEmployee(self.id.clone()))
      }
      KeyCode::Char('q') | KeyCode::Esc => ViewAction::Navigate(Route::Dashboard),
      _ => ViewAction::None,
    }
  }

  fn render(&mut self, frame: &mut Frame, area: Rect) {
    self.render_detail(frame, area);
  }

  fn tick(&mut self) {
    self.query.poll();
  }

  fn shortcuts(&self) -> Vec<Shortcut> {
    vec![
      Shortcut::new("e", "edit").with_priority(10),
      Shortcut::new("d", "delete").with_priority(20),
      Shortcut::new("r", "refresh").with_priority(30),
      Shortcut::new("q", "back").with_priority(40),
    ]
  }
}
