mod dashboard;
mod delete_confirm;
mod employee_detail;
mod employee_form;
mod login;
mod signup;

pub use dashboard::DashboardView;
pub use delete_confirm::DeleteConfirmView;
pub use employee_detail::EmployeeDetailView;
pub use employee_form::EmployeeFormView;
pub use login::LoginView;
pub use signup::SignupView;

use std::time::Duration;

use crate::api::EmployeeDirectory;
use crate::nav::{Navigator, Route};
use crate::ui::view::View;

/// What every view needs from the app
#[derive(Clone)]
pub struct ViewContext {
  pub directory: EmployeeDirectory,
  pub navigator: Navigator,
  /// Delay before the redirect that follows a successful submit
  pub redirect_delay: Duration,
}

/// Build the view for an (already guarded) route
pub fn build(route: &Route, ctx: &ViewContext) -> Box<dyn View> {
  match route {
    Route::Login => Box::new(LoginView::new(ctx.clone())),
    Route::Signup => Box::new(SignupView::new(ctx.clone())),
    Route::Dashboard => Box::new(DashboardView::new(ctx.clone())),
    Route::AddEmployee => Box::new(EmployeeFormView::add(ctx.clone())),
    Route::UpdateEmployee(id) => Box::new(EmployeeFormView::update(ctx.clone(), id.clone())),
    Route::DeleteEmployee(id) => Box::new(DeleteConfirmView::new(ctx.clone(), id.clone())),
    Route::EmployeeDetails(id) => Box::new(EmployeeDetailView::new(ctx.clone(), id.clone())),
  }
}
