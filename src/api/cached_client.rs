//! Employee directory client with transparent caching.

use serde_json::Value;
use std::sync::Arc;
use tracing::{debug, info};

use crate::cache::{CacheLayer, QueryOptions};
use crate::config::{CacheConfig, Config};
use crate::nav::{Navigator, Route};
use crate::session::Session;

use super::api_types::decode_employee;
use super::client::ApiClient;
use super::error::{HttpError, HttpResult};
use super::keys::{CacheKey, KeyPrefix};
use super::types::{Credentials, Employee, EmployeeDraft, LoginResponse, SignupRequest, User};

/// Reads, writes and auth actions over the employee collection.
///
/// Reads go through the cache; every successful write invalidates the whole
/// `employees` resource (lists, department searches and details), which is
/// what guarantees that a detail view refetches after an update or delete.
#[derive(Clone)]
pub struct EmployeeDirectory {
  inner: ApiClient,
  cache: CacheLayer<CacheKey, HttpError>,
  session: Arc<Session>,
  navigator: Navigator,
  policy: CacheConfig,
}

impl EmployeeDirectory {
  pub fn new(config: &Config, session: Arc<Session>, navigator: Navigator) -> HttpResult<Self> {
    let inner = ApiClient::new(&config.api, session.clone(), navigator.clone())?;

    Ok(Self {
      inner,
      cache: CacheLayer::new(),
      session,
      navigator,
      policy: config.cache.clone(),
    })
  }

  pub fn session(&self) -> &Arc<Session> {
    &self.session
  }

  pub fn cache(&self) -> &CacheLayer<CacheKey, HttpError> {
    &self.cache
  }

  pub fn api(&self) -> &ApiClient {
    &self.inner
  }

  fn base_options(&self, stale_time: std::time::Duration) -> QueryOptions {
    QueryOptions::default()
      .with_stale_time(stale_time)
      .with_retry(self.policy.retry)
      .with_retry_delay(self.policy.retry_delay())
  }

  /// Directory listing: 5 minute window, previous results stay on screen
  /// while a new search term loads.
  pub fn list_options(&self) -> QueryOptions {
    self
      .base_options(self.policy.list_stale_time())
      .keep_previous_data(true)
  }

  pub fn detail_options(&self) -> QueryOptions {
    self.base_options(self.policy.detail_stale_time())
  }

  /// Department search: every new department is a cold fetch, nothing from
  /// the previous department is shown meanwhile.
  pub fn department_options(&self) -> QueryOptions {
    self
      .base_options(self.policy.department_stale_time())
      .keep_previous_data(false)
  }

  // ==========================================================================
  // Reads
  // ==========================================================================

  pub async fn list_employees(&self, search: &str) -> HttpResult<Vec<Employee>> {
    self.list_employees_with(search, &self.list_options()).await
  }

  pub async fn list_employees_with(
    &self,
    search: &str,
    options: &QueryOptions,
  ) -> HttpResult<Vec<Employee>> {
    let inner = self.inner.clone();
    let term = search.to_string();

    let result = self
      .cache
      .fetch(CacheKey::list(search), options, move || {
        let inner = inner.clone();
        let term = term.clone();
        async move { inner.list_employees(&term).await }
      })
      .await?;

    Ok(result.data)
  }

  /// `Ok(None)` without any network call when `id` is absent or empty.
  pub async fn get_employee_by_id(&self, id: Option<&str>) -> HttpResult<Option<Employee>> {
    self.get_employee_by_id_with(id, &self.detail_options()).await
  }

  pub async fn get_employee_by_id_with(
    &self,
    id: Option<&str>,
    options: &QueryOptions,
  ) -> HttpResult<Option<Employee>> {
    let id = match id {
      Some(id) if !id.is_empty() => id.to_string(),
      _ => {
        debug!("employee detail query disabled, no id");
        return Ok(None);
      }
    };

    let inner = self.inner.clone();
    let key = CacheKey::detail(&id);

    let result = self
      .cache
      .fetch(key, options, move || {
        let inner = inner.clone();
        let id = id.clone();
        async move { inner.get_employee(&id).await }
      })
      .await?;

    Ok(Some(result.data))
  }

  /// `Ok(None)` without any network call when `department` is empty.
  pub async fn search_by_department(&self, department: &str) -> HttpResult<Option<Vec<Employee>>> {
    self
      .search_by_department_with(department, &self.department_options())
      .await
  }

  pub async fn search_by_department_with(
    &self,
    department: &str,
    options: &QueryOptions,
  ) -> HttpResult<Option<Vec<Employee>>> {
    if department.is_empty() {
      debug!("department query disabled, no department");
      return Ok(None);
    }

    let inner = self.inner.clone();
    let name = department.to_string();

    let result = self
      .cache
      .fetch(CacheKey::department(department), options, move || {
        let inner = inner.clone();
        let name = name.clone();
        async move { inner.search_by_department(&name).await }
      })
      .await?;

    Ok(Some(result.data))
  }

  // ==========================================================================
  // Writes (never cached, never retried)
  // ==========================================================================

  /// Create a record. Any 2xx is a success; the stored record comes back
  /// only when the backend echoes it.
  pub async fn create_employee(&self, draft: &EmployeeDraft) -> HttpResult<Option<Employee>> {
    let response = self.inner.create_employee(draft).await?;
    self.invalidate_employees("create");
    Ok(written_record(response))
  }

  pub async fn update_employee(
    &self,
    id: &str,
    draft: &EmployeeDraft,
  ) -> HttpResult<Option<Employee>> {
    let response = self.inner.update_employee(id, draft).await?;
    self.invalidate_employees("update");
    Ok(written_record(response))
  }

  pub async fn delete_employee(&self, id: &str) -> HttpResult<()> {
    self.inner.delete_employee(id).await?;
    self.invalidate_employees("delete");
    Ok(())
  }

  fn invalidate_employees(&self, cause: &str) {
    let affected = self.cache.invalidate(&KeyPrefix::employees());
    info!(cause, affected, "invalidated employee queries");
  }

  // ==========================================================================
  // Authentication
  // ==========================================================================

  /// Sign in. The token is in the session before the directory route is
  /// requested, so the next view's requests already carry it.
  pub async fn login(&self, credentials: &Credentials) -> HttpResult<LoginResponse> {
    let response = self.inner.login(credentials).await?;
    // Whatever was cached belonged to the previous session
    self.cache.clear();
    self.session.sign_in(response.token.clone());
    self.navigator.navigate(Route::Dashboard);
    Ok(response)
  }

  /// Register. Does not sign in.
  pub async fn signup(&self, request: &SignupRequest) -> HttpResult<User> {
    self.inner.signup(request).await
  }

  /// Local sign-out: forget the token and everything read with it.
  pub fn logout(&self) {
    self.session.sign_out();
    self.cache.clear();
  }
}

/// The record in a write's response body, if there is one. Bodies that only
/// carry a message are normal.
fn written_record(body: Value) -> Option<Employee> {
  match decode_employee(body) {
    Ok(employee) => Some(employee),
    Err(e) => {
      debug!(error = %e, "write response carries no employee record");
      None
    }
  }
}
