//! Cache keys for backend reads.

use std::fmt;

use crate::cache::{Cacheable, QueryKey};

use super::types::Employee;

impl Cacheable for Employee {
  fn entity_type() -> &'static str {
    "employee"
  }
}

/// Resource collection a key belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Resource {
  Employees,
}

/// Query shape within a resource.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Scope {
  /// Directory listing, discriminated by search term
  List,
  /// Single record, discriminated by id
  Detail,
  /// Department search, discriminated by department name
  Department,
}

/// (resource, scope, discriminator). Two reads with the same triple share a slot.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CacheKey {
  pub resource: Resource,
  pub scope: Scope,
  pub discriminator: String,
}

impl CacheKey {
  pub fn list(search: &str) -> Self {
    Self::employees(Scope::List, search)
  }

  pub fn detail(id: &str) -> Self {
    Self::employees(Scope::Detail, id)
  }

  pub fn department(department: &str) -> Self {
    Self::employees(Scope::Department, department)
  }

  fn employees(scope: Scope, discriminator: &str) -> Self {
    Self {
      resource: Resource::Employees,
      scope,
      discriminator: discriminator.to_string(),
    }
  }
}

/// Coarser match for invalidation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum KeyPrefix {
  /// Every key of a resource
  Resource(Resource),
  /// Every key of one scope within a resource
  Scope(Resource, Scope),
  /// Exactly one key
  Key(CacheKey),
}

impl KeyPrefix {
  pub fn employees() -> Self {
    KeyPrefix::Resource(Resource::Employees)
  }
}

impl QueryKey for CacheKey {
  type Prefix = KeyPrefix;

  fn starts_with(&self, prefix: &KeyPrefix) -> bool {
    match prefix {
      KeyPrefix::Resource(resource) => self.resource == *resource,
      KeyPrefix::Scope(resource, scope) => self.resource == *resource && self.scope == *scope,
      KeyPrefix::Key(key) => self == key,
    }
  }

  fn description(&self) -> String {
    self.to_string()
  }
}

impl fmt::Display for CacheKey {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    let resource = match self.resource {
      Resource::Employees => "employees",
    };
    let scope = match self.scope {
      Scope::List => "list",
      Scope::Detail => "detail",
      Scope::Department => "department",
    };
    write!(f, "{}/{}/{:?}", resource, scope, self.discriminator)
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use std::collections::HashMap;

  #[test]
  fn test_same_discriminator_same_slot() {
    let mut slots = HashMap::new();
    slots.insert(CacheKey::list("ann"), 1);
    slots.insert(CacheKey::list("ann"), 2);
    assert_eq!(slots.len(), 1);
    assert_eq!(slots[&CacheKey::list("ann")], 2);
  }

  #[test]
  fn test_scopes_do_not_collide() {
    // "7" as a search term, an id and a department are three different queries
    assert_ne!(CacheKey::list("7"), CacheKey::detail("7"));
    assert_ne!(CacheKey::detail("7"), CacheKey::department("7"));
  }

  #[test]
  fn test_prefix_matching() {
    let detail = CacheKey::detail("42");

    assert!(detail.starts_with(&KeyPrefix::employees()));
    assert!(detail.starts_with(&KeyPrefix::Scope(Resource::Employees, Scope::Detail)));
    assert!(!detail.starts_with(&KeyPrefix::Scope(Resource::Employees, Scope::List)));
    assert!(detail.starts_with(&KeyPrefix::Key(CacheKey::detail("42"))));
    assert!(!detail.starts_with(&KeyPrefix::Key(CacheKey::detail("43"))));
  }

  #[test]
  fn test_description() {
    assert_eq!(CacheKey::department("Tech").description(), "employees/department/\"Tech\"");
  }
}
