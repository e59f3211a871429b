//! Role claim handling.

use serde::{Deserialize, Serialize};

/// Context membership role granted to teaching staff
pub const STANDARD_INSTRUCTOR_ROLE: &str =
    "http://purl.imsglobal.org/vocab/lis/v2/membership#Instructor";

/// Ordered set of role URIs taken from the roles claim
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RoleSet(Vec<String>);

impl RoleSet {
    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.0.iter().map(String::as_str)
    }

    pub fn contains(&self, role: &str) -> bool {
        self.iter().any(|r| r == role)
    }

    pub fn is_in_standard_instructor_role(&self) -> bool {
        self.contains(STANDARD_INSTRUCTOR_ROLE)
    }
}

impl From<Vec<&str>> for RoleSet {
    fn from(roles: Vec<&str>) -> Self {
        Self(roles.into_iter().map(String::from).collect())
    }
}
