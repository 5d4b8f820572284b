//! Application user model

use serde::{Deserialize, Serialize};

/// A user of the application, as seen by the local store.
///
/// Credentials are owned by the auth provider and never stored here.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct User {
    pub name: String,
    pub email: String,
}

impl User {
    /// First word of the name, for greetings
    pub fn first_name(&self) -> &str {
        self.name.split_whitespace().next().unwrap_or("")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn first_name_takes_first_word() {
        let user = User {
            name: "  Carla Mendes ".to_string(),
            email: "carla@example.com".to_string(),
        };
        assert_eq!(user.first_name(), "Carla");
    }
}
