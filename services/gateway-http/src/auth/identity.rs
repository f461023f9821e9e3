use serde::{Deserialize, Serialize};

/// The authenticated principal, as returned by the user service and carried in
/// token claims.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Identity {
    pub id: String,
    pub username: String,
    pub email: String,
    #[serde(default)]
    pub admin: bool,
}

impl Identity {
    pub fn new(id: impl Into<String>, username: impl Into<String>, email: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            username: username.into(),
            email: email.into(),
            admin: false,
        }
    }

    pub fn with_admin(mut self, admin: bool) -> Self {
        self.admin = admin;
        self
    }

    /// Admins may act on any user; everyone else only on themselves.
    pub fn may_act_for(&self, user_id: &str) -> bool {
        self.admin || self.id == user_id
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn admin_flag_defaults_to_false_when_absent() {
        let identity: Identity =
            serde_json::from_str(r#"{"id":"u1","username":"ada","email":"ada@example.com"}"#)
                .unwrap();
        assert!(!identity.admin);
    }

    #[test]
    fn may_act_for_self_or_as_admin() {
        let user = Identity::new("u1", "ada", "ada@example.com");
        assert!(user.may_act_for("u1"));
        assert!(!user.may_act_for("u2"));

        let admin = Identity::new("root", "root", "root@example.com").with_admin(true);
        assert!(admin.may_act_for("u2"));
    }
}
