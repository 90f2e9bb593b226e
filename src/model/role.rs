use std::fmt;

/// Viewer role, decided at sign-in. Determines which reservation filter a
/// watcher builds and which transitions it announces.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Role {
    Client,
    Owner,
    Admin,
}

impl Role {
    /// Owner and Admin share the manager view: reservations for owned
    /// carwashes, pending entries first.
    pub fn is_manager(&self) -> bool {
        matches!(self, Role::Owner | Role::Admin)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Client => "client",
            Role::Owner => "owner",
            Role::Admin => "admin",
        }
    }

    /// Decodes a stored role string; anything unrecognized falls back to
    /// the least-privileged role.
    pub fn parse(value: &str) -> Self {
        match value {
            "owner" => Role::Owner,
            "admin" => Role::Admin,
            _ => Role::Client,
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unknown_role_falls_back_to_client() {
        assert_eq!(Role::parse("owner"), Role::Owner);
        assert_eq!(Role::parse("admin"), Role::Admin);
        assert_eq!(Role::parse("superuser"), Role::Client);
        assert_eq!(Role::parse(""), Role::Client);
    }

    #[test]
    fn manager_roles() {
        assert!(Role::Owner.is_manager());
        assert!(Role::Admin.is_manager());
        assert!(!Role::Client.is_manager());
    }
}
