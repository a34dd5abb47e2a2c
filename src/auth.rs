// ─── Offline Launch Identity ───

use uuid::Uuid;

/// Identity handed to the game process. Offline sessions get a fresh
/// random UUID on every launch and carry no token.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LaunchIdentity {
    pub username: String,
    pub uuid: String,
    pub access_token: String,
}

impl LaunchIdentity {
    pub fn offline(username: &str) -> Self {
        Self {
            username: username.trim().to_string(),
            uuid: Uuid::new_v4().to_string(),
            access_token: String::new(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn offline_identity_is_fresh_per_launch() {
        let first = LaunchIdentity::offline("Steve");
        let second = LaunchIdentity::offline("Steve");
        assert_ne!(first.uuid, second.uuid);
        assert!(first.access_token.is_empty());
    }

    #[test]
    fn offline_identity_trims_username() {
        let identity = LaunchIdentity::offline("  Alex  ");
        assert_eq!(identity.username, "Alex");
    }
}
