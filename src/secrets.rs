//! Credential env-var contract shared between the operator (which projects
//! `envFrom secretKeyRef` onto worker pods, see `jobs.rs`) and the worker
//! binary (which reads the resulting env directly). Per spec.md §9, secret
//! values never traverse the operator process itself — only the *name* of
//! the env var is operator-side knowledge.

/// Build the `YUPTIME_CRED_<FAMILY>_<ROLE>` env var name for a credential.
///
/// `family` and `role` are upper-cased; spec.md §4.2 gives
/// `YUPTIME_CRED_MYSQL_USERNAME` as the canonical example.
pub fn credential_env_var(family: &str, role: &str) -> String {
    format!(
        "YUPTIME_CRED_{}_{}",
        family.to_uppercase(),
        role.to_uppercase()
    )
}

/// Read a credential previously projected into the process environment.
pub fn read_credential(family: &str, role: &str) -> Option<String> {
    std::env::var(credential_env_var(family, role)).ok()
}

pub const DNS_USE_SYSTEM: &str = "YUPTIME_DNS_USE_SYSTEM";
pub const DNS_RESOLVERS: &str = "YUPTIME_DNS_RESOLVERS";

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builds_canonical_mysql_username_var() {
        assert_eq!(
            credential_env_var("mysql", "username"),
            "YUPTIME_CRED_MYSQL_USERNAME"
        );
    }

    #[test]
    fn uppercases_mixed_case_input() {
        assert_eq!(
            credential_env_var("Redis", "Password"),
            "YUPTIME_CRED_REDIS_PASSWORD"
        );
    }

    #[test]
    fn read_credential_roundtrip() {
        let var = credential_env_var("test", "token");
        unsafe { std::env::set_var(&var, "secret-value") };
        assert_eq!(read_credential("test", "token"), Some("secret-value".to_string()));
        unsafe { std::env::remove_var(&var) };
    }

    #[test]
    fn read_credential_missing_is_none() {
        assert_eq!(read_credential("nonexistent", "role"), None);
    }
}
