use crate::constants::{DEFAULT_USER_SUFFIX, PASSWORD};
use crate::form::FormBody;

/// The account the workload registers and logs in as.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Credentials {
    pub username: String,
    pub password: String,
    pub email: String,
}

impl Credentials {
    /// Credentials for `u_{suffix}`. An empty suffix falls back to the default one.
    pub fn for_suffix(suffix: &str) -> Self {
        let suffix = if suffix.is_empty() {
            DEFAULT_USER_SUFFIX
        } else {
            suffix
        };
        Self::for_username(format!("u_{suffix}"))
    }

    fn for_username(username: String) -> Self {
        Self {
            email: format!("{username}@ex.com"),
            password: PASSWORD.to_string(),
            username,
        }
    }

    /// The `index`th account of an account pool derived from these credentials.
    pub fn pooled(&self, index: usize) -> Self {
        Self::for_username(format!("{}_{index}", self.username))
    }

    pub fn registration_form(&self) -> FormBody {
        FormBody::new()
            .field("username", &self.username)
            .field("password", &self.password)
            .field("confirm_password", &self.password)
            .field("email", &self.email)
    }

    pub fn login_form(&self) -> FormBody {
        FormBody::new()
            .field("username", &self.username)
            .field("password", &self.password)
    }
}

impl Default for Credentials {
    fn default() -> Self {
        Self::for_suffix(DEFAULT_USER_SUFFIX)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn derives_account_from_suffix() {
        let creds = Credentials::for_suffix("ci");
        assert_eq!(creds.username, "u_ci");
        assert_eq!(creds.email, "u_ci@ex.com");
        assert_eq!(creds.password, "P@ssw0rd!");
    }

    #[test]
    fn empty_suffix_uses_default() {
        assert_eq!(Credentials::for_suffix(""), Credentials::default());
        assert_eq!(Credentials::default().username, "u_perf");
    }

    #[test]
    fn registration_confirms_password() {
        assert_eq!(
            Credentials::default().registration_form().encode(),
            "username=u_perf&password=P%40ssw0rd%21&confirm_password=P%40ssw0rd%21&email=u_perf%40ex.com"
        );
    }

    #[test]
    fn pooled_accounts_are_distinct() {
        let creds = Credentials::default();
        assert_eq!(creds.pooled(3).username, "u_perf_3");
        assert_eq!(creds.pooled(3).email, "u_perf_3@ex.com");
        assert_ne!(creds.pooled(0), creds.pooled(1));
    }
}
