use async_trait::async_trait;
use pgwire::api::auth::{AuthSource, LoginInfo, Password};
use pgwire::error::{ErrorInfo, PgWireError, PgWireResult};

use crate::observability::AUTH_FAILURES_TOTAL;
use crate::role::{Role, UnknownRole};

/// Resolve the startup `user` to a session role.
pub fn role_for_user(user: Option<&str>) -> Result<Role, UnknownRole> {
    user.unwrap_or_default().parse::<Role>().inspect_err(|_| {
        metrics::counter!(AUTH_FAILURES_TOTAL).increment(1);
    })
}

/// `28000`: invalid authorization specification.
pub fn unknown_role_error(severity: &str, e: UnknownRole) -> PgWireError {
    PgWireError::UserError(Box::new(ErrorInfo::new(
        severity.into(),
        "28000".into(),
        e.to_string(),
    )))
}

/// One shared connection password; the startup user must name a known role.
#[derive(Debug)]
pub struct CampusFlowAuthSource {
    password: String,
}

impl CampusFlowAuthSource {
    pub fn new(password: String) -> Self {
        Self { password }
    }
}

#[async_trait]
impl AuthSource for CampusFlowAuthSource {
    async fn get_password(&self, login: &LoginInfo) -> PgWireResult<Password> {
        role_for_user(login.user()).map_err(|e| unknown_role_error("FATAL", e))?;
        Ok(Password::new(None, self.password.as_bytes().to_vec()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn known_roles_resolve() {
        assert_eq!(role_for_user(Some("organizer")), Ok(Role::Organizer));
        assert_eq!(role_for_user(Some("Admin")), Ok(Role::Admin));
    }

    #[test]
    fn unknown_or_missing_user_is_rejected() {
        assert_eq!(
            role_for_user(Some("janitor")),
            Err(UnknownRole("janitor".into()))
        );
        assert_eq!(role_for_user(None), Err(UnknownRole(String::new())));
    }
}
