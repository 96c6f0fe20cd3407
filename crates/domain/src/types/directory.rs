//! Inputs for the people-directory and mail endpoints

use crate::errors::{Result, SpError};

/// Who to look up in the people directory.
///
/// `account_name` wins; otherwise the claims account is derived from `email`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProfileLookup {
    pub account_name: Option<String>,
    pub email: Option<String>,
    /// Comma-separated properties; the configured default when `None`.
    pub select: Option<String>,
}

impl ProfileLookup {
    #[must_use]
    pub fn account(account_name: impl Into<String>) -> Self {
        Self { account_name: Some(account_name.into()), ..Self::default() }
    }

    #[must_use]
    pub fn email(email: impl Into<String>) -> Self {
        Self { email: Some(email.into()), ..Self::default() }
    }

    #[must_use]
    pub fn select(mut self, select: impl Into<String>) -> Self {
        self.select = Some(select.into());
        self
    }

    /// Claims account to query, e.g. `i:0#.f|membership|jane@contoso.com`.
    ///
    /// # Errors
    /// Returns [`SpError::InvalidInput`] when neither field is usable.
    pub fn resolve_account(&self, account_name_prefix: &str) -> Result<String> {
        if let Some(account) = self.account_name.as_deref().filter(|a| !a.is_empty()) {
            return Ok(account.to_string());
        }
        match self.email.as_deref().filter(|e| !e.is_empty()) {
            Some(email) => Ok(format!("{account_name_prefix}{email}")),
            None => Err(SpError::InvalidInput("No account name provided".into())),
        }
    }
}

/// Mail sent through the site's utility endpoint. Recipients must be users
/// known to the site.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EmailMessage {
    pub from: String,
    pub to: Vec<String>,
    pub subject: String,
    pub body: String,
}

impl EmailMessage {
    /// # Errors
    /// Returns [`SpError::InvalidInput`] when sender, recipients or subject are missing.
    pub fn validate(&self) -> Result<()> {
        if self.from.is_empty() || self.to.is_empty() || self.subject.is_empty() {
            return Err(SpError::InvalidInput("From, To or Subject not provided.".into()));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const PREFIX: &str = "i:0#.f|membership|";

    #[test]
    fn account_name_takes_precedence() {
        let lookup = ProfileLookup {
            account_name: Some("i:0#.f|membership|a@b.com".into()),
            email: Some("other@b.com".into()),
            select: None,
        };
        assert_eq!(lookup.resolve_account(PREFIX).unwrap(), "i:0#.f|membership|a@b.com");
    }

    #[test]
    fn email_is_prefixed() {
        let lookup = ProfileLookup::email("jane@contoso.com");
        assert_eq!(lookup.resolve_account(PREFIX).unwrap(), "i:0#.f|membership|jane@contoso.com");
    }

    #[test]
    fn empty_lookup_is_rejected() {
        assert!(matches!(
            ProfileLookup::default().resolve_account(PREFIX),
            Err(SpError::InvalidInput(_))
        ));
    }

    #[test]
    fn email_requires_sender_recipient_and_subject() {
        let mut message = EmailMessage {
            from: "a@b.com".into(),
            to: vec!["c@d.com".into()],
            subject: "Hi".into(),
            body: String::new(),
        };
        assert!(message.validate().is_ok());
        message.to.clear();
        assert!(message.validate().is_err());
    }
}
