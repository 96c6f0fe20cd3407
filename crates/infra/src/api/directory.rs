//! People directory and mail calls
//!
//! Single-shot passthroughs sharing the list client's transport, session and
//! base URL. Local mode answers with fixed placeholder data.

use serde_json::{json, Value};
use spbridge_domain::constants::{
    ENVELOPE_DATA, ENVELOPE_METADATA, ENVELOPE_RESULTS, EMAIL_PROPERTIES_TYPE, HEADER_ACCEPT,
    HEADER_REQUEST_DIGEST, LOCAL_SITE_USER_ID, METHOD_POST, ODATA_VERBOSE,
};
use spbridge_domain::utils::odata::site_user_id;
use spbridge_domain::{EmailMessage, ProfileLookup, Result, SpError};
use tracing::{debug, info, instrument};

use super::client::{read_request, write_request, ListClient};
use crate::http::TransportRequest;

impl ListClient {
    /// Look up a user's profile in the people directory.
    ///
    /// # Errors
    ///
    /// Returns [`SpError::InvalidInput`] when no account can be derived,
    /// otherwise any transport failure.
    #[instrument(skip(self))]
    pub async fn retrieve_people_profile(&self, lookup: &ProfileLookup) -> Result<Value> {
        if !self.mode.is_live() {
            self.local_delay().await;
            return Ok(json!({
                "DisplayName": "TEST NAME",
                "Email": "test@example.com",
                "PersonalUrl": "",
                "Title": "Staff"
            }));
        }

        let account = lookup.resolve_account(&self.config.account_name_prefix)?;
        let select = lookup.select.as_deref().unwrap_or(&self.config.profile_default_select);
        let url = format!(
            "{}'{}'&$select={}",
            self.api_url(&self.config.people_manager_path_prefix).await,
            urlencoding::encode(&account),
            select
        );
        debug!(url = %url, "profile lookup");

        let response = self.transport.send(read_request(url)).await?;
        Ok(data_of(response.body))
    }

    /// Profile of the signed-in user.
    ///
    /// # Errors
    ///
    /// Any transport failure.
    #[instrument(skip(self))]
    pub async fn retrieve_current_user_profile(&self) -> Result<Value> {
        if !self.mode.is_live() {
            self.local_delay().await;
            return Ok(json!({ "DisplayName": "CURRENT USER" }));
        }

        let url = format!(
            "{}{}",
            self.api_url(&self.config.current_user_properties_path_prefix).await,
            self.config.my_profile_default_select
        );
        let response = self.transport.send(read_request(url)).await?;
        Ok(data_of(response.body))
    }

    /// Make sure a user exists on the site and return their site user id.
    ///
    /// # Errors
    ///
    /// Returns [`SpError::InvalidInput`] for an empty account, token failures,
    /// transport failures, or [`SpError::Serialization`] when the response
    /// carries no id.
    #[instrument(skip(self))]
    pub async fn ensure_site_user_id(&self, account_name: &str) -> Result<i64> {
        if account_name.is_empty() {
            return Err(SpError::InvalidInput("No account name provided".into()));
        }
        if !self.mode.is_live() {
            return Ok(LOCAL_SITE_USER_ID);
        }

        let digest = self.session.ensure_token().await?;
        let request = TransportRequest::post(self.api_url(&self.config.ensure_user_path).await)
            .header(HEADER_REQUEST_DIGEST, digest)
            .header(HEADER_ACCEPT, ODATA_VERBOSE)
            .json(json!({ "logonName": account_name }))
            .with_credentials();

        let response = self.transport.send(request).await?;
        site_user_id(&response.body)
            .ok_or_else(|| SpError::Serialization("ensure user response carried no Id".into()))
    }

    /// Send mail through the site. Recipients must be users known to the site.
    ///
    /// # Errors
    ///
    /// Returns [`SpError::InvalidInput`] for a message without sender,
    /// recipients or subject, token failures, or transport failures.
    #[instrument(skip(self, message), fields(subject = %message.subject))]
    pub async fn send_email(&self, message: &EmailMessage) -> Result<()> {
        message.validate()?;

        if !self.mode.is_live() {
            info!(
                to = ?message.to,
                from = %message.from,
                subject = %message.subject,
                body = %message.body,
                "Send email (dry run)"
            );
            return Ok(());
        }

        let payload = json!({
            "properties": {
                ENVELOPE_METADATA: { "type": EMAIL_PROPERTIES_TYPE },
                "From": message.from,
                "To": { ENVELOPE_RESULTS: message.to },
                "Subject": message.subject,
                "Body": message.body
            }
        });

        let digest = self.session.ensure_token().await?;
        let request = write_request(self.api_url(&self.config.send_email_path).await, &digest, METHOD_POST)
            .json(payload);
        self.transport.send(request).await?;
        info!(recipients = message.to.len(), "email sent");
        Ok(())
    }
}

/// `d` of a verbose response, or the body when there is none.
fn data_of(body: Value) -> Value {
    match body {
        Value::Object(mut root) if root.contains_key(ENVELOPE_DATA) => {
            root.remove(ENVELOPE_DATA).unwrap_or(Value::Null)
        }
        other => other,
    }
}
