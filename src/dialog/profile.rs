//! User profile collected by the slot-filling dialogs

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Closed set of fields a card reply may set
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ProfileField {
    Id,
    GivenName,
    SurName,
    DisplayName,
    DomainName,
    Department,
    JobTitle,
    PhoneNumber,
    Domain,
    Password,
    AccountEnabled,
}

impl ProfileField {
    pub const ALL: [ProfileField; 11] = [
        ProfileField::Id,
        ProfileField::GivenName,
        ProfileField::SurName,
        ProfileField::DisplayName,
        ProfileField::DomainName,
        ProfileField::Department,
        ProfileField::JobTitle,
        ProfileField::PhoneNumber,
        ProfileField::Domain,
        ProfileField::Password,
        ProfileField::AccountEnabled,
    ];

    /// Key used by card inputs and template data
    pub fn key(self) -> &'static str {
        match self {
            ProfileField::Id => "Id",
            ProfileField::GivenName => "GivenName",
            ProfileField::SurName => "SurName",
            ProfileField::DisplayName => "DisplayName",
            ProfileField::DomainName => "DomainName",
            ProfileField::Department => "Department",
            ProfileField::JobTitle => "JobTitle",
            ProfileField::PhoneNumber => "PhoneNumber",
            ProfileField::Domain => "Domain",
            ProfileField::Password => "Password",
            ProfileField::AccountEnabled => "AccountEnabled",
        }
    }

    pub fn from_key(key: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|f| f.key() == key)
    }

    /// Human name used in messages
    pub fn label(self) -> &'static str {
        match self {
            ProfileField::Id => "id",
            ProfileField::GivenName => "given name",
            ProfileField::SurName => "surname",
            ProfileField::DisplayName => "display name",
            ProfileField::DomainName => "domain name",
            ProfileField::Department => "department",
            ProfileField::JobTitle => "job title",
            ProfileField::PhoneNumber => "phone number",
            ProfileField::Domain => "domain",
            ProfileField::Password => "password",
            ProfileField::AccountEnabled => "account status",
        }
    }
}

impl fmt::Display for ProfileField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// What to do with reply keys outside the field table
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum UnknownFieldPolicy {
    #[default]
    Ignore,
    Reject,
}

impl FromStr for UnknownFieldPolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "ignore" => Ok(UnknownFieldPolicy::Ignore),
            "reject" => Ok(UnknownFieldPolicy::Reject),
            other => Err(format!("unknown field policy '{other}'")),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ProfileError {
    #[error("cannot {action}: the {field} is missing")]
    MissingRequiredField {
        action: &'static str,
        field: ProfileField,
    },
    #[error("unknown field: {0}")]
    UnknownField(String),
}

impl ProfileError {
    pub fn missing(action: &'static str, field: ProfileField) -> Self {
        ProfileError::MissingRequiredField { action, field }
    }

    pub fn user_message(&self) -> String {
        match self {
            ProfileError::MissingRequiredField { action, field } => {
                format!("I couldn't {action} because the {field} is missing.")
            }
            ProfileError::UnknownField(key) => {
                format!("I don't know what to do with the field \"{key}\". Please try again.")
            }
        }
    }
}

/// Information about a directory user, filled in across turns.
///
/// Domain-name prefix and principal name are derived on demand from the
/// stored fields so the order in which fields arrive never matters.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct UserProfile {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub given_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sur_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub display_name: Option<String>,
    /// Explicit domain-name override, used when the names are not known
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub domain_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub department: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub job_title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub phone_number: Option<String>,
    /// Domain suffix, e.g. `@student.hogent.be`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub domain: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub password: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub account_enabled: Option<bool>,
}

fn strip_spaces(s: &str) -> String {
    s.chars().filter(|c| !c.is_whitespace()).collect()
}

fn non_empty(s: Option<&str>) -> Option<&str> {
    s.filter(|v| !v.trim().is_empty())
}

fn as_text(value: &Value) -> Option<String> {
    let text = match value {
        Value::Null => return None,
        Value::String(s) => s.trim().to_string(),
        other => other.to_string(),
    };
    (!text.is_empty()).then_some(text)
}

fn as_bool(value: &Value) -> Option<bool> {
    match value {
        Value::Bool(b) => Some(*b),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

impl UserProfile {
    /// Set one field from a reply value; empty values clear the field
    pub fn set(&mut self, field: ProfileField, value: &Value) {
        let text = as_text(value);
        match field {
            ProfileField::Id => self.id = text,
            ProfileField::GivenName => self.given_name = text,
            ProfileField::SurName => self.sur_name = text,
            ProfileField::DisplayName => self.display_name = text,
            ProfileField::DomainName => self.set_domain_name(text.as_deref().unwrap_or_default()),
            ProfileField::Department => self.department = text,
            ProfileField::JobTitle => self.job_title = text,
            ProfileField::PhoneNumber => self.phone_number = text,
            ProfileField::Domain => self.domain = text,
            ProfileField::Password => self.password = text,
            ProfileField::AccountEnabled => self.account_enabled = as_bool(value),
        }
    }

    /// Store a domain-name override with whitespace removed
    pub fn set_domain_name(&mut self, name: &str) {
        let stripped = strip_spaces(name);
        self.domain_name = (!stripped.is_empty()).then_some(stripped);
    }

    /// Merge a structured reply through the field table
    pub fn merge_fields(
        &mut self,
        fields: &Map<String, Value>,
        policy: UnknownFieldPolicy,
    ) -> Result<(), ProfileError> {
        if policy == UnknownFieldPolicy::Reject {
            if let Some(key) = fields.keys().find(|k| ProfileField::from_key(k).is_none()) {
                return Err(ProfileError::UnknownField(key.clone()));
            }
        }
        for (key, value) in fields {
            match ProfileField::from_key(key) {
                Some(field) => self.set(field, value),
                None => tracing::debug!(key = %key, "Ignoring unknown profile field"),
            }
        }
        Ok(())
    }

    /// Given name and surname without spaces, else the override
    pub fn domain_name_prefix(&self) -> Option<String> {
        match (non_empty(self.given_name.as_deref()), non_empty(self.sur_name.as_deref())) {
            (Some(given), Some(sur)) => Some(strip_spaces(given) + &strip_spaces(sur)),
            _ => non_empty(self.domain_name.as_deref()).map(str::to_string),
        }
    }

    /// Prefix plus domain suffix
    pub fn principal_name(&self) -> Option<String> {
        let prefix = self.domain_name_prefix()?;
        let domain = non_empty(self.domain.as_deref())?;
        Some(prefix + domain.trim())
    }

    /// Principal name, or the first missing component
    pub fn require_principal(&self, action: &'static str) -> Result<String, ProfileError> {
        let prefix = self
            .domain_name_prefix()
            .ok_or_else(|| ProfileError::missing(action, ProfileField::DomainName))?;
        let domain = non_empty(self.domain.as_deref())
            .ok_or_else(|| ProfileError::missing(action, ProfileField::Domain))?;
        Ok(prefix + domain.trim())
    }

    /// Data document for card templates, with derived names included
    pub fn template_data(&self) -> Value {
        let mut data = match serde_json::to_value(self) {
            Ok(Value::Object(map)) => map,
            _ => Map::new(),
        };
        data.remove(ProfileField::Password.key());
        if let Some(prefix) = self.domain_name_prefix() {
            data.insert(ProfileField::DomainName.key().into(), Value::String(prefix));
        }
        if let Some(upn) = self.principal_name() {
            data.insert("UserPrincipalName".into(), Value::String(upn));
        }
        Value::Object(data)
    }
}
