//! User accounts and their notification profiles.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use super::{Cadence, UserId};

/// Registered account.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub id: UserId,
    pub username: String,
    pub email: String,
}

impl fmt::Display for User {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.username)
    }
}

/// Language of notification emails.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EmailLanguage {
    #[default]
    En,
    El,
}

impl EmailLanguage {
    pub fn code(self) -> &'static str {
        match self {
            Self::En => "en",
            Self::El => "el",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unsupported email language: {0}")]
pub struct UnknownEmailLanguage(pub String);

impl FromStr for EmailLanguage {
    type Err = UnknownEmailLanguage;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "en" => Ok(Self::En),
            "el" => Ok(Self::El),
            other => Err(UnknownEmailLanguage(other.to_owned())),
        }
    }
}

/// Per-user notification preferences and supervision link.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Profile {
    pub user_id: UserId,
    pub first_name: String,
    pub last_name: String,
    pub address: String,
    /// `None` means the user is never notified.
    pub notification: Option<Cadence>,
    pub email_language: EmailLanguage,
    /// Account that receives digests about this user's fields.
    pub supervisor: Option<UserId>,
    pub supervision_question: bool,
}

impl Profile {
    /// Profile assigned to a newly registered account.
    pub fn new_default(user_id: UserId) -> Self {
        Self {
            user_id,
            first_name: String::new(),
            last_name: String::new(),
            address: String::new(),
            notification: None,
            email_language: EmailLanguage::default(),
            supervisor: None,
            supervision_question: false,
        }
    }
}

/// Account together with its profile, as read by the notification run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Recipient {
    pub user: User,
    pub profile: Profile,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_profile_is_silent_and_english() {
        let id = UserId::random();
        let profile = Profile::new_default(id);
        assert_eq!(profile.user_id, id);
        assert_eq!(profile.notification, None);
        assert_eq!(profile.email_language, EmailLanguage::En);
        assert_eq!(profile.supervisor, None);
    }

    #[test]
    fn email_language_codes_parse() {
        assert_eq!("el".parse(), Ok(EmailLanguage::El));
        assert!("fr".parse::<EmailLanguage>().is_err());
    }
}
