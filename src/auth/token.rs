//! The token stored in the auth cookie and how it is serialized.

use serde::{Deserialize, Serialize};
use time::{Duration, OffsetDateTime, UtcOffset};

use crate::{Error, auth::UserID};

mod datetime_format {
    //! Serializes an [OffsetDateTime] with a fixed width hour.
    //!
    //! The default serializer writes midnight as "0:00:00.0", which the
    //! default deserializer then rejects because it expects two digit hours.
    use serde::{Deserialize, Deserializer, Serializer};
    use time::{
        OffsetDateTime, format_description::BorrowedFormatItem, macros::format_description,
    };

    /// Date time format for the token expiry, e.g. "2021-01-01 00:00:00.000000 +00:00:00".
    pub(super) const DATE_TIME_FORMAT: &[BorrowedFormatItem] = format_description!(
        "[year]-[month]-[day] [hour]:[minute]:[second].[subsecond] [offset_hour \
             sign:mandatory]:[offset_minute]:[offset_second]"
    );

    pub fn serialize<S>(dt: &OffsetDateTime, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        let formatted = dt
            .format(DATE_TIME_FORMAT)
            .map_err(serde::ser::Error::custom)?;
        serializer.serialize_str(&formatted)
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<OffsetDateTime, D::Error>
    where
        D: Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        OffsetDateTime::parse(&s, DATE_TIME_FORMAT).map_err(serde::de::Error::custom)
    }
}

/// Identifies the logged in user and when their session ends.
#[derive(Serialize, Deserialize, Debug, PartialEq)]
pub struct Token {
    pub user_id: UserID,

    #[serde(
        serialize_with = "datetime_format::serialize",
        deserialize_with = "datetime_format::deserialize"
    )]
    pub expires_at: OffsetDateTime,
}

impl Token {
    /// Create a token for `user_id` that expires `duration` from now in the
    /// timezone given by `local_offset`.
    ///
    /// # Errors
    /// Returns [Error::InvalidDateFormat] if the expiry would overflow.
    pub fn new(user_id: UserID, duration: Duration, local_offset: UtcOffset) -> Result<Self, Error> {
        let now = OffsetDateTime::now_utc().to_offset(local_offset);
        let expires_at = now.checked_add(duration).ok_or_else(|| {
            Error::InvalidDateFormat(
                format!("adding {duration} overflowed"),
                now.to_string(),
            )
        })?;

        Ok(Self {
            user_id,
            expires_at,
        })
    }

    /// Whether the token's expiry is in the past.
    pub fn is_expired(&self) -> bool {
        self.expires_at <= OffsetDateTime::now_utc()
    }

    /// Serialize the token to a JSON string for storing in a cookie.
    pub fn to_json(&self) -> Result<String, Error> {
        serde_json::to_string(self).map_err(|error| {
            let expiry = self
                .expires_at
                .format(datetime_format::DATE_TIME_FORMAT)
                .unwrap_or_else(|_| self.expires_at.to_string());
            Error::InvalidDateFormat(error.to_string(), expiry)
        })
    }

    /// Parse a token previously created with [Token::to_json].
    pub fn from_json(text: &str) -> Result<Self, Error> {
        serde_json::from_str(text).map_err(|error| {
            tracing::warn!("Could not parse auth token: {error}");
            Error::InvalidCredentials
        })
    }
}

#[cfg(test)]
mod token_tests {
    use time::{Duration, OffsetDateTime, UtcOffset, macros::datetime};

    use crate::{Error, UserID, auth::token::Token};

    #[test]
    fn serialise_token() {
        let user_id = UserID::new(1);
        let expires_at = datetime!(2025-12-21 03:54:00).assume_offset(UtcOffset::UTC);
        let token = Token {
            user_id,
            expires_at,
        };
        let expected = r#"{"user_id":1,"expires_at":"2025-12-21 03:54:00.0 +00:00:00"}"#;

        let actual = token.to_json().unwrap();

        assert_eq!(expected, actual);
    }

    #[test]
    fn deserialise_token_with_midnight_expiry() {
        let expected = Token {
            user_id: UserID::new(1),
            expires_at: datetime!(2025-12-21 00:00:00).assume_offset(UtcOffset::UTC),
        };
        let token_string = r#"{"user_id":1,"expires_at":"2025-12-21 00:00:00.0 +00:00:00"}"#;

        let actual = Token::from_json(token_string).unwrap();

        assert_eq!(expected, actual);
    }

    #[test]
    fn garbage_is_invalid_credentials() {
        assert_eq!(Token::from_json("deleted"), Err(Error::InvalidCredentials));
    }

    #[test]
    fn new_token_uses_local_offset() {
        let offset = UtcOffset::from_hms(13, 0, 0).unwrap();

        let token = Token::new(UserID::new(2), Duration::minutes(5), offset).unwrap();

        assert_eq!(token.expires_at.offset(), offset);
        assert!(!token.is_expired());
        let remaining = token.expires_at - OffsetDateTime::now_utc();
        assert!(remaining > Duration::minutes(4) && remaining <= Duration::minutes(5));
    }

    #[test]
    fn past_token_is_expired() {
        let token = Token {
            user_id: UserID::new(1),
            expires_at: OffsetDateTime::now_utc() - Duration::seconds(1),
        };

        assert!(token.is_expired());
    }
}
