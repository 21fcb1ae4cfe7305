use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum PlayerError {
    #[error("name cannot be empty")]
    EmptyName,
    #[error("city cannot be empty")]
    EmptyCity,
    #[error("mobile number must be exactly 10 digits")]
    InvalidMobile,
}

/// Raw player details as typed into a login form.
#[derive(Debug, Clone, Default)]
pub struct PlayerDraft {
    pub name: String,
    pub city: String,
    pub mobile: String,
}

impl PlayerDraft {
    #[must_use]
    pub fn new(
        name: impl Into<String>,
        city: impl Into<String>,
        mobile: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            city: city.into(),
            mobile: mobile.into(),
        }
    }

    /// Validate and normalize the draft.
    ///
    /// # Errors
    ///
    /// Returns `PlayerError` if the name or city is blank, or the mobile number
    /// is not exactly ten ASCII digits.
    pub fn validate(self) -> Result<PlayerProfile, PlayerError> {
        let name = self.name.trim();
        if name.is_empty() {
            return Err(PlayerError::EmptyName);
        }
        let city = self.city.trim();
        if city.is_empty() {
            return Err(PlayerError::EmptyCity);
        }
        let mobile = self.mobile.trim();
        if mobile.len() != 10 || !mobile.bytes().all(|b| b.is_ascii_digit()) {
            return Err(PlayerError::InvalidMobile);
        }

        Ok(PlayerProfile {
            name: name.to_owned(),
            city: city.to_owned(),
            mobile: mobile.to_owned(),
        })
    }
}

/// Identity fields attached to every result.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlayerProfile {
    name: String,
    city: String,
    mobile: String,
}

impl PlayerProfile {
    pub const UNKNOWN: &'static str = "Unknown";

    /// Placeholder identity used when a game is played without logging in.
    #[must_use]
    pub fn anonymous() -> Self {
        Self {
            name: Self::UNKNOWN.to_owned(),
            city: Self::UNKNOWN.to_owned(),
            mobile: Self::UNKNOWN.to_owned(),
        }
    }

    /// Rehydrate a profile from storage without re-validating it.
    #[must_use]
    pub fn from_persisted(name: String, city: String, mobile: String) -> Self {
        Self { name, city, mobile }
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[must_use]
    pub fn city(&self) -> &str {
        &self.city
    }

    #[must_use]
    pub fn mobile(&self) -> &str {
        &self.mobile
    }

    #[must_use]
    pub fn is_anonymous(&self) -> bool {
        self.mobile == Self::UNKNOWN
    }
}

impl Default for PlayerProfile {
    fn default() -> Self {
        Self::anonymous()
    }
}
