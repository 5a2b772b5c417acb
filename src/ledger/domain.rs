//! Validated input types for the ledger.

use std::{fmt::Display, str::FromStr};

use serde::{Deserialize, Serialize};

use crate::Error;

/// The applications offered in the payment and contribution forms even before
/// anything has been recorded for them.
pub const KNOWN_APPLICATIONS: [&str; 2] = ["YouTube Premium", "Crunchyroll"];

/// A validated, non-empty name of a subscription service, e.g. "YouTube Premium".
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize, Hash)]
pub struct ApplicationName(String);

impl ApplicationName {
    /// Create an application name, trimming surrounding whitespace.
    ///
    /// # Errors
    ///
    /// This function will return an [Error::EmptyApplicationName] if `name` is empty or only
    /// whitespace.
    pub fn new(name: &str) -> Result<Self, Error> {
        let name = name.trim();

        if name.is_empty() {
            Err(Error::EmptyApplicationName)
        } else {
            Ok(Self(name.to_owned()))
        }
    }

    /// Create an application name without validation.
    ///
    /// The caller should ensure that the string is not empty.
    ///
    /// This function has `_unchecked` in the name but is not `unsafe`, because if the non-empty
    /// invariant is violated it will cause incorrect behaviour but not affect memory safety.
    pub fn new_unchecked(name: &str) -> Self {
        Self(name.to_owned())
    }
}

impl AsRef<str> for ApplicationName {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl FromStr for ApplicationName {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        ApplicationName::new(s)
    }
}

impl Display for ApplicationName {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A validated, non-empty display name of the person a balance belongs to.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize, Hash)]
pub struct ContributorName(String);

impl ContributorName {
    /// Create a contributor name, trimming surrounding whitespace.
    ///
    /// # Errors
    ///
    /// This function will return an [Error::EmptyContributorName] if `name` is empty or only
    /// whitespace.
    pub fn new(name: &str) -> Result<Self, Error> {
        let name = name.trim();

        if name.is_empty() {
            Err(Error::EmptyContributorName)
        } else {
            Ok(Self(name.to_owned()))
        }
    }

    /// Create a contributor name without validation.
    ///
    /// The caller should ensure that the string is not empty.
    pub fn new_unchecked(name: &str) -> Self {
        Self(name.to_owned())
    }
}

impl AsRef<str> for ContributorName {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl FromStr for ContributorName {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        ContributorName::new(s)
    }
}

impl Display for ContributorName {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A strictly positive, finite amount of money in dollars.
#[derive(Clone, Copy, Debug, PartialEq, PartialOrd, Serialize, Deserialize)]
pub struct Amount(f64);

impl Amount {
    /// Create an amount.
    ///
    /// # Errors
    ///
    /// This function will return an [Error::InvalidAmount] if `amount` is zero, negative, NaN or
    /// infinite.
    pub fn new(amount: f64) -> Result<Self, Error> {
        if amount.is_finite() && amount > 0.0 {
            Ok(Self(amount))
        } else {
            Err(Error::InvalidAmount(amount.to_string()))
        }
    }

    /// The amount as a float.
    pub fn as_f64(&self) -> f64 {
        self.0
    }
}

impl FromStr for Amount {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();

        trimmed
            .parse::<f64>()
            .map_err(|_| Error::InvalidAmount(trimmed.to_owned()))
            .and_then(Amount::new)
    }
}

impl Display for Amount {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}
