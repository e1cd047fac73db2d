//! Client profile parsing and validation.
//!
//! The profile arrives as a JSON object on the command line. Business type,
//! region and business age are mandatory; everything else is optional
//! context for the summarizer and recommender.

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// A small-business client profile, the sole required input besides audio.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClientProfile {
    /// Client name.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    /// Contact e-mail.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    /// Business type (업종), e.g. "요식업".
    pub biz_type: String,
    /// Region (지역), e.g. "부산".
    pub region: String,
    /// Business age in months (업력).
    pub biz_age_months: u32,
    /// Credit score (신용점수).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub credit_score: Option<u32>,
    /// Stated funding purpose (자금 용도).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub purpose: Option<String>,
}

impl ClientProfile {
    /// Parses a profile from a JSON string.
    ///
    /// Missing or mistyped required fields surface as [`Error::Validation`]
    /// so the caller can report them and stop before any external call.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Validation`] for malformed JSON, missing required
    /// fields, or blank `biz_type`/`region`.
    pub fn from_json(json: &str) -> Result<Self> {
        let profile: Self =
            serde_json::from_str(json).map_err(|e| Error::validation(e.to_string()))?;
        profile.validate()?;
        Ok(profile)
    }

    /// Checks invariants serde cannot express: required text fields must
    /// not be blank.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Validation`] naming the offending field.
    pub fn validate(&self) -> Result<()> {
        if self.biz_type.trim().is_empty() {
            return Err(Error::validation("biz_type must not be empty"));
        }
        if self.region.trim().is_empty() {
            return Err(Error::validation("region must not be empty"));
        }
        Ok(())
    }

    /// Business age rounded to whole years, for display.
    #[must_use]
    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    pub fn biz_age_years(&self) -> u32 {
        (f64::from(self.biz_age_months) / 12.0).round() as u32
    }
}
