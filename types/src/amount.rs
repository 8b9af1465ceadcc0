//! NIGHT amounts.
//!
//! Amounts are fixed-point integers (u128) counted in minor units to avoid
//! floating-point errors. One NIGHT is `10^DECIMALS` minor units.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::TypesError;

/// An amount of the native token, stored in minor units.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct NightAmount(u128);

impl NightAmount {
    /// Fractional digits of the display unit.
    pub const DECIMALS: u32 = 6;

    /// Minor units per display unit.
    pub const SCALE: u128 = 10u128.pow(Self::DECIMALS);

    pub fn from_minor(minor: u128) -> Self {
        Self(minor)
    }

    pub fn minor(&self) -> u128 {
        self.0
    }

    /// `None` when `rhs` exceeds `self`.
    pub fn checked_sub(self, rhs: Self) -> Option<Self> {
        self.0.checked_sub(rhs.0).map(Self)
    }

    /// Parse a positive display-unit amount such as `"100"` or `"0.25"`.
    ///
    /// Rejects signs, exponents, non-finite spellings, amounts needing more
    /// than [`Self::DECIMALS`] fractional digits, and amounts that convert to
    /// zero minor units.
    pub fn parse_display(input: &str) -> Result<Self, TypesError> {
        let s = input.trim();
        let invalid = || TypesError::InvalidAmount(input.to_string());

        if s.starts_with('-') {
            return Err(TypesError::NonPositiveAmount);
        }

        let (whole, frac) = match s.split_once('.') {
            Some((w, f)) => (w, f),
            None => (s, ""),
        };
        if whole.is_empty() && frac.is_empty() {
            return Err(invalid());
        }
        if !whole.chars().all(|c| c.is_ascii_digit()) || !frac.chars().all(|c| c.is_ascii_digit())
        {
            return Err(invalid());
        }

        // Trailing zeros carry no precision.
        let frac = frac.trim_end_matches('0');
        if frac.len() > Self::DECIMALS as usize {
            return Err(TypesError::ExcessPrecision {
                amount: input.to_string(),
                max_decimals: Self::DECIMALS,
            });
        }

        let overflow = || TypesError::AmountOverflow(input.to_string());
        let whole_minor = if whole.is_empty() {
            0
        } else {
            whole
                .parse::<u128>()
                .map_err(|_| overflow())?
                .checked_mul(Self::SCALE)
                .ok_or_else(overflow)?
        };
        let frac_minor = if frac.is_empty() {
            0
        } else {
            let padding = Self::DECIMALS - frac.len() as u32;
            frac.parse::<u128>().map_err(|_| invalid())? * 10u128.pow(padding)
        };

        let minor = whole_minor.checked_add(frac_minor).ok_or_else(overflow)?;
        if minor == 0 {
            return Err(TypesError::NonPositiveAmount);
        }
        Ok(Self(minor))
    }

    /// Render in display units, trimming trailing fractional zeros.
    pub fn to_display(&self) -> String {
        format_minor(self.0)
    }
}

/// Render a minor-unit value in display units (`1500000` -> `"1.5"`).
pub fn format_minor(minor: u128) -> String {
    let whole = minor / NightAmount::SCALE;
    let frac = minor % NightAmount::SCALE;
    if frac == 0 {
        return whole.to_string();
    }
    let digits = format!("{:0width$}", frac, width = NightAmount::DECIMALS as usize);
    format!("{whole}.{}", digits.trim_end_matches('0'))
}

impl FromStr for NightAmount {
    type Err = TypesError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse_display(s)
    }
}

impl fmt::Display for NightAmount {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} NIGHT", self.to_display())
    }
}
