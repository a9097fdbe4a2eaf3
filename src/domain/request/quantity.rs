// Copyright 2025 JiangLong.
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! Resource quantities as they appear in limit specs ("500m", "2", "1.5Gi").
//!
//! Every quantity is normalized to milli-base-units (millicores for CPU,
//! thousandths of a byte for memory) so that "1" and "1000m" compare equal.

use crate::shared::error::{ProvisionError, Result};
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::fmt;
use std::sync::OnceLock;

const MAX_FRACTION_DIGITS: usize = 9;
const MAX_INTEGER_DIGITS: usize = 18;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Dimension {
    Cpu,
    Memory,
}

impl Dimension {
    pub fn as_str(&self) -> &'static str {
        match self {
            Dimension::Cpu => "cpu",
            Dimension::Memory => "memory",
        }
    }
}

impl fmt::Display for Dimension {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QuantityUnit {
    None,
    Milli,
    Kibi,
    Mebi,
    Gibi,
    Tebi,
}

impl QuantityUnit {
    pub fn suffix(&self) -> &'static str {
        match self {
            QuantityUnit::None => "",
            QuantityUnit::Milli => "m",
            QuantityUnit::Kibi => "Ki",
            QuantityUnit::Mebi => "Mi",
            QuantityUnit::Gibi => "Gi",
            QuantityUnit::Tebi => "Ti",
        }
    }

    fn from_suffix(suffix: &str) -> Option<Self> {
        match suffix {
            "" => Some(QuantityUnit::None),
            "m" => Some(QuantityUnit::Milli),
            "Ki" => Some(QuantityUnit::Kibi),
            "Mi" => Some(QuantityUnit::Mebi),
            "Gi" => Some(QuantityUnit::Gibi),
            "Ti" => Some(QuantityUnit::Tebi),
            _ => None,
        }
    }

    /// Number of milli-base-units in one unit.
    fn milli_factor(&self) -> u128 {
        match self {
            QuantityUnit::Milli => 1,
            QuantityUnit::None => 1_000,
            QuantityUnit::Kibi => 1_000 << 10,
            QuantityUnit::Mebi => 1_000 << 20,
            QuantityUnit::Gibi => 1_000 << 30,
            QuantityUnit::Tebi => 1_000 << 40,
        }
    }

    fn allowed_for(&self, dimension: Dimension) -> bool {
        match dimension {
            Dimension::Cpu => matches!(self, QuantityUnit::None | QuantityUnit::Milli),
            Dimension::Memory => true,
        }
    }
}

/// A parsed quantity. The decimal magnitude is kept exactly as written so
/// that scaling preserves the caller's unit ("1Gi" doubles to "2Gi").
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResourceQuantity {
    dimension: Dimension,
    mantissa: u128,
    scale: u32,
    unit: QuantityUnit,
    milli: u128,
}

fn quantity_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r"^([0-9]+)(?:\.([0-9]+))?([A-Za-z]*)$").expect("quantity pattern is valid")
    })
}

impl ResourceQuantity {
    /// Parse `raw` as a quantity of `dimension`. `field` names the input for
    /// error reporting (e.g. "resources.cpu.limit").
    pub fn parse(dimension: Dimension, field: &str, raw: &str) -> Result<Self> {
        let trimmed = raw.trim();
        let invalid = |reason: &str| ProvisionError::invalid_quantity(field, raw, reason);

        if trimmed.is_empty() {
            return Err(invalid("quantity is empty"));
        }
        if trimmed.starts_with('-') {
            return Err(invalid("quantity must not be negative"));
        }

        let caps = quantity_pattern()
            .captures(trimmed)
            .ok_or_else(|| invalid("magnitude is not a number"))?;

        let integer = caps.get(1).map_or("", |m| m.as_str());
        let fraction = caps.get(2).map_or("", |m| m.as_str());
        let suffix = caps.get(3).map_or("", |m| m.as_str());

        if integer.len() > MAX_INTEGER_DIGITS || fraction.len() > MAX_FRACTION_DIGITS {
            return Err(invalid("magnitude has too many digits"));
        }

        let unit = QuantityUnit::from_suffix(suffix)
            .ok_or_else(|| invalid(&format!("unknown unit suffix '{}'", suffix)))?;
        if !unit.allowed_for(dimension) {
            return Err(invalid(&format!(
                "unit suffix '{}' is not valid for {}",
                suffix, dimension
            )));
        }

        let digits = format!("{}{}", integer, fraction);
        let mantissa: u128 = digits
            .parse()
            .map_err(|_| invalid("magnitude is not a number"))?;
        let scale = fraction.len() as u32;

        let scaled = mantissa
            .checked_mul(unit.milli_factor())
            .ok_or_else(|| invalid("quantity is too large"))?;
        let divisor = 10u128.pow(scale);
        if scaled % divisor != 0 {
            return Err(invalid("precision finer than one milli-unit"));
        }

        Ok(Self {
            dimension,
            mantissa,
            scale,
            unit,
            milli: scaled / divisor,
        })
    }

    pub fn dimension(&self) -> Dimension {
        self.dimension
    }

    pub fn unit(&self) -> QuantityUnit {
        self.unit
    }

    /// Amount in milli-base-units.
    pub fn as_milli(&self) -> u128 {
        self.milli
    }

    /// Multiply by `factor`, keeping the original unit suffix.
    pub fn scaled(&self, factor: u32) -> Self {
        let factor = u128::from(factor);
        Self {
            dimension: self.dimension,
            mantissa: self.mantissa * factor,
            scale: self.scale,
            unit: self.unit,
            milli: self.milli * factor,
        }
    }

    /// Same amount after normalization, regardless of unit.
    pub fn same_amount(&self, other: &Self) -> bool {
        self.dimension == other.dimension && self.milli == other.milli
    }
}

impl PartialOrd for ResourceQuantity {
    /// Quantities of different dimensions are unordered.
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        if self.dimension != other.dimension {
            return None;
        }
        Some(self.milli.cmp(&other.milli))
    }
}

impl fmt::Display for ResourceQuantity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.scale == 0 {
            return write!(f, "{}{}", self.mantissa, self.unit.suffix());
        }
        let divisor = 10u128.pow(self.scale);
        let integer = self.mantissa / divisor;
        let fraction = format!(
            "{:0width$}",
            self.mantissa % divisor,
            width = self.scale as usize
        );
        let fraction = fraction.trim_end_matches('0');
        if fraction.is_empty() {
            write!(f, "{}{}", integer, self.unit.suffix())
        } else {
            write!(f, "{}.{}{}", integer, fraction, self.unit.suffix())
        }
    }
}

/// Fail with `RequestExceedsLimit` when `request` is larger than `limit`.
///
/// # Panics
///
/// Panics when the operands belong to different dimensions; that is a bug in
/// the caller, not invalid user input.
pub fn compare_limits(
    field: &str,
    request: &ResourceQuantity,
    limit: &ResourceQuantity,
) -> Result<()> {
    assert_eq!(
        request.dimension, limit.dimension,
        "compare_limits called with mismatched dimensions for {}",
        field
    );

    if request.milli > limit.milli {
        return Err(ProvisionError::RequestExceedsLimit {
            field: field.to_string(),
            request: request.to_string(),
            limit: limit.to_string(),
        });
    }
    Ok(())
}
