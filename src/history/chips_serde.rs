use serde::de::Error as DeError;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

use super::types::Chips;

/// Largest magnitude below which every whole `f64` is an exact integer (2^53).
const EXACT_INTEGER_LIMIT: f64 = 9_007_199_254_740_992.0;

fn write<S: Serializer>(amount: Chips, serializer: S) -> Result<S::Ok, S::Error> {
    if amount.fract() == 0.0 && amount.abs() <= EXACT_INTEGER_LIMIT {
        // Exact: the value is whole and within the 53-bit mantissa.
        serializer.serialize_i64(amount as i64)
    } else {
        serializer.serialize_f64(amount)
    }
}

fn check(amount: f64) -> Result<Chips, String> {
    if amount.is_finite() && amount >= 0.0 {
        Ok(amount)
    } else {
        Err(format!("amount {amount} is not a non-negative number"))
    }
}

/// Serde helpers for chip amounts: any non-negative JSON number is accepted,
/// and whole amounts are written back as integers.
pub mod chips {
    use super::*;

    pub fn serialize<S: Serializer>(value: &Chips, serializer: S) -> Result<S::Ok, S::Error> {
        write(*value, serializer)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Chips, D::Error> {
        let raw = f64::deserialize(deserializer)?;
        check(raw).map_err(DeError::custom)
    }
}

/// Same as [`chips`] for optional amounts; `null` and absent both read as `None`.
pub mod optional_chips {
    use super::*;

    struct Whole(Chips);

    impl Serialize for Whole {
        fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
            write(self.0, serializer)
        }
    }

    pub fn serialize<S: Serializer>(
        value: &Option<Chips>,
        serializer: S,
    ) -> Result<S::Ok, S::Error> {
        match value {
            Some(amount) => serializer.serialize_some(&Whole(*amount)),
            None => serializer.serialize_none(),
        }
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(
        deserializer: D,
    ) -> Result<Option<Chips>, D::Error> {
        Option::<f64>::deserialize(deserializer)?
            .map(check)
            .transpose()
            .map_err(DeError::custom)
    }
}

/// Write-only form for signed running totals such as snapshot stacks.
pub mod signed_chips {
    use super::*;

    pub fn serialize<S: Serializer>(value: &f64, serializer: S) -> Result<S::Ok, S::Error> {
        write(*value, serializer)
    }
}
