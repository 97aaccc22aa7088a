use rusqlite::types::{FromSql, FromSqlError, FromSqlResult, ToSql, ToSqlOutput, ValueRef};
use std::convert::TryFrom;
use std::fmt;

/// Location confidence ladder (spec.md §3, §4.5). Ordered best to worst.
#[derive(Debug, Copy, Clone, Eq, PartialEq, PartialOrd, Ord, serde::Serialize, serde::Deserialize)]
pub enum LocationConfidence {
    AExact,
    BCoordsInText,
    BPlaceMatch,
    CCountry,
    CSourceDefault,
    UUnknown,
}

#[derive(Debug)]
pub struct InvalidLocationConfidence(String);

impl std::error::Error for InvalidLocationConfidence {}

impl fmt::Display for InvalidLocationConfidence {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?} is not a valid location confidence", self.0)
    }
}

impl LocationConfidence {
    pub fn as_str(&self) -> &'static str {
        match self {
            LocationConfidence::AExact => "A_exact",
            LocationConfidence::BCoordsInText => "B_coords_in_text",
            LocationConfidence::BPlaceMatch => "B_place_match",
            LocationConfidence::CCountry => "C_country",
            LocationConfidence::CSourceDefault => "C_source_default",
            LocationConfidence::UUnknown => "U_unknown",
        }
    }

    /// Ladder rank used for monotonic promotion on incidents (spec.md §4.7).
    pub fn rank(&self) -> u8 {
        match self {
            LocationConfidence::AExact => 30,
            LocationConfidence::BCoordsInText | LocationConfidence::BPlaceMatch => 20,
            LocationConfidence::CCountry | LocationConfidence::CSourceDefault => 10,
            LocationConfidence::UUnknown => 0,
        }
    }
}

impl fmt::Display for LocationConfidence {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl TryFrom<&str> for LocationConfidence {
    type Error = InvalidLocationConfidence;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        Ok(match value {
            "A_exact" => LocationConfidence::AExact,
            "B_coords_in_text" => LocationConfidence::BCoordsInText,
            "B_place_match" => LocationConfidence::BPlaceMatch,
            "C_country" => LocationConfidence::CCountry,
            "C_source_default" => LocationConfidence::CSourceDefault,
            "U_unknown" => LocationConfidence::UUnknown,
            other => return Err(InvalidLocationConfidence(other.to_owned())),
        })
    }
}

impl ToSql for LocationConfidence {
    fn to_sql(&self) -> rusqlite::Result<ToSqlOutput<'_>> {
        self.as_str().to_sql()
    }
}

impl FromSql for LocationConfidence {
    fn column_result(value: ValueRef<'_>) -> FromSqlResult<Self> {
        LocationConfidence::try_from(value.as_str()?).map_err(|e| FromSqlError::Other(Box::new(e)))
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn rank_is_monotonic_down_the_ladder() {
        assert!(LocationConfidence::AExact.rank() > LocationConfidence::BPlaceMatch.rank());
        assert!(LocationConfidence::BCoordsInText.rank() > LocationConfidence::CCountry.rank());
        assert!(LocationConfidence::CSourceDefault.rank() > LocationConfidence::UUnknown.rank());
    }
}
