use std::cmp::Ordering;
use std::fmt;
use std::str::FromStr;

/// A date field: an integer extended with "unknown" and signed infinities.
///
/// Unknown is not part of the order — comparing it against a known value
/// yields `None`, which date comparison treats as a wildcard.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum ExtendedValue {
    #[default]
    Unknown,
    Finite(i64),
    PosInfinity,
    NegInfinity,
}

impl ExtendedValue {
    pub fn is_known(self) -> bool {
        !matches!(self, ExtendedValue::Unknown)
    }

    /// The finite payload, if any.
    pub fn finite(self) -> Option<i64> {
        match self {
            ExtendedValue::Finite(n) => Some(n),
            _ => None,
        }
    }
}

impl PartialOrd for ExtendedValue {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        use ExtendedValue::*;
        match (self, other) {
            (Unknown, Unknown) => Some(Ordering::Equal),
            (Unknown, _) | (_, Unknown) => None,
            (NegInfinity, NegInfinity) | (PosInfinity, PosInfinity) => Some(Ordering::Equal),
            (NegInfinity, _) | (_, PosInfinity) => Some(Ordering::Less),
            (_, NegInfinity) | (PosInfinity, _) => Some(Ordering::Greater),
            (Finite(a), Finite(b)) => a.partial_cmp(b),
        }
    }
}

#[derive(Debug, PartialEq, Eq, thiserror::Error)]
#[error("expected an integer, '?', or an infinity token")]
pub struct InvalidValue;

impl FromStr for ExtendedValue {
    type Err = InvalidValue;

    /// Grammar: empty or `?` is unknown, `oo`/`inf`/`∞` an infinity
    /// (optionally `-`-prefixed), anything else a literal integer.
    fn from_str(s: &str) -> Result<Self, InvalidValue> {
        let s = s.trim();
        if s.is_empty() || s == "?" {
            return Ok(ExtendedValue::Unknown);
        }
        let (negative, body) = match s.strip_prefix('-') {
            Some(rest) => (true, rest),
            None => (false, s),
        };
        if matches!(body, "oo" | "inf" | "∞") {
            return Ok(if negative {
                ExtendedValue::NegInfinity
            } else {
                ExtendedValue::PosInfinity
            });
        }
        s.parse::<i64>()
            .map(ExtendedValue::Finite)
            .map_err(|_| InvalidValue)
    }
}

impl fmt::Display for ExtendedValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ExtendedValue::Unknown => f.write_str("?"),
            ExtendedValue::Finite(n) => write!(f, "{n}"),
            ExtendedValue::PosInfinity => f.write_str("oo"),
            ExtendedValue::NegInfinity => f.write_str("-oo"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::ExtendedValue::*;
    use super::*;
    use pretty_assertions::assert_eq;
    use rstest::rstest;

    #[rstest]
    #[case("", Unknown)]
    #[case("?", Unknown)]
    #[case("  ? ", Unknown)]
    #[case("oo", PosInfinity)]
    #[case("inf", PosInfinity)]
    #[case("∞", PosInfinity)]
    #[case("-oo", NegInfinity)]
    #[case("-inf", NegInfinity)]
    #[case("-∞", NegInfinity)]
    #[case("7", Finite(7))]
    #[case("-7", Finite(-7))]
    #[case("2024", Finite(2024))]
    fn parses_valid_fields(#[case] input: &str, #[case] expected: ExtendedValue) {
        assert_eq!(input.parse(), Ok(expected));
    }

    #[rstest]
    #[case("x")]
    #[case("1.5")]
    #[case("--")]
    #[case("o o")]
    fn rejects_garbage(#[case] input: &str) {
        assert_eq!(input.parse::<ExtendedValue>(), Err(InvalidValue));
    }

    #[test]
    fn knowns_are_linearly_ordered() {
        assert!(NegInfinity < Finite(i64::MIN));
        assert!(Finite(3) < Finite(4));
        assert!(Finite(i64::MAX) < PosInfinity);
        assert!(NegInfinity < PosInfinity);
    }

    #[test]
    fn unknown_is_incomparable_to_knowns() {
        assert_eq!(Unknown.partial_cmp(&Finite(3)), None);
        assert_eq!(PosInfinity.partial_cmp(&Unknown), None);
        assert_eq!(Unknown.partial_cmp(&Unknown), Some(std::cmp::Ordering::Equal));
    }

    #[test]
    fn displays_in_source_form() {
        assert_eq!(Unknown.to_string(), "?");
        assert_eq!(Finite(12).to_string(), "12");
        assert_eq!(PosInfinity.to_string(), "oo");
        assert_eq!(NegInfinity.to_string(), "-oo");
    }
}
