use std::fmt;

use chrono::{Datelike, Locale, NaiveDate};

use crate::parsing::element::Gap;
use crate::parsing::value::{ExtendedValue, InvalidValue};

/// A (possibly partial) journal date in day.month.year order.
///
/// Unknown fields act as wildcards in ordering and are inherited from the
/// previous date on merge, so `# 14.3.` under a known year stays in March
/// of that year.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Date {
    pub line: u32,
    pub indent: usize,
    pub gap: Option<Gap>,
    pub day: ExtendedValue,
    pub month: ExtendedValue,
    pub year: ExtendedValue,
}

#[derive(Debug, PartialEq, Eq, thiserror::Error)]
pub enum DateError {
    #[error("a date has at most three `.`-separated fields")]
    TooManyFields,
    #[error("field {field:?}: {source}")]
    Field { field: String, source: InvalidValue },
}

impl Date {
    /// Parses the text after the date marker, e.g. `14.3.2024` or `14.?.`.
    /// Fields omitted at the end stay unknown.
    pub fn parse(line: u32, indent: usize, body: &str) -> Result<Self, DateError> {
        let mut fields = [ExtendedValue::Unknown; 3];
        let parts: Vec<&str> = body.split('.').collect();
        if parts.len() > 3 {
            return Err(DateError::TooManyFields);
        }
        for (slot, part) in fields.iter_mut().zip(&parts) {
            *slot = part.parse().map_err(|source| DateError::Field {
                field: part.trim().to_string(),
                source,
            })?;
        }
        let [day, month, year] = fields;
        Ok(Date {
            line,
            indent,
            gap: None,
            day,
            month,
            year,
        })
    }

    /// Wildcard-tolerant "strictly later" comparison, most significant
    /// field first. A known value beats an unknown one; an unknown value
    /// skips to the next field.
    pub fn is_after(&self, other: &Date) -> bool {
        let pairs = [
            (self.year, other.year),
            (self.month, other.month),
            (self.day, other.day),
        ];
        for (ours, theirs) in pairs {
            match ours.partial_cmp(&theirs) {
                Some(std::cmp::Ordering::Greater) => return true,
                Some(std::cmp::Ordering::Less) => return false,
                Some(std::cmp::Ordering::Equal) => {}
                None if ours.is_known() => return true,
                None => {}
            }
        }
        false
    }

    /// Union of two dates, with `newer` taking precedence on known fields.
    /// The preceding blank line normally follows `newer`; `keep_gap`
    /// retains the old one instead (used for two consecutive date lines).
    pub fn merged(&self, newer: &Date, keep_gap: bool) -> Date {
        let pick = |new: ExtendedValue, old: ExtendedValue| if new.is_known() { new } else { old };
        Date {
            line: newer.line,
            indent: newer.indent,
            gap: if keep_gap && self.gap.is_some() {
                self.gap.clone()
            } else {
                newer.gap.clone()
            },
            day: pick(newer.day, self.day),
            month: pick(newer.month, self.month),
            year: pick(newer.year, self.year),
        }
    }

    fn calendar(&self) -> Option<NaiveDate> {
        let day = u32::try_from(self.day.finite()?).ok()?;
        let month = u32::try_from(self.month.finite()?).ok()?;
        let year = i32::try_from(self.year.finite()?).ok()?;
        NaiveDate::from_ymd_opt(year, month, day)
    }

    /// The full output line: indent, `# d.m.y`, and a localized weekday
    /// comment when the fields form a valid calendar date.
    pub fn render(&self, locale: Locale) -> String {
        let mut out = format!(
            "{}# {}.{}.{}",
            " ".repeat(self.indent),
            self.day,
            self.month,
            self.year
        );
        if let Some(date) = self.calendar() {
            out.push_str(" --");
            out.push_str(&date.format_localized("%A", locale).to_string());
        }
        out
    }

    /// The date line for "one day later", at the given indent. A date that
    /// cannot be incremented (partial, invalid or out of range) is rendered
    /// as-is with a warning comment instead.
    pub fn tomorrow_line(&self, indent: usize, locale: Locale) -> String {
        let pad = " ".repeat(indent);
        if let Some(next) = self.calendar().and_then(|d| d.succ_opt()) {
            return format!(
                "{pad}# {}.{}.{} --{}",
                next.day(),
                next.month(),
                next.year(),
                next.format_localized("%A", locale)
            );
        }
        format!(
            "{pad}# {}.{}.{} --UNABLE TO INCREMENT",
            self.day, self.month, self.year
        )
    }
}

impl fmt::Display for Date {
    /// Locale-free form, used in error messages.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}# {}.{}.{}",
            " ".repeat(self.indent),
            self.day,
            self.month,
            self.year
        )
    }
}

/// Maps a configured locale name onto a weekday-name locale; `C`, `POSIX`,
/// the empty string and anything unrecognized all resolve to POSIX.
pub fn resolve_locale(name: &str) -> Locale {
    match name {
        "" | "C" | "POSIX" => Locale::POSIX,
        other => Locale::try_from(other).unwrap_or(Locale::POSIX),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use rstest::rstest;

    fn date(day: &str, month: &str, year: &str) -> Date {
        Date {
            day: day.parse().unwrap(),
            month: month.parse().unwrap(),
            year: year.parse().unwrap(),
            ..Date::default()
        }
    }

    #[test]
    fn parses_full_and_partial_dates() {
        let full = Date::parse(3, 2, "14.3.2024").unwrap();
        assert_eq!(full.line, 3);
        assert_eq!(full.indent, 2);
        assert_eq!(
            (full.day, full.month, full.year),
            (
                ExtendedValue::Finite(14),
                ExtendedValue::Finite(3),
                ExtendedValue::Finite(2024)
            )
        );

        let partial = Date::parse(1, 0, " 14 ").unwrap();
        assert_eq!(partial.day, ExtendedValue::Finite(14));
        assert_eq!(partial.month, ExtendedValue::Unknown);
        assert_eq!(partial.year, ExtendedValue::Unknown);
    }

    #[test]
    fn rejects_too_many_fields() {
        assert_eq!(
            Date::parse(1, 0, "1.2.3.4"),
            Err(DateError::TooManyFields)
        );
    }

    #[test]
    fn rejects_bad_field() {
        assert!(matches!(
            Date::parse(1, 0, "14.x.2024"),
            Err(DateError::Field { field, .. }) if field == "x"
        ));
    }

    #[rstest]
    // year decides before month and day
    #[case(date("1", "1", "2001"), date("31", "12", "2000"), true)]
    #[case(date("31", "12", "2000"), date("1", "1", "2001"), false)]
    // known beats wildcard
    #[case(date("?", "?", "2000"), date("31", "12", "?"), true)]
    // wildcard skips to the next field
    #[case(date("14", "3", "?"), date("3", "3", "?"), true)]
    #[case(date("3", "3", "?"), date("14", "3", "?"), false)]
    // nothing known is never later
    #[case(date("?", "?", "?"), date("?", "?", "?"), false)]
    #[case(date("?", "?", "?"), date("14", "3", "2024"), false)]
    // equal dates are not strictly later
    #[case(date("14", "3", "2024"), date("14", "3", "2024"), false)]
    fn orders_with_wildcards(#[case] left: Date, #[case] right: Date, #[case] after: bool) {
        assert_eq!(left.is_after(&right), after);
    }

    #[test]
    fn merge_fills_unknown_fields_from_the_older_date() {
        let older = date("14", "3", "2024");
        let newer = Date {
            line: 9,
            indent: 4,
            ..date("20", "?", "?")
        };
        let merged = older.merged(&newer, false);
        assert_eq!(merged.day, ExtendedValue::Finite(20));
        assert_eq!(merged.month, ExtendedValue::Finite(3));
        assert_eq!(merged.year, ExtendedValue::Finite(2024));
        assert_eq!(merged.line, 9);
        assert_eq!(merged.indent, 4);
    }

    #[test]
    fn merge_gap_follows_the_newer_date_unless_kept() {
        let older = Date {
            gap: Some(Gap::blank(2)),
            ..date("1", "1", "2024")
        };
        let newer = date("2", "1", "2024");
        assert_eq!(older.merged(&newer, false).gap, None);
        assert_eq!(older.merged(&newer, true).gap, Some(Gap::blank(2)));
    }

    #[test]
    fn renders_weekday_for_valid_dates() {
        let d = Date {
            indent: 2,
            ..date("14", "3", "2024")
        };
        assert_eq!(d.render(Locale::POSIX), "  # 14.3.2024 --Thursday");
    }

    #[test]
    fn renders_partial_and_invalid_dates_without_weekday() {
        assert_eq!(date("14", "3", "?").render(Locale::POSIX), "# 14.3.?");
        // 31.2. is not a calendar date
        assert_eq!(
            date("31", "2", "2024").render(Locale::POSIX),
            "# 31.2.2024"
        );
        assert_eq!(date("oo", "3", "2024").render(Locale::POSIX), "# oo.3.2024");
    }

    #[test]
    fn renders_localized_weekday() {
        let d = date("14", "3", "2024");
        assert_eq!(
            d.render(resolve_locale("de_DE")),
            "# 14.3.2024 --Donnerstag"
        );
    }

    #[test]
    fn tomorrow_of_a_full_date_moves_one_day() {
        let d = date("31", "12", "2024");
        assert_eq!(
            d.tomorrow_line(2, Locale::POSIX),
            "  # 1.1.2025 --Wednesday"
        );
    }

    #[test]
    fn tomorrow_of_a_partial_date_reports_failure() {
        let d = date("14", "?", "2024");
        assert_eq!(
            d.tomorrow_line(0, Locale::POSIX),
            "# 14.?.2024 --UNABLE TO INCREMENT"
        );
    }

    #[test]
    fn unknown_locales_fall_back_to_posix() {
        assert_eq!(resolve_locale("C"), Locale::POSIX);
        assert_eq!(resolve_locale(""), Locale::POSIX);
        assert_eq!(resolve_locale("klingon"), Locale::POSIX);
        assert_eq!(resolve_locale("de_DE"), Locale::de_DE);
    }
}
