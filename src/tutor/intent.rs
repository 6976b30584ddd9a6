//! Intent classification for free-form text messages.
//!
//! Pure string matching; the caller supplies "now" when turning a reminder
//! intent into a concrete fire time, so this module needs no clock.

use std::fmt;
use std::sync::LazyLock;

use chrono::Duration;
use regex::Regex;

static REMINDER_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)remind me in (\d+) ([a-z]+)(.*)").unwrap());

/// Time unit for relative reminders.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimeUnit {
    Second,
    Minute,
    Hour,
    Day,
}

impl TimeUnit {
    /// Parse a unit word, accepting singular and plural forms.
    fn parse(word: &str) -> Option<Self> {
        let word = word.to_lowercase();
        let singular = word.strip_suffix('s').unwrap_or(&word);
        match singular {
            "second" => Some(Self::Second),
            "minute" => Some(Self::Minute),
            "hour" => Some(Self::Hour),
            "day" => Some(Self::Day),
            _ => None,
        }
    }

    /// Duration of `amount` of this unit. None when the total does not fit
    /// a `Duration`; the caller answers with a corrective prompt instead of
    /// creating a reminder.
    pub fn duration(self, amount: i64) -> Option<Duration> {
        match self {
            Self::Second => Duration::try_seconds(amount),
            Self::Minute => Duration::try_minutes(amount),
            Self::Hour => Duration::try_hours(amount),
            Self::Day => Duration::try_days(amount),
        }
    }
}

/// Classified purpose of a text message.
#[derive(Debug, Clone, PartialEq)]
pub enum Intent {
    /// "remind me in N <unit> <body>"
    Reminder {
        amount: i64,
        unit: TimeUnit,
        body: String,
    },
    /// "generate image: <prompt>"
    GenerateImage { prompt: String },
    /// "extract text:" sent without an image.
    ExtractText,
    /// Anything else goes to the AI as-is.
    Query { text: String },
}

/// Classification failure. Terminal for the message: the user gets a
/// corrective prompt and no collaborator is invoked.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IntentError {
    /// Reminder pattern matched but the unit word is unknown.
    UnrecognizedTimeUnit(String),
    /// "generate image:" with nothing after the colon.
    EmptyPrompt,
}

impl fmt::Display for IntentError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::UnrecognizedTimeUnit(unit) => {
                write!(f, "unrecognized time unit '{}'", unit)
            }
            Self::EmptyPrompt => write!(f, "empty image generation prompt"),
        }
    }
}

impl std::error::Error for IntentError {}

/// Strip an ASCII prefix case-insensitively, returning the remainder.
pub(crate) fn strip_prefix_ci<'a>(text: &'a str, prefix: &str) -> Option<&'a str> {
    if text.len() >= prefix.len()
        && text.is_char_boundary(prefix.len())
        && text[..prefix.len()].eq_ignore_ascii_case(prefix)
    {
        Some(&text[prefix.len()..])
    } else {
        None
    }
}

/// Classify a text message. First match wins, case-insensitive:
/// reminder pattern anywhere in the text, then the "generate image:" and
/// "extract text:" prefixes, then plain query.
pub fn classify(text: &str) -> Result<Intent, IntentError> {
    if let Some(caps) = REMINDER_RE.captures(text) {
        // A digit run too long for i64 falls through to a plain query.
        if let Ok(amount) = caps[1].parse::<i64>() {
            let unit_word = &caps[2];
            let unit = TimeUnit::parse(unit_word)
                .ok_or_else(|| IntentError::UnrecognizedTimeUnit(unit_word.to_lowercase()))?;
            let body = caps[3].trim().to_string();
            return Ok(Intent::Reminder { amount, unit, body });
        }
    }

    if let Some(rest) = strip_prefix_ci(text, "generate image:") {
        let prompt = rest.trim();
        if prompt.is_empty() {
            return Err(IntentError::EmptyPrompt);
        }
        return Ok(Intent::GenerateImage {
            prompt: prompt.to_string(),
        });
    }

    if strip_prefix_ci(text, "extract text:").is_some() {
        return Ok(Intent::ExtractText);
    }

    Ok(Intent::Query {
        text: text.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reminder_all_units() {
        for (word, unit) in [
            ("second", TimeUnit::Second),
            ("minute", TimeUnit::Minute),
            ("hour", TimeUnit::Hour),
            ("day", TimeUnit::Day),
        ] {
            let intent = classify(&format!("remind me in 5 {}s to stretch", word)).unwrap();
            assert_eq!(
                intent,
                Intent::Reminder {
                    amount: 5,
                    unit,
                    body: "to stretch".to_string()
                }
            );
        }
    }

    #[test]
    fn test_reminder_singular_unit() {
        let intent = classify("remind me in 1 hour to call back").unwrap();
        assert_eq!(
            intent,
            Intent::Reminder {
                amount: 1,
                unit: TimeUnit::Hour,
                body: "to call back".to_string()
            }
        );
    }

    #[test]
    fn test_reminder_matches_anywhere() {
        // The pattern is a "contains", not a prefix.
        let intent = classify("Hey remind me in 5 minutes to do my math homework").unwrap();
        assert_eq!(
            intent,
            Intent::Reminder {
                amount: 5,
                unit: TimeUnit::Minute,
                body: "to do my math homework".to_string()
            }
        );
    }

    #[test]
    fn test_reminder_case_insensitive() {
        let intent = classify("REMIND ME IN 2 HOURS check oven").unwrap();
        assert!(matches!(
            intent,
            Intent::Reminder { amount: 2, unit: TimeUnit::Hour, .. }
        ));
    }

    #[test]
    fn test_reminder_unrecognized_unit() {
        let err = classify("remind me in 3 fortnights to rotate logs").unwrap_err();
        assert_eq!(err, IntentError::UnrecognizedTimeUnit("fortnights".to_string()));
    }

    #[test]
    fn test_reminder_takes_priority() {
        // Rule 1 wins even when a later prefix appears in the body.
        let intent = classify("remind me in 10 minutes generate image: a cat").unwrap();
        assert!(matches!(intent, Intent::Reminder { amount: 10, .. }));
    }

    #[test]
    fn test_reminder_empty_body() {
        let intent = classify("remind me in 30 seconds").unwrap();
        assert_eq!(
            intent,
            Intent::Reminder {
                amount: 30,
                unit: TimeUnit::Second,
                body: String::new()
            }
        );
    }

    #[test]
    fn test_generate_image() {
        let intent = classify("generate image: a sunny beach with palm trees").unwrap();
        assert_eq!(
            intent,
            Intent::GenerateImage {
                prompt: "a sunny beach with palm trees".to_string()
            }
        );
    }

    #[test]
    fn test_generate_image_case_insensitive() {
        let intent = classify("Generate Image: a red balloon").unwrap();
        assert!(matches!(intent, Intent::GenerateImage { .. }));
    }

    #[test]
    fn test_generate_image_empty_prompt() {
        assert_eq!(classify("generate image:").unwrap_err(), IntentError::EmptyPrompt);
        assert_eq!(classify("generate image:   ").unwrap_err(), IntentError::EmptyPrompt);
    }

    #[test]
    fn test_extract_text() {
        assert_eq!(classify("extract text:").unwrap(), Intent::ExtractText);
        assert_eq!(classify("Extract Text: please").unwrap(), Intent::ExtractText);
    }

    #[test]
    fn test_plain_query_fallback() {
        let intent = classify("what's the capital of France?").unwrap();
        assert_eq!(
            intent,
            Intent::Query {
                text: "what's the capital of France?".to_string()
            }
        );
    }

    #[test]
    fn test_huge_amount_falls_back_to_query() {
        let text = "remind me in 99999999999999999999999 days ok";
        assert!(matches!(classify(text).unwrap(), Intent::Query { .. }));
    }

    #[test]
    fn test_unit_duration() {
        assert_eq!(TimeUnit::Second.duration(30), Some(Duration::seconds(30)));
        assert_eq!(TimeUnit::Minute.duration(5), Some(Duration::minutes(5)));
        assert_eq!(TimeUnit::Hour.duration(2), Some(Duration::hours(2)));
        assert_eq!(TimeUnit::Day.duration(1), Some(Duration::days(1)));
    }

    #[test]
    fn test_unit_duration_overflow_is_none() {
        // Parses as i64 but does not fit a Duration.
        assert!(TimeUnit::Day.duration(9_000_000_000_000_000).is_none());
        assert!(TimeUnit::Hour.duration(i64::MAX).is_none());
        assert!(TimeUnit::Second.duration(i64::MAX).is_none());
    }

    #[test]
    fn test_strip_prefix_ci() {
        assert_eq!(strip_prefix_ci("Extract Text: hi", "extract text:"), Some(" hi"));
        assert_eq!(strip_prefix_ci("extract", "extract text:"), None);
        assert_eq!(strip_prefix_ci("no match here", "extract text:"), None);
    }
}
