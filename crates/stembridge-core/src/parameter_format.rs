//! Parameter value formatting and parsing.
//!
//! A [`Formatter`] turns a *plain* value (the parameter's own unit, after
//! mapping from the normalized range) into display text and back. Units are
//! kept apart from the value text so hosts can show them in their own field.
//!
//! ```ignore
//! let gain = Formatter::Decibel { precision: 1 };
//! assert_eq!(gain.text(1.0), "+0.0");
//! assert_eq!(gain.unit(), "dB");
//! assert_eq!(gain.parse("-6 dB"), Some(0.501187...));
//! ```

/// Conversion between plain parameter values and display strings.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Formatter {
    /// Plain number with a fixed number of decimals.
    Float { precision: usize },

    /// Linear amplitude shown in decibels. Values at or below -120 dB
    /// display as "-inf".
    Decibel { precision: usize },

    /// Frequency in Hz, switching to a "k" suffix from 1 kHz.
    Frequency,

    /// Time in milliseconds.
    Milliseconds { precision: usize },

    /// `0.0..=1.0` shown as `0..=100`.
    Percent { precision: usize },

    /// On above one half, off otherwise.
    Boolean,

    /// One label per step; the plain value is the label index.
    Labels(&'static [&'static str]),
}

const SILENCE_THRESHOLD: f64 = 1e-6; // -120 dB

impl Formatter {
    /// Display text for a plain value, without unit.
    pub fn text(&self, value: f64) -> String {
        match *self {
            Formatter::Float { precision } | Formatter::Milliseconds { precision } => {
                format!("{value:.precision$}")
            }
            Formatter::Decibel { precision } => {
                if value <= SILENCE_THRESHOLD {
                    return "-inf".to_string();
                }
                let db = 20.0 * value.log10();
                let sign = if db >= 0.0 { "+" } else { "" };
                format!("{sign}{db:.precision$}")
            }
            Formatter::Frequency if value >= 1000.0 => format!("{:.2}k", value / 1000.0),
            Formatter::Frequency => format!("{value:.0}"),
            Formatter::Percent { precision } => format!("{:.precision$}", value * 100.0),
            Formatter::Boolean if value > 0.5 => "On".to_string(),
            Formatter::Boolean => "Off".to_string(),
            Formatter::Labels(labels) => {
                let last = labels.len().saturating_sub(1);
                let index = (value.round().max(0.0) as usize).min(last);
                labels.get(index).copied().unwrap_or_default().to_string()
            }
        }
    }

    /// Parse display text (with or without unit) into a plain value.
    pub fn parse(&self, text: &str) -> Option<f64> {
        let text = text.trim();
        let number = |suffix: &str| -> Option<f64> {
            text.strip_suffix(suffix)
                .unwrap_or(text)
                .trim()
                .parse::<f64>()
                .ok()
        };

        match *self {
            Formatter::Float { .. } => text.parse().ok(),
            Formatter::Decibel { .. } => {
                let body = text.strip_suffix("dB").unwrap_or(text).trim();
                if body.eq_ignore_ascii_case("-inf") {
                    return Some(0.0);
                }
                body.parse::<f64>().ok().map(|db| 10f64.powf(db / 20.0))
            }
            Formatter::Frequency => {
                let body = text.strip_suffix("Hz").unwrap_or(text).trim();
                match body.strip_suffix(['k', 'K']) {
                    Some(khz) => khz.trim().parse::<f64>().ok().map(|v| v * 1000.0),
                    None => body.parse().ok(),
                }
            }
            Formatter::Milliseconds { .. } => number("ms"),
            Formatter::Percent { .. } => number("%").map(|v| v / 100.0),
            Formatter::Boolean => match text.to_ascii_lowercase().as_str() {
                "on" | "true" | "yes" | "1" => Some(1.0),
                "off" | "false" | "no" | "0" => Some(0.0),
                _ => None,
            },
            Formatter::Labels(labels) => labels
                .iter()
                .position(|label| label.eq_ignore_ascii_case(text))
                .map(|index| index as f64),
        }
    }

    /// Unit shown next to the value text.
    pub fn unit(&self) -> &'static str {
        match self {
            Formatter::Decibel { .. } => "dB",
            Formatter::Frequency => "Hz",
            Formatter::Milliseconds { .. } => "ms",
            Formatter::Percent { .. } => "%",
            Formatter::Float { .. } | Formatter::Boolean | Formatter::Labels(_) => "",
        }
    }
}

impl Default for Formatter {
    fn default() -> Self {
        Formatter::Float { precision: 2 }
    }
}
