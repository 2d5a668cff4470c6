//! Capture events: `verb[:argument]`.

use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use crate::error::Error;

/// One step of a capture sequence.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CaptureEvent {
    /// Capture the current state.
    Screenshot,
    /// Wait, then capture.
    Wait(Duration),
    /// Load a URL (the target's when absent), then capture.
    Navigate(Option<String>),
    /// Click a selector, then capture.
    Click(String),
    /// Raw input argument: `selector=value` for browsers, keystrokes for terminals.
    Input(String),
    /// Hover a selector, then capture.
    Hover(String),
    /// Scroll a selector into view, then capture.
    Scroll(String),
}

impl CaptureEvent {
    /// The event verb.
    #[must_use]
    pub fn verb(&self) -> &'static str {
        match self {
            Self::Screenshot => "screenshot",
            Self::Wait(_) => "wait",
            Self::Navigate(_) => "navigate",
            Self::Click(_) => "click",
            Self::Input(_) => "input",
            Self::Hover(_) => "hover",
            Self::Scroll(_) => "scroll",
        }
    }

    /// Split an input argument into `(selector, value)`.
    #[must_use]
    pub fn input_assignment(arg: &str) -> Option<(&str, &str)> {
        arg.split_once('=').filter(|(selector, _)| !selector.trim().is_empty())
    }

    /// Decode terminal escapes (`\n`, `\r`, `\t`, `\e`) in keystrokes.
    #[must_use]
    pub fn keystrokes(arg: &str) -> String {
        let mut out = String::with_capacity(arg.len());
        let mut chars = arg.chars();
        while let Some(c) = chars.next() {
            if c != '\\' {
                out.push(c);
                continue;
            }
            match chars.next() {
                Some('n') => out.push('\n'),
                Some('r') => out.push('\r'),
                Some('t') => out.push('\t'),
                Some('e') => out.push('\x1b'),
                Some(other) => {
                    out.push('\\');
                    out.push(other);
                }
                None => out.push('\\'),
            }
        }
        out
    }
}

impl FromStr for CaptureEvent {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        let (verb, arg) = match s.split_once(':') {
            Some((verb, arg)) => (verb.trim(), Some(arg)),
            None => (s, None),
        };
        let required = |arg: Option<&str>| {
            arg.map(str::trim)
                .filter(|a| !a.is_empty())
                .map(str::to_string)
                .ok_or_else(|| Error::Parse(format!("event {verb:?} needs an argument")))
        };

        match verb.to_ascii_lowercase().as_str() {
            "screenshot" => Ok(Self::Screenshot),
            "wait" => {
                let raw = required(arg)?;
                let secs: f64 = raw
                    .parse()
                    .map_err(|_| Error::Parse(format!("wait needs seconds, got {raw:?}")))?;
                Duration::try_from_secs_f64(secs)
                    .map(Self::Wait)
                    .map_err(|_| Error::Parse(format!("wait needs seconds, got {raw:?}")))
            }
            "navigate" => Ok(Self::Navigate(arg.map(str::trim).filter(|a| !a.is_empty()).map(str::to_string))),
            "click" => required(arg).map(Self::Click),
            // Keystrokes may legitimately be whitespace.
            "input" => match arg {
                Some(a) if !a.is_empty() => Ok(Self::Input(a.to_string())),
                _ => Err(Error::Parse("event \"input\" needs an argument".into())),
            },
            "hover" => required(arg).map(Self::Hover),
            "scroll" => required(arg).map(Self::Scroll),
            "" => Err(Error::Parse("empty event".into())),
            other => Err(Error::Parse(format!("unknown event verb {other:?}"))),
        }
    }
}

impl fmt::Display for CaptureEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Screenshot => f.write_str("screenshot"),
            Self::Wait(d) => write!(f, "wait:{}", d.as_secs_f64()),
            Self::Navigate(None) => f.write_str("navigate"),
            Self::Navigate(Some(url)) => write!(f, "navigate:{url}"),
            Self::Click(a) => write!(f, "click:{a}"),
            Self::Input(a) => write!(f, "input:{a}"),
            Self::Hover(a) => write!(f, "hover:{a}"),
            Self::Scroll(a) => write!(f, "scroll:{a}"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_grammar() {
        assert_eq!("screenshot".parse::<CaptureEvent>().unwrap(), CaptureEvent::Screenshot);
        assert_eq!("click:#submit".parse::<CaptureEvent>().unwrap(), CaptureEvent::Click("#submit".into()));
        assert_eq!(
            "wait:1.5".parse::<CaptureEvent>().unwrap(),
            CaptureEvent::Wait(Duration::from_millis(1500))
        );
        assert_eq!("navigate".parse::<CaptureEvent>().unwrap(), CaptureEvent::Navigate(None));
        assert_eq!(
            "navigate:http://localhost:3000/a".parse::<CaptureEvent>().unwrap(),
            CaptureEvent::Navigate(Some("http://localhost:3000/a".into()))
        );
        assert_eq!(
            "input:#email=a@b.c".parse::<CaptureEvent>().unwrap(),
            CaptureEvent::Input("#email=a@b.c".into())
        );
    }

    #[test]
    fn rejects_bad_events() {
        for bad in ["", "click", "click:", "wait:soon", "wait:-1", "drag:#a", "input"] {
            assert!(matches!(bad.parse::<CaptureEvent>(), Err(Error::Parse(_))), "{bad}");
        }
    }

    #[test]
    fn display_round_trips() {
        for text in ["screenshot", "wait:2", "navigate", "click:#a", "input:q", "hover:.m", "scroll:#f"] {
            assert_eq!(text.parse::<CaptureEvent>().unwrap().to_string(), text);
        }
    }

    #[test]
    fn input_helpers() {
        assert_eq!(CaptureEvent::input_assignment("#email=a=b"), Some(("#email", "a=b")));
        assert_eq!(CaptureEvent::input_assignment("=x"), None);
        assert_eq!(CaptureEvent::input_assignment("jj"), None);
        assert_eq!(CaptureEvent::keystrokes(r"q\n\e\x"), "q\n\x1b\\x");
    }
}
