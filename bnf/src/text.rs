use std::fmt::{self, Display};
use std::ops::Deref;

/// Reasons a string cannot become a [`SingleLineText`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum TextError {
    #[error("line feed at byte {offset}")]
    LineFeed { offset: usize },
    #[error("carriage return at byte {offset}")]
    CarriageReturn { offset: usize },
}

/// A string guaranteed to hold neither `\n` nor `\r`.
///
/// Every literal and every identifier fragment is one of these. The only way
/// to get one is through [`SingleLineText::new`], and the value is never
/// mutated afterwards.
#[derive(PartialEq, Eq, PartialOrd, Ord, Hash, Debug, Clone)]
pub struct SingleLineText(String);

impl SingleLineText {
    pub fn new(s: impl Into<String>) -> Result<Self, TextError> {
        let s = s.into();
        for (offset, c) in s.char_indices() {
            match c {
                '\n' => return Err(TextError::LineFeed { offset }),
                '\r' => return Err(TextError::CarriageReturn { offset }),
                _ => {}
            }
        }
        Ok(SingleLineText(s))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Deref for SingleLineText {
    type Target = str;

    fn deref(&self) -> &str {
        &self.0
    }
}

impl AsRef<str> for SingleLineText {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl Display for SingleLineText {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl TryFrom<&str> for SingleLineText {
    type Error = TextError;

    fn try_from(s: &str) -> Result<Self, Self::Error> {
        SingleLineText::new(s)
    }
}

impl TryFrom<String> for SingleLineText {
    type Error = TextError;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        SingleLineText::new(s)
    }
}
