use crate::error::TranslateError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// One input edge of a source operation, written the way the source format
/// writes it: `producer`, `producer:port`, `producer:group:index` or `^producer`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct InputRef {
    pub producer: String,
    pub group: Option<String>,
    pub index: usize,
    /// Execution-order dependency only; carries no data.
    pub control: bool,
}

impl InputRef {
    pub fn new(producer: impl Into<String>, index: usize) -> Self {
        Self { producer: producer.into(), group: None, index, control: false }
    }
}

impl FromStr for InputRef {
    type Err = TranslateError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || TranslateError::InvalidEdge(s.to_string());
        if let Some(producer) = s.strip_prefix('^') {
            if producer.is_empty() {
                return Err(invalid());
            }
            return Ok(Self { producer: producer.to_string(), group: None, index: 0, control: true });
        }

        let parts: Vec<&str> = s.split(':').collect();
        let (producer, group, index) = match parts.as_slice() {
            [producer] => (*producer, None, 0),
            [producer, index] => (*producer, None, index.parse().map_err(|_| invalid())?),
            [producer, group, index] if !group.is_empty() => {
                (*producer, Some(group.to_string()), index.parse().map_err(|_| invalid())?)
            }
            _ => return Err(invalid()),
        };
        if producer.is_empty() {
            return Err(invalid());
        }
        Ok(Self { producer: producer.to_string(), group, index, control: false })
    }
}

impl TryFrom<String> for InputRef {
    type Error = TranslateError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<InputRef> for String {
    fn from(edge: InputRef) -> Self {
        edge.to_string()
    }
}

impl fmt::Display for InputRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.control {
            return write!(f, "^{}", self.producer);
        }
        match &self.group {
            Some(group) => write!(f, "{}:{}:{}", self.producer, group, self.index),
            None => write!(f, "{}:{}", self.producer, self.index),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum OutputMode {
    /// Every output of the operation.
    All,
    /// One output port of the operation.
    ByIndex(usize),
    /// Whatever feeds the given input slot of the operation.
    FromInputEdge(usize),
}

/// A declared model output: `op`, `op:port` or `port:op`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct OutputPlace {
    pub name: String,
    pub mode: OutputMode,
}

impl OutputPlace {
    pub fn new(name: impl Into<String>, mode: OutputMode) -> Self {
        Self { name: name.into(), mode }
    }
}

impl FromStr for OutputPlace {
    type Err = TranslateError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || TranslateError::InvalidOutputPlace(s.to_string());
        let place = match s.split_once(':') {
            None => Self::new(s, OutputMode::All),
            Some((port, name)) if !port.is_empty() && port.bytes().all(|b| b.is_ascii_digit()) => {
                Self::new(name, OutputMode::FromInputEdge(port.parse().map_err(|_| invalid())?))
            }
            Some((name, port)) => Self::new(name, OutputMode::ByIndex(port.parse().map_err(|_| invalid())?)),
        };
        if place.name.is_empty() || place.name.contains(':') {
            return Err(invalid());
        }
        Ok(place)
    }
}

impl TryFrom<String> for OutputPlace {
    type Error = TranslateError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<OutputPlace> for String {
    fn from(place: OutputPlace) -> Self {
        place.to_string()
    }
}

impl fmt::Display for OutputPlace {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.mode {
            OutputMode::All => f.write_str(&self.name),
            OutputMode::ByIndex(port) => write!(f, "{}:{}", self.name, port),
            OutputMode::FromInputEdge(port) => write!(f, "{}:{}", port, self.name),
        }
    }
}
