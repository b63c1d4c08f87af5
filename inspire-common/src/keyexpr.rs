//! Key expressions for hand topics.
//!
//! Every hand uses four keys under a shared prefix:
//!
//! ```text
//! rt/inspire_hand/state/<side>     decoded actuator state (bridge -> bus)
//! rt/inspire_hand/touch/<side>     tactile matrices (bridge -> bus, TCP only)
//! rt/inspire_hand/ctrl/<side>      control commands (bus -> bridge)
//! rt/inspire_hand/@/status/<side>  bridge status
//! ```

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Default key expression prefix for hand topics.
pub const KEY_PREFIX: &str = "rt/inspire_hand";

/// Which hand a bridge instance serves.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum HandSide {
    #[serde(rename = "l", alias = "left")]
    Left,
    #[default]
    #[serde(rename = "r", alias = "right")]
    Right,
}

impl HandSide {
    /// Topic suffix for this side.
    pub fn as_str(&self) -> &'static str {
        match self {
            HandSide::Left => "l",
            HandSide::Right => "r",
        }
    }
}

impl fmt::Display for HandSide {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for HandSide {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "l" | "left" => Ok(HandSide::Left),
            "r" | "right" => Ok(HandSide::Right),
            other => Err(format!("hand side must be 'l' or 'r', got '{}'", other)),
        }
    }
}

/// Builds the key expressions for one hand.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HandTopics {
    prefix: String,
    side: HandSide,
}

impl HandTopics {
    /// Topics under the default prefix.
    pub fn new(side: HandSide) -> Self {
        Self::with_prefix(KEY_PREFIX, side)
    }

    /// Topics under a custom prefix.
    pub fn with_prefix(prefix: impl Into<String>, side: HandSide) -> Self {
        let prefix = prefix.into();
        Self {
            prefix: prefix.trim_end_matches('/').to_string(),
            side,
        }
    }

    pub fn side(&self) -> HandSide {
        self.side
    }

    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    /// Key for decoded state messages.
    ///
    /// # Example
    /// ```
    /// use inspire_common::keyexpr::{HandSide, HandTopics};
    ///
    /// assert_eq!(HandTopics::new(HandSide::Left).state(), "rt/inspire_hand/state/l");
    /// ```
    pub fn state(&self) -> String {
        format!("{}/state/{}", self.prefix, self.side)
    }

    /// Key for tactile messages.
    pub fn touch(&self) -> String {
        format!("{}/touch/{}", self.prefix, self.side)
    }

    /// Key for inbound control commands.
    ///
    /// # Example
    /// ```
    /// use inspire_common::keyexpr::{HandSide, HandTopics};
    ///
    /// assert_eq!(HandTopics::new(HandSide::Right).ctrl(), "rt/inspire_hand/ctrl/r");
    /// ```
    pub fn ctrl(&self) -> String {
        format!("{}/ctrl/{}", self.prefix, self.side)
    }

    /// Key for bridge status reports.
    pub fn status(&self) -> String {
        format!("{}/@/status/{}", self.prefix, self.side)
    }

    /// Wildcard matching every topic of this hand.
    pub fn wildcard(&self) -> String {
        format!("{}/**/{}", self.prefix, self.side)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_topics() {
        let topics = HandTopics::new(HandSide::Right);

        assert_eq!(topics.state(), "rt/inspire_hand/state/r");
        assert_eq!(topics.touch(), "rt/inspire_hand/touch/r");
        assert_eq!(topics.ctrl(), "rt/inspire_hand/ctrl/r");
        assert_eq!(topics.status(), "rt/inspire_hand/@/status/r");
        assert_eq!(topics.wildcard(), "rt/inspire_hand/**/r");
    }

    #[test]
    fn test_custom_prefix_trailing_slash() {
        let topics = HandTopics::with_prefix("lab/hand/", HandSide::Left);
        assert_eq!(topics.prefix(), "lab/hand");
        assert_eq!(topics.state(), "lab/hand/state/l");
    }

    #[test]
    fn test_side_parsing() {
        assert_eq!("l".parse::<HandSide>().unwrap(), HandSide::Left);
        assert_eq!("Right".parse::<HandSide>().unwrap(), HandSide::Right);
        assert!("x".parse::<HandSide>().is_err());
    }

    #[test]
    fn test_side_serde() {
        let side: HandSide = serde_json::from_str("\"l\"").unwrap();
        assert_eq!(side, HandSide::Left);
        let side: HandSide = serde_json::from_str("\"right\"").unwrap();
        assert_eq!(side, HandSide::Right);
        assert_eq!(serde_json::to_string(&HandSide::Left).unwrap(), "\"l\"");
    }
}
