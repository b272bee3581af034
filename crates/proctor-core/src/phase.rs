use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// One discrete stage of an intercepted HTTP exchange.
///
/// Declaration order is the order in which an exchange visits the phases.
#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ProcessingPhase {
    RequestHeaders,
    RequestBody,
    RequestTrailers,
    ResponseHeaders,
    ResponseBody,
    ResponseTrailers,
}

impl ProcessingPhase {
    pub const ALL: [ProcessingPhase; 6] = [
        ProcessingPhase::RequestHeaders,
        ProcessingPhase::RequestBody,
        ProcessingPhase::RequestTrailers,
        ProcessingPhase::ResponseHeaders,
        ProcessingPhase::ResponseBody,
        ProcessingPhase::ResponseTrailers,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ProcessingPhase::RequestHeaders => "REQUEST_HEADERS",
            ProcessingPhase::RequestBody => "REQUEST_BODY",
            ProcessingPhase::RequestTrailers => "REQUEST_TRAILERS",
            ProcessingPhase::ResponseHeaders => "RESPONSE_HEADERS",
            ProcessingPhase::ResponseBody => "RESPONSE_BODY",
            ProcessingPhase::ResponseTrailers => "RESPONSE_TRAILERS",
        }
    }

    /// True for the upstream (request) leg of the exchange.
    pub fn is_request(&self) -> bool {
        matches!(
            self,
            ProcessingPhase::RequestHeaders | ProcessingPhase::RequestBody | ProcessingPhase::RequestTrailers
        )
    }
}

impl fmt::Display for ProcessingPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
#[error("unknown processing phase: {0}")]
pub struct PhaseParseError(pub String);

impl FromStr for ProcessingPhase {
    type Err = PhaseParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let n = s.trim();
        ProcessingPhase::ALL
            .into_iter()
            .find(|p| p.as_str().eq_ignore_ascii_case(n))
            .ok_or_else(|| PhaseParseError(n.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_case_insensitively() {
        assert_eq!("request_body".parse::<ProcessingPhase>(), Ok(ProcessingPhase::RequestBody));
        assert_eq!(" RESPONSE_TRAILERS ".parse::<ProcessingPhase>(), Ok(ProcessingPhase::ResponseTrailers));
        assert!("REQUEST".parse::<ProcessingPhase>().is_err());
    }

    #[test]
    fn request_leg_is_first_three() {
        let request: Vec<_> = ProcessingPhase::ALL.iter().filter(|p| p.is_request()).collect();
        assert_eq!(request.len(), 3);
        assert!(ProcessingPhase::RequestTrailers < ProcessingPhase::ResponseHeaders);
    }
}
