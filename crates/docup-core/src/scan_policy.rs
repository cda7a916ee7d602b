use std::fmt::{Display, Formatter, Result as FmtResult};
use std::str::FromStr;

/// What the upload pipeline does when the content scanner cannot be reached.
///
/// There is deliberately no default: deployments must pick one explicitly.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ScanFallbackPolicy {
    /// Proceed with the upload and record that the scan did not pass.
    FailOpen,
    /// Reject the upload.
    FailClosed,
}

impl FromStr for ScanFallbackPolicy {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().replace('_', "-").as_str() {
            "fail-open" => Ok(ScanFallbackPolicy::FailOpen),
            "fail-closed" => Ok(ScanFallbackPolicy::FailClosed),
            _ => Err(anyhow::anyhow!(
                "Invalid scanner unavailable policy: {} (expected fail-open or fail-closed)",
                s
            )),
        }
    }
}

impl Display for ScanFallbackPolicy {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        match self {
            ScanFallbackPolicy::FailOpen => write!(f, "FAIL_OPEN"),
            ScanFallbackPolicy::FailClosed => write!(f, "FAIL_CLOSED"),
        }
    }
}
