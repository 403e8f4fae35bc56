use serde::{Deserialize, Serialize};

/// Overall status of a host assessment as reported by the remote service.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum HostStatus {
    /// Resolving the hostname; endpoints are not known yet.
    Dns,
    InProgress,
    Ready,
    Error,
    /// Anything the service sends that this client does not recognize.
    #[default]
    Unknown,
}

impl HostStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Dns => "DNS",
            Self::InProgress => "IN_PROGRESS",
            Self::Ready => "READY",
            Self::Error => "ERROR",
            Self::Unknown => "UNKNOWN",
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Ready | Self::Error)
    }
}

impl From<&str> for HostStatus {
    fn from(value: &str) -> Self {
        match value.trim().to_ascii_uppercase().as_str() {
            "DNS" => Self::Dns,
            "IN_PROGRESS" => Self::InProgress,
            "READY" => Self::Ready,
            "ERROR" => Self::Error,
            _ => Self::Unknown,
        }
    }
}

impl From<String> for HostStatus {
    fn from(value: String) -> Self {
        Self::from(value.as_str())
    }
}

impl From<HostStatus> for String {
    fn from(value: HostStatus) -> Self {
        value.as_str().to_string()
    }
}

impl std::fmt::Display for HostStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Per-endpoint progress. The service only sends a free-text `statusMessage`;
/// [`EndpointStatus::from_message`] maps it onto this closed set.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum EndpointStatus {
    Pending,
    InProgress,
    Ready,
    Error,
    #[default]
    Unknown,
}

impl EndpointStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "PENDING",
            Self::InProgress => "IN_PROGRESS",
            Self::Ready => "READY",
            Self::Error => "ERROR",
            Self::Unknown => "UNKNOWN",
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Ready | Self::Error)
    }

    /// Interpret a polled `statusMessage`.
    ///
    /// Any other message is an error description once the endpoint reports
    /// 100% progress. Before that it stays `Unknown` (non-terminal).
    pub fn from_message(message: Option<&str>, progress: Option<i32>) -> Self {
        let Some(message) = message.map(str::trim).filter(|m| !m.is_empty()) else {
            return Self::Unknown;
        };
        match message.to_ascii_lowercase().as_str() {
            "ready" => Self::Ready,
            "pending" => Self::Pending,
            "in progress" => Self::InProgress,
            _ if progress == Some(100) => Self::Error,
            _ => Self::Unknown,
        }
    }
}

impl From<String> for EndpointStatus {
    fn from(value: String) -> Self {
        match value.trim().to_ascii_uppercase().as_str() {
            "PENDING" => Self::Pending,
            "IN_PROGRESS" => Self::InProgress,
            "READY" => Self::Ready,
            "ERROR" => Self::Error,
            _ => Self::Unknown,
        }
    }
}

impl From<EndpointStatus> for String {
    fn from(value: EndpointStatus) -> Self {
        value.as_str().to_string()
    }
}

impl std::fmt::Display for EndpointStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// SSL Labs letter grade.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum Grade {
    APlus,
    A,
    AMinus,
    B,
    C,
    D,
    E,
    F,
    /// Certificate not trusted.
    T,
    /// Certificate name mismatch.
    M,
    Unknown,
}

impl Grade {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::APlus => "A+",
            Self::A => "A",
            Self::AMinus => "A-",
            Self::B => "B",
            Self::C => "C",
            Self::D => "D",
            Self::E => "E",
            Self::F => "F",
            Self::T => "T",
            Self::M => "M",
            Self::Unknown => "unknown",
        }
    }

    /// Lower is better. Trust problems rank with F.
    pub fn rank(&self) -> u8 {
        match self {
            Self::APlus => 0,
            Self::A => 1,
            Self::AMinus => 2,
            Self::B => 3,
            Self::C => 4,
            Self::D => 5,
            Self::E => 6,
            Self::F | Self::T | Self::M => 7,
            Self::Unknown => 8,
        }
    }
}

impl From<&str> for Grade {
    fn from(value: &str) -> Self {
        match value.trim() {
            "A+" => Self::APlus,
            "A" => Self::A,
            "A-" => Self::AMinus,
            "B" => Self::B,
            "C" => Self::C,
            "D" => Self::D,
            "E" => Self::E,
            "F" => Self::F,
            "T" => Self::T,
            "M" => Self::M,
            _ => Self::Unknown,
        }
    }
}

impl From<String> for Grade {
    fn from(value: String) -> Self {
        Self::from(value.as_str())
    }
}

impl From<Grade> for String {
    fn from(value: Grade) -> Self {
        value.as_str().to_string()
    }
}

impl std::fmt::Display for Grade {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}
