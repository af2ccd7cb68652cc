//! Keyer error codes.

/// Errors reported by the keyboard core.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyerError {
    /// K01: Tick time base already owned by another user
    TimeBaseInUse,
    /// K02: Memory slot index out of range
    SlotOutOfRange,
    /// K03: Preset index out of range
    PresetOutOfRange,
}

impl KeyerError {
    /// Get error code string
    pub fn code(&self) -> &'static str {
        match self {
            Self::TimeBaseInUse => "K01",
            Self::SlotOutOfRange => "K02",
            Self::PresetOutOfRange => "K03",
        }
    }

    /// Get error message
    pub fn message(&self) -> &'static str {
        match self {
            Self::TimeBaseInUse => "time base in use",
            Self::SlotOutOfRange => "memory slot out of range",
            Self::PresetOutOfRange => "preset out of range",
        }
    }
}

impl core::fmt::Display for KeyerError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "{}: {}", self.code(), self.message())
    }
}

impl core::error::Error for KeyerError {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display() {
        assert_eq!(KeyerError::TimeBaseInUse.to_string(), "K01: time base in use");
        assert_eq!(KeyerError::PresetOutOfRange.code(), "K03");
    }
}
