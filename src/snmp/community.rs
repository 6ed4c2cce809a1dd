use zeroize::Zeroize;

/// SNMP community string.
///
/// Communities are shared secrets in v1/v2c: `Debug` and `Display` print
/// `[REDACTED]`, and the buffer is zeroized on drop with volatile writes.
/// Call [`Community::expose`] where the actual value is needed, and never
/// log the result.
#[derive(Clone)]
pub struct Community(String);

impl Community {
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    pub fn expose(&self) -> &str {
        &self.0
    }

    pub fn as_bytes(&self) -> &[u8] {
        self.0.as_bytes()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl From<&str> for Community {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

impl std::fmt::Debug for Community {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("[REDACTED]")
    }
}

impl std::fmt::Display for Community {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("[REDACTED]")
    }
}

impl Drop for Community {
    fn drop(&mut self) {
        self.0.zeroize();
    }
}
