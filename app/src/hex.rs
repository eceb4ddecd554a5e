#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Hex(String);

impl Hex {
    pub fn encode(data: &[u8]) -> Self {
        Hex(hex::encode(data))
    }

    /// Wraps a value that was hex encoded before being stored.
    pub fn from_stored(hex: String) -> Self {
        Hex(hex)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}
