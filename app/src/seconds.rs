#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Seconds(pub i64);

impl Seconds {
    pub fn one_week() -> Self {
        Self(7 * 24 * 3600)
    }

    pub fn thirty_minutes() -> Self {
        Self(30 * 60)
    }

    pub fn duration(self) -> chrono::Duration {
        chrono::Duration::seconds(self.0)
    }
}
