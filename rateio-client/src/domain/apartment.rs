#[derive(Debug, Clone, PartialEq, Eq, sqlx::FromRow)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Apartment {
    pub id: i64,
    pub block: String,
    pub number: i32,
}

impl Apartment {
    /// Apartment number as printed on reports and entry prompts (`7` -> `007`).
    pub fn formatted_number(&self) -> String {
        format!("{:03}", self.number)
    }

    pub fn is(&self, block: &str, number: i32) -> bool {
        self.block == block && self.number == number
    }
}
