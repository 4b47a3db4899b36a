//! Statement classification by leading keyword.

/// What kind of statement a SQL string is, judged by its first keyword.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatementKind {
    Select,
    Show,
    Insert,
    Update,
    Delete,
    Other,
}

impl StatementKind {
    pub fn detect(sql: &str) -> Self {
        let keyword = sql
            .trim_start_matches(|c: char| c.is_whitespace() || c == '(')
            .split(|c: char| !c.is_ascii_alphabetic())
            .next()
            .unwrap_or_default()
            .to_ascii_uppercase();
        match keyword.as_str() {
            "SELECT" | "WITH" | "VALUES" | "TABLE" => Self::Select,
            "SHOW" | "EXPLAIN" | "DESCRIBE" | "DESC" => Self::Show,
            "INSERT" => Self::Insert,
            "UPDATE" => Self::Update,
            "DELETE" => Self::Delete,
            _ => Self::Other,
        }
    }

    /// Whether the statement produces a result set.
    pub fn returns_rows(self) -> bool {
        matches!(self, Self::Select | Self::Show)
    }

    /// Only row-returning reads are eligible for the result cache.
    pub fn is_cacheable(self) -> bool {
        self.returns_rows()
    }

    pub fn is_mutation(self) -> bool {
        matches!(self, Self::Insert | Self::Update | Self::Delete)
    }
}
