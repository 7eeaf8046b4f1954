//! Storage error type shared by the guard, repositories and bulk pipelines

/// Database operation errors
#[derive(Debug, thiserror::Error)]
pub enum DbError {
    #[error("database error: {0}")]
    Sqlx(#[from] sqlx::Error),

    #[error("not found: {resource} '{id}'")]
    NotFound { resource: &'static str, id: String },

    /// The unit of work ran past its deadline and was rolled back.
    #[error("unit of work exceeded its deadline")]
    DeadlineExceeded,

    /// The consumer of a streaming unit of work went away.
    #[error("unit of work cancelled by caller")]
    Cancelled,

    #[error("csv encoding error: {0}")]
    Csv(#[from] csv::Error),
}

impl DbError {
    /// Failure raised by the engine for one statement (constraint, cast,
    /// foreign key) as opposed to connectivity or protocol trouble.
    pub fn is_statement_failure(&self) -> bool {
        matches!(self, DbError::Sqlx(sqlx::Error::Database(_)))
    }

    /// Input field behind a violated reference constraint.
    pub fn dangling_reference(&self) -> Option<&'static str> {
        match self {
            DbError::Sqlx(sqlx::Error::Database(db)) => match db.constraint() {
                Some("opportunities_account_fk") => Some("account_id"),
                _ => None,
            },
            _ => None,
        }
    }

    /// Human readable reason without the `database error:` prefix.
    ///
    /// Known constraint names are translated to the column they guard.
    pub fn reason(&self) -> String {
        if let Some(field) = self.dangling_reference() {
            return format!("{field} does not exist");
        }
        match self {
            DbError::Sqlx(sqlx::Error::Database(db)) => match db.constraint() {
                Some(other) => format!("violates {other}"),
                None => db.message().to_owned(),
            },
            other => other.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn not_found_display() {
        let err = DbError::NotFound {
            resource: "opportunity",
            id: "abc".into(),
        };
        assert_eq!(err.to_string(), "not found: opportunity 'abc'");
        assert!(!err.is_statement_failure());
    }

    #[test]
    fn pool_trouble_is_not_a_statement_failure() {
        assert!(!DbError::Sqlx(sqlx::Error::PoolTimedOut).is_statement_failure());
        assert!(!DbError::DeadlineExceeded.is_statement_failure());
    }
}
