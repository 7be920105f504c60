/// The result of an idempotent insert. Duplicate inserts report the id of the row that already exists.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InsertResult {
    Inserted(i64),
    AlreadyExists(i64),
}

impl InsertResult {
    pub fn id(&self) -> i64 {
        match self {
            InsertResult::Inserted(id) | InsertResult::AlreadyExists(id) => *id,
        }
    }

    pub fn is_inserted(&self) -> bool {
        matches!(self, InsertResult::Inserted(_))
    }
}
