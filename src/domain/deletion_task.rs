//! Deletion task model for the asynchronous deletion pipeline.

/// A batch of short codes a user asked to delete.
///
/// Created by the service when a delete request arrives, sent to the bounded
/// queue without waiting, and applied later by a
/// [`crate::domain::deletion_queue::DeletionQueue`] worker.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeletionTask {
    pub owner_id: String,
    pub short_codes: Vec<String>,
}

impl DeletionTask {
    pub fn new(owner_id: impl Into<String>, short_codes: Vec<String>) -> Self {
        Self {
            owner_id: owner_id.into(),
            short_codes,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_deletion_task_creation() {
        let task = DeletionTask::new("user-1", vec!["abc".to_string(), "def".to_string()]);

        assert_eq!(task.owner_id, "user-1");
        assert_eq!(task.short_codes, vec!["abc", "def"]);
    }
}
