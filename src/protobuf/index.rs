//! protobuf::index
//!
//! Message index paths: the position of a message type within its file's
//! tree of message declarations.

use prost_reflect::{FileDescriptor, MessageDescriptor};

/// Zero-based positions of a message type among its siblings, outermost
/// first.
///
/// `[1, 0]` is the first message nested in the file's second top-level
/// message.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct MessageIndexPath(Vec<i32>);

impl MessageIndexPath {
    /// Create a path from explicit positions.
    pub fn new(indexes: Vec<i32>) -> Self {
        Self(indexes)
    }

    /// Positions, outermost first.
    pub fn as_slice(&self) -> &[i32] {
        &self.0
    }

    /// Nesting depth of the located message.
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Check whether the path locates nothing.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Find the message this path locates in `file`.
    pub fn resolve(&self, file: &FileDescriptor) -> Option<MessageDescriptor> {
        let (&first, rest) = self.0.split_first()?;
        let mut current = file.messages().nth(usize::try_from(first).ok()?)?;
        for &index in rest {
            let next = current.child_messages().nth(usize::try_from(index).ok()?)?;
            current = next;
        }
        Some(current)
    }
}

impl From<Vec<i32>> for MessageIndexPath {
    fn from(indexes: Vec<i32>) -> Self {
        Self(indexes)
    }
}

/// Compute the index path of the message named `full_name` in `file`.
///
/// Each dot-separated component is matched by short name against the
/// current sibling list; a match records its position and descends into
/// that message's nested types. Components that match nothing, such as
/// package segments, leave the path unchanged.
pub fn message_index_path(file: &FileDescriptor, full_name: &str) -> MessageIndexPath {
    let mut path = Vec::new();
    let mut siblings: Vec<MessageDescriptor> = file.messages().collect();

    for part in full_name.split('.') {
        if let Some(position) = siblings.iter().position(|m| m.name() == part) {
            path.push(position as i32);
            siblings = siblings[position].child_messages().collect();
        }
    }

    MessageIndexPath(path)
}
