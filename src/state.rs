//! Per-nesting-level progress markers for resumable reads and writes.
//!
//! A [`ReadStack`] owns one [`ReadFrame`] per nesting level. When a read
//! suspends, every frame from the root down to the suspended value is kept;
//! the next invocation pushes the same levels again and picks up the existing
//! frames instead of fresh ones. Writes use [`WriteStack`] the same way.

use crate::references::{ReadReferences, WriteReferences};
use std::any::Any;

/// How far construction of the current object has progressed.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord)]
pub enum ObjectState {
    #[default]
    None,
    StartTokenSeen,
    MetadataRead,
    ObjectCreated,
}

/// How far the current key/value pair has progressed.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord)]
pub enum PropertyState {
    #[default]
    None,
    NameRead,
    NameResolved,
    ValueAdvanced,
    ValueRead,
}

/// Guard against dispatching a polymorphic read twice.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum PolymorphicState {
    #[default]
    None,
    ReEntryStarted,
    ReEntrySuspended,
}

bitflags::bitflags! {
    /// Metadata properties seen on the current object.
    #[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
    pub struct MetadataFlags: u8 {
        /// `$id`
        const ID = 1 << 0;
        /// `$ref`
        const REF = 1 << 1;
        /// `$type`
        const TYPE = 1 << 2;
    }
}

/// Resumable progress of reading one value.
#[derive(Debug, Default)]
pub struct ReadFrame {
    pub object_state: ObjectState,
    pub property_state: PropertyState,
    /// Decoded key waiting for its value.
    pub pending_key: Option<Box<dyn Any>>,
    /// The current property is out-of-order metadata whose value is skipped.
    pub skip_pending: bool,
    /// Unescaped name of the current property, for error paths.
    pub property_name: Option<String>,
    pub metadata: MetadataFlags,
    /// Metadata property whose value has not been read yet.
    pub metadata_property: Option<MetadataFlags>,
    pub metadata_id: Option<String>,
    pub reference_id: Option<String>,
    pub type_discriminator: Option<String>,
    pub polymorphic: PolymorphicState,
    /// Converter a polymorphic read was delegated to.
    pub delegate: Option<Box<dyn Any>>,
    /// Staging container under construction.
    pub return_value: Option<Box<dyn Any>>,
}

impl ReadFrame {
    /// Clears pair-scoped state once a key/value pair is complete.
    pub fn end_property(&mut self) {
        self.property_state = PropertyState::None;
        self.pending_key = None;
        self.skip_pending = false;
        self.property_name = None;
    }
}

/// The frames of one logical read.
#[derive(Debug, Default)]
pub struct ReadStack {
    frames: Vec<ReadFrame>,
    depth: usize,
    /// Whether converters may suspend and be re-entered later.
    pub supports_continuation: bool,
    pub references: ReadReferences,
}

impl ReadStack {
    #[must_use]
    pub fn new(supports_continuation: bool) -> Self {
        ReadStack {
            supports_continuation,
            ..Default::default()
        }
    }

    /// Number of active frames.
    #[must_use]
    pub fn depth(&self) -> usize {
        self.depth
    }

    /// Enters the next nesting level, resuming a frame kept by an earlier
    /// suspension if there is one.
    pub fn push(&mut self) {
        if self.depth == self.frames.len() {
            self.frames.push(ReadFrame::default());
        }
        self.depth += 1;
    }

    /// Leaves the current nesting level. A completed level is discarded; an
    /// incomplete one is kept for the next invocation.
    pub fn pop(&mut self, completed: bool) {
        self.depth = self.depth.saturating_sub(1);
        if completed {
            self.frames.truncate(self.depth);
        }
    }

    /// Returns `true` if the current level was pushed back after a suspension.
    #[must_use]
    pub fn is_resuming(&self) -> bool {
        self.frames.len() > self.depth
    }

    /// The current frame. Converters are always called with one pushed.
    pub fn current(&self) -> &ReadFrame {
        &self.frames[self.depth - 1]
    }

    pub fn current_mut(&mut self) -> &mut ReadFrame {
        &mut self.frames[self.depth - 1]
    }

    /// JSON path of the property being read, such as `$.outer.inner`.
    #[must_use]
    pub fn path(&self) -> String {
        render_path(self.frames[..self.depth].iter().map(|f| f.property_name.as_deref()))
    }
}

/// Resumable progress of writing one value.
#[derive(Debug, Default)]
pub struct WriteFrame {
    pub wrote_start: bool,
    pub wrote_end: bool,
    /// Index of the next pair to write.
    pub index: usize,
    /// The property name of pair `index` is already written.
    pub wrote_name: bool,
    pub property_name: Option<String>,
    /// Keys starting with `$` are written escaped, because the reader of this
    /// object treats `$`-names as metadata.
    pub escape_metadata_names: bool,
    /// Converter a polymorphic write was delegated to.
    pub delegate: Option<Box<dyn Any>>,
}

/// The frames of one logical write.
#[derive(Debug, Default)]
pub struct WriteStack {
    frames: Vec<WriteFrame>,
    depth: usize,
    pub supports_continuation: bool,
    /// Buffered output size at which a resumable write suspends.
    pub flush_threshold: usize,
    pub references: WriteReferences,
}

impl WriteStack {
    #[must_use]
    pub fn new(supports_continuation: bool, flush_threshold: usize) -> Self {
        WriteStack {
            supports_continuation,
            flush_threshold,
            ..Default::default()
        }
    }

    #[must_use]
    pub fn depth(&self) -> usize {
        self.depth
    }

    pub fn push(&mut self) {
        if self.depth == self.frames.len() {
            self.frames.push(WriteFrame::default());
        }
        self.depth += 1;
    }

    pub fn pop(&mut self, completed: bool) {
        self.depth = self.depth.saturating_sub(1);
        if completed {
            self.frames.truncate(self.depth);
        }
    }

    pub fn current(&self) -> &WriteFrame {
        &self.frames[self.depth - 1]
    }

    pub fn current_mut(&mut self) -> &mut WriteFrame {
        &mut self.frames[self.depth - 1]
    }

    #[must_use]
    pub fn path(&self) -> String {
        render_path(self.frames[..self.depth].iter().map(|f| f.property_name.as_deref()))
    }
}

fn render_path<'a>(names: impl Iterator<Item = Option<&'a str>>) -> String {
    let mut path = String::from("$");
    for name in names.flatten() {
        path.push('.');
        path.push_str(name);
    }
    path
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_suspended_frames_are_resumed() {
        let mut stack = ReadStack::new(true);
        stack.push();
        stack.current_mut().property_name = Some("outer".to_string());
        stack.push();
        stack.current_mut().object_state = ObjectState::StartTokenSeen;
        stack.current_mut().property_name = Some("inner".to_string());
        assert_eq!(stack.path(), "$.outer.inner");

        stack.pop(false);
        stack.pop(false);
        assert_eq!(stack.depth(), 0);

        stack.push();
        stack.push();
        assert_eq!(stack.current().object_state, ObjectState::StartTokenSeen);
    }

    #[test]
    fn test_completed_frames_are_discarded() {
        let mut stack = ReadStack::new(false);
        stack.push();
        stack.push();
        stack.current_mut().object_state = ObjectState::ObjectCreated;
        stack.pop(true);
        assert!(!stack.is_resuming());
        stack.push();
        assert_eq!(stack.current().object_state, ObjectState::None);
    }

    #[test]
    fn test_end_property_resets_pair_state() {
        let mut frame = ReadFrame {
            property_state: PropertyState::ValueAdvanced,
            pending_key: Some(Box::new("k".to_string())),
            skip_pending: true,
            object_state: ObjectState::ObjectCreated,
            ..Default::default()
        };
        frame.end_property();
        assert_eq!(frame.property_state, PropertyState::None);
        assert!(frame.pending_key.is_none());
        assert!(!frame.skip_pending);
        assert_eq!(frame.object_state, ObjectState::ObjectCreated);
    }

    #[test]
    fn test_state_ordering() {
        assert!(ObjectState::StartTokenSeen < ObjectState::ObjectCreated);
        assert!(PropertyState::NameResolved < PropertyState::ValueAdvanced);
        let flags = MetadataFlags::ID | MetadataFlags::TYPE;
        assert!(flags.contains(MetadataFlags::ID));
        assert!(!flags.contains(MetadataFlags::REF));
    }
}
