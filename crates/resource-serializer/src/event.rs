//! Write events and event sinks.
//!
//! The encoder produces a flat sequence of [`WriteEvent`]s describing a
//! nested payload. Frames (resource, deleted resource, nested info, resource
//! set) are opened and closed explicitly and never interleave.

use async_trait::async_trait;
use futures::channel::mpsc;
use futures::SinkExt;
use serde::Serialize;

use crate::error::SerializeError;
use crate::model::{DeletedReason, PrimitiveValue, StreamReference};

/// A property value as written to the wire.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub enum WireValue {
    Null,
    Primitive(PrimitiveValue),
    /// Enum member; `type_name` is absent when the value degraded to a bare name.
    Enum {
        type_name: Option<String>,
        member: String,
    },
    Collection {
        type_name: Option<String>,
        items: Vec<WireValue>,
    },
    Stream(StreamReference),
}

/// How the transport should annotate the runtime type of a resource.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub enum TypeAnnotation {
    /// No explicit annotation; the transport applies its default.
    TransportDefault,
    /// Write this type name explicitly.
    Explicit(String),
    /// Explicitly suppress any type annotation.
    Suppressed,
}

/// An advertised bound action or function.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct OperationLink {
    /// `#Namespace.Name`.
    pub metadata: String,
    pub title: Option<String>,
    pub target: Option<String>,
}

/// Header of a resource frame.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ResourceHeader {
    /// Resolved runtime type name, `Edm.Untyped` for schema-less resources.
    pub type_name: String,
    pub id: Option<String>,
    pub edit_link: Option<String>,
    pub read_link: Option<String>,
    pub etag: Option<String>,
    pub type_annotation: TypeAnnotation,
    pub actions: Vec<OperationLink>,
    pub functions: Vec<OperationLink>,
}

impl ResourceHeader {
    /// Creates a header with no links and a transport-default annotation.
    pub fn new(type_name: impl Into<String>) -> Self {
        Self {
            type_name: type_name.into(),
            id: None,
            edit_link: None,
            read_link: None,
            etag: None,
            type_annotation: TypeAnnotation::TransportDefault,
            actions: Vec::new(),
            functions: Vec::new(),
        }
    }
}

/// Header of a deleted-resource frame.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DeletedResourceHeader {
    pub id: String,
    pub reason: DeletedReason,
    pub type_name: Option<String>,
}

/// Header of a nested-info frame.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NestedInfo {
    pub name: String,
    pub is_collection: bool,
    pub url: Option<String>,
}

/// Header of a resource-set frame.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ResourceSetHeader {
    pub type_name: Option<String>,
    pub count: Option<u64>,
}

/// A single write event.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum WriteEvent {
    StartResource(ResourceHeader),
    Property { name: String, value: WireValue },
    StartNestedInfo(NestedInfo),
    EndNestedInfo,
    StartResourceSet(ResourceSetHeader),
    EndResourceSet,
    EndResource,
    EntityReferenceLink { url: String },
    StartDeletedResource(DeletedResourceHeader),
    /// A null single-valued nested value. A leaf, not a frame.
    NullResource,
}

impl WriteEvent {
    /// Returns true for events that open a frame.
    pub fn is_start(&self) -> bool {
        matches!(
            self,
            WriteEvent::StartResource(_)
                | WriteEvent::StartDeletedResource(_)
                | WriteEvent::StartNestedInfo(_)
                | WriteEvent::StartResourceSet(_)
        )
    }

    /// Returns true for events that close a frame.
    pub fn is_end(&self) -> bool {
        matches!(
            self,
            WriteEvent::EndResource | WriteEvent::EndNestedInfo | WriteEvent::EndResourceSet
        )
    }
}

/// Consumer of write events.
///
/// Each write is awaited before the next event is produced, so a bounded
/// sink applies backpressure to the encoder.
#[async_trait(?Send)]
pub trait EventSink {
    async fn write_event(&mut self, event: WriteEvent) -> Result<(), SerializeError>;
}

/// Sink that records every event in memory.
#[derive(Debug, Clone, Default)]
pub struct RecordingSink {
    events: Vec<WriteEvent>,
}

impl RecordingSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn events(&self) -> &[WriteEvent] {
        &self.events
    }

    pub fn into_events(self) -> Vec<WriteEvent> {
        self.events
    }
}

#[async_trait(?Send)]
impl EventSink for RecordingSink {
    async fn write_event(&mut self, event: WriteEvent) -> Result<(), SerializeError> {
        self.events.push(event);
        Ok(())
    }
}

#[async_trait(?Send)]
impl EventSink for mpsc::Sender<WriteEvent> {
    async fn write_event(&mut self, event: WriteEvent) -> Result<(), SerializeError> {
        self.send(event)
            .await
            .map_err(|e| SerializeError::Sink(e.to_string()))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Frame {
    Resource,
    NestedInfo,
    ResourceSet,
}

/// Verifies that a recorded event sequence is well formed.
///
/// Every start has exactly one matching end, properties only appear directly
/// inside a resource, and nothing remains open at the end.
pub fn check_frames(events: &[WriteEvent]) -> Result<(), SerializeError> {
    let mut stack: Vec<Frame> = Vec::new();
    let unbalanced = |position: usize, detail: &str| SerializeError::UnbalancedFrame {
        position,
        detail: detail.to_string(),
    };

    for (position, event) in events.iter().enumerate() {
        match event {
            WriteEvent::StartResource(_) | WriteEvent::StartDeletedResource(_) => {
                if stack.last() == Some(&Frame::Resource) {
                    return Err(unbalanced(position, "resource directly inside a resource"));
                }
                stack.push(Frame::Resource);
            }
            WriteEvent::StartNestedInfo(_) => {
                if stack.last() != Some(&Frame::Resource) {
                    return Err(unbalanced(position, "nested info outside a resource"));
                }
                stack.push(Frame::NestedInfo);
            }
            WriteEvent::StartResourceSet(_) => {
                if stack.last() == Some(&Frame::Resource) {
                    return Err(unbalanced(position, "resource set directly inside a resource"));
                }
                stack.push(Frame::ResourceSet);
            }
            WriteEvent::Property { .. } => {
                if stack.last() != Some(&Frame::Resource) {
                    return Err(unbalanced(position, "property outside a resource"));
                }
            }
            WriteEvent::NullResource | WriteEvent::EntityReferenceLink { .. } => {
                if stack.last() == Some(&Frame::Resource) {
                    return Err(unbalanced(position, "leaf directly inside a resource"));
                }
            }
            WriteEvent::EndResource => {
                if stack.pop() != Some(Frame::Resource) {
                    return Err(unbalanced(position, "end resource without matching start"));
                }
            }
            WriteEvent::EndNestedInfo => {
                if stack.pop() != Some(Frame::NestedInfo) {
                    return Err(unbalanced(position, "end nested info without matching start"));
                }
            }
            WriteEvent::EndResourceSet => {
                if stack.pop() != Some(Frame::ResourceSet) {
                    return Err(unbalanced(position, "end resource set without matching start"));
                }
            }
        }
    }

    if stack.is_empty() {
        Ok(())
    } else {
        Err(unbalanced(events.len(), "frames left open"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures::executor::block_on;
    use futures::StreamExt;

    fn nested(name: &str) -> WriteEvent {
        WriteEvent::StartNestedInfo(NestedInfo {
            name: name.to_string(),
            is_collection: false,
            url: None,
        })
    }

    #[test]
    fn test_balanced_sequence() {
        let events = vec![
            WriteEvent::StartResource(ResourceHeader::new("Sales.Customer")),
            WriteEvent::Property {
                name: "Id".into(),
                value: WireValue::Primitive(PrimitiveValue::Int32(1)),
            },
            nested("Manager"),
            WriteEvent::NullResource,
            WriteEvent::EndNestedInfo,
            WriteEvent::EndResource,
        ];
        assert_eq!(check_frames(&events), Ok(()));
    }

    #[test]
    fn test_unbalanced_sequences() {
        let open = vec![WriteEvent::StartResource(ResourceHeader::new("Sales.Customer"))];
        assert!(matches!(
            check_frames(&open),
            Err(SerializeError::UnbalancedFrame { position: 1, .. })
        ));

        let crossed = vec![
            WriteEvent::StartResource(ResourceHeader::new("Sales.Customer")),
            nested("Orders"),
            WriteEvent::EndResource,
        ];
        assert!(matches!(
            check_frames(&crossed),
            Err(SerializeError::UnbalancedFrame { position: 2, .. })
        ));

        let stray = vec![WriteEvent::Property {
            name: "Id".into(),
            value: WireValue::Null,
        }];
        assert!(check_frames(&stray).is_err());
    }

    #[test]
    fn test_recording_sink() {
        let mut sink = RecordingSink::new();
        block_on(sink.write_event(WriteEvent::EndResource)).unwrap();
        assert_eq!(sink.events(), &[WriteEvent::EndResource]);
    }

    #[test]
    fn test_channel_sink() {
        let (mut tx, rx) = mpsc::channel(4);
        block_on(async {
            tx.write_event(WriteEvent::NullResource).await.unwrap();
            drop(tx);
            let received: Vec<WriteEvent> = rx.collect().await;
            assert_eq!(received, vec![WriteEvent::NullResource]);
        });
    }

    #[test]
    fn test_closed_channel_is_transport_error() {
        let (mut tx, rx) = mpsc::channel::<WriteEvent>(1);
        drop(rx);
        let err = block_on(tx.write_event(WriteEvent::EndResource)).unwrap_err();
        assert_eq!(err.code(), crate::error::ErrorCode::Transport);
    }
}
