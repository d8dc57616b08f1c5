//! Hidden payloads riding on host props.
//!
//! Host props get cloned, spread, logged, and serialized by code that knows
//! nothing about preloading. A `ContextCarrier` keeps its payload in a private
//! slot keyed by channel identity: cloning shares the payload, and `Debug`
//! and `Serialize` see nothing. Only the channel that attached a payload can
//! read it back.

use std::any::{Any, TypeId};
use std::fmt;
use std::marker::PhantomData;
use std::sync::Arc;

use serde::de::IgnoredAny;
use serde::ser::SerializeMap;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct ChannelKey {
    payload: TypeId,
    name: &'static str,
}

#[derive(Clone)]
struct HiddenSlot {
    key: ChannelKey,
    payload: Arc<dyn Any + Send + Sync>,
}

/// Host-visible value carrying a hidden payload.
///
/// Serializes as an empty map and deserializes as an empty carrier, so a
/// payload never leaks into, or comes back from, serialized props.
#[derive(Clone, Default)]
pub struct ContextCarrier {
    slot: Option<HiddenSlot>,
}

impl ContextCarrier {
    /// A carrier with no payload.
    pub fn empty() -> Self {
        Self::default()
    }

    /// Whether no payload is attached.
    pub fn is_empty(&self) -> bool {
        self.slot.is_none()
    }
}

impl fmt::Debug for ContextCarrier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("ContextCarrier")
    }
}

impl Serialize for ContextCarrier {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_map(Some(0))?.end()
    }
}

impl<'de> Deserialize<'de> for ContextCarrier {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        IgnoredAny::deserialize(deserializer)?;
        Ok(Self::empty())
    }
}

/// Typed channel attaching and reading one kind of payload.
pub struct ContextChannel<T> {
    name: &'static str,
    _payload: PhantomData<fn() -> T>,
}

impl<T: Any + Send + Sync> ContextChannel<T> {
    /// Create a channel. Channels with the same payload type and name are
    /// the same channel.
    pub const fn new(name: &'static str) -> Self {
        Self {
            name,
            _payload: PhantomData,
        }
    }

    fn key(&self) -> ChannelKey {
        ChannelKey {
            payload: TypeId::of::<T>(),
            name: self.name,
        }
    }

    /// Produce a fresh carrier whose only content is `payload`.
    pub fn attach(&self, payload: T) -> ContextCarrier {
        ContextCarrier {
            slot: Some(HiddenSlot {
                key: self.key(),
                payload: Arc::new(payload),
            }),
        }
    }

    /// Read the payload back. Absent for `None`, empty carriers, and
    /// carriers produced by another channel.
    pub fn read(&self, carrier: Option<&ContextCarrier>) -> Option<Arc<T>> {
        let slot = carrier?.slot.as_ref()?;
        if slot.key != self.key() {
            return None;
        }
        slot.payload.clone().downcast::<T>().ok()
    }
}

impl<T> fmt::Debug for ContextChannel<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ContextChannel")
            .field("name", &self.name)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[derive(Debug, Clone, PartialEq)]
    struct Payload {
        ids: Vec<u32>,
    }

    static CHANNEL: ContextChannel<Payload> = ContextChannel::new("test-payload");

    // === Round Trip Tests ===

    #[test]
    fn test_read_returns_attached_payload() {
        let payload = Payload { ids: vec![1, 2, 3] };
        let carrier = CHANNEL.attach(payload.clone());

        assert_eq!(*CHANNEL.read(Some(&carrier)).unwrap(), payload);
    }

    #[test]
    fn test_clone_shares_payload() {
        let carrier = CHANNEL.attach(Payload { ids: vec![9] });
        let cloned = carrier.clone();

        let a = CHANNEL.read(Some(&carrier)).unwrap();
        let b = CHANNEL.read(Some(&cloned)).unwrap();
        assert!(Arc::ptr_eq(&a, &b));
    }

    // === Isolation Tests ===

    #[test]
    fn test_carrier_serializes_as_empty_map() {
        let carrier = CHANNEL.attach(Payload { ids: vec![1] });

        assert_eq!(serde_json::to_value(&carrier).unwrap(), json!({}));
        assert_eq!(format!("{:?}", carrier), "ContextCarrier");
    }

    #[test]
    fn test_deserialized_carrier_is_empty() {
        let carrier: ContextCarrier = serde_json::from_value(json!({"ids": [1]})).unwrap();

        assert!(carrier.is_empty());
        assert!(CHANNEL.read(Some(&carrier)).is_none());
    }

    #[test]
    fn test_other_channel_cannot_read() {
        let other: ContextChannel<Payload> = ContextChannel::new("other");
        let different_type: ContextChannel<String> = ContextChannel::new("test-payload");
        let carrier = CHANNEL.attach(Payload { ids: vec![] });

        assert!(other.read(Some(&carrier)).is_none());
        assert!(different_type.read(Some(&carrier)).is_none());
    }

    // === Absent Carrier Tests ===

    #[test]
    fn test_absent_carrier_reads_none() {
        assert!(CHANNEL.read(None).is_none());
        assert!(CHANNEL.read(Some(&ContextCarrier::empty())).is_none());
    }
}
