//! Serialized state bridge from the server render to client bootstrap.
//!
//! The server captures `{descriptors, variables, records}` after rendering
//! and embeds it in the document. At bootstrap the client writes it into the
//! `HydrationSlot`, and the first mount takes it out again and rehydrates its
//! environment, so the initial render is served from the store.

use std::collections::BTreeMap;
use std::fmt;
use std::sync::Mutex;

use edge_core::Variables;
use edge_data::{FetchPolicy, PreloadedQueries, QuerySet, RecordSnapshot, SharedEnvironment};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::context::ServerContext;
use crate::error::BridgeError;

/// Id of the script element holding the serialized state.
pub const STATE_SCRIPT_ID: &str = "__EDGE_PRELOAD_STATE__";

/// Variables in serialized state: per slot, or one set shared by every slot.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum StateVariables {
    /// `{slot: {param: value}}`.
    PerQuery(BTreeMap<String, Variables>),
    /// `{param: value}`, the single-descriptor form.
    Shared(Variables),
}

/// JSON-safe snapshot handed from the server render to the client.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SerializedState {
    /// Descriptor slots of the page.
    pub descriptors: QuerySet,
    /// Variables the server loaded with.
    pub variables: StateVariables,
    /// Exported record cache of the server environment.
    pub records: RecordSnapshot,
}

impl SerializedState {
    /// Capture the state of a flushed server context.
    pub fn capture(context: &ServerContext) -> Self {
        Self {
            descriptors: context.descriptors.clone(),
            variables: StateVariables::PerQuery(context.variables.clone().into_inner()),
            records: context.environment.export_records(),
        }
    }

    /// Variables for one slot.
    ///
    /// A `PerQuery` map that names none of the slots is the shared form whose
    /// parameters all happen to be objects, and is read as such.
    pub fn variables_for(&self, slot: &str) -> Variables {
        match &self.variables {
            StateVariables::Shared(vars) => vars.clone(),
            StateVariables::PerQuery(map) => match map.get(slot) {
                Some(vars) => vars.clone(),
                None if self.descriptors.names().any(|n| map.contains_key(n)) => Variables::new(),
                None => map
                    .iter()
                    .map(|(k, v)| (k.clone(), Value::Object(v.clone().into_iter().collect())))
                    .collect(),
            },
        }
    }

    /// Serialize to JSON.
    pub fn to_json(&self) -> Result<String, BridgeError> {
        serde_json::to_string(self).map_err(BridgeError::Serialize)
    }

    /// Parse from JSON.
    pub fn from_json(json: &str) -> Result<Self, BridgeError> {
        serde_json::from_str(json).map_err(BridgeError::Deserialize)
    }

    /// Render the state as an inline JSON script element.
    pub fn to_script_tag(&self) -> Result<String, BridgeError> {
        let json = escape_script_json(&self.to_json()?);
        Ok(format!(
            "<script type=\"application/json\" id=\"{}\">{}</script>",
            STATE_SCRIPT_ID, json
        ))
    }
}

/// Escape JSON for embedding inside a `<script>` element.
fn escape_script_json(json: &str) -> String {
    json.replace('<', "\\u003c")
        .replace('>', "\\u003e")
        .replace('&', "\\u0026")
        .replace('\u{2028}', "\\u2028")
        .replace('\u{2029}', "\\u2029")
}

/// Lifecycle of the hydration slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SlotPhase {
    /// Nothing written yet.
    Uninitialized,
    /// State written, waiting for the client.
    Written,
    /// The client took the state.
    Consumed,
    /// Closed without being consumed.
    Discarded,
}

impl fmt::Display for SlotPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Uninitialized => "uninitialized",
            Self::Written => "written",
            Self::Consumed => "consumed",
            Self::Discarded => "discarded",
        };
        f.write_str(name)
    }
}

enum SlotState {
    Uninitialized,
    Written(Box<SerializedState>),
    Consumed,
    Discarded,
}

impl SlotState {
    fn phase(&self) -> SlotPhase {
        match self {
            Self::Uninitialized => SlotPhase::Uninitialized,
            Self::Written(_) => SlotPhase::Written,
            Self::Consumed => SlotPhase::Consumed,
            Self::Discarded => SlotPhase::Discarded,
        }
    }
}

/// Write-once, read-at-most-once slot for serialized state.
///
/// `Uninitialized -> Written -> Consumed`, or `-> Discarded` from any phase.
/// Reads before the write are absent and leave the slot writable.
pub struct HydrationSlot {
    state: Mutex<SlotState>,
}

impl HydrationSlot {
    /// Create an uninitialized slot.
    pub const fn new() -> Self {
        Self {
            state: Mutex::new(SlotState::Uninitialized),
        }
    }

    /// The process-wide slot.
    pub fn global() -> &'static HydrationSlot {
        static GLOBAL: HydrationSlot = HydrationSlot::new();
        &GLOBAL
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, SlotState> {
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Current phase.
    pub fn phase(&self) -> SlotPhase {
        self.lock().phase()
    }

    /// Store the state. Fails unless the slot is uninitialized.
    pub fn write(&self, state: SerializedState) -> Result<(), BridgeError> {
        let mut slot = self.lock();
        match &*slot {
            SlotState::Uninitialized => {
                tracing::info!(
                    descriptors = state.descriptors.len(),
                    records = state.records.len(),
                    "hydration state written"
                );
                *slot = SlotState::Written(Box::new(state));
                Ok(())
            }
            other => {
                let phase = other.phase();
                tracing::warn!(phase = %phase, "rejected second hydration state write");
                Err(BridgeError::AlreadyWritten(phase))
            }
        }
    }

    /// Take the state. Returns it at most once.
    pub fn take(&self) -> Option<SerializedState> {
        let mut slot = self.lock();
        match std::mem::replace(&mut *slot, SlotState::Consumed) {
            SlotState::Written(state) => {
                tracing::info!("hydration state consumed");
                Some(*state)
            }
            previous => {
                *slot = previous;
                None
            }
        }
    }

    /// Close the slot, dropping any unconsumed state.
    pub fn discard(&self) {
        *self.lock() = SlotState::Discarded;
    }
}

impl Default for HydrationSlot {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for HydrationSlot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HydrationSlot")
            .field("phase", &self.phase())
            .finish()
    }
}

/// Rehydrate the client environment from `state` and load every slot with a
/// store-preferring policy.
///
/// When the imported records satisfy a slot, its handle has no source and is
/// ready without a network round trip.
pub fn resolve_on_client(
    state: &SerializedState,
    create_client_environment: impl FnOnce() -> SharedEnvironment,
) -> PreloadedQueries {
    let environment = create_client_environment();
    environment.import_records(state.records.clone());

    let queries: PreloadedQueries = state
        .descriptors
        .iter()
        .map(|(slot, descriptor)| {
            let variables = state.variables_for(slot);
            let query = environment.load_query(descriptor, &variables, FetchPolicy::StoreOrNetwork);
            (slot.to_string(), query)
        })
        .collect();

    tracing::debug!(
        queries = queries.len(),
        from_store = queries.values().filter(|q| q.source().is_none()).count(),
        "resolved hydration state on client"
    );
    queries
}
