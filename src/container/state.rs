/// Per-container lifecycle state. Transitions: IDLE→READY on data ready;
/// READY→PROCESSING on acquire; PROCESSING→PROCESSED on success or
/// PROCESSING→ERROR on failure; PROCESSED→READY on new input; any→
/// NEEDS_REMOVAL on teardown.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ProcessingState {
    Idle,
    Ready,
    Processing,
    Processed,
    NeedsRemoval,
    Error,
}

impl ProcessingState {
    /// Whether the transition `self -> next` is one of the legal edges
    /// listed above. Used by `update_processing_state` to keep the state
    /// machine honest.
    pub fn can_transition_to(self, next: ProcessingState) -> bool {
        use ProcessingState::*;
        match (self, next) {
            (_, NeedsRemoval) => true,
            (Idle, Ready) => true,
            (Ready, Processing) => true,
            (Processing, Processed) | (Processing, Error) => true,
            (Processed, Ready) => true,
            (Error, Ready) => true,
            (a, b) if a == b => true,
            _ => false,
        }
    }
}

pub type StateChangeCallback = std::sync::Arc<dyn Fn(ProcessingState, ProcessingState) + Send + Sync>;
