//! ExpertBot chat flow on top of the session controller and the backend
//! client.

pub mod dispatcher;

pub use dispatcher::{
    ChatDispatcher, DispatchOutcome, DispatchStep, PendingQuery, QueryKind, DISAMBIGUATION_PROMPT,
    NO_ENHANCED_RESPONSE, NO_RESPONSE, QUERY_FAILED, SELECTION_FAILED,
};
