//! Persisted client state.
//!
//! The session token is obtained outside this crate (the backend's login
//! redirect) and handed in by the user; it is stored next to the config
//! together with the employee id and language preference.

pub mod state;

pub use state::{ClientState, StateData, STATE_FILE};
