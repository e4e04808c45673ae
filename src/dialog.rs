//! Dialog stack execution model
//!
//! Dialogs are fixed lists of steps. A step returns a [`Directive`]; the
//! [`DialogEngine`] interprets it against a [`DialogStack`] that is persisted
//! between turns, so one logical procedure can span many inbound messages
//! with no in-memory continuation.

mod create_user;
mod directive;
mod domain_name;
mod engine;
mod options;
mod profile;
mod remove_user;
mod router;
mod slots;
mod stack;

#[cfg(test)]
mod proptests;

pub use engine::{DialogEngine, DialogSet, DialogSettings, EngineError, Services, StackStatus};
pub use options::DialogOptions;
pub use profile::UnknownFieldPolicy;
pub use stack::{DialogKind, DialogStack};

#[cfg(test)]
pub use stack::Frame;

/// User-facing texts, shared with tests
#[cfg(test)]
pub mod messages {
    pub use super::router::{
        ANOTHER_COMMAND, ASK_COMMAND, CAPABILITIES, LOGIN_FAILED, LOGIN_UNAVAILABLE, NOT_ENABLED,
        NOT_UNDERSTOOD, NO_LICENSES, NO_RECENT_MAIL,
    };
    pub use super::slots::{DEMO_NOTICE, NAME_EXAMPLE, NAME_INSTRUCTION};
}

use create_user::CreateUserDialog;
use domain_name::DomainNameDialog;
use remove_user::RemoveUserDialog;
use router::RouterDialog;
use std::sync::Arc;

impl DialogSet {
    /// The router plus every dialog it can delegate to
    pub fn standard() -> Self {
        DialogSet::new()
            .with(Arc::new(RouterDialog))
            .with(Arc::new(CreateUserDialog))
            .with(Arc::new(RemoveUserDialog))
            .with(Arc::new(DomainNameDialog))
    }
}
