//! sea-orm entities for the trust service.

pub mod devices;
pub mod outbox_events;
pub mod sessions;
pub mod step_up_codes;
