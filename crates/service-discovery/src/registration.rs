//! Service registration handles
//!
//! Registering a service yields a handle controlling its lifetime: it can be
//! closed (terminal), temporarily deactivated, re-activated indefinitely, or
//! activated for a bounded duration. Handles from several backends can be
//! aggregated and controlled as one.

use std::time::{Duration, SystemTime};

/// A handle to a service registration.
pub trait ServiceRegistration: Send + Sync {
    /// Close and remove this registration immediately. Terminal.
    fn close(&self);

    /// Invalidate this registration immediately (possibly temporarily).
    fn deactivate(&self);

    /// Re-activate this registration immediately and indefinitely.
    fn activate(&self);

    /// Activate this registration for the given duration. A zero duration
    /// is a no-op.
    fn activate_for(&self, duration: Duration);

    /// Activate this registration until the given deadline. A deadline in
    /// the past is a no-op.
    fn activate_until(&self, deadline: SystemTime) {
        if let Ok(duration) = deadline.duration_since(SystemTime::now()) {
            self.activate_for(duration);
        }
    }
}

struct EmptyRegistration;

impl ServiceRegistration for EmptyRegistration {
    fn close(&self) {}
    fn deactivate(&self) {}
    fn activate(&self) {}
    fn activate_for(&self, _duration: Duration) {}
}

/// The registration handle that has no effect.
pub fn empty_registration() -> Box<dyn ServiceRegistration> {
    Box::new(EmptyRegistration)
}

struct AggregateRegistration {
    registrations: Vec<Box<dyn ServiceRegistration>>,
}

impl ServiceRegistration for AggregateRegistration {
    fn close(&self) {
        for registration in &self.registrations {
            registration.close();
        }
    }

    fn deactivate(&self) {
        for registration in &self.registrations {
            registration.deactivate();
        }
    }

    fn activate(&self) {
        for registration in &self.registrations {
            registration.activate();
        }
    }

    fn activate_for(&self, duration: Duration) {
        // share one absolute deadline so the children expire together
        match SystemTime::now().checked_add(duration) {
            Some(deadline) => self.activate_until(deadline),
            // past the representable window the activation degrades to indefinite
            None => self.activate(),
        }
    }

    fn activate_until(&self, deadline: SystemTime) {
        for registration in &self.registrations {
            registration.activate_until(deadline);
        }
    }
}

/// Create an aggregate of registrations which are all controlled as one.
pub fn aggregate(registrations: Vec<Box<dyn ServiceRegistration>>) -> Box<dyn ServiceRegistration> {
    Box::new(AggregateRegistration { registrations })
}
