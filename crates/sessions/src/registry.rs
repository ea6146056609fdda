//! Fixed-capacity session table (§4.1, §4.3). One readers/writer lock over
//! the slot table; each slot's `SessionRecord` owns its own locks.

use aura_domain::error::{Error, Result};
use aura_domain::transport::Transport;
use chrono::Utc;
use parking_lot::RwLock;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use crate::kind::{Capabilities, SatelliteIdentity, SessionKind, SessionTier};
use crate::record::{SessionHandle, SessionRecord};

pub const LOCAL_SESSION_ID: u64 = 0;

struct Inner {
    slots: HashMap<u64, SessionHandle>,
    max_sessions: usize,
}

pub struct SessionRegistry {
    inner: RwLock<Inner>,
    next_id: AtomicU64,
}

impl SessionRegistry {
    /// Creates the registry with slot 0 (LOCAL) already present, per the
    /// invariant that LOCAL is present for the manager's entire lifetime.
    pub fn new(max_sessions: usize) -> Self {
        let local = Arc::new(SessionRecord::new(LOCAL_SESSION_ID, SessionKind::Local, None, Utc::now()));
        let mut slots = HashMap::with_capacity(max_sessions);
        slots.insert(LOCAL_SESSION_ID, local);
        Self {
            inner: RwLock::new(Inner { slots, max_sessions }),
            next_id: AtomicU64::new(LOCAL_SESSION_ID + 1),
        }
    }

    pub fn get_local(&self) -> SessionHandle {
        self.inner.read().slots.get(&LOCAL_SESSION_ID).cloned().expect("LOCAL slot always present")
    }

    pub fn create(&self, kind: SessionKind, transport: Option<Arc<dyn Transport>>) -> Result<SessionHandle> {
        let record = {
            let mut inner = self.inner.write();
            if inner.slots.len() >= inner.max_sessions {
                return Err(Error::RegistryFull);
            }
            let id = self.next_id.fetch_add(1, Ordering::SeqCst);
            let record = Arc::new(SessionRecord::new(id, kind, transport, Utc::now()));
            inner.slots.insert(id, record.clone());
            record
        };
        aura_domain::trace::TraceEvent::SessionCreated {
            session_id: record.session_id,
            kind: record.kind.label().to_string(),
        }
        .emit();
        Ok(record)
    }

    /// Satellite connect: rebinds and retains an existing non-disconnected
    /// record sharing the UUID (reconnect path), or creates a new one.
    pub fn create_satellite(
        &self,
        transport: Arc<dyn Transport>,
        tier: SessionTier,
        identity: SatelliteIdentity,
        caps: Capabilities,
    ) -> Result<SessionHandle> {
        enum Outcome {
            Reclaimed(SessionHandle),
            Created(SessionHandle),
        }

        let outcome = {
            let mut inner = self.inner.write();

            if let Some(existing) = inner
                .slots
                .values()
                .find(|r| !r.is_disconnected() && r.kind.satellite_uuid() == Some(identity.uuid.as_str()))
            {
                existing.retain();
                existing.rebind_transport(transport);
                existing.touch();
                Outcome::Reclaimed(existing.clone())
            } else {
                if inner.slots.len() >= inner.max_sessions {
                    return Err(Error::RegistryFull);
                }
                let id = self.next_id.fetch_add(1, Ordering::SeqCst);
                let kind = SessionKind::Satellite { tier, identity, caps };
                let record = Arc::new(SessionRecord::new(id, kind, Some(transport), Utc::now()));
                inner.slots.insert(id, record.clone());
                Outcome::Created(record)
            }
        };

        match outcome {
            Outcome::Reclaimed(record) => {
                aura_domain::trace::TraceEvent::SessionReclaimed {
                    session_id: record.session_id,
                    kind: record.kind.label().to_string(),
                }
                .emit();
                Ok(record)
            }
            Outcome::Created(record) => {
                aura_domain::trace::TraceEvent::SessionCreated {
                    session_id: record.session_id,
                    kind: record.kind.label().to_string(),
                }
                .emit();
                Ok(record)
            }
        }
    }

    /// Legacy-network connect, keyed by client IP (§9: provisional —
    /// reclaim across NAT rebinds is not attempted; a new IP is a new
    /// session even if it is the same physical client).
    pub fn get_or_create_legacy(&self, transport: Arc<dyn Transport>, ip: String) -> Result<SessionHandle> {
        enum Outcome {
            Reclaimed(SessionHandle),
            Created(SessionHandle),
        }

        let outcome = {
            let mut inner = self.inner.write();

            if let Some(existing) = inner
                .slots
                .values()
                .find(|r| !r.is_disconnected() && r.kind.legacy_ip() == Some(ip.as_str()))
            {
                existing.retain();
                existing.rebind_transport(transport);
                existing.touch();
                Outcome::Reclaimed(existing.clone())
            } else {
                if inner.slots.len() >= inner.max_sessions {
                    return Err(Error::RegistryFull);
                }
                let id = self.next_id.fetch_add(1, Ordering::SeqCst);
                let record = Arc::new(SessionRecord::new(id, SessionKind::LegacyNet { ip }, Some(transport), Utc::now()));
                inner.slots.insert(id, record.clone());
                Outcome::Created(record)
            }
        };

        match outcome {
            Outcome::Reclaimed(record) => {
                aura_domain::trace::TraceEvent::SessionReclaimed {
                    session_id: record.session_id,
                    kind: record.kind.label().to_string(),
                }
                .emit();
                Ok(record)
            }
            Outcome::Created(record) => {
                aura_domain::trace::TraceEvent::SessionCreated {
                    session_id: record.session_id,
                    kind: record.kind.label().to_string(),
                }
                .emit();
                Ok(record)
            }
        }
    }

    /// Refuses disconnected sessions. The refcount increment happens while
    /// the registry read lock is still held, so a concurrent `destroy`
    /// cannot free the slot between "found it" and "owning it".
    pub fn get(&self, id: u64) -> Result<SessionHandle> {
        let inner = self.inner.read();
        let record = inner.slots.get(&id).ok_or_else(|| Error::UnknownSession(id.to_string()))?;
        if record.is_disconnected() {
            return Err(Error::DisconnectedSession(id.to_string()));
        }
        record.retain();
        Ok(record.clone())
    }

    /// Returns the record even if `disconnected`, for the explicit
    /// reconnect-lookup path.
    pub fn get_for_reconnect(&self, id: u64) -> Result<SessionHandle> {
        let inner = self.inner.read();
        let record = inner.slots.get(&id).ok_or_else(|| Error::UnknownSession(id.to_string()))?;
        record.retain();
        Ok(record.clone())
    }

    pub fn count(&self) -> usize {
        self.inner.read().slots.len()
    }

    /// Two-phase destruction (§4.3). Phase 1 evicts under the registry
    /// write lock; phase 2 blocks on the record's own refcount condvar with
    /// no registry lock held, so it never blocks other lookups.
    pub fn destroy(&self, id: u64) {
        let record = {
            let mut inner = self.inner.write();
            match inner.slots.remove(&id) {
                Some(record) => {
                    record.mark_disconnected();
                    record
                }
                None => return,
            }
        };
        aura_domain::trace::TraceEvent::SessionEvicted { session_id: id }.emit();

        record.wait_until_drained();
        aura_domain::trace::TraceEvent::SessionDrained { session_id: id }.emit();
        // `record` drops here, freeing the last strong reference.
    }

    /// Non-blocking snapshot of expired non-LOCAL ids, for the idle sweep.
    /// Destruction happens outside the registry lock.
    pub fn sweep_expired(&self, timeout: Duration) -> Vec<u64> {
        let now = Utc::now();
        let inner = self.inner.read();
        inner
            .slots
            .values()
            .filter(|r| r.session_id != LOCAL_SESSION_ID)
            .filter_map(|r| {
                let idle = now.signed_duration_since(r.last_activity()).to_std().unwrap_or_default();
                (idle > timeout).then_some(r.session_id)
            })
            .collect()
    }

    /// Writes each non-trivial (more than just a system prompt) history to
    /// a shutdown artifact via `persist::write_history`.
    pub fn save_all_histories(&self, dir: &std::path::Path) -> Result<()> {
        let records: Vec<_> = self.inner.read().slots.values().cloned().collect();
        for record in records {
            if record.history_len() > 1 {
                crate::persist::write_history(dir, record.session_id, &record.kind, &record.history_snapshot())?;
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::kind::SatelliteIdentity;

    #[test]
    fn local_slot_present_at_construction() {
        let registry = SessionRegistry::new(8);
        assert_eq!(registry.count(), 1);
        let local = registry.get_local();
        assert_eq!(local.session_id, LOCAL_SESSION_ID);
    }

    #[test]
    fn create_rejects_when_full() {
        let registry = SessionRegistry::new(1);
        let err = registry.create(SessionKind::Web, None).unwrap_err();
        assert!(matches!(err, Error::RegistryFull));
    }

    #[test]
    fn get_increments_refcount_and_rejects_unknown() {
        let registry = SessionRegistry::new(8);
        let session = registry.create(SessionKind::Web, None).unwrap();
        assert_eq!(session.ref_count(), 1);
        let fetched = registry.get(session.session_id).unwrap();
        assert_eq!(fetched.ref_count(), 2);
        assert!(matches!(registry.get(9999), Err(Error::UnknownSession(_))));
    }

    #[test]
    fn destroy_makes_session_unreachable_by_get() {
        let registry = SessionRegistry::new(8);
        let session = registry.create(SessionKind::Web, None).unwrap();
        let id = session.session_id;
        session.release();
        registry.destroy(id);
        assert!(matches!(registry.get(id), Err(Error::UnknownSession(_))));
    }

    #[test]
    fn satellite_reconnect_preserves_session_id_and_history() {
        let registry = SessionRegistry::new(8);
        let identity = SatelliteIdentity {
            uuid: "11111111-1111-1111-1111-111111111111".into(),
            name: "kitchen".into(),
            location: Some("kitchen".into()),
        };
        let transport: Arc<dyn Transport> = Arc::new(crate::test_support::NullTransport);
        let first = registry
            .create_satellite(transport.clone(), SessionTier::Satellite, identity.clone(), Capabilities::default())
            .unwrap();
        first.append_history(aura_domain::message::Message::user("hi"));
        let first_id = first.session_id;

        let second = registry
            .create_satellite(transport, SessionTier::Satellite, identity, Capabilities::default())
            .unwrap();
        assert_eq!(second.session_id, first_id);
        assert_eq!(second.history_len(), 1);
    }

    #[test]
    fn sweep_expired_never_includes_local() {
        let registry = SessionRegistry::new(8);
        let expired = registry.sweep_expired(Duration::from_secs(0));
        assert!(!expired.contains(&LOCAL_SESSION_ID));
    }
}
