//! Network allocator: API server ports for new clusters.

use std::collections::BTreeSet;
use std::net::{Ipv4Addr, TcpListener};

use parking_lot::Mutex;
use tracing::{debug, trace};

use crate::error::LifecycleError;

/// How API server ports are auto-assigned.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PortPolicy {
    /// First port tried for requests without an explicit port.
    pub range_start: u16,
    /// End of the range (exclusive).
    pub range_end: u16,
    /// Upper bound on candidates examined per reservation.
    pub max_attempts: u32,
    /// Skip ports something else on the host is listening on.
    pub probe_host: bool,
}

/// Hands out API server ports that no live cluster holds.
///
/// Reservations live until the owning cluster is destroyed or its
/// provisioning fails. The port set is guarded by its own lock, never held
/// across an await.
pub struct NetworkAllocator {
    policy: PortPolicy,
    reserved: Mutex<BTreeSet<u16>>,
}

impl NetworkAllocator {
    #[must_use]
    pub fn new(policy: PortPolicy) -> Self {
        Self {
            policy,
            reserved: Mutex::new(BTreeSet::new()),
        }
    }

    /// Reserve `requested`, or the first free port of the range when it is `0`.
    ///
    /// # Errors
    ///
    /// - [`LifecycleError::PortUnavailable`] when an explicit port is
    ///   reserved or bound on the host.
    /// - [`LifecycleError::NoPortsAvailable`] when auto-assignment examined
    ///   `max_attempts` candidates (or the whole range) without success.
    pub fn reserve(&self, requested: u16) -> Result<u16, LifecycleError> {
        let mut reserved = self.reserved.lock();

        if requested != 0 {
            if reserved.contains(&requested) || !self.host_port_free(requested) {
                return Err(LifecycleError::PortUnavailable { port: requested });
            }
            reserved.insert(requested);
            debug!(port = requested, "Reserved requested port");
            return Ok(requested);
        }

        let mut attempts = 0u32;
        for port in self.policy.range_start..self.policy.range_end {
            if attempts >= self.policy.max_attempts {
                break;
            }
            attempts += 1;
            if reserved.contains(&port) {
                continue;
            }
            if !self.host_port_free(port) {
                trace!(port, "Port bound on host, skipping");
                continue;
            }
            reserved.insert(port);
            debug!(port, attempts, "Reserved port");
            return Ok(port);
        }

        Err(LifecycleError::NoPortsAvailable { attempts })
    }

    /// Return a port. Releasing a port that is not reserved is a no-op.
    pub fn release(&self, port: u16) {
        if self.reserved.lock().remove(&port) {
            debug!(port, "Released port");
        }
    }

    /// Mark a port found in use by an adopted cluster.
    ///
    /// Unlike [`reserve`](Self::reserve) the host is not probed, since the
    /// cluster itself is what holds the port.
    ///
    /// # Errors
    ///
    /// Returns [`LifecycleError::PortUnavailable`] if already reserved.
    pub fn claim(&self, port: u16) -> Result<(), LifecycleError> {
        if self.reserved.lock().insert(port) {
            Ok(())
        } else {
            Err(LifecycleError::PortUnavailable { port })
        }
    }

    #[must_use]
    pub fn is_reserved(&self, port: u16) -> bool {
        self.reserved.lock().contains(&port)
    }

    /// Reserved ports in ascending order.
    #[must_use]
    pub fn reserved(&self) -> Vec<u16> {
        self.reserved.lock().iter().copied().collect()
    }

    fn host_port_free(&self, port: u16) -> bool {
        !self.policy.probe_host || TcpListener::bind((Ipv4Addr::LOCALHOST, port)).is_ok()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn allocator(start: u16, end: u16, max_attempts: u32) -> NetworkAllocator {
        NetworkAllocator::new(PortPolicy {
            range_start: start,
            range_end: end,
            max_attempts,
            probe_host: false,
        })
    }

    #[test]
    fn auto_assign_skips_reserved_ports() {
        let alloc = allocator(6500, 6510, 100);
        assert_eq!(alloc.reserve(0), Ok(6500));
        assert_eq!(alloc.reserve(0), Ok(6501));
        alloc.release(6500);
        assert_eq!(alloc.reserve(0), Ok(6500));
        assert_eq!(alloc.reserved(), vec![6500, 6501]);
    }

    #[test]
    fn explicit_port_conflict() {
        let alloc = allocator(6500, 6510, 100);
        assert_eq!(alloc.reserve(6550), Ok(6550));
        assert_eq!(
            alloc.reserve(6550),
            Err(LifecycleError::PortUnavailable { port: 6550 })
        );
    }

    #[test]
    fn exhausted_range() {
        let alloc = allocator(6500, 6502, 100);
        alloc.reserve(0).unwrap();
        alloc.reserve(0).unwrap();
        assert_eq!(
            alloc.reserve(0),
            Err(LifecycleError::NoPortsAvailable { attempts: 2 })
        );
    }

    #[test]
    fn attempts_are_bounded() {
        let alloc = allocator(6500, 7500, 3);
        for port in 6500..6503 {
            alloc.claim(port).unwrap();
        }
        assert_eq!(
            alloc.reserve(0),
            Err(LifecycleError::NoPortsAvailable { attempts: 3 })
        );
    }

    #[test]
    fn release_is_idempotent() {
        let alloc = allocator(6500, 6510, 100);
        let port = alloc.reserve(0).unwrap();
        alloc.release(port);
        alloc.release(port);
        alloc.release(9999);
        assert!(!alloc.is_reserved(port));
    }

    #[test]
    fn host_probe_skips_bound_port() {
        let listener = TcpListener::bind((Ipv4Addr::LOCALHOST, 0)).unwrap();
        let taken = listener.local_addr().unwrap().port();
        let alloc = NetworkAllocator::new(PortPolicy {
            range_start: taken,
            range_end: taken.saturating_add(50),
            max_attempts: 50,
            probe_host: true,
        });
        assert_eq!(
            alloc.reserve(taken),
            Err(LifecycleError::PortUnavailable { port: taken })
        );
        let port = alloc.reserve(0).unwrap();
        assert_ne!(port, taken);
    }
}
