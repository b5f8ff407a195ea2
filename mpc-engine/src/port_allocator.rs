//! Allocates the port windows handed out to the coordinator's two kinds of MPC
//! session.
//!
//! This is deliberately a plain, `Send`-safe struct with no I/O and no async: callers
//! own one instance behind whatever synchronization they need (a coordinator keeps it
//! in a `Mutex` field rather than a module-level global).

use mpc_types::PortPair;

/// Hands out [`PortPair`]s for sharing and query sessions out of one configured port
/// range.
///
/// Sharing always gets the same window back, since at most one sharing session may be
/// active at a time. Query windows rotate through the remainder of the range so that
/// concurrent queries never collide.
#[derive(Clone, Debug)]
pub struct PortAllocator {
    num_parties: u16,
    free_ports_start: u16,
    free_ports_end: u16,
    query_cursor: u16,
}

impl PortAllocator {
    /// Builds an allocator over `[free_ports_start, free_ports_end]` for a cluster of
    /// `num_parties` parties.
    ///
    /// The sharing window occupies `[free_ports_start, free_ports_start + 2*num_parties)`;
    /// the query cursor starts immediately after it.
    pub fn new(num_parties: u16, free_ports_start: u16, free_ports_end: u16) -> Self {
        let query_start = free_ports_start + 2 * num_parties;
        Self {
            num_parties,
            free_ports_start,
            free_ports_end,
            query_cursor: query_start,
        }
    }

    /// The fixed port pair used by every sharing session.
    ///
    /// Reuse across sessions is safe because the coordinator's global sharing lock
    /// guarantees only one sharing session runs at a time.
    pub fn sharing_ports(&self) -> PortPair {
        PortPair {
            server_base: self.free_ports_start,
            client_base: self.free_ports_start + self.num_parties,
        }
    }

    /// Advances the query cursor and returns the next window, wrapping back to the
    /// start of the query range when the next window would exceed `free_ports_end`.
    pub fn next_query_ports(&mut self) -> PortPair {
        let query_start = self.free_ports_start + 2 * self.num_parties;
        if self
            .query_cursor
            .checked_add(2 * self.num_parties)
            .is_none_or(|next_window_end| next_window_end - 1 > self.free_ports_end)
        {
            self.query_cursor = query_start;
        }
        let ports = PortPair {
            server_base: self.query_cursor,
            client_base: self.query_cursor + self.num_parties,
        };
        self.query_cursor += 2 * self.num_parties;
        ports
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sharing_ports_are_stable_across_calls() {
        let alloc = PortAllocator::new(3, 10_000, 10_100);
        assert_eq!(alloc.sharing_ports(), alloc.sharing_ports());
        assert_eq!(
            alloc.sharing_ports(),
            PortPair {
                server_base: 10_000,
                client_base: 10_003,
            }
        );
    }

    #[test]
    fn query_cursor_advances_by_two_n_each_call() {
        let mut alloc = PortAllocator::new(2, 10_000, 10_100);
        let first = alloc.next_query_ports();
        let second = alloc.next_query_ports();
        assert_eq!(first.server_base + 4, second.server_base);
        assert_eq!(first.client_base + 4, second.client_base);
    }

    #[test]
    fn query_cursor_wraps_before_exceeding_free_ports_end() {
        let mut alloc = PortAllocator::new(4, 10_000, 10_020);
        // query window is 8 ports wide; range only fits one window past the sharing
        // pair, so the second call must wrap back to the start of the query range.
        let first = alloc.next_query_ports();
        let second = alloc.next_query_ports();
        assert_eq!(first, second);
    }
}
