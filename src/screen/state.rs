use std::collections::VecDeque;

use crate::platform::{Address, LatLng};

/// Where the screen is in acquiring the device location.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LocationState {
    Uninitialized,
    /// The permission prompt is showing.
    AwaitingPermission,
    /// Subscribed; waiting for the one fix we need.
    AwaitingFirstFix,
    /// Got a fix and unsubscribed. Terminal until the view is recreated.
    Fixed,
    /// Permission refused. The map stays on the default location.
    Denied,
}

/// Geocoding lookups in tap order.
///
/// Lookups run concurrently and may finish in any order; results are only
/// released from the front so markers are published in the order tapped.
#[derive(Debug, Default)]
pub(crate) struct Lookups {
    next_ticket: u64,
    queue: VecDeque<Lookup>,
}

#[derive(Debug)]
struct Lookup {
    ticket: u64,
    at: LatLng,
    candidates: Option<Vec<Address>>,
}

impl Lookups {
    pub(crate) fn issue(&mut self, at: LatLng) -> u64 {
        let ticket = self.next_ticket;
        self.next_ticket += 1;
        self.queue.push_back(Lookup {
            ticket,
            at,
            candidates: None,
        });
        ticket
    }

    /// Returns false for a ticket that is not pending.
    pub(crate) fn complete(&mut self, ticket: u64, candidates: Vec<Address>) -> bool {
        match self
            .queue
            .iter_mut()
            .find(|l| l.ticket == ticket && l.candidates.is_none())
        {
            Some(lookup) => {
                lookup.candidates = Some(candidates);
                true
            }
            None => false,
        }
    }

    /// Removes and returns the finished lookups at the front of the queue.
    pub(crate) fn take_ready(&mut self) -> Vec<(LatLng, Vec<Address>)> {
        let mut ready = Vec::new();
        while self
            .queue
            .front()
            .is_some_and(|l| l.candidates.is_some())
        {
            if let Some(Lookup {
                at,
                candidates: Some(candidates),
                ..
            }) = self.queue.pop_front()
            {
                ready.push((at, candidates));
            }
        }
        ready
    }

    pub(crate) fn len(&self) -> usize {
        self.queue.len()
    }

    pub(crate) fn is_empty(&self) -> bool {
        self.queue.is_empty()
    }
}
