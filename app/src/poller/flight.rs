use parking_lot::Mutex;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};
use tracing::warn;

struct Flight {
    id: u64,
    started: Instant,
}

/// At most one in-progress run of a recurring task.
///
/// A tick that finds a run in flight is skipped. With `max_in_flight` set, a
/// run older than that is considered hung and the guard is taken over.
pub struct SingleFlight {
    name: &'static str,
    max_in_flight: Option<Duration>,
    state: Mutex<Option<Flight>>,
    next_id: AtomicU64,
}

/// Releases the flight on drop, unless it was taken over meanwhile
pub struct FlightGuard<'a> {
    flight: &'a SingleFlight,
    id: u64,
}

impl SingleFlight {
    pub fn new(name: &'static str, max_in_flight: Option<Duration>) -> Self {
        SingleFlight {
            name,
            max_in_flight,
            state: Mutex::new(None),
            next_id: AtomicU64::new(0),
        }
    }

    pub fn try_begin(&self) -> Option<FlightGuard<'_>> {
        let mut state = self.state.lock();
        if let Some(flight) = state.as_ref() {
            let elapsed = flight.started.elapsed();
            match self.max_in_flight {
                Some(max) if elapsed >= max => {
                    warn!(
                        "{} poll in flight for {:?}, taking over",
                        self.name, elapsed
                    );
                }
                _ => return None,
            }
        }

        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        *state = Some(Flight {
            id,
            started: Instant::now(),
        });
        Some(FlightGuard { flight: self, id })
    }

    pub fn in_flight(&self) -> bool {
        self.state.lock().is_some()
    }
}

impl Drop for FlightGuard<'_> {
    fn drop(&mut self) {
        let mut state = self.flight.state.lock();
        if state.as_ref().map(|flight| flight.id) == Some(self.id) {
            *state = None;
        }
    }
}
