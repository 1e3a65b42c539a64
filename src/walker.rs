use crate::coord::{Direction, Site};
use crate::lattice::Lattice;
use log::trace;
use rand::Rng;

/// Terminal result of one particle's walk.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum WalkOutcome {
    /// The particle was written into the lattice at this site.
    Deposited(Site),
    /// The particle left the lattice through the top or bottom.
    Escaped,
    /// Every move from this site was blocked for longer than the retry cap.
    Stuck(Site),
    /// The particle was launched into an already occupied cell and discarded.
    Blocked(Site),
}

impl WalkOutcome {
    pub fn is_deposited(&self) -> bool {
        matches!(self, WalkOutcome::Deposited(_))
    }
}

/// Outcome plus the simulated time the particle consumed.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct WalkReport {
    pub outcome: WalkOutcome,
    /// One tick on launch plus one per direction draw, including rejected moves.
    pub ticks: u64,
}

// Internal walker states. `Deposited`/`Escaped`/`Stuck` are folded into `WalkOutcome`.
#[derive(Debug, Copy, Clone)]
enum WalkerState {
    /// Evaluate a freshly reached site: bounds, then neighbour-triggered sticking.
    Spawned(Site),
    /// Draw directions from `Site` until a move is accepted or the walk ends.
    Walking(Site),
}

/// Drives single particles over a lattice for one sticking probability.
pub struct RandomWalker<'a> {
    lattice: &'a mut Lattice,
    sticking_probability: f64,
    max_rejected_moves: u32,
}

impl<'a> RandomWalker<'a> {
    pub fn new(lattice: &'a mut Lattice, sticking_probability: f64, max_rejected_moves: u32) -> Self {
        Self { lattice, sticking_probability, max_rejected_moves }
    }

    /// Walks one particle launched at `start` until it deposits, escapes or gets stuck.
    /// A deposit writes `step` into the lattice.
    pub fn walk<R: Rng + ?Sized>(&mut self, start: Site, step: u32, rng: &mut R) -> WalkReport {
        let mut ticks: u64 = 1;
        if self.lattice.contains_z(start.z) && self.lattice.is_occupied(start) {
            trace!("step {}: launched into occupied cell {:?}", step, start);
            return WalkReport { outcome: WalkOutcome::Blocked(start), ticks };
        }
        let mut state = WalkerState::Spawned(start);

        let outcome = loop {
            state = match state {
                WalkerState::Spawned(site) => {
                    if !self.lattice.contains_z(site.z) {
                        break WalkOutcome::Escaped;
                    }
                    if self.lattice.has_occupied_neighbor(site)
                        && rng.random::<f64>() < self.sticking_probability
                    {
                        self.lattice.deposit(site, step);
                        break WalkOutcome::Deposited(site);
                    }
                    WalkerState::Walking(site)
                }
                WalkerState::Walking(site) => {
                    match self.try_move(site, step, &mut *rng, &mut ticks) {
                        Ok(next) => WalkerState::Spawned(next),
                        Err(outcome) => break outcome,
                    }
                }
            };
        };

        trace!("step {}: {:?} after {} ticks", step, outcome, ticks);
        WalkReport { outcome, ticks }
    }

    // Draws directions until one is not blocked. `Ok` is an accepted interior move;
    // `Err` carries a terminal outcome (escape, floor deposit, stuck).
    fn try_move<R: Rng + ?Sized>(
        &mut self,
        site: Site,
        step: u32,
        rng: &mut R,
        ticks: &mut u64,
    ) -> Result<Site, WalkOutcome> {
        let mut rejected: u32 = 0;
        loop {
            *ticks += 1;
            let dir = Direction::ALL[rng.random_range(0..Direction::ALL.len())];

            let Some(candidate) = self.lattice.neighbor(site, dir) else {
                return Err(WalkOutcome::Escaped);
            };

            if self.lattice.is_occupied(candidate) {
                rejected += 1;
                if rejected >= self.max_rejected_moves {
                    return Err(WalkOutcome::Stuck(site));
                }
                continue;
            }

            // Floor rule: reaching z = 0 always sticks.
            if candidate.z == 0 {
                self.lattice.deposit(candidate, step);
                return Err(WalkOutcome::Deposited(candidate));
            }

            return Ok(candidate);
        }
    }
}
