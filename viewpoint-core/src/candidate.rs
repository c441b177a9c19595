//! PSO candidate record (spec §3).

/// One particle in the swarm: a parameter vector with velocity and personal
/// best, reused across iterations and across successive `solve` calls
/// (spec §3 "preallocated once and reused").
#[derive(Clone, Debug)]
pub struct Candidate {
    pub position: Vec<f32>,
    pub velocity: Vec<f32>,
    pub best_position: Vec<f32>,
    /// Maximum non-pruned evaluation ever returned for `best_position`.
    pub best_evaluation: f32,
    /// The most recent evaluation, including `-1` (pruned) and `-2`
    /// (out of domain).
    pub evaluation: f32,
    pub in_domain: bool,
    pub times_out_of_domain: u32,
    pub leader_index: usize,
    pub best_iteration: u32,
}

impl Candidate {
    pub fn new(dimensions: usize) -> Self {
        Self {
            position: vec![0.0; dimensions],
            velocity: vec![0.0; dimensions],
            best_position: vec![0.0; dimensions],
            best_evaluation: -1.0,
            evaluation: -1.0,
            in_domain: true,
            times_out_of_domain: 0,
            leader_index: 0,
            best_iteration: 0,
        }
    }

    pub fn seed(&mut self, position: Vec<f32>) {
        debug_assert_eq!(position.len(), self.position.len());
        self.best_position = position.clone();
        self.position = position;
        self.velocity.iter_mut().for_each(|v| *v = 0.0);
        self.best_evaluation = -1.0;
        self.evaluation = -1.0;
        self.leader_index = 0;
        self.times_out_of_domain = 0;
        self.best_iteration = 0;
    }

    pub fn dimensions(&self) -> usize {
        self.position.len()
    }
}
