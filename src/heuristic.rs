pub mod complex_dijkstra;
pub mod goal_count;
pub mod manhattan;
pub mod simple_dijkstra;

pub use complex_dijkstra::ComplexDijkstra;
pub use goal_count::GoalCount;
pub use manhattan::Manhattan;
pub use simple_dijkstra::SimpleDijkstra;

use crate::domain::state::State;

/// Estimate of remaining cost. Takes `&mut self` because the complex
/// Dijkstra variant refreshes cached distance maps lazily.
pub trait Heuristic {
    fn h(&mut self, state: &State) -> f64;
    fn name(&self) -> &'static str;
}

/// How `g` and `h` combine into the frontier priority.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Objective {
    /// f = g + h
    AStar,
    /// f = g + w * h
    WeightedAStar(f64),
    /// f = h
    Greedy,
}

/// A heuristic paired with an objective; the thing a best-first frontier
/// actually keys its heap on.
pub struct Evaluator {
    heuristic: Box<dyn Heuristic>,
    objective: Objective,
}

impl Evaluator {
    pub fn new(heuristic: Box<dyn Heuristic>, objective: Objective) -> Self {
        Evaluator { heuristic, objective }
    }

    pub fn h(&mut self, state: &State) -> f64 {
        self.heuristic.h(state)
    }

    pub fn f(&mut self, state: &State) -> f64 {
        let h = self.heuristic.h(state);
        match self.objective {
            Objective::AStar => state.g as f64 + h,
            Objective::WeightedAStar(w) => state.g as f64 + w * h,
            Objective::Greedy => h,
        }
    }

    pub fn name(&self) -> String {
        let objective = match self.objective {
            Objective::AStar => "A*".to_string(),
            Objective::WeightedAStar(w) => format!("WA*({w})"),
            Objective::Greedy => "greedy".to_string(),
        };
        format!("{objective} evaluation over {}", self.heuristic.name())
    }
}
