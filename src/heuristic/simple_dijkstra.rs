use std::rc::Rc;

use crate::domain::state::State;
use crate::heuristic::Heuristic;
use crate::level::Context;
use crate::map::UNREACHABLE;

/// One wall-aware distance map per agent goal, built once at construction
/// (goal cells never move). `h` is the sum of each agent's lookup in its
/// own map; agents without a goal contribute nothing.
pub struct SimpleDijkstra {
    agent_goal_maps: Vec<Option<Vec<Vec<i64>>>>,
}

impl SimpleDijkstra {
    pub fn new(ctx: Rc<Context>) -> Self {
        let agent_goal_maps = ctx
            .agent_goals
            .iter()
            .map(|goal| goal.map(|pos| ctx.grid.dijkstra_map(pos)))
            .collect();
        SimpleDijkstra { agent_goal_maps }
    }
}

impl Heuristic for SimpleDijkstra {
    fn h(&mut self, state: &State) -> f64 {
        let mut total = 0i64;
        for (agent, map) in self.agent_goal_maps.iter().enumerate() {
            if let Some(map) = map {
                let (row, col) = state.agents[agent];
                total = total.saturating_add(map[row][col].min(UNREACHABLE));
            }
        }
        total as f64
    }

    fn name(&self) -> &'static str {
        "simple Dijkstra"
    }
}
