use std::rc::Rc;

use crate::domain::state::State;
use crate::heuristic::Heuristic;
use crate::level::Context;

/// Number of goal atoms not yet satisfied. Cheapest heuristic, used as the
/// baseline and as the default for unguided strategies.
pub struct GoalCount {
    ctx: Rc<Context>,
}

impl GoalCount {
    pub fn new(ctx: Rc<Context>) -> Self {
        GoalCount { ctx }
    }
}

impl Heuristic for GoalCount {
    fn h(&mut self, state: &State) -> f64 {
        let ctx = &self.ctx;
        let mut unsatisfied = 0usize;

        for (agent, goal) in ctx.agent_goals.iter().enumerate() {
            if let Some(pos) = goal {
                if state.agents[agent] != *pos {
                    unsatisfied += 1;
                }
            }
        }

        for &(letter, pos) in &ctx.box_goals {
            let satisfied = state
                .boxes
                .iter()
                .enumerate()
                .any(|(id, &at)| at == pos && ctx.box_letters[id] == letter);
            if !satisfied {
                unsatisfied += 1;
            }
        }

        unsatisfied as f64
    }

    fn name(&self) -> &'static str {
        "goal count"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::level;

    #[test]
    fn counts_unsatisfied_goals_and_zero_at_goal() {
        let text = "#domain\nhospital\n#levelname\ngc\n#colors\nblue: 0, A\n\
             #initial\n++++++\n+0A  +\n++++++\n\
             #goal\n++++++\n+  A0+\n++++++\n#end\n";
        let (ctx, state) = level::parse(text).unwrap();
        let ctx = Rc::new(ctx);
        let mut h = GoalCount::new(ctx.clone());
        assert_eq!(h.h(&state), 2.0);

        let goal_state = State::initial(vec![(1, 4)], vec![(1, 3)]);
        assert!(goal_state.is_goal(&ctx));
        assert_eq!(h.h(&goal_state), 0.0);
    }
}
