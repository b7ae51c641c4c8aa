use std::rc::Rc;

use crate::domain::atom::Pos;
use crate::domain::state::State;
use crate::heuristic::Heuristic;
use crate::level::Context;

pub fn manhattan_distance(a: Pos, b: Pos) -> i64 {
    (a.0 as i64 - b.0 as i64).abs() + (a.1 as i64 - b.1 as i64).abs()
}

/// Wall-ignoring Manhattan distances: every box to its nearest
/// matching-letter goal, every agent to its own goal.
///
/// An agent without a goal contributes the *negated* minimum distance to the
/// other agents' goals, nudging idle agents out of the way. Deliberate and
/// inadmissible; this heuristic is meant for greedy and weighted use.
pub struct Manhattan {
    ctx: Rc<Context>,
}

impl Manhattan {
    pub fn new(ctx: Rc<Context>) -> Self {
        Manhattan { ctx }
    }
}

impl Heuristic for Manhattan {
    fn h(&mut self, state: &State) -> f64 {
        let ctx = &self.ctx;
        let mut total = 0i64;

        for (id, &box_pos) in state.boxes.iter().enumerate() {
            let letter = ctx.box_letters[id];
            let nearest = ctx
                .box_goals
                .iter()
                .filter(|&&(goal_letter, _)| goal_letter == letter)
                .map(|&(_, goal)| manhattan_distance(box_pos, goal))
                .min();
            if let Some(distance) = nearest {
                total += distance;
            }
        }

        for (agent, &agent_pos) in state.agents.iter().enumerate() {
            if let Some(goal) = ctx.agent_goals[agent] {
                total += manhattan_distance(agent_pos, goal);
            } else {
                let other_goals_min = ctx
                    .agent_goals
                    .iter()
                    .flatten()
                    .map(|&goal| manhattan_distance(agent_pos, goal))
                    .min();
                if let Some(distance) = other_goals_min {
                    total -= distance;
                }
            }
        }

        total as f64
    }

    fn name(&self) -> &'static str {
        "Manhattan distance"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::level;

    #[test]
    fn sums_box_and_agent_distances() {
        let text = "#domain\nhospital\n#levelname\nmh\n#colors\nblue: 0, A\n\
             #initial\n++++++\n+0A  +\n++++++\n\
             #goal\n++++++\n+  A0+\n++++++\n#end\n";
        let (ctx, state) = level::parse(text).unwrap();
        let mut h = Manhattan::new(Rc::new(ctx));
        // Box (1,2) -> goal (1,3) is 1; agent (1,1) -> goal (1,4) is 3.
        assert_eq!(h.h(&state), 4.0);
    }

    #[test]
    fn goalless_agent_gets_negative_bias() {
        let text = "#domain\nhospital\n#levelname\nbias\n#colors\nblue: 0\nred: 1\n\
             #initial\n++++++\n+0 1 +\n++++++\n\
             #goal\n++++++\n+   0+\n++++++\n#end\n";
        let (ctx, state) = level::parse(text).unwrap();
        let mut h = Manhattan::new(Rc::new(ctx));
        // Agent 0 is 3 from its goal; agent 1 has none and sits 1 away from
        // agent 0's goal, contributing -1.
        assert_eq!(h.h(&state), 2.0);
    }

    #[test]
    fn zero_at_goal_state() {
        let text = "#domain\nhospital\n#levelname\nmh0\n#colors\nblue: 0, A\n\
             #initial\n++++++\n+ A 0+\n++++++\n\
             #goal\n++++++\n+ A 0+\n++++++\n#end\n";
        let (ctx, state) = level::parse(text).unwrap();
        assert!(state.is_goal(&ctx));
        let mut h = Manhattan::new(Rc::new(ctx));
        assert_eq!(h.h(&state), 0.0);
    }
}
