use std::collections::HashSet;
use std::rc::Rc;
use std::time::Instant;

use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;
use tracing::{debug, info};

use crate::config::{Config, HeuristicKind, Strategy};
use crate::domain::{Action, State};
use crate::frontier::{Frontier, FrontierBestFirst, FrontierBfs, FrontierDfs, FrontierIw};
use crate::heuristic::{
    ComplexDijkstra, Evaluator, GoalCount, Heuristic, Manhattan, Objective, SimpleDijkstra,
};
use crate::level::Context;
use crate::stats::Stats;

/// When pruning, keep at least this many successors per expansion.
const PRUNE_FLOOR: usize = 10;
/// When pruning, keep this share of successors (percent).
const PRUNE_KEEP_PERCENT: usize = 20;

/// A solved plan: one joint action per step, one action per agent.
#[derive(Debug, Clone, PartialEq)]
pub struct Plan {
    steps: Vec<Vec<Action>>,
}

impl Plan {
    pub fn new(steps: Vec<Vec<Action>>) -> Self {
        Plan { steps }
    }

    pub fn len(&self) -> usize {
        self.steps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }

    pub fn steps(&self) -> &[Vec<Action>] {
        &self.steps
    }

    /// Server wire format: one line per step, agent actions joined by `|`.
    pub fn format(&self) -> String {
        self.steps
            .iter()
            .map(|joint| {
                joint
                    .iter()
                    .map(|action| action.name())
                    .collect::<Vec<_>>()
                    .join("|")
            })
            .collect::<Vec<_>>()
            .join("\n")
    }

    /// Replay the plan from the initial state, checking every joint action
    /// is valid, no cell ever holds two entities, and the goal is reached.
    pub fn verify(&self, ctx: &Context, initial: &State) -> bool {
        let mut state = Rc::new(initial.clone());
        for joint in &self.steps {
            if joint.len() != ctx.num_agents() {
                return false;
            }
            let occ = match state.try_joint_action(joint, ctx) {
                Some(occ) => occ,
                None => return false,
            };
            let mut cells: HashSet<_> = HashSet::new();
            for &pos in occ.agents.iter().chain(occ.boxes.iter()) {
                if !cells.insert(pos) {
                    return false;
                }
            }
            state = Rc::new(state.result(joint.clone(), occ));
        }
        state.is_goal(ctx)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum SearchOutcome {
    Solved(Plan),
    NoSolution,
    ResourceLimit,
}

enum InnerOutcome {
    Solved(Plan),
    Exhausted,
    ResourceLimit,
}

pub struct Solver {
    ctx: Rc<Context>,
    config: Config,
    stats: Stats,
    rng: StdRng,
}

impl Solver {
    pub fn new(ctx: Rc<Context>, config: Config) -> Self {
        let rng = StdRng::seed_from_u64(config.seed);
        Solver {
            ctx,
            config,
            stats: Stats::default(),
            rng,
        }
    }

    pub fn stats(&self) -> &Stats {
        &self.stats
    }

    fn build_evaluator(&self, initial: &State) -> Evaluator {
        // BFS/DFS ignore the evaluator except in pruning, which is off for
        // them; goal count is a harmless placeholder.
        let heuristic: Box<dyn Heuristic> = if self.config.strategy.uses_heuristic() {
            match self.config.heuristic {
                HeuristicKind::GoalCount => Box::new(GoalCount::new(self.ctx.clone())),
                HeuristicKind::Manhattan => Box::new(Manhattan::new(self.ctx.clone())),
                HeuristicKind::Dijkstra => Box::new(SimpleDijkstra::new(self.ctx.clone())),
                HeuristicKind::ComplexDijkstra => {
                    Box::new(ComplexDijkstra::new(self.ctx.clone(), initial))
                }
            }
        } else {
            Box::new(GoalCount::new(self.ctx.clone()))
        };

        let objective = match self.config.strategy {
            Strategy::Greedy => Objective::Greedy,
            Strategy::Wastar => Objective::WeightedAStar(self.config.weight),
            _ => Objective::AStar,
        };
        Evaluator::new(heuristic, objective)
    }

    pub fn solve(&mut self, initial: State) -> SearchOutcome {
        let solve_start_time = Instant::now();
        let mut eval = self.build_evaluator(&initial);
        let initial = Rc::new(initial);

        let outcome = if self.config.strategy == Strategy::Iw {
            // Novelty escalation: restart from scratch with a wider filter
            // every time the current width exhausts without a plan.
            let mut result = InnerOutcome::Exhausted;
            for width in self.config.width..=self.config.max_width {
                if width > self.config.width {
                    self.stats.width_restarts += 1;
                }
                let mut frontier = FrontierIw::new(width);
                result = self.graph_search(&mut frontier, &mut eval, initial.clone());
                if !matches!(result, InnerOutcome::Exhausted) {
                    break;
                }
                debug!("width {width} exhausted without a plan");
            }
            result
        } else {
            let mut frontier: Box<dyn Frontier> = match self.config.strategy {
                Strategy::Bfs => Box::new(FrontierBfs::new()),
                Strategy::Dfs => Box::new(FrontierDfs::new()),
                _ => Box::new(FrontierBestFirst::new()),
            };
            self.graph_search(frontier.as_mut(), &mut eval, initial)
        };

        self.stats.time_us = solve_start_time.elapsed().as_micros() as usize;
        match outcome {
            InnerOutcome::Solved(plan) => {
                self.stats.plan_length = plan.len();
                self.stats.print();
                SearchOutcome::Solved(plan)
            }
            InnerOutcome::Exhausted => {
                self.stats.print();
                SearchOutcome::NoSolution
            }
            InnerOutcome::ResourceLimit => {
                self.stats.print();
                SearchOutcome::ResourceLimit
            }
        }
    }

    fn graph_search(
        &mut self,
        frontier: &mut dyn Frontier,
        eval: &mut Evaluator,
        initial: Rc<State>,
    ) -> InnerOutcome {
        info!("{} over {}", frontier.name(), eval.name());
        let mut explored: HashSet<Rc<State>> = HashSet::new();
        frontier.add(initial, eval);

        loop {
            if let Some(cap) = self.config.max_expanded {
                if self.stats.expanded >= cap {
                    debug!("expansion budget of {cap} nodes exhausted");
                    return InnerOutcome::ResourceLimit;
                }
            }

            let state = match frontier.pop() {
                Some(state) => state,
                None => return InnerOutcome::Exhausted,
            };

            if state.is_goal(&self.ctx) {
                return InnerOutcome::Solved(Plan::new(state.extract_plan()));
            }

            explored.insert(state.clone());
            self.stats.expanded += 1;

            let mut successors = state.expand(&self.ctx);
            self.stats.generated += successors.len();

            if self.config.shuffle {
                successors.shuffle(&mut self.rng);
            }

            // Joint-action branching explodes with agent count; for informed
            // strategies, keep only the most promising slice of each
            // expansion.
            if self.config.prune_expansions && self.config.strategy.uses_heuristic() {
                let keep = (successors.len() * PRUNE_KEEP_PERCENT / 100).max(PRUNE_FLOOR);
                if successors.len() > keep {
                    let mut scored: Vec<(f64, State)> = successors
                        .drain(..)
                        .map(|successor| (eval.h(&successor), successor))
                        .collect();
                    scored.sort_by(|a, b| a.0.total_cmp(&b.0));
                    scored.truncate(keep);
                    successors = scored.into_iter().map(|(_, successor)| successor).collect();
                }
            }

            for successor in successors {
                let successor = Rc::new(successor);
                if explored.contains(&successor) || frontier.contains(&successor) {
                    continue;
                }
                frontier.add(successor, eval);
            }
            self.stats.frontier = frontier.size();
        }
    }
}
