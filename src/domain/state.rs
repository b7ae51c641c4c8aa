use std::hash::{Hash, Hasher};
use std::rc::Rc;

use crate::domain::action::Action;
use crate::domain::atom::{Atom, Pos};
use crate::level::Context;

/// Mutable atom-set view used as the scratch copy during joint-action
/// validation. Positions are indexed by agent/box id, so equality over the
/// two vectors is exactly atom-set equality.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Occupancy {
    pub agents: Vec<Pos>,
    pub boxes: Vec<Pos>,
}

impl Occupancy {
    pub fn is_free(&self, pos: Pos) -> bool {
        !self.agents.contains(&pos) && !self.boxes.contains(&pos)
    }

    pub fn box_at(&self, pos: Pos) -> Option<usize> {
        self.boxes.iter().position(|&p| p == pos)
    }
}

/// A search node: the world's atom content plus the bookkeeping needed for
/// plan extraction and the distance-cache invalidation in the complex
/// heuristic.
///
/// Immutable once inserted into a frontier or explored set; successors are
/// always fresh values built by [`State::result`].
#[derive(Debug, Clone)]
pub struct State {
    pub agents: Vec<Pos>,
    pub boxes: Vec<Pos>,
    /// Step count from the root.
    pub g: usize,
    pub parent: Option<Rc<State>>,
    /// Joint action that produced this state from `parent`; empty at the root.
    pub joint_action: Vec<Action>,
    /// Per agent: the box it moved in the producing action, if any.
    pub last_moved_box: Vec<Option<usize>>,
    /// Per agent: a box whose cached source-distance map went stale because
    /// the agent moved away from it this step.
    pub recalculate_box: Vec<Option<usize>>,
}

impl PartialEq for State {
    fn eq(&self, other: &Self) -> bool {
        self.agents == other.agents && self.boxes == other.boxes
    }
}

impl Eq for State {}

impl Hash for State {
    fn hash<H: Hasher>(&self, hasher: &mut H) {
        self.agents.hash(hasher);
        self.boxes.hash(hasher);
    }
}

impl State {
    pub fn initial(agents: Vec<Pos>, boxes: Vec<Pos>) -> State {
        let num_agents = agents.len();
        State {
            agents,
            boxes,
            g: 0,
            parent: None,
            joint_action: Vec::new(),
            last_moved_box: vec![None; num_agents],
            recalculate_box: vec![None; num_agents],
        }
    }

    fn occupancy(&self) -> Occupancy {
        Occupancy {
            agents: self.agents.clone(),
            boxes: self.boxes.clone(),
        }
    }

    pub fn atoms(&self) -> Vec<Atom> {
        let mut atoms = Vec::with_capacity(self.agents.len() + self.boxes.len());
        for (agent, &pos) in self.agents.iter().enumerate() {
            atoms.push(Atom::AgentAt { agent, pos });
        }
        for (id, &pos) in self.boxes.iter().enumerate() {
            atoms.push(Atom::BoxAt { id, pos });
        }
        atoms
    }

    /// All agent goals must hold literally; a box goal is satisfied by any
    /// box of the matching letter (letter equivalence, not box identity).
    pub fn is_goal(&self, ctx: &Context) -> bool {
        let agents_ok = ctx
            .agent_goals
            .iter()
            .enumerate()
            .all(|(agent, goal)| goal.map_or(true, |pos| self.agents[agent] == pos));

        agents_ok
            && ctx.box_goals.iter().all(|&(letter, pos)| {
                self.boxes
                    .iter()
                    .enumerate()
                    .any(|(id, &at)| at == pos && ctx.box_letters[id] == letter)
            })
    }

    /// Successor via one joint action. `occ` is the scratch copy the joint
    /// conflict test already applied the actions to.
    pub fn result(self: &Rc<Self>, joint_action: Vec<Action>, occ: Occupancy) -> State {
        let mut last_moved_box = self.last_moved_box.clone();
        let mut recalculate_box = vec![None; self.agents.len()];

        for (agent, action) in joint_action.iter().enumerate() {
            match action {
                Action::Move { .. } => {
                    // Moving away from a box the agent previously pushed or
                    // pulled invalidates that box's cached distance map.
                    if let Some(box_id) = last_moved_box[agent].take() {
                        recalculate_box[agent] = Some(box_id);
                    }
                }
                Action::Push { .. } | Action::Pull { .. } => {
                    last_moved_box[agent] = action.moved_box();
                }
                Action::NoOp => {}
            }
        }

        State {
            agents: occ.agents,
            boxes: occ.boxes,
            g: self.g + 1,
            parent: Some(Rc::clone(self)),
            joint_action,
            last_moved_box,
            recalculate_box,
        }
    }

    /// Every action the given agent could take on its own, NoOp included.
    pub fn applicable_actions(&self, agent: usize, ctx: &Context) -> Vec<Action> {
        let occ = self.occupancy();
        let agent_from = self.agents[agent];
        let mut actions = vec![Action::NoOp];

        for &to in ctx.grid.neighbors(agent_from) {
            let action = Action::Move { agent, from: agent_from, to };
            if action.is_applicable(&occ, ctx) {
                actions.push(action);
            }
        }

        // Push/Pull candidates: color-matched boxes on neighbor cells. An
        // agent with no movable box colors skips this entirely.
        if !ctx.agent_boxes[agent].is_empty() {
            for &box_from in ctx.grid.neighbors(agent_from) {
                let Some(box_id) = occ.box_at(box_from) else {
                    continue;
                };
                if !ctx.agent_boxes[agent].contains(&box_id) {
                    continue;
                }
                for &box_to in ctx.grid.neighbors(box_from) {
                    let action = Action::Push {
                        agent,
                        agent_from,
                        box_id,
                        box_from,
                        box_to,
                    };
                    if action.is_applicable(&occ, ctx) {
                        actions.push(action);
                    }
                }
                for &agent_to in ctx.grid.neighbors(agent_from) {
                    let action = Action::Pull {
                        agent,
                        agent_from,
                        agent_to,
                        box_id,
                        box_from,
                    };
                    if action.is_applicable(&occ, ctx) {
                        actions.push(action);
                    }
                }
            }
        }

        actions
    }

    /// Joint conflict test: apply the actions to a scratch copy in agent
    /// order, failing the moment a precondition no longer holds against the
    /// partially mutated set. Catches coinciding destinations and two agents
    /// moving the same box. Returns the mutated scratch on success.
    pub fn try_joint_action(&self, joint_action: &[Action], ctx: &Context) -> Option<Occupancy> {
        let mut occ = self.occupancy();
        for action in joint_action {
            if !action.is_applicable(&occ, ctx) {
                return None;
            }
            action.apply(&mut occ);
        }
        Some(occ)
    }

    pub fn is_conflicting(&self, joint_action: &[Action], ctx: &Context) -> bool {
        self.try_joint_action(joint_action, ctx).is_none()
    }

    /// All valid successors: Cartesian product of per-agent applicable
    /// actions, filtered by the joint conflict test. The product is walked
    /// with an iterative odometer so deep agent counts cannot blow the stack.
    pub fn expand(self: &Rc<Self>, ctx: &Context) -> Vec<State> {
        let num_agents = self.agents.len();
        let applicable: Vec<Vec<Action>> = (0..num_agents)
            .map(|agent| self.applicable_actions(agent, ctx))
            .collect();

        let mut joint_action = vec![Action::NoOp; num_agents];
        let mut permutation = vec![0usize; num_agents];
        let mut expanded = Vec::new();

        loop {
            for agent in 0..num_agents {
                joint_action[agent] = applicable[agent][permutation[agent]];
            }

            if let Some(occ) = self.try_joint_action(&joint_action, ctx) {
                expanded.push(self.result(joint_action.clone(), occ));
            }

            // Advance the odometer.
            let mut done = false;
            for agent in 0..num_agents {
                if permutation[agent] < applicable[agent].len() - 1 {
                    permutation[agent] += 1;
                    break;
                }
                permutation[agent] = 0;
                if agent == num_agents - 1 {
                    done = true;
                }
            }
            if done {
                break;
            }
        }

        expanded
    }

    /// Ordered action sequence from the root to this state.
    pub fn extract_plan(&self) -> Vec<Vec<Action>> {
        let mut plan = vec![Vec::new(); self.g];
        let mut state = self;
        while state.g > 0 {
            plan[state.g - 1] = state.joint_action.clone();
            state = state
                .parent
                .as_deref()
                .expect("non-root state without parent");
        }
        plan
    }
}
