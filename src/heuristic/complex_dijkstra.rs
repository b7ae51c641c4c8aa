use std::rc::Rc;

use tracing::debug;

use crate::domain::atom::{Color, Pos};
use crate::domain::state::State;
use crate::heuristic::manhattan::manhattan_distance;
use crate::heuristic::Heuristic;
use crate::level::Context;
use crate::map::UNREACHABLE;

pub const NO_CHOKE_POINT: i32 = -1;

type DistMap = Vec<Vec<i64>>;

/// Priority weight of the box ranked `rank` in an agent's assignment:
/// 1/2^(rank+1), so earlier (closer or blocking) boxes dominate.
fn priority(rank: usize) -> f64 {
    0.5f64.powi(rank as i32 + 1)
}

/// The heavyweight heuristic: wall-aware distance maps from every agent
/// goal, box goal and box start cell, choke-point groups for corridor
/// crowding, a fairness-based box-to-agent assignment and a nearest-box
/// claim per goal cell.
///
/// Box distance maps are refreshed lazily: when a state records that an
/// agent moved away from a box it had pushed or pulled, that box's map is
/// recomputed from the box's current cell on the next evaluation.
pub struct ComplexDijkstra {
    ctx: Rc<Context>,
    agent_goal_maps: Vec<Option<DistMap>>,
    /// Indexed like `ctx.box_goals`.
    box_goal_maps: Vec<DistMap>,
    /// Indexed by box id; rooted at the box's last known cell.
    box_maps: Vec<DistMap>,
    /// Choke-point group per cell, `NO_CHOKE_POINT` for wide cells.
    choke_group: Vec<Vec<i32>>,
    /// Per agent, its boxes in priority-rank order.
    assigned_boxes: Vec<Vec<usize>>,
    /// Box id -> index of the goal cell claimed for it, if any.
    claimed_goal: Vec<Option<usize>>,
    /// Box id -> priority weight within its agent's assignment.
    box_priority: Vec<f64>,
}

impl ComplexDijkstra {
    pub fn new(ctx: Rc<Context>, initial: &State) -> Self {
        let agent_goal_maps: Vec<Option<DistMap>> = ctx
            .agent_goals
            .iter()
            .map(|goal| goal.map(|pos| ctx.grid.dijkstra_map(pos)))
            .collect();
        let box_goal_maps: Vec<DistMap> = ctx
            .box_goals
            .iter()
            .map(|&(_, pos)| ctx.grid.dijkstra_map(pos))
            .collect();
        let box_maps: Vec<DistMap> = initial
            .boxes
            .iter()
            .map(|&pos| ctx.grid.dijkstra_map(pos))
            .collect();

        let choke_group = detect_choke_points(&ctx);

        let mut heuristic = ComplexDijkstra {
            agent_goal_maps,
            box_goal_maps,
            box_maps,
            choke_group,
            assigned_boxes: vec![Vec::new(); ctx.num_agents()],
            claimed_goal: vec![None; ctx.num_boxes()],
            box_priority: vec![0.0; ctx.num_boxes()],
            ctx,
        };
        heuristic.assign_boxes_to_agents(initial);
        heuristic.claim_goals(initial);
        heuristic.order_boxes(initial);
        heuristic
    }

    fn lookup(map: &DistMap, pos: Pos) -> i64 {
        map[pos.0][pos.1].min(UNREACHABLE)
    }

    /// Greedy fairness rule, one color group at a time: among the agents of
    /// that color currently holding the fewest boxes, the one closest to its
    /// nearest unclaimed box wins it (agent id breaks ties), and the box
    /// disappears from everyone else's candidate list.
    fn assign_boxes_to_agents(&mut self, initial: &State) {
        let ctx = self.ctx.clone();
        let mut colors: Vec<Color> = Vec::new();
        for &color in &ctx.agent_colors {
            if !colors.contains(&color) {
                colors.push(color);
            }
        }

        for color in colors {
            let agents: Vec<usize> = (0..ctx.num_agents())
                .filter(|&a| ctx.agent_colors[a] == color)
                .collect();

            // Per agent: (box id, distance from the box to the agent),
            // sorted nearest first.
            let mut candidates: Vec<(usize, Vec<(usize, i64)>)> = agents
                .iter()
                .map(|&agent| {
                    let agent_pos = initial.agents[agent];
                    let mut boxes: Vec<(usize, i64)> = ctx.agent_boxes[agent]
                        .iter()
                        .map(|&b| (b, Self::lookup(&self.box_maps[b], agent_pos)))
                        .collect();
                    boxes.sort_by_key(|&(b, d)| (d, b));
                    (agent, boxes)
                })
                .collect();

            loop {
                let live: Vec<usize> = candidates
                    .iter()
                    .enumerate()
                    .filter(|(_, (_, boxes))| !boxes.is_empty())
                    .map(|(i, _)| i)
                    .collect();
                if live.is_empty() {
                    break;
                }

                let min_assigned = live
                    .iter()
                    .map(|&i| self.assigned_boxes[candidates[i].0].len())
                    .min()
                    .unwrap();
                let best = live
                    .iter()
                    .copied()
                    .filter(|&i| self.assigned_boxes[candidates[i].0].len() == min_assigned)
                    .min_by_key(|&i| (candidates[i].1[0].1, candidates[i].0))
                    .unwrap();

                let (agent, boxes) = &mut candidates[best];
                let (box_id, _) = boxes.remove(0);
                self.assigned_boxes[*agent].push(box_id);
                for (_, boxes) in candidates.iter_mut() {
                    boxes.retain(|&(b, _)| b != box_id);
                }
            }
        }
    }

    /// Each goal cell claims the nearest still-unclaimed box of its letter.
    fn claim_goals(&mut self, initial: &State) {
        let ctx = self.ctx.clone();
        for (goal_index, &(letter, _)) in ctx.box_goals.iter().enumerate() {
            let nearest = (0..ctx.num_boxes())
                .filter(|&b| ctx.box_letters[b] == letter && self.claimed_goal[b].is_none())
                .min_by_key(|&b| {
                    (
                        Self::lookup(&self.box_goal_maps[goal_index], initial.boxes[b]),
                        b,
                    )
                });
            if let Some(box_id) = nearest {
                self.claimed_goal[box_id] = Some(goal_index);
            }
        }
    }

    /// Rank each agent's boxes: boxes whose claimed goal sits on another
    /// box's shortest path block that box and go first; ties fall back to
    /// distance from the agent. Rank feeds the 1/2^(rank+1) weight.
    fn order_boxes(&mut self, initial: &State) {
        let blocking: Vec<usize> = (0..self.ctx.num_boxes())
            .map(|b| self.blocking_count(b, initial))
            .collect();

        let assignments = self.assigned_boxes.clone();
        for (agent, boxes) in assignments.into_iter().enumerate() {
            let agent_pos = initial.agents[agent];
            let mut ordered = boxes;
            ordered.sort_by_key(|&b| {
                (
                    std::cmp::Reverse(blocking[b]),
                    Self::lookup(&self.box_maps[b], agent_pos),
                    b,
                )
            });
            for (rank, &b) in ordered.iter().enumerate() {
                self.box_priority[b] = priority(rank);
            }
            debug!("agent {agent} assigned boxes in order {ordered:?}");
            self.assigned_boxes[agent] = ordered;
        }
    }

    /// How many other boxes' shortest paths run through this box's claimed
    /// goal cell.
    fn blocking_count(&self, box_id: usize, initial: &State) -> usize {
        let Some(goal_index) = self.claimed_goal[box_id] else {
            return 0;
        };
        let goal_pos = self.ctx.box_goals[goal_index].1;

        (0..self.ctx.num_boxes())
            .filter(|&other| other != box_id)
            .filter(|&other| {
                let Some(other_goal) = self.claimed_goal[other] else {
                    return false;
                };
                let to_here = Self::lookup(&self.box_maps[other], goal_pos);
                let here_to_goal = Self::lookup(&self.box_goal_maps[other_goal], goal_pos);
                let full = Self::lookup(
                    &self.box_goal_maps[other_goal],
                    initial.boxes[other],
                );
                full < UNREACHABLE && to_here.saturating_add(here_to_goal) == full
            })
            .count()
    }

    fn refresh_stale_box_maps(&mut self, state: &State) {
        for agent in 0..state.agents.len() {
            if let Some(box_id) = state.recalculate_box[agent] {
                self.box_maps[box_id] = self.ctx.grid.dijkstra_map(state.boxes[box_id]);
            }
        }
    }
}

impl Heuristic for ComplexDijkstra {
    fn h(&mut self, state: &State) -> f64 {
        self.refresh_stale_box_maps(state);
        let ctx = &self.ctx;
        let mut total = 0.0f64;

        for agent in 0..state.agents.len() {
            let agent_pos = state.agents[agent];
            let mut busy = false;

            for &box_id in &self.assigned_boxes[agent] {
                // A surplus box with no claimed goal never has to move.
                let Some(goal_index) = self.claimed_goal[box_id] else {
                    continue;
                };
                let box_pos = state.boxes[box_id];
                if ctx.box_goals[goal_index].1 == box_pos {
                    continue;
                }
                busy = true;
                let weight = self.box_priority[box_id];

                // Travel to the box, skipped once adjacent.
                let to_box = Self::lookup(&self.box_maps[box_id], agent_pos);
                if to_box > 1 {
                    total += weight * (to_box - 1) as f64;
                }
                total += weight * Self::lookup(&self.box_goal_maps[goal_index], box_pos) as f64;
            }

            // Two working agents crammed into the same corridor group pay a
            // cooperation cost proportional to how close they are.
            if busy {
                let group = self.choke_group[agent_pos.0][agent_pos.1];
                if group != NO_CHOKE_POINT {
                    for other in agent + 1..state.agents.len() {
                        let other_pos = state.agents[other];
                        if self.choke_group[other_pos.0][other_pos.1] == group {
                            total += manhattan_distance(agent_pos, other_pos) as f64;
                        }
                    }
                }
            }

            if let Some(map) = &self.agent_goal_maps[agent] {
                total += priority(self.assigned_boxes[agent].len())
                    * Self::lookup(map, agent_pos) as f64;
            }
        }

        total
    }

    fn name(&self) -> &'static str {
        "complex Dijkstra"
    }
}

/// Choke-point groups via an iterative flood fill from the first free cell.
/// Cells with at most two free neighbors form corridor runs sharing a group
/// id; wider cells are `NO_CHOKE_POINT` and bump the id counter so runs on
/// opposite sides of a junction get distinct groups.
fn detect_choke_points(ctx: &Context) -> Vec<Vec<i32>> {
    let grid = &ctx.grid;
    let mut groups = vec![vec![NO_CHOKE_POINT; grid.cols]; grid.rows];
    let mut visited = vec![vec![false; grid.cols]; grid.rows];

    let start = (0..grid.rows)
        .flat_map(|r| (0..grid.cols).map(move |c| (r, c)))
        .find(|&pos| !grid.is_wall(pos));
    let Some(start) = start else {
        return groups;
    };

    let mut next_id = 0i32;
    let mut stack = vec![(start, 0i32)];
    while let Some((pos, id)) = stack.pop() {
        if visited[pos.0][pos.1] {
            continue;
        }
        visited[pos.0][pos.1] = true;

        let neighbors = grid.neighbors(pos);
        let here = if neighbors.len() > 2 {
            NO_CHOKE_POINT
        } else {
            id
        };
        groups[pos.0][pos.1] = here;

        for &next in neighbors {
            if !visited[next.0][next.1] {
                let next_group = if here == NO_CHOKE_POINT {
                    next_id += 1;
                    next_id
                } else {
                    id
                };
                stack.push((next, next_group));
            }
        }
    }

    groups
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::level;

    fn build(text: &str) -> (Rc<Context>, State, ComplexDijkstra) {
        let (ctx, state) = level::parse(text).unwrap();
        let ctx = Rc::new(ctx);
        let h = ComplexDijkstra::new(ctx.clone(), &state);
        (ctx, state, h)
    }

    #[test]
    fn corridor_cells_share_a_choke_group() {
        // A 1-wide corridor between two 3x3 rooms.
        let text = "#domain\nhospital\n#levelname\nchoke\n#colors\nblue: 0\n\
             #initial\n+++++++++\n+   +   +\n+0      +\n+   +   +\n+++++++++\n\
             #goal\n+++++++++\n+   +   +\n+      0+\n+   +   +\n+++++++++\n#end\n";
        let (_, _, h) = build(text);
        let corridor = h.choke_group[2][4];
        assert_ne!(corridor, NO_CHOKE_POINT);
        // Room centers have four neighbors and are not choke points.
        assert_eq!(h.choke_group[2][2], NO_CHOKE_POINT);
        assert_eq!(h.choke_group[2][6], NO_CHOKE_POINT);
    }

    #[test]
    fn fairness_splits_boxes_between_same_color_agents() {
        let text = "#domain\nhospital\n#levelname\nfair\n#colors\nblue: 0, 1, A\n\
             #initial\n++++++++\n+0A  A1+\n++++++++\n\
             #goal\n++++++++\n+ A  A +\n++++++++\n#end\n";
        let (_, _, h) = build(text);
        assert_eq!(h.assigned_boxes[0].len(), 1);
        assert_eq!(h.assigned_boxes[1].len(), 1);
        // Each agent gets the box next to it.
        assert_eq!(h.assigned_boxes[0], vec![0]);
        assert_eq!(h.assigned_boxes[1], vec![1]);
    }

    #[test]
    fn each_goal_claims_a_distinct_box() {
        let text = "#domain\nhospital\n#levelname\nclaim\n#colors\nblue: 0, A\n\
             #initial\n++++++++\n+0 A A +\n++++++++\n\
             #goal\n++++++++\n+  A  A+\n++++++++\n#end\n";
        let (_, _, h) = build(text);
        let claims: Vec<Option<usize>> = h.claimed_goal.clone();
        assert!(claims.iter().all(|c| c.is_some()));
        assert_ne!(claims[0], claims[1]);
    }

    #[test]
    fn zero_at_goal_state() {
        let text = "#domain\nhospital\n#levelname\ncd0\n#colors\nblue: 0, A\n\
             #initial\n++++++\n+0A  +\n++++++\n\
             #goal\n++++++\n+  A +\n++++++\n#end\n";
        let (ctx, state, mut h) = build(text);
        assert!(h.h(&state) > 0.0);

        let goal_state = State::initial(vec![(1, 2)], vec![(1, 3)]);
        assert!(goal_state.is_goal(&ctx));
        assert_eq!(h.h(&goal_state), 0.0);
    }

    #[test]
    fn surplus_box_without_a_claimed_goal_costs_nothing() {
        // Two A boxes, one A goal. The goal claims the box already sitting
        // on it; the leftover box must not add an agent-travel term.
        let text = "#domain\nhospital\n#levelname\nsurplus\n#colors\nblue: 0, A\n\
             #initial\n++++++++\n+0   AA+\n++++++++\n\
             #goal\n++++++++\n+     A+\n++++++++\n#end\n";
        let (ctx, state, mut h) = build(text);
        assert!(state.is_goal(&ctx));
        assert_eq!(h.h(&state), 0.0);
    }

    #[test]
    fn estimate_shrinks_as_the_box_approaches_its_goal() {
        let text = "#domain\nhospital\n#levelname\nshrink\n#colors\nblue: 0, A\n\
             #initial\n+++++++\n+0A   +\n+++++++\n\
             #goal\n+++++++\n+    A+\n+++++++\n#end\n";
        let (_, state, mut h) = build(text);
        let far = h.h(&state);
        let nearer = State::initial(vec![(1, 2)], vec![(1, 3)]);
        assert!(h.h(&nearer) < far);
    }

    #[test]
    fn stale_box_map_is_recomputed_lazily() {
        let text = "#domain\nhospital\n#levelname\nstale\n#colors\nblue: 0, A\n\
             #initial\n+++++++\n+0A   +\n+++++++\n\
             #goal\n+++++++\n+    A+\n+++++++\n#end\n";
        let (_, _, mut h) = build(text);

        // Pretend the box was pushed to (1,4) and agent 0 then stepped away.
        let mut state = State::initial(vec![(1, 3)], vec![(1, 4)]);
        state.recalculate_box[0] = Some(0);
        let _ = h.h(&state);
        assert_eq!(h.box_maps[0][1][4], 0);
        assert_eq!(h.box_maps[0][1][1], 3);
    }
}
