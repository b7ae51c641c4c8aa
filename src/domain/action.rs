use std::fmt;

use crate::domain::atom::Pos;
use crate::domain::state::Occupancy;
use crate::level::Context;

/// Compass direction of a single orthogonal step. Rows grow south, columns
/// grow east.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Direction {
    North,
    South,
    East,
    West,
}

impl Direction {
    /// Direction of the unit step from `from` to `to`. Anything that is not
    /// exactly one orthogonal step is a bug in action construction, so this
    /// panics rather than returning an error.
    pub fn between(from: Pos, to: Pos) -> Direction {
        let dr = to.0 as i64 - from.0 as i64;
        let dc = to.1 as i64 - from.1 as i64;
        match (dr, dc) {
            (-1, 0) => Direction::North,
            (1, 0) => Direction::South,
            (0, 1) => Direction::East,
            (0, -1) => Direction::West,
            _ => panic!("displacement {from:?} -> {to:?} is not a unit orthogonal step"),
        }
    }

    pub fn delta(self) -> (i64, i64) {
        match self {
            Direction::North => (-1, 0),
            Direction::South => (1, 0),
            Direction::East => (0, 1),
            Direction::West => (0, -1),
        }
    }

    pub fn letter(self) -> char {
        match self {
            Direction::North => 'N',
            Direction::South => 'S',
            Direction::East => 'E',
            Direction::West => 'W',
        }
    }

    pub fn from_letter(c: char) -> Option<Direction> {
        match c {
            'N' => Some(Direction::North),
            'S' => Some(Direction::South),
            'E' => Some(Direction::East),
            'W' => Some(Direction::West),
            _ => None,
        }
    }
}

/// One agent's action for one time step.
///
/// All four kinds go through the same three entry points
/// ([`is_applicable`](Action::is_applicable), [`apply`](Action::apply),
/// [`name`](Action::name)); call sites never branch on the kind themselves.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Action {
    NoOp,
    Move {
        agent: usize,
        from: Pos,
        to: Pos,
    },
    /// Agent steps into the box's cell, box moves one cell further.
    Push {
        agent: usize,
        agent_from: Pos,
        box_id: usize,
        box_from: Pos,
        box_to: Pos,
    },
    /// Agent steps away, box follows into the agent's old cell.
    Pull {
        agent: usize,
        agent_from: Pos,
        agent_to: Pos,
        box_id: usize,
        box_from: Pos,
    },
}

impl Action {
    /// Precondition check against an atom-set view. Used both for the
    /// per-agent enumeration (against the parent state) and for the joint
    /// conflict test (against a partially mutated scratch copy).
    pub fn is_applicable(&self, occ: &Occupancy, ctx: &Context) -> bool {
        match *self {
            Action::NoOp => true,
            Action::Move { agent, from, to } => {
                occ.agents[agent] == from
                    && ctx.grid.neighbors(from).contains(&to)
                    && occ.is_free(to)
            }
            Action::Push {
                agent,
                agent_from,
                box_id,
                box_from,
                box_to,
            } => {
                occ.agents[agent] == agent_from
                    && occ.boxes[box_id] == box_from
                    && ctx.grid.neighbors(agent_from).contains(&box_from)
                    && ctx.grid.neighbors(box_from).contains(&box_to)
                    && occ.is_free(box_to)
                    && ctx.agent_boxes[agent].contains(&box_id)
            }
            Action::Pull {
                agent,
                agent_from,
                agent_to,
                box_id,
                box_from,
            } => {
                occ.agents[agent] == agent_from
                    && occ.boxes[box_id] == box_from
                    && ctx.grid.neighbors(agent_from).contains(&box_from)
                    && ctx.grid.neighbors(agent_from).contains(&agent_to)
                    && occ.is_free(agent_to)
                    && ctx.agent_boxes[agent].contains(&box_id)
            }
        }
    }

    /// Apply effects to the atom-set view. Preconditions are the caller's
    /// responsibility; the conflict test re-checks them against its own
    /// scratch copy before calling this.
    pub fn apply(&self, occ: &mut Occupancy) {
        match *self {
            Action::NoOp => {}
            Action::Move { agent, to, .. } => {
                occ.agents[agent] = to;
            }
            Action::Push {
                agent,
                box_id,
                box_from,
                box_to,
                ..
            } => {
                occ.agents[agent] = box_from;
                occ.boxes[box_id] = box_to;
            }
            Action::Pull {
                agent,
                agent_to,
                box_id,
                agent_from,
                ..
            } => {
                occ.agents[agent] = agent_to;
                occ.boxes[box_id] = agent_from;
            }
        }
    }

    pub fn moved_box(&self) -> Option<usize> {
        match *self {
            Action::Push { box_id, .. } | Action::Pull { box_id, .. } => Some(box_id),
            _ => None,
        }
    }

    /// Agent displacement and, for push/pull, box displacement.
    pub fn directions(&self) -> (Option<Direction>, Option<Direction>) {
        match *self {
            Action::NoOp => (None, None),
            Action::Move { from, to, .. } => (Some(Direction::between(from, to)), None),
            Action::Push {
                agent_from,
                box_from,
                box_to,
                ..
            } => (
                Some(Direction::between(agent_from, box_from)),
                Some(Direction::between(box_from, box_to)),
            ),
            Action::Pull {
                agent_from,
                agent_to,
                box_from,
                ..
            } => (
                Some(Direction::between(agent_from, agent_to)),
                Some(Direction::between(box_from, agent_from)),
            ),
        }
    }

    /// Canonical wire name: `NoOp`, `Move(D)`, `Push(D1,D2)`, `Pull(D1,D2)`.
    pub fn name(&self) -> String {
        match self.directions() {
            (None, None) => "NoOp".to_string(),
            (Some(d), None) => format!("Move({})", d.letter()),
            (Some(d1), Some(d2)) => {
                let kind = match self {
                    Action::Push { .. } => "Push",
                    Action::Pull { .. } => "Pull",
                    _ => unreachable!(),
                };
                format!("{kind}({},{})", d1.letter(), d2.letter())
            }
            (None, Some(_)) => unreachable!(),
        }
    }
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.name())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn canonical_names() {
        let mv = Action::Move { agent: 0, from: (2, 2), to: (2, 3) };
        assert_eq!(mv.name(), "Move(E)");

        let push = Action::Push {
            agent: 0,
            agent_from: (2, 2),
            box_id: 0,
            box_from: (2, 3),
            box_to: (2, 4),
        };
        assert_eq!(push.name(), "Push(E,E)");

        let pull = Action::Pull {
            agent: 0,
            agent_from: (2, 2),
            agent_to: (1, 2),
            box_id: 0,
            box_from: (2, 3),
        };
        assert_eq!(pull.name(), "Pull(N,W)");

        assert_eq!(Action::NoOp.name(), "NoOp");
    }

    #[test]
    fn name_round_trips_to_directions() {
        let actions = [
            Action::NoOp,
            Action::Move { agent: 0, from: (3, 3), to: (2, 3) },
            Action::Push {
                agent: 1,
                agent_from: (3, 3),
                box_id: 2,
                box_from: (3, 4),
                box_to: (4, 4),
            },
            Action::Pull {
                agent: 0,
                agent_from: (3, 3),
                agent_to: (3, 2),
                box_id: 0,
                box_from: (2, 3),
            },
        ];
        for action in actions {
            let name = action.name();
            // Only the parenthesized part carries direction letters; the
            // kind word itself must not be re-parsed (NoOp contains an N).
            let inner = name
                .find('(')
                .map(|open| &name[open + 1..name.len() - 1])
                .unwrap_or("");
            let parsed: Vec<Direction> =
                inner.chars().filter_map(Direction::from_letter).collect();
            let (d1, d2) = action.directions();
            let expected: Vec<Direction> =
                [d1, d2].into_iter().flatten().collect();
            assert_eq!(parsed, expected, "round trip failed for {name}");
        }
    }

    #[test]
    #[should_panic(expected = "unit orthogonal step")]
    fn diagonal_displacement_is_a_modeling_error() {
        Direction::between((1, 1), (2, 2));
    }

    #[test]
    fn delta_matches_letter() {
        for d in [Direction::North, Direction::South, Direction::East, Direction::West] {
            assert_eq!(Direction::from_letter(d.letter()), Some(d));
        }
        assert_eq!(Direction::North.delta(), (-1, 0));
        assert_eq!(Direction::East.delta(), (0, 1));
    }
}
