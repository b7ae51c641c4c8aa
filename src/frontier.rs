use std::cmp::Ordering;
use std::collections::{BinaryHeap, HashSet, VecDeque};
use std::rc::Rc;

use crate::domain::state::State;
use crate::heuristic::Evaluator;

/// Open set of not-yet-expanded states, ordered per strategy. The evaluator
/// is threaded through `add` so best-first variants can price states at
/// insertion; BFS and DFS ignore it.
pub trait Frontier {
    fn add(&mut self, state: Rc<State>, eval: &mut Evaluator);
    fn pop(&mut self) -> Option<Rc<State>>;
    fn is_empty(&self) -> bool;
    fn size(&self) -> usize;
    fn contains(&self, state: &State) -> bool;
    fn name(&self) -> String;
}

/// FIFO queue plus membership set. Optimal for uniform action costs.
#[derive(Default)]
pub struct FrontierBfs {
    queue: VecDeque<Rc<State>>,
    members: HashSet<Rc<State>>,
}

impl FrontierBfs {
    pub fn new() -> Self {
        Self::default()
    }
}

impl Frontier for FrontierBfs {
    fn add(&mut self, state: Rc<State>, _eval: &mut Evaluator) {
        self.queue.push_back(state.clone());
        self.members.insert(state);
    }

    fn pop(&mut self) -> Option<Rc<State>> {
        let state = self.queue.pop_front()?;
        self.members.remove(&state);
        Some(state)
    }

    fn is_empty(&self) -> bool {
        self.queue.is_empty()
    }

    fn size(&self) -> usize {
        self.queue.len()
    }

    fn contains(&self, state: &State) -> bool {
        self.members.contains(state)
    }

    fn name(&self) -> String {
        "breadth-first search".to_string()
    }
}

/// LIFO stack plus membership set. Feasibility only, no optimality.
#[derive(Default)]
pub struct FrontierDfs {
    stack: Vec<Rc<State>>,
    members: HashSet<Rc<State>>,
}

impl FrontierDfs {
    pub fn new() -> Self {
        Self::default()
    }
}

impl Frontier for FrontierDfs {
    fn add(&mut self, state: Rc<State>, _eval: &mut Evaluator) {
        self.stack.push(state.clone());
        self.members.insert(state);
    }

    fn pop(&mut self) -> Option<Rc<State>> {
        let state = self.stack.pop()?;
        self.members.remove(&state);
        Some(state)
    }

    fn is_empty(&self) -> bool {
        self.stack.is_empty()
    }

    fn size(&self) -> usize {
        self.stack.len()
    }

    fn contains(&self, state: &State) -> bool {
        self.members.contains(state)
    }

    fn name(&self) -> String {
        "depth-first search".to_string()
    }
}

struct OpenEntry {
    f: f64,
    /// Insertion sequence number; mandatory tie-breaker so equal-priority
    /// states come out in FIFO order and the heap order stays total.
    seq: u64,
    state: Rc<State>,
}

impl PartialEq for OpenEntry {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for OpenEntry {}

impl Ord for OpenEntry {
    // Reversed for min-order inside std's max-heap.
    fn cmp(&self, other: &Self) -> Ordering {
        other
            .f
            .total_cmp(&self.f)
            .then_with(|| other.seq.cmp(&self.seq))
    }
}

impl PartialOrd for OpenEntry {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

/// Binary min-heap keyed by the evaluator's `f`, FIFO among equals.
pub struct FrontierBestFirst {
    heap: BinaryHeap<OpenEntry>,
    members: HashSet<Rc<State>>,
    next_seq: u64,
}

impl FrontierBestFirst {
    pub fn new() -> Self {
        FrontierBestFirst {
            heap: BinaryHeap::new(),
            members: HashSet::new(),
            next_seq: 0,
        }
    }
}

impl Default for FrontierBestFirst {
    fn default() -> Self {
        Self::new()
    }
}

impl Frontier for FrontierBestFirst {
    fn add(&mut self, state: Rc<State>, eval: &mut Evaluator) {
        let f = eval.f(&state);
        let seq = self.next_seq;
        self.next_seq += 1;
        self.heap.push(OpenEntry { f, seq, state: state.clone() });
        self.members.insert(state);
    }

    fn pop(&mut self) -> Option<Rc<State>> {
        let entry = self.heap.pop()?;
        self.members.remove(&entry.state);
        Some(entry.state)
    }

    fn is_empty(&self) -> bool {
        self.heap.is_empty()
    }

    fn size(&self) -> usize {
        self.heap.len()
    }

    fn contains(&self, state: &State) -> bool {
        self.members.contains(state)
    }

    fn name(&self) -> String {
        "best-first search".to_string()
    }
}

/// Best-first with a novelty filter: a state enters only if it contributes
/// at least one previously unseen size-`width` combination of its atoms.
/// Width escalation is the driver's job; it builds a fresh frontier.
pub struct FrontierIw {
    inner: FrontierBestFirst,
    width: usize,
    known: HashSet<Vec<u64>>,
}

impl FrontierIw {
    pub fn new(width: usize) -> Self {
        assert!(width >= 1, "novelty width must be at least 1");
        FrontierIw {
            inner: FrontierBestFirst::new(),
            width,
            known: HashSet::new(),
        }
    }

    pub fn width(&self) -> usize {
        self.width
    }

    /// True if the state carries a yet-unseen atom combination; all of its
    /// combinations are marked known as a side effect when it does.
    fn is_novel(&mut self, state: &State) -> bool {
        let mut atoms: Vec<u64> = state.atoms().iter().map(|a| a.pack()).collect();
        atoms.sort_unstable();

        let mut fresh: Vec<Vec<u64>> = Vec::new();
        for_each_combination(&atoms, self.width, &mut |combo| {
            if !self.known.contains(combo) {
                fresh.push(combo.to_vec());
            }
        });

        if fresh.is_empty() {
            return false;
        }
        for combo in fresh {
            self.known.insert(combo);
        }
        true
    }
}

impl Frontier for FrontierIw {
    fn add(&mut self, state: Rc<State>, eval: &mut Evaluator) {
        if self.is_novel(&state) {
            self.inner.add(state, eval);
        }
    }

    fn pop(&mut self) -> Option<Rc<State>> {
        self.inner.pop()
    }

    fn is_empty(&self) -> bool {
        self.inner.is_empty()
    }

    fn size(&self) -> usize {
        self.inner.size()
    }

    fn contains(&self, state: &State) -> bool {
        self.inner.contains(state)
    }

    fn name(&self) -> String {
        format!("iterated-width search (width {})", self.width)
    }
}

/// Visit every size-`width` combination of the (sorted, deduplicated)
/// elements, iteratively via an index odometer.
fn for_each_combination(elements: &[u64], width: usize, visit: &mut impl FnMut(&[u64])) {
    if width == 0 || width > elements.len() {
        return;
    }
    let mut indices: Vec<usize> = (0..width).collect();
    let mut combo = vec![0u64; width];
    loop {
        for (slot, &i) in indices.iter().enumerate() {
            combo[slot] = elements[i];
        }
        visit(&combo);

        // Advance the rightmost index that still has room.
        let mut slot = width;
        loop {
            if slot == 0 {
                return;
            }
            slot -= 1;
            if indices[slot] < elements.len() - (width - slot) {
                indices[slot] += 1;
                for next in slot + 1..width {
                    indices[next] = indices[next - 1] + 1;
                }
                break;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::heuristic::{Evaluator, GoalCount, Objective};
    use crate::level;
    use crate::level::Context;

    fn setup() -> (Rc<Context>, Rc<State>, Evaluator) {
        let text = "#domain\nhospital\n#levelname\nfr\n#colors\nblue: 0\n\
             #initial\n++++++\n+0   +\n++++++\n\
             #goal\n++++++\n+   0+\n++++++\n#end\n";
        let (ctx, state) = level::parse(text).unwrap();
        let ctx = Rc::new(ctx);
        let eval = Evaluator::new(Box::new(GoalCount::new(ctx.clone())), Objective::Greedy);
        (ctx, Rc::new(state), eval)
    }

    fn agent_at(col: usize) -> Rc<State> {
        Rc::new(State::initial(vec![(1, col)], vec![]))
    }

    #[test]
    fn bfs_is_fifo_and_tracks_membership() {
        let (_, _, mut eval) = setup();
        let mut frontier = FrontierBfs::new();
        let a = agent_at(1);
        let b = agent_at(2);
        frontier.add(a.clone(), &mut eval);
        frontier.add(b.clone(), &mut eval);
        assert!(frontier.contains(&a));
        assert_eq!(frontier.size(), 2);
        assert_eq!(frontier.pop().unwrap(), a);
        assert!(!frontier.contains(&a));
        assert_eq!(frontier.pop().unwrap(), b);
        assert!(frontier.is_empty());
    }

    #[test]
    fn dfs_is_lifo() {
        let (_, _, mut eval) = setup();
        let mut frontier = FrontierDfs::new();
        let a = agent_at(1);
        let b = agent_at(2);
        frontier.add(a.clone(), &mut eval);
        frontier.add(b.clone(), &mut eval);
        assert_eq!(frontier.pop().unwrap(), b);
        assert_eq!(frontier.pop().unwrap(), a);
    }

    #[test]
    fn best_first_orders_by_f_with_fifo_ties() {
        let (_, _, mut eval) = setup();
        let mut frontier = FrontierBestFirst::new();
        // Goal is agent at (1,4); goal count is 1 for all three, so the
        // insertion order must be preserved.
        let a = agent_at(1);
        let b = agent_at(2);
        let goal = agent_at(4);
        frontier.add(a.clone(), &mut eval);
        frontier.add(b.clone(), &mut eval);
        frontier.add(goal.clone(), &mut eval);
        assert_eq!(frontier.pop().unwrap(), goal, "h=0 must come out first");
        assert_eq!(frontier.pop().unwrap(), a);
        assert_eq!(frontier.pop().unwrap(), b);
    }

    #[test]
    fn iw_rejects_states_without_novel_tuples() {
        let (_, _, mut eval) = setup();
        let mut frontier = FrontierIw::new(1);
        let a = agent_at(1);
        frontier.add(a.clone(), &mut eval);
        assert_eq!(frontier.size(), 1);

        // Same atom content again: no novel width-1 tuple, must be dropped.
        let duplicate = agent_at(1);
        frontier.add(duplicate, &mut eval);
        assert_eq!(frontier.size(), 1);

        let b = agent_at(2);
        frontier.add(b, &mut eval);
        assert_eq!(frontier.size(), 2);
    }

    #[test]
    fn iw_width_two_needs_novel_pairs() {
        let text = "#domain\nhospital\n#levelname\niw2\n#colors\nblue: 0\nred: 1\n\
             #initial\n++++++\n+0 1 +\n++++++\n\
             #goal\n++++++\n+ 0 1+\n++++++\n#end\n";
        let (ctx, state) = level::parse(text).unwrap();
        let ctx = Rc::new(ctx);
        let mut eval =
            Evaluator::new(Box::new(GoalCount::new(ctx.clone())), Objective::Greedy);
        let mut frontier = FrontierIw::new(2);

        frontier.add(Rc::new(state), &mut eval);
        assert_eq!(frontier.size(), 1);

        // Both single atoms were seen before, but the pair of positions
        // (agent 0 at (1,2), agent 1 at (1,3)) is new at width 2.
        let pair = Rc::new(State::initial(vec![(1, 2), (1, 3)], vec![]));
        frontier.add(pair, &mut eval);
        assert_eq!(frontier.size(), 2);

        // Every width-2 combination of this state was already recorded.
        let stale = Rc::new(State::initial(vec![(1, 1), (1, 3)], vec![]));
        frontier.add(stale, &mut eval);
        assert_eq!(frontier.size(), 2);
    }

    #[test]
    fn combination_generator_enumerates_all_pairs() {
        let mut seen = Vec::new();
        for_each_combination(&[1, 2, 3, 4], 2, &mut |c| seen.push(c.to_vec()));
        assert_eq!(seen.len(), 6);
        assert!(seen.contains(&vec![1, 4]));
        assert!(seen.contains(&vec![2, 3]));
    }
}
