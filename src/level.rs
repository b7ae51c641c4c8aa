use std::fs;
use std::path::Path;

use anyhow::{bail, Context as _, Result};
use tracing::debug;

use crate::domain::atom::{Color, Pos};
use crate::domain::state::State;
use crate::map::Grid;

/// Everything about a level that never changes during the search: the grid,
/// the color tables, and the goal atoms. Built once by the parser and passed
/// by shared ownership into expansion, heuristics and the driver rather
/// than held as global state.
#[derive(Debug)]
pub struct Context {
    pub grid: Grid,
    pub level_name: String,
    /// Agent id -> color.
    pub agent_colors: Vec<Color>,
    /// Box id -> color.
    pub box_colors: Vec<Color>,
    /// Box id -> letter ('A'..='Z'); several boxes may share a letter.
    pub box_letters: Vec<char>,
    /// Agent id -> ids of the boxes it is allowed to push or pull.
    pub agent_boxes: Vec<Vec<usize>>,
    /// Agent id -> goal cell, if the agent has one.
    pub agent_goals: Vec<Option<Pos>>,
    /// Letter goals; any box of the matching letter satisfies one.
    pub box_goals: Vec<(char, Pos)>,
}

impl Context {
    pub fn num_agents(&self) -> usize {
        self.agent_colors.len()
    }

    pub fn num_boxes(&self) -> usize {
        self.box_colors.len()
    }
}

pub fn load(path: impl AsRef<Path>) -> Result<(Context, State)> {
    let path = path.as_ref();
    let text = fs::read_to_string(path)
        .with_context(|| format!("error reading level file {}", path.display()))?;
    parse(&text)
}

/// Parse the textual level format:
/// `#domain` / `#levelname` headers, a `#colors` section mapping color names
/// to agent digits and box letters, `#initial` and `#goal` grids, `#end`.
pub fn parse(text: &str) -> Result<(Context, State)> {
    let mut lines = text.lines().peekable();

    let mut level_name = String::new();
    let mut color_lines: Vec<&str> = Vec::new();
    let mut initial_rows: Vec<&str> = Vec::new();
    let mut goal_rows: Vec<&str> = Vec::new();

    while let Some(line) = lines.next() {
        match line.trim() {
            "#domain" => {
                let domain = lines.next().unwrap_or("").trim();
                if domain != "hospital" {
                    bail!("unsupported domain: {domain}");
                }
            }
            "#levelname" => {
                level_name = lines.next().unwrap_or("").trim().to_string();
            }
            "#colors" => {
                while lines.peek().is_some_and(|l| !l.starts_with('#')) {
                    color_lines.push(lines.next().unwrap());
                }
            }
            "#initial" => {
                while lines.peek().is_some_and(|l| !l.starts_with('#')) {
                    initial_rows.push(lines.next().unwrap());
                }
            }
            "#goal" => {
                while lines.peek().is_some_and(|l| !l.starts_with('#')) {
                    goal_rows.push(lines.next().unwrap());
                }
            }
            "#end" | "" => {}
            other => bail!("unexpected level section: {other}"),
        }
    }

    if initial_rows.is_empty() {
        bail!("level has no #initial section");
    }

    // Color declarations: "blue: 0, A".
    let mut agent_color_decl: [Option<Color>; 10] = [None; 10];
    let mut letter_color_decl: [Option<Color>; 26] = [None; 26];
    for line in color_lines {
        let Some((color_name, entities)) = line.split_once(':') else {
            bail!("malformed color line: {line}");
        };
        let color: Color = color_name.parse()?;
        for entity in entities.split(',') {
            let entity = entity.trim();
            let mut chars = entity.chars();
            match (chars.next(), chars.next()) {
                (Some(c @ '0'..='9'), None) => {
                    agent_color_decl[c as usize - '0' as usize] = Some(color);
                }
                (Some(c @ 'A'..='Z'), None) => {
                    letter_color_decl[c as usize - 'A' as usize] = Some(color);
                }
                _ => bail!("malformed color entity: {entity:?}"),
            }
        }
    }

    // Wall mask. Rows are padded to the widest row; cells past a row's end
    // count as walls, as does anything that is not an entity or a blank.
    let cols = initial_rows.iter().map(|r| r.len()).max().unwrap();
    let rows = initial_rows.len();
    let mut walls = vec![vec![true; cols]; rows];
    let mut agent_cells: Vec<(usize, Pos)> = Vec::new();
    let mut box_cells: Vec<(char, Pos)> = Vec::new();

    for (row, line) in initial_rows.iter().enumerate() {
        for (col, ch) in line.chars().enumerate() {
            match ch {
                '+' => {}
                ' ' => walls[row][col] = false,
                '0'..='9' => {
                    walls[row][col] = false;
                    agent_cells.push((ch as usize - '0' as usize, (row, col)));
                }
                'A'..='Z' => {
                    walls[row][col] = false;
                    box_cells.push((ch, (row, col)));
                }
                other => bail!("unexpected character {other:?} at ({row},{col})"),
            }
        }
    }

    // Agents must be 0..n with declared colors and unique cells.
    agent_cells.sort_by_key(|&(id, _)| id);
    let mut agents: Vec<Pos> = Vec::new();
    let mut agent_colors: Vec<Color> = Vec::new();
    for (expected, &(id, pos)) in agent_cells.iter().enumerate() {
        if id != expected {
            bail!("agent ids must be contiguous from 0, found {id} at position {expected}");
        }
        let Some(color) = agent_color_decl[id] else {
            bail!("agent {id} appears in the level but has no declared color");
        };
        agents.push(pos);
        agent_colors.push(color);
    }
    if agents.is_empty() {
        bail!("level has no agents");
    }

    // Boxes: a box whose color no agent shares can never move, so it turns
    // into a wall cell and the expansion never sees it.
    let mut boxes: Vec<Pos> = Vec::new();
    let mut box_colors: Vec<Color> = Vec::new();
    let mut box_letters: Vec<char> = Vec::new();
    for &(letter, pos) in &box_cells {
        let Some(color) = letter_color_decl[letter as usize - 'A' as usize] else {
            bail!("box {letter} appears in the level but has no declared color");
        };
        if agent_colors.contains(&color) {
            boxes.push(pos);
            box_colors.push(color);
            box_letters.push(letter);
        } else {
            debug!("box {letter} at {pos:?} has no matching agent, treating as wall");
            walls[pos.0][pos.1] = true;
        }
    }

    let grid = Grid::new(walls)?;

    // Goal grids reuse the entity characters; walls there are decorative.
    let mut agent_goals: Vec<Option<Pos>> = vec![None; agents.len()];
    let mut box_goals: Vec<(char, Pos)> = Vec::new();
    for (row, line) in goal_rows.iter().enumerate() {
        for (col, ch) in line.chars().enumerate() {
            let pos = (row, col);
            match ch {
                '0'..='9' => {
                    let id = ch as usize - '0' as usize;
                    if id >= agents.len() {
                        bail!("goal for agent {id} but the level has no such agent");
                    }
                    if row >= grid.rows || col >= grid.cols || grid.is_wall(pos) {
                        bail!("goal for agent {id} at {pos:?} is not a free cell");
                    }
                    agent_goals[id] = Some(pos);
                }
                'A'..='Z' => {
                    if !box_letters.contains(&ch) {
                        bail!("goal for box {ch} but the level has no movable box {ch}");
                    }
                    if row >= grid.rows || col >= grid.cols || grid.is_wall(pos) {
                        bail!("goal for box {ch} at {pos:?} is not a free cell");
                    }
                    box_goals.push((ch, pos));
                }
                _ => {}
            }
        }
    }

    let agent_boxes: Vec<Vec<usize>> = agent_colors
        .iter()
        .map(|&color| {
            box_colors
                .iter()
                .enumerate()
                .filter(|&(_, &box_color)| box_color == color)
                .map(|(id, _)| id)
                .collect()
        })
        .collect();

    debug!(
        "parsed level {:?}: {}x{} cells, {} agents, {} boxes, {} box goals",
        level_name,
        grid.rows,
        grid.cols,
        agents.len(),
        boxes.len(),
        box_goals.len()
    );

    let ctx = Context {
        grid,
        level_name,
        agent_colors,
        box_colors,
        box_letters,
        agent_boxes,
        agent_goals,
        box_goals,
    };
    let state = State::initial(agents, boxes);
    Ok((ctx, state))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_agents_boxes_and_goals() {
        let text = "#domain\nhospital\n#levelname\nsmall\n#colors\nblue: 0, A\nred: 1, B\n\
             #initial\n++++++\n+0A  +\n+1B  +\n++++++\n\
             #goal\n++++++\n+   A+\n+   B+\n++++++\n#end\n";
        let (ctx, state) = parse(text).unwrap();
        assert_eq!(ctx.num_agents(), 2);
        assert_eq!(ctx.num_boxes(), 2);
        assert_eq!(state.agents, vec![(1, 1), (2, 1)]);
        assert_eq!(state.boxes, vec![(1, 2), (2, 2)]);
        assert_eq!(ctx.box_letters, vec!['A', 'B']);
        assert_eq!(ctx.agent_boxes, vec![vec![0], vec![1]]);
        assert_eq!(ctx.agent_goals, vec![None, None]);
        assert_eq!(ctx.box_goals, vec![('A', (1, 4)), ('B', (2, 4))]);
    }

    #[test]
    fn orphan_box_becomes_wall() {
        // Box B is red but there is no red agent.
        let text = "#domain\nhospital\n#levelname\norphan\n#colors\nblue: 0, A\nred: B\n\
             #initial\n++++++\n+0AB +\n++++++\n\
             #goal\n++++++\n+   A+\n++++++\n#end\n";
        let (ctx, state) = parse(text).unwrap();
        assert_eq!(ctx.num_boxes(), 1);
        assert_eq!(state.boxes, vec![(1, 2)]);
        assert!(ctx.grid.is_wall((1, 3)));
    }

    #[test]
    fn ragged_rows_are_padded_with_walls() {
        let text = "#domain\nhospital\n#levelname\nragged\n#colors\nblue: 0\n\
             #initial\n++++++\n+0 +\n++++++\n\
             #goal\n++++++\n+ 0+\n++++++\n#end\n";
        let (ctx, state) = parse(text).unwrap();
        assert_eq!(ctx.grid.cols, 6);
        assert!(ctx.grid.is_wall((1, 4)));
        assert_eq!(state.agents, vec![(1, 1)]);
    }

    #[test]
    fn undeclared_agent_color_is_an_error() {
        let text = "#domain\nhospital\n#levelname\nbad\n#colors\nblue: 0\n\
             #initial\n+++++\n+0 1+\n+++++\n\
             #goal\n+++++\n+0 1+\n+++++\n#end\n";
        assert!(parse(text).is_err());
    }

    #[test]
    fn goal_on_wall_is_an_error() {
        let text = "#domain\nhospital\n#levelname\nbad\n#colors\nblue: 0\n\
             #initial\n+++++\n+0  +\n+++++\n\
             #goal\n+++++\n+  +0\n+++++\n#end\n";
        assert!(parse(text).is_err());
    }

    #[test]
    fn unknown_color_is_an_error() {
        let text = "#domain\nhospital\n#levelname\nbad\n#colors\nturquoise: 0\n\
             #initial\n+++\n+0+\n+++\n\
             #goal\n+++\n+0+\n+++\n#end\n";
        assert!(parse(text).is_err());
    }
}
