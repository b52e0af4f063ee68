//! Minesweeper - components, refs, click listeners and partial redraws.
//!
//! Run: cargo run --example minesweeper [seed]
//!
//! There is no browser here, so the demo plays a few clicks against the
//! in-memory document and prints the HTML after each step.

use std::any::Any;
use std::cell::{Cell, RefCell};
use std::rc::Rc;
use std::time::{SystemTime, UNIX_EPOCH};

use spark_dom::dom::{self, NodeId};
use spark_dom::{
    mount_root, tag, Child, Children, Component, Element, ElementDesc, NodeAttributes, NodeType,
    Options,
};

const LINES: usize = 10;
const COLUMNS: usize = 10;
const BOMB_CHANCE: f64 = 0.1;

// =============================================================================
// Random
// =============================================================================

struct XorShift(u64);

impl XorShift {
    fn next_f64(&mut self) -> f64 {
        let mut x = self.0;
        x ^= x << 13;
        x ^= x >> 7;
        x ^= x << 17;
        self.0 = x;
        (x >> 11) as f64 / (1u64 << 53) as f64
    }
}

// =============================================================================
// Board State
// =============================================================================

#[derive(Debug, Clone, Copy, Default)]
struct CellState {
    is_bomb: bool,
    is_revealed: bool,
    neighbouring_bombs: u8,
}

struct Board {
    cells: Vec<Vec<CellState>>,
    rng: XorShift,
}

impl Board {
    fn new(seed: u64) -> Self {
        let mut board = Self {
            cells: vec![vec![CellState::default(); COLUMNS]; LINES],
            rng: XorShift(seed.max(1)),
        };
        board.generate();
        board
    }

    fn generate(&mut self) {
        for i in 0..LINES {
            for j in 0..COLUMNS {
                self.cells[i][j] = CellState {
                    is_bomb: self.rng.next_f64() < BOMB_CHANCE,
                    ..CellState::default()
                };
            }
        }
        for i in 0..LINES {
            for j in 0..COLUMNS {
                let bombs = neighbours(i, j)
                    .filter(|&(ni, nj)| self.cells[ni][nj].is_bomb)
                    .count();
                self.cells[i][j].neighbouring_bombs = bombs as u8;
            }
        }
    }
}

fn neighbours(i: usize, j: usize) -> impl Iterator<Item = (usize, usize)> {
    (-1i32..=1)
        .flat_map(move |di| (-1i32..=1).map(move |dj| (di, dj)))
        .filter(|&(di, dj)| di != 0 || dj != 0)
        .filter_map(move |(di, dj)| {
            let ni = i as i32 + di;
            let nj = j as i32 + dj;
            let inside = ni >= 0 && ni < LINES as i32 && nj >= 0 && nj < COLUMNS as i32;
            inside.then_some((ni as usize, nj as usize))
        })
}

fn cell_ref(i: usize, j: usize) -> String {
    format!("matrix-{i}-{j}")
}

// =============================================================================
// Cell
// =============================================================================

struct MinesweeperCell {
    state: CellState,
    revealed: Cell<bool>,
}

impl MinesweeperCell {
    fn new(state: CellState) -> Self {
        Self {
            state,
            revealed: Cell::new(state.is_revealed),
        }
    }

    fn label(&self) -> String {
        if !self.revealed.get() {
            "?".to_string()
        } else if self.state.is_bomb {
            "*".to_string()
        } else if self.state.neighbouring_bombs == 0 {
            ".".to_string()
        } else {
            self.state.neighbouring_bombs.to_string()
        }
    }
}

impl Component for MinesweeperCell {
    fn as_any(&self) -> &dyn Any {
        self
    }

    fn node_type(&self) -> NodeType {
        NodeType::Tag("button".into())
    }

    fn render(&self, _element: Element, _options: &Options) -> Children {
        Rc::new(vec![Child::Text(self.label())])
    }

    fn extra_node_attributes(&self, _element: Element, attributes: &mut NodeAttributes) {
        attributes.add_class("cell");
        attributes.set_style("width", "3em");
        attributes.set_style("height", "3em");
        if self.revealed.get() && self.state.is_bomb {
            attributes.add_class("bomb");
        }
    }
}

fn reveal_cell(cell: Element) {
    cell.with_component(|c: &MinesweeperCell| c.revealed.set(true));
    cell.redraw();
}

// =============================================================================
// Smiley
// =============================================================================

struct SmileyButton {
    face: RefCell<String>,
    pressed_face: RefCell<Option<String>>,
}

impl SmileyButton {
    fn new() -> Self {
        Self {
            face: RefCell::new("smile-o".to_string()),
            pressed_face: RefCell::new(None),
        }
    }
}

fn set_face(smiley: Element, face: &str) {
    smiley.with_component(|s: &SmileyButton| *s.face.borrow_mut() = face.to_string());
    smiley.redraw();
}

impl Component for SmileyButton {
    fn as_any(&self) -> &dyn Any {
        self
    }

    fn node_type(&self) -> NodeType {
        NodeType::Tag("button".into())
    }

    fn render(&self, _element: Element, _options: &Options) -> Children {
        Rc::new(vec![Child::Text(format!("[{}]", self.face.borrow()))])
    }

    fn on_mount(&self, element: Element) {
        let down = element.add_node_listener("mousedown", move |_| {
            element.with_component(|s: &SmileyButton| {
                let old = s.face.borrow().clone();
                *s.pressed_face.borrow_mut() = Some(old);
            });
            set_face(element, "meh-o");
        });
        let up = element.add_node_listener("mouseup", move |_| {
            let old = element
                .with_component(|s: &SmileyButton| s.pressed_face.borrow_mut().take())
                .flatten();
            if let Some(old) = old {
                set_face(element, &old);
            }
        });
        if let Err(err) = down.and(up) {
            tracing::warn!(error = %err, "smiley listeners not attached");
        }
    }
}

// =============================================================================
// Game
// =============================================================================

struct MinesweeperGame {
    board: RefCell<Board>,
}

impl Component for MinesweeperGame {
    fn as_any(&self) -> &dyn Any {
        self
    }

    fn render(&self, element: Element, _options: &Options) -> Children {
        let board = self.board.borrow();
        let mut children: Vec<Child> = board
            .cells
            .iter()
            .enumerate()
            .map(|(i, row)| {
                let cells = row.iter().enumerate().map(|(j, state)| {
                    ElementDesc::new(MinesweeperCell::new(*state))
                        .with_ref(cell_ref(i, j))
                        .on_click(move |_| clicked_on(element, i, j))
                });
                tag("div").class("row").children(cells).into()
            })
            .collect();
        children.push(ElementDesc::new(SmileyButton::new()).with_ref("smileyButton").into());
        Rc::new(children)
    }
}

fn with_board<R>(game: Element, f: impl FnOnce(&mut Board) -> R) -> Option<R> {
    game.with_component(|g: &MinesweeperGame| f(&mut g.board.borrow_mut()))
}

fn reveal(game: Element, i: usize, j: usize) {
    let Some(state) = with_board(game, |b| {
        let before = b.cells[i][j];
        b.cells[i][j].is_revealed = true;
        before
    }) else {
        return;
    };
    if state.is_revealed {
        return;
    }
    if let Some(cell) = game.get_ref(&cell_ref(i, j)) {
        reveal_cell(cell);
    }
    if state.neighbouring_bombs == 0 {
        for (ni, nj) in neighbours(i, j) {
            reveal(game, ni, nj);
        }
    }
}

fn clicked_on(game: Element, i: usize, j: usize) {
    reveal(game, i, j);
    let is_bomb = with_board(game, |b| b.cells[i][j].is_bomb).unwrap_or(false);
    if is_bomb {
        if let Some(smiley) = game.get_ref("smileyButton") {
            set_face(smiley, "frown-o");
        }
        for i in 0..LINES {
            for j in 0..COLUMNS {
                reveal(game, i, j);
            }
        }
    }
}

fn new_game(game: Element) {
    with_board(game, Board::generate);
    game.redraw();
}

// =============================================================================
// Page
// =============================================================================

struct DemoMain {
    seed: u64,
}

impl Component for DemoMain {
    fn as_any(&self) -> &dyn Any {
        self
    }

    fn render(&self, element: Element, _options: &Options) -> Children {
        Rc::new(vec![
            tag("h1").child("Welcome to this Minesweeper demo").into(),
            tag("button")
                .with_ref("newGame")
                .child("New game")
                .on_click(move |_| {
                    if let Some(game) = element.get_ref("game") {
                        new_game(game);
                    }
                })
                .into(),
            ElementDesc::new(MinesweeperGame {
                board: RefCell::new(Board::new(self.seed)),
            })
            .with_ref("game")
            .into(),
        ])
    }
}

fn print_board(title: &str, game: Element) {
    println!("\n== {title} ==");
    for row in game.children().iter().filter(|c| c.node_type() == Some(NodeType::Tag("div".into()))) {
        let line: Vec<String> = row
            .children()
            .iter()
            .filter_map(|cell| cell.node())
            .map(|node| format!("{:>2}", dom::text_content(node)))
            .collect();
        println!("{}", line.join(" "));
    }
    if let Some(smiley) = game.get_ref("smileyButton").and_then(|s| s.node()) {
        println!("{}", dom::outer_html(smiley));
    }
}

fn node_of(game: Element, name: &str) -> Option<NodeId> {
    game.get_ref(name).and_then(|e| e.node())
}

fn main() {
    spark_dom::logging::init("info");

    let seed = std::env::args()
        .nth(1)
        .and_then(|raw| raw.parse().ok())
        .unwrap_or_else(|| {
            SystemTime::now()
                .duration_since(UNIX_EPOCH)
                .map(|d| d.as_nanos() as u64)
                .unwrap_or(0x2545_f491)
        });

    let page = match mount_root(ElementDesc::new(DemoMain { seed }), dom::body()) {
        Ok(page) => page,
        Err(err) => {
            eprintln!("mount failed: {err}");
            return;
        }
    };
    let Some(game) = page.get_ref("game") else {
        eprintln!("game element missing");
        return;
    };
    print_board("new board", game);

    // Click the first safe cell with no neighbouring bombs, if any.
    let start = with_board(game, |b| {
        (0..LINES)
            .flat_map(|i| (0..COLUMNS).map(move |j| (i, j)))
            .find(|&(i, j)| !b.cells[i][j].is_bomb && b.cells[i][j].neighbouring_bombs == 0)
    })
    .flatten();
    if let Some((i, j)) = start {
        if let Some(node) = node_of(game, &cell_ref(i, j)) {
            dom::fire(node, "click");
        }
        print_board(&format!("after clicking ({i}, {j})"), game);
    }

    if let Some(smiley) = node_of(game, "smileyButton") {
        dom::fire(smiley, "mousedown");
        println!("\nsmiley pressed: {}", dom::outer_html(smiley));
        dom::fire(smiley, "mouseup");
    }

    let bomb = with_board(game, |b| {
        (0..LINES)
            .flat_map(|i| (0..COLUMNS).map(move |j| (i, j)))
            .find(|&(i, j)| b.cells[i][j].is_bomb)
    })
    .flatten();
    if let Some((i, j)) = bomb {
        if let Some(node) = node_of(game, &cell_ref(i, j)) {
            dom::fire(node, "click");
        }
        print_board(&format!("after hitting the bomb at ({i}, {j})"), game);
    }

    if let Some(button) = node_of(page, "newGame") {
        dom::fire(button, "click");
    }
    print_board("after new game", game);
}
