/// Presentation layer: double-buffered, diff-based terminal renderer.
///
/// How it works:
///   1. Build the next frame into `front` buffer (array of Glyph)
///   2. Compare each glyph with `back` buffer (previous frame)
///   3. Only emit terminal commands for glyphs that changed
///   4. All commands are batched with `queue!`, flushed once at the end
///   5. Swap front/back
///
/// Level rows are stored bottom-up; the screen is top-down, so row `y` of
/// the level is drawn at `MAP_ROW + height - 1 - y`.

use std::io::{self, BufWriter, Write};

use crossterm::{
    cursor::{self, MoveTo},
    execute, queue,
    style::{Color, Print, ResetColor, SetBackgroundColor, SetForegroundColor},
    terminal::{self, Clear, ClearType},
};

use snakefall::domain::entity::{Cell, MoveDir};
use snakefall::domain::tile::Tile;
use snakefall::sim::world::{Phase, WorldState};

use super::playback::Playback;

// ── Glyph: the unit of the back-buffer ──

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
struct Glyph {
    ch: char,
    fg: Color,
    bg: Color,
}

impl Glyph {
    /// Explicit dark background for every "empty" terminal cell, so the
    /// gaps between rows match the cells on VTE terminals.
    const BASE_BG: Color = Color::Rgb { r: 22, g: 22, b: 35 };

    const BLANK: Glyph = Glyph { ch: ' ', fg: Color::White, bg: Glyph::BASE_BG };

    /// Sentinel used to invalidate the back buffer.
    /// Different from any real glyph, so every position will be diff'd.
    const INVALID: Glyph = Glyph { ch: '?', fg: Color::Magenta, bg: Color::Magenta };

    fn new(ch: char, fg: Color, bg: Color) -> Self {
        let bg = match bg {
            Color::Reset => Self::BASE_BG,
            other => other,
        };
        Glyph { ch, fg, bg }
    }
}

// ── FrameBuffer: a 2D grid of Glyphs ──

struct FrameBuffer {
    width: usize,
    height: usize,
    cells: Vec<Glyph>,
}

impl FrameBuffer {
    fn new(w: usize, h: usize) -> Self {
        FrameBuffer {
            width: w,
            height: h,
            cells: vec![Glyph::BLANK; w * h],
        }
    }

    fn resize(&mut self, w: usize, h: usize) {
        if self.width != w || self.height != h {
            self.width = w;
            self.height = h;
            self.cells = vec![Glyph::BLANK; w * h];
        }
    }

    fn clear(&mut self) {
        self.cells.fill(Glyph::BLANK);
    }

    fn set(&mut self, x: usize, y: usize, g: Glyph) {
        if x < self.width && y < self.height {
            self.cells[y * self.width + x] = g;
        }
    }

    fn get(&self, x: usize, y: usize) -> Glyph {
        if x < self.width && y < self.height {
            self.cells[y * self.width + x]
        } else {
            Glyph::BLANK
        }
    }

    /// Write a string at (x, y) with given colors. Each char occupies 1 column.
    fn put_str(&mut self, x: usize, y: usize, s: &str, fg: Color, bg: Color) {
        for (i, ch) in s.chars().enumerate() {
            if x + i >= self.width { break; }
            self.set(x + i, y, Glyph::new(ch, fg, bg));
        }
    }

    fn fill_row(&mut self, y: usize, bg: Color) {
        for x in 0..self.width {
            self.set(x, y, Glyph::new(' ', Color::White, bg));
        }
    }
}

/// What the front-end knows that the world does not.
pub struct Hud<'a> {
    pub level_index: usize,
    pub level_count: usize,
    pub pad_connected: bool,
    pub message: &'a str,
}

// ── Renderer ──

/// Each level cell is 2 terminal columns wide.
const CELL_W: usize = 2;

const HUD_ROW: usize = 0;
const MAP_ROW: usize = 2;
const MAP_COL: usize = 2;

const HUD_BG: Color = Color::Rgb { r: 20, g: 20, b: 60 };
const SNAKE_FG: Color = Color::Rgb { r: 90, g: 220, b: 90 };
const SNAKE_BG: Color = Color::Rgb { r: 30, g: 90, b: 30 };
const DEAD_FG: Color = Color::Rgb { r: 255, g: 80, b: 80 };
const DEAD_BG: Color = Color::Rgb { r: 90, g: 20, b: 20 };

pub struct Renderer {
    writer: BufWriter<io::Stdout>,
    front: FrameBuffer,
    back: FrameBuffer,
    term_w: usize,
    term_h: usize,
    last_phase: Option<Phase>,
}

impl Renderer {
    pub fn new() -> Self {
        Renderer {
            writer: BufWriter::with_capacity(16384, io::stdout()),
            front: FrameBuffer::new(0, 0),
            back: FrameBuffer::new(0, 0),
            term_w: 0,
            term_h: 0,
            last_phase: None,
        }
    }

    pub fn init(&mut self) -> io::Result<()> {
        terminal::enable_raw_mode()?;
        execute!(
            self.writer,
            terminal::EnterAlternateScreen,
            cursor::Hide,
            SetBackgroundColor(Glyph::BASE_BG),
            Clear(ClearType::All)
        )?;

        let (tw, th) = terminal::size().unwrap_or((80, 24));
        self.term_w = tw as usize;
        self.term_h = th as usize;
        self.front.resize(self.term_w, self.term_h);
        self.back.resize(self.term_w, self.term_h);
        self.invalidate();

        Ok(())
    }

    pub fn cleanup(&mut self) -> io::Result<()> {
        execute!(
            self.writer,
            ResetColor,
            cursor::Show,
            terminal::LeaveAlternateScreen
        )?;
        terminal::disable_raw_mode()
    }

    /// Force a full repaint on the next frame.
    pub fn invalidate(&mut self) {
        self.back.cells.fill(Glyph::INVALID);
    }

    pub fn render(&mut self, world: &WorldState, playback: &Playback, hud: &Hud) -> io::Result<()> {
        let (tw, th) = terminal::size().unwrap_or((80, 24));
        if tw as usize != self.term_w || th as usize != self.term_h {
            self.term_w = tw as usize;
            self.term_h = th as usize;
            self.front.resize(self.term_w, self.term_h);
            self.back.resize(self.term_w, self.term_h);
            self.invalidate();
            queue!(self.writer, SetBackgroundColor(Glyph::BASE_BG), Clear(ClearType::All))?;
        }

        // Phase change → clean slate (cards come and go)
        if self.last_phase != Some(world.phase) {
            self.invalidate();
            queue!(self.writer, SetBackgroundColor(Glyph::BASE_BG), Clear(ClearType::All))?;
            self.last_phase = Some(world.phase);
        }

        self.compose(world, playback, hud);
        self.flush_diff()?;
        std::mem::swap(&mut self.front, &mut self.back);
        Ok(())
    }

    // ── Diff flush: only write changed glyphs ──

    fn flush_diff(&mut self) -> io::Result<()> {
        let mut last_fg = Color::White;
        let mut last_bg = Glyph::BASE_BG;
        let mut cursor_at: Option<(usize, usize)> = None;

        // Explicit base colors; ResetColor would fall back to the
        // terminal's own default and leave line artifacts.
        queue!(self.writer,
            SetForegroundColor(Color::White),
            SetBackgroundColor(Glyph::BASE_BG),
        )?;

        for y in 0..self.front.height {
            for x in 0..self.front.width {
                let g = self.front.get(x, y);
                if g == self.back.get(x, y) {
                    continue;
                }
                if cursor_at != Some((x, y)) {
                    queue!(self.writer, MoveTo(x as u16, y as u16))?;
                }
                if g.fg != last_fg {
                    queue!(self.writer, SetForegroundColor(g.fg))?;
                    last_fg = g.fg;
                }
                if g.bg != last_bg {
                    queue!(self.writer, SetBackgroundColor(g.bg))?;
                    last_bg = g.bg;
                }
                queue!(self.writer, Print(g.ch))?;
                cursor_at = Some((x + 1, y));
            }
        }

        self.writer.flush()
    }

    // ── Compose: build front buffer content ──

    fn compose(&mut self, w: &WorldState, playback: &Playback, hud: &Hud) {
        self.front.clear();
        self.compose_hud(w, hud);

        for gy in 0..w.height {
            let row = MAP_ROW + (w.height - 1 - gy);
            if row >= self.front.height { break; }
            for gx in 0..w.width {
                let col = MAP_COL + gx * CELL_W;
                if col + 1 >= self.front.width { break; }
                self.compose_terrain(w, Cell::new(gx as i32, gy as i32), col, row);
            }
        }

        for &cell in w.pickups.keys() {
            self.put_cell(w, cell, ('<', '>'), Color::Rgb{r:255,g:90,b:90}, Color::Reset);
        }

        for rock in &w.rocks {
            let cell = playback.shown_rock(rock.id).unwrap_or(rock.cell);
            self.put_cell(w, cell, ('[', ']'), Color::Rgb{r:200,g:200,b:210}, Color::Rgb{r:70,g:70,b:80});
        }

        self.compose_snake(w, playback);

        let below_map = MAP_ROW + w.height + 1;
        if !hud.message.is_empty() {
            let msg = format!(" ◈ {} ", hud.message);
            self.front.fill_row(below_map, Color::Rgb{r:200,g:180,b:50});
            self.front.put_str(0, below_map, &msg, Color::Black, Color::Rgb{r:200,g:180,b:50});
        }
        let help = " ←↑↓→/WASD:Move  R:Restart  N/P:Level  Q:Quit";
        self.front.put_str(0, below_map + 2, help, Color::DarkGrey, Color::Reset);

        // End cards only once the board has caught up with the world
        if !playback.is_busy() {
            match w.phase {
                Phase::Dead => self.compose_card(w, &[
                    "╔══════════════════════╗",
                    "║     ✕  SPLAT  ✕      ║",
                    "║ ENTER: retry Q: quit ║",
                    "╚══════════════════════╝",
                ], DEAD_FG),
                Phase::Won => self.compose_card(w, &[
                    "╔══════════════════════╗",
                    "║   ★ LEVEL CLEAR ★    ║",
                    "║ ENTER: next  R: redo ║",
                    "╚══════════════════════╝",
                ], Color::Rgb{r:255,g:220,b:50}),
                _ => {}
            }
        }
    }

    fn compose_hud(&mut self, w: &WorldState, hud: &Hud) {
        let state = match w.phase {
            Phase::NotStarted => "",
            Phase::Running => {
                if w.goal_open() { "" } else { "GATE CLOSED" }
            }
            Phase::Finishing => "ESCAPING",
            Phase::Dead => "DEAD",
            Phase::Won => "CLEAR",
        };
        let eaten = w.pickups_total - w.pickups_remaining();
        let text = format!(
            " {}/{} {}  Moves:{:<4}  Apples:{}/{}  Length:{}  {} {}",
            hud.level_index + 1, hud.level_count, w.level_name,
            w.moves, eaten, w.pickups_total, w.snake.len(),
            state,
            if hud.pad_connected { "[PAD]" } else { "" },
        );
        self.front.fill_row(HUD_ROW, HUD_BG);
        self.front.put_str(0, HUD_ROW, &text, Color::White, HUD_BG);
    }

    fn compose_terrain(&mut self, w: &WorldState, cell: Cell, col: usize, row: usize) {
        let (c0, c1, fg, bg) = match w.terrain_at(cell) {
            Tile::Empty  => (' ', ' ', Color::Reset, Color::Reset),
            Tile::Wall   => ('█', '█', Color::Rgb{r:120,g:120,b:120}, Color::Rgb{r:70,g:70,b:70}),
            Tile::Ground => ('▓', '▓', Color::Rgb{r:180,g:120,b:60}, Color::Rgb{r:100,g:65,b:30}),
            Tile::Hazard => ('▲', '▲', Color::Rgb{r:255,g:60,b:60}, Color::Reset),
            Tile::Goal => {
                let fg = if w.goal_open() {
                    Color::Rgb{r:100,g:200,b:255}
                } else {
                    Color::DarkGrey
                };
                ('(', ')', fg, Color::Reset)
            }
        };
        self.front.set(col, row, Glyph::new(c0, fg, bg));
        self.front.set(col + 1, row, Glyph::new(c1, fg, bg));
    }

    fn compose_snake(&mut self, w: &WorldState, playback: &Playback) {
        let world_body;
        let body: &[Cell] = match playback.shown_snake() {
            Some(shown) => shown,
            None => {
                world_body = w.snake.cells();
                &world_body
            }
        };
        let dead = w.phase == Phase::Dead && !playback.is_busy();
        let (fg, bg) = if dead { (DEAD_FG, DEAD_BG) } else { (SNAKE_FG, SNAKE_BG) };

        // Tail first so the head wins if a cell is drawn twice
        for &seg in body.iter().skip(1).rev() {
            self.put_cell(w, seg, ('▒', '▒'), fg, bg);
        }
        if let Some(&head) = body.first() {
            let glyphs = match w.snake.facing {
                MoveDir::Up    => ('▲', '▲'),
                MoveDir::Down  => ('▼', '▼'),
                MoveDir::Left  => ('◀', '▒'),
                MoveDir::Right => ('▒', '▶'),
            };
            self.put_cell(w, head, glyphs, Color::White, bg);
        }
    }

    /// Draw a two-column glyph pair at a level cell. Cells off the level
    /// (a body mid-absorption never is, but stay safe) are skipped.
    fn put_cell(&mut self, w: &WorldState, cell: Cell, (c0, c1): (char, char), fg: Color, bg: Color) {
        if cell.x < 0 || cell.y < 0 || cell.x as usize >= w.width || cell.y as usize >= w.height {
            return;
        }
        let row = MAP_ROW + (w.height - 1 - cell.y as usize);
        let col = MAP_COL + cell.x as usize * CELL_W;
        self.front.set(col, row, Glyph::new(c0, fg, bg));
        self.front.set(col + 1, row, Glyph::new(c1, fg, bg));
    }

    fn compose_card(&mut self, w: &WorldState, lines: &[&str], fg: Color) {
        let card_w = lines.first().map_or(0, |l| l.chars().count());
        let map_w = w.width * CELL_W;
        let x = MAP_COL + map_w.saturating_sub(card_w) / 2;
        let y = MAP_ROW + (w.height.saturating_sub(lines.len())) / 2;
        for (i, line) in lines.iter().enumerate() {
            self.front.put_str(x, y + i, line, fg, Color::Rgb{r:30,g:30,b:45});
        }
    }
}
