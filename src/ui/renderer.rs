/// Presentation layer: double-buffered, diff-based terminal renderer.
///
/// How it works:
///   1. Build the next frame into `front` buffer (array of Cell)
///   2. Compare each cell with `back` buffer (previous frame)
///   3. Only emit terminal commands for cells that changed
///   4. All commands are batched with `queue!`, flushed once at the end
///   5. Swap front/back
///
/// Screen layout:
///
///   row 0        HUD (level, restored nodes, score)
///   rows 2..     left: map plot or puzzle panel   right: side panel
///   row h-2      last message
///   row h-1      key help for the current phase

use std::io::{self, BufWriter, Write};

use crossterm::{
    cursor::{self, MoveTo},
    execute, queue,
    style::{Color, Print, ResetColor, SetBackgroundColor, SetForegroundColor},
    terminal::{self, Clear, ClearType},
};

use crate::domain::ability::AbilityKind;
use crate::domain::anomaly::{AnomalyEffects, ObscuredRegion};
use crate::sim::session::{Phase, Session};

// ── Cell: the unit of the back-buffer ──

#[derive(Clone, Copy, PartialEq, Eq)]
struct Cell {
    ch: [u8; 4],
    ch_len: u8,
    fg: Color,
    bg: Color,
}

impl Cell {
    /// Explicit dark background for all "empty" terminal cells, so the
    /// `Clear` color and every cell's background match exactly.
    const BASE_BG: Color = Color::Rgb { r: 22, g: 22, b: 35 };

    const BLANK: Cell = Cell {
        ch: [b' ', 0, 0, 0],
        ch_len: 1,
        fg: Color::White,
        bg: Cell::BASE_BG,
    };

    /// Sentinel cell used to invalidate the back buffer.
    /// Different from any real cell, so every position will be diff'd.
    const INVALID: Cell = Cell {
        ch: [b'?', 0, 0, 0],
        ch_len: 1,
        fg: Color::Magenta,
        bg: Color::Magenta,
    };

    /// Normalize bg: Color::Reset → BASE_BG.
    #[inline]
    fn norm_bg(bg: Color) -> Color {
        match bg {
            Color::Reset => Self::BASE_BG,
            other => other,
        }
    }

    fn from_char(c: char, fg: Color, bg: Color) -> Self {
        let mut cell = Self::BLANK;
        cell.ch_len = c.encode_utf8(&mut cell.ch).len() as u8;
        cell.fg = fg;
        cell.bg = Self::norm_bg(bg);
        cell
    }

    fn as_str(&self) -> &str {
        std::str::from_utf8(&self.ch[..self.ch_len as usize]).unwrap_or(" ")
    }
}

// ── FrameBuffer: a 2D grid of Cells ──

struct FrameBuffer {
    width: usize,
    height: usize,
    cells: Vec<Cell>,
}

impl FrameBuffer {
    fn new(w: usize, h: usize) -> Self {
        FrameBuffer {
            width: w,
            height: h,
            cells: vec![Cell::BLANK; w * h],
        }
    }

    fn resize(&mut self, w: usize, h: usize) {
        if self.width != w || self.height != h {
            self.width = w;
            self.height = h;
            self.cells = vec![Cell::BLANK; w * h];
        }
    }

    fn clear(&mut self) {
        self.cells.fill(Cell::BLANK);
    }

    fn set(&mut self, x: usize, y: usize, cell: Cell) {
        if x < self.width && y < self.height {
            self.cells[y * self.width + x] = cell;
        }
    }

    fn get(&self, x: usize, y: usize) -> Cell {
        if x < self.width && y < self.height {
            self.cells[y * self.width + x]
        } else {
            Cell::BLANK
        }
    }

    /// Write a string at (x, y). Each char occupies 1 column.
    fn put_str(&mut self, x: usize, y: usize, s: &str, fg: Color, bg: Color) {
        let mut cx = x;
        for ch in s.chars() {
            if cx >= self.width {
                break;
            }
            self.set(cx, y, Cell::from_char(ch, fg, bg));
            cx += 1;
        }
    }

    fn fill(&mut self, area: Rect, bg: Color) {
        for y in area.y..area.y + area.h {
            for x in area.x..area.x + area.w {
                self.set(x, y, Cell::from_char(' ', Color::Reset, bg));
            }
        }
    }
}

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
struct Rect {
    x: usize,
    y: usize,
    w: usize,
    h: usize,
}

// ── Palette ──

const HDR: Color = Color::Rgb { r: 255, g: 220, b: 50 };
const KEY: Color = Color::Rgb { r: 100, g: 200, b: 255 };
const TEXT: Color = Color::Rgb { r: 200, g: 200, b: 210 };
const DIM: Color = Color::Rgb { r: 90, g: 90, b: 110 };
const GOOD: Color = Color::Rgb { r: 80, g: 255, b: 120 };
const WARN: Color = Color::Rgb { r: 255, g: 90, b: 90 };
const NOISE: Color = Color::Rgb { r: 220, g: 80, b: 220 };
const FOG: Color = Color::Rgb { r: 60, g: 60, b: 80 };
const PANEL_BG: Color = Color::Rgb { r: 32, g: 32, b: 50 };

const HUD_ROW: usize = 0;
const BODY_ROW: usize = 2;
const SIDE_W: usize = 30;

// ── Renderer ──

pub struct Renderer {
    writer: BufWriter<io::Stdout>,
    front: FrameBuffer,
    back: FrameBuffer,
    term_w: usize,
    term_h: usize,
    last_phase: Option<Phase>,
    anim_tick: u64,
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
            anim_tick: 0,
        }
    }

    pub fn init(&mut self) -> io::Result<()> {
        terminal::enable_raw_mode()?;
        execute!(
            self.writer,
            terminal::EnterAlternateScreen,
            cursor::Hide,
            SetBackgroundColor(Cell::BASE_BG),
            Clear(ClearType::All)
        )?;

        let (tw, th) = terminal::size().unwrap_or((80, 24));
        self.term_w = tw as usize;
        self.term_h = th as usize;
        self.front.resize(self.term_w, self.term_h);
        self.back.resize(self.term_w, self.term_h);
        // first frame repaints everything
        self.back.cells.fill(Cell::INVALID);

        Ok(())
    }

    pub fn cleanup(&mut self) -> io::Result<()> {
        execute!(self.writer, ResetColor, cursor::Show, terminal::LeaveAlternateScreen)?;
        terminal::disable_raw_mode()
    }

    pub fn render(&mut self, session: &Session, effects: &AnomalyEffects) -> io::Result<()> {
        self.anim_tick = self.anim_tick.wrapping_add(1);

        let (tw, th) = terminal::size().unwrap_or((80, 24));
        if tw as usize != self.term_w || th as usize != self.term_h {
            self.term_w = tw as usize;
            self.term_h = th as usize;
            self.front.resize(self.term_w, self.term_h);
            self.back.resize(self.term_w, self.term_h);
            self.back.cells.fill(Cell::INVALID);
            queue!(self.writer, SetBackgroundColor(Cell::BASE_BG), Clear(ClearType::All))?;
        }

        let phase = session.phase();
        if self.last_phase != Some(phase) {
            self.back.cells.fill(Cell::INVALID);
            queue!(self.writer, SetBackgroundColor(Cell::BASE_BG), Clear(ClearType::All))?;
            self.last_phase = Some(phase);
        }

        self.front.clear();

        let (main, side) = self.body_areas();
        self.compose_hud(session);
        match phase {
            Phase::MapView => self.compose_map(session, effects, main),
            Phase::Puzzle | Phase::Paused => self.compose_puzzle(session, effects, main),
            Phase::Story => self.compose_story(session, main),
            Phase::MapComplete => self.compose_map_complete(session, main),
        }
        if let Some(side) = side {
            self.compose_side_panel(session, effects, side);
        }
        self.compose_footer(session);

        if phase == Phase::Paused {
            self.compose_pause_overlay(main);
        }

        self.flush_diff()?;
        std::mem::swap(&mut self.front, &mut self.back);

        Ok(())
    }

    /// Main area and optional side panel, below the HUD and above the footer.
    fn body_areas(&self) -> (Rect, Option<Rect>) {
        let h = self.term_h.saturating_sub(BODY_ROW + 3);
        if self.term_w >= SIDE_W + 40 {
            let main = Rect { x: 0, y: BODY_ROW, w: self.term_w - SIDE_W - 1, h };
            let side = Rect { x: self.term_w - SIDE_W, y: BODY_ROW, w: SIDE_W, h };
            (main, Some(side))
        } else {
            (Rect { x: 0, y: BODY_ROW, w: self.term_w, h }, None)
        }
    }

    // ── Diff flush: only write changed cells ──

    fn flush_diff(&mut self) -> io::Result<()> {
        let mut last_fg = Color::White;
        let mut last_bg = Cell::BASE_BG;
        let mut need_move = true;
        let mut last_x: usize = 0;
        let mut last_y: usize = 0;

        // explicit base colors; ResetColor would fall back to the terminal default
        queue!(self.writer, SetForegroundColor(Color::White), SetBackgroundColor(Cell::BASE_BG))?;

        for y in 0..self.front.height {
            for x in 0..self.front.width {
                let cell = self.front.get(x, y);
                if cell == self.back.get(x, y) {
                    need_move = true;
                    continue;
                }

                if need_move || x != last_x + 1 || y != last_y {
                    queue!(self.writer, MoveTo(x as u16, y as u16))?;
                    need_move = false;
                }
                if cell.fg != last_fg {
                    queue!(self.writer, SetForegroundColor(cell.fg))?;
                    last_fg = cell.fg;
                }
                if cell.bg != last_bg {
                    queue!(self.writer, SetBackgroundColor(cell.bg))?;
                    last_bg = cell.bg;
                }

                queue!(self.writer, Print(cell.as_str()))?;
                last_x = x;
                last_y = y;
            }
        }

        self.writer.flush()
    }

    // ── Compose: build front buffer content ──

    fn compose_hud(&mut self, s: &Session) {
        let map = s.map();
        let stats = s.puzzles().stats();
        let hud = format!(
            " MNEMOCODEX  Level {:<3} Restored {}/{}  Score {:<7} Solved {}",
            s.level(),
            map.completed_nodes().len(),
            map.len(),
            stats.total_score,
            stats.puzzles_completed,
        );
        self.front.put_str(0, HUD_ROW, &hud, HDR, Color::Reset);
        let rule: String = "─".repeat(self.term_w);
        self.front.put_str(0, HUD_ROW + 1, &rule, DIM, Color::Reset);
    }

    fn compose_map(&mut self, s: &Session, effects: &AnomalyEffects, area: Rect) {
        if area.h < 4 || area.w < 10 {
            return;
        }
        let map = s.map();
        let plot = Rect { x: area.x + 1, y: area.y, w: area.w - 2, h: area.h - 2 };
        let selected = map.current_node();

        for node in map.nodes() {
            let (cx, cy) = to_cell(node.x, node.y, map.bounds(), plot);
            let (marker, fg) = if node.completed {
                ('◉', GOOD)
            } else if map.is_available(node.id) {
                ('○', HDR)
            } else {
                ('·', DIM)
            };
            let bg = if selected == Some(node.id) { PANEL_BG } else { Color::Reset };
            self.front.set(cx, cy, Cell::from_char(marker, fg, bg));
            self.front.put_str(cx + 1, cy, &node.id.to_string(), fg, bg);
        }

        self.compose_fog(effects, map.bounds(), plot, s.puzzles().abilities().vision_multiplier());

        if let Some(node) = selected.and_then(|id| map.node(id)) {
            let state = if node.completed {
                "restored"
            } else if map.is_available(node.id) {
                "available"
            } else {
                "locked"
            };
            let line = format!(
                "Memory {}  {}  difficulty {:.1}  {}",
                node.id,
                node.puzzle_kind.title(),
                node.difficulty,
                state
            );
            self.front.put_str(area.x + 1, area.y + area.h - 1, &line, TEXT, Color::Reset);
        }
    }

    /// Oblivion fog over `area`; peripheral vision shrinks every region.
    fn compose_fog(&mut self, effects: &AnomalyEffects, bounds: (f64, f64), area: Rect, vision: f64) {
        if effects.obscured_regions.is_empty() || area.w == 0 || area.h == 0 {
            return;
        }
        for y in area.y..area.y + area.h {
            for x in area.x..area.x + area.w {
                let (px, py) = to_plane(x, y, bounds, area);
                if effects.obscured_regions.iter().any(|r| obscures(r, px, py, vision)) {
                    self.front.set(x, y, Cell::from_char('░', FOG, Color::Reset));
                }
            }
        }
    }

    fn compose_puzzle(&mut self, s: &Session, effects: &AnomalyEffects, area: Rect) {
        let (Some(puzzle), Some(info)) = (s.current_puzzle(), s.puzzle_info()) else {
            return;
        };
        let x = area.x + 2;
        let mut y = area.y;

        let title = format!("⟪ {} ⟫  difficulty {:.2}", info.kind.title(), info.difficulty);
        self.front.put_str(x, y, &title, HDR, Color::Reset);
        y += 1;

        let bar_w = 24;
        if info.timer_active {
            let frac = if info.time_limit > 0.0 { info.remaining_time / info.time_limit } else { 0.0 };
            let fg = if frac < 0.25 { WARN } else { GOOD };
            let line = format!("{} {:>5.1}s", gauge(frac, bar_w), info.remaining_time);
            self.front.put_str(x, y, &line, fg, Color::Reset);
        } else {
            self.front.put_str(x, y, "timer starts after the demonstration", DIM, Color::Reset);
        }
        y += 1;

        let status = format!(
            "progress {:>3.0}%   attempts {}   hints {}/{}",
            info.progress * 100.0,
            info.attempts,
            info.hints_used,
            info.max_hints
        );
        self.front.put_str(x, y, &status, TEXT, Color::Reset);
        y += 2;

        let prompt_top = y;
        for line in puzzle.prompt().lines() {
            if y >= area.y + area.h {
                break;
            }
            self.front.put_str(x, y, line, Color::White, Color::Reset);
            y += 1;
        }

        if effects.show_distraction && !effects.false_information.is_empty() {
            let i = (self.anim_tick / 90) as usize % effects.false_information.len();
            let whisper = format!("» {}", effects.false_information[i]);
            self.front.put_str(x, y + 1, &whisper, NOISE, Color::Reset);
        }

        let prompt_area = Rect { x: area.x, y: prompt_top, w: area.w, h: (area.y + area.h).saturating_sub(prompt_top) };
        self.compose_fog(effects, s.map().bounds(), prompt_area, s.puzzles().abilities().vision_multiplier());
    }

    fn compose_story(&mut self, s: &Session, area: Rect) {
        let box_w = 56.min(area.w);
        let x = area.x + (area.w - box_w) / 2;
        let lines = wrap(s.story().unwrap_or(""), box_w.saturating_sub(4));
        let box_h = (lines.len() + 4).min(area.h);
        let y = area.y + area.h.saturating_sub(box_h) / 2;

        self.front.fill(Rect { x, y, w: box_w, h: box_h }, PANEL_BG);
        self.front.put_str(x + 2, y, "◈ A memory surfaces", HDR, PANEL_BG);
        for (i, line) in lines.iter().enumerate() {
            self.front.put_str(x + 2, y + 2 + i, line, TEXT, PANEL_BG);
        }
    }

    fn compose_map_complete(&mut self, s: &Session, area: Rect) {
        let box_art = [
            "╔══════════════════════════════════╗",
            "║   ★  MEMORY  MAP  RESTORED  ★    ║",
            "╚══════════════════════════════════╝",
        ];
        let x = area.x + 4;
        for (i, l) in box_art.iter().enumerate() {
            self.front.put_str(x, area.y + 2 + i, l, HDR, Color::Reset);
        }
        let stats = s.puzzles().stats();
        let lines = [
            format!("◈ Level {} complete", s.level()),
            format!("◈ Total score: {}", stats.total_score),
            format!("◈ Average time: {:.1}s", stats.average_time),
        ];
        for (i, l) in lines.iter().enumerate() {
            self.front.put_str(x + 2, area.y + 6 + i, l, Color::White, Color::Reset);
        }
        self.front.put_str(x + 2, area.y + 10, "▸ N / ENTER: next level", GOOD, Color::Reset);
    }

    fn compose_side_panel(&mut self, s: &Session, effects: &AnomalyEffects, area: Rect) {
        self.front.fill(area, PANEL_BG);
        let x = area.x + 1;
        let mut y = area.y;
        let abilities = s.puzzles().abilities();

        self.front.put_str(x, y, "ABILITIES", HDR, PANEL_BG);
        y += 1;
        for (key, kind) in ['Q', 'W', 'E'].into_iter().zip(AbilityKind::ALL) {
            let (status, fg) = if !abilities.is_unlocked(kind) {
                ("locked".to_string(), DIM)
            } else if abilities.is_active(kind) {
                ("active".to_string(), GOOD)
            } else {
                let cd = abilities.cooldown_remaining(kind);
                if cd > 0.0 {
                    (format!("{cd:.0}s"), TEXT)
                } else {
                    ("ready".to_string(), KEY)
                }
            };
            let line = format!("{key} {:<18}{status}", kind.title());
            self.front.put_str(x, y, &line, fg, PANEL_BG);
            y += 1;
        }
        let palace = abilities.palace();
        let line = format!("  palace {}/{}", palace.len(), palace.capacity());
        self.front.put_str(x, y, &line, DIM, PANEL_BG);
        y += 1;
        for (key, value) in palace.items() {
            let line: String = format!("   {key}: {value}").chars().take(area.w.saturating_sub(2)).collect();
            self.front.put_str(x, y, &line, TEXT, PANEL_BG);
            y += 1;
        }
        y += 1;

        self.front.put_str(x, y, "ANOMALIES", HDR, PANEL_BG);
        y += 1;
        let anomalies = s.puzzles().anomalies();
        let kinds = anomalies.active_kinds();
        if kinds.is_empty() {
            self.front.put_str(x, y, "none", DIM, PANEL_BG);
            y += 1;
        }
        for kind in kinds {
            let left = match anomalies.remaining(kind) {
                Some(Some(secs)) => format!("{secs:.0}s"),
                Some(None) => "until worn".to_string(),
                None => String::new(),
            };
            let line = format!("{:<12}{left}", kind.title());
            self.front.put_str(x, y, &line, WARN, PANEL_BG);
            y += 1;
        }
        if effects.difficulty_modifier > 0.0 {
            let line = format!("  difficulty +{:.2}", effects.difficulty_modifier);
            self.front.put_str(x, y, &line, DIM, PANEL_BG);
            y += 1;
        }
        y += 1;

        let stats = s.puzzles().stats();
        self.front.put_str(x, y, "PROFILE", HDR, PANEL_BG);
        y += 1;
        let strong: Vec<&str> = stats.strong_areas.iter().map(|k| k.title()).collect();
        let weak: Vec<&str> = stats.weak_areas.iter().map(|k| k.title()).collect();
        self.front.put_str(x, y, &format!("strong {}", strong.join(", ")), GOOD, PANEL_BG);
        self.front.put_str(x, y + 1, &format!("weak   {}", weak.join(", ")), WARN, PANEL_BG);
    }

    fn compose_footer(&mut self, s: &Session) {
        if self.term_h < 2 {
            return;
        }
        let msg_row = self.term_h - 2;
        let help_row = self.term_h - 1;
        if let Some(msg) = s.message() {
            self.front.put_str(1, msg_row, msg, Color::White, Color::Reset);
        }
        let help = match s.phase() {
            Phase::MapView => " ←→: Browse   SPACE/ENTER: Enter memory   Q/W/E: Abilities   Ctrl+C: Quit",
            Phase::Puzzle => " 0-9: Input   ⌫: Erase   ENTER: Confirm   H: Hint   Q/W/E: Abilities   ESC: Pause",
            Phase::Paused => " ESC: Resume   Ctrl+C: Quit",
            Phase::Story => " SPACE/ENTER: Continue",
            Phase::MapComplete => " N/ENTER: Next level   Ctrl+C: Quit",
        };
        self.front.put_str(0, help_row, help, DIM, Color::Reset);
    }

    fn compose_pause_overlay(&mut self, area: Rect) {
        let dim = Color::Rgb { r: 40, g: 40, b: 40 };
        let blink = (self.anim_tick / 30) % 2 == 0;

        let box_w = 30.min(area.w);
        let box_h = 7.min(area.h);
        let box_x = area.x + area.w.saturating_sub(box_w) / 2;
        let box_y = area.y + area.h.saturating_sub(box_h) / 2;
        self.front.fill(Rect { x: box_x, y: box_y, w: box_w, h: box_h }, dim);

        let label = if blink { "║  ▶  PAUSED  ◀  ║" } else { "║     PAUSED     ║" };
        self.front.put_str(box_x + 6, box_y, "╔════════════════╗", HDR, dim);
        self.front.put_str(box_x + 6, box_y + 1, label, HDR, dim);
        self.front.put_str(box_x + 6, box_y + 2, "╚════════════════╝", HDR, dim);
        self.front.put_str(box_x + 2, box_y + 4, "ESC     Resume", KEY, dim);
        self.front.put_str(box_x + 2, box_y + 5, "Ctrl+C  Quit", KEY, dim);
    }
}

/// Plane coordinates → cell inside `area`.
fn to_cell(px: f64, py: f64, (bw, bh): (f64, f64), area: Rect) -> (usize, usize) {
    let fx = if bw > 0.0 { (px / bw).clamp(0.0, 1.0) } else { 0.5 };
    let fy = if bh > 0.0 { (py / bh).clamp(0.0, 1.0) } else { 0.5 };
    let cx = area.x + (fx * area.w.saturating_sub(3) as f64).round() as usize;
    let cy = area.y + (fy * area.h.saturating_sub(1) as f64).round() as usize;
    (cx, cy)
}

/// Cell centre → plane coordinates.
fn to_plane(x: usize, y: usize, (bw, bh): (f64, f64), area: Rect) -> (f64, f64) {
    let fx = (x - area.x) as f64 + 0.5;
    let fy = (y - area.y) as f64 + 0.5;
    (fx / area.w as f64 * bw, fy / area.h as f64 * bh)
}

fn obscures(region: &ObscuredRegion, px: f64, py: f64, vision: f64) -> bool {
    let radius = region.radius as f64 / vision.max(1.0);
    let (dx, dy) = (px - region.x as f64, py - region.y as f64);
    dx * dx + dy * dy <= radius * radius
}

fn gauge(frac: f64, width: usize) -> String {
    let filled = (frac.clamp(0.0, 1.0) * width as f64).round() as usize;
    format!("{}{}", "█".repeat(filled), "░".repeat(width - filled))
}

/// Greedy word wrap; words longer than `width` get their own line.
fn wrap(text: &str, width: usize) -> Vec<String> {
    let mut lines = Vec::new();
    let mut line = String::new();
    for word in text.split_whitespace() {
        if !line.is_empty() && line.chars().count() + 1 + word.chars().count() > width {
            lines.push(std::mem::take(&mut line));
        }
        if !line.is_empty() {
            line.push(' ');
        }
        line.push_str(word);
    }
    if !line.is_empty() {
        lines.push(line);
    }
    lines
}
