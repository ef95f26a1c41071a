//! The Larger-than-Life engine.
//!
//! Advances rules of the form `R<range>,C<states>,M<middle>,S<min>..<max>,
//! B<min>..<max>,N<M|N|C>`: a radius-`range` neighbourhood (Moore square,
//! von Neumann diamond or inscribed circle), birth and survival count
//! ranges, and optional history states that make dying cells decay
//! through 2, 3, ... before disappearing.
//!
//! Cells live in a flat byte grid surrounded by a border of `range + 1`
//! dead (or, on a torus, temporarily copied) cells so the counting
//! kernels never test edges. Small ranges use direct convolution with a
//! sliding column window; larger ranges build a cumulative-sum table and
//! read each neighbourhood count with a handful of lookups.

mod kernels;

use crate::engine::{Edges, Engine, NullPoller, Poller};
use crate::error::{EngineError, RuleError};
use crate::topology::Topology;

/// Canonical form of Conway's Life in LtL syntax.
pub const DEFAULT_RULE: &str = "R1,C0,M0,S2..3,B3..3,NM";

const MAX_RANGE: i32 = 500;
/// Starting square-grid side for an unbounded universe; must be >= 2.
const DEFAULT_SIZE: i32 = 400;
/// Total cell count must stay below this so the population can't
/// overflow a 32-bit counter.
const MAX_CELLS: f64 = 100_000_000.0;

/// Below this range the direct von Neumann convolution beats the
/// cumulative-sum kernel's setup cost.
const SMALL_NN_RANGE: i32 = 4;
/// Ditto for the Moore neighbourhood.
const SMALL_MOORE_RANGE: i32 = 2;

pub struct LargerThanLife {
    canonical: String,

    population: u32,
    /// Grid dimensions in cells (interior when bounded).
    gwd: i32,
    ght: i32,
    gwdm1: i32,
    ghtm1: i32,
    /// Bounding box of live cells in grid coordinates (0-based), or the
    /// integer extremes when the grid is empty.
    minx: i32,
    miny: i32,
    maxx: i32,
    maxy: i32,
    /// Cell coordinates of the grid edges; the middle of the grid is
    /// near (0, 0).
    gtop: i32,
    gleft: i32,
    gbottom: i32,
    gright: i32,

    /// Current and next generation cell storage, sized
    /// `outerwd * outerht`. `next` is empty while the cumulative-sum
    /// kernels run in place.
    curr: Vec<u8>,
    next: Vec<u8>,
    /// Cumulative neighbourhood counts, when the faster kernels apply.
    colcounts: Option<Vec<i32>>,

    /// Border thickness around the interior grid (`range + 1`).
    border: i32,
    outerwd: i32,
    outerht: i32,
    outerbytes: usize,

    /// Half-width of the circle neighbourhood per row offset.
    shape: Vec<i32>,

    // kernel state shared with get_count
    ccht: i32,
    halfccwd: i32,
    nrows: i32,
    ncols: i32,

    // rule parameters
    range: i32,
    scount: i32,
    /// Include the centre cell in the neighbourhood count?
    middle: i32,
    min_s: i32,
    max_s: i32,
    min_b: i32,
    max_b: i32,
    /// Neighbourhood type: `M`, `N` or `C`.
    ntype: u8,
    /// Bounded topology: `T` or `P`.
    topology_kind: u8,
    unbounded: bool,
    /// Number of cell states (2, or `scount` when history is on).
    max_states: i32,

    cell_list: Vec<(i32, i32, u8)>,
    clipped_cells: Vec<(i32, i32, u8)>,
    show_warning: bool,

    generation: u64,
    increment: u64,
    topo: Topology,
    poller: Box<dyn Poller>,
}

impl Default for LargerThanLife {
    fn default() -> Self {
        Self::new()
    }
}

impl LargerThanLife {
    /// An empty unbounded universe running [`DEFAULT_RULE`].
    pub fn new() -> Self {
        let mut e = LargerThanLife {
            canonical: String::new(),
            population: 0,
            gwd: 0,
            ght: 0,
            gwdm1: 0,
            ghtm1: 0,
            minx: i32::MAX,
            miny: i32::MAX,
            maxx: i32::MIN,
            maxy: i32::MIN,
            gtop: 0,
            gleft: 0,
            gbottom: 0,
            gright: 0,
            curr: Vec::new(),
            next: Vec::new(),
            colcounts: None,
            border: 0,
            outerwd: 0,
            outerht: 0,
            outerbytes: 0,
            shape: Vec::new(),
            ccht: 0,
            halfccwd: 0,
            nrows: 0,
            ncols: 0,
            range: 1,
            scount: 0,
            middle: 0,
            min_s: 2,
            max_s: 3,
            min_b: 3,
            max_b: 3,
            ntype: b'M',
            topology_kind: b'T',
            unbounded: false,
            max_states: 2,
            cell_list: Vec::new(),
            clipped_cells: Vec::new(),
            show_warning: true,
            generation: 0,
            increment: 1,
            topo: Topology::unbounded(),
            poller: Box::new(NullPoller::new()),
        };
        e.create_grids(DEFAULT_SIZE, DEFAULT_SIZE);
        if e.set_rule(DEFAULT_RULE).is_err() {
            // unreachable: the default rule always parses
            log::error!("failed to install default LtL rule");
        }
        e
    }

    /// Install a replacement poller (host event hook).
    pub fn set_poller(&mut self, poller: Box<dyn Poller>) {
        self.poller = poller;
    }

    pub fn poller_mut(&mut self) -> &mut dyn Poller {
        self.poller.as_mut()
    }

    /// Reset the warning throttle after a pattern finishes loading.
    pub fn end_of_pattern(&mut self) {
        self.show_warning = true;
    }

    /// Live cells that fell outside the grid on the last rule change.
    pub fn clipped_cells(&self) -> &[(i32, i32, u8)] {
        &self.clipped_cells
    }

    /// Offset of interior cell (0, 0) within the outer storage.
    #[inline]
    fn goffset(&self) -> isize {
        if self.unbounded {
            0
        } else {
            (self.border * self.outerwd + self.border) as isize
        }
    }

    #[inline]
    fn cell_index(&self, gx: i32, gy: i32) -> usize {
        (self.goffset() + gy as isize * self.outerwd as isize + gx as isize) as usize
    }

    fn empty_boundaries(&mut self) {
        self.minx = i32::MAX;
        self.miny = i32::MAX;
        self.maxx = i32::MIN;
        self.maxy = i32::MIN;
    }

    fn allocate_colcounts(&mut self) {
        self.colcounts = match self.ntype {
            b'M' if self.range > SMALL_MOORE_RANGE => {
                Some(vec![0; self.outerbytes])
            }
            b'N' if self.range > SMALL_NN_RANGE => {
                // extra rows hold the diagonal sums' spill-over
                let len = self.outerwd as usize
                    * (self.outerht as usize + (self.outerwd as usize - 1) / 2);
                Some(vec![0; len])
            }
            _ => None, // direct convolution
        };
    }

    /// Allocate a bounded universe of the given interior size (also the
    /// backbone of the unbounded mode, which treats the whole allocation
    /// as interior).
    fn create_grids(&mut self, wd: i32, ht: i32) {
        self.gwd = wd;
        self.ght = ht;
        self.border = self.range + 1; // the extra 1 is needed by the cumulative kernels
        self.outerwd = self.gwd + self.border * 2;
        self.outerht = self.ght + self.border * 2;
        self.outerbytes = (self.outerwd as usize) * (self.outerht as usize);

        self.allocate_colcounts();

        self.curr = vec![0; self.outerbytes];
        // the cumulative kernels update in place and need no second grid
        self.next = if self.colcounts.is_none() {
            vec![0; self.outerbytes]
        } else {
            Vec::new()
        };

        self.gwdm1 = self.gwd - 1;
        self.ghtm1 = self.ght - 1;
        self.gtop = -(self.ght / 2);
        self.gleft = -(self.gwd / 2);
        self.gbottom = self.gtop + self.ghtm1;
        self.gright = self.gleft + self.gwdm1;

        if !self.unbounded {
            self.refresh_topology();
        }

        self.population = 0;
        self.empty_boundaries();
    }

    fn refresh_topology(&mut self) {
        let mut t = Topology::unbounded();
        if !self.unbounded {
            t.width = self.gwd as u32;
            t.height = self.ght as u32;
            t.bounded_plane = self.topology_kind == b'P';
            t.left = self.gleft;
            t.right = self.gright;
            t.top = self.gtop;
            t.bottom = self.gbottom;
        }
        self.topo = t;
    }

    /// Try to resize an unbounded universe by the given amounts
    /// (possibly negative), keeping the pattern in place.
    fn resize_grids(
        &mut self,
        up: i32,
        down: i32,
        left: i32,
        right: i32,
    ) -> Result<(), EngineError> {
        let newwd = self.gwd + left + right;
        let newht = self.ght + up + down;
        if f64::from(newwd) * f64::from(newht) > MAX_CELLS {
            return Err(EngineError::ExpansionLimit);
        }

        // new grid edges must stay within the editing limits
        let newtop = self.gtop - up;
        let newleft = self.gleft - left;
        let newbottom = newtop + newht - 1;
        let newright = newleft + newwd - 1;
        if newtop < -crate::topology::MAX_COORD
            || newleft < -crate::topology::MAX_COORD
            || newbottom > crate::topology::MAX_COORD
            || newright > crate::topology::MAX_COORD
        {
            return Err(EngineError::EditingLimit);
        }

        let newbytes = newwd as usize * newht as usize;
        let mut newcurr: Vec<u8> = Vec::new();
        let mut newnext: Vec<u8> = Vec::new();
        if newcurr.try_reserve_exact(newbytes).is_err()
            || newnext.try_reserve_exact(newbytes).is_err()
        {
            return Err(EngineError::ResizeFailed);
        }
        newcurr.resize(newbytes, 0);
        newnext.resize(newbytes, 0);

        // copy the pattern row by row into the shifted position
        if self.population > 0 {
            let ow = self.outerwd as usize;
            let xbytes = (self.maxx - self.minx + 1) as usize;
            for row in self.miny..=self.maxy {
                let src = row as usize * ow + self.minx as usize;
                let dst = (row + up) as usize * newwd as usize + (self.minx + left) as usize;
                newcurr[dst..dst + xbytes].copy_from_slice(&self.curr[src..src + xbytes]);
            }
            self.minx += left;
            self.maxx += left;
            self.miny += up;
            self.maxy += up;
        }

        self.curr = newcurr;
        self.next = newnext;
        self.outerwd = newwd;
        self.outerht = newht;
        self.gwd = newwd;
        self.ght = newht;
        self.outerbytes = newbytes;

        self.gwdm1 = self.gwd - 1;
        self.ghtm1 = self.ght - 1;
        self.gtop -= up;
        self.gleft -= left;
        self.gbottom = self.gtop + self.ghtm1;
        self.gright = self.gleft + self.gwdm1;

        self.allocate_colcounts();
        if self.colcounts.is_some() {
            self.next = Vec::new();
        }
        Ok(())
    }

    fn set_cell_impl(&mut self, x: i32, y: i32, newstate: u8) -> Result<(), EngineError> {
        if i32::from(newstate) >= self.max_states {
            return Err(EngineError::InvalidState);
        }

        if self.unbounded {
            if x < self.gleft || x > self.gright || y < self.gtop || y > self.gbottom {
                if self.population == 0 {
                    // just recentre the empty grid on x,y
                    self.gtop = y - self.ght / 2;
                    self.gleft = x - self.gwd / 2;
                    self.gbottom = self.gtop + self.ghtm1;
                    self.gright = self.gleft + self.gwdm1;
                } else {
                    let up = if y < self.gtop { self.gtop - y } else { 0 };
                    let mut down = if y > self.gbottom { y - self.gbottom } else { 0 };
                    let left = if x < self.gleft { self.gleft - x } else { 0 };
                    let mut right = if x > self.gright { x - self.gright } else { 0 };

                    // a +1 growth usually means a pattern file is being
                    // loaded row by row; over-grow to cut resize churn
                    if down == 1 {
                        down = 10;
                    }
                    if right == 1 {
                        right = 10;
                    }

                    if let Err(err) = self.resize_grids(up, down, left, right) {
                        if self.show_warning {
                            log::warn!("{err}");
                        }
                        // throttle repeated warnings until end_of_pattern
                        self.show_warning = false;
                        return Err(err);
                    }
                }
            }
        } else if x < self.gleft || x > self.gright || y < self.gtop || y > self.gbottom {
            return Err(EngineError::OutsideGrid);
        }

        let gx = x - self.gleft;
        let gy = y - self.gtop;
        let idx = self.cell_index(gx, gy);
        let oldstate = self.curr[idx];
        if newstate != oldstate {
            self.curr[idx] = newstate;
            if oldstate == 0 && newstate > 0 {
                self.population += 1;
                self.minx = self.minx.min(gx);
                self.maxx = self.maxx.max(gx);
                self.miny = self.miny.min(gy);
                self.maxy = self.maxy.max(gy);
            } else if oldstate > 0 && newstate == 0 {
                self.population -= 1;
                if self.population == 0 {
                    self.empty_boundaries();
                }
            }
        }
        Ok(())
    }

    fn get_cell_impl(&self, x: i32, y: i32) -> u8 {
        if x < self.gleft || x > self.gright || y < self.gtop || y > self.gbottom {
            return 0;
        }
        self.curr[self.cell_index(x - self.gleft, y - self.gtop)]
    }

    /// Save the current pattern before the grids are reallocated.
    fn save_cells(&mut self) {
        for gy in self.miny..=self.maxy {
            for gx in self.minx..=self.maxx {
                let state = self.curr[self.cell_index(gx, gy)];
                if state > 0 {
                    self.cell_list.push((gx + self.gleft, gy + self.gtop, state));
                }
            }
        }
    }

    /// Restore the saved pattern, remembering any cells that no longer
    /// fit so a host can offer to recover them.
    fn restore_cells(&mut self) {
        self.clipped_cells.clear();
        let saved = std::mem::take(&mut self.cell_list);
        for (x, y, state) in saved {
            if x < self.gleft || x > self.gright || y < self.gtop || y > self.gbottom {
                self.clipped_cells.push((x, y, state));
            } else if let Err(err) = self.set_cell_impl(x, y, state) {
                log::warn!("dropped cell at ({x},{y}): {err}");
            }
        }
    }

    /// Copy the bands of live cells that sit within `range` of a grid
    /// edge into the border next to the opposite edge. Only meaningful on
    /// a torus.
    fn copy_torus_bands(&mut self) {
        let ow = self.outerwd as usize;
        let g0 = self.goffset() as usize;
        let ght = self.ght as usize;
        let gwd = self.gwd as usize;
        let range = self.range;

        if self.miny < range {
            // top band to bottom border
            let numrows = (range - self.miny) as usize;
            let numcols = (self.maxx - self.minx + 1) as usize;
            let mut src = g0 + self.miny as usize * ow + self.minx as usize;
            let mut dst = src + ght * ow;
            for _ in 0..numrows {
                self.curr.copy_within(src..src + numcols, dst);
                src += ow;
                dst += ow;
            }
            if self.minx < range {
                // top left corner to bottom right border
                let numcols = (range - self.minx) as usize;
                let mut src = g0 + self.miny as usize * ow + self.minx as usize;
                let mut dst = src + ght * ow + gwd;
                for _ in 0..numrows {
                    self.curr.copy_within(src..src + numcols, dst);
                    src += ow;
                    dst += ow;
                }
            }
        }
        if self.maxy + range > self.ghtm1 {
            // bottom band to top border
            let numrows = (self.maxy + range - self.ghtm1) as usize;
            let numcols = (self.maxx - self.minx + 1) as usize;
            let mut src = g0 + (ght - range as usize) * ow + self.minx as usize;
            let mut dst = src - ght * ow;
            for _ in 0..numrows {
                self.curr.copy_within(src..src + numcols, dst);
                src += ow;
                dst += ow;
            }
            if self.maxx + range > self.gwdm1 {
                // bottom right corner to top left border
                let numcols = (self.maxx + range - self.gwdm1) as usize;
                let mut src = g0 + (ght - range as usize) * ow + gwd - range as usize;
                let mut dst = src - ght * ow - gwd;
                for _ in 0..numrows {
                    self.curr.copy_within(src..src + numcols, dst);
                    src += ow;
                    dst += ow;
                }
            }
        }
        if self.minx < range {
            // left band to right border
            let numrows = (self.maxy - self.miny + 1) as usize;
            let numcols = (range - self.minx) as usize;
            let mut src = g0 + self.miny as usize * ow + self.minx as usize;
            let mut dst = src + gwd;
            for _ in 0..numrows {
                self.curr.copy_within(src..src + numcols, dst);
                src += ow;
                dst += ow;
            }
            if self.maxy + range > self.ghtm1 {
                // bottom left corner to top right border
                let numrows = (self.maxy + range - self.ghtm1) as usize;
                let mut src = g0 + (ght - range as usize) * ow + self.minx as usize;
                let mut dst = src - ght * ow + gwd;
                for _ in 0..numrows {
                    self.curr.copy_within(src..src + numcols, dst);
                    src += ow;
                    dst += ow;
                }
            }
        }
        if self.maxx + range > self.gwdm1 {
            // right band to left border
            let numrows = (self.maxy - self.miny + 1) as usize;
            let numcols = (self.maxx + range - self.gwdm1) as usize;
            let mut src = g0 + self.miny as usize * ow + gwd - range as usize;
            let mut dst = src - gwd;
            for _ in 0..numrows {
                self.curr.copy_within(src..src + numcols, dst);
                src += ow;
                dst += ow;
            }
            if self.miny < range {
                // top right corner to bottom left border
                let numrows = (range - self.miny) as usize;
                let mut src = g0 + self.miny as usize * ow + gwd - range as usize;
                let mut dst = src + ght * ow - gwd;
                for _ in 0..numrows {
                    self.curr.copy_within(src..src + numcols, dst);
                    src += ow;
                    dst += ow;
                }
            }
        }
    }

    /// Zero the border bands written by [`Self::copy_torus_bands`], using
    /// the pattern limits saved before the kernels ran.
    fn clear_torus_bands(&mut self, sminx: i32, sminy: i32, smaxx: i32, smaxy: i32) {
        let ow = self.outerwd as usize;
        let g0 = self.goffset() as usize;
        let ght = self.ght as usize;
        let gwd = self.gwd as usize;
        let range = self.range;

        if sminy < range {
            let numrows = (range - sminy) as usize;
            let numcols = (smaxx - sminx + 1) as usize;
            let mut dst = g0 + sminy as usize * ow + sminx as usize + ght * ow;
            for _ in 0..numrows {
                self.curr[dst..dst + numcols].fill(0);
                dst += ow;
            }
            if sminx < range {
                let numcols = (range - sminx) as usize;
                let mut dst = g0 + sminy as usize * ow + sminx as usize + ght * ow + gwd;
                for _ in 0..numrows {
                    self.curr[dst..dst + numcols].fill(0);
                    dst += ow;
                }
            }
        }
        if smaxy + range > self.ghtm1 {
            let numrows = (smaxy + range - self.ghtm1) as usize;
            let numcols = (smaxx - sminx + 1) as usize;
            let mut dst = g0 + (ght - range as usize) * ow + sminx as usize - ght * ow;
            for _ in 0..numrows {
                self.curr[dst..dst + numcols].fill(0);
                dst += ow;
            }
            if smaxx + range > self.gwdm1 {
                let numcols = (smaxx + range - self.gwdm1) as usize;
                let mut dst =
                    g0 + (ght - range as usize) * ow + gwd - range as usize - ght * ow - gwd;
                for _ in 0..numrows {
                    self.curr[dst..dst + numcols].fill(0);
                    dst += ow;
                }
            }
        }
        if sminx < range {
            let numrows = (smaxy - sminy + 1) as usize;
            let numcols = (range - sminx) as usize;
            let mut dst = g0 + sminy as usize * ow + sminx as usize + gwd;
            for _ in 0..numrows {
                self.curr[dst..dst + numcols].fill(0);
                dst += ow;
            }
            if smaxy + range > self.ghtm1 {
                let numrows = (smaxy + range - self.ghtm1) as usize;
                let mut dst = g0 + (ght - range as usize) * ow + sminx as usize - ght * ow + gwd;
                for _ in 0..numrows {
                    self.curr[dst..dst + numcols].fill(0);
                    dst += ow;
                }
            }
        }
        if smaxx + range > self.gwdm1 {
            let numrows = (smaxy - sminy + 1) as usize;
            let numcols = (smaxx + range - self.gwdm1) as usize;
            let mut dst = g0 + sminy as usize * ow + gwd - range as usize - gwd;
            for _ in 0..numrows {
                self.curr[dst..dst + numcols].fill(0);
                dst += ow;
            }
            if sminy < range {
                let numrows = (range - sminy) as usize;
                let mut dst = g0 + sminy as usize * ow + gwd - range as usize + ght * ow - gwd;
                for _ in 0..numrows {
                    self.curr[dst..dst + numcols].fill(0);
                    dst += ow;
                }
            }
        }
    }

    /// One generation on a bounded grid.
    fn do_bounded_gen(&mut self) {
        // limit processing to the rectangle where births or deaths can
        // happen
        let torus = self.topology_kind == b'T';
        let (mut mincol, mut minrow, mut maxcol, mut maxrow);
        if self.min_b == 0 {
            // births everywhere, so process the entire grid
            mincol = 0;
            minrow = 0;
            maxcol = self.gwdm1;
            maxrow = self.ghtm1;
        } else {
            mincol = self.minx - self.range;
            minrow = self.miny - self.range;
            maxcol = self.maxx + self.range;
            maxrow = self.maxy + self.range;
            if mincol < 0 {
                mincol = 0;
                if torus {
                    maxcol = self.gwdm1;
                }
            }
            if maxcol > self.gwdm1 {
                maxcol = self.gwdm1;
                if torus {
                    mincol = 0;
                }
            }
            if minrow < 0 {
                minrow = 0;
                if torus {
                    maxrow = self.ghtm1;
                }
            }
            if maxrow > self.ghtm1 {
                maxrow = self.ghtm1;
                if torus {
                    minrow = 0;
                }
            }
        }

        // save pattern limits for clearing the border bands afterwards
        let (sminx, sminy, smaxx, smaxy) = (self.minx, self.miny, self.maxx, self.maxy);
        let had_cells = self.population > 0;

        if torus && had_cells {
            self.copy_torus_bands();
        }

        self.empty_boundaries();

        match self.ntype {
            b'M' => {
                if self.colcounts.is_some() {
                    if self.max_states == 2 {
                        self.faster_moore_bounded2(mincol, minrow, maxcol, maxrow);
                    } else {
                        self.faster_moore_bounded(mincol, minrow, maxcol, maxrow);
                    }
                } else {
                    self.fast_moore(mincol, minrow, maxcol, maxrow);
                }
            }
            b'N' => {
                if self.colcounts.is_some() {
                    self.faster_neumann_bounded(mincol, minrow, maxcol, maxrow);
                } else {
                    self.fast_neumann(mincol, minrow, maxcol, maxrow);
                }
            }
            _ => self.fast_shaped(mincol, minrow, maxcol, maxrow),
        }

        // the in-place kernels read the copied bands from curr, so those
        // borders must be zeroed again
        if self.colcounts.is_some() && torus && had_cells {
            self.clear_torus_bands(sminx, sminy, smaxx, smaxy);
        }
    }

    /// One generation on an unbounded grid; grows (and shrinks) the grid
    /// when the pattern approaches an edge.
    fn do_unbounded_gen(&mut self) -> Result<(), EngineError> {
        let mut mincol = self.minx - self.range;
        let mut minrow = self.miny - self.range;
        let mut maxcol = self.maxx + self.range;
        let mut maxrow = self.maxy + self.range;

        if mincol < self.range
            || maxcol > self.gwdm1 - self.range
            || minrow < self.range
            || maxrow > self.ghtm1 - self.range
        {
            let inc = MAX_RANGE * 2;
            let mut up = if minrow < self.range { inc } else { 0 };
            let mut down = if maxrow > self.ghtm1 - self.range { inc } else { 0 };
            let mut left = if mincol < self.range { inc } else { 0 };
            let mut right = if maxcol > self.gwdm1 - self.range { inc } else { 0 };

            // a moving pattern lets the trailing side shrink
            if up > 0 && down == 0 && maxrow < self.ghtm1 - self.range {
                down = -(self.ghtm1 - maxrow - self.range);
            }
            if down > 0 && up == 0 && minrow > self.range {
                up = -(minrow - self.range);
            }
            if left > 0 && right == 0 && maxcol < self.gwdm1 - self.range {
                right = -(self.gwdm1 - maxcol - self.range);
            }
            if right > 0 && left == 0 && mincol > self.range {
                left = -(mincol - self.range);
            }

            if let Err(err) = self.resize_grids(up, down, left, right) {
                log::warn!("{err}");
                return Err(err);
            }

            mincol = self.minx - self.range;
            minrow = self.miny - self.range;
            maxcol = self.maxx + self.range;
            maxrow = self.maxy + self.range;
        }

        self.empty_boundaries();

        match self.ntype {
            b'M' => {
                if self.colcounts.is_some() {
                    if self.max_states == 2 {
                        self.faster_moore_unbounded2(mincol, minrow, maxcol, maxrow);
                    } else {
                        self.faster_moore_unbounded(mincol, minrow, maxcol, maxrow);
                    }
                } else {
                    self.fast_moore(mincol, minrow, maxcol, maxrow);
                }
            }
            b'N' => {
                if self.colcounts.is_some() {
                    self.faster_neumann_unbounded(mincol, minrow, maxcol, maxrow);
                } else {
                    self.fast_neumann(mincol, minrow, maxcol, maxrow);
                }
            }
            _ => self.fast_shaped(mincol, minrow, maxcol, maxrow),
        }
        Ok(())
    }

    fn step_inner(&mut self) -> Result<(), EngineError> {
        let mut t = self.increment;
        while t != 0 {
            if self.population > 0 || self.min_b == 0 {
                let prevpop = self.population;

                if self.unbounded {
                    if let Err(err) = self.do_unbounded_gen() {
                        // failed to resize, so stop generating
                        self.poller.set_interrupted();
                        return Err(err);
                    }
                } else {
                    self.do_bounded_gen();
                }

                // the convolution kernels wrote into next; swap and wipe
                if !self.next.is_empty() {
                    std::mem::swap(&mut self.curr, &mut self.next);
                    if prevpop > 0 {
                        self.next.fill(0);
                    }
                }
            }

            self.generation += 1;

            // a safe place to notice user events
            if self.poller.poll() {
                return Ok(());
            }

            t -= 1;
            if t > self.increment {
                t = self.increment;
            }
        }
        Ok(())
    }
}

/// Parsed authoritative `R,C,M,S,B,N` fields plus where parsing stopped.
struct LtlSpec {
    r: i32,
    c: i32,
    m: i32,
    s1: i32,
    s2: i32,
    b1: i32,
    b2: i32,
    n: u8,
    end: usize,
}

fn scan_int(bytes: &[u8], pos: &mut usize) -> Option<i32> {
    let mut p = *pos;
    let neg = bytes.get(p) == Some(&b'-');
    if neg {
        p += 1;
    }
    let start = p;
    let mut value: i64 = 0;
    while let Some(d @ b'0'..=b'9') = bytes.get(p) {
        value = (10 * value + i64::from(d - b'0')).min(i64::from(i32::MAX));
        p += 1;
    }
    if p == start {
        return None;
    }
    *pos = p;
    Some(if neg { -(value as i32) } else { value as i32 })
}

fn scan_lit(bytes: &[u8], pos: &mut usize, lit: &[u8]) -> bool {
    if bytes[*pos..].starts_with(lit) {
        *pos += lit.len();
        true
    } else {
        false
    }
}

fn parse_ltl_spec(s: &str) -> Option<LtlSpec> {
    let bytes = s.as_bytes();
    let mut p = 0;

    // authoritative syntax: R%d,C%d,M%d,S%d..%d,B%d..%d,N%c
    let authoritative = (|| {
        let mut p = 0;
        if !scan_lit(bytes, &mut p, b"R") {
            return None;
        }
        let r = scan_int(bytes, &mut p)?;
        if !scan_lit(bytes, &mut p, b",C") {
            return None;
        }
        let c = scan_int(bytes, &mut p)?;
        if !scan_lit(bytes, &mut p, b",M") {
            return None;
        }
        let m = scan_int(bytes, &mut p)?;
        if !scan_lit(bytes, &mut p, b",S") {
            return None;
        }
        let s1 = scan_int(bytes, &mut p)?;
        if !scan_lit(bytes, &mut p, b"..") {
            return None;
        }
        let s2 = scan_int(bytes, &mut p)?;
        if !scan_lit(bytes, &mut p, b",B") {
            return None;
        }
        let b1 = scan_int(bytes, &mut p)?;
        if !scan_lit(bytes, &mut p, b"..") {
            return None;
        }
        let b2 = scan_int(bytes, &mut p)?;
        if !scan_lit(bytes, &mut p, b",N") {
            return None;
        }
        let n = *bytes.get(p)?;
        p += 1;
        Some(LtlSpec {
            r,
            c,
            m,
            s1,
            s2,
            b1,
            b2,
            n,
            end: p,
        })
    })();
    if authoritative.is_some() {
        return authoritative;
    }

    // legacy five-number syntax: R,B,B,S,S
    // eg. 5,34,45,34,58 means R5,C0,M1,S34..58,B34..45,NM
    let r = scan_int(bytes, &mut p)?;
    if !scan_lit(bytes, &mut p, b",") {
        return None;
    }
    let b1 = scan_int(bytes, &mut p)?;
    if !scan_lit(bytes, &mut p, b",") {
        return None;
    }
    let b2 = scan_int(bytes, &mut p)?;
    if !scan_lit(bytes, &mut p, b",") {
        return None;
    }
    let s1 = scan_int(bytes, &mut p)?;
    if !scan_lit(bytes, &mut p, b",") {
        return None;
    }
    let s2 = scan_int(bytes, &mut p)?;
    Some(LtlSpec {
        r,
        c: 0,
        m: 1,
        s1,
        s2,
        b1,
        b2,
        n: b'M',
        end: p,
    })
}

impl Engine for LargerThanLife {
    /// Switch to the given rule if it is valid.
    fn set_rule(&mut self, s: &str) -> Result<(), RuleError> {
        let spec = parse_ltl_spec(s).ok_or(RuleError::LtlSyntax)?;
        let LtlSpec {
            r,
            c,
            m,
            s1,
            s2,
            b1,
            b2,
            n,
            end,
        } = spec;

        if r < 1 {
            return Err(RuleError::RangeTooSmall);
        }
        if r > MAX_RANGE {
            return Err(RuleError::RangeTooBig);
        }
        let r2 = r * r + r;
        if !(0..=255).contains(&c) {
            return Err(RuleError::StatesRange);
        }
        if !(0..=1).contains(&m) {
            return Err(RuleError::MiddleRange);
        }
        if s1 > s2 {
            return Err(RuleError::SurvivalOrder);
        }
        if b1 > b2 {
            return Err(RuleError::BirthOrder);
        }
        if n != b'M' && n != b'N' && n != b'C' {
            return Err(RuleError::BadLtlNeighborhood);
        }
        let mut maxn = if n == b'M' {
            (2 * r + 1) * (2 * r + 1)
        } else {
            2 * r * (r + 1) + 1
        };
        let mut tshape = Vec::new();
        if n == b'C' {
            // lattice points within the inscribed circle, as a per-row
            // half-width table
            let mut cnt = 0;
            for i in -r..=r {
                let mut w = 0;
                while (w + 1) * (w + 1) + i * i <= r2 {
                    w += 1;
                }
                tshape.push(w);
                cnt += 2 * w + 1;
            }
            maxn = cnt;
        }
        if s1 < 0 || s1 > maxn || s2 < 0 || s2 > maxn {
            return Err(RuleError::SurvivalTooBig);
        }
        if b1 < 0 || b1 > maxn || b2 < 0 || b2 > maxn {
            return Err(RuleError::BirthTooBig);
        }
        let rest = &s[end..];
        if !rest.is_empty() && !rest.starts_with(':') {
            return Err(RuleError::BadSuffix);
        }

        let mut t = b'T';
        let mut newwd = DEFAULT_SIZE;
        let mut newht = DEFAULT_SIZE;

        let suffix = rest.strip_prefix(':');
        if let Some(sfx) = suffix {
            let sb = sfx.as_bytes();
            if !sb.is_empty() {
                t = match sb[0] {
                    b'T' | b't' => b'T',
                    b'P' | b'p' => b'P',
                    _ => return Err(RuleError::BadLtlTopology),
                };
                if sb.len() > 1 {
                    let mut p = 1;
                    newwd = scan_int(sb, &mut p).ok_or(RuleError::BadGridSize)?;
                    if scan_lit(sb, &mut p, b",") {
                        if p == sb.len() {
                            // dangling comma after the width is allowed,
                            // matching the bounded-grid suffix grammar
                            newht = newwd;
                        } else {
                            newht = scan_int(sb, &mut p).ok_or(RuleError::BadGridSize)?;
                            if p != sb.len() {
                                return Err(RuleError::TrailingSuffix);
                            }
                        }
                    } else if p == sb.len() {
                        newht = newwd;
                    } else {
                        return Err(RuleError::TrailingSuffix);
                    }
                }
                if f64::from(newwd) * f64::from(newht) > MAX_CELLS {
                    return Err(RuleError::GridTooBig);
                }
            }
        } else {
            // no suffix means an unbounded universe
            if b1 == 0 {
                return Err(RuleError::B0Unbounded);
            }
        }

        // the given rule is valid
        let oldrange = self.range;
        let oldtype = self.ntype;
        self.range = r;
        self.scount = c;
        self.middle = m;
        self.min_s = s1;
        self.max_s = s2;
        self.min_b = b1;
        self.max_b = b2;
        self.ntype = n;
        self.topology_kind = t;
        self.shape = tshape;

        if suffix.is_some() {
            // bounded universe
            let minsize = 2 * self.range;
            let newwd = newwd.max(minsize);
            let newht = newht.max(minsize);

            // a changed size, range or neighbourhood needs new grids
            if self.gwd != newwd
                || self.ght != newht
                || self.range != oldrange
                || self.ntype != oldtype
                || self.unbounded
            {
                if self.population > 0 {
                    self.save_cells();
                }
                self.unbounded = false;
                self.create_grids(newwd, newht);
                if !self.cell_list.is_empty() {
                    self.restore_cells();
                }
            }
            self.unbounded = false;
            self.refresh_topology();
        } else {
            self.unbounded = true;

            // a previously bounded universe keeps its outer allocation;
            // just shift the pattern bookkeeping into it
            if self.gwd < self.outerwd {
                if self.population > 0 {
                    self.minx += self.border;
                    self.maxx += self.border;
                    self.miny += self.border;
                    self.maxy += self.border;
                }
                self.gwd = self.outerwd;
                self.ght = self.outerht;
                self.gwdm1 = self.gwd - 1;
                self.ghtm1 = self.ght - 1;
                self.gtop -= self.border;
                self.gleft -= self.border;
                self.gbottom = self.gtop + self.ghtm1;
                self.gright = self.gleft + self.gwdm1;
            }

            if self.ntype != oldtype || self.range != oldrange {
                self.allocate_colcounts();
            }

            if self.colcounts.is_none() && self.next.is_empty() {
                self.next = vec![0; self.outerbytes];
            }
            if self.colcounts.is_some() && !self.next.is_empty() {
                // the cumulative kernels run in place
                self.next = Vec::new();
            }
            self.refresh_topology();
        }

        // states above 2 turn on history decay
        if self.scount > 2 {
            self.max_states = self.scount;
        } else {
            self.max_states = 2;
            self.scount = 0; // show C0 in the canonical rule
        }

        self.canonical = if self.unbounded {
            format!(
                "R{},C{},M{},S{}..{},B{}..{},N{}",
                self.range,
                self.scount,
                self.middle,
                self.min_s,
                self.max_s,
                self.min_b,
                self.max_b,
                self.ntype as char
            )
        } else {
            format!(
                "R{},C{},M{},S{}..{},B{}..{},N{}:{}{},{}",
                self.range,
                self.scount,
                self.middle,
                self.min_s,
                self.max_s,
                self.min_b,
                self.max_b,
                self.ntype as char,
                self.topology_kind as char,
                self.gwd,
                self.ght
            )
        };

        // the kernels count the centre cell, so an excluded middle shifts
        // the survival window up by one
        if self.middle == 0 {
            self.min_s += 1;
            self.max_s += 1;
        }

        Ok(())
    }

    fn rule(&self) -> &str {
        &self.canonical
    }

    fn step(&mut self) -> Result<(), EngineError> {
        if self.poller.is_calculating() {
            return Err(EngineError::Recursed);
        }
        self.poller.set_calculating(true);
        let result = self.step_inner();
        self.poller.set_calculating(false);
        result
    }

    fn set_cell(&mut self, x: i32, y: i32, state: u8) -> Result<(), EngineError> {
        self.set_cell_impl(x, y, state)
    }

    fn get_cell(&mut self, x: i32, y: i32) -> u8 {
        self.get_cell_impl(x, y)
    }

    fn next_cell(&mut self, x: i32, y: i32) -> Option<(i32, u8)> {
        if x < self.gleft || x > self.gright || y < self.gtop || y > self.gbottom {
            return None;
        }
        let mut idx = self.cell_index(x - self.gleft, y - self.gtop);
        let mut d = 0;
        let mut x = x;
        while x <= self.gright {
            let v = self.curr[idx];
            if v > 0 {
                return Some((d, v));
            }
            d += 1;
            idx += 1;
            x += 1;
        }
        None
    }

    fn find_edges(&mut self) -> Option<Edges> {
        if self.population == 0 {
            return None;
        }
        Some(Edges {
            top: self.gtop + self.miny,
            left: self.gleft + self.minx,
            bottom: self.gtop + self.maxy,
            right: self.gleft + self.maxx,
        })
    }

    fn population(&mut self) -> u64 {
        u64::from(self.population)
    }

    fn is_empty(&mut self) -> bool {
        self.population == 0
    }

    fn num_cell_states(&self) -> usize {
        self.max_states as usize
    }

    fn generation(&self) -> u64 {
        self.generation
    }

    fn set_generation(&mut self, generation: u64) {
        self.generation = generation;
    }

    fn increment(&self) -> u64 {
        self.increment
    }

    fn set_increment(&mut self, inc: u64) {
        self.increment = inc;
    }

    fn topology(&self) -> &Topology {
        &self.topo
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn engine(rule: &str) -> LargerThanLife {
        let mut e = LargerThanLife::new();
        e.set_rule(rule).unwrap();
        e
    }

    #[test]
    fn test_default_rule_round_trips() {
        let e = LargerThanLife::new();
        assert_eq!(e.rule(), DEFAULT_RULE);
        assert!(e.topology().is_unbounded());
    }

    #[test]
    fn test_legacy_syntax_is_accepted() {
        let e = engine("5,34,45,34,58");
        assert_eq!(e.rule(), "R5,C0,M1,S34..58,B34..45,NM");
    }

    #[test]
    fn test_canonical_includes_bounded_suffix() {
        let e = engine("R2,C0,M1,S5..8,B6..7,NM:T70,40");
        assert_eq!(e.rule(), "R2,C0,M1,S5..8,B6..7,NM:T70,40");
        let t = e.topo;
        assert_eq!((t.width, t.height), (70, 40));
        let e = engine("R2,C0,M1,S5..8,B6..7,NM:P30");
        assert_eq!(e.rule(), "R2,C0,M1,S5..8,B6..7,NM:P30,30");
    }

    #[test]
    fn test_rule_rejections() {
        use RuleError::*;
        let mut e = LargerThanLife::new();
        for (rule, err) in [
            ("bogus", LtlSyntax),
            ("R0,C0,M0,S2..3,B3..3,NM", RangeTooSmall),
            ("R501,C0,M0,S2..3,B3..3,NM", RangeTooBig),
            ("R1,C256,M0,S2..3,B3..3,NM", StatesRange),
            ("R1,C0,M2,S2..3,B3..3,NM", MiddleRange),
            ("R1,C0,M0,S3..2,B3..3,NM", SurvivalOrder),
            ("R1,C0,M0,S2..3,B4..3,NM", BirthOrder),
            ("R1,C0,M0,S2..3,B3..3,NX", BadLtlNeighborhood),
            ("R1,C0,M0,S2..10,B3..3,NM", SurvivalTooBig),
            ("R1,C0,M0,S2..3,B3..99,NM", BirthTooBig),
            ("R1,C0,M0,S2..3,B3..3,NMx", BadSuffix),
            ("R1,C0,M0,S2..3,B3..3,NM:X5", BadLtlTopology),
            ("R1,C0,M0,S2..3,B3..3,NM:T5,5,5", TrailingSuffix),
            ("R1,C0,M0,S2..3,B0..3,NM", B0Unbounded),
            ("R10,C0,M0,S2..3,B3..3,NM:T20000,20000", GridTooBig),
        ] {
            assert_eq!(e.set_rule(rule).unwrap_err(), err, "{rule:?}");
        }
        // a failed parse must leave the old rule intact
        assert_eq!(e.rule(), DEFAULT_RULE);
    }

    #[test]
    fn test_circle_neighborhood_count() {
        // R5 circle: shape rows and the resulting neighbourhood size
        let e = engine("R5,C0,M1,S1..5,B2..5,NC");
        assert_eq!(e.shape.len(), 11);
        let total: i32 = e.shape.iter().map(|w| 2 * w + 1).sum();
        let r2 = 5 * 5 + 5;
        let mut expect = 0;
        for dy in -5i32..=5 {
            for dx in -5i32..=5 {
                if dx * dx + dy * dy <= r2 {
                    expect += 1;
                }
            }
        }
        assert_eq!(total, expect);
    }

    #[test]
    fn test_set_get_cell_bounded() {
        let mut e = engine("R1,C0,M0,S2..3,B3..3,NM:T40,40");
        assert_eq!(e.set_cell(0, 0, 1), Ok(()));
        assert_eq!(e.get_cell(0, 0), 1);
        assert_eq!(e.set_cell(100, 0, 1), Err(EngineError::OutsideGrid));
        assert_eq!(e.set_cell(0, 0, 2), Err(EngineError::InvalidState));
        assert_eq!(e.population(), 1);
        e.set_cell(0, 0, 0).unwrap();
        assert!(e.is_empty());
    }

    #[test]
    fn test_unbounded_grid_recentres_on_first_cell() {
        let mut e = LargerThanLife::new();
        e.set_cell(5000, -7000, 1).unwrap();
        assert_eq!(e.get_cell(5000, -7000), 1);
        assert_eq!(e.population(), 1);
    }

    #[test]
    fn test_life_blinker_on_all_kernels() {
        // the same blinker must oscillate under every kernel choice that
        // can express B3/S23 semantics
        for rule in [
            "R1,C0,M0,S2..3,B3..3,NM",          // fast_Moore
            "R1,C0,M0,S2..3,B3..3,NM:T50,50",   // fast_Moore bounded
        ] {
            let mut e = engine(rule);
            for x in -1..=1 {
                e.set_cell(x, 0, 1).unwrap();
            }
            e.step().unwrap();
            for y in -1..=1 {
                assert_eq!(e.get_cell(0, y), 1, "{rule} y={y}");
            }
            assert_eq!(e.get_cell(-1, 0), 0, "{rule}");
            assert_eq!(e.population(), 3, "{rule}");
            e.step().unwrap();
            for x in -1..=1 {
                assert_eq!(e.get_cell(x, 0), 1, "{rule} x={x}");
            }
        }
    }

    #[test]
    fn test_faster_moore_matches_reference() {
        // same pattern, same rule semantics, two kernel families:
        // R3 uses the cumulative-sum table, and an equivalent R3 run is
        // checked cell by cell against a direct convolution reference
        let seed: &[(i32, i32)] = &[
            (0, 0), (1, 0), (2, 0), (4, 1), (-3, 2), (0, 2), (1, 3), (-2, -2),
            (3, -1), (-4, 0), (2, 2), (0, -3), (-1, -1), (5, 5), (-5, 4),
        ];
        let mut fast = engine("R3,C0,M1,S14..20,B15..17,NM:T40,40");
        assert!(fast.colcounts.is_some());
        for &(x, y) in seed {
            fast.set_cell(x, y, 1).unwrap();
        }
        // reference: count neighbours by brute force on a copy
        let mut reference = std::collections::HashSet::new();
        for y in -20..20 {
            for x in -20..20 {
                let mut n = 0;
                for dy in -3i32..=3 {
                    for dx in -3i32..=3 {
                        let wx = (x + dx + 60) % 40 - 20;
                        let wy = (y + dy + 60) % 40 - 20;
                        if seed.contains(&(wx, wy)) {
                            n += 1;
                        }
                    }
                }
                let alive = seed.contains(&(x, y));
                if alive {
                    if (14..=20).contains(&n) {
                        reference.insert((x, y));
                    }
                } else if (15..=17).contains(&n) {
                    reference.insert((x, y));
                }
            }
        }
        fast.step().unwrap();
        for y in -20..20 {
            for x in -20..20 {
                assert_eq!(
                    fast.get_cell(x, y) == 1,
                    reference.contains(&(x, y)),
                    "({x},{y})"
                );
            }
        }
    }

    #[test]
    fn test_history_states_decay() {
        // C5: a cell that fails survival decays 1 -> 2 -> 3 -> 4 -> 0
        let mut e = engine("R1,C5,M0,S8..8,B3..3,NM:P20,20");
        e.set_cell(0, 0, 1).unwrap();
        assert_eq!(e.num_cell_states(), 5);
        e.step().unwrap();
        assert_eq!(e.get_cell(0, 0), 2);
        e.step().unwrap();
        assert_eq!(e.get_cell(0, 0), 3);
        e.step().unwrap();
        assert_eq!(e.get_cell(0, 0), 4);
        e.step().unwrap();
        assert_eq!(e.get_cell(0, 0), 0);
        assert_eq!(e.population(), 0);
    }

    #[test]
    fn test_history_states_count_only_state_one() {
        // decaying cells must not contribute to neighbour counts: a lone
        // state-2 cell next to a pair cannot complete a birth triple
        let mut e = engine("R1,C3,M0,S2..3,B3..3,NM:P20,20");
        e.set_cell(0, 0, 2).unwrap();
        e.set_cell(1, 0, 1).unwrap();
        e.set_cell(2, 0, 1).unwrap();
        e.step().unwrap();
        // no birth at (1,1)/(1,-1): only two state-1 neighbours there
        assert_eq!(e.get_cell(1, 1), 0);
        assert_eq!(e.get_cell(1, -1), 0);
    }

    #[test]
    fn test_torus_band_wrapping() {
        // a blinker pushed against the torus edge wraps its influence
        let mut e = engine("R1,C0,M0,S2..3,B3..3,NM:T10,10");
        let left = e.topo.left;
        for dy in -1..=1 {
            e.set_cell(left, dy, 1).unwrap();
        }
        e.step().unwrap();
        // vertical blinker flips to horizontal across the seam
        assert_eq!(e.get_cell(left, 0), 1);
        assert_eq!(e.get_cell(left + 1, 0), 1);
        assert_eq!(e.get_cell(e.topo.right, 0), 1);
        assert_eq!(e.population(), 3);
        // and the borders hold no residue
        let t = e.topo;
        let mut ee = e;
        for x in t.left - 1..=t.right + 1 {
            assert_eq!(ee.get_cell(x, t.top - 1), 0);
            assert_eq!(ee.get_cell(x, t.bottom + 1), 0);
        }
    }

    #[test]
    fn test_unbounded_expansion_and_shrink() {
        // a pattern drifting right grows the grid ahead of itself
        let mut e = engine("R1,C0,M0,S2..3,B3..3,NM");
        // glider heading south-east
        for &(x, y) in &[(1, 0), (2, 1), (0, 2), (1, 2), (2, 2)] {
            e.set_cell(x, y, 1).unwrap();
        }
        e.set_increment(1000);
        e.step().unwrap();
        assert_eq!(e.population(), 5);
        assert_eq!(e.get_cell(1 + 250, 0 + 250), 1);
    }

    #[test]
    fn test_rule_change_preserves_pattern() {
        let mut e = engine("R1,C0,M0,S2..3,B3..3,NM:T40,40");
        for &(x, y) in &[(0, 0), (1, 0), (0, 1), (1, 1)] {
            e.set_cell(x, y, 1).unwrap();
        }
        // same rule, bigger grid: cells must survive the reallocation
        e.set_rule("R1,C0,M0,S2..3,B3..3,NM:T60,60").unwrap();
        assert_eq!(e.population(), 4);
        assert_eq!(e.get_cell(0, 0), 1);
        assert_eq!(e.get_cell(1, 1), 1);
        // shrinking clips cells that no longer fit
        e.set_rule("R1,C0,M0,S2..3,B3..3,NM:T2,2").unwrap();
        assert!(!e.clipped_cells().is_empty() || e.population() > 0);
    }

    #[test]
    fn test_von_neumann_diamond() {
        // a plus-shape has 5 cells within range 1 of the centre (M1)
        let mut e = engine("R1,C0,M1,S5..5,B2..2,NN:P20,20");
        for &(x, y) in &[(0, 0), (1, 0), (-1, 0), (0, 1), (0, -1)] {
            e.set_cell(x, y, 1).unwrap();
        }
        e.step().unwrap();
        // the centre sees itself plus 4 orthogonal neighbours: survives
        assert_eq!(e.get_cell(0, 0), 1);
    }

    #[test]
    fn test_faster_neumann_matches_reference() {
        let seed: &[(i32, i32)] = &[
            (0, 0), (1, 0), (2, 0), (4, 1), (-3, 2), (0, 2), (1, 3), (-2, -2),
            (3, -1), (-4, 0), (2, 2), (0, -3), (-1, -1), (6, 6), (-6, 5),
            (5, -5), (-5, -6), (7, 0), (0, 7), (-7, -1),
        ];
        // range 6 uses the cumulative diagonal kernel
        let mut e = engine("R6,C0,M1,S30..50,B28..34,NN:T44,44");
        assert!(e.colcounts.is_some());
        for &(x, y) in seed {
            e.set_cell(x, y, 1).unwrap();
        }
        let mut reference = std::collections::HashSet::new();
        for y in -22..22 {
            for x in -22..22 {
                let mut n = 0;
                for dy in -6i32..=6 {
                    for dx in -6i32..=6 {
                        if dx.abs() + dy.abs() > 6 {
                            continue;
                        }
                        let wx = (x + dx + 66) % 44 - 22;
                        let wy = (y + dy + 66) % 44 - 22;
                        if seed.contains(&(wx, wy)) {
                            n += 1;
                        }
                    }
                }
                let alive = seed.contains(&(x, y));
                if alive {
                    if (30..=50).contains(&n) {
                        reference.insert((x, y));
                    }
                } else if (28..=34).contains(&n) {
                    reference.insert((x, y));
                }
            }
        }
        e.step().unwrap();
        for y in -22..22 {
            for x in -22..22 {
                assert_eq!(
                    e.get_cell(x, y) == 1,
                    reference.contains(&(x, y)),
                    "({x},{y})"
                );
            }
        }
    }

    #[test]
    fn test_circle_kernel_against_reference() {
        let seed: &[(i32, i32)] = &[
            (0, 0), (1, 0), (2, 0), (0, 1), (1, 1), (3, 2), (-2, 1), (-1, -2),
            (2, -3), (-3, -1), (4, 4), (-4, 3),
        ];
        let mut e = engine("R4,C0,M1,S20..30,B18..22,NC:P30,30");
        for &(x, y) in seed {
            e.set_cell(x, y, 1).unwrap();
        }
        let r2 = 4 * 4 + 4;
        let mut reference = std::collections::HashSet::new();
        for y in -15..15 {
            for x in -15..15 {
                let mut n = 0;
                for dy in -4i32..=4 {
                    for dx in -4i32..=4 {
                        if dx * dx + dy * dy > r2 {
                            continue;
                        }
                        if seed.contains(&(x + dx, y + dy)) {
                            n += 1;
                        }
                    }
                }
                let alive = seed.contains(&(x, y));
                if alive {
                    if (20..=30).contains(&n) {
                        reference.insert((x, y));
                    }
                } else if (18..=22).contains(&n) {
                    reference.insert((x, y));
                }
            }
        }
        e.step().unwrap();
        for y in -15..15 {
            for x in -15..15 {
                assert_eq!(
                    e.get_cell(x, y) == 1,
                    reference.contains(&(x, y)),
                    "({x},{y})"
                );
            }
        }
    }

    #[test]
    fn test_next_cell_scans_row() {
        let mut e = engine("R1,C0,M0,S2..3,B3..3,NM:T40,40");
        e.set_cell(-10, 0, 1).unwrap();
        e.set_cell(7, 0, 1).unwrap();
        assert_eq!(e.next_cell(-19, 0), Some((9, 1)));
        assert_eq!(e.next_cell(-10, 0), Some((0, 1)));
        assert_eq!(e.next_cell(-9, 0), Some((16, 1)));
        assert_eq!(e.next_cell(8, 0), None);
        assert_eq!(e.next_cell(-100, 0), None);
    }

    #[test]
    fn test_find_edges_in_cell_coordinates() {
        let mut e = engine("R1,C0,M0,S2..3,B3..3,NM:T40,40");
        assert_eq!(e.find_edges(), None);
        e.set_cell(-3, -7, 1).unwrap();
        e.set_cell(11, 5, 1).unwrap();
        assert_eq!(
            e.find_edges(),
            Some(Edges {
                top: -7,
                left: -3,
                bottom: 5,
                right: 11
            })
        );
    }

    #[test]
    fn test_interrupt_stops_multi_generation_step() {
        let mut e = engine("R1,C0,M0,S2..3,B3..3,NM:T40,40");
        for x in -1..=1 {
            e.set_cell(x, 0, 1).unwrap();
        }
        e.set_increment(1000);
        e.poller_mut().set_interrupted();
        e.step().unwrap();
        // only whole generations complete; the interrupt latched before
        // the run so exactly one generation ran
        assert_eq!(e.generation(), 1);
    }
}
