//! Neighbourhood-count kernels.
//!
//! Two families. The `fast_*` kernels convolve directly over the
//! neighbourhood for every candidate cell, writing the next generation
//! into a second grid; a sliding column window (or, for the circle, an
//! incremental column update) keeps them linear in the row length. The
//! `faster_*` kernels build a cumulative-sum table once per generation
//! and then read each cell's count with a handful of table lookups,
//! updating the grid in place; for the von Neumann diamond the table
//! accumulates along diagonals and out-of-range indices fold back onto
//! stored entries.

use super::LargerThanLife;

impl LargerThanLife {
    /// Next state of a cell under the in-place kernels.
    fn update_current_grid(&mut self, state: &mut u8, ncount: i32) {
        if *state == 0 {
            if ncount >= self.min_b && ncount <= self.max_b {
                *state = 1;
                self.population += 1;
            }
        } else if *state == 1 {
            if ncount < self.min_s || ncount > self.max_s {
                if self.max_states > 2 {
                    // cell decays to state 2
                    *state = 2;
                } else {
                    *state = 0;
                    self.population -= 1;
                    if self.population == 0 {
                        self.empty_boundaries();
                    }
                }
            }
        } else if i32::from(*state) + 1 < self.max_states {
            *state += 1;
        } else {
            *state = 0;
            self.population -= 1;
            if self.population == 0 {
                self.empty_boundaries();
            }
        }
    }

    /// Write the next state of grid cell (x, y) into the next grid,
    /// based on the given neighbourhood count.
    fn update_next_grid(&mut self, x: i32, y: i32, xyoffset: isize, ncount: i32) {
        let idx = (self.goffset() + xyoffset) as usize;
        let state = self.curr[idx];
        if state == 0 {
            if ncount >= self.min_b && ncount <= self.max_b {
                self.next[idx] = 1;
                self.population += 1;
                self.minx = self.minx.min(x);
                self.maxx = self.maxx.max(x);
                self.miny = self.miny.min(y);
                self.maxy = self.maxy.max(y);
            }
        } else if state == 1 {
            if ncount >= self.min_s && ncount <= self.max_s {
                self.next[idx] = 1;
                self.minx = self.minx.min(x);
                self.maxx = self.maxx.max(x);
                self.miny = self.miny.min(y);
                self.maxy = self.maxy.max(y);
            } else if self.max_states > 2 {
                self.next[idx] = 2;
                self.minx = self.minx.min(x);
                self.maxx = self.maxx.max(x);
                self.miny = self.miny.min(y);
                self.maxy = self.maxy.max(y);
            } else {
                self.population -= 1;
                if self.population == 0 {
                    self.empty_boundaries();
                }
            }
        } else if i32::from(state) + 1 < self.max_states {
            self.next[idx] = state + 1;
            self.minx = self.minx.min(x);
            self.maxx = self.maxx.max(x);
            self.miny = self.miny.min(y);
            self.maxy = self.maxy.max(y);
        } else {
            self.population -= 1;
            if self.population == 0 {
                self.empty_boundaries();
            }
        }
    }

    /// Direct Moore convolution with a sliding column window.
    pub(super) fn fast_moore(&mut self, mincol: i32, minrow: i32, maxcol: i32, maxrow: i32) {
        let ow = self.outerwd as isize;
        let g0 = self.goffset();
        if self.range == 1 {
            for y in minrow..=maxrow {
                let yoffset = y as isize * ow;
                let topy = g0 + (y as isize - 1) * ow;
                for x in mincol..=maxcol {
                    // 3x3 window, no edge checks thanks to the border
                    let mut ncount = 0;
                    let mut p = topy + x as isize - 1;
                    for _ in 0..3 {
                        if self.curr[p as usize] == 1 {
                            ncount += 1;
                        }
                        if self.curr[(p + 1) as usize] == 1 {
                            ncount += 1;
                        }
                        if self.curr[(p + 2) as usize] == 1 {
                            ncount += 1;
                        }
                        p += ow;
                    }
                    self.update_next_grid(x, y, yoffset + x as isize, ncount);
                }
            }
        } else {
            let right = (2 * self.range) as usize;
            let mut colcount = vec![0i32; right + 1];
            for y in minrow..=maxrow {
                let yoffset = y as isize * ow;
                let ymrange = y - self.range;
                let yprange = y + self.range;
                let topy = g0 + ymrange as isize * ow;

                // first cell: count every column of the window
                let xmrange = mincol - self.range;
                let xprange = mincol + self.range;
                let mut ncount = 0;
                for i in xmrange..=xprange {
                    let mut p = topy + i as isize;
                    let col = (i - xmrange) as usize;
                    colcount[col] = 0;
                    for _ in ymrange..=yprange {
                        if self.curr[p as usize] == 1 {
                            colcount[col] += 1;
                        }
                        p += ow;
                    }
                    ncount += colcount[col];
                }
                self.update_next_grid(mincol, y, yoffset + mincol as isize, ncount);

                // remaining cells: slide the window one column right
                let topy = topy + self.range as isize;
                for x in mincol + 1..=maxcol {
                    let mut rcount = 0;
                    let mut p = topy + x as isize;
                    for _ in ymrange..=yprange {
                        if self.curr[p as usize] == 1 {
                            rcount += 1;
                        }
                        p += ow;
                    }
                    ncount = rcount;
                    for i in 1..=right {
                        ncount += colcount[i];
                        colcount[i - 1] = colcount[i];
                    }
                    colcount[right] = rcount;
                    self.update_next_grid(x, y, yoffset + x as isize, ncount);
                }
            }
        }
    }

    /// Direct von Neumann (diamond) convolution.
    pub(super) fn fast_neumann(&mut self, mincol: i32, minrow: i32, maxcol: i32, maxrow: i32) {
        let ow = self.outerwd as isize;
        let g0 = self.goffset();
        if self.range == 1 {
            for y in minrow..=maxrow {
                let yoffset = y as isize * ow;
                let topy = g0 + yoffset;
                for x in mincol..=maxcol {
                    // at range 1 a diamond is a cross
                    let mut ncount = 0;
                    let p = topy + x as isize;
                    if self.curr[(p - 1) as usize] == 1 {
                        ncount += 1;
                    }
                    if self.curr[p as usize] == 1 {
                        ncount += 1;
                    }
                    if self.curr[(p + 1) as usize] == 1 {
                        ncount += 1;
                    }
                    if self.curr[(p - ow) as usize] == 1 {
                        ncount += 1;
                    }
                    if self.curr[(p + ow) as usize] == 1 {
                        ncount += 1;
                    }
                    self.update_next_grid(x, y, yoffset + x as isize, ncount);
                }
            }
        } else {
            for y in minrow..=maxrow {
                let yoffset = y as isize * ow;
                let ymrange = y - self.range;
                let yprange = y + self.range;
                let topy = g0 + ymrange as isize * ow;
                for x in mincol..=maxcol {
                    let mut ncount = 0;
                    let mut xoffset = 0i32;
                    let mut row = topy;
                    for _ in ymrange..y {
                        let mut p = row + (x - xoffset) as isize;
                        for _ in 0..(2 * xoffset + 1) {
                            if self.curr[p as usize] == 1 {
                                ncount += 1;
                            }
                            p += 1;
                        }
                        xoffset += 1; // 0, 1, 2, ..., range
                        row += ow;
                    }
                    for _ in y..=yprange {
                        let mut p = row + (x - xoffset) as isize;
                        for _ in 0..(2 * xoffset + 1) {
                            if self.curr[p as usize] == 1 {
                                ncount += 1;
                            }
                            p += 1;
                        }
                        xoffset -= 1; // range-1, ..., 1, 0
                        row += ow;
                    }
                    self.update_next_grid(x, y, yoffset + x as isize, ncount);
                }
            }
        }
    }

    /// Direct circle convolution with incremental column updates.
    pub(super) fn fast_shaped(&mut self, mincol: i32, minrow: i32, maxcol: i32, maxrow: i32) {
        let ow = self.outerwd as isize;
        let g0 = self.goffset();
        for y in minrow..=maxrow {
            let yoffset = y as isize * ow;
            let ymrange = y - self.range;
            let yprange = y + self.range;

            // first cell: full count over the shape
            let mut ncount = 0;
            let mut row = g0 + ymrange as isize * ow;
            for j in ymrange..=yprange {
                let half = self.shape[(j - ymrange) as usize];
                let mut p = row + (mincol - half) as isize;
                for _ in 0..(2 * half + 1) {
                    if self.curr[p as usize] == 1 {
                        ncount += 1;
                    }
                    p += 1;
                }
                row += ow;
            }
            self.update_next_grid(mincol, y, yoffset + mincol as isize, ncount);

            // remaining cells: per row, drop the cell leaving the shape
            // on the left and pick up the one entering on the right
            let base = g0 + ymrange as isize * ow;
            for x in mincol + 1..=maxcol {
                let mut row = base;
                for j in ymrange..=yprange {
                    let half = self.shape[(j - ymrange) as usize];
                    if self.curr[(row + (x - half - 1) as isize) as usize] == 1 {
                        ncount -= 1;
                    }
                    if self.curr[(row + (x + half) as isize) as usize] == 1 {
                        ncount += 1;
                    }
                    row += ow;
                }
                self.update_next_grid(x, y, yoffset + x as isize, ncount);
            }
        }
    }

    /// Build the Moore prefix-sum table over outer-coordinate rows
    /// `minrow..=maxrow`, columns `mincol..=maxcol`. Entry (i, j) holds
    /// the number of state-1 cells in the rectangle from (minrow,
    /// mincol) to (i, j).
    fn build_moore_counts(
        &self,
        cc: &mut [i32],
        minrow: i32,
        mincol: i32,
        maxrow: i32,
        maxcol: i32,
        zero_margin: bool,
    ) {
        let ow = self.outerwd as usize;
        let width = (maxcol - mincol + 1) as usize;

        let mut data_row = minrow as usize;
        let mut data_col = mincol as usize;
        if zero_margin {
            // unbounded grids keep the table's top and left margins zero
            // instead of relying on border cells
            let r2 = (self.range * 2) as usize;
            for i in data_row..data_row + r2 {
                cc[i * ow + data_col..i * ow + data_col + width].fill(0);
            }
            for i in data_row + r2..=maxrow as usize {
                cc[i * ow + data_col..i * ow + data_col + r2].fill(0);
            }
            data_row += r2;
            data_col += r2;
        }

        let end = maxcol as usize;
        for i in data_row..=maxrow as usize {
            let base = i * ow;
            let prev = base - ow;
            // the row above the first is either the zeroed margin or,
            // for the bounded build, absent
            let use_prev = zero_margin || i != data_row;
            let mut rowcount = 0i32;
            let mut j = data_col;
            // probe four cells at a time to skip long dead runs
            while j + 3 <= end {
                let idx = base + j;
                if self.curr[idx] | self.curr[idx + 1] | self.curr[idx + 2] | self.curr[idx + 3]
                    != 0
                {
                    for k in 0..4 {
                        if self.curr[idx + k] == 1 {
                            rowcount += 1;
                        }
                        cc[idx + k] = rowcount + if use_prev { cc[prev + j + k] } else { 0 };
                    }
                } else {
                    for k in 0..4 {
                        cc[idx + k] = rowcount + if use_prev { cc[prev + j + k] } else { 0 };
                    }
                }
                j += 4;
            }
            while j <= end {
                if self.curr[base + j] == 1 {
                    rowcount += 1;
                }
                cc[base + j] = rowcount + if use_prev { cc[prev + j] } else { 0 };
                j += 1;
            }
        }
    }

    /// In-place Moore transition pass shared by the bounded and
    /// unbounded cumulative kernels; `hi`/`lo` are the table offsets of
    /// the neighbourhood's trailing and leading edges.
    fn moore_update_in_place(
        &mut self,
        cc: &[i32],
        mincol: i32,
        minrow: i32,
        maxcol: i32,
        maxrow: i32,
        hi: i32,
        lo: i32,
    ) {
        let ow = self.outerwd as isize;
        let g0 = self.goffset();
        let at = |i: i32, j: i32| cc[((i as isize) * ow + j as isize) as usize];

        // top left cell of the rectangle
        let idx = (g0 + minrow as isize * ow + mincol as isize) as usize;
        let mut state = self.curr[idx];
        self.update_current_grid(&mut state, at(minrow + hi, mincol + hi));
        self.curr[idx] = state;
        if state != 0 {
            self.minx = self.minx.min(mincol);
            self.maxx = self.maxx.max(mincol);
            self.miny = self.miny.min(minrow);
            self.maxy = self.maxy.max(minrow);
        }

        // rest of the top row
        let mut rowchanged = false;
        for j in mincol + 1..=maxcol {
            let idx = (g0 + minrow as isize * ow + j as isize) as usize;
            let mut state = self.curr[idx];
            self.update_current_grid(&mut state, at(minrow + hi, j + hi) - at(minrow + hi, j + lo));
            self.curr[idx] = state;
            if state != 0 {
                self.minx = self.minx.min(j);
                self.maxx = self.maxx.max(j);
                rowchanged = true;
            }
        }
        if rowchanged {
            self.miny = self.miny.min(minrow);
            self.maxy = self.maxy.max(minrow);
        }

        // rest of the left column
        let mut colchanged = false;
        for i in minrow + 1..=maxrow {
            let idx = (g0 + i as isize * ow + mincol as isize) as usize;
            let mut state = self.curr[idx];
            self.update_current_grid(&mut state, at(i + hi, mincol + hi) - at(i + lo, mincol + hi));
            self.curr[idx] = state;
            if state != 0 {
                self.miny = self.miny.min(i);
                self.maxy = self.maxy.max(i);
                colchanged = true;
            }
        }
        if colchanged {
            self.minx = self.minx.min(mincol);
            self.maxx = self.maxx.max(mincol);
        }

        // interior
        let mut rowchanged = false;
        for i in minrow + 1..=maxrow {
            for j in mincol + 1..=maxcol {
                let idx = (g0 + i as isize * ow + j as isize) as usize;
                let mut state = self.curr[idx];
                let n = at(i + hi, j + hi) + at(i + lo, j + lo)
                    - at(i + hi, j + lo)
                    - at(i + lo, j + hi);
                self.update_current_grid(&mut state, n);
                self.curr[idx] = state;
                if state != 0 {
                    self.minx = self.minx.min(j);
                    self.maxx = self.maxx.max(j);
                    rowchanged = true;
                }
            }
            if rowchanged {
                self.miny = self.miny.min(i);
                self.maxy = self.maxy.max(i);
                rowchanged = false;
            }
        }
        if self.population == 0 {
            self.empty_boundaries();
        }
    }

    /// Two-state specialisation of [`Self::moore_update_in_place`] with
    /// the birth/survival window tests inlined.
    fn moore_update_in_place2(
        &mut self,
        cc: &[i32],
        mincol: i32,
        minrow: i32,
        maxcol: i32,
        maxrow: i32,
        hi: i32,
        lo: i32,
    ) {
        let ow = self.outerwd as isize;
        let g0 = self.goffset();
        let at = |i: i32, j: i32| cc[((i as isize) * ow + j as isize) as usize];

        let idx = (g0 + minrow as isize * ow + mincol as isize) as usize;
        let ncount = at(minrow + hi, mincol + hi);
        if self.curr[idx] == 0 {
            if ncount >= self.min_b && ncount <= self.max_b {
                self.curr[idx] = 1;
                self.population += 1;
                self.minx = mincol;
                self.maxx = mincol;
                self.miny = minrow;
                self.maxy = minrow;
            }
        } else if ncount < self.min_s || ncount > self.max_s {
            self.curr[idx] = 0;
            self.population -= 1;
        } else {
            self.minx = mincol;
            self.maxx = maxcol;
            self.miny = minrow;
            self.maxy = maxrow;
        }

        let mut rowchanged = false;
        for j in mincol + 1..=maxcol {
            let idx = (g0 + minrow as isize * ow + j as isize) as usize;
            let ncount = at(minrow + hi, j + hi) - at(minrow + hi, j + lo);
            if self.curr[idx] == 0 {
                if ncount >= self.min_b && ncount <= self.max_b {
                    self.curr[idx] = 1;
                    self.population += 1;
                    self.minx = self.minx.min(j);
                    self.maxx = self.maxx.max(j);
                    rowchanged = true;
                }
            } else if ncount < self.min_s || ncount > self.max_s {
                self.curr[idx] = 0;
                self.population -= 1;
            } else {
                self.minx = self.minx.min(j);
                self.maxx = self.maxx.max(j);
                rowchanged = true;
            }
        }
        if rowchanged {
            self.miny = self.miny.min(minrow);
            self.maxy = self.maxy.max(minrow);
        }

        let mut colchanged = false;
        for i in minrow + 1..=maxrow {
            let idx = (g0 + i as isize * ow + mincol as isize) as usize;
            let ncount = at(i + hi, mincol + hi) - at(i + lo, mincol + hi);
            if self.curr[idx] == 0 {
                if ncount >= self.min_b && ncount <= self.max_b {
                    self.curr[idx] = 1;
                    self.population += 1;
                    self.miny = self.miny.min(i);
                    self.maxy = self.maxy.max(i);
                    colchanged = true;
                }
            } else if ncount < self.min_s || ncount > self.max_s {
                self.curr[idx] = 0;
                self.population -= 1;
            } else {
                self.miny = self.miny.min(i);
                self.maxy = self.maxy.max(i);
                colchanged = true;
            }
        }
        if colchanged {
            self.minx = self.minx.min(mincol);
            self.maxx = self.maxx.max(mincol);
        }

        let mut rowchanged = false;
        for i in minrow + 1..=maxrow {
            for j in mincol + 1..=maxcol {
                let idx = (g0 + i as isize * ow + j as isize) as usize;
                let ncount = at(i + hi, j + hi) + at(i + lo, j + lo)
                    - at(i + hi, j + lo)
                    - at(i + lo, j + hi);
                if self.curr[idx] == 0 {
                    if ncount >= self.min_b && ncount <= self.max_b {
                        self.curr[idx] = 1;
                        self.population += 1;
                        self.minx = self.minx.min(j);
                        self.maxx = self.maxx.max(j);
                        rowchanged = true;
                    }
                } else if ncount < self.min_s || ncount > self.max_s {
                    self.curr[idx] = 0;
                    self.population -= 1;
                } else {
                    self.minx = self.minx.min(j);
                    self.maxx = self.maxx.max(j);
                    rowchanged = true;
                }
            }
            if rowchanged {
                self.miny = self.miny.min(i);
                self.maxy = self.maxy.max(i);
                rowchanged = false;
            }
        }
        if self.population == 0 {
            self.empty_boundaries();
        }
    }

    /// Cumulative-sum Moore kernel on a bounded grid: the border has
    /// already been populated (torus) or is all dead (plane).
    pub(super) fn faster_moore_bounded(
        &mut self,
        mincol: i32,
        minrow: i32,
        maxcol: i32,
        maxrow: i32,
    ) {
        let Some(mut cc) = self.colcounts.take() else {
            return;
        };
        let bmr = self.border - self.range;
        let bpr = self.border + self.range;
        self.build_moore_counts(
            &mut cc,
            minrow + bmr,
            mincol + bmr,
            maxrow + bpr,
            maxcol + bpr,
            false,
        );
        let lo = self.border - self.range - 1;
        self.moore_update_in_place(&cc, mincol, minrow, maxcol, maxrow, bpr, lo);
        self.colcounts = Some(cc);
    }

    pub(super) fn faster_moore_bounded2(
        &mut self,
        mincol: i32,
        minrow: i32,
        maxcol: i32,
        maxrow: i32,
    ) {
        let Some(mut cc) = self.colcounts.take() else {
            return;
        };
        let bmr = self.border - self.range;
        let bpr = self.border + self.range;
        self.build_moore_counts(
            &mut cc,
            minrow + bmr,
            mincol + bmr,
            maxrow + bpr,
            maxcol + bpr,
            false,
        );
        let lo = self.border - self.range - 1;
        self.moore_update_in_place2(&cc, mincol, minrow, maxcol, maxrow, bpr, lo);
        self.colcounts = Some(cc);
    }

    /// Cumulative-sum Moore kernel on an unbounded grid: the pattern is
    /// guaranteed to sit at least `2 * range` cells from every edge.
    pub(super) fn faster_moore_unbounded(
        &mut self,
        mincol: i32,
        minrow: i32,
        maxcol: i32,
        maxrow: i32,
    ) {
        let Some(mut cc) = self.colcounts.take() else {
            return;
        };
        self.build_moore_counts(
            &mut cc,
            minrow - self.range,
            mincol - self.range,
            maxrow + self.range,
            maxcol + self.range,
            true,
        );
        self.moore_update_in_place(
            &cc,
            mincol,
            minrow,
            maxcol,
            maxrow,
            self.range,
            -(self.range + 1),
        );
        self.colcounts = Some(cc);
    }

    pub(super) fn faster_moore_unbounded2(
        &mut self,
        mincol: i32,
        minrow: i32,
        maxcol: i32,
        maxrow: i32,
    ) {
        let Some(mut cc) = self.colcounts.take() else {
            return;
        };
        self.build_moore_counts(
            &mut cc,
            minrow - self.range,
            mincol - self.range,
            maxrow + self.range,
            maxcol + self.range,
            true,
        );
        self.moore_update_in_place2(
            &cc,
            mincol,
            minrow,
            maxcol,
            maxrow,
            self.range,
            -(self.range + 1),
        );
        self.colcounts = Some(cc);
    }

    /// Diagonal cumulative sum for the von Neumann neighbourhood.
    ///
    /// `C[i][j]` is the sum of cells between north-west and north-east of
    /// (i, j) with matching diagonal parity. Only rows `0..ccht` are
    /// stored; [`Self::get_count`] folds every other index onto a stored
    /// one.
    fn get_count(&self, cc: &[i32], i: i32, j: i32) -> i32 {
        let ow = self.outerwd as isize;
        let at = |i: i32, j: i32| cc[(i as isize * ow + j as isize) as usize];
        if i < 0 || i + j < 0 || j - i >= self.ncols {
            return 0;
        }
        if j < 0 && i + j < self.ccht {
            return at(i + j, 0);
        }
        if j >= self.ncols && j - i >= self.ncols - self.ccht {
            return at(i + self.ncols - 1 - j, self.ncols - 1);
        }
        if i < self.ccht {
            return at(i, j);
        }
        if (i - self.ccht + 1) + j <= self.halfccwd {
            return at(self.ccht - 1, i - self.ccht + 1 + j);
        }
        if j - (i - self.ccht + 1) >= self.halfccwd {
            return at(self.ccht - 1, j - (i - self.ccht + 1));
        }
        at(
            self.ccht - 1,
            self.halfccwd + ((i + j + self.ccht + self.halfccwd + 1) % 2),
        )
    }

    /// Fill the diagonal cumulative table for rows/cols given in raw
    /// outer coordinates.
    fn build_neumann_counts(&mut self, minrow: i32, mincol: i32) {
        let Some(mut cc) = self.colcounts.take() else {
            return;
        };
        let ow = self.outerwd as usize;
        for i in 0..self.ccht {
            let im1 = i - 1;
            let im2 = im1 - 1;
            for j in 0..self.ncols {
                let mut v = self.get_count(&cc, im1, j - 1) + self.get_count(&cc, im1, j + 1)
                    - self.get_count(&cc, im2, j);
                if i < self.nrows {
                    let g = self.curr
                        [(i + minrow) as usize * ow + (j + mincol) as usize];
                    if g == 1 {
                        v += 1;
                    }
                }
                cc[i as usize * ow + j as usize] = v;
            }
        }
        self.colcounts = Some(cc);
    }

    /// Cumulative von Neumann kernel on a bounded grid.
    pub(super) fn faster_neumann_bounded(
        &mut self,
        mincol: i32,
        minrow: i32,
        maxcol: i32,
        maxrow: i32,
    ) {
        let bmr = self.border - self.range;
        let bpr = self.border + self.range;
        let minrow_o = minrow + bmr;
        let mincol_o = mincol + bmr;
        let maxrow_o = maxrow + bpr;
        let maxcol_o = maxcol + bpr;

        self.nrows = maxrow_o - minrow_o + 1;
        self.ncols = maxcol_o - mincol_o + 1;
        self.ccht = self.nrows + (self.ncols - 1) / 2;
        self.halfccwd = self.ncols / 2;

        self.build_neumann_counts(minrow_o, mincol_o);
        let Some(cc) = self.colcounts.take() else {
            return;
        };

        // state coordinates are relative to the interior grid again
        let minrow = minrow_o - self.border;
        let mincol = mincol_o - self.border;
        let ow = self.outerwd as isize;
        let g0 = self.goffset();
        let range = self.range;

        let mut rowchanged = false;
        for i in range..self.nrows - range {
            let im1 = i - 1;
            let ipr = i + range;
            let iprm1 = ipr - 1;
            let imrm1 = i - range - 1;
            let imrm2 = imrm1 - 1;
            let ipminrow = i + minrow;
            for j in range..self.ncols - range {
                let jpr = j + range;
                let jmr = j - range;
                let n = self.get_count(&cc, ipr, j)
                    - self.get_count(&cc, im1, jpr + 1)
                    - self.get_count(&cc, im1, jmr - 1)
                    + self.get_count(&cc, imrm2, j)
                    + self.get_count(&cc, iprm1, j)
                    - self.get_count(&cc, im1, jpr)
                    - self.get_count(&cc, im1, jmr)
                    + self.get_count(&cc, imrm1, j);
                let idx = (g0 + ipminrow as isize * ow + (j + mincol) as isize) as usize;
                let mut state = self.curr[idx];
                self.update_current_grid(&mut state, n);
                self.curr[idx] = state;
                if state != 0 {
                    let jpmincol = j + mincol;
                    self.minx = self.minx.min(jpmincol);
                    self.maxx = self.maxx.max(jpmincol);
                    rowchanged = true;
                }
            }
            if rowchanged {
                self.miny = self.miny.min(ipminrow);
                self.maxy = self.maxy.max(ipminrow);
                rowchanged = false;
            }
        }
        if self.population == 0 {
            self.empty_boundaries();
        }
        self.colcounts = Some(cc);
    }

    /// Cumulative von Neumann kernel on an unbounded grid (at least a
    /// `2 * range` margin of dead cells is guaranteed).
    pub(super) fn faster_neumann_unbounded(
        &mut self,
        mincol: i32,
        minrow: i32,
        maxcol: i32,
        maxrow: i32,
    ) {
        self.nrows = maxrow - minrow + 1;
        self.ncols = maxcol - mincol + 1;
        self.ccht = self.nrows + (self.ncols - 1) / 2;
        self.halfccwd = self.ncols / 2;

        self.build_neumann_counts(minrow, mincol);
        let Some(cc) = self.colcounts.take() else {
            return;
        };

        let ow = self.outerwd as isize;
        let g0 = self.goffset();
        let range = self.range;

        let mut rowchanged = false;
        for i in 0..self.nrows {
            let im1 = i - 1;
            let ipr = i + range;
            let iprm1 = ipr - 1;
            let imrm1 = i - range - 1;
            let imrm2 = imrm1 - 1;
            let ipminrow = i + minrow;
            for j in 0..self.ncols {
                let jpr = j + range;
                let jmr = j - range;
                let n = self.get_count(&cc, ipr, j)
                    - self.get_count(&cc, im1, jpr + 1)
                    - self.get_count(&cc, im1, jmr - 1)
                    + self.get_count(&cc, imrm2, j)
                    + self.get_count(&cc, iprm1, j)
                    - self.get_count(&cc, im1, jpr)
                    - self.get_count(&cc, im1, jmr)
                    + self.get_count(&cc, imrm1, j);
                let idx = (g0 + ipminrow as isize * ow + (j + mincol) as isize) as usize;
                let mut state = self.curr[idx];
                self.update_current_grid(&mut state, n);
                self.curr[idx] = state;
                if state != 0 {
                    let jpmincol = j + mincol;
                    self.minx = self.minx.min(jpmincol);
                    self.maxx = self.maxx.max(jpmincol);
                    rowchanged = true;
                }
            }
            if rowchanged {
                self.miny = self.miny.min(ipminrow);
                self.maxy = self.maxy.max(ipminrow);
                rowchanged = false;
            }
        }
        if self.population == 0 {
            self.empty_boundaries();
        }
        self.colcounts = Some(cc);
    }
}
