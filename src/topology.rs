//! Bounded-grid topologies.
//!
//! A rule string may end with a suffix like `:T100,200` selecting a finite
//! grid. The topology is realised around each generation by copying live
//! cells from the interior edges into a one-cell-wide border strip just
//! outside the grid (so the unbounded step sees the joined neighbours),
//! and clearing everything outside the grid again afterwards.

use crate::engine::{Edges, Engine};
use crate::error::{EngineError, RuleError};

/// Coordinate editing limit shared by the engines: cells may not live
/// outside `[-MAX_COORD, MAX_COORD]` on either axis.
pub const MAX_COORD: i32 = 1_000_000_000;

/// Grid dimensions are clamped here while parsing to stay editable.
const MAX_DIMENSION: u32 = 2_000_000_000;

/// Parsed bounded-grid description.
///
/// A width or height of 0 means that axis is infinite (only a torus can
/// have one infinite axis, giving an infinite tube). The derived edge
/// coordinates place the middle of the grid near `(0, 0)`.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Topology {
    pub width: u32,
    pub height: u32,
    pub h_shift: i32,
    pub v_shift: i32,
    pub h_twist: bool,
    pub v_twist: bool,
    pub bounded_plane: bool,
    pub sphere: bool,
    pub left: i32,
    pub right: i32,
    pub top: i32,
    pub bottom: i32,
}

impl Default for Topology {
    fn default() -> Self {
        Topology::unbounded()
    }
}

impl Topology {
    /// The infinite plane.
    pub fn unbounded() -> Self {
        Topology {
            width: 0,
            height: 0,
            h_shift: 0,
            v_shift: 0,
            h_twist: false,
            v_twist: false,
            bounded_plane: false,
            sphere: false,
            left: 0,
            right: 0,
            top: 0,
            bottom: 0,
        }
    }

    pub fn is_unbounded(&self) -> bool {
        self.width == 0 && self.height == 0
    }

    /// Parse a rule suffix like `:T100,200`.
    ///
    /// `suffix` starts with the colon. Any legal partial suffix is
    /// accepted: `:` and `:T` mean an unbounded universe, and a missing
    /// height copies the width (so `:T100` is `:T100,100` and spheres are
    /// written `:S100`).
    pub fn parse_suffix(suffix: &str) -> Result<Self, RuleError> {
        let mut topo = Topology::unbounded();
        let mut chars = suffix.as_bytes();
        debug_assert_eq!(chars.first(), Some(&b':'));
        chars = &chars[1..];

        let letter = match chars.first() {
            None => return Ok(topo),
            Some(c) => c.to_ascii_uppercase(),
        };
        match letter {
            b'T' => {}
            b'P' => topo.bounded_plane = true,
            b'S' => topo.sphere = true,
            b'K' => {}
            b'C' => {
                topo.h_twist = true;
                topo.v_twist = true;
            }
            _ => return Err(RuleError::UnknownTopology),
        }
        chars = &chars[1..];
        if chars.is_empty() {
            return Ok(topo);
        }

        let mut p = chars;
        topo.width = take_dimension(&mut p);
        if p.first() == Some(&b'*') {
            if letter != b'K' {
                return Err(RuleError::TwistWithoutKlein);
            }
            topo.h_twist = true;
            p = &p[1..];
        }
        if let Some(&sign) = p.first().filter(|&&c| c == b'+' || c == b'-') {
            match letter {
                b'P' => return Err(RuleError::PlaneShift),
                b'S' => return Err(RuleError::SphereShift),
                b'C' => return Err(RuleError::CrossSurfaceShift),
                b'K' if !topo.h_twist => return Err(RuleError::ShiftOnUntwistedEdge),
                _ => {}
            }
            if topo.width == 0 {
                return Err(RuleError::ShiftInfiniteWidth);
            }
            p = &p[1..];
            let mut shift = 0i64;
            while let Some(d @ b'0'..=b'9') = p.first() {
                shift = (10 * shift + i64::from(d - b'0')).min(i64::from(i32::MAX));
                p = &p[1..];
            }
            let mut shift = shift as i32;
            if shift >= topo.width as i32 {
                shift %= topo.width as i32;
            }
            topo.h_shift = if sign == b'+' { shift } else { -shift };
        }
        if p.first() == Some(&b',') && letter != b'S' {
            p = &p[1..];
        } else if !p.is_empty() {
            return Err(RuleError::TrailingAfterWidth);
        }

        if matches!(letter, b'K' | b'C' | b'S') && topo.width == 0 {
            return Err(RuleError::InfiniteWidth);
        }

        if p.is_empty() {
            // treat ":T100" like ":T100,100" and ":S100" as a square grid
            topo.height = topo.width;
        } else {
            topo.height = take_dimension(&mut p);
            if p.first() == Some(&b'*') {
                if letter != b'K' {
                    return Err(RuleError::TwistWithoutKlein);
                }
                if topo.h_twist {
                    return Err(RuleError::DoubleTwist);
                }
                topo.v_twist = true;
                p = &p[1..];
            }
            if let Some(&sign) = p.first().filter(|&&c| c == b'+' || c == b'-') {
                match letter {
                    b'P' => return Err(RuleError::PlaneShift),
                    b'C' => return Err(RuleError::CrossSurfaceShift),
                    b'K' if !topo.v_twist => return Err(RuleError::ShiftOnUntwistedEdge),
                    _ => {}
                }
                if topo.h_shift != 0 {
                    return Err(RuleError::DoubleShift);
                }
                if topo.height == 0 {
                    return Err(RuleError::ShiftInfiniteHeight);
                }
                p = &p[1..];
                let mut shift = 0i64;
                while let Some(d @ b'0'..=b'9') = p.first() {
                    shift = (10 * shift + i64::from(d - b'0')).min(i64::from(i32::MAX));
                    p = &p[1..];
                }
                let mut shift = shift as i32;
                if shift >= topo.height as i32 {
                    shift %= topo.height as i32;
                }
                topo.v_shift = if sign == b'+' { shift } else { -shift };
            }
            if !p.is_empty() {
                return Err(RuleError::TrailingAfterHeight);
            }
        }

        if matches!(letter, b'K' | b'C') && topo.height == 0 {
            return Err(RuleError::InfiniteHeight);
        }

        if letter == b'K' && !(topo.h_twist || topo.v_twist) {
            // treat ":K10,20" like ":K10,20*"
            topo.v_twist = true;
        }

        if (topo.h_shift != 0 || topo.v_shift != 0) && (topo.width == 0 || topo.height == 0) {
            return Err(RuleError::ShiftUnbounded);
        }

        topo.derive_edges();
        Ok(topo)
    }

    fn derive_edges(&mut self) {
        if self.width > 0 {
            self.left = -((self.width as i32) / 2);
            self.right = self.width as i32 - 1 + self.left;
        } else {
            self.left = 0;
            self.right = 0;
        }
        if self.height > 0 {
            self.top = -((self.height as i32) / 2);
            self.bottom = self.height as i32 - 1 + self.top;
        } else {
            self.top = 0;
            self.bottom = 0;
        }
    }

    /// Canonical `:X...` suffix, or `None` for an unbounded universe.
    pub fn canonical_suffix(&self) -> Option<String> {
        if self.is_unbounded() {
            return None;
        }
        let (wd, ht) = (self.width, self.height);
        let s = if self.bounded_plane {
            format!(":P{wd},{ht}")
        } else if self.sphere {
            // sphere requires a square grid
            format!(":S{wd}")
        } else if self.h_twist && self.v_twist {
            format!(":C{wd},{ht}")
        } else if self.h_twist {
            // twist and shift is only possible if the edge length is even
            // and the effective shift is 1
            if self.h_shift != 0 && wd % 2 == 0 {
                format!(":K{wd}*+1,{ht}")
            } else {
                format!(":K{wd}*,{ht}")
            }
        } else if self.v_twist {
            if self.v_shift != 0 && ht % 2 == 0 {
                format!(":K{wd},{ht}*+1")
            } else {
                format!(":K{wd},{ht}*")
            }
        } else if self.h_shift < 0 {
            format!(":T{wd}{hs},{ht}", hs = self.h_shift)
        } else if self.h_shift > 0 {
            format!(":T{wd}+{hs},{ht}", hs = self.h_shift)
        } else if self.v_shift < 0 {
            format!(":T{wd},{ht}{vs}", vs = self.v_shift)
        } else if self.v_shift > 0 {
            format!(":T{wd},{ht}+{vs}", vs = self.v_shift)
        } else {
            format!(":T{wd},{ht}")
        };
        Some(s)
    }
}

fn take_dimension(p: &mut &[u8]) -> u32 {
    let mut value: u32 = 0;
    while let Some(d @ b'0'..=b'9') = p.first() {
        if value >= MAX_DIMENSION / 10 {
            value = MAX_DIMENSION;
        } else {
            value = 10 * value + u32::from(d - b'0');
        }
        *p = &p[1..];
    }
    value
}

/// Copy live interior edge cells into the border strip so the next
/// unbounded generation sees the joined topology.
///
/// Must be paired with [`delete_border_cells`] on every exit path from a
/// step. Returns `Err` when the pattern has grown past the editing limits
/// on an infinite axis, in which case the caller should stop generating.
pub fn create_border_cells<E: Engine + ?Sized>(u: &mut E) -> Result<(), EngineError> {
    let t = *u.topology();
    if u.is_empty() || t.bounded_plane {
        return Ok(());
    }
    let Some(edges) = u.find_edges() else {
        return Ok(());
    };

    // nothing to do if the pattern is strictly inside the grid edges
    if (t.width == 0 || (t.left < edges.left && t.right > edges.right))
        && (t.height == 0 || (t.top < edges.top && t.bottom > edges.bottom))
    {
        return Ok(());
    }

    // if the grid has an infinite axis the pattern may be too big to edit
    if (t.width == 0 || t.height == 0)
        && (edges.top < -MAX_COORD
            || edges.left < -MAX_COORD
            || edges.bottom > MAX_COORD
            || edges.right > MAX_COORD)
    {
        log::warn!("pattern is beyond editing limit");
        return Err(EngineError::EditingLimit);
    }

    if t.sphere {
        join_adjacent_edges(u, &t, &edges)?;
    } else if t.h_twist || t.v_twist {
        if (t.h_twist && t.h_shift != 0 && t.width % 2 == 0)
            || (t.v_twist && t.v_shift != 0 && t.height % 2 == 0)
        {
            // Klein bottle with a shift is only possible if the shift is
            // on the twisted edge and that edge has an even length
            join_twisted_and_shifted_edges(u, &t)?;
        } else {
            join_twisted_edges(u, &t)?;
        }
    } else if t.h_shift != 0 || t.v_shift != 0 {
        join_shifted_edges(u, &t)?;
    } else {
        join_edges(u, &t, &edges)?;
    }
    Ok(())
}

/// Erase everything outside the grid edges (the border strip plus any
/// cells the generation pushed past it).
pub fn delete_border_cells<E: Engine + ?Sized>(u: &mut E) -> Result<(), EngineError> {
    let t = *u.topology();
    if u.is_empty() {
        return Ok(());
    }
    // find pattern edges because the pattern may have expanded beyond the
    // grid (typically by 2 cells, more if the rule births in empty space)
    let Some(edges) = u.find_edges() else {
        return Ok(());
    };

    if (t.width == 0 || (t.left <= edges.left && t.right >= edges.right))
        && (t.height == 0 || (t.top <= edges.top && t.bottom >= edges.bottom))
    {
        return Ok(());
    }

    let mut pt = edges.top;
    let mut pb = edges.bottom;
    let (pl, pr) = (edges.left, edges.right);

    if t.height > 0 && pt < t.top {
        clear_rect(u, pt, pl, t.top - 1, pr)?;
        pt = t.top;
    }
    if t.height > 0 && pb > t.bottom {
        clear_rect(u, t.bottom + 1, pl, pb, pr)?;
        pb = t.bottom;
    }
    if t.width > 0 && pl < t.left {
        clear_rect(u, pt, pl, pb, t.left - 1)?;
    }
    if t.width > 0 && pr > t.right {
        clear_rect(u, pt, t.right + 1, pb, pr)?;
    }

    // do this test AFTER clearing the border
    if edges.top < -MAX_COORD
        || edges.left < -MAX_COORD
        || edges.bottom > MAX_COORD
        || edges.right > MAX_COORD
    {
        log::warn!("pattern exceeded editing limit");
        return Err(EngineError::EditingLimit);
    }
    Ok(())
}

fn clear_rect<E: Engine + ?Sized>(
    u: &mut E,
    top: i32,
    left: i32,
    bottom: i32,
    right: i32,
) -> Result<(), EngineError> {
    for cy in top..=bottom {
        let mut cx = left;
        while cx <= right {
            match u.next_cell(cx, cy) {
                Some((skip, _)) if skip + cx <= right => {
                    cx += skip;
                    u.set_cell(cx, cy, 0)?;
                }
                _ => break, // no more live cells in this row
            }
            cx += 1;
        }
    }
    Ok(())
}

/// Unshifted torus or infinite tube: opposite edges join directly.
fn join_edges<E: Engine + ?Sized>(
    u: &mut E,
    t: &Topology,
    edges: &Edges,
) -> Result<(), EngineError> {
    let (gl, gt, gr, gb) = (t.left, t.top, t.right, t.bottom);
    let (bl, bt, br, bb) = (gl - 1, gt - 1, gr + 1, gb + 1);

    if t.height > 0 {
        // copy live cells in top edge to bottom border, bottom edge to top
        for (src_y, dest_y) in [(gt, bb), (gb, bt)] {
            let mut x = edges.left;
            while x <= edges.right {
                let Some((skip, state)) = u.next_cell(x, src_y) else {
                    break;
                };
                x += skip;
                if state > 0 {
                    u.set_cell(x, dest_y, state)?;
                }
                x += 1;
            }
        }
    }

    if t.width > 0 {
        // the edge is only 1 cell wide so next_cell buys nothing here
        for y in edges.top..=edges.bottom {
            let state = u.get_cell(gl, y);
            if state > 0 {
                u.set_cell(br, y, state)?;
            }
            let state = u.get_cell(gr, y);
            if state > 0 {
                u.set_cell(bl, y, state)?;
            }
        }
    }

    if t.width > 0 && t.height > 0 {
        // copy the grid's corner cells to opposite corners in the border
        let s = u.get_cell(gr, gb);
        u.set_cell(bl, bt, s)?;
        let s = u.get_cell(gl, gb);
        u.set_cell(br, bt, s)?;
        let s = u.get_cell(gl, gt);
        u.set_cell(br, bb, s)?;
        let s = u.get_cell(gr, gt);
        u.set_cell(bl, bb, s)?;
    }
    Ok(())
}

/// Torus with a shift along one axis.
fn join_shifted_edges<E: Engine + ?Sized>(u: &mut E, t: &Topology) -> Result<(), EngineError> {
    let (gl, gt, gr, gb) = (t.left, t.top, t.right, t.bottom);
    let (bl, bt, br, bb) = (gl - 1, gt - 1, gr + 1, gb + 1);
    let wd = t.width as i32;
    let ht = t.height as i32;

    if t.h_shift != 0 {
        let wrap_x = |mut x: i32| {
            if x < gl {
                x += wd;
            } else if x > gr {
                x -= wd;
            }
            x
        };
        for x in gl..=gr {
            // join top and bottom edges with a horizontal shift
            let state = u.get_cell(wrap_x(x - t.h_shift), gb);
            if state > 0 {
                u.set_cell(x, bt, state)?;
            }
            let state = u.get_cell(wrap_x(x + t.h_shift), gt);
            if state > 0 {
                u.set_cell(x, bb, state)?;
            }
        }
        for y in gt..=gb {
            // join left and right edges with no shift
            let state = u.get_cell(gl, y);
            if state > 0 {
                u.set_cell(br, y, state)?;
            }
            let state = u.get_cell(gr, y);
            if state > 0 {
                u.set_cell(bl, y, state)?;
            }
        }
        let s = u.get_cell(wrap_x(gr - t.h_shift), gb);
        u.set_cell(bl, bt, s)?;
        let s = u.get_cell(wrap_x(gl - t.h_shift), gb);
        u.set_cell(br, bt, s)?;
        let s = u.get_cell(wrap_x(gr + t.h_shift), gt);
        u.set_cell(bl, bb, s)?;
        let s = u.get_cell(wrap_x(gl + t.h_shift), gt);
        u.set_cell(br, bb, s)?;
    } else {
        let wrap_y = |mut y: i32| {
            if y < gt {
                y += ht;
            } else if y > gb {
                y -= ht;
            }
            y
        };
        for x in gl..=gr {
            // join top and bottom edges with no shift
            let state = u.get_cell(x, gt);
            if state > 0 {
                u.set_cell(x, bb, state)?;
            }
            let state = u.get_cell(x, gb);
            if state > 0 {
                u.set_cell(x, bt, state)?;
            }
        }
        for y in gt..=gb {
            // join left and right edges with a vertical shift
            let state = u.get_cell(gr, wrap_y(y - t.v_shift));
            if state > 0 {
                u.set_cell(bl, y, state)?;
            }
            let state = u.get_cell(gl, wrap_y(y + t.v_shift));
            if state > 0 {
                u.set_cell(br, y, state)?;
            }
        }
        let s = u.get_cell(gr, wrap_y(gb - t.v_shift));
        u.set_cell(bl, bt, s)?;
        let s = u.get_cell(gl, wrap_y(gb + t.v_shift));
        u.set_cell(br, bt, s)?;
        let s = u.get_cell(gr, wrap_y(gt - t.v_shift));
        u.set_cell(bl, bb, s)?;
        let s = u.get_cell(gl, wrap_y(gt + t.v_shift));
        u.set_cell(br, bb, s)?;
    }
    Ok(())
}

/// Klein bottle (one twisted edge pair) or cross-surface (both twisted).
fn join_twisted_edges<E: Engine + ?Sized>(u: &mut E, t: &Topology) -> Result<(), EngineError> {
    let (gl, gt, gr, gb) = (t.left, t.top, t.right, t.bottom);
    let (bl, bt, br, bb) = (gl - 1, gt - 1, gr + 1, gb + 1);

    if t.h_twist && t.v_twist {
        // cross-surface: both edge pairs join reflected
        for x in gl..=gr {
            let twisted_x = gr - x + gl;
            let state = u.get_cell(twisted_x, gt);
            if state > 0 {
                u.set_cell(x, bb, state)?;
            }
            let state = u.get_cell(twisted_x, gb);
            if state > 0 {
                u.set_cell(x, bt, state)?;
            }
        }
        for y in gt..=gb {
            let twisted_y = gb - y + gt;
            let state = u.get_cell(gl, twisted_y);
            if state > 0 {
                u.set_cell(br, y, state)?;
            }
            let state = u.get_cell(gr, twisted_y);
            if state > 0 {
                u.set_cell(bl, y, state)?;
            }
        }
        // corner cells go to the SAME corners in the border (they are
        // topologically different to non-corner cells)
        let s = u.get_cell(gl, gt);
        u.set_cell(bl, bt, s)?;
        let s = u.get_cell(gr, gt);
        u.set_cell(br, bt, s)?;
        let s = u.get_cell(gr, gb);
        u.set_cell(br, bb, s)?;
        let s = u.get_cell(gl, gb);
        u.set_cell(bl, bb, s)?;
    } else if t.h_twist {
        // Klein bottle with top and bottom edges twisted 180 degrees
        for x in gl..=gr {
            let twisted_x = gr - x + gl;
            let state = u.get_cell(twisted_x, gt);
            if state > 0 {
                u.set_cell(x, bb, state)?;
            }
            let state = u.get_cell(twisted_x, gb);
            if state > 0 {
                u.set_cell(x, bt, state)?;
            }
        }
        for y in gt..=gb {
            // left and right edges join with no twist
            let state = u.get_cell(gl, y);
            if state > 0 {
                u.set_cell(br, y, state)?;
            }
            let state = u.get_cell(gr, y);
            if state > 0 {
                u.set_cell(bl, y, state)?;
            }
        }
        let s = u.get_cell(gl, gb);
        u.set_cell(bl, bt, s)?;
        let s = u.get_cell(gr, gb);
        u.set_cell(br, bt, s)?;
        let s = u.get_cell(gl, gt);
        u.set_cell(bl, bb, s)?;
        let s = u.get_cell(gr, gt);
        u.set_cell(br, bb, s)?;
    } else {
        // Klein bottle with left and right edges twisted 180 degrees
        for x in gl..=gr {
            let state = u.get_cell(x, gt);
            if state > 0 {
                u.set_cell(x, bb, state)?;
            }
            let state = u.get_cell(x, gb);
            if state > 0 {
                u.set_cell(x, bt, state)?;
            }
        }
        for y in gt..=gb {
            let twisted_y = gb - y + gt;
            let state = u.get_cell(gl, twisted_y);
            if state > 0 {
                u.set_cell(br, y, state)?;
            }
            let state = u.get_cell(gr, twisted_y);
            if state > 0 {
                u.set_cell(bl, y, state)?;
            }
        }
        let s = u.get_cell(gr, gt);
        u.set_cell(bl, bt, s)?;
        let s = u.get_cell(gl, gt);
        u.set_cell(br, bt, s)?;
        let s = u.get_cell(gr, gb);
        u.set_cell(bl, bb, s)?;
        let s = u.get_cell(gl, gb);
        u.set_cell(br, bb, s)?;
    }
    Ok(())
}

/// Klein bottle whose twisted edge additionally shifts by 1 (requires an
/// even edge length).
fn join_twisted_and_shifted_edges<E: Engine + ?Sized>(
    u: &mut E,
    t: &Topology,
) -> Result<(), EngineError> {
    let (gl, gt, gr, gb) = (t.left, t.top, t.right, t.bottom);
    let (bl, bt, br, bb) = (gl - 1, gt - 1, gr + 1, gb + 1);

    if t.h_shift != 0 {
        let shift_left = |x: i32| if x - 1 < gl { gr } else { x - 1 };
        for x in gl..=gr {
            // join top and bottom edges with a twist and then shift by 1
            let shifted_x = shift_left(gr - x + gl);
            let state = u.get_cell(shifted_x, gb);
            if state > 0 {
                u.set_cell(x, bt, state)?;
            }
            let state = u.get_cell(shifted_x, gt);
            if state > 0 {
                u.set_cell(x, bb, state)?;
            }
        }
        for y in gt..=gb {
            // left and right edges join with no twist or shift
            let state = u.get_cell(gl, y);
            if state > 0 {
                u.set_cell(br, y, state)?;
            }
            let state = u.get_cell(gr, y);
            if state > 0 {
                u.set_cell(bl, y, state)?;
            }
        }
        let shifted_x = shift_left(gl);
        let s = u.get_cell(shifted_x, gb);
        u.set_cell(bl, bt, s)?;
        let s = u.get_cell(shifted_x, gt);
        u.set_cell(bl, bb, s)?;
        let shifted_x = shift_left(gr);
        let s = u.get_cell(shifted_x, gb);
        u.set_cell(br, bt, s)?;
        let s = u.get_cell(shifted_x, gt);
        u.set_cell(br, bb, s)?;
    } else {
        let shift_up = |y: i32| if y - 1 < gt { gb } else { y - 1 };
        for x in gl..=gr {
            // join top and bottom edges with no twist or shift
            let state = u.get_cell(x, gt);
            if state > 0 {
                u.set_cell(x, bb, state)?;
            }
            let state = u.get_cell(x, gb);
            if state > 0 {
                u.set_cell(x, bt, state)?;
            }
        }
        for y in gt..=gb {
            // join left and right edges with a twist and then shift by 1
            let shifted_y = shift_up(gb - y + gt);
            let state = u.get_cell(gr, shifted_y);
            if state > 0 {
                u.set_cell(bl, y, state)?;
            }
            let state = u.get_cell(gl, shifted_y);
            if state > 0 {
                u.set_cell(br, y, state)?;
            }
        }
        let shifted_y = shift_up(gt);
        let s = u.get_cell(gr, shifted_y);
        u.set_cell(bl, bt, s)?;
        let s = u.get_cell(gl, shifted_y);
        u.set_cell(br, bt, s)?;
        let shifted_y = shift_up(gb);
        let s = u.get_cell(gr, shifted_y);
        u.set_cell(bl, bb, s)?;
        let s = u.get_cell(gl, shifted_y);
        u.set_cell(br, bb, s)?;
    }
    Ok(())
}

/// Sphere: the top edge joins the left edge and the right edge joins the
/// bottom edge (a rotational join). The grid is always square.
fn join_adjacent_edges<E: Engine + ?Sized>(
    u: &mut E,
    t: &Topology,
    edges: &Edges,
) -> Result<(), EngineError> {
    let (gl, gt, gr, gb) = (t.left, t.top, t.right, t.bottom);
    let (bl, bt, br, bb) = (gl - 1, gt - 1, gr + 1, gb + 1);

    // copy live cells in the top edge to the left border
    let mut x = edges.left;
    while x <= edges.right {
        let Some((skip, state)) = u.next_cell(x, gt) else {
            break;
        };
        x += skip;
        if state > 0 {
            u.set_cell(bl, gt + (x - gl), state)?;
        }
        x += 1;
    }

    // copy live cells in the left edge to the top border
    for y in edges.top..=edges.bottom {
        let state = u.get_cell(gl, y);
        if state > 0 {
            u.set_cell(gl + (y - gt), bt, state)?;
        }
    }

    // copy live cells in the bottom edge to the right border
    let mut x = edges.left;
    while x <= edges.right {
        let Some((skip, state)) = u.next_cell(x, gb) else {
            break;
        };
        x += skip;
        if state > 0 {
            u.set_cell(br, gt + (x - gl), state)?;
        }
        x += 1;
    }

    // copy live cells in the right edge to the bottom border
    for y in edges.top..=edges.bottom {
        let state = u.get_cell(gr, y);
        if state > 0 {
            u.set_cell(gl + (y - gt), bb, state)?;
        }
    }

    // corner cells go to the SAME corners in the border
    let s = u.get_cell(gl, gt);
    u.set_cell(bl, bt, s)?;
    let s = u.get_cell(gr, gt);
    u.set_cell(br, bt, s)?;
    let s = u.get_cell(gr, gb);
    u.set_cell(br, bb, s)?;
    let s = u.get_cell(gl, gb);
    u.set_cell(bl, bb, s)?;
    Ok(())
}
