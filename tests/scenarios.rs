//! End-to-end scenarios exercising the rule compiler, both engines and
//! the bounded-grid topologies together.

use gridlife::pattern::presets;
use gridlife::{CompiledRule, Engine, LargerThanLife, QuickLife};

/// Life in LtL syntax.
const LTL_LIFE: &str = "R1,C0,M0,S2..3,B3..3,NM";

fn live_cells(engine: &mut dyn Engine, x0: i32, y0: i32, x1: i32, y1: i32) -> Vec<(i32, i32)> {
    let mut cells = Vec::new();
    for y in y0..=y1 {
        for x in x0..=x1 {
            if engine.get_cell(x, y) > 0 {
                cells.push((x, y));
            }
        }
    }
    cells
}

#[test]
fn blinker_on_bounded_plane() {
    let mut q = QuickLife::new();
    q.set_rule("B3/S23:P5,5").unwrap();
    assert_eq!(q.rule(), "B3/S23:P5,5");
    // horizontal blinker through the middle of the 5x5 plane
    for x in -1..=1 {
        q.set_cell(x, 0, 1).unwrap();
    }
    q.step().unwrap();
    assert_eq!(
        live_cells(&mut q, -2, -2, 2, 2),
        vec![(0, -1), (0, 0), (0, 1)]
    );
    q.step().unwrap();
    assert_eq!(
        live_cells(&mut q, -2, -2, 2, 2),
        vec![(-1, 0), (0, 0), (1, 0)]
    );
}

#[test]
fn b0_with_smax_uses_complemented_single_table() {
    // B0 plus survival-on-8 folds into one table: the compiled table must
    // equal the complement of the raw table read backwards
    let (rule, _) = CompiledRule::compile("B0123478/S01234678").unwrap();
    assert!(!rule.alternate_rules());

    let births = [0, 1, 2, 3, 4, 7, 8];
    let survivals = [0, 1, 2, 3, 4, 6, 7, 8];
    for i in 0..512u16 {
        let raw = |idx: u16| {
            let count = (idx & !0x10).count_ones() as i32;
            if idx & 0x10 != 0 {
                u8::from(survivals.contains(&count))
            } else {
                u8::from(births.contains(&count))
            }
        };
        assert_eq!(rule.next_state(i), 1 - raw(511 - i), "index {i}");
    }
}

#[test]
fn b0_without_smax_uses_alternating_tables() {
    let (rule, _) = CompiledRule::compile("B03/S23").unwrap();
    assert!(rule.alternate_rules());
    // even-generation table is the complement of the raw table
    let raw = |idx: u16| {
        let count = (idx & !0x10).count_ones();
        if idx & 0x10 != 0 {
            u8::from(count == 2 || count == 3)
        } else {
            u8::from(count == 0 || count == 3)
        }
    };
    for i in 0..512u16 {
        assert_eq!(rule.next_state(i), 1 - raw(i), "index {i}");
    }
}

#[test]
fn klein_twist_and_shift_adjacency() {
    let mut q = QuickLife::new();
    q.set_rule("B3/S23:K4*+1,3").unwrap();
    assert_eq!(q.rule(), "B3/S23:K4*+1,3");
    // blinker along the top edge of the twisted grid
    for &(x, y) in &[(-2, -1), (-1, -1), (0, -1)] {
        q.set_cell(x, y, 1).unwrap();
    }
    q.step().unwrap();
    // the twisted-and-shifted wrap reflects the row onto the bottom
    // border one cell over, turning the blinker vertical
    assert_eq!(
        live_cells(&mut q, -3, -2, 2, 2),
        vec![(-1, -1), (-1, 0), (-1, 1)]
    );
}

#[test]
fn ltl_bug_rule_stays_alive_without_saturating() {
    let mut e = LargerThanLife::new();
    e.set_rule("R5,C0,M1,S33..57,B34..45,NM:T50,50").unwrap();
    presets::random_block(10, 10, 0.5, 11).place(&mut e, -5, -5).unwrap();
    e.set_increment(100);
    e.step().unwrap();
    let pop = e.population();
    assert!((50..=5000).contains(&pop), "population {pop}");
}

#[test]
fn map_encoding_of_life_evolves_like_life() {
    // build the MAP payload straight from the compiled Life tables
    let (life, _) = CompiledRule::compile("B3/S23").unwrap();
    const BASE64: &[u8] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZabcdefghijklmnopqrstuvwxyz0123456789+/";
    let mut payload = String::new();
    for chunk in 0..86 {
        let mut c = 0u8;
        for b in 0..6 {
            let bit = chunk * 6 + b;
            if bit < 512 && life.next_state(bit as u16) != 0 {
                c |= 1 << (5 - b);
            }
        }
        payload.push(BASE64[c as usize] as char);
    }
    let map_rule = format!("MAP{payload}");

    let mut a = QuickLife::new();
    a.set_rule("B3/S23").unwrap();
    let mut b = QuickLife::new();
    b.set_rule(&map_rule).unwrap();
    assert_eq!(b.rule(), map_rule);

    presets::r_pentomino().place(&mut a, 0, 0).unwrap();
    presets::r_pentomino().place(&mut b, 0, 0).unwrap();
    for _ in 0..30 {
        a.step().unwrap();
        b.step().unwrap();
    }
    assert_eq!(a.population(), b.population());
    assert_eq!(
        live_cells(&mut a, -40, -40, 40, 40),
        live_cells(&mut b, -40, -40, 40, 40)
    );
}

#[test]
fn quicklife_uproot_keeps_distant_cells_readable() {
    let mut q = QuickLife::new();
    q.set_cell(0, 0, 1).unwrap();
    q.set_cell(100_000_000, 100_000_000, 1).unwrap();
    assert_eq!(q.get_cell(0, 0), 1);
    assert_eq!(q.get_cell(100_000_000, 100_000_000), 1);
    assert_eq!(q.get_cell(1_000_000_000, 1_000_000_000), 0);
    assert_eq!(q.population(), 2);
}

#[test]
fn quicklife_and_ltl_agree_on_life() {
    let soup = presets::random_block(30, 30, 0.35, 5);
    let mut a = QuickLife::new();
    soup.place(&mut a, -15, -15).unwrap();
    let mut b = LargerThanLife::new();
    b.set_rule(LTL_LIFE).unwrap();
    soup.place(&mut b, -15, -15).unwrap();

    for generation in 1..=10 {
        a.step().unwrap();
        b.step().unwrap();
        assert_eq!(a.population(), b.population(), "generation {generation}");
    }
    assert_eq!(
        live_cells(&mut a, -40, -40, 40, 40),
        live_cells(&mut b, -40, -40, 40, 40)
    );
}

#[test]
fn torus_glider_round_trip() {
    let mut q = QuickLife::new();
    q.set_rule("B3/S23:T100,100").unwrap();
    presets::glider().place(&mut q, 0, 0).unwrap();
    let before = live_cells(&mut q, -50, -50, 49, 49);
    q.set_increment(400);
    q.step().unwrap();
    // 400 generations move the glider 100 cells diagonally, which is one
    // full wrap of the torus
    assert_eq!(live_cells(&mut q, -50, -50, 49, 49), before);
}

#[test]
fn bounded_border_strip_is_clear_before_and_after_steps() {
    for rule in ["B3/S23:T12,9", "B3/S23:K8*,8", "B3/S23:C9,9", "B3/S23:S10"] {
        let mut q = QuickLife::new();
        q.set_rule(rule).unwrap();
        presets::r_pentomino().place(&mut q, -1, -1).unwrap();
        for _ in 0..15 {
            q.step().unwrap();
            let t = *q.topology();
            for x in t.left - 1..=t.right + 1 {
                assert_eq!(q.get_cell(x, t.top - 1), 0, "{rule}");
                assert_eq!(q.get_cell(x, t.bottom + 1), 0, "{rule}");
            }
            for y in t.top - 1..=t.bottom + 1 {
                assert_eq!(q.get_cell(t.left - 1, y), 0, "{rule}");
                assert_eq!(q.get_cell(t.right + 1, y), 0, "{rule}");
            }
        }
    }
}

#[test]
fn canonicalisation_is_idempotent_across_engines() {
    let mut q = QuickLife::new();
    for rule in ["b3s23", "23/3", "B2ce3-k/S1e2-a", "W110", "B3/S23:t30,40"] {
        q.set_rule(rule).unwrap();
        let canonical = q.rule().to_owned();
        q.set_rule(&canonical).unwrap();
        assert_eq!(q.rule(), canonical, "{rule}");
    }
    let mut e = LargerThanLife::new();
    for rule in ["R5,C0,M1,S34..58,B34..45,NM", "5,34,45,34,58"] {
        e.set_rule(rule).unwrap();
        let canonical = e.rule().to_owned();
        e.set_rule(&canonical).unwrap();
        assert_eq!(e.rule(), canonical, "{rule}");
    }
}

#[test]
fn failed_rule_parse_preserves_engine_state() {
    let mut q = QuickLife::new();
    q.set_rule("B36/S23").unwrap();
    presets::block().place(&mut q, 0, 0).unwrap();
    assert!(q.set_rule("B9/S23").is_err());
    assert_eq!(q.rule(), "B36/S23");
    assert_eq!(q.population(), 4);
    q.step().unwrap();
    assert_eq!(q.population(), 4);
}

#[test]
fn ltl_history_rule_on_torus_keeps_states_in_range() {
    let mut e = LargerThanLife::new();
    e.set_rule("R2,C4,M1,S8..14,B10..14,NM:T30,30").unwrap();
    presets::random_block(12, 12, 0.5, 3).place(&mut e, -6, -6).unwrap();
    let states = e.num_cell_states() as u8;
    for _ in 0..25 {
        e.step().unwrap();
        for y in -15..15 {
            for x in -15..15 {
                assert!(e.get_cell(x, y) < states);
            }
        }
    }
}
