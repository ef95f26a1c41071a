//! The rule compiler.
//!
//! Parses a textual rule description (totalistic `B3/S23` style rules,
//! non-totalistic isotropic rules with per-count letters, Wolfram `W<n>`
//! codes and explicit `MAP<base64>` lookup tables, each with an optional
//! bounded-grid suffix) into the lookup tables the generation engines
//! consume:
//!
//! - `rule3x3`: 512 entries mapping every 3x3 Moore neighbourhood (bit 4
//!   is the centre cell) to the next centre state.
//! - `rule0`/`rule1`: 65536 entries mapping a 4x4 cell window to the 6-bit
//!   encoding of the 2x2 centre of its next generation (top two bits =
//!   top row, bottom two bits = bottom row, middle two bits zero).
//!   `rule1` only exists to emulate B0-without-Smax rules, which need
//!   different tables on odd and even generations.
//!
//! Compilation is a pure function: each engine owns its own
//! [`CompiledRule`], and a failed parse leaves the previous rule intact.

mod isotropic;

use crate::error::RuleError;
use crate::topology::Topology;
use isotropic::{
    NEGATIVE_BIT, RULE_LETTERS, RULE_NEIGHBORHOODS, SURVIVAL_OFFSET, VALID_RULE_LETTERS,
    flip_bits, max_letters, order_letters, rotate_bits_90_clockwise,
};

/// Maximum number of characters in a rule string.
pub const MAX_RULE_SIZE: usize = 500;

/// All possible 3x3 cell combinations.
const ALL3X3: usize = 512;
/// All possible 4x4 cell combinations.
const ALL4X4: usize = 65536;

/// Base64 characters used by MAP rules, in index order.
const BASE64_CHARACTERS: &[u8] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZabcdefghijklmnopqrstuvwxyz0123456789+/";

/// Number of base64 characters encoding a 512-bit Moore map.
const MAP512_LENGTH: usize = 86;
/// Number of base64 characters encoding a 128-bit hexagonal map.
const MAP128_LENGTH: usize = 22;
/// Number of base64 characters encoding a 32-bit von Neumann map.
const MAP32_LENGTH: usize = 6;

/// Which cells of the 3x3 window participate in the rule.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Neighborhood {
    /// All 8 neighbours.
    Moore,
    /// Ignore the NE and SW neighbours.
    Hexagonal,
    /// The 4 orthogonal neighbours.
    VonNeumann,
}

impl Neighborhood {
    /// 9-bit participation mask over the 3x3 window.
    pub fn mask(self) -> u16 {
        match self {
            Neighborhood::Moore => 0x1ff,
            Neighborhood::Hexagonal => 0x0fe,
            Neighborhood::VonNeumann => 0x0ba,
        }
    }

    /// Number of participating neighbours.
    pub fn neighbors(self) -> u32 {
        match self {
            Neighborhood::Moore => 8,
            Neighborhood::Hexagonal => 6,
            Neighborhood::VonNeumann => 4,
        }
    }
}

/// A rule compiled into lookup tables, plus its canonical name.
#[derive(Debug)]
pub struct CompiledRule {
    neighborhood: Neighborhood,
    totalistic: bool,
    using_map: bool,
    wolfram: i32,
    rulebits: u32,
    letter_bits: [u16; 18],
    rule3x3: [u8; ALL3X3],
    rule0: Box<[u8; ALL4X4]>,
    rule1: Box<[u8; ALL4X4]>,
    alternate_rules: bool,
    canonical: String,
}

impl Default for CompiledRule {
    /// Conway's Life, `B3/S23`.
    fn default() -> Self {
        let (rule, _) = CompiledRule::compile("B3/S23").expect("default rule is valid");
        rule
    }
}

impl CompiledRule {
    /// Compile a rule string, returning the rule tables and the parsed
    /// grid topology (unbounded when the string has no `:` suffix).
    pub fn compile(rule_string: &str) -> Result<(CompiledRule, Topology), RuleError> {
        if rule_string.len() > MAX_RULE_SIZE {
            return Err(RuleError::TooLong);
        }

        let mut rule = CompiledRule {
            neighborhood: Neighborhood::Moore,
            totalistic: true,
            using_map: false,
            wolfram: -1,
            rulebits: 0,
            letter_bits: [0; 18],
            rule3x3: [0; ALL3X3],
            rule0: Box::new([0; ALL4X4]),
            rule1: Box::new([0; ALL4X4]),
            alternate_rules: false,
            canonical: String::new(),
        };

        // only the part before any topology suffix describes transitions
        let (head, suffix) = match rule_string.find(':') {
            Some(pos) => (&rule_string[..pos], Some(&rule_string[pos..])),
            None => (rule_string, None),
        };
        let head = head.trim_start_matches(' ');

        let mut map_base64 = String::new();
        let mut birth = String::new();
        let mut survival = String::new();

        if head.len() >= 3 && head.is_char_boundary(3) && head[..3].eq_ignore_ascii_case("map") {
            map_base64 = rule.parse_map(&head[3..])?;
        } else {
            (birth, survival) = rule.parse_birth_survival(head)?;
        }

        let topology = match suffix {
            Some(s) => Topology::parse_suffix(s)?,
            None => Topology::unbounded(),
        };

        if rule.wolfram >= 0 {
            rule.create_wolfram_map();
        } else if rule.using_map {
            rule.create_rule_map_from_map(map_base64.as_bytes());
        } else {
            rule.create_rule_map(&birth, &survival);
        }

        rule.create_canonical_name(&map_base64, &topology);
        rule.save_rule();

        Ok((rule, topology))
    }

    /// Validate a `MAP` rule body and remember the neighbourhood implied
    /// by its length. Returns the base64 payload without padding.
    fn parse_map(&mut self, body: &str) -> Result<String, RuleError> {
        let mut payload = body;
        if payload.len() > 2 && payload.ends_with("==") {
            payload = &payload[..payload.len() - 2];
        }
        match payload.len() {
            MAP512_LENGTH => {}
            MAP128_LENGTH => self.neighborhood = Neighborhood::Hexagonal,
            MAP32_LENGTH => self.neighborhood = Neighborhood::VonNeumann,
            _ => return Err(RuleError::MapLength),
        }
        if payload
            .bytes()
            .any(|c| !BASE64_CHARACTERS.contains(&c))
        {
            return Err(RuleError::MapCharacter);
        }
        self.using_map = true;
        Ok(payload.to_owned())
    }

    /// Tidy and split a non-MAP rule body into its birth and survival
    /// parts, handling every separator form (`B3/S23`, `23/3`, `B3S23`,
    /// underscore, bare `B`/`S`), Wolfram codes, and neighbourhood
    /// suffix letters.
    fn parse_birth_survival(&mut self, head: &str) -> Result<(String, String), RuleError> {
        let mut tidy: Vec<u8> = Vec::with_capacity(head.len());
        let mut bpos: Option<usize> = None;
        let mut spos: Option<usize> = None;
        let mut slashpos: Option<usize> = None;
        let mut underscorepos: Option<usize> = None;
        let mut maxdigit = 0u32;

        for c in head.bytes() {
            let c = c.to_ascii_lowercase();
            match c {
                b'b' => {
                    if bpos.is_some() {
                        return Err(RuleError::MultipleBirth);
                    }
                    bpos = Some(tidy.len());
                    tidy.push(c);
                }
                b's' => {
                    if spos.is_some() {
                        return Err(RuleError::MultipleSurvival);
                    }
                    spos = Some(tidy.len());
                    tidy.push(c);
                }
                b'/' => {
                    if slashpos.is_some() {
                        return Err(RuleError::MultipleSlash);
                    }
                    slashpos = Some(tidy.len());
                    tidy.push(c);
                }
                b'_' => {
                    if underscorepos.is_some() {
                        return Err(RuleError::MultipleUnderscore);
                    }
                    underscorepos = Some(tidy.len());
                    tidy.push(c);
                }
                b'h' => {
                    if self.neighborhood != Neighborhood::Moore || self.wolfram != -1 {
                        return Err(RuleError::MultipleNeighborhood);
                    }
                    self.neighborhood = Neighborhood::Hexagonal;
                    tidy.push(c);
                }
                b'v' => {
                    if self.neighborhood != Neighborhood::Moore || self.wolfram != -1 {
                        return Err(RuleError::MultipleNeighborhood);
                    }
                    self.neighborhood = Neighborhood::VonNeumann;
                    tidy.push(c);
                }
                b'w' => {
                    if tidy.is_empty() {
                        if self.neighborhood != Neighborhood::Moore || self.wolfram != -1 {
                            return Err(RuleError::MultipleNeighborhood);
                        }
                        self.wolfram = 0;
                    } else {
                        tidy.push(c);
                        self.totalistic = false;
                    }
                }
                b'-' => {
                    match tidy.last() {
                        Some(&d) if d.is_ascii_digit() && d <= b'8' => {}
                        _ => return Err(RuleError::BadMinus),
                    }
                    tidy.push(c);
                    self.totalistic = false;
                }
                b' ' => {}
                _ => {
                    if let Some(pos) = VALID_RULE_LETTERS.bytes().position(|v| v == c) {
                        tidy.push(c);
                        if pos > 8 {
                            self.totalistic = false;
                        } else if pos as u32 > maxdigit {
                            maxdigit = pos as u32;
                        }
                    } else if self.wolfram == 0 && c == b'9' {
                        tidy.push(c);
                    } else {
                        return Err(RuleError::BadCharacter);
                    }
                }
            }
        }

        if tidy.is_empty() {
            return Err(RuleError::Empty);
        }
        if underscorepos.is_some() && slashpos.is_some() {
            return Err(RuleError::SlashAndUnderscore);
        }
        if underscorepos.is_some() && self.totalistic {
            return Err(RuleError::UnderscoreTotalistic);
        }
        if underscorepos.is_some() {
            slashpos = underscorepos;
        }

        if self.wolfram == 0 {
            // parse Wolfram 1D rule
            let mut value: i64 = 0;
            let mut rest = &tidy[..];
            while let Some(d @ b'0'..=b'9') = rest.first() {
                value = (10 * value + i64::from(d - b'0')).min(1000);
                rest = &rest[1..];
            }
            if !(0..=254).contains(&value) || value & 1 != 0 {
                return Err(RuleError::WolframRange);
            }
            if !rest.is_empty() {
                return Err(RuleError::WolframCharacter);
            }
            self.wolfram = value as i32;
            return Ok((String::new(), String::new()));
        }

        // if a neighbourhood was specified it must be the last character
        if self.neighborhood != Neighborhood::Moore {
            match tidy.last() {
                Some(b'h' | b'v') => {
                    tidy.pop();
                }
                Some(_) => return Err(RuleError::NeighborhoodPosition),
                None => {}
            }
        }

        if slashpos.is_none() && bpos.is_none() && spos.is_none() {
            return Err(RuleError::MissingSeparator);
        }
        if maxdigit > self.neighborhood.neighbors() {
            return Err(RuleError::DigitTooBig);
        }
        if let (Some(sl), Some(b), Some(s)) = (slashpos, bpos, spos) {
            if (b < sl && s < sl) || (b > sl && s > sl) {
                return Err(RuleError::BirthSurvivalOrder);
            }
        }

        let strip = |part: &[u8], skip: u8| -> String {
            part.iter()
                .filter(|&&c| c != skip)
                .map(|&c| c as char)
                .collect()
        };

        let (birth, survival) = match slashpos {
            None => match (bpos, spos) {
                (Some(b), Some(s)) if b < s => {
                    (strip(&tidy[b + 1..s], b'b'), strip(&tidy[s + 1..], b's'))
                }
                (Some(b), Some(s)) => {
                    (strip(&tidy[b + 1..], b'b'), strip(&tidy[s + 1..b], b's'))
                }
                (Some(_), None) => (strip(&tidy, b'b'), String::new()),
                _ => (String::new(), strip(&tidy, b's')),
            },
            Some(sl) => {
                let left = &tidy[..sl];
                let right = &tidy[sl + 1..];
                if bpos.is_some() || spos.is_some() {
                    let birth_first = bpos.is_some_and(|b| b < sl) || spos.is_some_and(|s| s > sl);
                    if birth_first {
                        (strip(left, b'b'), strip(right, b's'))
                    } else {
                        (strip(right, b'b'), strip(left, b's'))
                    }
                } else {
                    // no B or S given, so survival comes first
                    (strip(right, b'b'), strip(left, b's'))
                }
            }
        };

        if !self.totalistic {
            if birth.bytes().next().is_some_and(|c| !(b'0'..=b'8').contains(&c)) {
                return Err(RuleError::BirthNeedsDigit);
            }
            if survival.bytes().next().is_some_and(|c| !(b'0'..=b'8').contains(&c)) {
                return Err(RuleError::SurvivalNeedsDigit);
            }
            if self.neighborhood != Neighborhood::Moore {
                return Err(RuleError::NonTotalisticNeighborhood);
            }
        }

        if !letters_valid(&birth) {
            return Err(RuleError::BadBirthLetter);
        }
        if !letters_valid(&survival) {
            return Err(RuleError::BadSurvivalLetter);
        }

        Ok((birth, survival))
    }

    /// Mark every neighbourhood whose participating-cell count equals
    /// `value` as a birth (or survival) in the 3x3 map.
    fn set_totalistic(&mut self, value: u32, survival: bool) {
        let offset = if survival { SURVIVAL_OFFSET } else { 0 };
        if self.rulebits & (1 << (value as usize + offset)) != 0 {
            return; // already processed
        }
        self.rulebits |= 1 << (value as usize + offset);

        let mask = if survival { 0x10 } else { 0 };
        let nmask = self.neighborhood.mask();
        // enumerate the 512 entries with the centre bit clear
        for i in (0..ALL3X3).step_by(32) {
            for j in 0..16 {
                let nhood = (i + j) as u16 & nmask;
                if u32::from(nhood.count_ones()) == value {
                    self.rule3x3[i + j + mask] = 1;
                }
            }
        }
    }

    /// Write `b` into all 8 square symmetries of neighbourhood `x`.
    fn set_symmetrical_512(&mut self, x: u16, b: u8) {
        let mut y = x;
        for _ in 0..4 {
            self.rule3x3[y as usize] = b;
            y = rotate_bits_90_clockwise(y);
        }
        y = flip_bits(y);
        for _ in 0..4 {
            self.rule3x3[y as usize] = b;
            y = rotate_bits_90_clockwise(y);
        }
    }

    /// Apply one non-totalistic letter: look up the isotropy-class
    /// representative for (count, letter), reflecting the class index for
    /// counts above 4, and mark (or clear, when negated) its symmetries.
    fn set_symmetrical(&mut self, value: u32, survival: bool, lindex: usize, normal: bool) {
        if value == 0 || value == 8 {
            // homogeneous neighbourhoods have no letters
            self.set_totalistic(value, survival);
            return;
        }
        let offset = if survival { SURVIVAL_OFFSET } else { 0 };
        self.rulebits |= 1 << (value as usize + offset);

        let mut nindex = value as usize - 1;
        let mut xorbit = 0u16;
        if nindex > 3 {
            nindex = 6 - nindex;
            xorbit = 0x1ef;
        }

        self.letter_bits[value as usize + offset] |= 1 << lindex;
        if !normal {
            self.letter_bits[value as usize + offset] |= 1 << NEGATIVE_BIT;
        }

        let mut x = RULE_NEIGHBORHOODS[nindex][lindex] ^ xorbit;
        if survival {
            x |= 0x10;
        }
        self.set_symmetrical_512(x, normal as u8);
    }

    fn set_totalistic_rule_from_string(&mut self, part: &str, survival: bool) {
        for c in part.bytes() {
            self.set_totalistic(u32::from(c - b'0'), survival);
        }
    }

    /// Process a non-totalistic birth or survival part: digits optionally
    /// followed by letters, with `-` inverting the letters that follow
    /// (totalistic fill first, then the listed classes cleared).
    fn set_rule_from_string(&mut self, part: &str, survival: bool) {
        let bytes = part.as_bytes();
        let letter_index = |c: u8| RULE_LETTERS[3].bytes().position(|l| l == c);
        let mut i = 0;
        while i < bytes.len() {
            let c = bytes[i];
            i += 1;
            if !(b'0'..=b'8').contains(&c) {
                continue;
            }
            let value = u32::from(c - b'0');

            // a digit not directly followed by a letter is totalistic
            // (a minus also lands here: inversion starts from the full set)
            let next = bytes.get(i).copied();
            if next.and_then(letter_index).is_none() {
                self.set_totalistic(value, survival);
            }

            let mut normal = true;
            if next == Some(b'-') {
                i += 1;
                normal = false;
            }

            while let Some(lindex) = bytes.get(i).copied().and_then(letter_index) {
                self.set_symmetrical(value, survival, lindex, normal);
                i += 1;
            }
        }
    }

    /// Fill `rule3x3` from the Wolfram code: the new centre is set when
    /// the code fires on the row above, or the centre is already alive.
    fn create_wolfram_map(&mut self) {
        for i in 0..ALL3X3 {
            if (self.wolfram & (1 << (i & 7))) != 0 || (i & 16) != 0 {
                self.rule3x3[i] = 1;
            }
        }
    }

    /// Decode a MAP payload into `rule3x3` through the neighbourhood mask.
    fn create_rule_map_from_map(&mut self, base64: &[u8]) {
        let neighbors = self.neighborhood.neighbors() as usize;
        let power2 = 1usize << (neighbors + 1);
        let fullchars = power2 / 6;
        let remainbits = power2 % 6;

        let mut bits = [0u8; ALL3X3];
        let mut j = 0;
        for &ch in base64.iter().take(fullchars) {
            let c = base64_index(ch);
            for b in (0..6).rev() {
                bits[j] = (c >> b) & 1;
                j += 1;
            }
        }
        if remainbits > 0 {
            let c = base64.get(fullchars).copied().map_or(0, base64_index);
            let mut b = 5;
            for _ in 0..remainbits {
                bits[j] = (c >> b) & 1;
                b -= 1;
                j += 1;
            }
        }

        // gather each 3x3 index's participating bits into a dense index
        let nmask = self.neighborhood.mask();
        for i in 0..ALL3X3 {
            let mut k = 0usize;
            let mut m = neighbors;
            for j in (0..=8).rev() {
                if nmask & (1 << j) != 0 {
                    if i & (1 << j) != 0 {
                        k |= 1 << m;
                    }
                    m = m.wrapping_sub(1);
                }
            }
            self.rule3x3[i] = bits[k];
        }
    }

    fn create_rule_map(&mut self, birth: &str, survival: &str) {
        if self.totalistic {
            self.set_totalistic_rule_from_string(birth, false);
            self.set_totalistic_rule_from_string(survival, true);
        } else {
            self.set_rule_from_string(birth, false);
            self.set_rule_from_string(survival, true);
        }
    }

    /// Append the canonical letters for a neighbour count, inverting the
    /// letter set when that produces a shorter form. Removes the digit
    /// just written when the letters cancel out entirely.
    fn add_letters(&self, count: usize, out: &mut String) -> bool {
        if self.letter_bits[count] == 0 {
            return false;
        }
        let mut bits = self.letter_bits[count];
        let mut negative = bits & (1 << NEGATIVE_BIT) != 0;
        bits &= !(1 << NEGATIVE_BIT);

        let setbits = bits.count_ones() as usize;
        let maxbits = max_letters(count);

        // don't invert a positive 7-letter set at the 13-letter count
        if !(!negative && setbits == 7 && maxbits == 13)
            && setbits + usize::from(negative) > (maxbits >> 1)
        {
            bits = !bits & ((1 << maxbits) - 1);
            if bits != 0 {
                negative = !negative;
            }
        }

        if negative && bits == 0 {
            // negating every letter removes the whole neighbour count
            out.pop();
            return false;
        }
        if negative {
            out.push('-');
        }
        let mut added = false;
        for &letter in order_letters(count) {
            if bits & (1 << letter) != 0 {
                out.push(RULE_LETTERS[3].as_bytes()[letter] as char);
                added = true;
            }
        }
        added
    }

    /// Build the canonical rule name (including any topology suffix).
    fn create_canonical_name(&mut self, map_base64: &str, topology: &Topology) {
        let mut name = String::new();
        let mut still_non_totalistic = false;

        if self.wolfram >= 0 {
            name = format!("W{}", self.wolfram);
        } else if self.using_map {
            name.push_str("MAP");
            let neighbors = self.neighborhood.neighbors() as usize;
            let power2 = 1usize << (neighbors + 1);
            let fullchars = power2 / 6;
            let remainbits = power2 % 6;
            let bytes = map_base64.as_bytes();
            for &ch in bytes.iter().take(fullchars) {
                name.push(ch as char);
            }
            if let Some(&ch) = bytes.get(fullchars) {
                // zero the unused trailing bits of the final character
                let c = base64_index(ch);
                let keep = (((1u8 << remainbits) - 1) << (6 - remainbits)) & 0x3f;
                name.push(BASE64_CHARACTERS[(c & keep) as usize] as char);
            }
        } else {
            name.push('B');
            for i in 0..=self.neighborhood.neighbors() as usize {
                if self.rulebits & (1 << i) != 0 {
                    name.push((b'0' + i as u8) as char);
                    if !self.totalistic && self.add_letters(i, &mut name) {
                        still_non_totalistic = true;
                    }
                }
            }
            name.push('/');
            name.push('S');
            for i in 0..=self.neighborhood.neighbors() as usize {
                if self.rulebits & (1 << (SURVIVAL_OFFSET + i)) != 0 {
                    name.push((b'0' + i as u8) as char);
                    if !self.totalistic && self.add_letters(SURVIVAL_OFFSET + i, &mut name) {
                        still_non_totalistic = true;
                    }
                }
            }
            if !self.totalistic && !still_non_totalistic {
                self.totalistic = true;
            }
            match self.neighborhood {
                Neighborhood::Hexagonal => name.push('H'),
                Neighborhood::VonNeumann => name.push('V'),
                Neighborhood::Moore => {}
            }
        }

        if let Some(bounds) = topology.canonical_suffix() {
            name.push_str(&bounds);
        }
        self.canonical = name;
    }

    /// Handle B0 emulation and produce the 4x4 tables.
    ///
    /// A rule that births from an empty neighbourhood would light the
    /// whole infinite background. When it also survives a full
    /// neighbourhood, complementing the universe every generation maps it
    /// onto a single ordinary table; otherwise two tables alternate.
    fn save_rule(&mut self) {
        if self.wolfram == -1 && self.rule3x3[0] != 0 {
            if self.rule3x3[ALL3X3 - 1] != 0 {
                // B0 with Smax: rule -> NOT(reverse(bits))
                for i in 0..ALL3X3 / 2 {
                    let tmp = self.rule3x3[i];
                    self.rule3x3[i] = 1 - self.rule3x3[ALL3X3 - i - 1];
                    self.rule3x3[ALL3X3 - i - 1] = 1 - tmp;
                }
            } else {
                // B0 without Smax needs one rule per generation parity
                self.alternate_rules = true;

                // odd rule -> reverse(bits)
                for i in 0..ALL3X3 / 2 {
                    self.rule3x3.swap(i, ALL3X3 - i - 1);
                }
                self.convert_to_4x4_map(true);

                // even rule -> NOT(bits); reverse first to undo the odd step
                for i in 0..ALL3X3 / 2 {
                    let tmp = self.rule3x3[i];
                    self.rule3x3[i] = 1 - self.rule3x3[ALL3X3 - i - 1];
                    self.rule3x3[ALL3X3 - i - 1] = 1 - tmp;
                }
            }
        }
        self.convert_to_4x4_map(false);
    }

    /// Convert the 3x3 map to a 4x4 map by four 3x3 lookups per entry.
    fn convert_to_4x4_map(&mut self, odd: bool) {
        for i in 0..ALL4X4 {
            let mut v: u8;
            // upper left 3x3 window -> output bit 5
            v = self.rule3x3[((i & 57344) >> 13) | ((i & 3584) >> 6) | ((i & 224) << 1)] << 5;
            // upper right -> bit 4
            v |= self.rule3x3[((i & 28672) >> 12) | ((i & 1792) >> 5) | ((i & 112) << 2)] << 4;
            // lower left -> bit 1
            v |= self.rule3x3[((i & 3584) >> 9) | ((i & 224) >> 2) | ((i & 14) << 5)] << 1;
            // lower right -> bit 0
            v |= self.rule3x3[((i & 1792) >> 8) | ((i & 112) >> 1) | ((i & 7) << 6)];
            if odd {
                self.rule1[i] = v;
            } else {
                self.rule0[i] = v;
            }
        }
    }

    /// Canonical form of the compiled rule.
    pub fn canonical_name(&self) -> &str {
        &self.canonical
    }

    /// Next state of the centre cell for a 9-bit 3x3 neighbourhood.
    #[inline]
    pub fn next_state(&self, neighborhood: u16) -> u8 {
        self.rule3x3[neighborhood as usize & (ALL3X3 - 1)]
    }

    /// The even-generation (or only) 4x4 lookup table.
    pub fn table0(&self) -> &[u8; ALL4X4] {
        &self.rule0
    }

    /// The odd-generation 4x4 lookup table (meaningful only when
    /// [`CompiledRule::alternate_rules`] holds).
    pub fn table1(&self) -> &[u8; ALL4X4] {
        &self.rule1
    }

    /// Mutable table access for engines that store a flipped orientation.
    pub(crate) fn tables_mut(&mut self) -> (&mut [u8; ALL4X4], &mut [u8; ALL4X4]) {
        (&mut self.rule0, &mut self.rule1)
    }

    /// True when odd generations must use [`CompiledRule::table1`].
    pub fn alternate_rules(&self) -> bool {
        self.alternate_rules
    }

    pub fn neighborhood(&self) -> Neighborhood {
        self.neighborhood
    }

    /// Is this B3/S23?
    pub fn is_regular_life(&self) -> bool {
        self.neighborhood == Neighborhood::Moore
            && self.totalistic
            && self.rulebits == 0x1808
            && self.wolfram < 0
    }

    pub fn is_hexagonal(&self) -> bool {
        self.neighborhood == Neighborhood::Hexagonal
    }

    pub fn is_von_neumann(&self) -> bool {
        self.neighborhood == Neighborhood::VonNeumann
    }

    pub fn is_wolfram(&self) -> bool {
        self.wolfram >= 0
    }
}

fn base64_index(c: u8) -> u8 {
    BASE64_CHARACTERS
        .iter()
        .position(|&b| b == c)
        .unwrap_or(0) as u8
}

/// Check non-totalistic letters against the counts they follow.
fn letters_valid(part: &str) -> bool {
    let mut current_count: i32 = -1;
    let mut nindex = 0usize;
    for c in part.bytes() {
        if (b'0'..=b'8').contains(&c) {
            current_count = i32::from(c - b'0');
            let n = current_count - 1;
            nindex = if n > 3 { (6 - n) as usize } else { n.max(0) as usize };
        } else if c != b'-' {
            // counts 0 and 8 have a single homogeneous neighbourhood
            if current_count == 0 || current_count == 8 {
                return false;
            }
            if !RULE_LETTERS[nindex].bytes().any(|l| l == c) {
                return false;
            }
        }
    }
    true
}

#[cfg(test)]
mod tests {
    use super::*;

    fn compile(rule: &str) -> CompiledRule {
        CompiledRule::compile(rule).unwrap().0
    }

    #[test]
    fn test_life_tables() {
        let r = compile("B3/S23");
        assert!(r.is_regular_life());
        assert_eq!(r.canonical_name(), "B3/S23");
        // dead centre with three neighbours births
        assert_eq!(r.next_state(0b000_0_0111), 1);
        // live centre with two neighbours survives
        assert_eq!(r.next_state(0b000_1_0011 | 0x10), 1);
        // empty neighbourhood stays dead
        assert_eq!(r.next_state(0), 0);
        // full neighbourhood dies
        assert_eq!(r.next_state(0x1ff), 0);
    }

    #[test]
    fn test_survival_encoded_by_centre_bit() {
        let r = compile("B3/S23");
        for i in 0..512u16 {
            let count = (i & !0x10).count_ones();
            let expect = if i & 0x10 != 0 {
                u8::from(count == 2 || count == 3)
            } else {
                u8::from(count == 3)
            };
            assert_eq!(r.next_state(i), expect, "index {i:#011b}");
        }
    }

    #[test]
    fn test_rule0_values_have_zero_middle_bits() {
        let r = compile("B3/S23");
        for &v in r.table0().iter() {
            assert_eq!(v & 0b001100, 0);
        }
    }

    #[test]
    fn test_alternate_notations_canonicalise() {
        assert_eq!(compile("23/3").canonical_name(), "B3/S23");
        assert_eq!(compile("b3s23").canonical_name(), "B3/S23");
        assert_eq!(compile("S23/B3").canonical_name(), "B3/S23");
        assert_eq!(compile(" B3 / S23 ").canonical_name(), "B3/S23");
        assert_eq!(compile("B36/S23").canonical_name(), "B36/S23");
        assert_eq!(compile("22/2H").canonical_name(), "B2/S22H");
        assert_eq!(compile("B2/S13V").canonical_name(), "B2/S13V");
    }

    #[test]
    fn test_canonicalisation_is_idempotent() {
        for rule in [
            "B3/S23",
            "B2ce3-k/S1e2-a",
            "W110",
            "B36/S23",
            "B2/S34H",
            "B3/S23:T100,200",
            "B0123478/S01234678",
            "B2a_S2a",
        ] {
            let first = compile(rule);
            let second = compile(first.canonical_name());
            assert_eq!(first.canonical_name(), second.canonical_name(), "{rule}");
            assert_eq!(first.rule3x3[..], second.rule3x3[..], "{rule}");
        }
    }

    #[test]
    fn test_wolfram_rules() {
        let r = compile("W110");
        assert!(r.is_wolfram());
        assert_eq!(r.canonical_name(), "W110");
        // rule 110: 0b01101110 over the three cells of the row above
        for prev in 0..8u16 {
            let fires = 110 & (1 << prev) != 0;
            assert_eq!(r.next_state(prev) != 0, fires, "prev {prev:03b}");
            // an already-live centre always stays on
            assert_eq!(r.next_state(prev | 0x10), 1);
        }
        assert_eq!(
            CompiledRule::compile("W111").unwrap_err(),
            RuleError::WolframRange
        );
        assert_eq!(
            CompiledRule::compile("W256").unwrap_err(),
            RuleError::WolframRange
        );
        assert_eq!(
            CompiledRule::compile("W12x").unwrap_err(),
            RuleError::WolframCharacter
        );
    }

    #[test]
    fn test_non_totalistic_letters() {
        let r = compile("B2a/S2a");
        // 'a' at count 2 marks representative 3 (two adjacent edge cells)
        // and its 8 symmetries
        assert_eq!(r.next_state(3), 1);
        assert_eq!(r.next_state(flip_bits(3)), 1);
        assert_eq!(r.next_state(rotate_bits_90_clockwise(3)), 1);
        // 'i' at count 2 (representative 40) is a different class
        assert_eq!(r.next_state(40), 0);
        assert_eq!(r.canonical_name(), "B2a/S2a");
    }

    #[test]
    fn test_negated_letters_complement_the_class() {
        let all = compile("B2/S");
        let negated = compile("B2-a/S");
        let only = compile("B2a/S");
        for i in 0..512u16 {
            if i & 0x10 != 0 {
                continue;
            }
            let expect = all.next_state(i) != 0 && only.next_state(i) == 0;
            assert_eq!(negated.next_state(i) != 0, expect, "index {i}");
        }
    }

    #[test]
    fn test_letters_valid_per_count() {
        assert_eq!(
            CompiledRule::compile("B2y/S23").unwrap_err(),
            RuleError::BadBirthLetter
        );
        assert_eq!(
            CompiledRule::compile("B3/S2y").unwrap_err(),
            RuleError::BadSurvivalLetter
        );
        assert_eq!(
            CompiledRule::compile("B0c/S23").unwrap_err(),
            RuleError::BadBirthLetter
        );
        assert!(CompiledRule::compile("B2c/S23").is_ok());
    }

    #[test]
    fn test_parse_rejections() {
        use RuleError::*;
        for (rule, err) in [
            ("", Empty),
            ("B3B2/S23", MultipleBirth),
            ("B3/S23/S1", MultipleSlash),
            ("B3/S23HV", MultipleNeighborhood),
            ("B9/S23", DigitTooBig),
            ("B7/S23H", DigitTooBig),
            ("B5/S23V", DigitTooBig),
            ("-3/S23", BadMinus),
            ("B3x/S23", BadCharacter),
            ("123", MissingSeparator),
            ("B3H/S23", NeighborhoodPosition),
            ("B3/S2a3H", NonTotalisticNeighborhood),
            ("B2a_S2a/", SlashAndUnderscore),
            ("B3_S23", UnderscoreTotalistic),
            ("B3S2/3", BirthSurvivalOrder),
            ("Ba2/S23", BirthNeedsDigit),
        ] {
            assert_eq!(CompiledRule::compile(rule).unwrap_err(), err, "{rule:?}");
        }
    }

    #[test]
    fn test_b0_with_smax_uses_single_table() {
        let r = compile("B0123478/S01234678");
        assert!(!r.alternate_rules());
        // emulated table: rule3x3[i] = 1 - original[0x1ff - i]
        assert_eq!(r.canonical_name(), "B0123478/S01234678");
    }

    #[test]
    fn test_b0_without_smax_uses_alternate_tables() {
        let r = compile("B03/S23");
        assert!(r.alternate_rules());
        // even generations: NOT(original); the empty neighbourhood no
        // longer births in table terms, it inverts
        assert_eq!(r.rule3x3[0], 0);
    }

    #[test]
    fn test_map_rule_matches_equivalent_totalistic_rule(){
        let life = compile("B3/S23");
        // dense MAP index == 3x3 index for the Moore neighbourhood, bits
        // packed MSB-first six to a base64 character
        let mut payload = String::new();
        for chunk in 0..MAP512_LENGTH {
            let mut c = 0u8;
            for b in 0..6 {
                let bit = chunk * 6 + b;
                if bit < ALL3X3 && life.rule3x3[bit] != 0 {
                    c |= 1 << (5 - b);
                }
            }
            payload.push(BASE64_CHARACTERS[c as usize] as char);
        }
        let map_rule = compile(&format!("MAP{payload}"));
        assert_eq!(map_rule.rule3x3[..], life.rule3x3[..]);
        assert_eq!(map_rule.canonical_name(), format!("MAP{payload}"));
        // padding is accepted and trailing unused bits are normalised
        let padded = compile(&format!("MAP{payload}=="));
        assert_eq!(padded.canonical_name(), format!("MAP{payload}"));
    }

    #[test]
    fn test_map_rejections() {
        assert_eq!(
            CompiledRule::compile("MAPABC").unwrap_err(),
            RuleError::MapLength
        );
        let bad = format!("MAP{}", "*".repeat(86));
        assert_eq!(CompiledRule::compile(&bad).unwrap_err(), RuleError::MapCharacter);
    }

    #[test]
    fn test_map_lengths_select_neighborhood() {
        let hex = format!("MAP{}", "A".repeat(22));
        assert!(compile(&hex).is_hexagonal());
        let vn = format!("MAP{}", "A".repeat(6));
        assert!(compile(&vn).is_von_neumann());
    }

    #[test]
    fn test_topology_suffix_is_parsed_and_canonicalised() {
        let (r, t) = CompiledRule::compile("B3/S23:t100,200").unwrap();
        assert_eq!(t.width, 100);
        assert_eq!(t.height, 200);
        assert_eq!(r.canonical_name(), "B3/S23:T100,200");
        assert!(
            CompiledRule::compile("B3/S23")
                .unwrap()
                .1
                .is_unbounded()
        );
    }
}
