//! Attack tables
//!
//! Knight, king and pawn attacks are plain per-square masks. Rook and bishop
//! attacks use magic bitboards: the blockers on a square's relevant mask are
//! multiplied by a per-square magic and shifted down to index a table that
//! holds the attack set for every blocker subset.

use crate::core::bitboard::Bitboard;
use crate::core::board::{Color, PieceType, Square};
use crate::error::MagicError;
use rand::Rng;
use std::sync::OnceLock;

/// Sliding piece families that own magic tables
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum Slider {
    Rook,
    Bishop,
}

impl Slider {
    const fn directions(self) -> [(i8, i8); 4] {
        match self {
            Slider::Rook => [(0, 1), (0, -1), (1, 0), (-1, 0)],
            Slider::Bishop => [(1, 1), (1, -1), (-1, 1), (-1, -1)],
        }
    }

    pub const fn name(self) -> &'static str {
        match self {
            Slider::Rook => "rook",
            Slider::Bishop => "bishop",
        }
    }

    /// Relevant blocker squares: every ray square except the last one on the board edge
    pub fn mask(self, sq: Square) -> Bitboard {
        let rank = sq.rank() as i8;
        let file = sq.file() as i8;
        let mut mask = Bitboard::EMPTY;
        for (dr, df) in self.directions() {
            let mut r = rank + dr;
            let mut f = file + df;
            while (0..8).contains(&(r + dr)) && (0..8).contains(&(f + df)) {
                mask.set(Square::from_file_rank(f as u8, r as u8));
                r += dr;
                f += df;
            }
        }
        mask
    }

    /// Ray-traced attack set, stopping on (and including) the first blocker
    pub fn sliding_attacks(self, sq: Square, occupied: Bitboard) -> Bitboard {
        let rank = sq.rank() as i8;
        let file = sq.file() as i8;
        let mut attacks = Bitboard::EMPTY;
        for (dr, df) in self.directions() {
            let mut r = rank + dr;
            let mut f = file + df;
            while (0..8).contains(&r) && (0..8).contains(&f) {
                let target = Square::from_file_rank(f as u8, r as u8);
                attacks.set(target);
                if occupied.contains(target) {
                    break;
                }
                r += dr;
                f += df;
            }
        }
        attacks
    }
}

/// Spread the low bits of `index` over the set squares of `mask`
pub fn index_to_occupancy(index: usize, mask: Bitboard) -> Bitboard {
    let mut occ = Bitboard::EMPTY;
    for (i, sq) in mask.iter().enumerate() {
        if (index >> i) & 1 != 0 {
            occ.set(sq);
        }
    }
    occ
}

#[derive(Clone, Copy, Default)]
struct Magic {
    mask: u64,
    magic: u64,
    shift: u32,
    offset: usize,
}

impl Magic {
    #[inline]
    fn index(&self, occupied: Bitboard) -> usize {
        self.offset + ((occupied.0 & self.mask).wrapping_mul(self.magic) >> self.shift) as usize
    }
}

/// Precomputed attack tables, shared read-only by every search
pub struct AttackTables {
    knight: [Bitboard; 64],
    king: [Bitboard; 64],
    pawn: [[Bitboard; 64]; 2],
    rook_magics: [Magic; 64],
    bishop_magics: [Magic; 64],
    rook_table: Box<[Bitboard]>,
    bishop_table: Box<[Bitboard]>,
}

static TABLES: OnceLock<AttackTables> = OnceLock::new();

impl AttackTables {
    /// Get the global attack tables, building them on first use
    pub fn instance() -> &'static AttackTables {
        TABLES.get_or_init(AttackTables::init)
    }

    fn init() -> Self {
        let mut tables = AttackTables {
            knight: [Bitboard::EMPTY; 64],
            king: [Bitboard::EMPTY; 64],
            pawn: [[Bitboard::EMPTY; 64]; 2],
            rook_magics: [Magic::default(); 64],
            bishop_magics: [Magic::default(); 64],
            rook_table: Box::default(),
            bishop_table: Box::default(),
        };

        for sq in (0..64).map(Square) {
            let bb = sq.bitboard();
            let i = sq.index();

            let not_ab = !(Bitboard::FILE_A | Bitboard::file_mask(1));
            let not_gh = !(Bitboard::file_mask(6) | Bitboard::FILE_H);
            tables.knight[i] = (Bitboard(bb.0 << 17) & !Bitboard::FILE_A)
                | (Bitboard(bb.0 << 15) & !Bitboard::FILE_H)
                | (Bitboard(bb.0 << 10) & not_ab)
                | (Bitboard(bb.0 << 6) & not_gh)
                | (Bitboard(bb.0 >> 17) & !Bitboard::FILE_H)
                | (Bitboard(bb.0 >> 15) & !Bitboard::FILE_A)
                | (Bitboard(bb.0 >> 10) & not_gh)
                | (Bitboard(bb.0 >> 6) & not_ab);

            tables.king[i] = bb.north()
                | bb.south()
                | bb.east()
                | bb.west()
                | bb.north_east()
                | bb.north_west()
                | bb.south_east()
                | bb.south_west();

            tables.pawn[Color::White.index()][i] = bb.north_east() | bb.north_west();
            tables.pawn[Color::Black.index()][i] = bb.south_east() | bb.south_west();
        }

        let (rook_magics, rook_table) = build_slider(Slider::Rook, &ROOK_MAGICS);
        let (bishop_magics, bishop_table) = build_slider(Slider::Bishop, &BISHOP_MAGICS);
        tables.rook_magics = rook_magics;
        tables.rook_table = rook_table;
        tables.bishop_magics = bishop_magics;
        tables.bishop_table = bishop_table;
        tables
    }

    #[inline]
    pub fn knight(&self, sq: Square) -> Bitboard {
        self.knight[sq.index()]
    }

    #[inline]
    pub fn king(&self, sq: Square) -> Bitboard {
        self.king[sq.index()]
    }

    /// Squares a `color` pawn on `sq` attacks
    #[inline]
    pub fn pawn(&self, color: Color, sq: Square) -> Bitboard {
        self.pawn[color.index()][sq.index()]
    }

    #[inline]
    pub fn rook(&self, sq: Square, occupied: Bitboard) -> Bitboard {
        self.rook_table[self.rook_magics[sq.index()].index(occupied)]
    }

    #[inline]
    pub fn bishop(&self, sq: Square, occupied: Bitboard) -> Bitboard {
        self.bishop_table[self.bishop_magics[sq.index()].index(occupied)]
    }

    #[inline]
    pub fn queen(&self, sq: Square, occupied: Bitboard) -> Bitboard {
        self.rook(sq, occupied) | self.bishop(sq, occupied)
    }

    /// Attack set of any piece kind; `color` only matters for pawns
    pub fn attacks(&self, piece: PieceType, color: Color, sq: Square, occupied: Bitboard) -> Bitboard {
        match piece {
            PieceType::Pawn => self.pawn(color, sq),
            PieceType::Knight => self.knight(sq),
            PieceType::Bishop => self.bishop(sq, occupied),
            PieceType::Rook => self.rook(sq, occupied),
            PieceType::Queen => self.queen(sq, occupied),
            PieceType::King => self.king(sq),
        }
    }
}

fn build_slider(slider: Slider, magics: &[u64; 64]) -> ([Magic; 64], Box<[Bitboard]>) {
    let mut entries = [Magic::default(); 64];
    let mut offset = 0;
    for (i, entry) in entries.iter_mut().enumerate() {
        let mask = slider.mask(Square(i as u8));
        let bits = mask.count();
        *entry = Magic {
            mask: mask.0,
            magic: magics[i],
            shift: 64 - bits,
            offset,
        };
        offset += 1 << bits;
    }

    let mut table = vec![Bitboard::EMPTY; offset].into_boxed_slice();
    for (i, entry) in entries.iter().enumerate() {
        let sq = Square(i as u8);
        let mask = Bitboard(entry.mask);
        for index in 0..(1usize << mask.count()) {
            let occ = index_to_occupancy(index, mask);
            table[entry.index(occ)] = slider.sliding_attacks(sq, occ);
        }
    }
    (entries, table)
}

/// Search for a magic multiplier for `slider` on `sq` by trying random sparse
/// candidates. A candidate is accepted when no two blocker subsets with
/// different attack sets share an index.
pub fn find_magic<R: Rng>(
    slider: Slider,
    sq: Square,
    rng: &mut R,
    max_attempts: u64,
) -> Result<u64, MagicError> {
    let mask = slider.mask(sq);
    let bits = mask.count();
    let size = 1usize << bits;
    let occupancies: Vec<Bitboard> = (0..size).map(|i| index_to_occupancy(i, mask)).collect();
    let attacks: Vec<Bitboard> = occupancies
        .iter()
        .map(|&occ| slider.sliding_attacks(sq, occ))
        .collect();

    let mut used: Vec<Option<Bitboard>> = vec![None; size];
    for _ in 0..max_attempts {
        let magic = rng.random::<u64>() & rng.random::<u64>() & rng.random::<u64>();
        if (mask.0.wrapping_mul(magic) >> 56).count_ones() < 6 {
            continue;
        }

        used.iter_mut().for_each(|slot| *slot = None);
        let fits = occupancies.iter().zip(&attacks).all(|(occ, &attack)| {
            let index = (occ.0.wrapping_mul(magic) >> (64 - bits)) as usize;
            match used[index] {
                None => {
                    used[index] = Some(attack);
                    true
                }
                Some(existing) => existing == attack,
            }
        });
        if fits {
            return Ok(magic);
        }
    }

    Err(MagicError::Exhausted {
        piece: slider.name(),
        square: sq.0,
        attempts: max_attempts,
    })
}

#[rustfmt::skip]
pub const ROOK_MAGICS: [u64; 64] = [
    0x2200102081020040, 0x0040001000200040, 0x0200081022004080, 0x0480100004800800,
    0x4300020408001100, 0x5380220004008001, 0x1880420001000080, 0x2080090000204080,
    0x0208800840008020, 0x0002804000802004, 0x20050040A0010412, 0x1000808010000800,
    0x8080800400800800, 0x0002800400020080, 0x1812000200040801, 0x11010001804B0006,
    0x8400208000804012, 0x4010004040002000, 0xA830008011892000, 0x4088028010028008,
    0x0280828008000400, 0x1001010004000208, 0x0482840008019002, 0x1080020000807104,
    0x89188C2280004010, 0x0044200440100240, 0x01B0110300200040, 0x2000120200084021,
    0x0048004040040200, 0x0042002280040080, 0x0020188C00023009, 0x3801040200184493,
    0x8040008020800042, 0xA010002000404000, 0x0220008020801000, 0x1010100101000820,
    0x1044008008080040, 0x0480040080800200, 0x0004410284000850, 0x12000100420000B4,
    0x0080034120024000, 0x2810002003C2400A, 0x0050040800A12000, 0x0261201001030008,
    0x9800080005010010, 0x1080040002008080, 0x0100021008040001, 0x2200004081020014,
    0x0080208000400080, 0x0008204010850100, 0x0050008020001880, 0x8080081001002100,
    0x0200040008008080, 0x1082000400028080, 0x40220008C4010200, 0x2100802100004080,
    0x6000204108108005, 0x5000860043002016, 0x1100800A02603142, 0x0001002008041001,
    0x0802002004100802, 0x5801008400020841, 0x0000013000922804, 0x401000208110440A,
];

#[rustfmt::skip]
pub const BISHOP_MAGICS: [u64; 64] = [
    0x8008421002002100, 0x0004940404023010, 0x0008080122280000, 0x2260A10044000002,
    0x0A1424204E840200, 0x007201110906022C, 0x0106081109080800, 0x1005004802011085,
    0x0104904408080044, 0x0008100200890600, 0x4408040112020000, 0x0000442408902010,
    0x8008011140020020, 0x0008088844401008, 0x00000202092D4002, 0x8080010400840440,
    0x0408714108014402, 0x0802300448080105, 0x0110096040418420, 0x5014000840420800,
    0x2001020290400400, 0xD023810808010880, 0x0008810210842000, 0x0901004028821000,
    0x0020502044040831, 0x2001200004084200, 0x4015110210040921, 0x4004004044010102,
    0x0004082084002004, 0x000041001080A000, 0x011400A080421030, 0x6401044802044C00,
    0x4001084010099010, 0xA041010800208800, 0x8084004800810200, 0x3852020083080080,
    0x2004200200102080, 0x04010E0202008800, 0x1004080890020880, 0x2111020092002410,
    0x0C440584B0004004, 0x4331541A20000803, 0x42020C0048010400, 0x0094084208018080,
    0x4800080100411400, 0x0950201808206040, 0x0902040124220201, 0x001002060A200040,
    0x1280482804510000, 0x6009008801084000, 0x0202104628040010, 0x50000E020A020002,
    0x0000000821010060, 0x2108889010008014, 0x0411200984028080, 0x004284041082000D,
    0x0020148401084040, 0x0240004104212080, 0x0602000219008800, 0xC000000001AA0800,
    0x40840A2010420200, 0x0000024008410100, 0x0010A8A004C08200, 0x0005200401022700,
];

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    #[test]
    fn test_knight_attacks() {
        let tables = AttackTables::instance();
        assert_eq!(tables.knight(Square::E4).count(), 8);
        assert_eq!(tables.knight(Square::A1).count(), 2);
    }

    #[test]
    fn test_king_attacks() {
        let tables = AttackTables::instance();
        assert_eq!(tables.king(Square::E4).count(), 8);
        assert_eq!(tables.king(Square::A1).count(), 3);
    }

    #[test]
    fn test_pawn_attacks_by_color() {
        let tables = AttackTables::instance();
        assert_eq!(
            tables.pawn(Color::White, Square::E4),
            Bitboard::from_square(Square::D5) | Bitboard::from_square(Square(37))
        );
        assert_eq!(tables.pawn(Color::Black, Square::A8), Bitboard::from_square(Square(49)));
    }

    #[test]
    fn test_sliders_on_empty_board() {
        let tables = AttackTables::instance();
        assert_eq!(tables.rook(Square::E4, Bitboard::EMPTY).count(), 14);
        assert_eq!(tables.bishop(Square::E4, Bitboard::EMPTY).count(), 13);
        assert_eq!(tables.queen(Square::A1, Bitboard::EMPTY).count(), 21);
    }

    #[test]
    fn test_magic_lookup_matches_ray_tracing() {
        let tables = AttackTables::instance();
        let mut rng = StdRng::seed_from_u64(7);
        for _ in 0..2000 {
            let occ = Bitboard(rng.random::<u64>() & rng.random::<u64>());
            let sq = Square(rng.random_range(0..64u8));
            assert_eq!(tables.rook(sq, occ), Slider::Rook.sliding_attacks(sq, occ));
            assert_eq!(tables.bishop(sq, occ), Slider::Bishop.sliding_attacks(sq, occ));
        }
    }

    #[test]
    fn test_table_sizes() {
        let rook: usize = (0..64).map(|i| 1usize << Slider::Rook.mask(Square(i)).count()).sum();
        let bishop: usize = (0..64).map(|i| 1usize << Slider::Bishop.mask(Square(i)).count()).sum();
        assert_eq!(rook, 102_400);
        assert_eq!(bishop, 5_248);
    }

    #[test]
    fn test_find_magic_for_bishop() {
        let mut rng = StdRng::seed_from_u64(0xDEAD_BEEF);
        let magic = find_magic(Slider::Bishop, Square::D5, &mut rng, 1_000_000).unwrap();
        let mask = Slider::Bishop.mask(Square::D5);
        let bits = mask.count();
        for index in 0..(1usize << bits) {
            for other in (index + 1)..(1usize << bits) {
                let a = index_to_occupancy(index, mask);
                let b = index_to_occupancy(other, mask);
                if (a.0.wrapping_mul(magic) >> (64 - bits)) == (b.0.wrapping_mul(magic) >> (64 - bits)) {
                    assert_eq!(
                        Slider::Bishop.sliding_attacks(Square::D5, a),
                        Slider::Bishop.sliding_attacks(Square::D5, b)
                    );
                }
            }
        }
    }

    #[test]
    fn test_find_magic_gives_up() {
        let mut rng = StdRng::seed_from_u64(1);
        let err = find_magic(Slider::Rook, Square::A1, &mut rng, 0).unwrap_err();
        assert_eq!(
            err,
            MagicError::Exhausted { piece: "rook", square: 0, attempts: 0 }
        );
    }
}
