use rand::seq::SliceRandom;
use rand::Rng;

pub const TEMPORARY_PASSWORD_LENGTH: usize = 12;

const UPPER: &[u8] = b"ABCDEFGHJKLMNPQRSTUVWXYZ";
const LOWER: &[u8] = b"abcdefghijkmnopqrstuvwxyz";
const DIGITS: &[u8] = b"23456789";
const SYMBOLS: &[u8] = b"!@#$%^&*";

/// One-time password handed to a newly approved agent. Contains at least one
/// character from each class; ambiguous glyphs (0/O, 1/l/I) are excluded.
pub fn generate_temporary_password() -> String {
    let mut rng = rand::thread_rng();
    let classes = [UPPER, LOWER, DIGITS, SYMBOLS];

    let mut chars: Vec<u8> = classes
        .iter()
        .map(|class| class[rng.gen_range(0..class.len())])
        .collect();

    let pool: Vec<u8> = classes.concat();
    while chars.len() < TEMPORARY_PASSWORD_LENGTH {
        chars.push(pool[rng.gen_range(0..pool.len())]);
    }
    chars.shuffle(&mut rng);

    chars.into_iter().map(char::from).collect()
}
