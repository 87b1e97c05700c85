use latch_store::{ActionStore, StoreError};
use latch_types::{Token, TokenFormat};
use rand::Rng;
use thiserror::Error;

/// Collision budget before minting gives up. Hitting it means the
/// alphabet/length combination is too small for the live record volume,
/// which is a configuration error rather than a transient fault.
pub const MAX_MINT_ATTEMPTS: usize = 10;

/// Draw a fresh token for `format`, probing `store` for collisions.
/// No persistence side effect; the caller inserts the record.
pub fn mint(store: &dyn ActionStore, format: &TokenFormat) -> Result<Token, MintError> {
    let alphabet: Vec<char> = format.alphabet().chars().collect();
    if alphabet.is_empty() || format.length() == 0 {
        return Err(MintError::UnusableFormat);
    }
    let mut rng = rand::thread_rng();
    for _ in 0..MAX_MINT_ATTEMPTS {
        let token = draw(&mut rng, &alphabet, format.length());
        if !store.contains(&token)? {
            return Ok(token);
        }
    }
    Err(MintError::SpaceExhausted {
        attempts: MAX_MINT_ATTEMPTS,
    })
}

fn draw(rng: &mut impl Rng, alphabet: &[char], length: usize) -> Token {
    let token: String = (0..length)
        .map(|_| alphabet[rng.gen_range(0..alphabet.len())])
        .collect();
    Token::new(token)
}

#[derive(Debug, Error)]
pub enum MintError {
    #[error("token format has an empty alphabet or zero length")]
    UnusableFormat,
    #[error(
        "failed to find a free token after {attempts} attempts; alphabet/length too small for the current volume"
    )]
    SpaceExhausted { attempts: usize },
    #[error("store error: {0}")]
    Store(#[from] StoreError),
}
