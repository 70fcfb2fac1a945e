//! One-time code generation
//!
//! Every character is drawn independently and uniformly from the alphabet
//! with `Rng::gen_range`, which rejects out-of-range samples instead of
//! reducing modulo the alphabet size. Fixed-width output keeps leading zeros,
//! so a 6-digit decimal code covers the full `000000..=999999` range.

use rand::rngs::OsRng;
use rand::Rng;

use crate::errors::{DomainError, DomainResult};

pub const DEFAULT_CODE_LENGTH: usize = 6;
pub const DECIMAL_ALPHABET: &str = "0123456789";

#[derive(Debug, Clone)]
pub struct CodeGenerator {
    alphabet: Vec<char>,
    length: usize,
}

impl CodeGenerator {
    /// Build a generator; the alphabet needs at least two distinct characters
    pub fn new(alphabet: &str, length: usize) -> DomainResult<Self> {
        if length == 0 {
            return Err(DomainError::invalid_strategy("otp_length must be positive"));
        }

        let chars: Vec<char> = alphabet.chars().collect();
        if chars.len() < 2 {
            return Err(DomainError::invalid_strategy(
                "alphabet must contain at least two characters",
            ));
        }
        let mut unique = chars.clone();
        unique.sort_unstable();
        unique.dedup();
        // Repeated characters would skew the distribution.
        if unique.len() != chars.len() {
            return Err(DomainError::invalid_strategy(
                "alphabet must not contain duplicate characters",
            ));
        }

        Ok(Self {
            alphabet: chars,
            length,
        })
    }

    /// Decimal codes of the given width
    pub fn numeric(length: usize) -> DomainResult<Self> {
        Self::new(DECIMAL_ALPHABET, length)
    }

    pub fn length(&self) -> usize {
        self.length
    }

    pub fn alphabet(&self) -> &[char] {
        &self.alphabet
    }

    /// Generate a code from the operating system CSPRNG
    pub fn generate(&self) -> String {
        self.generate_with(&mut OsRng)
    }

    /// Generate a code from a caller-supplied random source
    pub fn generate_with<R: Rng + ?Sized>(&self, rng: &mut R) -> String {
        (0..self.length)
            .map(|_| self.alphabet[rng.gen_range(0..self.alphabet.len())])
            .collect()
    }
}

impl Default for CodeGenerator {
    fn default() -> Self {
        Self {
            alphabet: DECIMAL_ALPHABET.chars().collect(),
            length: DEFAULT_CODE_LENGTH,
        }
    }
}
