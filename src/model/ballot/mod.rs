//! Sealing ballots under the election key and committing to the result.
//!
//! A vote moves through [`Ballot`] → [`EncryptedBallot`] → [`CommittedBallot`]
//! → [`BallotCommitment`]; each step consumes the previous one, so nothing
//! half-built can be submitted.

mod commitment;
pub(crate) mod key;
mod sealed;

pub use commitment::{verify_commitment, Commitment, Verification};
pub use key::{ElectionKey, MIN_KEY_BITS};
pub use sealed::{encrypt_and_commit, Ballot, BallotCommitment, CommittedBallot, EncryptedBallot};
