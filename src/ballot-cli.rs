//! A client-side tool for sealing ballots and checking commitments.
//! This uses the same sealing and commitment code as the server, so its output
//! is accepted as-is by `POST /api/vote/cast`.

use std::fs;

use clap::{Arg, ArgAction, ArgMatches, Command};
use data_encoding::BASE64;
use rocket::serde::json::serde_json;

use chainvote_backend::model::ballot::{
    encrypt_and_commit, verify_commitment, Commitment, Verification,
};

const PROGRAM_NAME: &str = "ballot-cli";

const ABOUT_TEXT: &str = "Seal a ballot under the election key, or check a ballot commitment.

EXIT CODES:
     0: Success.
   255: Ran successfully, but the commitment did not match.
 Other: Error.";

const SEAL: &str = "seal";
const VERIFY: &str = "verify";
const PUBLIC_KEY_PEM: &str = "PUBLIC_KEY_PEM";
const CANDIDATE_ID: &str = "CANDIDATE_ID";
const CIPHERTEXT_PATH: &str = "CIPHERTEXT_PATH";
const COMMITMENT: &str = "COMMITMENT";

/// Construct the CLI configuration.
fn cli() -> Command {
    // Make the build dirty when the toml changes.
    include_str!("../Cargo.toml");

    clap::command!(PROGRAM_NAME)
        .about(ABOUT_TEXT)
        .subcommand_required(true)
        .subcommand(
            Command::new(SEAL)
                .about("Encrypt a ballot and print it with its commitment as JSON")
                .arg(
                    Arg::new(PUBLIC_KEY_PEM)
                        .help("Path to the election public key, as served by `GET /api/election/public-key`")
                        .action(ArgAction::Set)
                        .required(true),
                )
                .arg(
                    Arg::new(CANDIDATE_ID)
                        .help("The candidate to vote for")
                        .action(ArgAction::Set)
                        .required(true),
                ),
        )
        .subcommand(
            Command::new(VERIFY)
                .about("Check that a base64 ciphertext matches a hex commitment")
                .arg(
                    Arg::new(CIPHERTEXT_PATH)
                        .help("Path to a file holding the base64 ciphertext")
                        .action(ArgAction::Set)
                        .required(true),
                )
                .arg(
                    Arg::new(COMMITMENT)
                        .help("The 64-character hex commitment")
                        .action(ArgAction::Set)
                        .required(true),
                ),
        )
}

/// Errors that this program may produce.
#[derive(Debug, Eq, PartialEq)]
enum Error {
    /// IO error described by the inner message.
    IO(String),
    /// Input that could not be decoded.
    Format(String),
    /// The server-side ballot code refused the input.
    Ballot(String),
    /// The ciphertext does not hash to the claimed commitment.
    Mismatch { recomputed: Commitment },
}

/// Seal a ballot, returning the JSON body for a cast request.
fn seal(key_path: &str, candidate_id: &str) -> Result<String, Error> {
    let pem = fs::read_to_string(key_path).map_err(|e| Error::IO(e.to_string()))?;
    let committed =
        encrypt_and_commit(&pem, candidate_id).map_err(|e| Error::Ballot(e.to_string()))?;
    serde_json::to_string_pretty(&committed).map_err(|e| Error::Format(e.to_string()))
}

/// Check a stored ciphertext against a commitment.
fn verify(ciphertext_path: &str, commitment: &str) -> Result<Commitment, Error> {
    let encoded = fs::read_to_string(ciphertext_path).map_err(|e| Error::IO(e.to_string()))?;
    let ciphertext = BASE64
        .decode(encoded.trim().as_bytes())
        .map_err(|e| Error::Format(format!("ciphertext is not base64: {e}")))?;
    let claimed: Commitment = commitment
        .parse()
        .map_err(|e: chainvote_backend::error::Error| Error::Format(e.to_string()))?;

    match verify_commitment(&ciphertext, &claimed) {
        Verification::Match => Ok(claimed),
        Verification::Mismatch { recomputed } => Err(Error::Mismatch { recomputed }),
    }
}

/// Run the chosen subcommand, report the result, and return the exit code.
fn run(args: &ArgMatches) -> u8 {
    let result = match args.subcommand() {
        Some((SEAL, sub)) => {
            // Required arguments are guaranteed to be present.
            let key: &String = sub.get_one(PUBLIC_KEY_PEM).unwrap();
            let candidate: &String = sub.get_one(CANDIDATE_ID).unwrap();
            seal(key, candidate).map(|json| println!("{json}"))
        }
        Some((VERIFY, sub)) => {
            let path: &String = sub.get_one(CIPHERTEXT_PATH).unwrap();
            let commitment: &String = sub.get_one(COMMITMENT).unwrap();
            verify(path, commitment).map(|c| println!("Commitment {c} matches."))
        }
        _ => unreachable!("a subcommand is required"),
    };

    match result {
        Ok(()) => 0,
        Err(Error::IO(msg)) => {
            println!("IO error: {msg}");
            1
        }
        Err(Error::Format(msg)) => {
            println!("Invalid input: {msg}");
            1
        }
        Err(Error::Ballot(msg)) => {
            println!("Could not seal ballot: {msg}");
            1
        }
        Err(Error::Mismatch { recomputed }) => {
            println!("Verification failed: the ciphertext hashes to {recomputed}.");
            255
        }
    }
}

fn main() {
    let args = cli().get_matches();
    let exit_code = run(&args);
    std::process::exit(exit_code.into())
}
