//! Voting-age check with its own error type.

use std::io::{BufRead, Write};
use thiserror::Error;

pub const VOTING_AGE: i32 = 18;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AgeError {
    #[error("You must be {minimum} or older to vote.")]
    TooYoung { age: i32, minimum: i32 },

    #[error("`{input}` is not a whole number")]
    NotANumber { input: String },
}

/// Parse a line of user input as an age. Surrounding whitespace is ignored.
pub fn parse_age(input: &str) -> Result<i32, AgeError> {
    let trimmed = input.trim();
    trimmed.parse().map_err(|_| AgeError::NotANumber {
        input: trimmed.to_string(),
    })
}

/// `Ok(())` when `age` may vote.
pub fn check_voting_eligibility(age: i32) -> Result<(), AgeError> {
    if age < VOTING_AGE {
        return Err(AgeError::TooYoung {
            age,
            minimum: VOTING_AGE,
        });
    }
    Ok(())
}

/// Parse and check in one step.
pub fn check_input(input: &str) -> Result<i32, AgeError> {
    let age = parse_age(input)?;
    check_voting_eligibility(age)?;
    Ok(age)
}

/// Ask for an age on `output`, read one line from `input`, and report the
/// verdict. An [`AgeError`] is reported on `output`, not returned; only I/O
/// failures are errors.
pub fn run_prompt<R: BufRead, W: Write>(mut input: R, mut output: W) -> anyhow::Result<()> {
    write!(output, "Enter your age: ")?;
    output.flush()?;
    let mut line = String::new();
    input.read_line(&mut line)?;
    match check_input(&line) {
        Ok(_) => writeln!(output, "You are eligible to vote!")?,
        Err(e) => writeln!(output, "Custom Exception Caught: {e}")?,
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn prompt(input: &str) -> String {
        let mut out = Vec::new();
        run_prompt(input.as_bytes(), &mut out).unwrap();
        String::from_utf8(out).unwrap()
    }

    #[test]
    fn adults_may_vote() {
        assert_eq!(check_input("18"), Ok(18));
        assert_eq!(prompt("42\n"), "Enter your age: You are eligible to vote!\n");
    }

    #[test]
    fn minors_get_the_custom_error() {
        assert_eq!(
            check_voting_eligibility(17),
            Err(AgeError::TooYoung { age: 17, minimum: 18 })
        );
        assert_eq!(
            prompt("16\n"),
            "Enter your age: Custom Exception Caught: You must be 18 or older to vote.\n"
        );
    }

    #[test]
    fn non_numbers_are_reported() {
        assert_eq!(
            parse_age(" eighteen "),
            Err(AgeError::NotANumber { input: "eighteen".into() })
        );
        assert!(prompt("").contains("is not a whole number"));
    }
}
