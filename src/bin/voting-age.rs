//! Asks for an age on stdin and says whether it is old enough to vote.

use hotel_reviews_etl::eligibility::run_prompt;

fn main() -> anyhow::Result<()> {
    let stdin = std::io::stdin();
    run_prompt(stdin.lock(), std::io::stdout().lock())
}
