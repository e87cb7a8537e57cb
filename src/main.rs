use gevulot::cli;

// -----------------------------------------------------------------------------
// ----- Main ------------------------------------------------------------------

#[tokio::main]
async fn main() {
    let args: Vec<String> = std::env::args().skip(1).collect();

    // All logic lives in the cli module.
    let exit_code = cli::run(args).await;

    // NB: this is THE ONLY PLACE where we exit from the program.
    std::process::exit(exit_code);
}

// -----------------------------------------------------------------------------
// -----------------------------------------------------------------------------
