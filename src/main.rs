fn main() {
    #[cfg(feature = "cli")]
    savepatch::cli::run();

    #[cfg(not(feature = "cli"))]
    {
        eprintln!("savepatch: CLI not enabled. Rebuild with `--features cli`.");
        std::process::exit(1);
    }
}
