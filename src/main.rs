fn main() {
    #[cfg(feature = "cli")]
    keyring_rewrite::cli::run();

    #[cfg(not(feature = "cli"))]
    {
        eprintln!("keyring-rewrite: CLI not enabled. Rebuild with `--features cli`.");
        std::process::exit(1);
    }
}
