pub fn main() {
    std::process::exit(unify_cli::run_with_args(std::env::args_os()));
}
