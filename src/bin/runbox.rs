fn main() {
    std::process::exit(runbox::cli::run());
}
