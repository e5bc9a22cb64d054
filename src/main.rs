fn main() {
    if let Err(err) = railbase::run() {
        eprintln!("error: {err:#}");
        std::process::exit(1);
    }
}
