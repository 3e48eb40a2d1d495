fn main() {
    if let Err(e) = hyio::run() {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}
