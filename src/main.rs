fn main() {
    if let Err(e) = pagesmith::run() {
        eprintln!("pagesmith: {e}");
        std::process::exit(1);
    }
}
