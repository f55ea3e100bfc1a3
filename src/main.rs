fn main() {
    if let Err(err) = inspection_view::run() {
        eprintln!("error: {err:#}");
        std::process::exit(1);
    }
}
