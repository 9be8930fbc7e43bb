pub fn run_encode(text: &str) {
    println!("{}", polyp_codec::encode(text));
}

pub fn run_decode(token: &str) {
    match polyp_codec::decode(token) {
        Ok(text) => println!("{text}"),
        Err(e) => {
            eprintln!("error: {e}");
            std::process::exit(1);
        }
    }
}
