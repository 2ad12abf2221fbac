use std::env;

use morse_panel::app::run_app;

use color_eyre::Result;

fn main() -> Result<()> {
    let args: Vec<String> = env::args().collect();

    // just the binary name, talk to a device on this machine
    match args.len() {
        1 => run_app("localhost".to_string()),
        2 => run_app(args[1].clone()),
        _ => panic!("usage: morse_panel [device-host]"),
    }
}
