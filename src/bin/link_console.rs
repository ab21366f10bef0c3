//! Interactive actuator console: drive the LED and buzzer by hand to
//! verify wiring, without running detection.

use colored::*;
use eyesentry::alarm::Command;
use eyesentry::config::AppConfig;
use eyesentry::link::SerialLink;
use std::io::{self, BufRead, Write};

fn parse_command(input: &str) -> Option<Command> {
    match input {
        "ON" => Some(Command::Activate),
        "OFF" => Some(Command::Deactivate),
        "STATUS" => Some(Command::Status),
        "TEST" => Some(Command::SelfTest),
        _ => None,
    }
}

fn main() -> anyhow::Result<()> {
    env_logger::init();

    let mut config = AppConfig::load()?;
    if let Some(port) = std::env::args().nth(1) {
        config.link.port = port;
    }

    println!("{}", "Actuator console".bold());
    println!("Connecting to {}...", config.link.port);

    let mut link = SerialLink::new(config.link);
    link.connect()?;
    println!("{}", "Connected.".green());

    println!("\nCommands: ON, OFF, STATUS, TEST, QUIT\n");

    let stdin = io::stdin();
    loop {
        print!(">>> ");
        io::stdout().flush()?;

        let mut line = String::new();
        if stdin.lock().read_line(&mut line)? == 0 {
            break; // EOF
        }
        let input = line.trim().to_uppercase();

        if input == "QUIT" {
            break;
        }

        let Some(command) = parse_command(&input) else {
            println!("Unknown command. Use: ON, OFF, STATUS, TEST, QUIT\n");
            continue;
        };

        match link.send(command) {
            Ok(ack) => match ack.response {
                Some(reply) => println!("Reply: {}\n", reply),
                None => println!("(no reply)\n"),
            },
            Err(e) => println!("{} {}\n", "Send failed:".red(), e),
        }
    }

    // Leave the device quiet on the way out
    link.shutdown();
    println!("{}", "Connection closed.".green());
    Ok(())
}
